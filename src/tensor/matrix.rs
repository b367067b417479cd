//! Matrix container

use crate::device::{DEVICE_COLS, DEVICE_ROWS};
use crate::element::{DeviceElement, HostElement};
use crate::error::{EscalarError, Result};
use crate::quantize::{self, TransferMode};
use crate::tensor::{alloc_device, HostStorage};

/// A host matrix paired with its device-resident quantized image.
///
/// The host side is `rows x cols` row-major; the device side is always
/// [`DEVICE_ROWS`] `x` [`DEVICE_COLS`], zero-padded outside the host
/// region. Host shape is validated against the device geometry at
/// construction.
///
/// # Examples
///
/// ```
/// use escalar::AnalogMatrix;
///
/// let mut mat: AnalogMatrix<'_, f32, i8> =
///     AnalogMatrix::from_vec(2, 3, vec![3.0; 6]).unwrap();
/// mat.transfer_to_device();
/// assert_eq!(mat.scale_factor(), 3.0);
/// assert_eq!(mat.device()[0], 127);
/// ```
#[derive(Debug)]
pub struct AnalogMatrix<'a, T: HostElement, Q: DeviceElement = T> {
    host: HostStorage<'a, T>,
    rows: usize,
    cols: usize,
    device: Vec<Q>,
    mode: TransferMode,
    scale_factor: f64,
}

impl<T: HostElement, Q: DeviceElement> AnalogMatrix<'static, T, Q> {
    /// Create an owned matrix from row-major host data.
    ///
    /// # Errors
    ///
    /// [`EscalarError::InvalidShape`] if a dimension is zero, the shape
    /// exceeds the device geometry, or `data.len() != rows * cols`;
    /// [`EscalarError::OutOfMemory`] if the device allocation fails;
    /// [`EscalarError::UnsupportedQuantization`] for an undefined `(T, Q)`
    /// pair.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(EscalarError::InvalidShape {
                reason: format!(
                    "matrix data length {} does not match shape {rows}x{cols}",
                    data.len()
                ),
            });
        }
        Ok(Self {
            host: HostStorage::Owned(data),
            rows,
            cols,
            device: Self::validated_device(rows, cols)?,
            mode: TransferMode::select::<T, Q>()?,
            scale_factor: 1.0,
        })
    }

    /// Create an owned matrix by copying a row-pointer representation
    /// (one slice per row, all of equal length).
    ///
    /// # Errors
    ///
    /// [`EscalarError::InvalidShape`] if rows are empty or ragged, plus the
    /// conditions of [`AnalogMatrix::from_vec`].
    pub fn from_rows(rows: &[&[T]]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(EscalarError::InvalidShape {
                reason: "matrix must have at least one row".to_string(),
            });
        };
        let cols = first.len();
        if rows.iter().any(|r| r.len() != cols) {
            return Err(EscalarError::InvalidShape {
                reason: "matrix rows have unequal lengths".to_string(),
            });
        }
        let mut data = Vec::new();
        data.try_reserve_exact(rows.len() * cols)
            .map_err(|_| EscalarError::OutOfMemory {
                requested_bytes: rows.len() * cols * std::mem::size_of::<T>(),
                buffer: "host matrix",
            })?;
        for row in rows {
            data.extend_from_slice(row);
        }
        Self::from_vec(rows.len(), cols, data)
    }
}

impl<'a, T: HostElement, Q: DeviceElement> AnalogMatrix<'a, T, Q> {
    /// Create a borrowing matrix over a caller-owned row-major slice.
    ///
    /// # Errors
    ///
    /// Same conditions as [`AnalogMatrix::from_vec`].
    pub fn from_slice(rows: usize, cols: usize, host: &'a mut [T]) -> Result<Self> {
        if host.len() != rows * cols {
            return Err(EscalarError::InvalidShape {
                reason: format!(
                    "matrix data length {} does not match shape {rows}x{cols}",
                    host.len()
                ),
            });
        }
        Ok(Self {
            host: HostStorage::Borrowed(host),
            rows,
            cols,
            device: Self::validated_device(rows, cols)?,
            mode: TransferMode::select::<T, Q>()?,
            scale_factor: 1.0,
        })
    }

    fn validated_device(rows: usize, cols: usize) -> Result<Vec<Q>> {
        if rows == 0 || cols == 0 {
            return Err(EscalarError::InvalidShape {
                reason: "matrix dimensions cannot be zero".to_string(),
            });
        }
        if rows > DEVICE_ROWS || cols > DEVICE_COLS {
            return Err(EscalarError::InvalidShape {
                reason: format!(
                    "matrix shape {rows}x{cols} exceeds device geometry \
                     {DEVICE_ROWS}x{DEVICE_COLS}"
                ),
            });
        }
        alloc_device(DEVICE_ROWS * DEVICE_COLS)
    }

    /// Re-encode the host matrix into the device buffer at the device row
    /// stride, updating the stored scale factor.
    pub fn transfer_to_device(&mut self) {
        match self.mode {
            TransferMode::Direct => {
                quantize::copy_rows_into(
                    self.host.as_slice(),
                    self.rows,
                    self.cols,
                    &mut self.device,
                    DEVICE_COLS,
                );
            }
            TransferMode::Quantize => {
                self.scale_factor = quantize::quantize_rows_into(
                    self.host.as_slice(),
                    self.rows,
                    self.cols,
                    &mut self.device,
                    DEVICE_COLS,
                );
            }
        }
    }

    /// Decode the device buffer back into the host matrix.
    pub fn transfer_to_host(&mut self, scale: f64) {
        let (rows, cols) = (self.rows, self.cols);
        match self.mode {
            TransferMode::Direct => {
                quantize::copy_rows_from(
                    &self.device,
                    self.host.as_mut_slice(),
                    rows,
                    cols,
                    DEVICE_COLS,
                );
            }
            TransferMode::Quantize => {
                quantize::dequantize_rows_into(
                    &self.device,
                    self.host.as_mut_slice(),
                    rows,
                    cols,
                    DEVICE_COLS,
                    scale,
                );
            }
        }
    }

    /// Host-side values, row-major.
    #[must_use]
    pub fn host(&self) -> &[T] {
        self.host.as_slice()
    }

    /// Mutable host-side values, row-major.
    pub fn host_mut(&mut self) -> &mut [T] {
        self.host.as_mut_slice()
    }

    /// Device buffer at the device geometry, row-major.
    #[must_use]
    pub fn device(&self) -> &[Q] {
        &self.device
    }

    /// Host row count.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Host column count.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The transfer policy chosen at construction.
    #[must_use]
    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    /// Raw dynamic-range scale from the last quantizing transfer.
    #[must_use]
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Effective scale: raw for identity containers, `raw / MAX_LIMIT` for
    /// quantizing ones.
    #[must_use]
    pub fn effective_scale(&self) -> f64 {
        match self.mode {
            TransferMode::Direct => self.scale_factor,
            TransferMode::Quantize => self.scale_factor / Q::MAX_LIMIT,
        }
    }
}
