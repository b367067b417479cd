//! Vector container

use crate::device::DEVICE_COLS;
use crate::element::{DeviceElement, HostElement};
use crate::error::{EscalarError, Result};
use crate::quantize::{self, TransferMode};
use crate::tensor::{alloc_device, try_alloc_zeroed, HostStorage};

/// A host vector paired with its device-resident quantized image.
///
/// `T` is the host element type, `Q` the device element type (defaulting to
/// `T` for identity transfers). The device buffer always has length
/// [`DEVICE_COLS`] regardless of the host length - a hardware constant, not
/// a property of the data.
///
/// # Examples
///
/// ```
/// use escalar::AnalogVector;
///
/// // Quantizing container: f32 host, i8 device
/// let mut vec: AnalogVector<'_, f32, i8> =
///     AnalogVector::from_vec(vec![2.0, -1.0, 0.5]).unwrap();
/// vec.transfer_to_device();
/// assert_eq!(vec.scale_factor(), 2.0);
/// assert_eq!(vec.device()[0], 127);
/// ```
#[derive(Debug)]
pub struct AnalogVector<'a, T: HostElement, Q: DeviceElement = T> {
    host: HostStorage<'a, T>,
    len: usize,
    device: Vec<Q>,
    mode: TransferMode,
    scale_factor: f64,
}

impl<T: HostElement, Q: DeviceElement> AnalogVector<'static, T, Q> {
    /// Create an owned, zero-initialized vector of `len` elements.
    ///
    /// Typical for output vectors that will be filled by `store_vector`.
    ///
    /// # Errors
    ///
    /// [`EscalarError::InvalidShape`] if `len` is zero or exceeds
    /// [`DEVICE_COLS`]; [`EscalarError::OutOfMemory`] if allocation fails;
    /// [`EscalarError::UnsupportedQuantization`] for an undefined `(T, Q)`
    /// pair.
    pub fn zeros(len: usize) -> Result<Self> {
        let host = try_alloc_zeroed(len, "host vector")?;
        Self::from_vec(host)
    }

    /// Create an owned vector from existing host data.
    ///
    /// # Errors
    ///
    /// Same conditions as [`AnalogVector::zeros`].
    pub fn from_vec(data: Vec<T>) -> Result<Self> {
        let len = data.len();
        Ok(Self {
            host: HostStorage::Owned(data),
            len,
            device: Self::validated_device(len)?,
            mode: TransferMode::select::<T, Q>()?,
            scale_factor: 1.0,
        })
    }
}

impl<'a, T: HostElement, Q: DeviceElement> AnalogVector<'a, T, Q> {
    /// Create a borrowing vector over a caller-owned host slice.
    ///
    /// The container never frees the slice; the borrow checker guarantees it
    /// outlives the container.
    ///
    /// # Errors
    ///
    /// Same conditions as [`AnalogVector::zeros`].
    pub fn from_slice(host: &'a mut [T]) -> Result<Self> {
        let len = host.len();
        Ok(Self {
            host: HostStorage::Borrowed(host),
            len,
            device: Self::validated_device(len)?,
            mode: TransferMode::select::<T, Q>()?,
            scale_factor: 1.0,
        })
    }

    fn validated_device(len: usize) -> Result<Vec<Q>> {
        if len == 0 {
            return Err(EscalarError::InvalidShape {
                reason: "vector length cannot be zero".to_string(),
            });
        }
        if len > DEVICE_COLS {
            return Err(EscalarError::InvalidShape {
                reason: format!("vector length {len} exceeds device columns {DEVICE_COLS}"),
            });
        }
        alloc_device(DEVICE_COLS)
    }

    /// Re-encode the host vector into the device buffer, updating the stored
    /// scale factor. Identity containers copy values and keep scale `1.0`.
    pub fn transfer_to_device(&mut self) {
        match self.mode {
            TransferMode::Direct => {
                quantize::copy_into(self.host.as_slice(), &mut self.device);
            }
            TransferMode::Quantize => {
                self.scale_factor = quantize::quantize_into(self.host.as_slice(), &mut self.device);
            }
        }
    }

    /// Decode the device buffer back into the host vector.
    ///
    /// `scale` is the dequantization multiplier - for a stored MVM result,
    /// the tile's output scale. Identity containers ignore it and copy
    /// values directly.
    pub fn transfer_to_host(&mut self, scale: f64) {
        let len = self.len;
        match self.mode {
            TransferMode::Direct => {
                quantize::copy_from(&self.device[..len], self.host.as_mut_slice());
            }
            TransferMode::Quantize => {
                quantize::dequantize_into(&self.device[..len], self.host.as_mut_slice(), scale);
            }
        }
    }

    /// Host-side values.
    #[must_use]
    pub fn host(&self) -> &[T] {
        self.host.as_slice()
    }

    /// Mutable host-side values.
    pub fn host_mut(&mut self) -> &mut [T] {
        self.host.as_mut_slice()
    }

    /// Device buffer, as last written by [`Self::transfer_to_device`] or the
    /// accelerator.
    #[must_use]
    pub fn device(&self) -> &[Q] {
        &self.device
    }

    /// Mutable device buffer, handed to the accelerator for `store_vector`.
    pub fn device_mut(&mut self) -> &mut [Q] {
        &mut self.device
    }

    /// Host length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the host vector is empty (never true for a constructed
    /// container).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The transfer policy chosen at construction.
    #[must_use]
    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    /// Raw dynamic-range scale from the last quantizing transfer
    /// (`max(|x|)`, or `1.0`).
    #[must_use]
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Effective scale, directly usable as a dequantization multiplier
    /// downstream: raw scale for identity containers, `raw / MAX_LIMIT` for
    /// quantizing ones.
    #[must_use]
    pub fn effective_scale(&self) -> f64 {
        match self.mode {
            TransferMode::Direct => self.scale_factor,
            TransferMode::Quantize => self.scale_factor / Q::MAX_LIMIT,
        }
    }
}
