//! Quantization codec for device transfers
//!
//! Converts host tensors to the tile's native element type and back,
//! tracking one dynamic-range scale factor per tensor:
//!
//! - Scale: `max(|x|)` over all elements, falling back to `1.0` for an
//!   all-zero tensor (no division fault, all device elements zero).
//! - Forward: `round(x / scale * MAX_LIMIT)`, clamped to
//!   `[MIN_LIMIT, MAX_LIMIT]` before narrowing. Saturation, never
//!   wraparound.
//! - Inverse: `value = quantized * scale`.
//!
//! Rounding is half-away-from-zero, matching the fixed-point convention of
//! the tile's input DACs. When host and device element types coincide the
//! transfer is a pure value copy with scale `1.0` - that policy decision is
//! made once per container via [`TransferMode::select`], not re-checked per
//! transfer.
//!
//! All kernels are zero-allocation: they write into pre-allocated device or
//! host buffers owned by the containers.

use std::any::TypeId;

use crate::element::{DeviceElement, HostElement};
use crate::error::{EscalarError, Result};

/// Transfer policy between a host and a device element type.
///
/// Selected once at container construction. `Direct` applies when the two
/// types are identical; `Quantize` requires a floating-point host type and
/// an integer device type. Anything else is rejected with
/// [`EscalarError::UnsupportedQuantization`] instead of silently
/// mis-converting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Pure value copy; scale stays `1.0`.
    Direct,
    /// Max-abs symmetric quantization with saturation.
    Quantize,
}

impl TransferMode {
    /// Pick the transfer policy for a `(T, Q)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`EscalarError::UnsupportedQuantization`] when the types
    /// differ and the pair is not float-host / integer-device.
    pub fn select<T: HostElement, Q: DeviceElement>() -> Result<Self> {
        if TypeId::of::<T>() == TypeId::of::<Q>() {
            return Ok(Self::Direct);
        }
        if !T::IS_FLOAT {
            return Err(EscalarError::UnsupportedQuantization {
                reason: format!(
                    "host type {} is not floating-point; quantizing transfers \
                     are only defined for floating-point hosts",
                    std::any::type_name::<T>()
                ),
            });
        }
        if !Q::IS_INTEGER {
            return Err(EscalarError::UnsupportedQuantization {
                reason: format!(
                    "device type {} is not an integer tile type",
                    std::any::type_name::<Q>()
                ),
            });
        }
        Ok(Self::Quantize)
    }
}

/// Largest absolute value in `values`, widened to f64.
#[must_use]
pub fn max_abs<T: HostElement>(values: &[T]) -> f64 {
    values
        .iter()
        .map(|v| v.to_f64().abs())
        .fold(0.0_f64, f64::max)
}

/// Dynamic-range scale for `values`: `max(|x|)`, or `1.0` if all-zero.
#[must_use]
pub fn dynamic_range_scale<T: HostElement>(values: &[T]) -> f64 {
    let m = max_abs(values);
    if m == 0.0 {
        1.0
    } else {
        m
    }
}

#[inline]
fn quantize_one<Q: DeviceElement>(x: f64, inv_scale: f64) -> Q {
    let scaled = (x * inv_scale * Q::MAX_LIMIT).clamp(Q::MIN_LIMIT, Q::MAX_LIMIT);
    Q::from_f64(scaled.round())
}

/// Quantize a flat host slice into the head of a device buffer.
///
/// Elements past `host.len()` are left untouched (the containers keep them
/// zeroed). Returns the raw scale factor used.
///
/// # Panics
///
/// Debug-asserts that the device buffer is at least as long as the host
/// slice; the containers validate shapes at construction.
pub fn quantize_into<T: HostElement, Q: DeviceElement>(host: &[T], device: &mut [Q]) -> f64 {
    debug_assert!(device.len() >= host.len());
    let scale = dynamic_range_scale(host);
    let inv_scale = 1.0 / scale;
    for (d, h) in device.iter_mut().zip(host.iter()) {
        *d = quantize_one(h.to_f64(), inv_scale);
    }
    scale
}

/// Quantize a row-major `rows x cols` host region into a device matrix with
/// row stride `device_cols`.
///
/// The scale is computed over the whole host region; cells outside it keep
/// their previous (zero) contents. Returns the raw scale factor used.
pub fn quantize_rows_into<T: HostElement, Q: DeviceElement>(
    host: &[T],
    rows: usize,
    cols: usize,
    device: &mut [Q],
    device_cols: usize,
) -> f64 {
    debug_assert_eq!(host.len(), rows * cols);
    debug_assert!(cols <= device_cols);
    debug_assert!(rows * device_cols <= device.len());
    let scale = dynamic_range_scale(host);
    let inv_scale = 1.0 / scale;
    for r in 0..rows {
        let host_row = &host[r * cols..(r + 1) * cols];
        let device_row = &mut device[r * device_cols..r * device_cols + cols];
        for (d, h) in device_row.iter_mut().zip(host_row.iter()) {
            *d = quantize_one(h.to_f64(), inv_scale);
        }
    }
    scale
}

/// Dequantize the head of a device buffer into a flat host slice:
/// `host[i] = device[i] * scale`.
pub fn dequantize_into<Q: DeviceElement, T: HostElement>(device: &[Q], host: &mut [T], scale: f64) {
    debug_assert!(device.len() >= host.len());
    for (h, d) in host.iter_mut().zip(device.iter()) {
        *h = T::from_f64(d.to_f64() * scale);
    }
}

/// Dequantize a `rows x cols` region out of a device matrix with row stride
/// `device_cols`.
pub fn dequantize_rows_into<Q: DeviceElement, T: HostElement>(
    device: &[Q],
    host: &mut [T],
    rows: usize,
    cols: usize,
    device_cols: usize,
    scale: f64,
) {
    debug_assert_eq!(host.len(), rows * cols);
    for r in 0..rows {
        let device_row = &device[r * device_cols..r * device_cols + cols];
        let host_row = &mut host[r * cols..(r + 1) * cols];
        for (h, d) in host_row.iter_mut().zip(device_row.iter()) {
            *h = T::from_f64(d.to_f64() * scale);
        }
    }
}

/// Identity transfer, host to device. Exact for all supported element pairs.
pub fn copy_into<T: HostElement, Q: DeviceElement>(host: &[T], device: &mut [Q]) {
    debug_assert!(device.len() >= host.len());
    for (d, h) in device.iter_mut().zip(host.iter()) {
        *d = Q::from_f64(h.to_f64());
    }
}

/// Identity transfer of a row-major region, host to device.
pub fn copy_rows_into<T: HostElement, Q: DeviceElement>(
    host: &[T],
    rows: usize,
    cols: usize,
    device: &mut [Q],
    device_cols: usize,
) {
    debug_assert_eq!(host.len(), rows * cols);
    for r in 0..rows {
        let host_row = &host[r * cols..(r + 1) * cols];
        let device_row = &mut device[r * device_cols..r * device_cols + cols];
        for (d, h) in device_row.iter_mut().zip(host_row.iter()) {
            *d = Q::from_f64(h.to_f64());
        }
    }
}

/// Identity transfer, device to host. The scale argument of a dequantizing
/// store degenerates to a no-op here.
pub fn copy_from<Q: DeviceElement, T: HostElement>(device: &[Q], host: &mut [T]) {
    debug_assert!(device.len() >= host.len());
    for (h, d) in host.iter_mut().zip(device.iter()) {
        *h = T::from_f64(d.to_f64());
    }
}

/// Identity transfer of a row-major region, device to host.
pub fn copy_rows_from<Q: DeviceElement, T: HostElement>(
    device: &[Q],
    host: &mut [T],
    rows: usize,
    cols: usize,
    device_cols: usize,
) {
    debug_assert_eq!(host.len(), rows * cols);
    for r in 0..rows {
        let device_row = &device[r * device_cols..r * device_cols + cols];
        let host_row = &mut host[r * cols..(r + 1) * cols];
        for (h, d) in host_row.iter_mut().zip(device_row.iter()) {
            *h = T::from_f64(d.to_f64());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // TransferMode Tests
    // =========================================================================

    #[test]
    fn test_select_direct_same_type() {
        assert_eq!(TransferMode::select::<f32, f32>().unwrap(), TransferMode::Direct);
        assert_eq!(TransferMode::select::<i32, i32>().unwrap(), TransferMode::Direct);
    }

    #[test]
    fn test_select_quantize_float_to_int() {
        assert_eq!(TransferMode::select::<f32, i8>().unwrap(), TransferMode::Quantize);
        assert_eq!(TransferMode::select::<f64, i16>().unwrap(), TransferMode::Quantize);
        assert_eq!(
            TransferMode::select::<half::f16, i8>().unwrap(),
            TransferMode::Quantize
        );
    }

    #[test]
    fn test_select_rejects_integer_host() {
        let err = TransferMode::select::<i32, i8>().unwrap_err();
        assert!(matches!(err, EscalarError::UnsupportedQuantization { .. }));
    }

    #[test]
    fn test_select_rejects_float_device() {
        let err = TransferMode::select::<f64, f32>().unwrap_err();
        assert!(matches!(err, EscalarError::UnsupportedQuantization { .. }));
    }

    // =========================================================================
    // Scale Tests
    // =========================================================================

    #[test]
    fn test_dynamic_range_scale() {
        assert_eq!(dynamic_range_scale(&[1.0f32, -3.0, 2.0]), 3.0);
        assert_eq!(dynamic_range_scale(&[-4.5f64]), 4.5);
    }

    #[test]
    fn test_zero_tensor_scale_clamps_to_one() {
        assert_eq!(dynamic_range_scale(&[0.0f32; 8]), 1.0);
        let mut device = [0i8; 8];
        let scale = quantize_into(&[0.0f32; 8], &mut device);
        assert_eq!(scale, 1.0);
        assert!(device.iter().all(|&q| q == 0));
    }

    // =========================================================================
    // Quantize Tests
    // =========================================================================

    #[test]
    fn test_quantize_max_maps_to_type_limit() {
        let mut device = [0i8; 4];
        let scale = quantize_into(&[3.0f32, -3.0, 1.5, 0.0], &mut device);
        assert_eq!(scale, 3.0);
        assert_eq!(device, [127, -127, 64, 0]);
    }

    #[test]
    fn test_quantize_rounds_half_away_from_zero() {
        // 0.5 * 127 = 63.5 rounds to 64; -0.5 * 127 = -63.5 rounds to -64
        let mut device = [0i8; 3];
        quantize_into(&[1.0f32, 0.5, -0.5], &mut device);
        assert_eq!(device, [127, 64, -64]);
    }

    #[test]
    fn test_quantize_saturates_not_wraps() {
        // The max-abs element scales to exactly +/-MAX_LIMIT; the clamp
        // guards against the reciprocal-scale rounding nudging it past the
        // limit. -1.0 maps to -127, never to -128 via wraparound.
        let mut device = [0i8; 2];
        quantize_into(&[1.0f32, -1.0], &mut device);
        assert_eq!(device, [127, -127]);
    }

    #[test]
    fn test_quantize_leaves_padding_untouched() {
        let mut device = [0i8; 6];
        quantize_into(&[2.0f32, 1.0], &mut device);
        assert_eq!(&device[2..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_quantize_rows_strided_layout() {
        // 2x2 host into a 3x4 device: values land at stride 4.
        let mut device = [0i8; 12];
        let scale = quantize_rows_into(&[4.0f32, 2.0, -4.0, 1.0], 2, 2, &mut device, 4);
        assert_eq!(scale, 4.0);
        assert_eq!(device[0], 127);
        assert_eq!(device[1], 64);
        assert_eq!(device[4], -127);
        assert_eq!(device[5], 32);
        assert!(device[2..4].iter().all(|&q| q == 0));
        assert!(device[6..].iter().all(|&q| q == 0));
    }

    #[test]
    fn test_quantize_i16_target() {
        let mut device = [0i16; 2];
        let scale = quantize_into(&[1.0f32, -0.25], &mut device);
        assert_eq!(scale, 1.0);
        assert_eq!(device, [32767, -8192]);
    }

    // =========================================================================
    // Dequantize Tests
    // =========================================================================

    #[test]
    fn test_dequantize_applies_scale() {
        let mut host = [0.0f32; 3];
        dequantize_into(&[127i8, -64, 0], &mut host, 2.0 / 127.0);
        assert!((host[0] - 2.0).abs() < 1e-6);
        assert!((host[1] + 64.0 * 2.0 / 127.0).abs() < 1e-6);
        assert_eq!(host[2], 0.0);
    }

    #[test]
    fn test_identity_copy_exact() {
        let mut device = [0i32; 3];
        copy_into(&[-7i32, 0, 2_147_483_647], &mut device);
        assert_eq!(device, [-7, 0, 2_147_483_647]);

        let mut host = [0i32; 3];
        copy_from(&device, &mut host);
        assert_eq!(host, [-7, 0, 2_147_483_647]);
    }

    #[test]
    fn test_identity_roundtrip_f32() {
        let values = [1.5f32, -2.25, 0.0, 1e-20];
        let mut device = [0.0f32; 4];
        copy_into(&values, &mut device);
        let mut back = [0.0f32; 4];
        copy_from(&device, &mut back);
        assert_eq!(back, values);
    }
}
