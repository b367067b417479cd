//! Numeric element traits for host and device tensors
//!
//! Host tensors carry whatever numeric type the caller populated; device
//! tensors carry the tile's native (usually narrow integer) type. Both sides
//! bridge through f64, which represents every supported element exactly, so
//! identity transfers are lossless and quantization arithmetic happens at
//! full precision.

use half::f16;
use num_traits::Num;

/// Element type of a host tensor.
///
/// Implemented for `f32`, `f64`, [`half::f16`], `i8`, `i16`, and `i32`.
pub trait HostElement: Num + Copy + PartialOrd + Send + Sync + 'static {
    /// Whether this is a floating-point type. Quantizing transfers are only
    /// defined for floating-point hosts.
    const IS_FLOAT: bool;

    /// Widen to f64 (exact for all supported types).
    fn to_f64(self) -> f64;

    /// Narrow from f64. Integer targets saturate on overflow.
    fn from_f64(v: f64) -> Self;
}

/// Element type of a device tensor.
///
/// Carries the representable range used as both the quantization denominator
/// and the saturation clamp. Implemented for the integer tile types `i8`,
/// `i16`, `i32` and, for identity transfers, `f32`, `f64`, and [`half::f16`].
pub trait DeviceElement: Num + Copy + Send + Sync + 'static {
    /// Smallest representable value, as f64.
    const MIN_LIMIT: f64;
    /// Largest representable value, as f64. Quantized values are
    /// proportional to `true_value / scale * MAX_LIMIT`.
    const MAX_LIMIT: f64;
    /// Whether this is an integer type. Quantizing transfers require an
    /// integer device target.
    const IS_INTEGER: bool;

    /// Widen to f64 (exact for all supported types).
    fn to_f64(self) -> f64;

    /// Narrow from f64. The quantizer clamps before calling this; integer
    /// targets additionally saturate.
    fn from_f64(v: f64) -> Self;
}

macro_rules! host_int {
    ($($t:ty),*) => {$(
        impl HostElement for $t {
            const IS_FLOAT: bool = false;
            #[inline]
            fn to_f64(self) -> f64 {
                f64::from(self)
            }
            #[inline]
            #[allow(clippy::cast_possible_truncation)]
            fn from_f64(v: f64) -> Self {
                v as $t
            }
        }
    )*};
}

macro_rules! device_int {
    ($($t:ty),*) => {$(
        impl DeviceElement for $t {
            const MIN_LIMIT: f64 = <$t>::MIN as f64;
            const MAX_LIMIT: f64 = <$t>::MAX as f64;
            const IS_INTEGER: bool = true;
            #[inline]
            fn to_f64(self) -> f64 {
                f64::from(self)
            }
            #[inline]
            #[allow(clippy::cast_possible_truncation)]
            fn from_f64(v: f64) -> Self {
                v as $t
            }
        }
    )*};
}

host_int!(i8, i16, i32);
device_int!(i8, i16, i32);

impl HostElement for f32 {
    const IS_FLOAT: bool = true;
    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl HostElement for f64 {
    const IS_FLOAT: bool = true;
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
}

impl HostElement for f16 {
    const IS_FLOAT: bool = true;
    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
    #[inline]
    fn from_f64(v: f64) -> Self {
        f16::from_f64(v)
    }
}

impl DeviceElement for f32 {
    const MIN_LIMIT: f64 = f32::MIN as f64;
    const MAX_LIMIT: f64 = f32::MAX as f64;
    const IS_INTEGER: bool = false;
    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl DeviceElement for f64 {
    const MIN_LIMIT: f64 = f64::MIN;
    const MAX_LIMIT: f64 = f64::MAX;
    const IS_INTEGER: bool = false;
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
}

impl DeviceElement for f16 {
    const MIN_LIMIT: f64 = -65504.0;
    const MAX_LIMIT: f64 = 65504.0;
    const IS_INTEGER: bool = false;
    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
    #[inline]
    fn from_f64(v: f64) -> Self {
        f16::from_f64(v)
    }
}
