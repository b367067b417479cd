//! # Escalar
//!
//! Host-side driver for analog matrix-vector-multiply (MVM) accelerator
//! tiles.
//!
//! Escalar (Spanish: "to scale") converts host tensors into the device's
//! quantized fixed-point representation, tracks the per-tensor dynamic-range
//! scale factors needed to interpret results, and sequences the five tile
//! instructions (set-matrix, load-vector, compute, store-vector,
//! move-vector) against a fixed number of hardware tile slots.
//!
//! ## Example
//!
//! ```rust
//! use escalar::{AnalogMatrix, AnalogVector, MockAccelerator, MvmDriver, TileId};
//!
//! // One tile, software-emulated array
//! let mut driver = MvmDriver::new(MockAccelerator::new(1), 1);
//! let tile = TileId::new(0);
//!
//! // f32 host data, 8-bit signed device representation
//! let mut mat: AnalogMatrix<'_, f32, i8> =
//!     AnalogMatrix::from_vec(3, 4, vec![3.0; 12]).unwrap();
//! let mut vin: AnalogVector<'_, f32, i8> =
//!     AnalogVector::from_vec(vec![2.0; 4]).unwrap();
//! let mut vout: AnalogVector<'_, f32, i32> = AnalogVector::zeros(3).unwrap();
//!
//! driver.set_matrix(&mut mat, tile).unwrap();
//! driver.load_vector(&mut vin, tile).unwrap();
//! driver.compute(tile).unwrap();
//! driver.store_vector(&mut vout, tile).unwrap();
//!
//! // Each output element is a 4-column dot product: 4 * 3.0 * 2.0
//! assert!((vout.host()[0] - 24.0).abs() < 0.05);
//! ```
//!
//! ## Architecture
//!
//! - [`quantize`] - the codec: max-abs symmetric quantization with
//!   saturation, identity transfers, scale bookkeeping
//! - [`tensor`] - [`AnalogMatrix`] / [`AnalogVector`] containers pairing a
//!   host tensor with its device-resident image
//! - [`context`] - [`TileContext`], the per-slot state machine and
//!   scale-propagation table
//! - [`driver`] - [`MvmDriver`], the operation sequencer
//! - [`accel`] - the opaque hardware boundary ([`AnalogAccelerator`])
//! - [`mock`] - software emulation of the tile array
//!
//! The driver is fully synchronous and single-threaded per instance: every
//! hardware call blocks until the tile completes, and nothing is retried.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::float_cmp)] // exact device-unit comparisons in tests
#![allow(clippy::cast_precision_loss)] // usize -> f64 for scale math is safe

/// Accelerator instruction boundary: the five tile ops and status flags
pub mod accel;
/// Tile-slot state machine and scale-factor propagation
pub mod context;
/// Build-time device tile geometry
pub mod device;
pub mod driver;
/// Host/device numeric element traits
pub mod element;
pub mod error;
/// Software emulation of the tile array, for tests and host-only bringup
pub mod mock;
/// Quantization codec: host tensors to device fixed-point and back
pub mod quantize;
pub mod tensor;
/// Structured tracing of issued tile instructions
pub mod trace;

// Re-exports for convenience
pub use accel::{AnalogAccelerator, MvmOp, RawStatus, STATUS_OK};
pub use context::{TileContext, TileId, TileState};
pub use device::{TileGeometry, DEVICE_COLS, DEVICE_ROWS};
pub use driver::MvmDriver;
pub use error::{EscalarError, Result};
pub use mock::MockAccelerator;
pub use quantize::TransferMode;
pub use tensor::{AnalogMatrix, AnalogVector};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_geometry_exported() {
        assert_eq!(TileGeometry::device().rows, DEVICE_ROWS);
        assert_eq!(TileGeometry::device().cols, DEVICE_COLS);
    }
}
