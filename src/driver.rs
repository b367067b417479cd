//! Tile operation sequencer
//!
//! [`MvmDriver`] owns the accelerator handle, the [`TileContext`], and the
//! instruction trace, and exposes the five tile operations. Each operation
//! runs in a fixed order: host-side codec step, context bookkeeping,
//! hardware invocation - except `store_vector`, where the hardware
//! invocation precedes the host-side dequantize because the data must
//! arrive before it can be converted.
//!
//! Every hardware call blocks until the tile completes; a hung tile blocks
//! the caller indefinitely. A non-zero status flag aborts the operation
//! with [`EscalarError::Hardware`] carrying the flag unmodified - the
//! driver never retries and never interprets status codes. One controlling
//! thread per driver; concurrent use must be serialized by the caller.
//!
//! ```
//! use escalar::{AnalogMatrix, AnalogVector, MockAccelerator, MvmDriver, TileId};
//!
//! let mut driver = MvmDriver::new(MockAccelerator::new(1), 1);
//! let tile = TileId::new(0);
//!
//! let mut mat: AnalogMatrix<'_, f32, i8> =
//!     AnalogMatrix::from_vec(2, 2, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
//! let mut vin: AnalogVector<'_, f32, i8> =
//!     AnalogVector::from_vec(vec![0.5, -0.5]).unwrap();
//! let mut vout: AnalogVector<'_, f32, i32> = AnalogVector::zeros(2).unwrap();
//!
//! driver.set_matrix(&mut mat, tile).unwrap();
//! driver.load_vector(&mut vin, tile).unwrap();
//! driver.compute(tile).unwrap();
//! driver.store_vector(&mut vout, tile).unwrap();
//!
//! assert!((vout.host()[0] - 0.5).abs() < 0.01);
//! ```

use std::time::Instant;

use crate::accel::{AnalogAccelerator, MvmOp, RawStatus, STATUS_OK};
use crate::context::{TileContext, TileId, TileState};
use crate::element::{DeviceElement, HostElement};
use crate::error::{EscalarError, Result};
use crate::tensor::{AnalogMatrix, AnalogVector};
use crate::trace::{DriverTrace, TraceConfig};

/// Sequencer for one analog tile array.
#[derive(Debug)]
pub struct MvmDriver<A: AnalogAccelerator> {
    accel: A,
    ctx: TileContext,
    trace: DriverTrace,
}

impl<A: AnalogAccelerator> MvmDriver<A> {
    /// Create a driver over `accel` managing `num_tiles` tile slots.
    pub fn new(accel: A, num_tiles: usize) -> Self {
        Self::with_trace(accel, num_tiles, TraceConfig::default())
    }

    /// Create a driver with instruction tracing configured.
    pub fn with_trace(accel: A, num_tiles: usize, config: TraceConfig) -> Self {
        Self {
            accel,
            ctx: TileContext::new(num_tiles),
            trace: DriverTrace::new(config),
        }
    }

    /// The scale and lifecycle table.
    #[must_use]
    pub fn context(&self) -> &TileContext {
        &self.ctx
    }

    /// The captured instruction trace.
    #[must_use]
    pub fn trace(&self) -> &DriverTrace {
        &self.trace
    }

    /// The underlying accelerator handle.
    pub fn accelerator_mut(&mut self) -> &mut A {
        &mut self.accel
    }

    /// Consume the driver, returning the accelerator handle.
    pub fn into_accelerator(self) -> A {
        self.accel
    }

    /// Quantize `mat` and program it into `tile`.
    ///
    /// Overwriting an already-programmed tile is allowed; any loaded vector
    /// or computed output on that tile is invalidated.
    ///
    /// # Errors
    ///
    /// [`EscalarError::TileOutOfRange`] for an invalid tile;
    /// [`EscalarError::Hardware`] if the tile reports a non-zero status.
    pub fn set_matrix<T: HostElement, Q: DeviceElement>(
        &mut self,
        mat: &mut AnalogMatrix<'_, T, Q>,
        tile: TileId,
    ) -> Result<RawStatus> {
        let started = Instant::now();
        mat.transfer_to_device();
        self.ctx.set_matrix(tile, mat.effective_scale())?;
        let status = self.accel.set_matrix(tile.value(), mat.device());
        self.trace.record(
            MvmOp::SetMatrix,
            tile.value(),
            None,
            Some(mat.effective_scale()),
            status,
            started.elapsed(),
        );
        self.check(MvmOp::SetMatrix, status)
    }

    /// Quantize `vec` and load it into `tile`'s input registers.
    ///
    /// # Errors
    ///
    /// [`EscalarError::TileOutOfRange`] for an invalid tile;
    /// [`EscalarError::InvalidTileState`] if no matrix is resident;
    /// [`EscalarError::Hardware`] on a non-zero status.
    pub fn load_vector<T: HostElement, Q: DeviceElement>(
        &mut self,
        vec: &mut AnalogVector<'_, T, Q>,
        tile: TileId,
    ) -> Result<RawStatus> {
        let started = Instant::now();
        vec.transfer_to_device();
        self.ctx.load_vector(tile, vec.effective_scale())?;
        let status = self.accel.load_vector(tile.value(), vec.device());
        self.trace.record(
            MvmOp::LoadVector,
            tile.value(),
            None,
            Some(vec.effective_scale()),
            status,
            started.elapsed(),
        );
        self.check(MvmOp::LoadVector, status)
    }

    /// Run one MVM pass on `tile`.
    ///
    /// On success the tile's output scale becomes
    /// `matrix_scale x vector_scale`; a hardware failure leaves the tile
    /// `VectorLoaded` so the caller may re-issue.
    ///
    /// # Errors
    ///
    /// [`EscalarError::TileOutOfRange`] for an invalid tile;
    /// [`EscalarError::InvalidTileState`] unless the tile is
    /// `VectorLoaded`; [`EscalarError::Hardware`] on a non-zero status.
    pub fn compute(&mut self, tile: TileId) -> Result<RawStatus> {
        let started = Instant::now();
        let state = self.ctx.state(tile)?;
        if state != TileState::VectorLoaded {
            return Err(EscalarError::InvalidTileState {
                tile: tile.value(),
                state,
                expected: "VectorLoaded",
            });
        }
        let status = self.accel.compute(tile.value());
        let scale = if status == STATUS_OK {
            Some(self.ctx.record_compute(tile)?)
        } else {
            None
        };
        self.trace.record(
            MvmOp::Compute,
            tile.value(),
            None,
            scale,
            status,
            started.elapsed(),
        );
        self.check(MvmOp::Compute, status)
    }

    /// Read `tile`'s output back and dequantize it into `out` using the
    /// tile's output scale.
    ///
    /// The slot stays readable afterwards (drained, not cleared), so
    /// storing twice is permitted.
    ///
    /// # Errors
    ///
    /// [`EscalarError::TileOutOfRange`] for an invalid tile;
    /// [`EscalarError::InvalidTileState`] unless the tile is `Computed` or
    /// `Stored`; [`EscalarError::Hardware`] on a non-zero status, in which
    /// case `out`'s host data is left untouched.
    pub fn store_vector<T: HostElement, Q: DeviceElement>(
        &mut self,
        out: &mut AnalogVector<'_, T, Q>,
        tile: TileId,
    ) -> Result<RawStatus> {
        let started = Instant::now();
        let scale = self.ctx.record_store(tile)?;
        let status = self.accel.store_vector(tile.value(), out.device_mut());
        self.trace.record(
            MvmOp::StoreVector,
            tile.value(),
            None,
            Some(scale),
            status,
            started.elapsed(),
        );
        self.check(MvmOp::StoreVector, status)?;
        out.transfer_to_host(scale);
        Ok(status)
    }

    /// Route `src`'s output into `dst`'s input registers on-device,
    /// chaining two MVM passes without a host round trip.
    ///
    /// # Errors
    ///
    /// [`EscalarError::TileOutOfRange`] for an invalid tile;
    /// [`EscalarError::InvalidTileState`] unless `src` is `Computed` and
    /// `dst` has a resident matrix; [`EscalarError::Hardware`] on a
    /// non-zero status.
    pub fn move_vector(&mut self, src: TileId, dst: TileId) -> Result<RawStatus> {
        let started = Instant::now();
        self.ctx.move_vector(src, dst)?;
        let status = self.accel.move_vector(src.value(), dst.value());
        self.trace.record(
            MvmOp::MoveVector,
            src.value(),
            Some(dst.value()),
            self.ctx.vector_scale(dst).ok(),
            status,
            started.elapsed(),
        );
        self.check(MvmOp::MoveVector, status)
    }

    fn check(&self, op: MvmOp, status: RawStatus) -> Result<RawStatus> {
        if status == STATUS_OK {
            Ok(status)
        } else {
            Err(EscalarError::Hardware { op, status })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAccelerator;

    fn driver() -> MvmDriver<MockAccelerator> {
        MvmDriver::with_trace(MockAccelerator::new(2), 2, TraceConfig::enabled())
    }

    fn identity_setup(d: &mut MvmDriver<MockAccelerator>, tile: TileId) {
        let mut mat: AnalogMatrix<'_, f32, i8> =
            AnalogMatrix::from_vec(2, 2, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let mut vin: AnalogVector<'_, f32, i8> =
            AnalogVector::from_vec(vec![1.0, -1.0]).unwrap();
        d.set_matrix(&mut mat, tile).unwrap();
        d.load_vector(&mut vin, tile).unwrap();
    }

    #[test]
    fn test_sequenced_states() {
        let mut d = driver();
        let t = TileId::new(0);
        identity_setup(&mut d, t);
        assert_eq!(d.context().state(t).unwrap(), TileState::VectorLoaded);
        d.compute(t).unwrap();
        assert_eq!(d.context().state(t).unwrap(), TileState::Computed);
        let mut out: AnalogVector<'_, f32, i32> = AnalogVector::zeros(2).unwrap();
        d.store_vector(&mut out, t).unwrap();
        assert_eq!(d.context().state(t).unwrap(), TileState::Stored);
    }

    #[test]
    fn test_compute_out_of_order_is_typed_error() {
        let mut d = driver();
        let err = d.compute(TileId::new(0)).unwrap_err();
        assert!(matches!(err, EscalarError::InvalidTileState { .. }));
    }

    #[test]
    fn test_hardware_status_propagates_raw() {
        let mut d = driver();
        let t = TileId::new(0);
        identity_setup(&mut d, t);
        d.accelerator_mut().fail_next(MvmOp::Compute, 0x0042);
        let err = d.compute(t).unwrap_err();
        assert_eq!(
            err,
            EscalarError::Hardware {
                op: MvmOp::Compute,
                status: 0x0042
            }
        );
        // Failed compute leaves the tile ready for re-issue by the caller.
        assert_eq!(d.context().state(t).unwrap(), TileState::VectorLoaded);
        d.compute(t).unwrap();
    }

    #[test]
    fn test_out_of_range_tile_never_reaches_hardware() {
        let mut d = driver();
        let mut mat: AnalogMatrix<'_, f32, i8> =
            AnalogMatrix::from_vec(1, 1, vec![1.0]).unwrap();
        let err = d.set_matrix(&mut mat, TileId::new(9)).unwrap_err();
        assert!(matches!(err, EscalarError::TileOutOfRange { .. }));
        // The context guard fires before instruction issue.
        assert!(d.trace().events().is_empty());
    }

    #[test]
    fn test_store_failure_leaves_host_untouched() {
        let mut d = driver();
        let t = TileId::new(0);
        identity_setup(&mut d, t);
        d.compute(t).unwrap();
        let mut out: AnalogVector<'_, f32, i32> =
            AnalogVector::from_vec(vec![9.0, 9.0]).unwrap();
        d.accelerator_mut().fail_next(MvmOp::StoreVector, 1);
        assert!(d.store_vector(&mut out, t).is_err());
        assert_eq!(out.host(), &[9.0, 9.0]);
    }

    #[test]
    fn test_trace_captures_instructions() {
        let mut d = driver();
        let t = TileId::new(0);
        identity_setup(&mut d, t);
        d.compute(t).unwrap();
        let ops: Vec<MvmOp> = d.trace().events().iter().map(|e| e.op).collect();
        assert_eq!(ops, [MvmOp::SetMatrix, MvmOp::LoadVector, MvmOp::Compute]);
        // Compute event carries the derived output scale.
        assert!(d.trace().events()[2].scale.unwrap() > 0.0);
    }
}
