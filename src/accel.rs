//! Accelerator instruction boundary
//!
//! The analog tile array is reached through five instructions, each a single
//! blocking hardware call that returns a status flag. This module defines
//! that boundary as a trait; the instruction encoding behind it (inline
//! assembly, MMIO, simulator IPC) is the implementor's business.
//!
//! Status semantics are defined by the hardware: `0` is success and any
//! other value is an uninterpreted failure code. The driver propagates
//! non-zero flags unmodified and never retries.

use serde::Serialize;

use crate::element::DeviceElement;

/// Raw status flag returned by every tile instruction.
pub type RawStatus = u16;

/// Status flag value indicating success.
pub const STATUS_OK: RawStatus = 0;

/// The five tile instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MvmOp {
    /// Program a quantized matrix into a tile's crossbar.
    SetMatrix,
    /// Load a quantized input vector into a tile.
    LoadVector,
    /// Run one matrix-vector pass on a tile.
    Compute,
    /// Read a tile's output vector back into a device buffer.
    StoreVector,
    /// Route one tile's output into another tile's input registers.
    MoveVector,
}

/// Low-level interface to the analog tile array.
///
/// Every method is a blocking call that returns only after the tile has
/// completed the requested action. A hung tile blocks the caller
/// indefinitely; there are no timeout or cancellation semantics at this
/// boundary. Implementations receive device-native buffers exactly as the
/// containers quantized them.
pub trait AnalogAccelerator {
    /// Program `data` (row-major, device geometry) into `tile`'s crossbar.
    fn set_matrix<Q: DeviceElement>(&mut self, tile: u32, data: &[Q]) -> RawStatus;

    /// Load `data` into `tile`'s input registers.
    fn load_vector<Q: DeviceElement>(&mut self, tile: u32, data: &[Q]) -> RawStatus;

    /// Run one MVM pass on `tile`.
    fn compute(&mut self, tile: u32) -> RawStatus;

    /// Copy `tile`'s output registers into `out`.
    fn store_vector<Q: DeviceElement>(&mut self, tile: u32, out: &mut [Q]) -> RawStatus;

    /// Route `src`'s output registers into `dst`'s input registers without a
    /// host round trip.
    fn move_vector(&mut self, src: u32, dst: u32) -> RawStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ok_is_zero() {
        assert_eq!(STATUS_OK, 0);
    }

    #[test]
    fn test_op_serializes() {
        let json = serde_json::to_string(&MvmOp::SetMatrix).unwrap();
        assert_eq!(json, "\"SetMatrix\"");
    }
}
