//! Software emulation of the analog tile array
//!
//! [`MockAccelerator`] implements [`AnalogAccelerator`] entirely in memory:
//! matrices and vectors land in per-tile registers as exact f64 copies of
//! their device-unit values, and `compute` performs the matrix-vector
//! multiply the crossbar would. This is the backend for driver tests,
//! host-only bringup, and the demo programs - device-unit arithmetic is
//! exact, so a mocked pipeline reproduces hardware scale behavior
//! bit-for-bit on the integer path.
//!
//! Failure injection (`fail_next`) returns an arbitrary status flag from the
//! next matching instruction, for exercising the driver's propagation path.

use crate::accel::{AnalogAccelerator, MvmOp, RawStatus, STATUS_OK};
use crate::device::TileGeometry;
use crate::element::DeviceElement;

/// Status returned by the mock for an out-of-range tile id.
pub const MOCK_STATUS_BAD_TILE: RawStatus = 0xBAD;

#[derive(Debug, Clone)]
struct MockTile {
    matrix: Vec<f64>,
    input: Vec<f64>,
    output: Vec<f64>,
}

impl MockTile {
    fn new(geometry: TileGeometry) -> Self {
        Self {
            matrix: vec![0.0; geometry.cells()],
            input: vec![0.0; geometry.cols],
            output: vec![0.0; geometry.cols],
        }
    }
}

/// In-memory stand-in for the tile array.
#[derive(Debug)]
pub struct MockAccelerator {
    geometry: TileGeometry,
    tiles: Vec<MockTile>,
    fail_next: Option<(MvmOp, RawStatus)>,
}

impl MockAccelerator {
    /// Create a mock array with `num_tiles` tiles at the compiled-in device
    /// geometry.
    #[must_use]
    pub fn new(num_tiles: usize) -> Self {
        Self::with_geometry(num_tiles, TileGeometry::device())
    }

    /// Create a mock array with an explicit geometry (for emulating other
    /// hardware generations in tests).
    #[must_use]
    pub fn with_geometry(num_tiles: usize, geometry: TileGeometry) -> Self {
        Self {
            geometry,
            tiles: (0..num_tiles).map(|_| MockTile::new(geometry)).collect(),
            fail_next: None,
        }
    }

    /// Make the next instruction matching `op` return `status` instead of
    /// executing.
    pub fn fail_next(&mut self, op: MvmOp, status: RawStatus) {
        self.fail_next = Some((op, status));
    }

    /// Raw output registers of `tile`, in device units.
    #[must_use]
    pub fn output_registers(&self, tile: u32) -> Option<&[f64]> {
        self.tiles.get(tile as usize).map(|t| t.output.as_slice())
    }

    fn injected(&mut self, op: MvmOp) -> Option<RawStatus> {
        match self.fail_next {
            Some((fail_op, status)) if fail_op == op => {
                self.fail_next = None;
                Some(status)
            }
            _ => None,
        }
    }
}

impl AnalogAccelerator for MockAccelerator {
    fn set_matrix<Q: DeviceElement>(&mut self, tile: u32, data: &[Q]) -> RawStatus {
        if let Some(status) = self.injected(MvmOp::SetMatrix) {
            return status;
        }
        let Some(t) = self.tiles.get_mut(tile as usize) else {
            return MOCK_STATUS_BAD_TILE;
        };
        t.matrix.fill(0.0);
        for (cell, q) in t.matrix.iter_mut().zip(data.iter()) {
            *cell = q.to_f64();
        }
        STATUS_OK
    }

    fn load_vector<Q: DeviceElement>(&mut self, tile: u32, data: &[Q]) -> RawStatus {
        if let Some(status) = self.injected(MvmOp::LoadVector) {
            return status;
        }
        let Some(t) = self.tiles.get_mut(tile as usize) else {
            return MOCK_STATUS_BAD_TILE;
        };
        t.input.fill(0.0);
        for (reg, q) in t.input.iter_mut().zip(data.iter()) {
            *reg = q.to_f64();
        }
        STATUS_OK
    }

    fn compute(&mut self, tile: u32) -> RawStatus {
        if let Some(status) = self.injected(MvmOp::Compute) {
            return status;
        }
        let Some(t) = self.tiles.get_mut(tile as usize) else {
            return MOCK_STATUS_BAD_TILE;
        };
        let (rows, cols) = (self.geometry.rows, self.geometry.cols);
        t.output.fill(0.0);
        for r in 0..rows.min(cols) {
            let row = &t.matrix[r * cols..(r + 1) * cols];
            t.output[r] = row.iter().zip(t.input.iter()).map(|(m, v)| m * v).sum();
        }
        STATUS_OK
    }

    fn store_vector<Q: DeviceElement>(&mut self, tile: u32, out: &mut [Q]) -> RawStatus {
        if let Some(status) = self.injected(MvmOp::StoreVector) {
            return status;
        }
        let Some(t) = self.tiles.get(tile as usize) else {
            return MOCK_STATUS_BAD_TILE;
        };
        for (o, reg) in out.iter_mut().zip(t.output.iter()) {
            *o = Q::from_f64(*reg);
        }
        STATUS_OK
    }

    fn move_vector(&mut self, src: u32, dst: u32) -> RawStatus {
        if let Some(status) = self.injected(MvmOp::MoveVector) {
            return status;
        }
        if src as usize >= self.tiles.len() || dst as usize >= self.tiles.len() {
            return MOCK_STATUS_BAD_TILE;
        }
        let output = self.tiles[src as usize].output.clone();
        self.tiles[dst as usize].input = output;
        STATUS_OK
    }
}
