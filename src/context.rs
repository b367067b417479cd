//! Tile-slot bookkeeping and scale propagation
//!
//! The context is the coordination table for a fixed number of hardware tile
//! slots. Each slot carries a lifecycle state and three scalar scales: the
//! resident matrix's, the loaded input vector's, and - after a compute - the
//! derived output scale `matrix x vector` (the fixed-point rescale law of
//! one MVM pass: quantized values are proportional to
//! `true_value / scale * MAX_LIMIT`, so multiplying two quantized operands
//! multiplies their implicit scales).
//!
//! The context stores scale snapshots taken at set/load time; it never holds
//! tensor data or references. Every accessor and mutator validates the tile
//! id and fails with [`EscalarError::TileOutOfRange`] - out-of-range writes
//! are never silently dropped.

use serde::Serialize;

use crate::error::{EscalarError, Result};

/// Lifecycle state of one tile slot.
///
/// ```text
/// Empty -> MatrixResident -> VectorLoaded -> Computed -> Stored
///                                                     \-> Chained
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TileState {
    /// No matrix programmed.
    Empty,
    /// A matrix is programmed; no input vector yet.
    MatrixResident,
    /// Matrix and input vector are resident; ready to compute.
    VectorLoaded,
    /// An MVM pass has completed; the output scale is valid.
    Computed,
    /// The output has been read back to the host. The slot stays readable
    /// but is considered drained.
    Stored,
    /// The output was routed on-device into another tile. The slot cannot
    /// serve as a compute or store source without reloading.
    Chained,
}

/// Validated index of one hardware tile slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TileId(u32);

impl TileId {
    /// Wrap a raw tile index. Range validation happens against the owning
    /// context on every operation.
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Raw index value.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for TileId {
    fn from(index: u32) -> Self {
        Self::new(index)
    }
}

/// Per-slot bookkeeping record.
#[derive(Debug, Clone, Copy)]
struct TileSlot {
    state: TileState,
    matrix_scale: f64,
    vector_scale: f64,
    output_scale: f64,
}

impl TileSlot {
    fn new() -> Self {
        Self {
            state: TileState::Empty,
            matrix_scale: 1.0,
            vector_scale: 1.0,
            output_scale: 1.0,
        }
    }
}

/// Scale-factor and lifecycle table for the tile array.
///
/// The slot count is fixed at construction (`num_arrays` of the target
/// board). A context is driven by a single controlling thread; concurrent
/// access must be serialized by the caller.
#[derive(Debug)]
pub struct TileContext {
    slots: Vec<TileSlot>,
}

impl TileContext {
    /// Create a context for `num_tiles` tile slots, all `Empty`.
    #[must_use]
    pub fn new(num_tiles: usize) -> Self {
        Self {
            slots: vec![TileSlot::new(); num_tiles],
        }
    }

    /// Number of tile slots.
    #[must_use]
    pub fn num_tiles(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, tile: TileId) -> Result<&TileSlot> {
        self.slots
            .get(tile.value() as usize)
            .ok_or(EscalarError::TileOutOfRange {
                tile: tile.value(),
                num_tiles: self.slots.len(),
            })
    }

    fn slot_mut(&mut self, tile: TileId) -> Result<&mut TileSlot> {
        let num_tiles = self.slots.len();
        self.slots
            .get_mut(tile.value() as usize)
            .ok_or(EscalarError::TileOutOfRange {
                tile: tile.value(),
                num_tiles,
            })
    }

    /// Current state of `tile`.
    ///
    /// # Errors
    ///
    /// [`EscalarError::TileOutOfRange`] for an invalid id.
    pub fn state(&self, tile: TileId) -> Result<TileState> {
        Ok(self.slot(tile)?.state)
    }

    /// Effective scale of the matrix resident on `tile`.
    ///
    /// # Errors
    ///
    /// [`EscalarError::TileOutOfRange`] for an invalid id.
    pub fn matrix_scale(&self, tile: TileId) -> Result<f64> {
        Ok(self.slot(tile)?.matrix_scale)
    }

    /// Effective scale of the input vector loaded on `tile`.
    ///
    /// # Errors
    ///
    /// [`EscalarError::TileOutOfRange`] for an invalid id.
    pub fn vector_scale(&self, tile: TileId) -> Result<f64> {
        Ok(self.slot(tile)?.vector_scale)
    }

    /// Output scale of `tile`'s last compute (valid in `Computed`, `Stored`,
    /// and `Chained`).
    ///
    /// # Errors
    ///
    /// [`EscalarError::TileOutOfRange`] for an invalid id.
    pub fn output_scale(&self, tile: TileId) -> Result<f64> {
        Ok(self.slot(tile)?.output_scale)
    }

    /// Record a matrix with effective scale `scale` as resident on `tile`.
    ///
    /// Allowed in any state (overwriting is idempotent); any previously
    /// loaded vector or computed output is invalidated.
    ///
    /// # Errors
    ///
    /// [`EscalarError::TileOutOfRange`] for an invalid id.
    pub fn set_matrix(&mut self, tile: TileId, scale: f64) -> Result<()> {
        let slot = self.slot_mut(tile)?;
        slot.matrix_scale = scale;
        slot.vector_scale = 1.0;
        slot.output_scale = 1.0;
        slot.state = TileState::MatrixResident;
        Ok(())
    }

    /// Record an input vector with effective scale `scale` on `tile`.
    ///
    /// # Errors
    ///
    /// [`EscalarError::TileOutOfRange`] for an invalid id;
    /// [`EscalarError::InvalidTileState`] if no matrix is resident.
    pub fn load_vector(&mut self, tile: TileId, scale: f64) -> Result<()> {
        let slot = self.slot_mut(tile)?;
        if slot.state == TileState::Empty {
            return Err(EscalarError::InvalidTileState {
                tile: tile.value(),
                state: slot.state,
                expected: "a resident matrix",
            });
        }
        slot.vector_scale = scale;
        slot.state = TileState::VectorLoaded;
        Ok(())
    }

    /// Derive and record `tile`'s output scale after a completed MVM pass.
    ///
    /// Returns the new output scale, `matrix_scale x vector_scale`.
    ///
    /// # Errors
    ///
    /// [`EscalarError::TileOutOfRange`] for an invalid id;
    /// [`EscalarError::InvalidTileState`] unless the tile is
    /// `VectorLoaded`.
    pub fn record_compute(&mut self, tile: TileId) -> Result<f64> {
        let slot = self.slot_mut(tile)?;
        if slot.state != TileState::VectorLoaded {
            return Err(EscalarError::InvalidTileState {
                tile: tile.value(),
                state: slot.state,
                expected: "VectorLoaded",
            });
        }
        slot.output_scale = slot.matrix_scale * slot.vector_scale;
        slot.state = TileState::Computed;
        Ok(slot.output_scale)
    }

    /// Read `tile`'s output scale for a host store and mark the slot
    /// drained.
    ///
    /// A `Stored` slot stays readable, so repeated stores are permitted.
    ///
    /// # Errors
    ///
    /// [`EscalarError::TileOutOfRange`] for an invalid id;
    /// [`EscalarError::InvalidTileState`] unless the tile is `Computed` or
    /// `Stored`.
    pub fn record_store(&mut self, tile: TileId) -> Result<f64> {
        let slot = self.slot_mut(tile)?;
        match slot.state {
            TileState::Computed | TileState::Stored => {
                slot.state = TileState::Stored;
                Ok(slot.output_scale)
            }
            state => Err(EscalarError::InvalidTileState {
                tile: tile.value(),
                state,
                expected: "Computed or Stored",
            }),
        }
    }

    /// Transplant `src`'s post-compute output into `dst`'s input-vector
    /// slot, without a host round trip.
    ///
    /// After this, `dst`'s input-vector scale equals `src`'s output scale
    /// and `src` can no longer serve as a compute or store source without
    /// reloading. `src == dst` feeds a tile's output back into its own
    /// input.
    ///
    /// # Errors
    ///
    /// [`EscalarError::TileOutOfRange`] for an invalid id;
    /// [`EscalarError::InvalidTileState`] unless `src` is `Computed` and
    /// `dst` has a resident matrix.
    pub fn move_vector(&mut self, src: TileId, dst: TileId) -> Result<()> {
        let src_state = self.state(src)?;
        let dst_state = self.state(dst)?;
        if src_state != TileState::Computed {
            return Err(EscalarError::InvalidTileState {
                tile: src.value(),
                state: src_state,
                expected: "Computed",
            });
        }
        if dst_state == TileState::Empty {
            return Err(EscalarError::InvalidTileState {
                tile: dst.value(),
                state: dst_state,
                expected: "a resident matrix",
            });
        }
        let output_scale = self.slots[src.value() as usize].output_scale;
        if src != dst {
            self.slots[src.value() as usize].state = TileState::Chained;
        }
        let dst_slot = &mut self.slots[dst.value() as usize];
        dst_slot.vector_scale = output_scale;
        dst_slot.state = TileState::VectorLoaded;
        Ok(())
    }
}
