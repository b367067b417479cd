//! Error types for the escalar driver
//!
//! All fallible operations return [`Result`]. Resource exhaustion,
//! precondition violations, and hardware-reported failures are distinct
//! variants so callers can react to each taxon; hardware status flags are
//! carried raw and uninterpreted.

use thiserror::Error;

use crate::accel::{MvmOp, RawStatus};
use crate::context::TileState;

/// Error type for all escalar operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EscalarError {
    /// Host shape is invalid or does not fit the device geometry
    #[error("Invalid shape: {reason}")]
    InvalidShape {
        /// What was wrong with the shape
        reason: String,
    },

    /// Buffer allocation failed
    #[error("Out of memory: failed to allocate {requested_bytes} bytes for {buffer}")]
    OutOfMemory {
        /// Size of the failed allocation
        requested_bytes: usize,
        /// Which buffer was being allocated
        buffer: &'static str,
    },

    /// Requested transfer policy is not defined for the element types
    #[error("Unsupported quantization: {reason}")]
    UnsupportedQuantization {
        /// Why the type combination is rejected
        reason: String,
    },

    /// Tile id is outside the context's slot table
    #[error("Tile {tile} out of range: context has {num_tiles} tiles")]
    TileOutOfRange {
        /// Offending tile id
        tile: u32,
        /// Number of tiles in the context
        num_tiles: usize,
    },

    /// Tile is not in a state that permits the requested operation
    #[error("Tile {tile} is {state:?}, operation requires {expected}")]
    InvalidTileState {
        /// Offending tile id
        tile: u32,
        /// State the tile was actually in
        state: TileState,
        /// What the operation required
        expected: &'static str,
    },

    /// The accelerator reported a non-zero status flag
    ///
    /// The flag's meaning is defined by the hardware, not this driver; it is
    /// propagated unmodified and never retried.
    #[error("Hardware failure: {op:?} returned status {status}")]
    Hardware {
        /// Operation that failed
        op: MvmOp,
        /// Raw status flag as returned by the tile
        status: RawStatus,
    },
}

/// Result type alias for escalar operations
pub type Result<T> = std::result::Result<T, EscalarError>;
