//! Structured tracing of issued tile instructions
//!
//! Every instruction the driver issues can be captured as a serializable
//! event: which operation, which tile, the scale in effect, the raw status
//! flag, and wall-clock latency. Events accumulate in memory and export as
//! JSON - useful for bringup against a simulator, and for diffing two runs
//! instruction-by-instruction.
//!
//! Tracing is off by default and filtered per operation:
//!
//! ```
//! use escalar::trace::TraceConfig;
//!
//! let config = TraceConfig::enabled();
//! assert!(config.should_trace(escalar::MvmOp::Compute));
//!
//! let only_compute = TraceConfig {
//!     steps: TraceConfig::parse_steps("compute,store_vector"),
//!     ..TraceConfig::enabled()
//! };
//! assert!(!only_compute.should_trace(escalar::MvmOp::SetMatrix));
//! ```

use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::accel::{MvmOp, RawStatus};

/// Trace configuration
#[derive(Debug, Clone, Default)]
pub struct TraceConfig {
    /// Whether tracing is enabled
    pub enabled: bool,
    /// Which operations to trace (empty = all)
    pub steps: HashSet<MvmOp>,
    /// Output file path for the JSON trace (None = caller handles output)
    pub output: Option<PathBuf>,
}

impl TraceConfig {
    /// Create a config with tracing enabled for all operations.
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    /// Whether an operation should be traced.
    #[must_use]
    pub fn should_trace(&self, op: MvmOp) -> bool {
        self.enabled && (self.steps.is_empty() || self.steps.contains(&op))
    }

    /// Parse an operation filter from a comma-separated list
    /// (`"compute,store_vector"`). Unknown names are ignored.
    #[must_use]
    pub fn parse_steps(s: &str) -> HashSet<MvmOp> {
        s.split(',')
            .filter_map(|name| match name.trim() {
                "set_matrix" => Some(MvmOp::SetMatrix),
                "load_vector" => Some(MvmOp::LoadVector),
                "compute" => Some(MvmOp::Compute),
                "store_vector" => Some(MvmOp::StoreVector),
                "move_vector" => Some(MvmOp::MoveVector),
                _ => None,
            })
            .collect()
    }
}

/// One issued tile instruction.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    /// Operation issued
    pub op: MvmOp,
    /// Target tile
    pub tile: u32,
    /// Destination tile (move_vector only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_tile: Option<u32>,
    /// Scale in effect for the operation, when one applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// Raw status flag returned by the hardware
    pub status: RawStatus,
    /// Wall-clock latency of the operation in microseconds
    pub elapsed_us: u64,
}

/// Accumulated instruction trace for one driver.
#[derive(Debug, Default)]
pub struct DriverTrace {
    config: TraceConfig,
    events: Vec<TraceEvent>,
}

impl DriverTrace {
    /// Create a trace with the given configuration.
    #[must_use]
    pub fn new(config: TraceConfig) -> Self {
        Self {
            config,
            events: Vec::new(),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Record one issued instruction, honoring the step filter.
    #[allow(clippy::cast_possible_truncation)] // u128 -> u64 microseconds
    pub fn record(
        &mut self,
        op: MvmOp,
        tile: u32,
        dst_tile: Option<u32>,
        scale: Option<f64>,
        status: RawStatus,
        elapsed: Duration,
    ) {
        if !self.config.should_trace(op) {
            return;
        }
        self.events.push(TraceEvent {
            op,
            tile,
            dst_tile,
            scale,
            status,
            elapsed_us: elapsed.as_micros() as u64,
        });
    }

    /// Events captured so far.
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Serialize the captured events as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json` error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }

    /// Write the JSON trace to the configured output path.
    ///
    /// # Errors
    ///
    /// I/O or serialization failure. A missing output path is an error;
    /// call [`Self::to_json`] for in-memory export instead.
    pub fn write_json(&self) -> std::io::Result<()> {
        let Some(path) = &self.config.output else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no trace output path configured",
            ));
        };
        let json = self.to_json().map_err(std::io::Error::other)?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        let config = TraceConfig::default();
        assert!(!config.should_trace(MvmOp::Compute));
    }

    #[test]
    fn test_enabled_traces_all() {
        let config = TraceConfig::enabled();
        assert!(config.should_trace(MvmOp::SetMatrix));
        assert!(config.should_trace(MvmOp::MoveVector));
    }

    #[test]
    fn test_parse_steps() {
        let steps = TraceConfig::parse_steps("compute, store_vector, bogus");
        assert_eq!(steps.len(), 2);
        assert!(steps.contains(&MvmOp::Compute));
        assert!(steps.contains(&MvmOp::StoreVector));
    }

    #[test]
    fn test_step_filter() {
        let config = TraceConfig {
            steps: TraceConfig::parse_steps("compute"),
            ..TraceConfig::enabled()
        };
        assert!(config.should_trace(MvmOp::Compute));
        assert!(!config.should_trace(MvmOp::LoadVector));
    }

    #[test]
    fn test_record_honors_filter() {
        let mut trace = DriverTrace::new(TraceConfig {
            steps: TraceConfig::parse_steps("compute"),
            ..TraceConfig::enabled()
        });
        trace.record(MvmOp::Compute, 0, None, Some(6.0), 0, Duration::from_micros(3));
        trace.record(MvmOp::SetMatrix, 0, None, None, 0, Duration::from_micros(1));
        assert_eq!(trace.events().len(), 1);
        assert_eq!(trace.events()[0].op, MvmOp::Compute);
        assert_eq!(trace.events()[0].elapsed_us, 3);
    }

    #[test]
    fn test_json_export() {
        let mut trace = DriverTrace::new(TraceConfig::enabled());
        trace.record(MvmOp::StoreVector, 1, None, Some(0.5), 0, Duration::ZERO);
        let json = trace.to_json().unwrap();
        assert!(json.contains("\"StoreVector\""));
        assert!(json.contains("\"tile\": 1"));
        // Unset optional fields are omitted entirely
        assert!(!json.contains("dst_tile"));
    }
}
