//! Error types for AXI DMA driver operations

use axidma_chip::status::S2mmStatus;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, AxiDmaError>;

/// Errors that can occur while driving the S2MM channel
#[derive(Debug, Error)]
pub enum AxiDmaError {
    /// A physical window could not be mapped; fatal to startup
    #[error("Cannot map {path}: {source}")]
    Mapping {
        /// Path that was being mapped
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The hardware raised one of its error flags during polling
    #[error("DMA hardware error, status {status}")]
    Hardware {
        /// The offending status snapshot
        status: S2mmStatus,
    },

    /// The channel never reached the completion state within the deadline
    #[error("Transfer incomplete after {elapsed_ms}ms, status {status}")]
    Timeout {
        /// Time spent polling, in milliseconds
        elapsed_ms: u64,
        /// Last status snapshot observed
        status: S2mmStatus,
    },

    /// Transfer length outside `[4, 65535]` or not a multiple of 4
    #[error("Invalid transfer length {len}: must be a multiple of 4 in 4..={max}")]
    InvalidLength {
        /// Requested length in bytes
        len: u32,
        /// Hardware maximum
        max: u32,
    },

    /// Destination address outside the mapped receive window
    #[error("Destination {dest:#010x}+{len} outside receive window {base:#010x}+{window_len}")]
    DestOutOfRange {
        /// Requested destination physical address
        dest: u32,
        /// Requested transfer length
        len: u32,
        /// Receive window physical base
        base: u64,
        /// Receive window length in bytes
        window_len: usize,
    },

    /// The mapped receive window is smaller than the layout needs
    #[error("Receive window too small: {actual} bytes mapped, layout needs {required}")]
    WindowTooSmall {
        /// Bytes the layout needs
        required: usize,
        /// Bytes actually mapped
        actual: usize,
    },

    /// Buffer slot index outside the configured layout
    #[error(
        "Sample index out of range: transfer {transfer}, sample {sample} \
         (layout is {transfers}x{samples})"
    )]
    IndexOutOfRange {
        /// Requested transfer index
        transfer: usize,
        /// Requested sample index
        sample: usize,
        /// Configured transfer count
        transfers: usize,
        /// Configured samples per transfer
        samples: usize,
    },

    /// Read attempted before the synchronizer confirmed that transfer
    #[error("Transfer {transfer} not yet confirmed complete ({completed} confirmed)")]
    NotCompleted {
        /// Requested transfer index
        transfer: usize,
        /// Transfers confirmed so far
        completed: usize,
    },
}

impl AxiDmaError {
    /// Create a mapping error
    pub fn mapping(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Mapping {
            path: path.into(),
            source,
        }
    }

    /// Create a hardware error carrying the offending snapshot
    pub const fn hardware(status: S2mmStatus) -> Self {
        Self::Hardware { status }
    }

    /// Create a timeout error carrying the last snapshot observed
    pub const fn timeout(elapsed_ms: u64, status: S2mmStatus) -> Self {
        Self::Timeout { elapsed_ms, status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_error_carries_snapshot() {
        let status = S2mmStatus::from_raw(0x0000_1032);
        let err = AxiDmaError::hardware(status);

        match err {
            AxiDmaError::Hardware { status: s } => {
                assert!(s.dma_slave_err());
                assert!(s.ioc_irq());
            }
            other => panic!("expected Hardware, got {other:?}"),
        }
    }

    #[test]
    fn display_includes_decoded_flags() {
        let err = AxiDmaError::hardware(S2mmStatus::from_raw(0x0000_0040));
        let text = format!("{err}");
        assert!(text.contains("dma_decode_err"));
    }

    #[test]
    fn timeout_reports_elapsed() {
        let err = AxiDmaError::timeout(1500, S2mmStatus::from_raw(0));
        assert!(format!("{err}").contains("1500ms"));
    }
}
