//! Receive-window layout arithmetic.
//!
//! The receive window is logically partitioned into `num_transfers`
//! consecutive blocks of `samples_per_transfer` 32-bit sample words. The
//! stride between blocks equals the block size; a slot is addressed by
//! `(transfer_index, sample_index)` and out-of-range indices are rejected,
//! never wrapped.

use crate::regs::SAMPLE_BYTES;

/// Layout of a capture run inside the receive window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxLayout {
    samples_per_transfer: usize,
    num_transfers: usize,
}

impl RxLayout {
    /// Create a layout.
    ///
    /// Both dimensions must be non-zero; a zero dimension is a programming
    /// error, not a configuration to support.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    #[must_use]
    pub const fn new(samples_per_transfer: usize, num_transfers: usize) -> Self {
        assert!(samples_per_transfer > 0, "zero samples per transfer");
        assert!(num_transfers > 0, "zero transfers");
        Self {
            samples_per_transfer,
            num_transfers,
        }
    }

    /// Samples in one transfer block.
    #[must_use]
    pub const fn samples_per_transfer(self) -> usize {
        self.samples_per_transfer
    }

    /// Number of transfer blocks.
    #[must_use]
    pub const fn num_transfers(self) -> usize {
        self.num_transfers
    }

    /// Bytes moved by a single transfer.
    #[must_use]
    pub const fn transfer_bytes(self) -> usize {
        self.samples_per_transfer * SAMPLE_BYTES as usize
    }

    /// Total sample slots in the whole run.
    #[must_use]
    pub const fn total_samples(self) -> usize {
        self.samples_per_transfer * self.num_transfers
    }

    /// Window length the whole run needs, in bytes.
    #[must_use]
    pub const fn required_len(self) -> usize {
        self.transfer_bytes() * self.num_transfers
    }

    /// Byte offset of one transfer block within the window, or `None` when
    /// the index is outside the layout.
    #[must_use]
    pub const fn transfer_offset(self, transfer: usize) -> Option<usize> {
        if transfer < self.num_transfers {
            Some(transfer * self.transfer_bytes())
        } else {
            None
        }
    }

    /// Byte offset of one sample slot, or `None` when either index is
    /// outside the layout.
    #[must_use]
    pub const fn slot_offset(self, transfer: usize, sample: usize) -> Option<usize> {
        if transfer < self.num_transfers && sample < self.samples_per_transfer {
            Some(transfer * self.transfer_bytes() + sample * SAMPLE_BYTES as usize)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_configuration_sizes() {
        // 16 samples of 4 bytes = 64 bytes per transfer.
        let layout = RxLayout::new(16, 10);
        assert_eq!(layout.transfer_bytes(), 64);
        assert_eq!(layout.total_samples(), 160);
        assert_eq!(layout.required_len(), 640);
    }

    #[test]
    fn slot_addressing_is_stride_times_transfer_plus_sample() {
        let layout = RxLayout::new(16, 10);
        assert_eq!(layout.slot_offset(0, 0), Some(0));
        assert_eq!(layout.slot_offset(0, 15), Some(60));
        assert_eq!(layout.slot_offset(1, 0), Some(64));
        assert_eq!(layout.slot_offset(9, 15), Some(9 * 64 + 60));
    }

    #[test]
    fn out_of_range_indices_rejected_not_wrapped() {
        let layout = RxLayout::new(16, 10);
        assert_eq!(layout.slot_offset(10, 0), None);
        assert_eq!(layout.slot_offset(0, 16), None);
        assert_eq!(layout.slot_offset(usize::MAX, 0), None);
        assert_eq!(layout.transfer_offset(10), None);
    }

    #[test]
    #[should_panic(expected = "zero samples per transfer")]
    fn zero_samples_is_a_contract_violation() {
        let _ = RxLayout::new(0, 10);
    }
}
