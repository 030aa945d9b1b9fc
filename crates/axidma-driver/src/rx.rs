//! Bounds-checked, completion-gated view over the receive window.
//!
//! The DMA engine writes into the window asynchronously; a read of a slot
//! before its transfer has been confirmed complete is a data race, so the
//! API refuses it. Confirmation is recorded per transfer, in issue order,
//! by whoever drives the synchronizer (normally the capture session).

use crate::error::{AxiDmaError, Result};
use crate::mem::MappedRegion;
use crate::regio::RegisterIo;
use axidma_chip::layout::RxLayout;

/// The receive window plus its layout and completion bookkeeping.
#[derive(Debug)]
pub struct RxBuffer {
    window: MappedRegion,
    layout: RxLayout,
    completed: usize,
}

impl RxBuffer {
    /// Wrap a mapped window with a capture layout.
    ///
    /// # Errors
    ///
    /// Returns [`AxiDmaError::WindowTooSmall`] if the layout does not fit
    /// the mapping.
    pub fn new(window: MappedRegion, layout: RxLayout) -> Result<Self> {
        if layout.required_len() > window.len() {
            return Err(AxiDmaError::WindowTooSmall {
                required: layout.required_len(),
                actual: window.len(),
            });
        }

        Ok(Self {
            window,
            layout,
            completed: 0,
        })
    }

    /// The capture layout.
    #[must_use]
    pub const fn layout(&self) -> RxLayout {
        self.layout
    }

    /// Transfers confirmed complete so far.
    #[must_use]
    pub const fn completed(&self) -> usize {
        self.completed
    }

    /// Physical base address of the window.
    #[must_use]
    pub const fn phys_base(&self) -> u64 {
        self.window.phys_base()
    }

    /// The DMA engine's side of the window; simulated captures write their
    /// sample data through this.
    pub fn window_mut(&mut self) -> &mut MappedRegion {
        &mut self.window
    }

    /// Pre-fill the window with `byte`.
    pub fn fill(&mut self, byte: u8) {
        self.window.fill(byte);
    }

    /// Record that the synchronizer confirmed the next transfer in issue
    /// order, unlocking reads of its block.
    ///
    /// # Panics
    ///
    /// Panics when called more times than the layout has transfers; that is
    /// a sequencing bug in the caller.
    pub fn mark_completed(&mut self) {
        assert!(
            self.completed < self.layout.num_transfers(),
            "more completions than transfers in the layout"
        );
        self.completed += 1;
    }

    fn check_confirmed(&self, transfer: usize) -> Result<()> {
        if transfer >= self.completed {
            return Err(AxiDmaError::NotCompleted {
                transfer,
                completed: self.completed,
            });
        }
        Ok(())
    }

    /// Read one confirmed sample slot.
    ///
    /// # Errors
    ///
    /// - [`AxiDmaError::IndexOutOfRange`] outside the configured grid.
    /// - [`AxiDmaError::NotCompleted`] for a transfer the synchronizer has
    ///   not yet confirmed.
    pub fn sample(&self, transfer: usize, sample: usize) -> Result<u32> {
        let offset = self.layout.slot_offset(transfer, sample).ok_or(
            AxiDmaError::IndexOutOfRange {
                transfer,
                sample,
                transfers: self.layout.num_transfers(),
                samples: self.layout.samples_per_transfer(),
            },
        )?;

        self.check_confirmed(transfer)?;
        Ok(self.window.read32(offset))
    }

    /// Copy one confirmed transfer block out as sample words.
    ///
    /// # Errors
    ///
    /// Same conditions as [`sample`](RxBuffer::sample).
    pub fn transfer_samples(&self, transfer: usize) -> Result<Vec<u32>> {
        let offset =
            self.layout
                .transfer_offset(transfer)
                .ok_or(AxiDmaError::IndexOutOfRange {
                    transfer,
                    sample: 0,
                    transfers: self.layout.num_transfers(),
                    samples: self.layout.samples_per_transfer(),
                })?;

        self.check_confirmed(transfer)?;

        let mut words = vec![0u32; self.layout.samples_per_transfer()];
        self.window
            .read_bytes(offset, bytemuck::cast_slice_mut(&mut words));
        Ok(words)
    }
}
