//! One capture run: issue each transfer, await it, account for the bytes.

use crate::error::Result;
use crate::regio::RegisterIo;
use crate::rx::RxBuffer;
use crate::s2mm::{S2mmChannel, Transfer};
use tracing::{debug, info};

/// Byte the receive window is pre-filled with before a run, so stale data
/// is distinguishable from slots the engine never wrote.
const PREFILL: u8 = 0xAB;

/// Accounting for a finished capture run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureStats {
    /// Transfers confirmed complete.
    pub transfers: usize,
    /// Bytes the hardware reported moving, summed over all transfers.
    pub bytes: u64,
    /// Bytes the layout asked for.
    pub expected_bytes: u64,
}

impl CaptureStats {
    /// Fraction of the requested bytes actually transferred.
    #[must_use]
    pub fn completeness(&self) -> f64 {
        if self.expected_bytes == 0 {
            return 1.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.bytes as f64 / self.expected_bytes as f64
        }
    }
}

/// Drives a channel and a receive buffer through one capture run.
#[derive(Debug)]
pub struct CaptureSession<R: RegisterIo> {
    channel: S2mmChannel<R>,
    rx: RxBuffer,
}

impl<R: RegisterIo> CaptureSession<R> {
    /// Pair a channel with its receive buffer.
    pub fn new(channel: S2mmChannel<R>, rx: RxBuffer) -> Self {
        Self { channel, rx }
    }

    /// The receive buffer, for reading confirmed samples.
    #[must_use]
    pub const fn rx(&self) -> &RxBuffer {
        &self.rx
    }

    /// Mutable access to the receive buffer.
    pub fn rx_mut(&mut self) -> &mut RxBuffer {
        &mut self.rx
    }

    /// The channel, for status inspection.
    #[must_use]
    pub const fn channel(&self) -> &S2mmChannel<R> {
        &self.channel
    }

    /// Run every transfer in the layout: issue, poll to completion, confirm
    /// the block, move to the next. The window is pre-filled first.
    ///
    /// Stops at the first hardware error or timeout; blocks confirmed
    /// before the failure stay readable.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::AxiDmaError`] from descriptor validation,
    /// issuing, or polling.
    ///
    /// # Panics
    ///
    /// Panics if the receive window lies beyond the 32-bit physical address
    /// space the destination register can name.
    pub fn run(&mut self) -> Result<CaptureStats> {
        let layout = self.rx.layout();
        let num_transfers = layout.num_transfers();
        let len = u32::try_from(layout.transfer_bytes()).unwrap_or(u32::MAX);

        self.rx.fill(PREFILL);
        debug!("receive window pre-filled, starting {num_transfers} transfers");

        let mut bytes_total = 0u64;
        for index in 0..num_transfers {
            let offset = layout.transfer_offset(index).expect("index within layout");
            let dest = u32::try_from(self.rx.phys_base() + offset as u64)
                .expect("receive window beyond 32-bit address space");

            let transfer = Transfer::new(dest, len)?;
            self.channel.issue(&transfer)?;
            let bytes = self.channel.wait_complete()?;
            self.rx.mark_completed();

            bytes_total += u64::from(bytes);
            debug!(
                "transfer {}/{num_transfers}: {bytes} bytes to {dest:#010x}",
                index + 1
            );
        }

        let stats = CaptureStats {
            transfers: num_transfers,
            bytes: bytes_total,
            expected_bytes: layout.required_len() as u64,
        };
        info!(
            "capture complete: {}/{} bytes ({:.1}%)",
            stats.bytes,
            stats.expected_bytes,
            stats.completeness() * 100.0
        );

        Ok(stats)
    }
}
