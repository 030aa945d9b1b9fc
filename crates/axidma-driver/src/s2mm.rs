//! S2MM channel state machine: issue transfers and poll for completion.
//!
//! The channel is single-outstanding in direct mode: one transfer is
//! issued, then polled to completion before the next. The only
//! happens-before edge between the DMA engine's stores and the controlling
//! thread's buffer reads is the completion observation made here.

use crate::error::{AxiDmaError, Result};
use crate::regio::RegisterIo;
use axidma_chip::regs::{self, control, ControlCommand, MAX_TRANSFER_LEN, SAMPLE_BYTES};
use axidma_chip::status::S2mmStatus;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// One S2MM transfer: destination physical address plus length in bytes.
///
/// Construction validates the length contract (positive multiple of the
/// sample width, within the hardware maximum) so an invalid descriptor can
/// never reach a register write. The destination range is validated by the
/// channel, which knows the mapped receive window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    dest: u32,
    len: u32,
}

impl Transfer {
    /// Create a transfer descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`AxiDmaError::InvalidLength`] unless `len` is a positive
    /// multiple of 4 no larger than 65535.
    pub fn new(dest: u32, len: u32) -> Result<Self> {
        if len == 0 || len > MAX_TRANSFER_LEN || len % SAMPLE_BYTES != 0 {
            return Err(AxiDmaError::InvalidLength {
                len,
                max: MAX_TRANSFER_LEN,
            });
        }

        Ok(Self { dest, len })
    }

    /// Destination physical address.
    #[must_use]
    pub const fn dest(&self) -> u32 {
        self.dest
    }

    /// Transfer length in bytes.
    #[must_use]
    pub const fn len_bytes(&self) -> u32 {
        self.len
    }
}

/// Channel configuration progress.
///
/// The hardware must be reset, halted, and have its interrupt enables
/// written exactly once, before the first run; re-resetting between
/// transfers would drop the configuration the rest of the run relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No transfer issued yet; the first `issue` will configure the channel.
    Uninitialized,
    /// Reset/halt/interrupt-enable sequence has been written.
    Configured,
}

/// Completion polling policy.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Deadline for one transfer to complete.
    pub timeout: Duration,
    /// Pause between status reads.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            interval: Duration::from_micros(10),
        }
    }
}

/// The S2MM channel of one AXI DMA controller.
///
/// Owns the register window and the configuration state; all register
/// sequencing lives here.
#[derive(Debug)]
pub struct S2mmChannel<R: RegisterIo> {
    regs: R,
    state: ChannelState,
    rx_base: u64,
    rx_len: usize,
    poll: PollConfig,
}

impl<R: RegisterIo> S2mmChannel<R> {
    /// Create a channel over `regs`, with destinations validated against
    /// the receive window at `rx_base..rx_base + rx_len`.
    pub fn new(regs: R, rx_base: u64, rx_len: usize) -> Self {
        Self {
            regs,
            state: ChannelState::Uninitialized,
            rx_base,
            rx_len,
            poll: PollConfig::default(),
        }
    }

    /// Replace the polling policy.
    #[must_use]
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Current configuration state.
    #[must_use]
    pub const fn state(&self) -> ChannelState {
        self.state
    }

    /// The register file, for inspection.
    pub const fn registers(&self) -> &R {
        &self.regs
    }

    /// A fresh status snapshot.
    pub fn status(&self) -> S2mmStatus {
        S2mmStatus::from_raw(self.regs.read32(regs::S2MM_SR))
    }

    fn command(&mut self, cmd: ControlCommand) {
        self.regs.write32(regs::S2MM_CR, cmd.word());
    }

    fn check_destination(&self, transfer: &Transfer) -> Result<()> {
        let start = u64::from(transfer.dest());
        let end = start + u64::from(transfer.len_bytes());
        let window_end = self.rx_base + self.rx_len as u64;

        if start < self.rx_base || end > window_end {
            return Err(AxiDmaError::DestOutOfRange {
                dest: transfer.dest(),
                len: transfer.len_bytes(),
                base: self.rx_base,
                window_len: self.rx_len,
            });
        }

        Ok(())
    }

    /// Issue one transfer. Does not block; completion must be awaited
    /// separately with [`wait_complete`].
    ///
    /// On the very first invocation the channel is reset, halted, and has
    /// all interrupt enables written; later invocations skip straight to
    /// arming. The length write is last: it is what starts the transfer on
    /// this hardware family.
    ///
    /// # Errors
    ///
    /// Returns [`AxiDmaError::DestOutOfRange`] before any register write if
    /// the destination falls outside the receive window.
    ///
    /// [`wait_complete`]: S2mmChannel::wait_complete
    pub fn issue(&mut self, transfer: &Transfer) -> Result<()> {
        self.check_destination(transfer)?;

        if self.state == ChannelState::Uninitialized {
            debug!("first transfer: reset, halt, enable interrupts");
            self.command(ControlCommand::Reset);
            self.command(ControlCommand::Halt);
            self.command(ControlCommand::EnableInterrupts(control::IRQ_ALL_EN));
            self.state = ChannelState::Configured;
        }

        trace!(
            "issue: dest {:#010x}, {} bytes",
            transfer.dest(),
            transfer.len_bytes()
        );

        self.regs.write32(regs::S2MM_DA, transfer.dest());
        self.command(ControlCommand::Run);
        self.regs.write32(regs::S2MM_LENGTH, transfer.len_bytes());

        Ok(())
    }

    /// Poll until the transfer completes, a hardware error flag appears, or
    /// the deadline passes. A fresh snapshot is decoded on every iteration.
    ///
    /// Returns the number of bytes transferred, read back from the length
    /// register after completion.
    ///
    /// # Errors
    ///
    /// - [`AxiDmaError::Hardware`] the moment any error flag is set, even
    ///   if the completion bits are set in the same snapshot.
    /// - [`AxiDmaError::Timeout`] when the deadline passes first.
    pub fn wait_complete(&self) -> Result<u32> {
        let start = Instant::now();

        loop {
            let status = self.status();

            if status.any_error() {
                return Err(AxiDmaError::hardware(status));
            }

            if status.is_complete() {
                let bytes = self.regs.read32(regs::S2MM_LENGTH);
                trace!("complete: {bytes} bytes, status {status}");
                return Ok(bytes);
            }

            let elapsed = start.elapsed();
            if elapsed >= self.poll.timeout {
                let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                return Err(AxiDmaError::timeout(elapsed_ms, status));
            }

            std::thread::sleep(self.poll.interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRegisters;
    use axidma_chip::regs::{S2MM_CR, S2MM_DA, S2MM_LENGTH};

    const RX_BASE: u64 = 0x0F00_0000;
    const RX_LEN: usize = 0x1000;

    fn test_channel() -> S2mmChannel<MockRegisters> {
        S2mmChannel::new(MockRegisters::new(), RX_BASE, RX_LEN).with_poll(PollConfig {
            timeout: Duration::from_millis(20),
            interval: Duration::from_micros(10),
        })
    }

    fn dest(offset: u32) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let base = RX_BASE as u32;
        base + offset
    }

    #[test]
    fn first_issue_writes_the_full_arm_sequence() {
        let mut channel = test_channel();
        assert_eq!(channel.state(), ChannelState::Uninitialized);

        let transfer = Transfer::new(dest(0), 64).unwrap();
        channel.issue(&transfer).unwrap();

        assert_eq!(
            channel.registers().writes(),
            vec![
                (S2MM_CR, control::RESET),
                (S2MM_CR, control::HALT),
                (S2MM_CR, control::IRQ_ALL_EN),
                (S2MM_DA, dest(0)),
                (S2MM_CR, control::RUN),
                (S2MM_LENGTH, 64),
            ]
        );
        assert_eq!(channel.state(), ChannelState::Configured);
    }

    #[test]
    fn later_issues_skip_reconfiguration() {
        let mut channel = test_channel();
        channel.issue(&Transfer::new(dest(0), 64).unwrap()).unwrap();
        channel.registers().clear_writes();

        channel.issue(&Transfer::new(dest(64), 64).unwrap()).unwrap();

        assert_eq!(
            channel.registers().writes(),
            vec![
                (S2MM_DA, dest(64)),
                (S2MM_CR, control::RUN),
                (S2MM_LENGTH, 64),
            ]
        );
    }

    #[test]
    fn invalid_lengths_never_build_a_descriptor() {
        assert!(matches!(
            Transfer::new(dest(0), 0),
            Err(AxiDmaError::InvalidLength { .. })
        ));
        assert!(matches!(
            Transfer::new(dest(0), 63),
            Err(AxiDmaError::InvalidLength { .. })
        ));
        // 65535 itself is not a multiple of the sample width.
        assert!(matches!(
            Transfer::new(dest(0), 65_535),
            Err(AxiDmaError::InvalidLength { .. })
        ));
        assert!(matches!(
            Transfer::new(dest(0), 65_536),
            Err(AxiDmaError::InvalidLength { .. })
        ));
        assert!(Transfer::new(dest(0), 65_532).is_ok());
    }

    #[test]
    fn destination_outside_window_rejected_before_any_write() {
        let mut channel = test_channel();

        let below = Transfer::new(dest(0) - 64, 64).unwrap();
        assert!(matches!(
            channel.issue(&below),
            Err(AxiDmaError::DestOutOfRange { .. })
        ));

        // Starts inside, runs off the end.
        #[allow(clippy::cast_possible_truncation)]
        let tail = Transfer::new(dest(RX_LEN as u32 - 4), 64).unwrap();
        assert!(matches!(
            channel.issue(&tail),
            Err(AxiDmaError::DestOutOfRange { .. })
        ));

        assert!(channel.registers().writes().is_empty());
        assert_eq!(channel.state(), ChannelState::Uninitialized);
    }

    #[test]
    fn wait_complete_returns_bytes_once_idle_and_ioc() {
        let mut channel = test_channel();
        channel.issue(&Transfer::new(dest(0), 64).unwrap()).unwrap();

        // Busy for two polls, then complete.
        channel
            .registers()
            .push_statuses(&[0x0000_0000, 0x0000_1000, 0x0000_1002]);

        assert_eq!(channel.wait_complete().unwrap(), 64);
    }

    #[test]
    fn error_flag_aborts_even_alongside_completion_bits() {
        let channel = test_channel();
        // Slave error together with ioc+idle: the error wins.
        channel
            .registers()
            .push_statuses(&[0x0000_0000, 0x0000_1032]);

        match channel.wait_complete() {
            Err(AxiDmaError::Hardware { status }) => {
                assert!(status.dma_slave_err());
                assert!(status.ioc_irq());
            }
            other => panic!("expected Hardware error, got {other:?}"),
        }
    }

    #[test]
    fn poll_times_out_on_stuck_hardware() {
        let channel = test_channel();
        channel.registers().push_statuses(&[0x0000_0001]);

        match channel.wait_complete() {
            Err(AxiDmaError::Timeout { status, .. }) => assert!(status.halted()),
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[test]
    fn status_reads_decode_the_current_register() {
        let channel = test_channel();
        channel.registers().push_statuses(&[0x0000_0003]);

        let status = channel.status();
        assert!(status.halted());
        assert!(status.idle());
    }
}
