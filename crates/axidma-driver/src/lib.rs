//! Userspace driver for the Xilinx AXI DMA S2MM channel.
//!
//! Programs the controller in direct register mode over `/dev/mem`: issue a
//! fixed-size transfer from the streaming source into the receive buffer,
//! busy-poll the status register to completion with a bounded deadline,
//! then read the captured sample words through a bounds-checked,
//! completion-gated view.
//!
//! No interrupts, no scatter-gather, no multi-channel arbitration — one
//! channel, one transfer in flight.
//!
//! # Quick start
//!
//! ```no_run
//! use axidma_chip::{layout::RxLayout, platform};
//! use axidma_driver::{CaptureSession, DevMem, RxBuffer, S2mmChannel};
//!
//! # fn main() -> axidma_driver::Result<()> {
//! let devmem = DevMem::open()?;
//! let regs = devmem.map(platform::CTRL_BASE, platform::CTRL_WINDOW_LEN)?;
//! let window = devmem.map(platform::RX_BASE, platform::RX_WINDOW_LEN)?;
//!
//! let channel = S2mmChannel::new(regs, platform::RX_BASE, platform::RX_WINDOW_LEN);
//! let rx = RxBuffer::new(window, RxLayout::new(platform::SAMPLES_PER_TRANSFER, 10))?;
//!
//! let mut session = CaptureSession::new(channel, rx);
//! let stats = session.run()?;
//! println!("captured {} bytes", stats.bytes);
//!
//! for sample in session.rx().transfer_samples(0)? {
//!     println!("{sample}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod capture;
mod error;
pub mod mem;
mod regio;
mod rx;
mod s2mm;

#[cfg(test)]
mod testing;

pub use capture::{CaptureSession, CaptureStats};
pub use error::{AxiDmaError, Result};
pub use mem::{DevMem, MappedRegion};
pub use regio::RegisterIo;
pub use rx::RxBuffer;
pub use s2mm::{ChannelState, PollConfig, S2mmChannel, Transfer};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        AxiDmaError, CaptureSession, CaptureStats, DevMem, MappedRegion, PollConfig, Result,
        RxBuffer, S2mmChannel, Transfer,
    };
    pub use axidma_chip::layout::RxLayout;
    pub use axidma_chip::status::S2mmStatus;
}
