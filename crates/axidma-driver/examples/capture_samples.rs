//! Capture a short run of SPI samples over the S2MM channel.
//!
//! Requires the reference Zynq platform and root (maps `/dev/mem`).

use axidma_chip::{layout::RxLayout, platform};
use axidma_driver::{CaptureSession, DevMem, Result, RxBuffer, S2mmChannel};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("axidma_driver=info")
        .init();

    let devmem = DevMem::open()?;
    let regs = devmem.map(platform::CTRL_BASE, platform::CTRL_WINDOW_LEN)?;
    let window = devmem.map(platform::RX_BASE, platform::RX_WINDOW_LEN)?;

    let channel = S2mmChannel::new(regs, platform::RX_BASE, platform::RX_WINDOW_LEN);
    let rx = RxBuffer::new(window, RxLayout::new(platform::SAMPLES_PER_TRANSFER, 10))?;

    let mut session = CaptureSession::new(channel, rx);
    let stats = session.run()?;
    println!(
        "captured {} / {} bytes ({:.0}%)\n",
        stats.bytes,
        stats.expected_bytes,
        stats.completeness() * 100.0
    );

    for transfer in 0..session.rx().layout().num_transfers() {
        print!("{transfer:02}:");
        for sample in session.rx().transfer_samples(transfer)? {
            print!(" {sample:6}");
        }
        println!();
    }

    println!("\nfinal status: {}", session.channel().status());
    Ok(())
}
