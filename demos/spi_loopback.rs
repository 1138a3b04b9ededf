//! Full-duplex SPI loopback. Wire MOSI to MISO before running.
//!
//! Options are passed as `key=value` arguments, e.g.
//! `cargo run --example spi_loopback -- spispeed=15000 cpol=high`.

use ft4222::{self, Ft4222, Result};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options: Vec<(&str, &str)> = args
        .iter()
        .filter_map(|arg| arg.split_once('='))
        .collect();
    let config = ft4222::parse_options(&options)?;

    let mut device = Ft4222::open_first()?;
    let khz = device.spi_master_init_with_config(&config)?;
    println!(
        "SPI master at {} kHz ({:?}, {:?}/{:?}, {:?})",
        khz, config.mode, config.cpol, config.cpha, config.slave_select
    );

    let pattern: Vec<u8> = (0..64u8).map(|i| i.wrapping_mul(37)).collect();
    let received = device.spi_master_single_read_write(&pattern, true)?;

    let mismatches = pattern
        .iter()
        .zip(&received)
        .filter(|(sent, got)| sent != got)
        .count();
    if mismatches == 0 {
        println!("Loopback OK: {} bytes echoed", received.len());
    } else {
        println!(
            "Loopback FAILED: {} of {} bytes differ",
            mismatches,
            pattern.len()
        );
        println!("  sent:     {:02X?}", pattern);
        println!("  received: {:02X?}", received);
    }

    Ok(())
}
