// tests/hardware_tests.rs
use std::{thread, time::Duration};

use ft4222::{
    Cpha, Cpol, Ft4222, GpioDir, GpioOutput, GpioPort, Result, SlaveSelect, SpiClock, SpiMode,
};

// Helper to open the first device, panics on failure for test simplicity
fn open_test_device() -> Ft4222 {
    let _ = env_logger::builder().is_test(true).try_init();
    Ft4222::open_first()
        .expect("Failed to open any FT4222H device. Is it connected and permissions set?")
}

#[test]
#[ignore] // Ignore by default, requires hardware
fn test_enumeration_lists_interfaces() -> Result<()> {
    let list = ft4222::DeviceList::create()?;
    assert!(!list.is_empty(), "No FT4222H interfaces found");
    for info in list.iter() {
        println!(
            "{}: {} SN={} loc=0x{:08X} {:?}",
            info.index, info.description, info.serial_number, info.location, info.device_type
        );
        assert_eq!(info.id, 0x0403_601C);
    }
    assert_eq!(ft4222::create_device_info_list()?, list.len());
    let first = ft4222::get_device_info_detail(0, true)?;
    assert_eq!(&first, list.detail(0)?);
    Ok(())
}

#[test]
#[ignore]
fn test_version_and_mode() -> Result<()> {
    let mut device = open_test_device();
    let version = device.get_version()?;
    println!("Version: {:?}, mode {:?}", version, device.chip_mode());
    assert_ne!(version.chip_version, 0);
    Ok(())
}

#[test]
#[ignore]
fn test_gpio_output_readback() -> Result<()> {
    let mut device = open_test_device();
    println!("Testing GPIO Output Readback on P0");
    device.gpio_init([
        GpioDir::Output,
        GpioDir::Input,
        GpioDir::Input,
        GpioDir::Input,
    ])?;

    device.gpio_write(GpioPort::P0, GpioOutput::High)?;
    thread::sleep(Duration::from_millis(5)); // Allow state to settle
    assert_eq!(
        device.gpio_read(GpioPort::P0)?,
        GpioOutput::High,
        "Port should read HIGH"
    );

    device.gpio_write(GpioPort::P0, GpioOutput::Low)?;
    thread::sleep(Duration::from_millis(5));
    assert_eq!(
        device.gpio_read(GpioPort::P0)?,
        GpioOutput::Low,
        "Port should read LOW"
    );
    Ok(())
}

#[test]
#[ignore]
fn test_i2c_scan() -> Result<()> {
    let mut device = open_test_device();
    device.i2c_master_init(100)?;
    let found = device.i2c_scan_default()?;
    println!("I2C devices: {:02X?}", found);
    Ok(())
}

#[test]
#[ignore] // Requires MOSI wired to MISO
fn test_spi_loopback() -> Result<()> {
    let mut device = open_test_device();
    device.spi_master_init(
        SpiMode::Single,
        SpiClock::Div16,
        Cpol::IdleLow,
        Cpha::Leading,
        SlaveSelect::SS0,
    )?;
    let pattern: Vec<u8> = (0..=255).collect();
    let rx = device.spi_master_single_read_write(&pattern, true)?;
    assert_eq!(rx, pattern);
    Ok(())
}
