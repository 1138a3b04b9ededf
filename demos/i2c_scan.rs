use ft4222::{Ft4222, Result};

fn main() -> Result<()> {
    env_logger::init();
    println!("Opening first FT4222H device...");
    let mut device = match Ft4222::open_first() {
        Ok(dev) => dev,
        Err(e) => {
            eprintln!("Error opening device: {}", e);
            eprintln!(
                "Ensure device is connected and permissions are set (e.g., udev rules on Linux)."
            );
            return Err(e);
        }
    };
    println!("Device opened.");

    println!("Initializing I2C master at 100kHz...");
    device.i2c_master_init(100)?;

    println!("Scanning I2C bus (7-bit addresses 0x08 to 0x77)...");
    let found_devices = device.i2c_scan_with_progress(0x08, 0x77, |addr, found, _, _| {
        if found {
            println!("Device found at 7-bit 0x{:02X}", addr);
        }
    })?;

    if found_devices.is_empty() {
        println!("No I2C devices found.");
    } else {
        println!(
            "Scan complete. Found 7-bit addresses: {:?}",
            found_devices
                .iter()
                .map(|a| format!("0x{:02X}", a))
                .collect::<Vec<_>>()
        );
    }

    Ok(())
}
