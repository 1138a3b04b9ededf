use std::io::{self, Write};

use ft4222::{self, Ft4222, GpioDir, GpioPort, Result};

fn main() -> Result<()> {
    env_logger::init();

    println!(
        "Searching for FT4222H interfaces (VID=0x{:04X}, PID=0x{:04X})...",
        ft4222::FTDI_VID,
        ft4222::FT4222H_PID
    );
    let devices = ft4222::DeviceList::create()?;

    if devices.is_empty() {
        println!("No devices found.");
        return Ok(());
    }

    println!("Found {} interface(s):", devices.len());
    for info in devices.iter() {
        println!(
            "  {}: Description='{}', Serial='{}', Location=0x{:08X}, Type={:?}",
            info.index, info.description, info.serial_number, info.location, info.device_type
        );
    }

    // --- Select Device ---
    let selected_info = if devices.len() == 1 {
        println!("Automatically selecting the only interface found.");
        devices.detail(0)?
    } else {
        loop {
            print!(
                "Enter the number of the interface to open (0-{}): ",
                devices.len() - 1
            );
            io::stdout().flush()?;
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            match input.trim().parse::<usize>() {
                Ok(index) if index < devices.len() => break devices.detail(index)?,
                _ => {
                    println!(
                        "Invalid input. Please enter a number between 0 and {}.",
                        devices.len() - 1
                    );
                }
            }
        }
    };

    // --- Open Selected Device ---
    println!("Opening '{}'...", selected_info.description);
    let mut device = match Ft4222::open_by_location(selected_info.location) {
        Ok(dev) => dev,
        Err(e) => {
            eprintln!("Error opening device: {}", e);
            eprintln!(
                "Ensure device is connected and permissions are set (e.g., udev rules on Linux)."
            );
            return Err(e);
        }
    };
    println!("Device opened. Chip mode: {:?}", device.chip_mode());

    // --- Quick GPIO check ---
    device.gpio_init([GpioDir::Input; 4])?;
    for port in GpioPort::ALL {
        println!("  {:?} = {:?}", port, device.gpio_read(port)?);
    }

    Ok(())
}
