use ft4222::{self, Result};

fn main() -> Result<()> {
    env_logger::init();

    let count = ft4222::create_device_info_list()?;
    println!(
        "Found {} FT4222H interface(s) (VID=0x{:04X}, PID=0x{:04X})",
        count,
        ft4222::FTDI_VID,
        ft4222::FT4222H_PID
    );

    for index in 0..count {
        let info = ft4222::get_device_info_detail(index, false)?;
        println!("Interface {}:", info.index);
        println!("  Description:  {}", info.description);
        println!("  Serial:       {}", info.serial_number);
        println!("  Type:         {:?}", info.device_type);
        println!("  Flags:        {:?}", info.flags);
        println!("  Id:           0x{:08X}", info.id);
        println!("  Location:     0x{:08X}", info.location);
        println!(
            "  USB:          bus {} address {} interface {}",
            info.bus, info.address, info.interface_number
        );
    }

    if count > 0 {
        let mut device = ft4222::Ft4222::open_first()?;
        let version = device.get_version()?;
        println!(
            "First interface: chip 0x{:08X}, firmware 0x{:08X}, {:?} with {} SPI slave-select line(s)",
            version.chip_version,
            version.firmware_version,
            device.chip_mode(),
            device.chip_mode().cs_channels()
        );
    }

    Ok(())
}
