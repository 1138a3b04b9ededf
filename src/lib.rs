//! # ft4222
//!
//! A Rust crate for controlling the I²C master, SPI master, SPI slave and GPIO
//! functions of the FTDI FT4222H USB bridge chip.
//!
//! The chip's vendor protocol is implemented directly on top of the `nusb`
//! crate, so no vendor library is needed at build or run time.
//!
//! ## Features
//!
//! *   Device discovery (`find_all`, `DeviceList`, `create_device_info_list`, `get_device_info_detail`).
//! *   Flexible device opening (`open`, `open_first`, `open_by_index`, `open_by_serial`,
//!     `open_by_description`, `open_by_location`).
//! *   Chip queries and control (`get_version`, `chip_mode`, `set_clock`, `chip_reset`, `flush`).
//! *   I²C master:
//!     *   Speed setting from 60 to 3400 kbps (`i2c_master_init`).
//!     *   Plain and framed transfers (`i2c_master_write`, `i2c_master_read_ex`, ...).
//!     *   Controller status decoding and bus scanning (`i2c_master_wait_status`, `i2c_scan`).
//! *   SPI master:
//!     *   Single, dual and quad I/O with up to four slave-select lines.
//!     *   Speed selection from a target frequency (`SpiMasterConfig`, `parse_options`).
//!     *   Full-duplex single transfers and half-duplex multi-I/O transfers.
//! *   SPI slave with the framed, acknowledged transfer protocol or raw bytes.
//! *   GPIO on ports P0-P3, trigger configuration and per-port trigger event queues.
//!
//! ## Chip Support & Limitations
//!
//! The chip mode (DCNF pins) decides how many interfaces the FT4222H exposes
//! and how many SPI slave-select lines exist:
//!
//! | Mode | Interfaces | SS lines |
//! |------|------------|----------|
//! | 0    | 2          | 1        |
//! | 1    | 4          | 3        |
//! | 2    | 4          | 4        |
//! | 3    | 1          | 1        |
//!
//! Every interface is listed and opened separately. Only one function
//! (I²C master, SPI master, SPI slave or GPIO) is active per session at a time;
//! calling an operation of another function returns [`Error::NotInitialized`].
//!
//! ## Basic Usage
//!
//! ```no_run
//! use ft4222::{Ft4222, GpioDir, GpioOutput, GpioPort, Result};
//! use std::{thread, time::Duration};
//!
//! fn main() -> Result<()> {
//!     // Optional: Initialize logging
//!     // env_logger::init();
//!
//!     for info in ft4222::find_all()? {
//!         println!("{}: {} (SN {})", info.index, info.description, info.serial_number);
//!     }
//!
//!     let mut device = Ft4222::open_first()?;
//!     println!("Chip mode: {:?}", device.chip_mode());
//!
//!     // --- I2C Example ---
//!     device.i2c_master_init(400)?;
//!     device.i2c_master_write(0x50, &[0x00, 0x10])?;
//!     let data = device.i2c_master_read(0x50, 16)?;
//!     println!("EEPROM: {:02X?}", data);
//!
//!     // --- GPIO Example ---
//!     device.gpio_init([GpioDir::Output, GpioDir::Input, GpioDir::Input, GpioDir::Input])?;
//!     device.gpio_write(GpioPort::P0, GpioOutput::High)?;
//!     thread::sleep(Duration::from_millis(200));
//!     device.gpio_write(GpioPort::P0, GpioOutput::Low)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Working with Multiple Devices
//!
//! 1.  **Find Devices:** Call [`find_all`] or [`DeviceList::create`].
//! 2.  **Select Device:** Choose an entry by `serial_number`, `description` or `location`.
//! 3.  **Open Device:** Call [`Ft4222::open`] with the selected entry.
//!
//! See `demos/list_and_select.rs`.
//!
//! ## Hardware Setup Notes
//!
//! *   **I²C Pull-up Resistors:** Required externally (e.g., 4.7kΩ to 3.3V).
//! *   **Linux udev Rules:** Grant user permission to the USB device. Create `/etc/udev/rules.d/99-ft4222.rules`:
//!     ```udev
//!     SUBSYSTEM=="usb", ATTRS{idVendor}=="0403", ATTRS{idProduct}=="601c", MODE="0666", GROUP="plugdev"
//!     ```
//!     Reload: `sudo udevadm control --reload-rules && sudo udevadm trigger`

pub mod consts;
pub mod device;
mod error;
pub mod gpio;
pub mod i2c;
mod interrupt;
pub mod slave_frame;
pub mod spi;
pub mod spi_master;
pub mod spi_slave;
pub mod transport;

pub use consts::{FT4222H_PID, FTDI_VID};
pub use device::{
    create_device_info_list, find_all, get_device_info_detail, ChipMode, DeviceFlags, DeviceInfo,
    DeviceList, DeviceType, Ft4222, SysClock, Version,
};
pub use error::{Error, Result};
pub use gpio::{GpioDir, GpioOutput, GpioPort, GpioTrigger};
pub use i2c::{I2cControllerStatus, I2cFlag, I2cSpeed, I2cSpeedMode};
pub use spi::{Cpha, Cpol, DrivingStrength};
pub use spi_master::{
    find_clock_config, parse_options, ClockConfig, SlaveSelect, SpiClock, SpiMasterConfig,
    SpiMode,
};
pub use spi_slave::SpiSlaveProtocol;
pub use transport::{Transport, TransportTimeouts, UsbTransport};
