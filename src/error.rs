use crate::gpio::GpioPort;
use crate::i2c::I2cControllerStatus;
use thiserror::Error;

/// Errors that can occur when using FT4222H devices.
///
/// This enum covers device discovery, USB transfers, protocol violations
/// reported by the chip, and invalid arguments passed to the API.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the underlying USB layer.
    #[error("USB error: {0}")]
    Usb(#[from] nusb::Error),
    /// A control or bulk transfer failed.
    #[error("USB transfer failed: {0}")]
    Transfer(String),
    /// No FT4222H device was found.
    #[error("FT4222H device not found (VID:0403 PID:601c)")]
    DeviceNotFound,
    /// No FT4222H interface was found with the specified serial number.
    #[error("Device not found with serial number '{serial}'")]
    DeviceNotFoundBySerial {
        /// The serial number that was searched for.
        serial: String,
    },
    /// No FT4222H interface was found with the specified description.
    #[error("Device not found with description '{description}'")]
    DeviceNotFoundByDescription {
        /// The description that was searched for.
        description: String,
    },
    /// No FT4222H interface was found at the specified location.
    #[error("Device not found at location 0x{location:08X}")]
    DeviceNotFoundByLocation {
        /// The location id that was searched for.
        location: u32,
    },
    /// No FT4222H interface was found at the specified index.
    #[error("Device not found at index {index}: found {count} interfaces")]
    DeviceNotFoundByIndex {
        /// The index that was requested.
        index: usize,
        /// The number of interfaces that were enumerated.
        count: usize,
    },
    /// The device was found but could not be opened or claimed.
    #[error("Failed to open FT4222H: {0}")]
    OpenFailed(String),
    /// General I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Reply from the device was malformed or unexpected.
    #[error("Invalid response from FT4222H: {0}")]
    InvalidResponse(String),
    /// Timeout waiting for the device.
    #[error("Timeout waiting for device response")]
    Timeout,
    /// Function argument is outside the valid range.
    #[error("Argument out of range: {0}")]
    ArgumentOutOfRange(String),
    /// Requested operation exceeds device or protocol limits.
    #[error("Requested operation size is too large (max {max}, got {actual})")]
    OperationTooLarge {
        /// Maximum allowed size for this operation.
        max: usize,
        /// Actual size requested.
        actual: usize,
    },
    /// An operation was called before its function was initialised.
    #[error("{function} is not initialized: call the matching init function first")]
    NotInitialized {
        /// The function (I2C master, SPI master, ...) that is required.
        function: &'static str,
    },
    /// The I2C controller is still busy; every other status bit is invalid.
    #[error("I2C controller busy")]
    I2cBusy,
    /// I2C slave did not acknowledge its address.
    #[error(
        "No device found at I2C address 0x{address:02X}: Device did not acknowledge (NACK). This is normal when scanning for devices."
    )]
    I2cNack {
        /// The 7-bit address that was not acknowledged.
        address: u8,
    },
    /// I2C slave did not acknowledge a data byte.
    #[error("I2C data not acknowledged by device at 0x{address:02X}")]
    I2cDataNack {
        /// The 7-bit address being accessed.
        address: u8,
    },
    /// I2C bus arbitration was lost during the transaction.
    #[error(
        "I2C bus conflict at address 0x{address:02X}: Arbitration lost (multiple masters competing for bus control). Check for other I2C controllers, loose connections, or electrical interference."
    )]
    I2cArbitrationLost {
        /// The 7-bit address being accessed when arbitration was lost.
        address: u8,
    },
    /// I2C controller reported an error without a more specific cause.
    #[error("I2C controller error at address 0x{address:02X} (Status: {status:?})")]
    I2cControllerError {
        /// The 7-bit address being accessed.
        address: u8,
        /// Raw controller status.
        status: I2cControllerStatus,
    },
    /// Attempted to drive a GPIO port configured as input.
    #[error("GPIO port {port:?} is configured as input")]
    GpioPortIsInput {
        /// The offending port.
        port: GpioPort,
    },
    /// Attempted to configure a trigger on a GPIO port configured as output.
    #[error("GPIO port {port:?} is configured as output")]
    GpioPortIsOutput {
        /// The offending port.
        port: GpioPort,
    },
    /// The GPIO port is taken by another chip function.
    #[error("GPIO port {port:?} is reserved for {reason}")]
    GpioPortReserved {
        /// The offending port.
        port: GpioPort,
        /// What the port is used for.
        reason: &'static str,
    },
    /// Invalid programmer option string.
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

/// Result type alias for FT4222H operations.
pub type Result<T> = std::result::Result<T, Error>;
