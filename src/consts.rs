//! Internal constants: USB identifiers, vendor requests and config command codes.

// Default Vendor/Product IDs
/// FTDI vendor ID.
pub const FTDI_VID: u16 = 0x0403;
/// FT4222H product ID (same for every chip mode).
pub const FT4222H_PID: u16 = 0x601C;

/// Vendor-specific interface class used by every FT4222H interface.
pub const VENDOR_CLASS: u8 = 0xFF;

// --- Vendor requests (Control Transfer) ---
pub const REQUEST_RESET: u8 = 0x00;
pub const REQUEST_INFO: u8 = 0x20;
pub const REQUEST_CONFIG: u8 = 0x21;

/// wValue for [`REQUEST_RESET`].
pub mod reset {
    pub const SIO: u16 = 0x0000;
    pub const OUTPUT_FLUSH: u16 = 0x0001;
    pub const INPUT_FLUSH: u16 = 0x0002;
    pub const CHIP: u16 = 0x0003;
}

/// wValue for [`REQUEST_INFO`] and the reply lengths.
pub mod info {
    pub const GET_VERSION: u16 = 0x0000;
    pub const VERSION_LEN: u16 = 12;
    pub const GET_CONFIG: u16 = 0x0001;
    pub const CONFIG_LEN: u16 = 13;
    pub const GET_GPIO_STATE: u16 = 0x0010;
    pub const GET_GPIO_EVENTS: u16 = 0x0011;
    pub const GPIO_EVENTS_LEN: u16 = 64;
    pub const I2C_STATUS: u16 = 0xF5B4;
}

/// Command byte (low byte of wValue) for [`REQUEST_CONFIG`].
/// The data byte goes in the high byte: wValue = (data << 8) | cmd.
pub mod config {
    pub const SET_CLOCK: u8 = 0x04;
    pub const SET_MODE: u8 = 0x05;
    pub const SET_SUSPEND_OUT: u8 = 0x06;
    pub const SET_WAKEUP_INTERRUPT: u8 = 0x07;

    pub const SPI_SET_IO_LINES: u8 = 0x42;
    pub const SPI_SET_CS_ACTIVE: u8 = 0x43;
    pub const SPI_SET_CLK_DIV: u8 = 0x44;
    pub const SPI_SET_CLK_IDLE: u8 = 0x45;
    pub const SPI_SET_CAPTURE: u8 = 0x46;
    pub const SPI_SET_CS_MASK: u8 = 0x48;
    pub const SPI_RESET_TRANSACTION: u8 = 0x49;
    pub const SPI_RESET: u8 = 0x4A;
    pub const SPI_SLAVE_SET_PROTOCOL: u8 = 0x4C;
    pub const SPI_SET_DRIVING_STRENGTH: u8 = 0x4D;

    pub const I2C_RESET: u8 = 0x51;
    pub const I2C_SET_SPEED_MODE: u8 = 0x52;
    pub const I2C_SET_TIMER: u8 = 0x53;

    pub const GPIO_SET_DIR: u8 = 0x60;
    pub const GPIO_WRITE: u8 = 0x61;
    pub const GPIO_SET_TRIGGER: u8 = 0x62;
}

/// Data byte for [`config::SET_MODE`].
pub mod function {
    pub const NONE: u8 = 0;
    pub const I2C_MASTER: u8 = 1;
    pub const SPI_MASTER: u8 = 3;
    pub const SPI_SLAVE: u8 = 4;
    pub const GPIO: u8 = 5;
}

/// Data bytes for [`config::SPI_RESET`] and [`config::I2C_RESET`].
pub mod reset_kind {
    pub const SPI_FULL: u8 = 0;
    pub const SPI_LINE_NUM: u8 = 1;
    pub const I2C_CONTROLLER: u8 = 1;
    pub const I2C_BUS: u8 = 2;
}

/// CS polarity (data byte for SPI_SET_CS_ACTIVE).
pub const CS_ACTIVE_LOW: u8 = 0;
pub const CS_ACTIVE_HIGH: u8 = 1;

// --- Bulk transfers ---
/// High-speed bulk packet size.
pub const USB_PACKET_SIZE: usize = 512;
/// Modem status bytes at the start of each IN packet.
pub const MODEM_STATUS_SIZE: usize = 2;
/// Maximum bytes requested per bulk IN transfer.
pub const READ_BUFFER_SIZE: usize = 2048;
/// Bulk OUT writes are split into chunks of this size.
pub const WRITE_CHUNK_SIZE: usize = 2048;
/// Largest length a 16-bit length field can carry.
pub const MAX_TRANSFER_LEN: usize = 0xFFFF;

// --- I2C ---
pub mod i2c {
    pub const MIN_KBPS: u32 = 60;
    pub const MAX_KBPS: u32 = 3400;
    pub const HEADER_SIZE: usize = 4;
    pub const READ_BIT: u8 = 0x01;
    /// Longest time `wait_status` polls a busy controller.
    pub const STATUS_POLL_MS: u64 = 100;
}

// --- SPI master multi-I/O header ---
/// Format: | 4-bit 0x8 | 4-bit single_len | 2B multi_write_len | 2B multi_read_len |
pub const MULTI_IO_HEADER_SIZE: usize = 5;
pub const MULTI_IO_MAGIC: u8 = 0x80;
pub const MULTI_IO_MAX_SINGLE: usize = 15;

/// Full-duplex bytes written before reading back; larger blocks overflow the chip's RX buffer.
pub const SPI_DUPLEX_CHUNK: usize = 256;

/// Default SPI clock speed in kHz (10 MHz).
pub const DEFAULT_SPI_SPEED_KHZ: u32 = 10_000;

// --- GPIO ---
pub const GPIO_PORT_COUNT: usize = 4;
/// Events kept per port before the oldest is dropped.
pub const GPIO_QUEUE_CAPACITY: usize = 512;

/// Consecutive bulk reads without payload before a read gives up.
pub const MAX_EMPTY_READS: usize = 16;
/// Output flush requests sent by `flush`.
pub const OUTPUT_FLUSH_COUNT: usize = 6;
