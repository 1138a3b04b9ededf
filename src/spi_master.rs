//! SPI master functionality for FT4222H devices.
//!
//! The SPI clock is derived from one of the four system clocks
//! (60/24/48/80 MHz) divided by a power of two (2 to 512):
//!
//! ```text
//! SPI_clock = system_clock / divisor
//! ```
//!
//! Single-line transfers are full duplex. Dual and quad transfers are half
//! duplex and start with a short single-line phase (opcode, address).

use bitflags::bitflags;
use log::{debug, trace, warn};

use crate::consts;
use crate::device::{Ft4222, Function, SysClock};
use crate::error::{Error, Result};
use crate::spi::{Cpha, Cpol};

/// Number of data lines used by the SPI master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SpiMode {
    /// Not configured.
    None = 0,
    /// Single I/O (standard SPI: 1-1-1).
    #[default]
    Single = 1,
    /// Dual I/O.
    Dual = 2,
    /// Quad I/O.
    Quad = 4,
}

impl SpiMode {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single" | "1" => Some(SpiMode::Single),
            "dual" | "2" => Some(SpiMode::Dual),
            "quad" | "4" => Some(SpiMode::Quad),
            _ => None,
        }
    }
}

impl TryFrom<u8> for SpiMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(SpiMode::None),
            1 => Ok(SpiMode::Single),
            2 => Ok(SpiMode::Dual),
            4 => Ok(SpiMode::Quad),
            v => Err(Error::ArgumentOutOfRange(format!("SPI I/O mode {}", v))),
        }
    }
}

/// Divider applied to the system clock to get the SPI clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SpiClock {
    None = 0,
    Div2 = 1,
    Div4 = 2,
    Div8 = 3,
    Div16 = 4,
    Div32 = 5,
    Div64 = 6,
    Div128 = 7,
    Div256 = 8,
    Div512 = 9,
}

impl SpiClock {
    /// All real dividers, fastest first.
    pub const DIVIDERS: [SpiClock; 9] = [
        SpiClock::Div2,
        SpiClock::Div4,
        SpiClock::Div8,
        SpiClock::Div16,
        SpiClock::Div32,
        SpiClock::Div64,
        SpiClock::Div128,
        SpiClock::Div256,
        SpiClock::Div512,
    ];

    /// Get the actual divisor value (0 for [`SpiClock::None`]).
    pub fn divisor(self) -> u32 {
        match self {
            SpiClock::None => 0,
            clock => 1 << (clock as u32),
        }
    }
}

impl TryFrom<u8> for SpiClock {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(SpiClock::None),
            1..=9 => Ok(SpiClock::DIVIDERS[value as usize - 1]),
            v => Err(Error::ArgumentOutOfRange(format!("SPI clock divider code {}", v))),
        }
    }
}

bitflags! {
    /// Slave-select lines asserted by the master, one bit per line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SlaveSelect: u8 {
        const SS0 = 0b0001;
        const SS1 = 0b0010;
        const SS2 = 0b0100;
        const SS3 = 0b1000;
    }
}

impl SlaveSelect {
    /// Returns the slave-select bit for line `index` (0-3).
    pub fn line(index: u8) -> Result<Self> {
        if index > 3 {
            return Err(Error::ArgumentOutOfRange(format!(
                "Slave select {} (0-3)",
                index
            )));
        }
        Ok(Self::from_bits_retain(1 << index))
    }

    /// Index of the lowest selected line.
    pub fn first_index(self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.bits().trailing_zeros() as u8)
        }
    }

    /// Index of the highest selected line.
    pub fn last_index(self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(7 - self.bits().leading_zeros() as u8)
        }
    }
}

/// System clock and divider pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    /// System clock selection
    pub sys_clock: SysClock,
    /// Clock divider
    pub divider: SpiClock,
}

impl ClockConfig {
    /// Calculate the resulting SPI clock frequency in kHz
    pub fn spi_clock_khz(&self) -> u32 {
        match self.divider.divisor() {
            0 => 0,
            divisor => self.sys_clock.to_khz() / divisor,
        }
    }
}

/// Find the best clock configuration for a target speed
///
/// Returns the configuration that gives the highest speed not exceeding
/// `target_khz`, or the slowest possible one when the target is below it.
pub fn find_clock_config(target_khz: u32) -> ClockConfig {
    // 60 MHz first: it is the power-on clock and ties keep it
    const SYS_CLOCKS: [SysClock; 4] = [
        SysClock::Clk60,
        SysClock::Clk80,
        SysClock::Clk48,
        SysClock::Clk24,
    ];

    let mut best: Option<ClockConfig> = None;
    let mut best_khz: u32 = 0;

    for &sys_clock in &SYS_CLOCKS {
        for &divider in &SpiClock::DIVIDERS {
            let speed = sys_clock.to_khz() / divider.divisor();
            if speed <= target_khz && speed > best_khz {
                best = Some(ClockConfig { sys_clock, divider });
                best_khz = speed;
            }
        }
    }

    best.unwrap_or(ClockConfig {
        sys_clock: SysClock::Clk24,
        divider: SpiClock::Div512,
    })
}

/// Complete SPI master configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiMasterConfig {
    /// Target SPI speed in kHz
    pub speed_khz: u32,
    /// I/O mode (single/dual/quad)
    pub mode: SpiMode,
    /// Clock polarity
    pub cpol: Cpol,
    /// Clock phase
    pub cpha: Cpha,
    /// Slave-select lines
    pub slave_select: SlaveSelect,
}

impl Default for SpiMasterConfig {
    fn default() -> Self {
        Self {
            speed_khz: consts::DEFAULT_SPI_SPEED_KHZ,
            mode: SpiMode::Single,
            cpol: Cpol::IdleLow,
            cpha: Cpha::Leading,
            slave_select: SlaveSelect::SS0,
        }
    }
}

impl SpiMasterConfig {
    /// Create a new configuration with default values (10 MHz, mode 0, SS0)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SPI speed in kHz
    pub fn with_speed_khz(mut self, speed: u32) -> Self {
        self.speed_khz = speed;
        self
    }

    /// Set the I/O mode
    pub fn with_mode(mut self, mode: SpiMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the clock polarity
    pub fn with_cpol(mut self, cpol: Cpol) -> Self {
        self.cpol = cpol;
        self
    }

    /// Set the clock phase
    pub fn with_cpha(mut self, cpha: Cpha) -> Self {
        self.cpha = cpha;
        self
    }

    /// Set the slave-select lines
    pub fn with_slave_select(mut self, ss: SlaveSelect) -> Self {
        self.slave_select = ss;
        self
    }

    /// Clock configuration chosen for `speed_khz`.
    pub fn clock(&self) -> ClockConfig {
        find_clock_config(self.speed_khz)
    }
}

/// Parse SPI master options
///
/// Supported options:
/// - `spispeed=<khz>`: Target SPI clock speed in kHz (default: 10000)
/// - `cs=<0-3>`: Which slave select to use (default: 0)
/// - `iomode=<single|dual|quad>`: I/O mode (default: single)
/// - `cpol=<low|high>`, `cpha=<leading|trailing>`: SPI mode (default: 0)
///
/// # Example
///
/// ```
/// let options = [("spispeed", "30000"), ("cs", "1")];
/// let config = ft4222::parse_options(&options)?;
/// assert_eq!(config.speed_khz, 30000);
/// # Ok::<(), ft4222::Error>(())
/// ```
pub fn parse_options(options: &[(&str, &str)]) -> Result<SpiMasterConfig> {
    let mut config = SpiMasterConfig::default();

    for (key, value) in options {
        match *key {
            "spispeed" => {
                let khz: u32 = value.parse().map_err(|_| {
                    Error::InvalidOption(format!("Invalid spispeed value: {}", value))
                })?;
                if khz == 0 {
                    return Err(Error::InvalidOption("spispeed must be non-zero".into()));
                }
                config.speed_khz = khz;
                debug!("Setting target SPI speed to {} kHz", khz);
            }
            "cs" => {
                let cs: u8 = value
                    .parse()
                    .map_err(|_| Error::InvalidOption(format!("Invalid cs value: {}", value)))?;
                config.slave_select = SlaveSelect::line(cs)
                    .map_err(|_| Error::InvalidOption(format!("Invalid cs: {} (must be 0-3)", cs)))?;
            }
            "iomode" => {
                config.mode = SpiMode::parse(value).ok_or_else(|| {
                    Error::InvalidOption(format!(
                        "Invalid iomode: {} (must be single, dual, or quad)",
                        value
                    ))
                })?;
            }
            "cpol" => {
                config.cpol = Cpol::parse(value)
                    .ok_or_else(|| Error::InvalidOption(format!("Invalid cpol: {}", value)))?;
            }
            "cpha" => {
                config.cpha = Cpha::parse(value)
                    .ok_or_else(|| Error::InvalidOption(format!("Invalid cpha: {}", value)))?;
            }
            _ => {
                warn!("Unknown FT4222 option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

impl Ft4222 {
    // --- SPI Master Methods ---
    /// Configures the chip as SPI master.
    ///
    /// `ss` selects which slave-select lines the master drives; every selected
    /// line must exist in the current chip mode.
    pub fn spi_master_init(
        &mut self,
        mode: SpiMode,
        clock: SpiClock,
        cpol: Cpol,
        cpha: Cpha,
        ss: SlaveSelect,
    ) -> Result<()> {
        if mode == SpiMode::None {
            return Err(Error::ArgumentOutOfRange(
                "SPI master mode must be single, dual or quad".to_string(),
            ));
        }
        if clock == SpiClock::None {
            return Err(Error::ArgumentOutOfRange(
                "SPI master clock divider must be set".to_string(),
            ));
        }
        let (Some(first), Some(last)) = (ss.first_index(), ss.last_index()) else {
            return Err(Error::ArgumentOutOfRange(
                "At least one slave select line is required".to_string(),
            ));
        };
        let channels = self.chip_mode.cs_channels();
        if last >= channels {
            return Err(Error::ArgumentOutOfRange(format!(
                "SS{} not available (chip {:?} has {} slave select lines)",
                last, self.chip_mode, channels
            )));
        }

        self.config_request(consts::config::SPI_RESET_TRANSACTION, first)?;
        self.config_request(consts::config::SPI_SET_IO_LINES, mode as u8)?;
        self.config_request(consts::config::SPI_SET_CLK_DIV, clock as u8)?;
        self.config_request(consts::config::SPI_SET_CLK_IDLE, cpol as u8)?;
        self.config_request(consts::config::SPI_SET_CAPTURE, cpha as u8)?;
        self.config_request(consts::config::SPI_SET_CS_ACTIVE, consts::CS_ACTIVE_LOW)?;
        self.config_request(consts::config::SPI_SET_CS_MASK, ss.bits())?;
        self.config_request(consts::config::SET_MODE, consts::function::SPI_MASTER)?;

        self.spi_lines = mode;
        self.spi_multi_lines = match mode {
            SpiMode::Dual | SpiMode::Quad => mode,
            _ => SpiMode::None,
        };
        self.function = Function::SpiMaster;
        debug!(
            "SPI master configured: mode={:?}, clock={:?} ({} kHz), cpol={:?}, cpha={:?}, ss={:?}",
            mode,
            clock,
            self.sys_clock.to_khz() / clock.divisor(),
            cpol,
            cpha,
            ss
        );
        Ok(())
    }

    /// Sets the system clock and divider for `config.speed_khz`, then initialises the master.
    pub fn spi_master_init_with_config(&mut self, config: &SpiMasterConfig) -> Result<u32> {
        let clock = config.clock();
        self.set_clock(clock.sys_clock)?;
        self.spi_master_init(
            config.mode,
            clock.divider,
            config.cpol,
            config.cpha,
            config.slave_select,
        )?;
        Ok(clock.spi_clock_khz())
    }

    /// Switches the number of data lines. No-op when unchanged.
    pub fn spi_master_set_lines(&mut self, mode: SpiMode) -> Result<()> {
        self.require(Function::SpiMaster)?;
        if mode == SpiMode::None {
            return Err(Error::ArgumentOutOfRange(
                "SPI master mode must be single, dual or quad".to_string(),
            ));
        }
        if mode != self.spi_lines {
            self.config_request(consts::config::SPI_SET_IO_LINES, mode as u8)?;
            // Reset line number after changing I/O lines
            self.config_request(consts::config::SPI_RESET, consts::reset_kind::SPI_LINE_NUM)?;
            self.spi_lines = mode;
            if matches!(mode, SpiMode::Dual | SpiMode::Quad) {
                self.spi_multi_lines = mode;
            }
            trace!("Set I/O lines to {:?}", mode);
        }
        Ok(())
    }

    /// Sets whether slave select is active low (`false`) or active high (`true`).
    pub fn spi_master_set_cs(&mut self, active_high: bool) -> Result<()> {
        self.require(Function::SpiMaster)?;
        let polarity = if active_high {
            consts::CS_ACTIVE_HIGH
        } else {
            consts::CS_ACTIVE_LOW
        };
        self.config_request(consts::config::SPI_SET_CS_ACTIVE, polarity)
    }

    /// Returns the current number of data lines.
    pub fn spi_master_lines(&self) -> SpiMode {
        self.spi_lines
    }

    /// Full-duplex single-line transfer. Returns the bytes clocked in while
    /// `write_data` was clocked out. `end_transaction` deasserts slave select.
    pub fn spi_master_single_read_write(
        &mut self,
        write_data: &[u8],
        end_transaction: bool,
    ) -> Result<Vec<u8>> {
        self.require(Function::SpiMaster)?;
        self.spi_master_set_lines(SpiMode::Single)?;

        if write_data.is_empty() {
            if end_transaction {
                // Empty packet deasserts slave select
                self.transport.bulk_write(&[])?;
            }
            return Ok(Vec::new());
        }

        let mut response = Vec::with_capacity(write_data.len());
        let mut chunks = write_data.chunks(consts::SPI_DUPLEX_CHUNK).peekable();
        while let Some(chunk) = chunks.next() {
            self.transport.bulk_write(chunk)?;
            if end_transaction && chunks.peek().is_none() {
                self.transport.bulk_write(&[])?;
            }
            response.extend(self.read_payload(chunk.len())?);
        }
        trace!("SPI single read/write {} bytes", response.len());
        Ok(response)
    }

    /// Single-line write; received bytes are discarded. Returns the number of bytes written.
    pub fn spi_master_single_write(&mut self, data: &[u8], end_transaction: bool) -> Result<usize> {
        self.spi_master_single_read_write(data, end_transaction)
            .map(|_| data.len())
    }

    /// Single-line read of `len` bytes, clocking out zeros.
    pub fn spi_master_single_read(&mut self, len: usize, end_transaction: bool) -> Result<Vec<u8>> {
        let dummy = vec![0u8; len];
        self.spi_master_single_read_write(&dummy, end_transaction)
    }

    /// Half-duplex dual/quad transfer.
    ///
    /// Runs on the dual or quad lines last chosen by `spi_master_init` or
    /// `spi_master_set_lines`, switching back to them after single transfers.
    ///
    /// Format: | single-I/O phase | multi-I/O write phase | multi-I/O read phase |
    /// The transaction always ends with slave select deasserted.
    pub fn spi_master_multi_read_write(
        &mut self,
        single_write: &[u8],
        multi_write: &[u8],
        multi_read_len: usize,
    ) -> Result<Vec<u8>> {
        self.require(Function::SpiMaster)?;
        let lines = if matches!(self.spi_lines, SpiMode::Dual | SpiMode::Quad) {
            self.spi_lines
        } else {
            self.spi_multi_lines
        };
        if lines == SpiMode::None {
            return Err(Error::ArgumentOutOfRange(
                "Multi-I/O transfer requires the master to be set up for dual or quad lines"
                    .to_string(),
            ));
        }
        if single_write.len() > consts::MULTI_IO_MAX_SINGLE {
            return Err(Error::OperationTooLarge {
                max: consts::MULTI_IO_MAX_SINGLE,
                actual: single_write.len(),
            });
        }
        for len in [multi_write.len(), multi_read_len] {
            if len > consts::MAX_TRANSFER_LEN {
                return Err(Error::OperationTooLarge {
                    max: consts::MAX_TRANSFER_LEN,
                    actual: len,
                });
            }
        }

        let mut out_buf = Vec::with_capacity(
            consts::MULTI_IO_HEADER_SIZE + single_write.len() + multi_write.len(),
        );
        out_buf.extend_from_slice(&multi_io_header(
            single_write.len(),
            multi_write.len(),
            multi_read_len,
        ));
        out_buf.extend_from_slice(single_write);
        out_buf.extend_from_slice(multi_write);

        self.spi_master_set_lines(lines)?;
        self.transport.bulk_write(&out_buf)?;
        self.transport.bulk_write(&[])?;

        if multi_read_len > 0 {
            self.read_payload(multi_read_len)
        } else {
            Ok(Vec::new())
        }
    }
}

/// Builds the multi-I/O header:
/// | 0x8 | single_len (4 bits) | multi_write_len (16 bits) | multi_read_len (16 bits) |
pub(crate) fn multi_io_header(single_len: usize, write_len: usize, read_len: usize) -> [u8; 5] {
    [
        consts::MULTI_IO_MAGIC | (single_len as u8 & 0x0F),
        (write_len & 0xFF) as u8,
        ((write_len >> 8) & 0xFF) as u8,
        (read_len & 0xFF) as u8,
        ((read_len >> 8) & 0xFF) as u8,
    ]
}
