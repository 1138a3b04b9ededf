//! I2C master functionality for FT4222H devices.

use std::time::{Duration, Instant};

use bitflags::bitflags;
use log::{debug, trace};

use crate::consts;
use crate::device::{Ft4222, Function, SysClock};
use crate::error::{Error, Result};

/// Framing control for an I2C master transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum I2cFlag {
    /// No START or STOP condition.
    None = 0x80,
    /// START condition.
    Start = 0x02,
    /// Repeated START; does not send the master code in HS mode.
    RepeatedStart = 0x03,
    /// STOP condition.
    Stop = 0x04,
    /// START condition followed by the transfer and a STOP condition.
    StartAndStop = 0x06,
}

impl TryFrom<u8> for I2cFlag {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x80 => Ok(I2cFlag::None),
            0x02 => Ok(I2cFlag::Start),
            0x03 => Ok(I2cFlag::RepeatedStart),
            0x04 => Ok(I2cFlag::Stop),
            0x06 => Ok(I2cFlag::StartAndStop),
            v => Err(Error::ArgumentOutOfRange(format!("I2C flag 0x{:02X}", v))),
        }
    }
}

bitflags! {
    /// Snapshot of the I2C controller status register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct I2cControllerStatus: u8 {
        /// Controller busy: all other status bits invalid.
        const BUSY = 0x01;
        /// Error condition.
        const ERROR = 0x02;
        /// Slave address was not acknowledged during last operation.
        const ADDRESS_NACK = 0x04;
        /// Data not acknowledged during last operation.
        const DATA_NACK = 0x08;
        /// Arbitration lost during last operation.
        const ARB_LOST = 0x10;
        /// Controller idle.
        const IDLE = 0x20;
        /// Bus busy.
        const BUS_BUSY = 0x40;
    }
}

impl I2cControllerStatus {
    /// Maps the status of the last transaction with `address` to an outcome.
    pub fn check(self, address: u8) -> Result<()> {
        if self.contains(Self::BUSY) {
            return Err(Error::I2cBusy);
        }
        if self.contains(Self::ARB_LOST) {
            return Err(Error::I2cArbitrationLost { address });
        }
        if self.contains(Self::ADDRESS_NACK) {
            return Err(Error::I2cNack { address });
        }
        if self.contains(Self::DATA_NACK) {
            return Err(Error::I2cDataNack { address });
        }
        if self.contains(Self::ERROR) {
            return Err(Error::I2cControllerError {
                address,
                status: self,
            });
        }
        Ok(())
    }
}

/// I2C bus speed class, sent to the chip before the timer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum I2cSpeedMode {
    /// Up to 100 kbps.
    Standard = 0,
    /// Up to 400 kbps.
    Fast = 1,
    /// Up to 1 Mbps.
    FastPlus = 2,
    /// Up to 3.4 Mbps.
    HighSpeed = 3,
}

impl TryFrom<u8> for I2cSpeedMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(I2cSpeedMode::Standard),
            1 => Ok(I2cSpeedMode::Fast),
            2 => Ok(I2cSpeedMode::FastPlus),
            3 => Ok(I2cSpeedMode::HighSpeed),
            v => Err(Error::ArgumentOutOfRange(format!("I2C speed mode {}", v))),
        }
    }
}

/// Clock settings that realise a requested I2C speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cSpeed {
    /// Speed class.
    pub mode: I2cSpeedMode,
    /// System clock the chip must run on.
    pub sys_clock: SysClock,
    /// SCL timer value (0-127).
    pub timer: u8,
}

impl I2cSpeed {
    /// Computes the fastest settings not exceeding `kbps` (60-3400).
    pub fn for_kbps(kbps: u32) -> Result<Self> {
        if !(consts::i2c::MIN_KBPS..=consts::i2c::MAX_KBPS).contains(&kbps) {
            return Err(Error::ArgumentOutOfRange(format!(
                "I2C speed {} kbps out of range ({}-{})",
                kbps,
                consts::i2c::MIN_KBPS,
                consts::i2c::MAX_KBPS
            )));
        }
        let (mode, sys_clock) = match kbps {
            0..=100 => (I2cSpeedMode::Standard, SysClock::Clk60),
            101..=400 => (I2cSpeedMode::Fast, SysClock::Clk60),
            401..=1000 => (I2cSpeedMode::FastPlus, SysClock::Clk80),
            _ => (I2cSpeedMode::HighSpeed, SysClock::Clk80),
        };
        let divisor = Self::divisor(mode);
        let timer = sys_clock.to_khz().div_ceil(divisor * kbps) - 1;
        Ok(Self {
            mode,
            sys_clock,
            timer: timer.min(0x7F) as u8,
        })
    }

    fn divisor(mode: I2cSpeedMode) -> u32 {
        match mode {
            I2cSpeedMode::Standard => 8,
            I2cSpeedMode::Fast | I2cSpeedMode::FastPlus => 6,
            I2cSpeedMode::HighSpeed => 10,
        }
    }

    /// Resulting SCL frequency in kHz.
    pub fn actual_khz(&self) -> f64 {
        self.sys_clock.to_khz() as f64 / (Self::divisor(self.mode) * (self.timer as u32 + 1)) as f64
    }
}

/// Validates a 7-bit slave address.
fn slave_address(addr: u16) -> Result<u8> {
    if addr <= 0x7F {
        Ok(addr as u8)
    } else {
        Err(Error::ArgumentOutOfRange(format!(
            "I2C slave address 0x{:X} must be 7-bit (0-127)",
            addr
        )))
    }
}

/// Builds the 4-byte header that precedes every I2C master transaction.
pub(crate) fn transaction_header(address: u8, read: bool, flag: I2cFlag, len: usize) -> [u8; 4] {
    let rw = if read { consts::i2c::READ_BIT } else { 0 };
    [
        (address << 1) | rw,
        flag as u8,
        ((len >> 8) & 0xFF) as u8,
        (len & 0xFF) as u8,
    ]
}

fn check_len(len: usize) -> Result<()> {
    if len > consts::MAX_TRANSFER_LEN {
        return Err(Error::OperationTooLarge {
            max: consts::MAX_TRANSFER_LEN,
            actual: len,
        });
    }
    Ok(())
}

impl Ft4222 {
    // --- I2C Methods ---
    /// Configures the chip as I2C master running at (at most) `kbps`.
    pub fn i2c_master_init(&mut self, kbps: u32) -> Result<()> {
        let speed = I2cSpeed::for_kbps(kbps)?;
        debug!(
            "Setting I2C speed ~{}kbps: mode={:?}, timer=0x{:02X} ({:.1} kHz)",
            kbps,
            speed.mode,
            speed.timer,
            speed.actual_khz()
        );
        self.set_clock(speed.sys_clock)?;
        self.config_request(consts::config::I2C_SET_SPEED_MODE, speed.mode as u8)?;
        self.config_request(consts::config::I2C_SET_TIMER, speed.timer)?;
        self.config_request(consts::config::SET_MODE, consts::function::I2C_MASTER)?;
        self.config_request(
            consts::config::I2C_RESET,
            consts::reset_kind::I2C_CONTROLLER,
        )?;
        self.function = Function::I2cMaster;
        Ok(())
    }

    /// Writes `data` to the slave with START and STOP. Returns the number of bytes sent.
    ///
    /// Like the vendor call, a NACK does not fail the write; use
    /// [`Ft4222::i2c_master_get_status`] or [`Ft4222::i2c_master_wait_status`] to check it.
    pub fn i2c_master_write(&mut self, slave_addr: u16, data: &[u8]) -> Result<usize> {
        self.i2c_master_write_ex(slave_addr, I2cFlag::StartAndStop, data)
    }

    /// Writes `data` with explicit framing control.
    pub fn i2c_master_write_ex(&mut self, slave_addr: u16, flag: I2cFlag, data: &[u8]) -> Result<usize> {
        self.require(Function::I2cMaster)?;
        let address = slave_address(slave_addr)?;
        check_len(data.len())?;

        let mut out_buf = Vec::with_capacity(consts::i2c::HEADER_SIZE + data.len());
        out_buf.extend_from_slice(&transaction_header(address, false, flag, data.len()));
        out_buf.extend_from_slice(data);

        debug!(
            "I2C write to 0x{:02X}: {} bytes, flag={:?}",
            address,
            data.len(),
            flag
        );
        trace!("I2C OUT buffer: {:02X?}", &out_buf);
        let written = self.transport.bulk_write(&out_buf)?;
        Ok(written.saturating_sub(consts::i2c::HEADER_SIZE))
    }

    /// Reads `len` bytes from the slave with START and STOP.
    pub fn i2c_master_read(&mut self, slave_addr: u16, len: usize) -> Result<Vec<u8>> {
        self.i2c_master_read_ex(slave_addr, I2cFlag::StartAndStop, len)
    }

    /// Reads `len` bytes with explicit framing control.
    pub fn i2c_master_read_ex(&mut self, slave_addr: u16, flag: I2cFlag, len: usize) -> Result<Vec<u8>> {
        self.require(Function::I2cMaster)?;
        let address = slave_address(slave_addr)?;
        check_len(len)?;

        debug!("I2C read from 0x{:02X}: {} bytes, flag={:?}", address, len, flag);
        self.transport
            .bulk_write(&transaction_header(address, true, flag, len))?;
        let data = self.read_payload(len)?;
        trace!("I2C IN data: {:02X?}", &data);
        Ok(data)
    }

    /// Reads the controller status register.
    pub fn i2c_master_get_status(&mut self) -> Result<I2cControllerStatus> {
        self.require(Function::I2cMaster)?;
        let data = self.info_request(consts::info::I2C_STATUS, 1)?;
        let raw = *data
            .first()
            .ok_or_else(|| Error::InvalidResponse("Empty I2C status".into()))?;
        Ok(I2cControllerStatus::from_bits_retain(raw))
    }

    /// Polls the controller until it is no longer busy, then decodes the
    /// outcome of the last transaction with `slave_addr`.
    pub fn i2c_master_wait_status(&mut self, slave_addr: u16, timeout: Duration) -> Result<()> {
        let address = slave_address(slave_addr)?;
        let start = Instant::now();
        loop {
            let status = self.i2c_master_get_status()?;
            if !status.contains(I2cControllerStatus::BUSY) {
                trace!("I2C status 0x{:02X}", status.bits());
                return status.check(address);
            }
            if start.elapsed() >= timeout {
                return Err(Error::I2cBusy);
            }
            std::thread::sleep(Duration::from_micros(500));
        }
    }

    /// Resets the I2C master controller.
    pub fn i2c_master_reset(&mut self) -> Result<()> {
        self.require(Function::I2cMaster)?;
        self.config_request(
            consts::config::I2C_RESET,
            consts::reset_kind::I2C_CONTROLLER,
        )
    }

    /// Recovers a stuck bus by clocking SCL until the slave releases SDA.
    pub fn i2c_master_reset_bus(&mut self) -> Result<()> {
        self.require(Function::I2cMaster)?;
        self.config_request(consts::config::I2C_RESET, consts::reset_kind::I2C_BUS)
    }

    /// Scans the specified range of 7-bit addresses.
    /// Returns the addresses where a device acknowledged.
    ///
    /// # Example
    /// ```no_run
    /// # use ft4222::*;
    /// # fn main() -> Result<()> {
    /// let mut device = Ft4222::open_first()?;
    /// device.i2c_master_init(100)?;
    /// for addr in device.i2c_scan(0x08, 0x77)? {
    ///     println!("Found device at 0x{:02X}", addr);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn i2c_scan(&mut self, start_addr: u8, end_addr: u8) -> Result<Vec<u8>> {
        self.i2c_scan_with_progress(start_addr, end_addr, |_, _, _, _| {})
    }

    /// Scans the standard address range (0x08 to 0x77).
    pub fn i2c_scan_default(&mut self) -> Result<Vec<u8>> {
        self.i2c_scan(0x08, 0x77)
    }

    /// Bus scan calling `progress_callback(addr, found, current_idx, total)` for each address.
    pub fn i2c_scan_with_progress<F>(
        &mut self,
        start_addr: u8,
        end_addr: u8,
        mut progress_callback: F,
    ) -> Result<Vec<u8>>
    where
        F: FnMut(u8, bool, usize, usize),
    {
        if start_addr > end_addr || end_addr > 0x7F {
            return Err(Error::ArgumentOutOfRange(format!(
                "Invalid scan range 0x{:02X}-0x{:02X}",
                start_addr, end_addr
            )));
        }
        let mut found_devices = Vec::new();
        let total_addresses = (end_addr - start_addr) as usize + 1;
        let poll = Duration::from_millis(consts::i2c::STATUS_POLL_MS);

        for (idx, addr) in (start_addr..=end_addr).enumerate() {
            self.i2c_master_write_ex(addr as u16, I2cFlag::StartAndStop, &[])?;
            let found = match self.i2c_master_wait_status(addr as u16, poll) {
                Ok(()) => {
                    found_devices.push(addr);
                    true
                }
                Err(Error::I2cNack { .. }) | Err(Error::I2cDataNack { .. }) => false,
                Err(e @ Error::I2cArbitrationLost { .. }) | Err(e @ Error::I2cBusy) => {
                    debug!("Error scanning address 0x{:02X}: {}", addr, e);
                    self.i2c_master_reset()?;
                    false
                }
                Err(e) => return Err(e),
            };
            progress_callback(addr, found, idx, total_addresses);
        }

        Ok(found_devices)
    }
}
