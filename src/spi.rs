//! SPI settings shared by the master and slave functions.

use log::debug;

use crate::consts;
use crate::device::{Ft4222, Function};
use crate::error::{Error, Result};

/// Output driver current of the SPI pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DrivingStrength {
    #[default]
    Ds4mA = 0,
    Ds8mA = 1,
    Ds12mA = 2,
    Ds16mA = 3,
}

impl TryFrom<u8> for DrivingStrength {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(DrivingStrength::Ds4mA),
            1 => Ok(DrivingStrength::Ds8mA),
            2 => Ok(DrivingStrength::Ds12mA),
            3 => Ok(DrivingStrength::Ds16mA),
            v => Err(Error::ArgumentOutOfRange(format!("Driving strength {}", v))),
        }
    }
}

/// Clock polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Cpol {
    #[default]
    IdleLow = 0,
    IdleHigh = 1,
}

/// Clock phase: the edge on which data is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Cpha {
    #[default]
    Leading = 0,
    Trailing = 1,
}

impl Cpol {
    /// Parse from string ("low"/"0", "high"/"1").
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" | "idle_low" | "0" => Some(Cpol::IdleLow),
            "high" | "idle_high" | "1" => Some(Cpol::IdleHigh),
            _ => None,
        }
    }
}

impl Cpha {
    /// Parse from string ("leading"/"0", "trailing"/"1").
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "leading" | "0" => Some(Cpha::Leading),
            "trailing" | "1" => Some(Cpha::Trailing),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Cpol {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Cpol::IdleLow),
            1 => Ok(Cpol::IdleHigh),
            v => Err(Error::ArgumentOutOfRange(format!("Clock polarity {}", v))),
        }
    }
}

impl TryFrom<u8> for Cpha {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Cpha::Leading),
            1 => Ok(Cpha::Trailing),
            v => Err(Error::ArgumentOutOfRange(format!("Clock phase {}", v))),
        }
    }
}

impl Ft4222 {
    pub(crate) fn require_spi(&self) -> Result<()> {
        match self.function {
            Function::SpiMaster | Function::SpiSlave => Ok(()),
            _ => Err(Error::NotInitialized { function: "SPI" }),
        }
    }

    /// Sets the driver current of the clock, data and slave-select pins.
    pub fn spi_set_driving_strength(
        &mut self,
        clk: DrivingStrength,
        io: DrivingStrength,
        sso: DrivingStrength,
    ) -> Result<()> {
        self.require_spi()?;
        debug!("SPI driving strength: clk={:?} io={:?} sso={:?}", clk, io, sso);
        let data = (clk as u8) | ((io as u8) << 2) | ((sso as u8) << 4);
        self.config_request(consts::config::SPI_SET_DRIVING_STRENGTH, data)
    }

    /// Resets the SPI engine.
    pub fn spi_reset(&mut self) -> Result<()> {
        self.require_spi()?;
        self.config_request(consts::config::SPI_RESET, consts::reset_kind::SPI_FULL)
    }

    /// Aborts the transaction in progress on slave-select line `index` (0-3).
    pub fn spi_reset_transaction(&mut self, index: u8) -> Result<()> {
        self.require_spi()?;
        if index > 3 {
            return Err(Error::ArgumentOutOfRange(format!(
                "SPI transaction index {} (0-3)",
                index
            )));
        }
        self.config_request(consts::config::SPI_RESET_TRANSACTION, index)
    }
}
