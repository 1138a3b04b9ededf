//! GPIO control for the four FT4222H GPIO ports.

use std::collections::VecDeque;

use bitflags::bitflags;
use log::debug;

use crate::consts;
use crate::device::{Ft4222, Function};
use crate::error::{Error, Result};

bitflags! {
    /// GPIO trigger in interrupt mode. Combinable as a bitmask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GpioTrigger: u8 {
        /// Rising edge.
        const RISING = 0x01;
        /// Falling edge.
        const FALLING = 0x02;
        /// High level.
        const LEVEL_HIGH = 0x04;
        /// Low level.
        const LEVEL_LOW = 0x08;
    }
}

/// Logic level of a GPIO port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum GpioOutput {
    /// Logic low, 0.
    #[default]
    Low = 0,
    /// Logic high, 1.
    High = 1,
}

impl From<bool> for GpioOutput {
    fn from(high: bool) -> Self {
        if high {
            GpioOutput::High
        } else {
            GpioOutput::Low
        }
    }
}

impl TryFrom<u8> for GpioOutput {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(GpioOutput::Low),
            1 => Ok(GpioOutput::High),
            v => Err(Error::ArgumentOutOfRange(format!("GPIO level {}", v))),
        }
    }
}

/// One of the four GPIO ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GpioPort {
    P0 = 0,
    P1 = 1,
    P2 = 2,
    P3 = 3,
}

impl GpioPort {
    /// All ports in order.
    pub const ALL: [GpioPort; 4] = [GpioPort::P0, GpioPort::P1, GpioPort::P2, GpioPort::P3];

    /// Returns the port number (0-3).
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns the bit mask (1 << index) used in port bitmaps.
    #[inline]
    pub fn mask(self) -> u8 {
        1u8 << (self as u8)
    }
}

impl TryFrom<u8> for GpioPort {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        GpioPort::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| Error::ArgumentOutOfRange(format!("GPIO port {} (0-3)", value)))
    }
}

/// Direction of a GPIO port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum GpioDir {
    /// Use as output.
    Output = 0,
    /// Use as input.
    #[default]
    Input = 1,
}

impl TryFrom<u8> for GpioDir {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(GpioDir::Output),
            1 => Ok(GpioDir::Input),
            v => Err(Error::ArgumentOutOfRange(format!("GPIO direction {}", v))),
        }
    }
}

/// Host-side GPIO state of a session.
#[derive(Debug, Default)]
pub(crate) struct GpioState {
    pub(crate) dirs: [GpioDir; consts::GPIO_PORT_COUNT],
    pub(crate) latch: u8,
    /// P2/P3 roles as last set through this session. The chip has no read-back
    /// for them, so a fresh session assumes both are off.
    pub(crate) suspend_out: bool,
    pub(crate) wakeup_interrupt: bool,
    pub(crate) queues: [VecDeque<GpioTrigger>; consts::GPIO_PORT_COUNT],
}

impl GpioState {
    pub(crate) fn new(dirs: [GpioDir; consts::GPIO_PORT_COUNT]) -> Self {
        Self {
            dirs,
            ..Self::default()
        }
    }

    /// Bitmap with a bit set for every input port.
    pub(crate) fn input_mask(&self) -> u8 {
        GpioPort::ALL
            .iter()
            .filter(|p| self.dirs[p.index()] == GpioDir::Input)
            .fold(0, |acc, p| acc | p.mask())
    }

    pub(crate) fn check_not_reserved(&self, port: GpioPort) -> Result<()> {
        match port {
            GpioPort::P2 if self.suspend_out => Err(Error::GpioPortReserved {
                port,
                reason: "suspend out",
            }),
            GpioPort::P3 if self.wakeup_interrupt => Err(Error::GpioPortReserved {
                port,
                reason: "wake up/interrupt",
            }),
            _ => Ok(()),
        }
    }
}

impl Ft4222 {
    // --- GPIO Methods ---
    /// Puts the chip in GPIO mode with the given direction for each port.
    pub fn gpio_init(&mut self, dirs: [GpioDir; consts::GPIO_PORT_COUNT]) -> Result<()> {
        let mut state = GpioState::new(dirs);
        state.suspend_out = self.gpio.suspend_out;
        state.wakeup_interrupt = self.gpio.wakeup_interrupt;

        debug!("Initializing GPIO: directions={:?}", dirs);
        self.config_request(consts::config::SET_MODE, consts::function::GPIO)?;
        self.config_request(consts::config::GPIO_SET_DIR, state.input_mask())?;
        self.config_request(consts::config::GPIO_WRITE, state.latch)?;

        self.gpio = state;
        self.function = Function::Gpio;
        Ok(())
    }

    /// Returns the configured direction of a port.
    pub fn gpio_get_direction(&self, port: GpioPort) -> GpioDir {
        self.gpio.dirs[port.index()]
    }

    /// Reads the current level of a port.
    pub fn gpio_read(&mut self, port: GpioPort) -> Result<GpioOutput> {
        self.require(Function::Gpio)?;
        let state = self.info_request(consts::info::GET_GPIO_STATE, 1)?;
        let bits = *state
            .first()
            .ok_or_else(|| Error::InvalidResponse("Empty GPIO state".into()))?;
        Ok(GpioOutput::from(bits & port.mask() != 0))
    }

    /// Drives an output port to the given level.
    pub fn gpio_write(&mut self, port: GpioPort, level: GpioOutput) -> Result<()> {
        self.require(Function::Gpio)?;
        self.gpio.check_not_reserved(port)?;
        if self.gpio.dirs[port.index()] != GpioDir::Output {
            return Err(Error::GpioPortIsInput { port });
        }

        let latch = match level {
            GpioOutput::High => self.gpio.latch | port.mask(),
            GpioOutput::Low => self.gpio.latch & !port.mask(),
        };
        debug!("GPIO write {:?}={:?} (latch 0x{:02X})", port, level, latch);
        self.config_request(consts::config::GPIO_WRITE, latch)?;
        self.gpio.latch = latch;
        Ok(())
    }

    /// Enables or disables the suspend-out signal on P2.
    /// While enabled, P2 cannot be driven through [`Ft4222::gpio_write`].
    ///
    /// The setting is tracked on the host and survives `uninitialize`, as it
    /// does on the chip.
    pub fn set_suspend_out(&mut self, enable: bool) -> Result<()> {
        self.config_request(consts::config::SET_SUSPEND_OUT, enable as u8)?;
        self.gpio.suspend_out = enable;
        Ok(())
    }

    /// Enables or disables the wake-up/interrupt function on P3.
    pub fn set_wakeup_interrupt(&mut self, enable: bool) -> Result<()> {
        self.config_request(consts::config::SET_WAKEUP_INTERRUPT, enable as u8)?;
        self.gpio.wakeup_interrupt = enable;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpio_codes() {
        assert_eq!(GpioTrigger::RISING.bits(), 0x01);
        assert_eq!(GpioTrigger::FALLING.bits(), 0x02);
        assert_eq!(GpioTrigger::LEVEL_HIGH.bits(), 0x04);
        assert_eq!(GpioTrigger::LEVEL_LOW.bits(), 0x08);
        assert_eq!(GpioOutput::High as u8, 1);
        assert_eq!(GpioDir::Output as u8, 0);
        assert_eq!(GpioDir::Input as u8, 1);
        assert_eq!(GpioPort::P3 as u8, 3);
    }

    #[test]
    fn test_port_conversion() {
        assert_eq!(GpioPort::try_from(2).unwrap(), GpioPort::P2);
        assert_eq!(GpioPort::P2.mask(), 0b0100);
        assert!(GpioPort::try_from(4).is_err());
    }

    #[test]
    fn test_input_mask() {
        let state = GpioState::new([
            GpioDir::Output,
            GpioDir::Input,
            GpioDir::Output,
            GpioDir::Input,
        ]);
        assert_eq!(state.input_mask(), 0b1010);
    }
}
