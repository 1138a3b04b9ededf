//! SPI slave functionality.
//!
//! Received data is pulled from the chip on demand by
//! [`Ft4222::spi_slave_get_rx_status`] and buffered on the host until read.

use std::collections::VecDeque;

use log::{debug, trace, warn};

use crate::consts;
use crate::device::{Ft4222, Function};
use crate::error::{Error, Result};
use crate::slave_frame::{Frame, FrameCommand, FrameDecoder};
use crate::spi::{Cpha, Cpol};
use crate::transport::strip_modem_status;

/// How the SPI slave exchanges data with the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SpiSlaveProtocol {
    /// Framed transfers, each acknowledged by the receiver.
    #[default]
    WithProtocol = 0,
    /// Raw bytes, no framing.
    NoProtocol = 1,
    /// Framed transfers without acknowledgements.
    NoAck = 2,
}

impl TryFrom<u8> for SpiSlaveProtocol {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(SpiSlaveProtocol::WithProtocol),
            1 => Ok(SpiSlaveProtocol::NoProtocol),
            2 => Ok(SpiSlaveProtocol::NoAck),
            v => Err(Error::ArgumentOutOfRange(format!("SPI slave protocol {}", v))),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct SpiSlaveState {
    pub(crate) protocol: SpiSlaveProtocol,
    pub(crate) decoder: FrameDecoder,
    pub(crate) rx: VecDeque<u8>,
    pub(crate) next_sn: u8,
    pub(crate) pending: VecDeque<u8>,
}

impl SpiSlaveState {
    fn new(protocol: SpiSlaveProtocol) -> Self {
        Self {
            protocol,
            ..Self::default()
        }
    }
}

impl Ft4222 {
    // --- SPI Slave Methods ---
    /// Configures the chip as SPI slave using the acknowledged frame protocol.
    pub fn spi_slave_init(&mut self) -> Result<()> {
        self.spi_slave_init_ex(SpiSlaveProtocol::WithProtocol)
    }

    /// Configures the chip as SPI slave with the given protocol.
    pub fn spi_slave_init_ex(&mut self, protocol: SpiSlaveProtocol) -> Result<()> {
        debug!("Initializing SPI slave: protocol={:?}", protocol);
        self.config_request(consts::config::SPI_SLAVE_SET_PROTOCOL, protocol as u8)?;
        self.config_request(consts::config::SET_MODE, consts::function::SPI_SLAVE)?;
        self.config_request(consts::config::SPI_RESET, consts::reset_kind::SPI_FULL)?;

        self.spi_slave = SpiSlaveState::new(protocol);
        self.function = Function::SpiSlave;
        Ok(())
    }

    /// Sets the SPI mode the slave samples with.
    pub fn spi_slave_set_mode(&mut self, cpol: Cpol, cpha: Cpha) -> Result<()> {
        self.require(Function::SpiSlave)?;
        self.config_request(consts::config::SPI_SET_CLK_IDLE, cpol as u8)?;
        self.config_request(consts::config::SPI_SET_CAPTURE, cpha as u8)
    }

    /// Collects data sent by the master and returns how many bytes are ready to read.
    pub fn spi_slave_get_rx_status(&mut self) -> Result<usize> {
        self.require(Function::SpiSlave)?;
        let raw = self.transport.bulk_read(consts::READ_BUFFER_SIZE)?;
        let data = strip_modem_status(&raw, self.transport.max_packet_size());
        if !data.is_empty() {
            trace!("SPI slave received {} bytes: {:02X?}", data.len(), data);
        }

        if self.spi_slave.protocol == SpiSlaveProtocol::NoProtocol {
            self.spi_slave.rx.extend(data);
            return Ok(self.spi_slave.rx.len());
        }

        self.spi_slave.decoder.push(&data);
        while let Some(frame) = self.spi_slave.decoder.next_frame() {
            self.handle_slave_frame(frame)?;
        }
        Ok(self.spi_slave.rx.len())
    }

    fn handle_slave_frame(&mut self, frame: Frame) -> Result<()> {
        match frame.command {
            FrameCommand::MasterTransfer | FrameCommand::ShortMasterTransfer => {
                trace!("SPI slave frame sn={} len={}", frame.sn, frame.payload.len());
                self.spi_slave.rx.extend(frame.payload);
                if self.spi_slave.protocol == SpiSlaveProtocol::WithProtocol {
                    let ack = Frame::ack(frame.sn).encode()?;
                    self.transport.bulk_write(&ack)?;
                }
            }
            FrameCommand::Ack => {
                let pending = &mut self.spi_slave.pending;
                match pending.iter().position(|&sn| sn == frame.sn) {
                    Some(pos) => {
                        pending.remove(pos);
                    }
                    None => warn!("SPI slave: unexpected ack for sn={}", frame.sn),
                }
            }
            command => {
                warn!("SPI slave: ignoring {:?} frame from master", command);
            }
        }
        Ok(())
    }

    /// Removes and returns up to `len` received bytes.
    pub fn spi_slave_read(&mut self, len: usize) -> Result<Vec<u8>> {
        self.require(Function::SpiSlave)?;
        let count = len.min(self.spi_slave.rx.len());
        Ok(self.spi_slave.rx.drain(..count).collect())
    }

    /// Queues `data` for the master to clock out. Returns the number of payload bytes accepted.
    pub fn spi_slave_write(&mut self, data: &[u8]) -> Result<usize> {
        self.require(Function::SpiSlave)?;
        if data.len() > consts::MAX_TRANSFER_LEN {
            return Err(Error::OperationTooLarge {
                max: consts::MAX_TRANSFER_LEN,
                actual: data.len(),
            });
        }

        match self.spi_slave.protocol {
            SpiSlaveProtocol::NoProtocol => {
                self.transport.bulk_write(data)?;
            }
            protocol => {
                let sn = self.spi_slave.next_sn;
                self.spi_slave.next_sn = sn.wrapping_add(1);
                let frame = Frame::new(FrameCommand::SlaveTransfer, sn, data.to_vec()).encode()?;
                self.transport.bulk_write(&frame)?;
                if protocol == SpiSlaveProtocol::WithProtocol {
                    self.spi_slave.pending.push_back(sn);
                }
            }
        }
        Ok(data.len())
    }

    /// Sequence numbers of slave writes not yet acknowledged by the master.
    pub fn spi_slave_pending_acks(&self) -> Vec<u8> {
        self.spi_slave.pending.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_codes() {
        assert_eq!(SpiSlaveProtocol::WithProtocol as u8, 0);
        assert_eq!(SpiSlaveProtocol::NoProtocol as u8, 1);
        assert_eq!(SpiSlaveProtocol::NoAck as u8, 2);
        assert_eq!(
            SpiSlaveProtocol::try_from(2).unwrap(),
            SpiSlaveProtocol::NoAck
        );
        assert!(SpiSlaveProtocol::try_from(3).is_err());
    }
}
