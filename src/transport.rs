//! USB transport underneath an [`Ft4222`](crate::Ft4222) session.
//!
//! The FT4222H speaks a vendor-specific protocol made of control transfers
//! (configuration, status) and bulk transfers (I2C/SPI payload). The
//! [`Transport`] trait is the seam between the protocol encoders and the USB
//! stack; [`UsbTransport`] is the `nusb` implementation.

use std::time::Duration;

use log::trace;
use nusb::transfer::{Buffer, Bulk, ControlIn, ControlOut, ControlType, In, Out, Recipient};
use nusb::{Endpoint, Interface, MaybeFuture};

use crate::consts;
use crate::error::{Error, Result};

/// Raw access to one FT4222H interface.
///
/// `bulk_read` returns data exactly as received, including the modem-status
/// bytes that prefix each packet; use [`strip_modem_status`] to get the
/// payload.
pub trait Transport: std::fmt::Debug {
    /// Vendor control IN transfer.
    fn control_in(&mut self, request: u8, value: u16, index: u16, length: u16) -> Result<Vec<u8>>;

    /// Vendor control OUT transfer.
    fn control_out(&mut self, request: u8, value: u16, index: u16, data: &[u8]) -> Result<()>;

    /// Bulk OUT transfer. An empty slice sends a zero-length packet.
    fn bulk_write(&mut self, data: &[u8]) -> Result<usize>;

    /// One bulk IN transfer of at most `max_len` bytes.
    fn bulk_read(&mut self, max_len: usize) -> Result<Vec<u8>>;

    /// Bulk IN packet size (512 on high-speed, 64 on full-speed).
    fn max_packet_size(&self) -> usize;
}

/// Removes the two modem-status bytes from the start of every packet in `raw`.
pub fn strip_modem_status(raw: &[u8], packet_size: usize) -> Vec<u8> {
    let mut payload = Vec::with_capacity(raw.len());
    for packet in raw.chunks(packet_size.max(consts::MODEM_STATUS_SIZE + 1)) {
        if packet.len() > consts::MODEM_STATUS_SIZE {
            payload.extend_from_slice(&packet[consts::MODEM_STATUS_SIZE..]);
        }
    }
    payload
}

/// Timeouts used by [`UsbTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportTimeouts {
    /// Timeout for control transfers.
    pub control: Duration,
    /// Timeout for each bulk transfer.
    pub bulk: Duration,
}

impl Default for TransportTimeouts {
    fn default() -> Self {
        Self {
            control: Duration::from_secs(5),
            bulk: Duration::from_secs(30),
        }
    }
}

/// [`Transport`] over a claimed `nusb` interface.
pub struct UsbTransport {
    interface: Interface,
    in_ep: Endpoint<Bulk, In>,
    out_ep: Endpoint<Bulk, Out>,
    timeouts: TransportTimeouts,
}

impl UsbTransport {
    /// Wraps a claimed interface and its bulk endpoint addresses.
    pub fn new(interface: Interface, in_addr: u8, out_addr: u8) -> Result<Self> {
        Self::with_timeouts(interface, in_addr, out_addr, TransportTimeouts::default())
    }

    /// Like [`UsbTransport::new`] with explicit timeouts.
    pub fn with_timeouts(
        interface: Interface,
        in_addr: u8,
        out_addr: u8,
        timeouts: TransportTimeouts,
    ) -> Result<Self> {
        let in_ep = interface
            .endpoint::<Bulk, In>(in_addr)
            .map_err(|e| Error::OpenFailed(format!("IN endpoint 0x{:02X}: {}", in_addr, e)))?;
        let out_ep = interface
            .endpoint::<Bulk, Out>(out_addr)
            .map_err(|e| Error::OpenFailed(format!("OUT endpoint 0x{:02X}: {}", out_addr, e)))?;
        Ok(Self {
            interface,
            in_ep,
            out_ep,
            timeouts,
        })
    }

    /// Returns the timeouts in use.
    pub fn timeouts(&self) -> TransportTimeouts {
        self.timeouts
    }
}

impl std::fmt::Debug for UsbTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsbTransport")
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl Transport for UsbTransport {
    fn control_in(&mut self, request: u8, value: u16, index: u16, length: u16) -> Result<Vec<u8>> {
        let data = self
            .interface
            .control_in(
                ControlIn {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    length,
                },
                self.timeouts.control,
            )
            .wait()
            .map_err(|e| {
                Error::Transfer(format!(
                    "control IN 0x{:02X}/0x{:04X} failed: {}",
                    request, value, e
                ))
            })?;
        trace!(
            "Control IN 0x{:02X} value=0x{:04X} index={}: {:02X?}",
            request,
            value,
            index,
            &data[..]
        );
        Ok(data)
    }

    fn control_out(&mut self, request: u8, value: u16, index: u16, data: &[u8]) -> Result<()> {
        trace!(
            "Control OUT 0x{:02X} value=0x{:04X} index={}: {:02X?}",
            request,
            value,
            index,
            data
        );
        self.interface
            .control_out(
                ControlOut {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    data,
                },
                self.timeouts.control,
            )
            .wait()
            .map_err(|e| {
                Error::Transfer(format!(
                    "control OUT 0x{:02X}/0x{:04X} failed: {}",
                    request, value, e
                ))
            })?;
        Ok(())
    }

    fn bulk_write(&mut self, data: &[u8]) -> Result<usize> {
        // Zero-length packet ends an SPI transaction
        if data.is_empty() {
            let completion = self
                .out_ep
                .transfer_blocking(Buffer::new(0), self.timeouts.bulk);
            completion
                .into_result()
                .map_err(|e| Error::Transfer(format!("Empty packet failed: {}", e)))?;
            trace!("Bulk write empty packet");
            return Ok(0);
        }

        let mut offset = 0;
        while offset < data.len() {
            let chunk_len = std::cmp::min(consts::WRITE_CHUNK_SIZE, data.len() - offset);
            let mut out_buf = Buffer::new(chunk_len);
            out_buf.extend_from_slice(&data[offset..offset + chunk_len]);

            let completion = self.out_ep.transfer_blocking(out_buf, self.timeouts.bulk);
            completion.into_result().map_err(|e| {
                Error::Transfer(format!("Bulk write failed at offset {}: {}", offset, e))
            })?;
            offset += chunk_len;
        }

        trace!("Bulk write {} bytes: {:02X?}", data.len(), data);
        Ok(data.len())
    }

    fn bulk_read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        let packet = self.in_ep.max_packet_size();
        // Request length must be a multiple of the packet size
        let aligned_len = max_len.max(1).div_ceil(packet) * packet;
        let mut in_buf = Buffer::new(aligned_len);
        in_buf.set_requested_len(aligned_len);

        let completion = self.in_ep.transfer_blocking(in_buf, self.timeouts.bulk);
        let data = completion
            .into_result()
            .map_err(|e| Error::Transfer(format!("Bulk read failed: {}", e)))?;

        trace!("Bulk read {} raw bytes", data.len());
        Ok(data.to_vec())
    }

    fn max_packet_size(&self) -> usize {
        self.in_ep.max_packet_size()
    }
}
