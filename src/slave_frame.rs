//! Framing used by the SPI slave when the chip runs its transfer protocol.
//!
//! ```text
//! | 0x5A | cmd | sn | len (BE16) | payload | checksum (BE16) |
//! ```
//!
//! The checksum is the 16-bit wrapping sum of every byte before it,
//! sync word included.

use log::warn;

use crate::consts;
use crate::error::{Error, Result};

/// First byte of every frame.
pub const SYNC_WORD: u8 = 0x5A;

const HEADER_LEN: usize = 5;
const CHECKSUM_LEN: usize = 2;

/// Frame command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameCommand {
    MasterTransfer = 0x80,
    SlaveTransfer = 0x81,
    ShortMasterTransfer = 0x82,
    ShortSlaveTransfer = 0x83,
    Ack = 0x84,
}

impl TryFrom<u8> for FrameCommand {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x80 => Ok(FrameCommand::MasterTransfer),
            0x81 => Ok(FrameCommand::SlaveTransfer),
            0x82 => Ok(FrameCommand::ShortMasterTransfer),
            0x83 => Ok(FrameCommand::ShortSlaveTransfer),
            0x84 => Ok(FrameCommand::Ack),
            v => Err(Error::InvalidResponse(format!(
                "Unknown SPI slave frame command 0x{:02X}",
                v
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: FrameCommand,
    /// Sequence number, echoed by the acknowledgement.
    pub sn: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(command: FrameCommand, sn: u8, payload: Vec<u8>) -> Self {
        Self {
            command,
            sn,
            payload,
        }
    }

    /// Acknowledgement for the frame with sequence number `sn`.
    pub fn ack(sn: u8) -> Self {
        Self::new(FrameCommand::Ack, sn, Vec::new())
    }

    /// Serialises the frame. Fails when the payload does not fit the 16-bit length field.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.payload.len() > consts::MAX_TRANSFER_LEN {
            return Err(Error::OperationTooLarge {
                max: consts::MAX_TRANSFER_LEN,
                actual: self.payload.len(),
            });
        }
        let len = self.payload.len() as u16;
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len() + CHECKSUM_LEN);
        out.push(SYNC_WORD);
        out.push(self.command as u8);
        out.push(self.sn);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&self.payload);
        let sum = checksum(&out);
        out.extend_from_slice(&sum.to_be_bytes());
        Ok(out)
    }
}

/// 16-bit wrapping byte sum.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
}

/// Reassembles frames from a byte stream that may split or corrupt them.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    max_payload: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self {
            buf: Vec::new(),
            max_payload: consts::MAX_TRANSFER_LEN,
        }
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that treats any length field above `max_payload` as corrupt.
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_payload: max_payload.min(consts::MAX_TRANSFER_LEN),
        }
    }

    /// Appends received bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Number of buffered bytes not yet consumed by a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Returns the next complete, valid frame, or `None` if more bytes are needed.
    ///
    /// Bytes before a sync word are discarded. A candidate with an unknown
    /// command, an oversized length or a bad checksum costs one byte and the
    /// search resumes after its sync word. While a candidate is still
    /// incomplete, a complete valid frame further on means its length field is
    /// corrupt, so it is dropped too.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            match self.buf.iter().position(|&b| b == SYNC_WORD) {
                Some(0) => {}
                Some(skip) => {
                    warn!("SPI slave: discarding {} bytes before sync word", skip);
                    self.buf.drain(..skip);
                }
                None => {
                    if !self.buf.is_empty() {
                        warn!("SPI slave: discarding {} bytes without sync word", self.buf.len());
                        self.buf.clear();
                    }
                    return None;
                }
            }

            if self.buf.len() < 2 {
                return None;
            }
            let command = match FrameCommand::try_from(self.buf[1]) {
                Ok(command) => command,
                Err(e) => {
                    warn!("SPI slave: {}, resyncing", e);
                    self.buf.drain(..1);
                    continue;
                }
            };

            if self.buf.len() < HEADER_LEN {
                return None;
            }
            let len = u16::from_be_bytes([self.buf[3], self.buf[4]]) as usize;
            if len > self.max_payload {
                warn!(
                    "SPI slave: frame length {} exceeds {}, resyncing",
                    len, self.max_payload
                );
                self.buf.drain(..1);
                continue;
            }
            let total = HEADER_LEN + len + CHECKSUM_LEN;
            if self.buf.len() < total {
                if let Some(next) = self.later_frame_start() {
                    warn!(
                        "SPI slave: incomplete frame (length {}) overtaken by frame at offset {}, resyncing",
                        len, next
                    );
                    self.buf.drain(..1);
                    continue;
                }
                return None;
            }

            let body = &self.buf[..HEADER_LEN + len];
            let expected = checksum(body);
            let received = u16::from_be_bytes([self.buf[total - 2], self.buf[total - 1]]);
            if expected == received {
                let frame = Frame::new(command, self.buf[2], body[HEADER_LEN..].to_vec());
                self.buf.drain(..total);
                return Some(frame);
            }
            warn!(
                "SPI slave: checksum mismatch (expected 0x{:04X}, got 0x{:04X}), resyncing",
                expected, received
            );
            self.buf.drain(..1);
        }
    }

    /// Offset of the first sync word after the front that starts a complete, valid frame.
    fn later_frame_start(&self) -> Option<usize> {
        (1..self.buf.len())
            .filter(|&i| self.buf[i] == SYNC_WORD)
            .find(|&i| complete_frame_len(&self.buf[i..], self.max_payload).is_some())
    }
}

/// Length of the valid frame at the start of `bytes`, if one is fully present.
fn complete_frame_len(bytes: &[u8], max_payload: usize) -> Option<usize> {
    if bytes.len() < HEADER_LEN || bytes[0] != SYNC_WORD {
        return None;
    }
    FrameCommand::try_from(bytes[1]).ok()?;
    let len = u16::from_be_bytes([bytes[3], bytes[4]]) as usize;
    if len > max_payload {
        return None;
    }
    let total = HEADER_LEN + len + CHECKSUM_LEN;
    if bytes.len() < total {
        return None;
    }
    let received = u16::from_be_bytes([bytes[total - 2], bytes[total - 1]]);
    (checksum(&bytes[..total - CHECKSUM_LEN]) == received).then_some(total)
}
