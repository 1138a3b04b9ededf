//! Scripted transport for driving an `Ft4222` session without hardware.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use ft4222::consts;
use ft4222::{DeviceInfo, Error, Ft4222, Result, Transport};

/// Modem-status bytes the chip puts in front of every IN packet.
pub const MODEM_STATUS: [u8; 2] = [0x02, 0x60];

#[derive(Debug, Default)]
pub struct MockState {
    /// (request, value, index) of every control OUT transfer.
    pub control_out: Vec<(u8, u16, u16)>,
    /// (request, value, index, length) of every control IN transfer.
    pub control_in: Vec<(u8, u16, u16, u16)>,
    /// Replies keyed by (request, value). The last reply repeats.
    pub responses: HashMap<(u8, u16), VecDeque<Vec<u8>>>,
    pub bulk_writes: Vec<Vec<u8>>,
    pub bulk_reads: VecDeque<Vec<u8>>,
    pub packet_size: usize,
}

#[derive(Debug, Clone)]
pub struct MockTransport {
    pub state: Rc<RefCell<MockState>>,
}

impl MockTransport {
    /// A transport answering GET_CONFIG with `chip_mode` and GET_VERSION with a fixed version.
    pub fn new(chip_mode: u8) -> Self {
        let mock = Self {
            state: Rc::new(RefCell::new(MockState {
                packet_size: consts::USB_PACKET_SIZE,
                ..MockState::default()
            })),
        };
        let mut config = vec![0u8; consts::info::CONFIG_LEN as usize];
        config[0] = chip_mode;
        mock.respond(consts::REQUEST_INFO, consts::info::GET_CONFIG, config);
        mock.respond(
            consts::REQUEST_INFO,
            consts::info::GET_VERSION,
            vec![0x42, 0x22, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x01, 0x00],
        );
        mock
    }

    /// Queues a control IN reply.
    pub fn respond(&self, request: u8, value: u16, data: Vec<u8>) {
        self.state
            .borrow_mut()
            .responses
            .entry((request, value))
            .or_default()
            .push_back(data);
    }

    /// Queues one bulk IN packet carrying `payload`.
    pub fn queue_read(&self, payload: &[u8]) {
        let mut packet = MODEM_STATUS.to_vec();
        packet.extend_from_slice(payload);
        self.state.borrow_mut().bulk_reads.push_back(packet);
    }

    /// Config requests sent so far, as (command, data).
    pub fn config_calls(&self) -> Vec<(u8, u8)> {
        self.state
            .borrow()
            .control_out
            .iter()
            .filter(|(request, _, _)| *request == consts::REQUEST_CONFIG)
            .map(|(_, value, _)| ((value & 0xFF) as u8, (value >> 8) as u8))
            .collect()
    }

    pub fn clear_calls(&self) {
        let mut state = self.state.borrow_mut();
        state.control_out.clear();
        state.control_in.clear();
        state.bulk_writes.clear();
    }

    pub fn bulk_writes(&self) -> Vec<Vec<u8>> {
        self.state.borrow().bulk_writes.clone()
    }
}

impl Transport for MockTransport {
    fn control_in(&mut self, request: u8, value: u16, index: u16, length: u16) -> Result<Vec<u8>> {
        let mut state = self.state.borrow_mut();
        state.control_in.push((request, value, index, length));
        let queue = state
            .responses
            .get_mut(&(request, value))
            .ok_or_else(|| Error::Transfer(format!("no reply for 0x{:02X}/0x{:04X}", request, value)))?;
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        reply.ok_or(Error::Timeout)
    }

    fn control_out(&mut self, request: u8, value: u16, index: u16, _data: &[u8]) -> Result<()> {
        self.state
            .borrow_mut()
            .control_out
            .push((request, value, index));
        Ok(())
    }

    fn bulk_write(&mut self, data: &[u8]) -> Result<usize> {
        self.state.borrow_mut().bulk_writes.push(data.to_vec());
        Ok(data.len())
    }

    fn bulk_read(&mut self, _max_len: usize) -> Result<Vec<u8>> {
        Ok(self
            .state
            .borrow_mut()
            .bulk_reads
            .pop_front()
            .unwrap_or_else(|| MODEM_STATUS.to_vec()))
    }

    fn max_packet_size(&self) -> usize {
        self.state.borrow().packet_size
    }
}

/// Opens a session in chip mode `chip_mode` with no device info (control index 0).
pub fn open_mock(chip_mode: u8) -> (Ft4222, MockTransport) {
    open_mock_with_info(chip_mode, None)
}

pub fn open_mock_with_info(chip_mode: u8, info: Option<DeviceInfo>) -> (Ft4222, MockTransport) {
    let mock = MockTransport::new(chip_mode);
    let device = Ft4222::from_transport(Box::new(mock.clone()), info)
        .expect("mock session should open");
    mock.clear_calls();
    (device, mock)
}
