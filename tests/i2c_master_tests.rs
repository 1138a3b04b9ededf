mod common;

use std::time::Duration;

use common::{open_mock, open_mock_with_info};
use ft4222::consts::{self, config};
use ft4222::{DeviceFlags, DeviceInfo, DeviceType, Error, I2cControllerStatus, I2cFlag};

fn i2c_status(mock: &common::MockTransport, status: u8) {
    mock.respond(consts::REQUEST_INFO, consts::info::I2C_STATUS, vec![status]);
}

#[test]
fn test_init_sends_speed_sequence() {
    let (mut device, mock) = open_mock(0);
    device.i2c_master_init(400).unwrap();

    assert_eq!(
        mock.config_calls(),
        vec![
            (config::SET_CLOCK, 0),
            (config::I2C_SET_SPEED_MODE, 1),
            (config::I2C_SET_TIMER, 24),
            (config::SET_MODE, consts::function::I2C_MASTER),
            (config::I2C_RESET, 1),
        ]
    );
    assert_eq!(device.get_clock(), ft4222::SysClock::Clk60);
}

#[test]
fn test_init_fast_plus_switches_to_80mhz() {
    let (mut device, mock) = open_mock(0);
    device.i2c_master_init(1000).unwrap();
    assert_eq!(mock.config_calls()[0], (config::SET_CLOCK, 3));
    assert_eq!(mock.config_calls()[1], (config::I2C_SET_SPEED_MODE, 2));
    assert_eq!(device.get_clock(), ft4222::SysClock::Clk80);
}

#[test]
fn test_init_rejects_out_of_range_speed() {
    let (mut device, mock) = open_mock(0);
    assert!(matches!(
        device.i2c_master_init(50),
        Err(Error::ArgumentOutOfRange(_))
    ));
    assert!(matches!(
        device.i2c_master_init(4000),
        Err(Error::ArgumentOutOfRange(_))
    ));
    assert!(mock.config_calls().is_empty());
}

#[test]
fn test_requests_use_interface_control_index() {
    let info = DeviceInfo {
        index: 1,
        flags: DeviceFlags::HISPEED,
        device_type: DeviceType::Ft4222H0,
        id: 0x0403_601C,
        location: 0x0001_0501,
        serial_number: "FT1234B".to_string(),
        description: "FT4222 B".to_string(),
        interface_number: 1,
        bus: 1,
        address: 5,
    };
    let (mut device, mock) = open_mock_with_info(0, Some(info));
    device.i2c_master_init(100).unwrap();
    let state = mock.state.borrow();
    assert!(state.control_out.iter().all(|&(_, _, index)| index == 2));
}

#[test]
fn test_transfers_require_init() {
    let (mut device, _mock) = open_mock(0);
    assert!(matches!(
        device.i2c_master_write(0x50, &[1, 2]),
        Err(Error::NotInitialized { .. })
    ));
    assert!(matches!(
        device.i2c_master_read(0x50, 2),
        Err(Error::NotInitialized { .. })
    ));
}

#[test]
fn test_write_sends_header_and_data() {
    let (mut device, mock) = open_mock(0);
    device.i2c_master_init(100).unwrap();

    let written = device.i2c_master_write(0x50, &[0x00, 0x10, 0xAB]).unwrap();
    assert_eq!(written, 3);
    assert_eq!(
        mock.bulk_writes(),
        vec![vec![0xA0, 0x06, 0x00, 0x03, 0x00, 0x10, 0xAB]]
    );
}

#[test]
fn test_write_ex_uses_flag() {
    let (mut device, mock) = open_mock(0);
    device.i2c_master_init(100).unwrap();
    device
        .i2c_master_write_ex(0x21, I2cFlag::Start, &[0x07])
        .unwrap();
    assert_eq!(mock.bulk_writes(), vec![vec![0x42, 0x02, 0x00, 0x01, 0x07]]);
}

#[test]
fn test_read_returns_payload_without_modem_status() {
    let (mut device, mock) = open_mock(0);
    device.i2c_master_init(100).unwrap();
    mock.queue_read(&[0x11, 0x22]);
    mock.queue_read(&[0x33]);

    let data = device.i2c_master_read(0x50, 3).unwrap();
    assert_eq!(data, vec![0x11, 0x22, 0x33]);
    assert_eq!(mock.bulk_writes(), vec![vec![0xA1, 0x06, 0x00, 0x03]]);
}

#[test]
fn test_read_ex_repeated_start() {
    let (mut device, mock) = open_mock(0);
    device.i2c_master_init(100).unwrap();
    mock.queue_read(&[0x5A]);
    let data = device
        .i2c_master_read_ex(0x50, I2cFlag::RepeatedStart, 1)
        .unwrap();
    assert_eq!(data, vec![0x5A]);
    assert_eq!(mock.bulk_writes()[0][1], 0x03);
}

#[test]
fn test_read_times_out_without_data() {
    let (mut device, _mock) = open_mock(0);
    device.i2c_master_init(100).unwrap();
    assert!(matches!(
        device.i2c_master_read(0x50, 4),
        Err(Error::Timeout)
    ));
}

#[test]
fn test_rejects_bad_address_and_length() {
    let (mut device, _mock) = open_mock(0);
    device.i2c_master_init(100).unwrap();
    assert!(matches!(
        device.i2c_master_write(0x80, &[0]),
        Err(Error::ArgumentOutOfRange(_))
    ));
    let big = vec![0u8; 0x1_0000];
    assert!(matches!(
        device.i2c_master_write(0x50, &big),
        Err(Error::OperationTooLarge { max: 0xFFFF, .. })
    ));
}

#[test]
fn test_status_and_wait() {
    let (mut device, mock) = open_mock(0);
    device.i2c_master_init(100).unwrap();

    i2c_status(&mock, 0x20);
    assert_eq!(
        device.i2c_master_get_status().unwrap(),
        I2cControllerStatus::IDLE
    );
    device
        .i2c_master_wait_status(0x50, Duration::from_millis(10))
        .unwrap();
}

#[test]
fn test_wait_status_reports_nack_after_busy() {
    let (mut device, mock) = open_mock(0);
    device.i2c_master_init(100).unwrap();
    i2c_status(&mock, 0x01);
    i2c_status(&mock, 0x06);
    assert!(matches!(
        device.i2c_master_wait_status(0x50, Duration::from_millis(100)),
        Err(Error::I2cNack { address: 0x50 })
    ));
}

#[test]
fn test_wait_status_busy_timeout() {
    let (mut device, mock) = open_mock(0);
    device.i2c_master_init(100).unwrap();
    i2c_status(&mock, 0x41);
    assert!(matches!(
        device.i2c_master_wait_status(0x50, Duration::from_millis(5)),
        Err(Error::I2cBusy)
    ));
}

#[test]
fn test_scan_finds_acknowledging_devices() {
    let (mut device, mock) = open_mock(0);
    device.i2c_master_init(100).unwrap();
    i2c_status(&mock, 0x26);
    i2c_status(&mock, 0x20);
    i2c_status(&mock, 0x26);

    let found = device.i2c_scan(0x50, 0x52).unwrap();
    assert_eq!(found, vec![0x51]);

    let writes = mock.bulk_writes();
    assert_eq!(writes.len(), 3);
    assert_eq!(writes[1], vec![0xA2, 0x06, 0x00, 0x00]);
}

#[test]
fn test_scan_resets_after_arbitration_loss() {
    let (mut device, mock) = open_mock(0);
    device.i2c_master_init(100).unwrap();
    i2c_status(&mock, 0x12);
    mock.clear_calls();

    let found = device.i2c_scan(0x10, 0x10).unwrap();
    assert!(found.is_empty());
    assert_eq!(mock.config_calls(), vec![(config::I2C_RESET, 1)]);
}

#[test]
fn test_reset_bus() {
    let (mut device, mock) = open_mock(0);
    device.i2c_master_init(100).unwrap();
    mock.clear_calls();
    device.i2c_master_reset().unwrap();
    device.i2c_master_reset_bus().unwrap();
    assert_eq!(
        mock.config_calls(),
        vec![(config::I2C_RESET, 1), (config::I2C_RESET, 2)]
    );
}
