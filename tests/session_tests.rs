mod common;

use common::{open_mock, MockTransport};
use ft4222::consts::{self, config};
use ft4222::{ChipMode, Error, Ft4222, GpioDir, SysClock};

#[test]
fn test_open_reads_chip_mode_and_version() {
    let (mut device, mock) = open_mock(2);
    assert_eq!(device.chip_mode(), ChipMode::Mode2);
    assert_eq!(device.chip_mode().cs_channels(), 4);
    assert_eq!(device.get_clock(), SysClock::Clk60);
    assert!(device.device_info().is_none());

    let version = device.get_version().unwrap();
    assert_eq!(version.chip_version, 0x4222_0000);
    assert_eq!(version.firmware_version, 3);
    assert_eq!(
        mock.state.borrow().control_in.last(),
        Some(&(consts::REQUEST_INFO, consts::info::GET_VERSION, 0, 12))
    );
}

#[test]
fn test_unknown_chip_mode_is_rejected() {
    let mock = MockTransport::new(7);
    assert!(matches!(
        Ft4222::from_transport(Box::new(mock), None),
        Err(Error::InvalidResponse(_))
    ));
}

#[test]
fn test_set_clock() {
    let (mut device, mock) = open_mock(0);
    device.set_clock(SysClock::Clk48).unwrap();
    assert_eq!(device.get_clock(), SysClock::Clk48);
    assert_eq!(mock.config_calls(), vec![(config::SET_CLOCK, 2)]);
    assert_eq!(
        mock.state.borrow().control_out[0],
        (consts::REQUEST_CONFIG, 0x0204, 0)
    );
}

#[test]
fn test_flush_and_reset_use_index_zero() {
    let (mut device, mock) = open_mock(0);
    device.flush();
    device.chip_reset().unwrap();

    let state = mock.state.borrow();
    let resets: Vec<u16> = state
        .control_out
        .iter()
        .map(|&(request, value, index)| {
            assert_eq!(request, consts::REQUEST_RESET);
            assert_eq!(index, 0);
            value
        })
        .collect();
    assert_eq!(
        resets,
        vec![
            consts::reset::OUTPUT_FLUSH,
            consts::reset::OUTPUT_FLUSH,
            consts::reset::OUTPUT_FLUSH,
            consts::reset::OUTPUT_FLUSH,
            consts::reset::OUTPUT_FLUSH,
            consts::reset::OUTPUT_FLUSH,
            consts::reset::INPUT_FLUSH,
            consts::reset::CHIP,
        ]
    );
}

#[test]
fn test_uninitialize_clears_function() {
    let (mut device, mock) = open_mock(0);
    device.gpio_init([GpioDir::Output; 4]).unwrap();
    mock.clear_calls();

    device.uninitialize().unwrap();
    assert_eq!(
        mock.config_calls(),
        vec![(config::SET_MODE, consts::function::NONE)]
    );
    assert!(matches!(
        device.gpio_write(ft4222::GpioPort::P0, ft4222::GpioOutput::High),
        Err(Error::NotInitialized { .. })
    ));
}

#[test]
fn test_max_transfer_size() {
    let (device, mock) = open_mock(0);
    assert_eq!(device.max_transfer_size(), 510);
    mock.state.borrow_mut().packet_size = 64;
    assert_eq!(device.max_transfer_size(), 62);
}

#[test]
fn test_switching_function_requires_new_init() {
    let (mut device, _mock) = open_mock(0);
    device.i2c_master_init(100).unwrap();
    device.spi_slave_init().unwrap();
    assert!(matches!(
        device.i2c_master_write(0x50, &[0]),
        Err(Error::NotInitialized {
            function: "I2C master"
        })
    ));
}
