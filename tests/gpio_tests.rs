mod common;

use common::open_mock;
use ft4222::consts::{self, config};
use ft4222::{Error, GpioDir, GpioOutput, GpioPort, GpioTrigger};

const DIRS: [GpioDir; 4] = [
    GpioDir::Output,
    GpioDir::Input,
    GpioDir::Output,
    GpioDir::Input,
];

fn gpio_events(mock: &common::MockTransport, events: &[u8]) {
    let mut reply = events.to_vec();
    reply.resize(consts::info::GPIO_EVENTS_LEN as usize, 0);
    mock.respond(consts::REQUEST_INFO, consts::info::GET_GPIO_EVENTS, reply);
}

#[test]
fn test_init_sets_mode_and_directions() {
    let (mut device, mock) = open_mock(0);
    device.gpio_init(DIRS).unwrap();
    assert_eq!(
        mock.config_calls(),
        vec![
            (config::SET_MODE, consts::function::GPIO),
            (config::GPIO_SET_DIR, 0b1010),
            (config::GPIO_WRITE, 0),
        ]
    );
    assert_eq!(device.gpio_get_direction(GpioPort::P1), GpioDir::Input);
}

#[test]
fn test_write_updates_latch() {
    let (mut device, mock) = open_mock(0);
    device.gpio_init(DIRS).unwrap();
    mock.clear_calls();

    device.gpio_write(GpioPort::P0, GpioOutput::High).unwrap();
    device.gpio_write(GpioPort::P2, GpioOutput::High).unwrap();
    device.gpio_write(GpioPort::P0, GpioOutput::Low).unwrap();

    assert_eq!(
        mock.config_calls(),
        vec![
            (config::GPIO_WRITE, 0b0001),
            (config::GPIO_WRITE, 0b0101),
            (config::GPIO_WRITE, 0b0100),
        ]
    );
}

#[test]
fn test_write_to_input_fails() {
    let (mut device, mock) = open_mock(0);
    device.gpio_init(DIRS).unwrap();
    mock.clear_calls();
    assert!(matches!(
        device.gpio_write(GpioPort::P1, GpioOutput::High),
        Err(Error::GpioPortIsInput {
            port: GpioPort::P1
        })
    ));
    assert!(mock.config_calls().is_empty());
}

#[test]
fn test_requires_gpio_mode() {
    let (mut device, _mock) = open_mock(0);
    assert!(matches!(
        device.gpio_write(GpioPort::P0, GpioOutput::High),
        Err(Error::NotInitialized { function: "GPIO" })
    ));
}

#[test]
fn test_read_levels() {
    let (mut device, mock) = open_mock(0);
    device.gpio_init(DIRS).unwrap();
    mock.respond(
        consts::REQUEST_INFO,
        consts::info::GET_GPIO_STATE,
        vec![0b0010],
    );
    assert_eq!(device.gpio_read(GpioPort::P1).unwrap(), GpioOutput::High);
    assert_eq!(device.gpio_read(GpioPort::P0).unwrap(), GpioOutput::Low);
}

#[test]
fn test_suspend_out_reserves_p2() {
    let (mut device, mock) = open_mock(0);
    device.set_suspend_out(true).unwrap();
    device.gpio_init(DIRS).unwrap();
    assert_eq!(mock.config_calls()[0], (config::SET_SUSPEND_OUT, 1));

    assert!(matches!(
        device.gpio_write(GpioPort::P2, GpioOutput::High),
        Err(Error::GpioPortReserved {
            port: GpioPort::P2,
            ..
        })
    ));

    device.set_suspend_out(false).unwrap();
    device.gpio_write(GpioPort::P2, GpioOutput::High).unwrap();
}

#[test]
fn test_wakeup_interrupt_reserves_p3() {
    let (mut device, _mock) = open_mock(0);
    device
        .gpio_init([GpioDir::Output; 4])
        .unwrap();
    device.set_wakeup_interrupt(true).unwrap();
    assert!(matches!(
        device.gpio_write(GpioPort::P3, GpioOutput::Low),
        Err(Error::GpioPortReserved {
            port: GpioPort::P3,
            ..
        })
    ));
}

#[test]
fn test_set_input_trigger() {
    let (mut device, mock) = open_mock(0);
    device.gpio_init(DIRS).unwrap();
    mock.clear_calls();

    device
        .gpio_set_input_trigger(GpioPort::P3, GpioTrigger::RISING | GpioTrigger::FALLING)
        .unwrap();
    assert_eq!(mock.config_calls(), vec![(config::GPIO_SET_TRIGGER, 0x33)]);

    assert!(matches!(
        device.gpio_set_input_trigger(GpioPort::P0, GpioTrigger::RISING),
        Err(Error::GpioPortIsOutput {
            port: GpioPort::P0
        })
    ));
    assert!(matches!(
        device.gpio_set_input_trigger(GpioPort::P1, GpioTrigger::empty()),
        Err(Error::ArgumentOutOfRange(_))
    ));
}

#[test]
fn test_trigger_queue() {
    let (mut device, mock) = open_mock(0);
    device.gpio_init(DIRS).unwrap();
    gpio_events(&mock, &[0x11, 0x32, 0x12]);

    assert_eq!(device.gpio_get_trigger_status(GpioPort::P1).unwrap(), 2);
    assert_eq!(
        device.gpio_read_trigger_queue(GpioPort::P1, 8).unwrap(),
        vec![GpioTrigger::RISING, GpioTrigger::FALLING]
    );
    assert_eq!(
        device.gpio_read_trigger_queue(GpioPort::P3, 8).unwrap(),
        vec![GpioTrigger::FALLING]
    );
    assert!(device
        .gpio_read_trigger_queue(GpioPort::P1, 8)
        .unwrap()
        .is_empty());
}

#[test]
fn test_trigger_queue_drops_oldest_when_full() {
    let (mut device, mock) = open_mock(0);
    device.gpio_init(DIRS).unwrap();
    let mut events = vec![0x11u8; 64];
    events[0] = 0x12;
    gpio_events(&mock, &events);

    let mut count = 0;
    for _ in 0..9 {
        count = device.gpio_get_trigger_status(GpioPort::P1).unwrap();
    }
    assert_eq!(count, consts::GPIO_QUEUE_CAPACITY);

    // The first fetch started with a falling edge; it must have been dropped.
    let queued = device
        .gpio_read_trigger_queue(GpioPort::P1, consts::GPIO_QUEUE_CAPACITY)
        .unwrap();
    assert_eq!(queued.len(), consts::GPIO_QUEUE_CAPACITY);
    assert_eq!(
        queued
            .iter()
            .filter(|&&t| t == GpioTrigger::FALLING)
            .count(),
        8
    );
}

#[test]
fn test_reserved_ports_survive_uninitialize() {
    let (mut device, _mock) = open_mock(0);
    device.set_suspend_out(true).unwrap();
    device.gpio_init([GpioDir::Output; 4]).unwrap();
    device.uninitialize().unwrap();
    device.gpio_init([GpioDir::Output; 4]).unwrap();

    assert!(matches!(
        device.gpio_write(GpioPort::P2, GpioOutput::High),
        Err(Error::GpioPortReserved {
            port: GpioPort::P2,
            ..
        })
    ));
}
