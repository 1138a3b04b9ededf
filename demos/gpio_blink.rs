use std::{thread, time::Duration};

use ft4222::{Ft4222, GpioDir, GpioOutput, GpioPort, GpioTrigger, Result};

const BLINK_PORT: GpioPort = GpioPort::P0;
const BUTTON_PORT: GpioPort = GpioPort::P1;

fn main() -> Result<()> {
    env_logger::init();
    println!("Opening first FT4222H device...");
    let mut device = Ft4222::open_first()?;
    println!("Device opened.");

    device.gpio_init([
        GpioDir::Output,
        GpioDir::Input,
        GpioDir::Input,
        GpioDir::Input,
    ])?;
    device.gpio_set_input_trigger(BUTTON_PORT, GpioTrigger::RISING | GpioTrigger::FALLING)?;

    println!("Blinking {:?} 10 times...", BLINK_PORT);
    for i in 0..10 {
        device.gpio_write(BLINK_PORT, GpioOutput::High)?;
        thread::sleep(Duration::from_millis(250));
        device.gpio_write(BLINK_PORT, GpioOutput::Low)?;
        thread::sleep(Duration::from_millis(250));

        let pending = device.gpio_get_trigger_status(BUTTON_PORT)?;
        if pending > 0 {
            let events = device.gpio_read_trigger_queue(BUTTON_PORT, pending)?;
            println!("  cycle {}: {:?} events {:?}", i, BUTTON_PORT, events);
        }
    }

    println!("Done.");
    Ok(())
}
