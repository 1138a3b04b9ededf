//! GPIO trigger configuration and the per-port trigger event queues.
//!
//! The chip reports trigger events as bytes of the form `port << 4 | trigger`.
//! They are fetched on demand and kept on the host until read.

use log::{debug, trace, warn};

use crate::consts;
use crate::device::{Ft4222, Function};
use crate::error::{Error, Result};
use crate::gpio::{GpioDir, GpioPort, GpioTrigger};

/// Splits an event byte into its port and trigger. Zero bytes are padding.
pub(crate) fn parse_event(byte: u8) -> Option<(GpioPort, GpioTrigger)> {
    if byte == 0 {
        return None;
    }
    let port = GpioPort::try_from(byte >> 4).ok()?;
    let trigger = GpioTrigger::from_bits_truncate(byte & 0x0F);
    if trigger.is_empty() {
        return None;
    }
    Some((port, trigger))
}

impl Ft4222 {
    // --- GPIO Trigger Handling ---
    /// Configures which conditions of an input port are recorded as trigger events.
    pub fn gpio_set_input_trigger(&mut self, port: GpioPort, trigger: GpioTrigger) -> Result<()> {
        self.require(Function::Gpio)?;
        if self.gpio.dirs[port.index()] != GpioDir::Input {
            return Err(Error::GpioPortIsOutput { port });
        }
        if trigger.is_empty() {
            return Err(Error::ArgumentOutOfRange(
                "GPIO trigger must select at least one condition".to_string(),
            ));
        }

        debug!("Configuring trigger for {:?}: {:?}", port, trigger);
        let data = ((port as u8) << 4) | trigger.bits();
        self.config_request(consts::config::GPIO_SET_TRIGGER, data)
    }

    /// Collects pending trigger events from the chip and returns how many
    /// events are queued for `port`.
    pub fn gpio_get_trigger_status(&mut self, port: GpioPort) -> Result<usize> {
        self.require(Function::Gpio)?;
        let events = self.info_request(
            consts::info::GET_GPIO_EVENTS,
            consts::info::GPIO_EVENTS_LEN,
        )?;
        trace!("GPIO events: {:02X?}", events);

        for byte in events {
            let Some((event_port, trigger)) = parse_event(byte) else {
                continue;
            };
            let queue = &mut self.gpio.queues[event_port.index()];
            if queue.len() >= consts::GPIO_QUEUE_CAPACITY {
                warn!(
                    "GPIO trigger queue for {:?} full, dropping oldest event",
                    event_port
                );
                queue.pop_front();
            }
            queue.push_back(trigger);
        }

        Ok(self.gpio.queues[port.index()].len())
    }

    /// Removes and returns up to `max` queued trigger events for `port`, oldest first.
    pub fn gpio_read_trigger_queue(&mut self, port: GpioPort, max: usize) -> Result<Vec<GpioTrigger>> {
        self.require(Function::Gpio)?;
        let queue = &mut self.gpio.queues[port.index()];
        let count = max.min(queue.len());
        Ok(queue.drain(..count).collect())
    }
}
