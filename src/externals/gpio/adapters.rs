use std::{collections::HashMap, thread, time::Duration};

use linux_embedded_hal::sysfs_gpio::{self, Direction, Pin};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{internals::core::ports::InputPort, models::button::ButtonChannel};

/// udev needs a moment to fix permissions on a freshly exported pin.
const EXPORT_SETTLE: Duration = Duration::from_millis(10);

#[derive(Error, Debug)]
pub enum GpioError {
    #[error("Failed to set up {channel}. Error: {source}")]
    Setup {
        channel: ButtonChannel,
        source: sysfs_gpio::Error,
    },
}

/// Buttons read through the sysfs GPIO interface.
///
/// Inputs are active high. sysfs cannot enable pull resistors, so every
/// channel needs a pull-down from the device tree (see [`pull_down_overlay`]).
pub struct SysfsGpioAdapter {
    pins: HashMap<ButtonChannel, Pin>,
    exported: Vec<ButtonChannel>,
}

impl SysfsGpioAdapter {
    #[tracing::instrument(skip_all)]
    pub fn open(channels: &[ButtonChannel]) -> Result<Self, GpioError> {
        let mut adapter = Self {
            pins: HashMap::new(),
            exported: Vec::new(),
        };

        for channel in channels {
            let setup = |source| GpioError::Setup {
                channel: *channel,
                source,
            };
            let pin = Pin::new(u64::from(channel.0));

            if !pin.is_exported() {
                pin.export().map_err(setup)?;
                adapter.exported.push(*channel);
                thread::sleep(EXPORT_SETTLE);
                debug!("Exported {}.", channel);
            }

            pin.set_direction(Direction::In).map_err(setup)?;
            adapter.pins.insert(*channel, pin);
        }

        info!("Configured {} button inputs.", adapter.pins.len());
        Ok(adapter)
    }

    #[cfg(test)]
    fn with_pins(pins: impl IntoIterator<Item = (ButtonChannel, Pin)>) -> Self {
        let pins: HashMap<_, _> = pins.into_iter().collect();
        Self {
            exported: pins.keys().copied().collect(),
            pins,
        }
    }
}

impl InputPort for SysfsGpioAdapter {
    fn read_channel(&mut self, channel: ButtonChannel) -> bool {
        let Some(pin) = self.pins.get(&channel) else {
            return false;
        };
        match pin.get_value() {
            Ok(level) => level == 1,
            Err(e) => {
                warn!("Failed to read {}. Error: {}", channel, e);
                false
            }
        }
    }

    #[tracing::instrument(skip_all)]
    fn release(&mut self) {
        for channel in self.exported.drain(..) {
            let Some(pin) = self.pins.get(&channel) else {
                continue;
            };
            if let Err(e) = pin.unexport() {
                warn!("Failed to unexport {}. Error: {}", channel, e);
            }
        }
        self.pins.clear();
        info!("Released button inputs.");
    }
}

/// The Raspberry Pi `config.txt` line that configures `channels` as inputs
/// with pull-downs enabled.
pub fn pull_down_overlay(channels: &[ButtonChannel]) -> String {
    let mut numbers: Vec<u8> = channels.iter().map(|channel| channel.0).collect();
    numbers.sort_unstable();
    numbers.dedup();
    let list = numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("gpio={}=ip,pd", list)
}
