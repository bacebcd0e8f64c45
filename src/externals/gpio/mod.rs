use tracing::info;

use crate::models::button::ButtonChannel;

use self::adapters::{pull_down_overlay, GpioError, SysfsGpioAdapter};

pub mod adapters;

pub struct GpioModule {
    pub input_adapter: SysfsGpioAdapter,
}

impl GpioModule {
    /// Export and configure every button channel as an input. The pull-downs
    /// are not set here and must come from the boot configuration.
    pub fn initialize(channels: &[ButtonChannel]) -> Result<Self, GpioError> {
        info!(
            "Buttons are active high and need pull-downs. Raspberry Pi config.txt: {}",
            pull_down_overlay(channels)
        );
        Ok(Self {
            input_adapter: SysfsGpioAdapter::open(channels)?,
        })
    }
}
