use crate::{config::DisplayConfig, internals::core::ports::DisplayError};

use self::adapters::FramebufferDisplay;

pub mod adapters;

pub struct DisplayModule {
    pub display_adapter: FramebufferDisplay,
}

impl DisplayModule {
    pub fn initialize(config: &DisplayConfig) -> Result<Self, DisplayError> {
        Ok(Self {
            display_adapter: FramebufferDisplay::open(&config.device)?,
        })
    }
}
