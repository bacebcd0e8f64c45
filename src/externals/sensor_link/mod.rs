use crate::config::TelemetryConfig;

use self::adapters::ModbusRtuTransport;

pub mod adapters;
pub mod services;

pub struct SensorLinkModule {
    pub transport_adapter: ModbusRtuTransport,
}

impl SensorLinkModule {
    /// The link is opened lazily by the first read.
    pub fn initialize(config: &TelemetryConfig) -> Self {
        Self {
            transport_adapter: ModbusRtuTransport::new(config),
        }
    }
}
