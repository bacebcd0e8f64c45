use std::fmt::Display;

use common::physical::{Current, Power, Voltage};
use tokio::time::Instant;

/// One refresh worth of meter readings. Power is always derived from the
/// (already noise clamped) voltage and current it is stored with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    pub voltage: Voltage,
    pub current: Current,
    pub power: Power,
    pub timestamp: Instant,
}

impl TelemetrySample {
    pub fn new(voltage: Voltage, current: Current, timestamp: Instant) -> Self {
        Self {
            voltage,
            current,
            power: Power::from_readings(voltage, current),
            timestamp,
        }
    }
}

impl Display for TelemetrySample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(TelemetrySample: voltage={}, current={}, power={})",
            self.voltage, self.current, self.power
        )
    }
}

/// Health of the meter link. Only the telemetry reader mutates this.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    is_open: bool,
    last_error: Option<String>,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn mark_open(&mut self) {
        self.is_open = true;
    }

    /// Latch the link as disconnected. The next read attempt reconnects.
    pub(crate) fn mark_failed(&mut self, error: impl Display) {
        self.is_open = false;
        self.last_error = Some(error.to_string());
    }

    pub(crate) fn mark_closed(&mut self) {
        self.is_open = false;
    }
}
