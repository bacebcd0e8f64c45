use common::{
    physical::{Current, Voltage},
    registers::{decode_f32_word_swapped, RegisterError, REGISTERS_PER_READING},
};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    config::TelemetryConfig,
    models::telemetry_sample::{ConnectionState, TelemetrySample},
};

use super::ports::{RegisterTransportPort, TransportError};

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Could not open the meter link.")]
    ConnectFailed,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Bad register payload. Error: {0}")]
    Register(RegisterError),
}

/// Reads voltage and current from the meter and keeps the link alive.
///
/// Reads never fail from the caller's point of view: any problem is logged,
/// latched into the [`ConnectionState`], the link is closed, and the reading
/// degrades to zero. The next read reconnects.
pub struct TelemetryReader<T: RegisterTransportPort> {
    transport: T,
    state: ConnectionState,
    last_sample: Option<TelemetrySample>,
    voltage_register: u16,
    current_register: u16,
    voltage_noise_floor: f32,
    current_noise_floor: f32,
}

impl<T: RegisterTransportPort> TelemetryReader<T> {
    pub fn new(transport: T, config: &TelemetryConfig) -> Self {
        Self {
            transport,
            state: ConnectionState::default(),
            last_sample: None,
            voltage_register: config.voltage_register,
            current_register: config.current_register,
            voltage_noise_floor: config.voltage_noise_floor,
            current_noise_floor: config.current_noise_floor,
        }
    }

    pub fn connection_state(&self) -> &ConnectionState {
        &self.state
    }

    /// The most recent result of [`Self::sample`]. It outlives screen
    /// changes, so callers can keep to the read interval across them.
    pub fn last_sample(&self) -> Option<TelemetrySample> {
        self.last_sample
    }

    /// Read the 32 bit float stored at `address` and `address + 1`.
    /// Returns `0.0` on any failure.
    #[tracing::instrument(skip(self))]
    pub fn read_register_pair(&mut self, address: u16) -> f32 {
        match self.try_read_register_pair(address) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read meter registers. Error: {}", e);
                self.state.mark_failed(&e);
                self.transport.close();
                0f32
            }
        }
    }

    fn try_read_register_pair(&mut self, address: u16) -> Result<f32, ReadError> {
        if !self.transport.is_open() {
            debug!("Link closed, connecting.");
            if !self.transport.connect() {
                return Err(ReadError::ConnectFailed);
            }
            info!("Connected to meter.");
        }
        self.state.mark_open();

        let registers = self
            .transport
            .read_holding_registers(address, REGISTERS_PER_READING)?;
        decode_f32_word_swapped(&registers).map_err(ReadError::Register)
    }

    pub fn read_voltage(&mut self) -> Voltage {
        let raw = self.read_register_pair(self.voltage_register);
        Voltage::try_from(raw)
            .unwrap_or_else(|e| {
                warn!("Discarding voltage reading. Error: {}", e);
                Voltage::zero()
            })
            .suppress_noise(self.voltage_noise_floor)
    }

    pub fn read_current(&mut self) -> Current {
        let raw = self.read_register_pair(self.current_register);
        Current::try_from(raw)
            .unwrap_or_else(|e| {
                warn!("Discarding current reading. Error: {}", e);
                Current::zero()
            })
            .suppress_noise(self.current_noise_floor)
    }

    /// Take a fresh voltage and current reading. When the voltage read leaves
    /// the link down the current read is skipped, so a dead meter costs one
    /// timeout per sample rather than two.
    #[tracing::instrument(skip_all)]
    pub fn sample(&mut self) -> TelemetrySample {
        let voltage = self.read_voltage();
        let current = if self.state.is_open() {
            self.read_current()
        } else {
            Current::zero()
        };
        let sample = TelemetrySample::new(voltage, current, Instant::now());
        debug!("Got {}", sample);
        self.last_sample = Some(sample);
        sample
    }

    pub fn close(&mut self) {
        if self.transport.is_open() {
            info!("Closing meter link.");
        }
        self.transport.close();
        self.state.mark_closed();
    }
}
