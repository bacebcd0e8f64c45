use std::io::{self, Read, Write};

use serialport::{ClearBuffer, DataBits, SerialPort, StopBits};
use tracing::{info, trace, warn};

use crate::{
    config::{ParityConfig, TelemetryConfig},
    internals::core::ports::{RegisterTransportPort, TransportError},
};

use super::services::{
    decode_read_response, encode_read_request, remaining_response_len, RESPONSE_HEADER_LEN,
};

/// Modbus RTU master on a serial port, talking to a single meter.
/// Every read blocks for at most the configured timeout.
pub struct ModbusRtuTransport {
    path: String,
    baud_rate: u32,
    parity: ParityConfig,
    timeout: std::time::Duration,
    slave_id: u8,
    port: Option<Box<dyn SerialPort>>,
}

impl ModbusRtuTransport {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            path: config.port.clone(),
            baud_rate: config.baud_rate,
            parity: config.parity,
            timeout: config.timeout(),
            slave_id: config.slave_id,
            port: None,
        }
    }

    fn exchange(
        port: &mut dyn SerialPort,
        slave: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        port.clear(ClearBuffer::Input).map_err(io::Error::from)?;
        port.write_all(&encode_read_request(slave, address, count))?;
        port.flush()?;

        let mut header = [0u8; RESPONSE_HEADER_LEN];
        port.read_exact(&mut header)?;
        let mut frame = header.to_vec();
        frame.resize(RESPONSE_HEADER_LEN + remaining_response_len(&header), 0);
        port.read_exact(&mut frame[RESPONSE_HEADER_LEN..])?;
        trace!("Received {:02X?}", frame);

        decode_read_response(slave, count, &frame)
    }
}

impl RegisterTransportPort for ModbusRtuTransport {
    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    #[tracing::instrument(skip_all)]
    fn connect(&mut self) -> bool {
        let result = serialport::new(&self.path, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(self.parity.into())
            .stop_bits(StopBits::One)
            .timeout(self.timeout)
            .open();
        match result {
            Ok(port) => {
                info!("Opened {} at {} baud.", self.path, self.baud_rate);
                self.port = Some(port);
                true
            }
            Err(e) => {
                warn!("Failed to open {}. Error: {}", self.path, e);
                self.port = None;
                false
            }
        }
    }

    fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotOpen)?;
        Self::exchange(port.as_mut(), self.slave_id, address, count)
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Closed {}.", self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_before_connect_is_not_open() {
        let mut transport = ModbusRtuTransport::new(&TelemetryConfig::default());
        assert!(!transport.is_open());
        assert!(matches!(
            transport.read_holding_registers(0x0000, 2),
            Err(TransportError::NotOpen)
        ));
    }

    #[test]
    fn test_connect_to_missing_port_fails() {
        let config = TelemetryConfig {
            port: String::from("/dev/definitely-not-a-meter"),
            ..TelemetryConfig::default()
        };
        let mut transport = ModbusRtuTransport::new(&config);
        assert!(!transport.connect());
        assert!(!transport.is_open());
        transport.close();
    }
}
