use crc::{Crc, CRC_16_MODBUS};

use crate::internals::core::ports::TransportError;

pub const READ_HOLDING_REGISTERS: u8 = 0x03;
const EXCEPTION_FLAG: u8 = 0x80;

/// Slave id, function code and either the byte count or the exception code.
pub const RESPONSE_HEADER_LEN: usize = 3;
const CRC_LEN: usize = 2;

const MODBUS_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Build a "read holding registers" RTU request frame.
pub fn encode_read_request(slave: u8, address: u16, count: u16) -> [u8; 8] {
    let mut frame = [0u8; 8];
    frame[0] = slave;
    frame[1] = READ_HOLDING_REGISTERS;
    frame[2..4].copy_from_slice(&address.to_be_bytes());
    frame[4..6].copy_from_slice(&count.to_be_bytes());
    let crc = MODBUS_CRC.checksum(&frame[..6]);
    frame[6..].copy_from_slice(&crc.to_le_bytes());
    frame
}

/// Bytes still to read once the response header has arrived.
pub fn remaining_response_len(header: &[u8; RESPONSE_HEADER_LEN]) -> usize {
    if header[1] & EXCEPTION_FLAG != 0 {
        CRC_LEN
    } else {
        header[2] as usize + CRC_LEN
    }
}

/// Validate a complete response frame and extract its registers.
pub fn decode_read_response(
    slave: u8,
    count: u16,
    frame: &[u8],
) -> Result<Vec<u16>, TransportError> {
    if frame.len() < RESPONSE_HEADER_LEN + CRC_LEN {
        return Err(TransportError::Malformed("frame too short"));
    }
    let (body, crc) = frame.split_at(frame.len() - CRC_LEN);
    if MODBUS_CRC.checksum(body) != u16::from_le_bytes([crc[0], crc[1]]) {
        return Err(TransportError::Malformed("checksum mismatch"));
    }
    if body[0] != slave {
        return Err(TransportError::Malformed("unexpected slave id"));
    }
    if body[1] == READ_HOLDING_REGISTERS | EXCEPTION_FLAG {
        return Err(TransportError::Exception(body[2]));
    }
    if body[1] != READ_HOLDING_REGISTERS {
        return Err(TransportError::Malformed("unexpected function code"));
    }

    let data = &body[RESPONSE_HEADER_LEN..];
    if body[2] as usize != data.len() || data.len() != count as usize * 2 {
        return Err(TransportError::Malformed("unexpected byte count"));
    }
    Ok(data
        .chunks_exact(2)
        .map(|word| u16::from_be_bytes([word[0], word[1]]))
        .collect())
}
