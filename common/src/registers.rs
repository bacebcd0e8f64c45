use thiserror_no_std::Error;

/// Number of 16 bit holding registers backing a single 32 bit reading.
pub const REGISTERS_PER_READING: u16 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    /// Fewer registers were returned than a 32 bit value needs.
    #[error("Expected {expected} registers but got {actual}.")]
    WrongCount { expected: usize, actual: usize },
}

/// Decode two consecutive holding registers into an `f32`.
///
/// Each register carries its bytes big-endian, but the meter sends the low
/// word first. E.g. `230.0` (`0x4366_0000`) arrives as `[0x0000, 0x4366]`.
pub fn decode_f32_word_swapped(registers: &[u16]) -> Result<f32, RegisterError> {
    if registers.len() != REGISTERS_PER_READING as usize {
        return Err(RegisterError::WrongCount {
            expected: REGISTERS_PER_READING as usize,
            actual: registers.len(),
        });
    }
    let low = registers[0] as u32;
    let high = registers[1] as u32;
    Ok(f32::from_bits((high << 16) | low))
}

/// Inverse of [`decode_f32_word_swapped`]. Used by fakes standing in for the meter.
pub fn encode_f32_word_swapped(value: f32) -> [u16; 2] {
    let bits = value.to_bits();
    [(bits & 0xFFFF) as u16, (bits >> 16) as u16]
}
