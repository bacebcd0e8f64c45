use core::fmt::Display;

use thiserror_no_std::Error;

/// Store physical unit value of Voltage as reported by the meter.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Voltage {
    value: f32,
}

#[derive(Debug, Error)]
pub enum VoltageError {
    /// The Voltage was trying to be created from a NaN or infinite reading.
    /// This happens when the meter returns garbage register contents.
    #[error("Value outside of valid state space representation!")]
    OutOfValidStateSpace,
}

impl Voltage {
    pub fn zero() -> Self {
        Self { value: 0f32 }
    }

    /// Get a copy of the voltage this instance does represent.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Readings below `floor` are idle noise and become exactly zero.
    pub fn suppress_noise(self, floor: f32) -> Self {
        if self.value < floor {
            Self::zero()
        } else {
            self
        }
    }
}

impl TryFrom<f32> for Voltage {
    type Error = VoltageError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(VoltageError::OutOfValidStateSpace);
        }
        Ok(Self { value })
    }
}

impl Display for Voltage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "<Voltage: {:.1} V>", self.value)
    }
}
