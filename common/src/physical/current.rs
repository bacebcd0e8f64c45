use core::fmt::Display;

use thiserror_no_std::Error;

/// Store physical unit value of Current drawn by the tool under test.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Current {
    value: f32,
}

#[derive(Debug, Error)]
pub enum CurrentError {
    /// The Current was trying to be created from a NaN or infinite reading.
    #[error("Value outside of valid state space representation!")]
    OutOfValidStateSpace,
}

impl Current {
    pub fn zero() -> Self {
        Self { value: 0f32 }
    }

    /// Get a copy of the current this instance does represent.
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

    /// True when the current draw is strictly above `threshold`.
    pub fn exceeds(&self, threshold: f32) -> bool {
        self.value > threshold
    }
}

impl TryFrom<f32> for Current {
    type Error = CurrentError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(CurrentError::OutOfValidStateSpace);
        }
        Ok(Self { value })
    }
}

impl Display for Current {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "<Current: {:.2} A>", self.value)
    }
}
