use core::fmt::Display;

use super::{Current, Voltage};

/// Apparent power derived from a voltage and current pair.
/// Never constructed directly so it always matches its inputs.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Power {
    value: f32,
}

impl Power {
    /// Derive power as `|V * I|`. Callers clamp noise before deriving so an
    /// idle tool reports exactly zero watts.
    pub fn from_readings(voltage: Voltage, current: Current) -> Self {
        Self {
            value: (voltage.value() * current.value()).abs(),
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

impl Display for Power {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "<Power: {:.1} W>", self.value)
    }
}
