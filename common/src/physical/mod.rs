mod current;
mod power;
mod voltage;

pub use current::*;
pub use power::*;
pub use voltage::*;
