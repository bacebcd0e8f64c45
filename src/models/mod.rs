pub mod action;
pub mod button;
pub mod frame;
pub mod media_entry;
pub mod telemetry_sample;
