pub mod catalog;
pub mod dispatcher;
pub mod input;
pub mod playback;
pub mod ports;
pub mod telemetry_reader;
pub mod telemetry_screen;
pub mod tick;

#[cfg(test)]
pub(crate) mod fakes;
