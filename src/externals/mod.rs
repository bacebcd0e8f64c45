pub mod display;
pub mod gpio;
pub mod media;
pub mod sensor_link;
