use std::{io, path::Path};

use embedded_graphics::prelude::Size;
use thiserror::Error;

use crate::models::{
    button::ButtonChannel,
    frame::{Frame, FrameError},
};

/// Raw digital inputs, one boolean per logical channel.
pub trait InputPort {
    /// Current raw level of the channel, `true` when high.
    fn read_channel(&mut self, channel: ButtonChannel) -> bool;

    /// Hand the pins back to the OS on shutdown.
    fn release(&mut self) {}
}

/// Request/response register reads over the meter link.
pub trait RegisterTransportPort {
    fn is_open(&self) -> bool;

    /// Try to open the link. Returns `false` when it could not be opened.
    fn connect(&mut self) -> bool;

    fn read_holding_registers(&mut self, address: u16, count: u16)
        -> Result<Vec<u16>, TransportError>;

    fn close(&mut self);
}

/// The single full screen output.
pub trait DisplayPort {
    /// Native resolution, fixed once the display is opened.
    fn resolution(&self) -> Size;

    fn present(&mut self, frame: &Frame) -> Result<(), DisplayError>;

    /// Blank the panel on shutdown.
    fn release(&mut self) {}
}

/// Decodes a still image and scales it to the display resolution.
pub trait ImageDecoderPort {
    fn decode(&self, path: &Path, resolution: Size) -> Result<Frame, MediaError>;
}

/// Opens video files as a stream of frames scaled to the display resolution.
pub trait VideoSourcePort {
    type Stream: VideoStream;

    fn open(&self, path: &Path, resolution: Size) -> Result<Self::Stream, MediaError>;
}

/// An open video. Decoder resources are released when the stream is dropped.
pub trait VideoStream {
    /// Frames per second reported by the container, if any.
    fn frame_rate(&self) -> Option<f32>;

    /// Next decoded frame, `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, MediaError>;

    /// Seek back to the first frame.
    fn rewind(&mut self) -> Result<(), MediaError>;
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Link is not open.")]
    NotOpen,

    #[error("Link I/O failed. Error: {0}")]
    Io(#[from] io::Error),

    #[error("Meter answered with exception code {0:#04x}.")]
    Exception(u8),

    #[error("Malformed response: {0}")]
    Malformed(&'static str),
}

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Display I/O failed. Error: {0}")]
    Io(#[from] io::Error),

    #[error("Frame is {actual:?} but the display is {expected:?}.")]
    ResolutionMismatch { expected: Size, actual: Size },

    #[error("Unsupported pixel depth of {0} bits.")]
    UnsupportedDepth(u32),

    #[error("Failed to read display geometry: {0}")]
    Geometry(String),
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Media I/O failed. Error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to decode media. Error: {0}")]
    Decode(String),

    #[error("Decoded frame is unusable. Error: {0}")]
    Frame(#[from] FrameError),
}
