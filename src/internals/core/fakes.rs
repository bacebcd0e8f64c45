//! In-memory stand-ins for every port, shared by the core tests.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    path::Path,
    rc::Rc,
    time::Duration,
};

use common::registers::encode_f32_word_swapped;
use embedded_graphics::{pixelcolor::Rgb888, prelude::*};
use tokio::time::Instant;

use crate::models::{button::ButtonChannel, frame::Frame};

use super::ports::{
    DisplayError, DisplayPort, ImageDecoderPort, InputPort, MediaError, RegisterTransportPort,
    TransportError, VideoSourcePort, VideoStream,
};

/// Buttons driven by a timeline of level changes relative to creation time.
pub struct FakeInput {
    start: Instant,
    edges: HashMap<ButtonChannel, Vec<(Duration, bool)>>,
    pub released: Rc<Cell<bool>>,
    pub reads: Rc<Cell<usize>>,
}

impl FakeInput {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            edges: HashMap::new(),
            released: Rc::new(Cell::new(false)),
            reads: Rc::new(Cell::new(0)),
        }
    }

    pub fn set_level(&mut self, channel: u8, at: Duration, level: bool) {
        let edges = self.edges.entry(ButtonChannel(channel)).or_default();
        edges.push((at, level));
        edges.sort_by_key(|(at, _)| *at);
    }

    /// A clean press: high at `at_ms` for `hold_ms`.
    pub fn press(mut self, channel: u8, at_ms: u64, hold_ms: u64) -> Self {
        self.set_level(channel, Duration::from_millis(at_ms), true);
        self.set_level(channel, Duration::from_millis(at_ms + hold_ms), false);
        self
    }
}

impl InputPort for FakeInput {
    fn read_channel(&mut self, channel: ButtonChannel) -> bool {
        self.reads.set(self.reads.get() + 1);
        let elapsed = self.start.elapsed();
        self.edges
            .get(&channel)
            .and_then(|edges| edges.iter().take_while(|(at, _)| *at <= elapsed).last())
            .map(|(_, level)| *level)
            .unwrap_or(false)
    }

    fn release(&mut self) {
        self.released.set(true);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterFault {
    Io,
    Exception,
    ShortResponse,
}

/// Scripted state of the meter behind a [`FakeTransport`].
#[derive(Default)]
pub struct FakeMeter {
    pub refuse_connect: bool,
    pub fault: Option<MeterFault>,
    pub registers: HashMap<u16, [u16; 2]>,
    pub connects: usize,
    pub reads: usize,
    pub closes: usize,
}

impl FakeMeter {
    pub fn with_readings(voltage: f32, current: f32) -> Rc<RefCell<Self>> {
        let mut meter = Self::default();
        meter.set(0x0000, voltage);
        meter.set(0x0006, current);
        Rc::new(RefCell::new(meter))
    }

    pub fn set(&mut self, address: u16, value: f32) {
        self.registers
            .insert(address, encode_f32_word_swapped(value));
    }
}

pub struct FakeTransport {
    open: bool,
    pub meter: Rc<RefCell<FakeMeter>>,
}

impl FakeTransport {
    pub fn new(meter: Rc<RefCell<FakeMeter>>) -> Self {
        Self { open: false, meter }
    }
}

impl RegisterTransportPort for FakeTransport {
    fn is_open(&self) -> bool {
        self.open
    }

    fn connect(&mut self) -> bool {
        let mut meter = self.meter.borrow_mut();
        meter.connects += 1;
        self.open = !meter.refuse_connect;
        self.open
    }

    fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        let mut meter = self.meter.borrow_mut();
        meter.reads += 1;
        match meter.fault {
            Some(MeterFault::Io) => Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "meter did not answer",
            ))),
            Some(MeterFault::Exception) => Err(TransportError::Exception(0x02)),
            Some(MeterFault::ShortResponse) => Ok(vec![0x0000]),
            None => {
                let words = meter.registers.get(&address).copied().unwrap_or([0, 0]);
                Ok(words.iter().copied().take(count as usize).collect())
            }
        }
    }

    fn close(&mut self) {
        self.open = false;
        self.meter.borrow_mut().closes += 1;
    }
}

/// Keeps every presented frame for inspection.
pub struct RecordingDisplay {
    size: Size,
    pub frames: Rc<RefCell<Vec<Frame>>>,
    pub released: Rc<Cell<bool>>,
}

impl RecordingDisplay {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            frames: Rc::new(RefCell::new(Vec::new())),
            released: Rc::new(Cell::new(false)),
        }
    }
}

impl DisplayPort for RecordingDisplay {
    fn resolution(&self) -> Size {
        self.size
    }

    fn present(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        if frame.size() != self.size {
            return Err(DisplayError::ResolutionMismatch {
                expected: self.size,
                actual: frame.size(),
            });
        }
        self.frames.borrow_mut().push(frame.clone());
        Ok(())
    }

    fn release(&mut self) {
        self.released.set(true);
    }
}

/// Decodes each file name to a solid color; unknown names fail.
#[derive(Default)]
pub struct FakeDecoder {
    pub colors: HashMap<String, Rgb888>,
}

impl FakeDecoder {
    pub fn with(mut self, name: &str, color: Rgb888) -> Self {
        self.colors.insert(name.to_string(), color);
        self
    }
}

impl ImageDecoderPort for FakeDecoder {
    fn decode(&self, path: &Path, resolution: Size) -> Result<Frame, MediaError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.colors
            .get(&name)
            .map(|color| Frame::filled(resolution, *color))
            .ok_or_else(|| MediaError::Decode(format!("cannot decode {}", name)))
    }
}

#[derive(Default)]
pub struct VideoLog {
    pub opened: Vec<String>,
    pub rewinds: usize,
    pub dropped: usize,
}

/// Videos are solid color frame sequences keyed by file name.
pub struct FakeVideoSource {
    pub videos: HashMap<String, Vec<Rgb888>>,
    pub frame_rate: Option<f32>,
    pub log: Rc<RefCell<VideoLog>>,
}

impl FakeVideoSource {
    pub fn new() -> Self {
        Self {
            videos: HashMap::new(),
            frame_rate: Some(10f32),
            log: Rc::new(RefCell::new(VideoLog::default())),
        }
    }

    pub fn with(mut self, name: &str, frames: Vec<Rgb888>) -> Self {
        self.videos.insert(name.to_string(), frames);
        self
    }
}

pub struct FakeStream {
    size: Size,
    frames: Vec<Rgb888>,
    position: usize,
    frame_rate: Option<f32>,
    log: Rc<RefCell<VideoLog>>,
}

impl VideoSourcePort for FakeVideoSource {
    type Stream = FakeStream;

    fn open(&self, path: &Path, resolution: Size) -> Result<FakeStream, MediaError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let frames = self
            .videos
            .get(&name)
            .cloned()
            .ok_or_else(|| MediaError::Decode(format!("cannot open {}", name)))?;
        self.log.borrow_mut().opened.push(name);
        Ok(FakeStream {
            size: resolution,
            frames,
            position: 0,
            frame_rate: self.frame_rate,
            log: self.log.clone(),
        })
    }
}

impl VideoStream for FakeStream {
    fn frame_rate(&self) -> Option<f32> {
        self.frame_rate
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, MediaError> {
        let frame = self
            .frames
            .get(self.position)
            .map(|color| Frame::filled(self.size, *color));
        self.position += 1;
        Ok(frame)
    }

    fn rewind(&mut self) -> Result<(), MediaError> {
        self.position = 0;
        self.log.borrow_mut().rewinds += 1;
        Ok(())
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.log.borrow_mut().dropped += 1;
    }
}
