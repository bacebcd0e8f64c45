use std::{
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Child, ChildStdout, Command, Stdio},
};

use embedded_graphics::prelude::Size;
use image::imageops::FilterType;
use tracing::{debug, warn};

use crate::{
    internals::core::ports::{ImageDecoderPort, MediaError, VideoSourcePort, VideoStream},
    models::frame::Frame,
};

/// Still images through the `image` crate, stretched to the display.
pub struct ImageCrateDecoder;

impl ImageDecoderPort for ImageCrateDecoder {
    fn decode(&self, path: &Path, resolution: Size) -> Result<Frame, MediaError> {
        let decoded = image::open(path).map_err(|e| MediaError::Decode(e.to_string()))?;
        let scaled = decoded
            .resize_exact(resolution.width, resolution.height, FilterType::Triangle)
            .to_rgb8();
        Ok(Frame::from_rgb8(resolution, scaled.as_raw())?)
    }
}

/// Videos decoded by an `ffmpeg` child process emitting raw `rgb24` frames
/// already scaled to the display.
pub struct FfmpegVideoSource {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegVideoSource {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl FfmpegVideoSource {
    fn query_frame_rate(&self, path: &Path) -> Option<f32> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=avg_frame_rate"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path)
            .stderr(Stdio::null())
            .output();
        match output {
            Ok(output) if output.status.success() => {
                parse_frame_rate(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                warn!("ffprobe exited with {}.", output.status);
                None
            }
            Err(e) => {
                warn!("Failed to run ffprobe. Error: {}", e);
                None
            }
        }
    }
}

impl VideoSourcePort for FfmpegVideoSource {
    type Stream = FfmpegStream;

    #[tracing::instrument(skip_all)]
    fn open(&self, path: &Path, resolution: Size) -> Result<FfmpegStream, MediaError> {
        if !path.is_file() {
            return Err(MediaError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }
        let frame_rate = self.query_frame_rate(path);
        let mut stream = FfmpegStream {
            ffmpeg: self.ffmpeg.clone(),
            path: path.to_path_buf(),
            size: resolution,
            frame_rate,
            decoder: None,
            buffer: vec![0u8; resolution.width as usize * resolution.height as usize * 3],
        };
        stream.spawn()?;
        debug!("Opened {} at {:?} fps.", path.display(), frame_rate);
        Ok(stream)
    }
}

struct Decoder {
    child: Child,
    stdout: ChildStdout,
}

pub struct FfmpegStream {
    ffmpeg: PathBuf,
    path: PathBuf,
    size: Size,
    frame_rate: Option<f32>,
    decoder: Option<Decoder>,
    buffer: Vec<u8>,
}

impl FfmpegStream {
    fn spawn(&mut self) -> Result<(), MediaError> {
        self.stop();
        let mut child = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(&self.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("-s")
            .arg(format!("{}x{}", self.size.width, self.size.height))
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::Decode(String::from("ffmpeg has no stdout")))?;
        self.decoder = Some(Decoder { child, stdout });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut decoder) = self.decoder.take() {
            // Already exited at end of stream; a failed kill is fine.
            let _ = decoder.child.kill();
            if let Err(e) = decoder.child.wait() {
                warn!("Failed to reap ffmpeg. Error: {}", e);
            }
        }
    }
}

impl VideoStream for FfmpegStream {
    fn frame_rate(&self) -> Option<f32> {
        self.frame_rate
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, MediaError> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(None);
        };
        match decoder.stdout.read_exact(&mut self.buffer) {
            Ok(()) => Ok(Some(Frame::from_rgb8(self.size, &self.buffer)?)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn rewind(&mut self) -> Result<(), MediaError> {
        self.spawn()
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Parse ffprobe's `num/den` (or plain number) frame rate.
fn parse_frame_rate(raw: &str) -> Option<f32> {
    let raw = raw.lines().next()?.trim();
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let den: f32 = den.parse().ok()?;
            if den == 0f32 {
                return None;
            }
            num.parse::<f32>().ok()? / den
        }
        None => raw.parse().ok()?,
    };
    (rate.is_finite() && rate > 0f32).then_some(rate)
}
