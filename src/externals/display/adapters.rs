use std::{
    fs::{self, File, OpenOptions},
    io::{Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use embedded_graphics::{pixelcolor::Rgb888, prelude::*};
use tracing::{info, warn};

use crate::{
    internals::core::ports::{DisplayError, DisplayPort},
    models::frame::Frame,
};

const SYSFS_GRAPHICS_ROOT: &str = "/sys/class/graphics";

/// Full screen output through a Linux framebuffer device.
///
/// Geometry comes from sysfs once at open. Frames are converted into the
/// device's pixel format in a reusable buffer and written in one go.
pub struct FramebufferDisplay {
    device: File,
    size: Size,
    bits_per_pixel: u32,
    stride: usize,
    buffer: Vec<u8>,
}

impl FramebufferDisplay {
    #[tracing::instrument(skip_all)]
    pub fn open(device: &Path) -> Result<Self, DisplayError> {
        let name = device
            .file_name()
            .ok_or_else(|| DisplayError::Geometry(format!("bad device path {}", device.display())))?;
        Self::open_with_sysfs(device, &Path::new(SYSFS_GRAPHICS_ROOT).join(name))
    }

    fn open_with_sysfs(device: &Path, sysfs: &Path) -> Result<Self, DisplayError> {
        let size = parse_virtual_size(&read_attribute(sysfs, "virtual_size")?)?;
        let bits_per_pixel: u32 = read_attribute(sysfs, "bits_per_pixel")?
            .parse()
            .map_err(|_| DisplayError::Geometry(String::from("bad bits_per_pixel")))?;
        let bytes_per_pixel = match bits_per_pixel {
            16 | 24 | 32 => bits_per_pixel as usize / 8,
            other => return Err(DisplayError::UnsupportedDepth(other)),
        };
        let stride = match read_attribute(sysfs, "stride") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| DisplayError::Geometry(String::from("bad stride")))?,
            Err(_) => size.width as usize * bytes_per_pixel,
        };

        let device_file = OpenOptions::new().write(true).open(device)?;
        info!(
            "Opened {} at {}x{}, {} bpp.",
            device.display(),
            size.width,
            size.height,
            bits_per_pixel
        );

        Ok(Self {
            device: device_file,
            size,
            bits_per_pixel,
            stride,
            buffer: vec![0u8; stride * size.height as usize],
        })
    }
}

impl DisplayPort for FramebufferDisplay {
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
        encode_pixels(
            frame.pixels(),
            self.size.width as usize,
            self.bits_per_pixel,
            self.stride,
            &mut self.buffer,
        );
        self.device.seek(SeekFrom::Start(0))?;
        self.device.write_all(&self.buffer)?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    fn release(&mut self) {
        let blank = Frame::filled(self.size, Rgb888::BLACK);
        match self.present(&blank) {
            Ok(()) => info!("Blanked display."),
            Err(e) => warn!("Failed to blank display. Error: {}", e),
        }
    }
}

fn read_attribute(sysfs: &Path, name: &str) -> Result<String, DisplayError> {
    let path: PathBuf = sysfs.join(name);
    fs::read_to_string(&path)
        .map(|raw| raw.trim().to_string())
        .map_err(|e| DisplayError::Geometry(format!("{}: {}", path.display(), e)))
}

/// Parse the `width,height` form sysfs uses for `virtual_size`.
fn parse_virtual_size(raw: &str) -> Result<Size, DisplayError> {
    let bad = || DisplayError::Geometry(format!("bad virtual_size {:?}", raw));
    let (width, height) = raw.split_once(',').ok_or_else(bad)?;
    let width = width.trim().parse().map_err(|_| bad())?;
    let height = height.trim().parse().map_err(|_| bad())?;
    if width == 0 || height == 0 {
        return Err(bad());
    }
    Ok(Size::new(width, height))
}

/// Convert RGB888 pixels into framebuffer rows of `stride` bytes.
/// 32 bpp is BGRX, 24 bpp is BGR, 16 bpp is little endian RGB565.
fn encode_pixels(pixels: &[Rgb888], width: usize, bits_per_pixel: u32, stride: usize, out: &mut [u8]) {
    let bytes_per_pixel = bits_per_pixel as usize / 8;
    for (row, line) in pixels.chunks_exact(width).zip(out.chunks_exact_mut(stride)) {
        for (pixel, bytes) in row.iter().zip(line.chunks_exact_mut(bytes_per_pixel)) {
            match bits_per_pixel {
                32 => bytes.copy_from_slice(&[pixel.b(), pixel.g(), pixel.r(), 0xFF]),
                24 => bytes.copy_from_slice(&[pixel.b(), pixel.g(), pixel.r()]),
                _ => {
                    let packed = ((pixel.r() as u16 >> 3) << 11)
                        | ((pixel.g() as u16 >> 2) << 5)
                        | (pixel.b() as u16 >> 3);
                    bytes.copy_from_slice(&packed.to_le_bytes());
                }
            }
        }
    }
}
