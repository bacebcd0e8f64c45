use std::convert::Infallible;

use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::*,
    primitives::Rectangle,
};
use thiserror::Error;

/// A full screen RGB888 pixel buffer at the display's native resolution.
///
/// Every renderer draws into a `Frame` and hands it to the display port in
/// one piece, so the panel never shows a half drawn screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    size: Size,
    pixels: Vec<Rgb888>,
}

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Expected {expected} bytes for the frame but got {actual}.")]
    WrongLength { expected: usize, actual: usize },
}

impl Frame {
    /// Allocate a frame filled with a single color.
    pub fn filled(size: Size, color: Rgb888) -> Self {
        Self {
            size,
            pixels: vec![color; (size.width * size.height) as usize],
        }
    }

    /// Build a frame from tightly packed `rgb24` bytes.
    pub fn from_rgb8(size: Size, bytes: &[u8]) -> Result<Self, FrameError> {
        let expected = (size.width * size.height) as usize * 3;
        if bytes.len() != expected {
            return Err(FrameError::WrongLength {
                expected,
                actual: bytes.len(),
            });
        }
        let pixels = bytes
            .chunks_exact(3)
            .map(|rgb| Rgb888::new(rgb[0], rgb[1], rgb[2]))
            .collect();
        Ok(Self { size, pixels })
    }

    pub fn pixels(&self) -> &[Rgb888] {
        &self.pixels
    }

    /// Color of a single pixel, `None` when outside the frame.
    pub fn pixel(&self, point: Point) -> Option<Rgb888> {
        if point.x < 0 || point.y < 0 {
            return None;
        }
        let (x, y) = (point.x as u32, point.y as u32);
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.pixels.get((y * self.size.width + x) as usize).copied()
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: Rgb888) {
        let idx = y * self.size.width as usize + x;
        self.pixels[idx] = color;
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for Frame {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let w = self.size.width as i32;
        let h = self.size.height as i32;

        for Pixel(coord, color) in pixels {
            if coord.x >= 0 && coord.y >= 0 && coord.x < w && coord.y < h {
                self.set_pixel(coord.x as usize, coord.y as usize, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };

        for y in area.top_left.y..=bottom_right.y {
            for x in area.top_left.x..=bottom_right.x {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.pixels.fill(color);
        Ok(())
    }
}
