use std::time::Duration;

use embedded_graphics::{
    mono_font::{ascii::FONT_10X20, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    config::TimingConfig,
    models::{
        action::InterruptCause,
        frame::Frame,
        media_entry::{MediaEntry, MediaKind},
    },
};

use super::{
    input::DebouncedInput,
    ports::{DisplayPort, InputPort, MediaError, VideoSourcePort, VideoStream},
    tick::wait_tick,
};

pub const UNAVAILABLE_BACKGROUND: Rgb888 = Rgb888::new(40, 40, 40);

enum PlaybackState<S> {
    Starting,
    Playing(Source<S>),
    Interrupted(InterruptCause),
    Finished,
}

enum Source<S> {
    Still,
    Video { stream: S, frame_interval: Duration },
}

/// Shows one catalog entry until a press, the quit signal, or the optional
/// duration cap ends it. Videos loop from the start when they run out.
pub struct PlaybackEngine<'a, I: InputPort, D: DisplayPort, V: VideoSourcePort> {
    input: &'a mut DebouncedInput<I>,
    display: &'a mut D,
    videos: &'a V,
    timing: &'a TimingConfig,
    token: &'a CancellationToken,
}

impl<'a, I: InputPort, D: DisplayPort, V: VideoSourcePort> PlaybackEngine<'a, I, D, V> {
    pub fn new(
        input: &'a mut DebouncedInput<I>,
        display: &'a mut D,
        videos: &'a V,
        timing: &'a TimingConfig,
        token: &'a CancellationToken,
    ) -> Self {
        Self {
            input,
            display,
            videos,
            timing,
            token,
        }
    }

    /// Play `entry`. `image` is its preloaded frame when it is an image.
    ///
    /// Returns `InterruptCause::None` when the cap is reached or the entry
    /// cannot be shown; in the latter case a placeholder is left on screen.
    #[tracing::instrument(skip_all)]
    pub async fn play(
        &mut self,
        entry: &MediaEntry,
        image: Option<&Frame>,
        cap: Option<Duration>,
    ) -> InterruptCause {
        info!("Playing {}", entry);
        let started = Instant::now();
        let mut state = PlaybackState::Starting;

        loop {
            state = match state {
                PlaybackState::Starting => self.start(entry, image),
                PlaybackState::Playing(source) => self.tick(entry, source, started, cap).await,
                PlaybackState::Interrupted(cause) => {
                    debug!("Interrupted by {:?}.", cause);
                    return cause;
                }
                PlaybackState::Finished => {
                    debug!("Finished {}", entry);
                    return InterruptCause::None;
                }
            };
        }
    }

    fn start(&mut self, entry: &MediaEntry, image: Option<&Frame>) -> PlaybackState<V::Stream> {
        let source = match entry.kind() {
            MediaKind::Image => image
                .map(|frame| {
                    self.present(frame);
                    Source::Still
                })
                .ok_or_else(|| MediaError::Decode(String::from("image was not preloaded"))),
            MediaKind::Video => self
                .videos
                .open(entry.path(), self.display.resolution())
                .map(|stream| {
                    let frame_interval = self.frame_interval(stream.frame_rate());
                    Source::Video {
                        stream,
                        frame_interval,
                    }
                }),
        };

        match source {
            Ok(source) => PlaybackState::Playing(source),
            Err(e) => {
                error!("Failed to open {}. Error: {}", entry, e);
                self.show_unavailable(entry);
                PlaybackState::Finished
            }
        }
    }

    async fn tick(
        &mut self,
        entry: &MediaEntry,
        source: Source<V::Stream>,
        started: Instant,
        cap: Option<Duration>,
    ) -> PlaybackState<V::Stream> {
        let tick_started = Instant::now();
        if self.token.is_cancelled() {
            return PlaybackState::Interrupted(InterruptCause::Quit);
        }

        let (source, period) = match source {
            Source::Still => (Source::Still, self.timing.display_tick()),
            Source::Video {
                mut stream,
                frame_interval,
            } => {
                match next_looping_frame(&mut stream) {
                    Ok(Some(frame)) => self.present(&frame),
                    Ok(None) => {
                        warn!("{} has no frames.", entry);
                        self.show_unavailable(entry);
                        return PlaybackState::Finished;
                    }
                    Err(e) => {
                        error!("Failed to decode {}. Error: {}", entry, e);
                        self.show_unavailable(entry);
                        return PlaybackState::Finished;
                    }
                }
                (
                    Source::Video {
                        stream,
                        frame_interval,
                    },
                    frame_interval,
                )
            }
        };

        if let Some(channel) = self.input.poll_first().await {
            return PlaybackState::Interrupted(InterruptCause::ButtonPressed(channel));
        }
        if cap.is_some_and(|cap| started.elapsed() >= cap) {
            return PlaybackState::Finished;
        }
        if wait_tick(self.token, period.saturating_sub(tick_started.elapsed())).await {
            return PlaybackState::Interrupted(InterruptCause::Quit);
        }
        PlaybackState::Playing(source)
    }

    fn frame_interval(&self, reported: Option<f32>) -> Duration {
        let fps = reported
            .filter(|fps| fps.is_finite() && *fps > 0f32)
            .unwrap_or(self.timing.default_frame_rate)
            .max(1f32);
        Duration::from_secs_f32(1f32 / fps)
    }

    fn present(&mut self, frame: &Frame) {
        if let Err(e) = self.display.present(frame) {
            warn!("Failed to present frame. Error: {}", e);
        }
    }

    fn show_unavailable(&mut self, entry: &MediaEntry) {
        let frame = unavailable_frame(self.display.resolution(), &entry.name());
        self.present(&frame);
    }
}

/// Next frame, rewinding once when the stream has run out.
fn next_looping_frame<S: VideoStream>(stream: &mut S) -> Result<Option<Frame>, MediaError> {
    if let Some(frame) = stream.next_frame()? {
        return Ok(Some(frame));
    }
    trace!("End of stream, rewinding.");
    stream.rewind()?;
    stream.next_frame()
}

/// Placeholder shown in place of an entry that cannot be decoded.
pub fn unavailable_frame(size: Size, name: &str) -> Frame {
    let mut frame = Frame::filled(size, UNAVAILABLE_BACKGROUND);
    let centered = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build();
    let center = Point::new(size.width as i32 / 2, size.height as i32 / 2);

    Text::with_text_style(
        "MEDIA UNAVAILABLE",
        center - Point::new(0, 15),
        MonoTextStyle::new(&FONT_10X20, Rgb888::WHITE),
        centered,
    )
    .draw(&mut frame)
    .unwrap_or_else(|never| match never {});

    Text::with_text_style(
        name,
        center + Point::new(0, 15),
        MonoTextStyle::new(&FONT_10X20, Rgb888::YELLOW),
        centered,
    )
    .draw(&mut frame)
    .unwrap_or_else(|never| match never {});

    frame
}
