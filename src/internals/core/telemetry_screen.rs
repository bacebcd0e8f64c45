use std::time::Duration;

use common::physical::Current;
use embedded_graphics::{
    mono_font::{ascii::FONT_10X20, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle, RoundedRectangle},
    text::{Alignment, Baseline, Text, TextStyle, TextStyleBuilder},
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::TimingConfig,
    models::{action::InterruptCause, frame::Frame, telemetry_sample::TelemetrySample},
};

use super::{
    input::DebouncedInput,
    ports::{DisplayPort, InputPort, RegisterTransportPort},
    telemetry_reader::TelemetryReader,
    tick::wait_tick,
};

pub const TITLE: &str = "Hand tools rated voltage and rated current";
pub const BACKGROUND: Rgb888 = Rgb888::BLACK;
pub const PANEL_COLOR: Rgb888 = Rgb888::WHITE;
pub const ALARM_COLOR: Rgb888 = Rgb888::RED;
pub const VALUE_BOX_COLOR: Rgb888 = Rgb888::BLACK;

const PANEL_LABELS: [(&str, &str); 3] = [
    ("POWER CONSUMPTION", "W"),
    ("RATED VOLTAGE", "V"),
    ("RATED CURRENT", "A"),
];
const CURRENT_PANEL: usize = 2;

/// Color of the current panel. Above `threshold` it alternates between the
/// alarm color and the normal color every `blink_interval`, starting red.
pub fn current_panel_color(
    current: Current,
    threshold: f32,
    elapsed: Duration,
    blink_interval: Duration,
) -> Rgb888 {
    if !current.exceeds(threshold) {
        return PANEL_COLOR;
    }
    let phase = elapsed.as_millis() / blink_interval.as_millis().max(1);
    if phase % 2 == 0 {
        ALARM_COLOR
    } else {
        PANEL_COLOR
    }
}

#[derive(Debug, Clone, Copy)]
struct PanelLayout {
    panel: RoundedRectangle,
    value_box: Rectangle,
    label_anchor: Point,
    unit_anchor: Point,
}

/// Positions of everything on the dashboard, computed once per resolution.
#[derive(Debug, Clone)]
pub struct DashboardLayout {
    title_anchor: Point,
    panels: [PanelLayout; 3],
}

impl DashboardLayout {
    pub fn new(size: Size) -> Self {
        let (w, h) = (size.width as i32, size.height as i32);
        let panel_w = w * 80 / 100;
        let panel_h = h * 15 / 100;
        let panel_x = (w - panel_w) / 2;
        let padding = (panel_h / 4).min(10);
        let radius = (panel_h / 2).min(20) as u32;

        let panels = [0, 1, 2].map(|i| {
            let panel_y = h * (20 + 20 * i) / 100;
            let value_x = panel_x + panel_w * 60 / 100;
            let value_w = panel_w * 20 / 100;
            let unit_x = value_x + value_w + (panel_x + panel_w - value_x - value_w) / 2;

            PanelLayout {
                panel: RoundedRectangle::with_equal_corners(
                    Rectangle::new(
                        Point::new(panel_x, panel_y),
                        Size::new(panel_w as u32, panel_h as u32),
                    ),
                    Size::new(radius, radius),
                ),
                value_box: Rectangle::new(
                    Point::new(value_x, panel_y + padding),
                    Size::new(value_w as u32, (panel_h - 2 * padding).max(0) as u32),
                ),
                label_anchor: Point::new(panel_x + (panel_w / 10).min(60), panel_y + panel_h / 2),
                unit_anchor: Point::new(unit_x, panel_y + panel_h / 2),
            }
        });

        Self {
            title_anchor: Point::new(w / 2, h * 5 / 100),
            panels,
        }
    }

    /// Draw the full dashboard for `sample` into `frame`.
    pub fn draw(&self, frame: &mut Frame, sample: &TelemetrySample, current_color: Rgb888) {
        frame
            .clear(BACKGROUND)
            .unwrap_or_else(|never| match never {});

        let centered = text_style(Alignment::Center);
        Text::with_text_style(
            TITLE,
            self.title_anchor,
            MonoTextStyle::new(&FONT_10X20, Rgb888::YELLOW),
            centered,
        )
        .draw(frame)
        .unwrap_or_else(|never| match never {});

        let values = [
            sample.power.value(),
            sample.voltage.value(),
            sample.current.value(),
        ];
        for (i, (layout, ((label, unit), value))) in self
            .panels
            .iter()
            .zip(PANEL_LABELS.iter().zip(values))
            .enumerate()
        {
            let fill = if i == CURRENT_PANEL {
                current_color
            } else {
                PANEL_COLOR
            };
            draw_panel(frame, layout, label, unit, value, fill);
        }
    }
}

fn text_style(alignment: Alignment) -> TextStyle {
    TextStyleBuilder::new()
        .alignment(alignment)
        .baseline(Baseline::Middle)
        .build()
}

fn draw_panel(
    frame: &mut Frame,
    layout: &PanelLayout,
    label: &str,
    unit: &str,
    value: f32,
    fill: Rgb888,
) {
    let dark = MonoTextStyle::new(&FONT_10X20, Rgb888::BLACK);

    layout
        .panel
        .into_styled(PrimitiveStyle::with_fill(fill))
        .draw(frame)
        .unwrap_or_else(|never| match never {});
    layout
        .value_box
        .into_styled(PrimitiveStyle::with_fill(VALUE_BOX_COLOR))
        .draw(frame)
        .unwrap_or_else(|never| match never {});

    Text::with_text_style(label, layout.label_anchor, dark, text_style(Alignment::Left))
        .draw(frame)
        .unwrap_or_else(|never| match never {});
    Text::with_text_style(
        &format!("{:.1}", value),
        layout.value_box.center(),
        MonoTextStyle::new(&FONT_10X20, Rgb888::YELLOW),
        text_style(Alignment::Center),
    )
    .draw(frame)
    .unwrap_or_else(|never| match never {});
    Text::with_text_style(unit, layout.unit_anchor, dark, text_style(Alignment::Center))
        .draw(frame)
        .unwrap_or_else(|never| match never {});
}

/// Live voltage, current and power dashboard.
///
/// The meter is read at most once per read interval, counted from the
/// reader's last sample so leaving and re-entering the screen does not force
/// a read. The frame is redrawn every display tick from that sample so the
/// alarm blink stays smooth.
pub struct TelemetryScreen<'a, I: InputPort, D: DisplayPort, T: RegisterTransportPort> {
    input: &'a mut DebouncedInput<I>,
    display: &'a mut D,
    reader: &'a mut TelemetryReader<T>,
    timing: &'a TimingConfig,
    blink_threshold: f32,
    token: &'a CancellationToken,
}

impl<'a, I: InputPort, D: DisplayPort, T: RegisterTransportPort> TelemetryScreen<'a, I, D, T> {
    pub fn new(
        input: &'a mut DebouncedInput<I>,
        display: &'a mut D,
        reader: &'a mut TelemetryReader<T>,
        timing: &'a TimingConfig,
        blink_threshold: f32,
        token: &'a CancellationToken,
    ) -> Self {
        Self {
            input,
            display,
            reader,
            timing,
            blink_threshold,
            token,
        }
    }

    /// Run until a press or the quit signal. Never finishes on its own.
    #[tracing::instrument(skip_all)]
    pub async fn run(&mut self) -> InterruptCause {
        info!("Started.");
        let resolution = self.display.resolution();
        let layout = DashboardLayout::new(resolution);
        let mut frame = Frame::filled(resolution, BACKGROUND);
        let started = Instant::now();
        let read_interval = self.timing.read_interval();

        loop {
            if self.token.is_cancelled() {
                return InterruptCause::Quit;
            }
            let tick_started = Instant::now();

            let current = match self.reader.last_sample() {
                Some(last) if last.timestamp.elapsed() < read_interval => last,
                _ => self.reader.sample(),
            };

            let color = current_panel_color(
                current.current,
                self.blink_threshold,
                started.elapsed(),
                self.timing.blink_interval(),
            );
            layout.draw(&mut frame, &current, color);
            if let Err(e) = self.display.present(&frame) {
                warn!("Failed to present dashboard. Error: {}", e);
            }

            if let Some(channel) = self.input.poll_first().await {
                return InterruptCause::ButtonPressed(channel);
            }
            let remaining = self
                .timing
                .display_tick()
                .saturating_sub(tick_started.elapsed());
            if wait_tick(self.token, remaining).await {
                return InterruptCause::Quit;
            }
        }
    }
}
