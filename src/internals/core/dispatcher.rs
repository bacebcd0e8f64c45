use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::KioskConfig,
    models::{
        action::{Action, InterruptCause},
        button::ButtonMap,
    },
};

use super::{
    catalog::MediaCatalog,
    input::DebouncedInput,
    playback::{unavailable_frame, PlaybackEngine},
    ports::{DisplayPort, InputPort, RegisterTransportPort, VideoSourcePort},
    telemetry_reader::TelemetryReader,
    telemetry_screen::TelemetryScreen,
    tick::wait_tick,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Startup,
    Running(Action),
    Idle,
    Terminating,
}

/// Owns every component and decides what runs on screen next.
///
/// Exactly one long running component is active at a time. Whatever it
/// returns is turned into the next state by [`Dispatcher::next_state`].
pub struct Dispatcher<I, T, D, V>
where
    I: InputPort,
    T: RegisterTransportPort,
    D: DisplayPort,
    V: VideoSourcePort,
{
    input: DebouncedInput<I>,
    reader: TelemetryReader<T>,
    display: D,
    videos: V,
    catalog: MediaCatalog,
    button_map: ButtonMap,
    config: KioskConfig,
    token: CancellationToken,
    state: DispatcherState,
}

impl<I, T, D, V> Dispatcher<I, T, D, V>
where
    I: InputPort,
    T: RegisterTransportPort,
    D: DisplayPort,
    V: VideoSourcePort,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        input: DebouncedInput<I>,
        reader: TelemetryReader<T>,
        display: D,
        videos: V,
        catalog: MediaCatalog,
        button_map: ButtonMap,
        config: KioskConfig,
        token: CancellationToken,
    ) -> Self {
        Self {
            input,
            reader,
            display,
            videos,
            catalog,
            button_map,
            config,
            token,
            state: DispatcherState::Startup,
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// Map an interrupt cause to the next state.
    pub fn next_state(cause: InterruptCause, button_map: &ButtonMap) -> DispatcherState {
        match cause {
            InterruptCause::Quit => DispatcherState::Terminating,
            InterruptCause::ButtonPressed(channel) => {
                DispatcherState::Running(button_map.resolve(channel))
            }
            InterruptCause::None => DispatcherState::Idle,
        }
    }

    /// Run states until termination is reached. Does not release anything;
    /// call [`Dispatcher::terminate`] afterwards, also after a panic.
    #[tracing::instrument(skip_all)]
    pub async fn run(&mut self) {
        info!("Started.");
        while self.state != DispatcherState::Terminating {
            self.state = self.step().await;
            info!("Entering {:?}.", self.state);
        }
    }

    /// Perform the work of the current state and return the state after it.
    pub async fn step(&mut self) -> DispatcherState {
        match self.state {
            DispatcherState::Startup => self.run_startup().await,
            DispatcherState::Running(Action::Quit) => DispatcherState::Terminating,
            DispatcherState::Running(Action::ShowTelemetry) => {
                let cause = self.show_telemetry().await;
                Self::next_state(cause, &self.button_map)
            }
            DispatcherState::Running(Action::ShowMedia(index)) => {
                let cause = self.play(index, None).await;
                Self::next_state(cause, &self.button_map)
            }
            DispatcherState::Idle => self.idle_tick().await,
            DispatcherState::Terminating => DispatcherState::Terminating,
        }
    }

    /// Show the leading catalog entries under the startup cap. Any press or
    /// quit cuts the sequence short; otherwise telemetry follows.
    #[tracing::instrument(skip_all)]
    async fn run_startup(&mut self) -> DispatcherState {
        let count = self.config.media.startup_entries.min(self.catalog.len());
        let cap = self.config.media.startup_duration();

        for index in 0..count {
            let cause = self.play(index, Some(cap)).await;
            if cause != InterruptCause::None {
                return Self::next_state(cause, &self.button_map);
            }
        }
        DispatcherState::Running(Action::ShowTelemetry)
    }

    async fn idle_tick(&mut self) -> DispatcherState {
        if self.token.is_cancelled() {
            return DispatcherState::Terminating;
        }
        if let Some(channel) = self.input.poll_first().await {
            return DispatcherState::Running(self.button_map.resolve(channel));
        }
        if wait_tick(&self.token, self.config.timing.idle_tick()).await {
            return DispatcherState::Terminating;
        }
        DispatcherState::Idle
    }

    async fn play(&mut self, index: usize, cap: Option<Duration>) -> InterruptCause {
        let Some(entry) = self.catalog.get(index) else {
            warn!("No media entry #{}.", index);
            let frame = unavailable_frame(self.display.resolution(), &format!("#{}", index));
            if let Err(e) = self.display.present(&frame) {
                warn!("Failed to present frame. Error: {}", e);
            }
            return InterruptCause::None;
        };
        let image = self.catalog.image(index);

        PlaybackEngine::new(
            &mut self.input,
            &mut self.display,
            &self.videos,
            &self.config.timing,
            &self.token,
        )
        .play(entry, image, cap)
        .await
    }

    async fn show_telemetry(&mut self) -> InterruptCause {
        TelemetryScreen::new(
            &mut self.input,
            &mut self.display,
            &mut self.reader,
            &self.config.timing,
            self.config.telemetry.blink_threshold,
            &self.token,
        )
        .run()
        .await
    }

    /// Release every resource. Safe to call more than once.
    #[tracing::instrument(skip_all)]
    pub fn terminate(&mut self) {
        self.state = DispatcherState::Terminating;
        self.reader.close();
        self.input.release();
        self.display.release();
        info!("Released all resources.");
    }

    #[cfg(test)]
    pub(crate) fn set_state(&mut self, state: DispatcherState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, path::PathBuf, rc::Rc};

    use embedded_graphics::{pixelcolor::Rgb888, prelude::*};
    use tokio::time::Instant;

    use super::*;
    use crate::{
        internals::core::{
            fakes::{
                FakeDecoder, FakeInput, FakeMeter, FakeTransport, FakeVideoSource,
                RecordingDisplay, VideoLog,
            },
            playback::UNAVAILABLE_BACKGROUND,
        },
        models::{
            button::ButtonChannel,
            frame::Frame,
            media_entry::{MediaEntry, MediaKind},
        },
    };

    const SIZE: Size = Size::new(16, 12);
    const ENTRY_COLORS: [Rgb888; 4] = [
        Rgb888::new(1, 0, 0),
        Rgb888::new(2, 0, 0),
        Rgb888::new(3, 0, 0),
        Rgb888::new(4, 0, 0),
    ];

    type TestDispatcher = Dispatcher<FakeInput, FakeTransport, RecordingDisplay, FakeVideoSource>;

    struct Harness {
        dispatcher: TestDispatcher,
        frames: Rc<RefCell<Vec<Frame>>>,
        videos: Rc<RefCell<VideoLog>>,
        meter: Rc<RefCell<FakeMeter>>,
        token: CancellationToken,
    }

    /// Catalog of `a.png`, `b.png`, `c.mp4`, `d.png` with one color each.
    fn harness(port: FakeInput) -> Harness {
        let names = ["a.png", "b.png", "c.mp4", "d.png"];
        let entries = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let kind = MediaKind::from_file_name(name).expect("Unknown media kind.");
                MediaEntry::new(i, PathBuf::from("/media").join(name), kind)
            })
            .collect();
        let mut catalog = MediaCatalog::from_entries(entries);
        let decoder = FakeDecoder::default()
            .with("a.png", ENTRY_COLORS[0])
            .with("b.png", ENTRY_COLORS[1])
            .with("d.png", ENTRY_COLORS[3]);
        catalog.preload_images(&decoder, SIZE);

        let videos = FakeVideoSource::new().with("c.mp4", vec![ENTRY_COLORS[2]; 5]);
        let video_log = videos.log.clone();
        let display = RecordingDisplay::new(SIZE);
        let frames = display.frames.clone();
        let meter = FakeMeter::with_readings(230f32, 2f32);

        let config = KioskConfig::default();
        let button_map = config.button_map().expect("Failed to build button map.");
        let input = DebouncedInput::new(
            port,
            button_map.channels(),
            config.timing.debounce(),
            config.timing.settle(),
        );
        let reader = TelemetryReader::new(FakeTransport::new(meter.clone()), &config.telemetry);
        let token = CancellationToken::new();

        Harness {
            dispatcher: Dispatcher::new(
                input,
                reader,
                display,
                videos,
                catalog,
                button_map,
                config,
                token.clone(),
            ),
            frames,
            videos: video_log,
            meter,
            token,
        }
    }

    fn shown(frames: &Rc<RefCell<Vec<Frame>>>) -> Vec<Rgb888> {
        let mut colors: Vec<Rgb888> = Vec::new();
        for color in frames.borrow().iter().filter_map(|f| f.pixel(Point::zero())) {
            if colors.last() != Some(&color) {
                colors.push(color);
            }
        }
        colors
    }

    fn cancel_after(token: &CancellationToken, after: Duration) {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            token.cancel();
        });
    }

    fn map() -> ButtonMap {
        KioskConfig::default()
            .button_map()
            .expect("Failed to build button map.")
    }

    #[test]
    fn test_next_state_is_pure() {
        let map = map();
        type D = TestDispatcher;
        for _ in 0..2 {
            assert_eq!(D::next_state(InterruptCause::Quit, &map), DispatcherState::Terminating);
            assert_eq!(D::next_state(InterruptCause::None, &map), DispatcherState::Idle);
            assert_eq!(
                D::next_state(InterruptCause::ButtonPressed(ButtonChannel(13)), &map),
                DispatcherState::Running(Action::ShowMedia(2))
            );
            assert_eq!(
                D::next_state(InterruptCause::ButtonPressed(ButtonChannel(12)), &map),
                DispatcherState::Running(Action::ShowTelemetry)
            );
            assert_eq!(
                D::next_state(InterruptCause::ButtonPressed(ButtonChannel(4)), &map),
                DispatcherState::Running(Action::ShowTelemetry)
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_plays_all_entries_then_shows_telemetry() {
        let mut h = harness(FakeInput::new());
        let start = Instant::now();

        let next = h.dispatcher.step().await;

        assert_eq!(next, DispatcherState::Running(Action::ShowTelemetry));
        assert!(start.elapsed() >= Duration::from_secs(120));
        assert_eq!(shown(&h.frames), ENTRY_COLORS.to_vec());
        assert_eq!(h.videos.borrow().dropped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_during_startup_jumps_to_mapped_action() {
        // GPIO13 maps to the third entry; pressed while the second one shows.
        let mut h = harness(FakeInput::new().press(13, 35_000, 300));

        let next = h.dispatcher.step().await;

        assert_eq!(next, DispatcherState::Running(Action::ShowMedia(2)));
        assert_eq!(shown(&h.frames), ENTRY_COLORS[..2].to_vec());
        assert!(h.videos.borrow().opened.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_during_startup_terminates() {
        let mut h = harness(FakeInput::new());
        cancel_after(&h.token, Duration::from_secs(10));

        assert_eq!(h.dispatcher.step().await, DispatcherState::Terminating);
    }

    #[tokio::test(start_paused = true)]
    async fn test_telemetry_to_media_to_quit() {
        let mut h = harness(FakeInput::new().press(13, 1_000, 300));
        h.dispatcher.set_state(DispatcherState::Running(Action::ShowTelemetry));
        cancel_after(&h.token, Duration::from_secs(5));

        h.dispatcher.run().await;

        assert_eq!(h.dispatcher.state(), DispatcherState::Terminating);
        assert!(h.meter.borrow().reads >= 2);
        assert_eq!(h.videos.borrow().opened, vec![String::from("c.mp4")]);
        assert_eq!(h.videos.borrow().dropped, 1);
        assert_eq!(shown(&h.frames).last(), Some(&ENTRY_COLORS[2]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reentering_telemetry_keeps_read_interval() {
        // GPIO12 every 300 ms restarts the dashboard well inside one 800 ms
        // read interval.
        let port = (1..=6).fold(FakeInput::new(), |port, k| port.press(12, k * 300, 100));
        let mut h = harness(port);
        h.dispatcher.set_state(DispatcherState::Running(Action::ShowTelemetry));
        cancel_after(&h.token, Duration::from_millis(1_900));

        h.dispatcher.run().await;

        assert_eq!(h.dispatcher.state(), DispatcherState::Terminating);
        // Samples at 0, 800 and 1600 ms, two registers each.
        assert_eq!(h.meter.borrow().reads, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_button_does_not_retrigger() {
        // GPIO10 held for 3 s: one transition to the first entry, then nothing
        // until the quit signal.
        let mut h = harness(FakeInput::new().press(10, 500, 3_000));
        h.dispatcher.set_state(DispatcherState::Running(Action::ShowTelemetry));

        assert_eq!(
            h.dispatcher.step().await,
            DispatcherState::Running(Action::ShowMedia(0))
        );
        h.dispatcher.set_state(DispatcherState::Running(Action::ShowMedia(0)));
        cancel_after(&h.token, Duration::from_secs(5));
        assert_eq!(h.dispatcher.step().await, DispatcherState::Terminating);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_entry_goes_idle_then_follows_press() {
        let mut h = harness(FakeInput::new().press(12, 2_000, 300));
        h.dispatcher.set_state(DispatcherState::Running(Action::ShowMedia(9)));

        let next = h.dispatcher.step().await;
        assert_eq!(next, DispatcherState::Idle);
        assert_eq!(shown(&h.frames), vec![UNAVAILABLE_BACKGROUND]);

        h.dispatcher.set_state(next);
        let mut state = next;
        while state == DispatcherState::Idle {
            state = h.dispatcher.step().await;
        }
        assert_eq!(state, DispatcherState::Running(Action::ShowTelemetry));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_ends_on_quit() {
        let mut h = harness(FakeInput::new());
        h.dispatcher.set_state(DispatcherState::Idle);
        cancel_after(&h.token, Duration::from_millis(500));

        h.dispatcher.run().await;
        assert_eq!(h.dispatcher.state(), DispatcherState::Terminating);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_action_terminates() {
        let mut h = harness(FakeInput::new());
        h.dispatcher.set_state(DispatcherState::Running(Action::Quit));
        assert_eq!(h.dispatcher.step().await, DispatcherState::Terminating);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_releases_everything() {
        let port = FakeInput::new();
        let input_released = port.released.clone();
        let mut h = harness(port);
        let display_released = h.dispatcher.display.released.clone();
        h.dispatcher.set_state(DispatcherState::Running(Action::ShowTelemetry));
        cancel_after(&h.token, Duration::from_secs(1));
        h.dispatcher.run().await;

        h.dispatcher.terminate();
        h.dispatcher.terminate();

        assert!(input_released.get());
        assert!(display_released.get());
        assert!(!h.dispatcher.reader.connection_state().is_open());
        assert!(h.meter.borrow().closes >= 1);
    }
}
