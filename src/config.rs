use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

use crate::models::{
    action::Action,
    button::{ButtonChannel, ButtonMap, ButtonMapError},
};

/// Everything tunable about the kiosk. Every field has a default matching
/// the shop floor installation, so an empty (or missing) file is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    pub media: MediaConfig,
    pub timing: TimingConfig,
    pub telemetry: TelemetryConfig,
    pub display: DisplayConfig,
    /// Active-high buttons. Each pin needs a pull-down from the boot
    /// configuration, e.g. `gpio=10,11,12,13,15=ip,pd` in `config.txt`,
    /// or floating inputs read as phantom presses.
    pub buttons: Vec<ButtonBinding>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory scanned once at startup for images and videos.
    pub directory: PathBuf,

    /// Startup aborts when fewer entries than this are found.
    pub min_entries: usize,

    /// How many leading catalog entries the startup sequence shows.
    pub startup_entries: usize,

    /// Duration cap for each startup entry.
    pub startup_duration_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Tick of the image and telemetry render loops.
    pub display_tick_ms: u64,

    /// Tick of the idle input poll.
    pub idle_tick_ms: u64,

    /// Minimum time between two accepted presses of the same button.
    pub debounce_ms: u64,

    /// Delay before a raw high level is re-read to confirm a press.
    pub settle_ms: u64,

    /// Minimum time between two meter reads.
    pub read_interval_ms: u64,

    /// Half period of the over-current alarm blink.
    pub blink_interval_ms: u64,

    /// Used when a video does not report its own frame rate.
    pub default_frame_rate: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub port: String,
    pub baud_rate: u32,
    pub parity: ParityConfig,
    pub timeout_ms: u64,
    pub slave_id: u8,
    pub voltage_register: u16,
    pub current_register: u16,
    pub voltage_noise_floor: f32,
    pub current_noise_floor: f32,
    pub blink_threshold: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParityConfig {
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Linux framebuffer device node.
    pub device: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ButtonBinding {
    pub channel: ButtonChannel,
    pub action: Action,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}. Error: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse config file. Error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid button map. Error: {0}")]
    ButtonMap(#[from] ButtonMapError),
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            media: MediaConfig::default(),
            timing: TimingConfig::default(),
            telemetry: TelemetryConfig::default(),
            display: DisplayConfig::default(),
            buttons: vec![
                ButtonBinding::new(10, Action::ShowMedia(0)),
                ButtonBinding::new(11, Action::ShowMedia(1)),
                ButtonBinding::new(12, Action::ShowTelemetry),
                ButtonBinding::new(13, Action::ShowMedia(2)),
                ButtonBinding::new(15, Action::ShowMedia(3)),
            ],
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("/home/pi/media"),
            min_entries: 4,
            startup_entries: 4,
            startup_duration_secs: 30,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            display_tick_ms: 50,
            idle_tick_ms: 10,
            debounce_ms: 200,
            settle_ms: 50,
            read_interval_ms: 800,
            blink_interval_ms: 100,
            default_frame_rate: 30f32,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            port: String::from("/dev/ttyUSB0"),
            baud_rate: 9600,
            parity: ParityConfig::None,
            timeout_ms: 500,
            slave_id: 1,
            voltage_register: 0x0000,
            current_register: 0x0006,
            voltage_noise_floor: 5f32,
            current_noise_floor: 0.1f32,
            blink_threshold: 10f32,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/fb0"),
        }
    }
}

impl ButtonBinding {
    pub fn new(channel: u8, action: Action) -> Self {
        Self {
            channel: ButtonChannel(channel),
            action,
        }
    }
}

impl KioskConfig {
    /// Load the config from a TOML file, or the defaults when no path is given.
    /// The button map is validated here so a bad file fails before any
    /// hardware is touched.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&raw)?
            }
        };
        config.button_map()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn button_map(&self) -> Result<ButtonMap, ButtonMapError> {
        ButtonMap::new(
            self.buttons
                .iter()
                .map(|binding| (binding.channel, binding.action))
                .collect(),
        )
    }
}

impl TimingConfig {
    pub fn display_tick(&self) -> Duration {
        Duration::from_millis(self.display_tick_ms)
    }

    pub fn idle_tick(&self) -> Duration {
        Duration::from_millis(self.idle_tick_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn read_interval(&self) -> Duration {
        Duration::from_millis(self.read_interval_ms)
    }

    pub fn blink_interval(&self) -> Duration {
        Duration::from_millis(self.blink_interval_ms)
    }
}

impl MediaConfig {
    pub fn startup_duration(&self) -> Duration {
        Duration::from_secs(self.startup_duration_secs)
    }
}

impl TelemetryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl From<ParityConfig> for serialport::Parity {
    fn from(value: ParityConfig) -> Self {
        match value {
            ParityConfig::None => serialport::Parity::None,
            ParityConfig::Even => serialport::Parity::Even,
            ParityConfig::Odd => serialport::Parity::Odd,
        }
    }
}
