use std::fmt::Display;

use serde::Deserialize;

use super::button::ButtonChannel;

/// What the dispatcher should run next. Carries only the data the chosen
/// component needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Render catalog entry `index` until interrupted.
    ShowMedia(usize),

    /// Render the live voltage/current/power dashboard until interrupted.
    ShowTelemetry,

    /// Shut the kiosk down.
    Quit,
}

/// Why a long running render returned control to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptCause {
    /// Ran to natural completion (duration cap reached or nothing to show).
    None,

    /// An accepted press on the given channel.
    ButtonPressed(ButtonChannel),

    /// The quit signal was raised.
    Quit,
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::ShowMedia(index) => write!(f, "<Action: show media #{}>", index),
            Action::ShowTelemetry => write!(f, "<Action: show telemetry>"),
            Action::Quit => write!(f, "<Action: quit>"),
        }
    }
}

impl Display for InterruptCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterruptCause::None => write!(f, "<Interrupt: none>"),
            InterruptCause::ButtonPressed(channel) => write!(f, "<Interrupt: {} pressed>", channel),
            InterruptCause::Quit => write!(f, "<Interrupt: quit>"),
        }
    }
}
