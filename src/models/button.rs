use derive_more::Display;
use serde::Deserialize;
use thiserror::Error;

use super::action::Action;

/// Logical button identity. The value is the BCM GPIO number the button is
/// wired to, which keeps log lines and the config file in the same terms as
/// the wiring diagram.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[display(fmt = "GPIO{}", _0)]
#[serde(transparent)]
pub struct ButtonChannel(pub u8);

/// Fixed mapping from button channel to the action it requests. The binding
/// order is the canonical channel order used to break ties when several
/// buttons are pressed in the same tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonMap {
    bindings: Vec<(ButtonChannel, Action)>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ButtonMapError {
    #[error("Button channel {0} is bound more than once.")]
    DuplicateChannel(ButtonChannel),
}

impl ButtonMap {
    pub fn new(bindings: Vec<(ButtonChannel, Action)>) -> Result<Self, ButtonMapError> {
        for (i, (channel, _)) in bindings.iter().enumerate() {
            if bindings[..i].iter().any(|(other, _)| other == channel) {
                return Err(ButtonMapError::DuplicateChannel(*channel));
            }
        }
        Ok(Self { bindings })
    }

    /// Channels in canonical order.
    pub fn channels(&self) -> Vec<ButtonChannel> {
        self.bindings.iter().map(|(channel, _)| *channel).collect()
    }

    /// Look up the action for a channel. Unmapped channels show telemetry.
    pub fn resolve(&self, channel: ButtonChannel) -> Action {
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == channel)
            .map(|(_, action)| *action)
            .unwrap_or(Action::ShowTelemetry)
    }

    pub fn bindings(&self) -> &[(ButtonChannel, Action)] {
        &self.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> ButtonMap {
        ButtonMap::new(vec![
            (ButtonChannel(10), Action::ShowMedia(0)),
            (ButtonChannel(12), Action::ShowTelemetry),
            (ButtonChannel(11), Action::ShowMedia(1)),
        ])
        .expect("Failed to build button map.")
    }

    #[test]
    fn test_resolve() {
        let map = map();
        assert_eq!(map.resolve(ButtonChannel(10)), Action::ShowMedia(0));
        assert_eq!(map.resolve(ButtonChannel(11)), Action::ShowMedia(1));
        assert_eq!(map.resolve(ButtonChannel(12)), Action::ShowTelemetry);
    }

    #[test]
    fn test_unmapped_channel_falls_back_to_telemetry() {
        assert_eq!(map().resolve(ButtonChannel(27)), Action::ShowTelemetry);
    }

    #[test]
    fn test_channels_keep_binding_order() {
        assert_eq!(
            map().channels(),
            vec![ButtonChannel(10), ButtonChannel(12), ButtonChannel(11)]
        );
    }

    #[test]
    fn test_duplicate_channel_is_rejected() {
        let result = ButtonMap::new(vec![
            (ButtonChannel(10), Action::ShowMedia(0)),
            (ButtonChannel(10), Action::ShowTelemetry),
        ]);
        assert_eq!(result, Err(ButtonMapError::DuplicateChannel(ButtonChannel(10))));
    }
}
