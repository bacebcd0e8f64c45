use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::models::button::ButtonChannel;

use super::ports::InputPort;

struct ChannelState {
    channel: ButtonChannel,
    last_accepted: Option<Instant>,
    was_high: bool,
}

/// Turns raw, bouncy button levels into discrete presses.
///
/// A press is accepted when a channel goes from low to high, stays high
/// across the settle delay, and the debounce interval has passed since the
/// last accepted press on that channel. A held button must be seen low
/// again before it can produce another press.
pub struct DebouncedInput<P: InputPort> {
    port: P,
    channels: Vec<ChannelState>,
    debounce: Duration,
    settle: Duration,
}

impl<P: InputPort> DebouncedInput<P> {
    /// `channels` must be in canonical order; polls report presses in that order.
    pub fn new(port: P, channels: Vec<ButtonChannel>, debounce: Duration, settle: Duration) -> Self {
        Self {
            port,
            channels: channels
                .into_iter()
                .map(|channel| ChannelState {
                    channel,
                    last_accepted: None,
                    was_high: false,
                })
                .collect(),
            debounce,
            settle,
        }
    }

    /// Sample every channel once and return the newly pressed ones.
    ///
    /// Waits for the settle delay once, and only when at least one channel is
    /// a candidate, so a quiet poll never sleeps.
    #[tracing::instrument(skip_all)]
    pub async fn poll(&mut self) -> Vec<ButtonChannel> {
        let now = Instant::now();
        let mut candidates = Vec::new();

        for (idx, state) in self.channels.iter_mut().enumerate() {
            let high = self.port.read_channel(state.channel);
            let rising = high && !state.was_high;
            state.was_high = high;

            if !rising {
                continue;
            }
            let window_open = state
                .last_accepted
                .map_or(true, |at| now.duration_since(at) >= self.debounce);
            if window_open {
                candidates.push(idx);
            } else {
                trace!("Ignored edge on {} inside debounce window.", state.channel);
            }
        }

        if candidates.is_empty() {
            return Vec::new();
        }

        tokio::time::sleep(self.settle).await;
        let accepted_at = Instant::now();

        let mut pressed = Vec::with_capacity(candidates.len());
        for idx in candidates {
            let state = &mut self.channels[idx];
            if self.port.read_channel(state.channel) {
                state.last_accepted = Some(accepted_at);
                debug!("Accepted press on {}.", state.channel);
                pressed.push(state.channel);
            } else {
                state.was_high = false;
                trace!("Rejected bounce on {}.", state.channel);
            }
        }
        pressed
    }

    /// The first new press in canonical order, if any. Further presses seen in
    /// the same poll are dropped.
    pub async fn poll_first(&mut self) -> Option<ButtonChannel> {
        self.poll().await.into_iter().next()
    }

    pub fn release(&mut self) {
        self.port.release();
    }

    #[cfg(test)]
    pub(crate) fn port(&self) -> &P {
        &self.port
    }
}
