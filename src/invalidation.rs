use crate::channel::Channel;
use std::sync::Arc;

/// Number of failed reads an element survives before its channels are
/// marked unknown.
pub const DEFAULT_TOLERATED_READ_ERRORS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationState {
    /// Last read succeeded.
    Ok,
    /// Reads failed, channels still hold the last known value.
    PendingInvalidate { failures: u32 },
    /// Channels were cleared to unknown.
    Invalid,
}

/// Counts consecutive failed reads of one element.
#[derive(Debug, Clone, Default)]
pub struct Invalidator {
    consecutive_failures: u32,
}

impl Invalidator {
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn state(&self, tolerated: u32) -> InvalidationState {
        match self.consecutive_failures {
            0 => InvalidationState::Ok,
            n if n <= tolerated => InvalidationState::PendingInvalidate { failures: n },
            _ => InvalidationState::Invalid,
        }
    }

    /// Called on every successful decode.
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Records a failed read and clears `channels` once more than `tolerated`
    /// reads in a row have failed.
    pub fn invalidate<'a>(
        &mut self,
        address: u16,
        tolerated: u32,
        channels: impl IntoIterator<Item = &'a Arc<Channel>>,
    ) -> InvalidationState {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let state = self.state(tolerated);
        match state {
            InvalidationState::Invalid => {
                if self.consecutive_failures == tolerated.saturating_add(1) {
                    tracing::debug!(
                        "Element at {}: {} failed reads, invalidating channels",
                        address,
                        self.consecutive_failures
                    );
                }
                for channel in channels {
                    channel.set_next_value(None);
                }
            }
            InvalidationState::PendingInvalidate { failures } => {
                tracing::trace!(
                    "Element at {}: read failed ({}), keeping last value",
                    address,
                    failures
                );
            }
            InvalidationState::Ok => {}
        }
        state
    }
}
