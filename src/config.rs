use crate::invalidation::DEFAULT_TOLERATED_READ_ERRORS;

/// Settings shared by every task of one bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Consecutive failed reads an element survives before its channels
    /// become unknown.
    pub invalidate_after_read_errors: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            invalidate_after_read_errors: DEFAULT_TOLERATED_READ_ERRORS,
        }
    }
}
