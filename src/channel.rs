use crate::error::{BridgeError, Result};
use crate::value::{Value, ValueType};
use bitflags::bitflags;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

bitflags! {
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
    pub struct AccessMode: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        ChannelId(id.to_string())
    }
}

impl From<String> for ChannelId {
    fn from(id: String) -> Self {
        ChannelId(id)
    }
}

/// A typed data point fed by an element.
///
/// Decoding writes the `next` slot; [`Channel::next_process_image`] promotes
/// it to the current value at the cycle boundary. Writable channels also
/// carry a pending-write slot that producers fill and exactly one write frame
/// consumes.
///
/// Channels are shared as `Arc<Channel>` between the element that feeds them
/// and any number of producers on other threads.
#[derive(Debug)]
pub struct Channel {
    id: ChannelId,
    value_type: ValueType,
    access: AccessMode,
    value: Mutex<Option<Value>>,
    next_value: Mutex<Option<Value>>,
    next_write_value: Mutex<Option<Value>>,
}

impl Channel {
    pub fn new(id: impl Into<ChannelId>, value_type: ValueType, access: AccessMode) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            value_type,
            access,
            value: Mutex::new(None),
            next_value: Mutex::new(None),
            next_write_value: Mutex::new(None),
        })
    }

    pub fn read_only(id: impl Into<ChannelId>, value_type: ValueType) -> Arc<Self> {
        Self::new(id, value_type, AccessMode::READ)
    }

    pub fn read_write(id: impl Into<ChannelId>, value_type: ValueType) -> Arc<Self> {
        Self::new(id, value_type, AccessMode::READ_WRITE)
    }

    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn access(&self) -> AccessMode {
        self.access
    }

    pub fn is_writable(&self) -> bool {
        self.access.contains(AccessMode::WRITE)
    }

    /// The last confirmed value.
    pub fn value(&self) -> Option<Value> {
        lock(&self.value).clone()
    }

    /// The most recent decode outcome, `None` while unknown.
    pub fn next_value(&self) -> Option<Value> {
        lock(&self.next_value).clone()
    }

    /// Stores a decode outcome. Values of another type are cast to the
    /// declared type; a value that does not fit becomes unknown.
    pub fn set_next_value(&self, value: Option<Value>) {
        let value = value.and_then(|v| {
            let cast = v.cast(self.value_type);
            if cast.is_none() {
                tracing::warn!(
                    "Channel {}: value {} does not fit {}",
                    self.id,
                    v,
                    self.value_type
                );
            }
            cast
        });
        *lock(&self.next_value) = value;
    }

    /// Promotes the next value to the current value.
    pub fn next_process_image(&self) {
        let next = self.next_value();
        *lock(&self.value) = next;
    }

    /// Queues a value for the next write tick, replacing any value that was
    /// not yet taken.
    pub fn set_next_write_value(&self, value: impl Into<Value>) -> Result<()> {
        if !self.is_writable() {
            return Err(BridgeError::NotWritable(self.id.to_string()));
        }
        let value = value.into();
        let cast = value
            .cast(self.value_type)
            .ok_or_else(|| BridgeError::ValueType {
                value: value.to_string(),
                target: self.value_type,
            })?;
        *lock(&self.next_write_value) = Some(cast);
        Ok(())
    }

    /// Drops a queued write value without sending it.
    pub fn clear_next_write_value(&self) {
        lock(&self.next_write_value).take();
    }

    /// Peeks at the queued write value.
    pub fn next_write_value(&self) -> Option<Value> {
        lock(&self.next_write_value).clone()
    }

    /// Takes the queued write value, leaving the slot empty.
    pub fn take_next_write_value(&self) -> Option<Value> {
        lock(&self.next_write_value).take()
    }

    /// Holds the pending-write slot locked so several channels can be checked
    /// and taken as one unit.
    pub(crate) fn lock_next_write_value(&self) -> MutexGuard<'_, Option<Value>> {
        lock(&self.next_write_value)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
