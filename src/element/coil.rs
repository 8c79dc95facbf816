use crate::channel::Channel;
use crate::error::{Result, ValidationError};
use crate::invalidation::{InvalidationState, Invalidator};
use crate::value::{Value, ValueType};
use std::sync::Arc;

/// A single coil or discrete input.
#[derive(Debug)]
pub struct CoilElement {
    address: u16,
    channel: Option<Arc<Channel>>,
    invalidator: Invalidator,
}

impl CoilElement {
    pub fn new(address: u16) -> Self {
        Self {
            address,
            channel: None,
            invalidator: Invalidator::default(),
        }
    }

    pub fn map(mut self, channel: Arc<Channel>) -> Result<Self> {
        if self.channel.is_some() {
            return Err(ValidationError::AlreadyMapped(self.address).into());
        }
        if channel.value_type() != ValueType::Bool {
            return Err(ValidationError::ChannelType {
                channel: channel.id().to_string(),
                actual: channel.value_type(),
                element: "coil",
            }
            .into());
        }
        self.channel = Some(channel);
        Ok(self)
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn channel(&self) -> Option<&Arc<Channel>> {
        self.channel.as_ref()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.invalidator.consecutive_failures()
    }

    pub fn decode(&mut self, coil: Option<bool>) {
        self.invalidator.reset();
        if let Some(channel) = &self.channel {
            channel.set_next_value(coil.map(Value::Bool));
        }
    }

    pub fn encode(&self) -> Option<bool> {
        self.channel.as_ref()?.take_next_write_value()?.as_bool()
    }

    pub fn invalidate(&mut self, tolerated: u32) -> InvalidationState {
        self.invalidator
            .invalidate(self.address, tolerated, self.channel.iter())
    }
}
