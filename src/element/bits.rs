use super::check_raw_length;
use crate::channel::Channel;
use crate::error::{Result, ValidationError};
use crate::invalidation::{InvalidationState, Invalidator};
use crate::order::{self, ByteOrder, WordOrder};
use crate::value::{Value, ValueType};
use std::sync::Arc;

pub const BITS_PER_REGISTER: i32 = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BitConverter {
    #[default]
    Identity,
    Invert,
}

impl BitConverter {
    fn apply(self, bit: bool) -> bool {
        match self {
            BitConverter::Identity => bit,
            BitConverter::Invert => !bit,
        }
    }
}

#[derive(Debug)]
pub struct BitMapping {
    pub bit_index: u8,
    pub converter: BitConverter,
    pub channel: Arc<Channel>,
}

/// One register carrying up to sixteen boolean channels.
///
/// A write is only composed when every mapped channel has a pending value.
/// The register is then written as a whole, with unmapped bits cleared.
#[derive(Debug)]
pub struct BitsElement {
    address: u16,
    byte_order: ByteOrder,
    // Sorted by bit index.
    mappings: Vec<BitMapping>,
    invalidator: Invalidator,
}

impl BitsElement {
    pub fn new(address: u16) -> Self {
        Self {
            address,
            byte_order: ByteOrder::default(),
            mappings: Vec::new(),
            invalidator: Invalidator::default(),
        }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn bit(self, bit_index: i32, channel: Arc<Channel>) -> Result<Self> {
        self.bit_with(bit_index, channel, BitConverter::Identity)
    }

    pub fn bit_with(
        mut self,
        bit_index: i32,
        channel: Arc<Channel>,
        converter: BitConverter,
    ) -> Result<Self> {
        if !(0..BITS_PER_REGISTER).contains(&bit_index) {
            return Err(ValidationError::BitIndex(bit_index).into());
        }
        let bit_index = bit_index as u8;
        if channel.value_type() != ValueType::Bool {
            return Err(ValidationError::ChannelType {
                channel: channel.id().to_string(),
                actual: channel.value_type(),
                element: "bits",
            }
            .into());
        }
        if self.mappings.iter().any(|m| m.bit_index == bit_index) {
            return Err(ValidationError::DuplicateBitIndex(bit_index).into());
        }
        // The same slot cannot be locked twice while composing a write.
        if self
            .mappings
            .iter()
            .any(|m| Arc::ptr_eq(&m.channel, &channel))
        {
            return Err(ValidationError::DuplicateChannel(channel.id().to_string()).into());
        }
        let position = self
            .mappings
            .partition_point(|m| m.bit_index < bit_index);
        self.mappings.insert(
            position,
            BitMapping {
                bit_index,
                converter,
                channel,
            },
        );
        Ok(self)
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn mappings(&self) -> &[BitMapping] {
        &self.mappings
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.invalidator.consecutive_failures()
    }

    pub fn decode(&mut self, raw: Option<&[u8]>) -> Result<()> {
        let Some(raw) = raw else {
            self.invalidator.reset();
            for mapping in &self.mappings {
                mapping.channel.set_next_value(None);
            }
            return Ok(());
        };
        check_raw_length(self.address, 1, raw)?;
        self.invalidator.reset();
        let register = order::read_words(raw, self.byte_order, WordOrder::MswLsw)[0];
        for mapping in &self.mappings {
            let bit = register & (1 << mapping.bit_index) != 0;
            mapping
                .channel
                .set_next_value(Some(Value::Bool(mapping.converter.apply(bit))));
        }
        Ok(())
    }

    /// Composes the register from all pending bit writes, or nothing.
    pub fn encode(&self) -> Option<Vec<u8>> {
        if self.mappings.is_empty() {
            return None;
        }
        // Slots are locked in channel address order, so elements sharing
        // channels never wait on each other in a cycle.
        let mut by_address: Vec<_> = self.mappings.iter().enumerate().collect();
        by_address.sort_by_key(|(_, m)| Arc::as_ptr(&m.channel));
        let mut slots: Vec<_> = by_address
            .into_iter()
            .map(|(i, m)| (i, m.channel.lock_next_write_value()))
            .collect();
        slots.sort_by_key(|(i, _)| *i);

        let mut register = 0u16;
        for (mapping, (_, slot)) in self.mappings.iter().zip(&slots) {
            let Some(bit) = slot.as_ref().and_then(Value::as_bool) else {
                tracing::trace!(
                    "Bits element at {}: bit {} has no pending write, skipping",
                    self.address,
                    mapping.bit_index
                );
                return None;
            };
            if mapping.converter.apply(bit) {
                register |= 1 << mapping.bit_index;
            }
        }
        for (_, slot) in &mut slots {
            slot.take();
        }
        Some(order::write_words(
            &[register],
            self.byte_order,
            WordOrder::MswLsw,
        ))
    }

    pub fn invalidate(&mut self, tolerated: u32) -> InvalidationState {
        self.invalidator.invalidate(
            self.address,
            tolerated,
            self.mappings.iter().map(|m| &m.channel),
        )
    }
}
