use super::check_raw_length;
use crate::channel::Channel;
use crate::error::{Result, ValidationError};
use crate::invalidation::{InvalidationState, Invalidator};
use crate::order::{self, ByteOrder, WordOrder};
use crate::value::{Value, ValueType};
use std::sync::Arc;

/// ASCII text packed two characters per register, NUL padded.
#[derive(Debug)]
pub struct StringElement {
    address: u16,
    length: u16,
    byte_order: ByteOrder,
    word_order: WordOrder,
    channel: Option<Arc<Channel>>,
    invalidator: Invalidator,
}

impl StringElement {
    /// `length` is the number of registers, the text holds up to twice as
    /// many characters.
    pub fn new(address: u16, length: u16) -> Result<Self> {
        if length == 0 {
            return Err(ValidationError::RegisterCount {
                element: "string",
                count: length,
            }
            .into());
        }
        Ok(Self {
            address,
            length,
            byte_order: ByteOrder::default(),
            word_order: WordOrder::default(),
            channel: None,
            invalidator: Invalidator::default(),
        })
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_word_order(mut self, word_order: WordOrder) -> Self {
        self.word_order = word_order;
        self
    }

    pub fn map(mut self, channel: Arc<Channel>) -> Result<Self> {
        if self.channel.is_some() {
            return Err(ValidationError::AlreadyMapped(self.address).into());
        }
        if channel.value_type() != ValueType::String {
            return Err(ValidationError::ChannelType {
                channel: channel.id().to_string(),
                actual: channel.value_type(),
                element: "string",
            }
            .into());
        }
        self.channel = Some(channel);
        Ok(self)
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn register_count(&self) -> u16 {
        self.length
    }

    pub fn channel(&self) -> Option<&Arc<Channel>> {
        self.channel.as_ref()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.invalidator.consecutive_failures()
    }

    pub fn decode(&mut self, raw: Option<&[u8]>) -> Result<()> {
        if let Some(raw) = raw {
            check_raw_length(self.address, self.length, raw)?;
        }
        self.invalidator.reset();
        let Some(channel) = &self.channel else {
            return Ok(());
        };
        let text = raw.map(|raw| {
            let mut bytes: Vec<u8> = order::read_words(raw, self.byte_order, self.word_order)
                .into_iter()
                .flat_map(u16::to_be_bytes)
                .collect();
            while bytes.last() == Some(&0) {
                bytes.pop();
            }
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        });
        channel.set_next_value(text);
        Ok(())
    }

    /// Serializes the pending text, NUL padded to the full element length.
    ///
    /// Text that is not ASCII or longer than `2 * register_count` characters
    /// is dropped.
    pub fn encode(&self) -> Option<Vec<u8>> {
        let channel = self.channel.as_ref()?;
        let Value::String(text) = channel.take_next_write_value()? else {
            return None;
        };
        let capacity = usize::from(self.length) * 2;
        if !text.is_ascii() || text.len() > capacity {
            tracing::warn!(
                "Element at {}: cannot write {:?} into {} ASCII characters",
                self.address,
                text,
                capacity
            );
            return None;
        }
        let mut bytes = text.into_bytes();
        bytes.resize(capacity, 0);
        let words = order::bytes_to_registers(&bytes);
        Some(order::write_words(&words, self.byte_order, self.word_order))
    }

    pub fn invalidate(&mut self, tolerated: u32) -> InvalidationState {
        self.invalidator
            .invalidate(self.address, tolerated, self.channel.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;

    #[test]
    fn decode_trims_trailing_nul() {
        let channel = Channel::read_only("SerialNumber", ValueType::String);
        let mut element = StringElement::new(0, 4)
            .unwrap()
            .map(Arc::clone(&channel))
            .unwrap();
        element
            .decode(Some(b"GW10K\0\0\0"))
            .unwrap();
        assert_eq!(channel.next_value(), Some(Value::String("GW10K".into())));
    }

    #[test]
    fn decode_honors_byte_order() {
        let channel = Channel::read_only("Model", ValueType::String);
        let mut element = StringElement::new(0, 2)
            .unwrap()
            .with_byte_order(ByteOrder::LittleEndian)
            .map(Arc::clone(&channel))
            .unwrap();
        element.decode(Some(b"BADC")).unwrap();
        assert_eq!(channel.next_value(), Some(Value::String("ABCD".into())));
    }

    #[test]
    fn write_round_trips_in_every_order() {
        for (byte_order, word_order) in [
            (ByteOrder::BigEndian, WordOrder::MswLsw),
            (ByteOrder::BigEndian, WordOrder::LswMsw),
            (ByteOrder::LittleEndian, WordOrder::MswLsw),
            (ByteOrder::LittleEndian, WordOrder::LswMsw),
        ] {
            let channel = Channel::read_write("Name", ValueType::String);
            let mut element = StringElement::new(10, 3)
                .unwrap()
                .with_byte_order(byte_order)
                .with_word_order(word_order)
                .map(Arc::clone(&channel))
                .unwrap();
            channel.set_next_write_value("Rack1").unwrap();
            let frame = element.encode().unwrap();
            assert_eq!(frame.len(), 6);
            element.decode(Some(&frame)).unwrap();
            assert_eq!(channel.next_value(), Some(Value::String("Rack1".into())));
        }
    }

    #[test]
    fn big_endian_write_layout() {
        let channel = Channel::read_write("Name", ValueType::String);
        let element = StringElement::new(0, 2)
            .unwrap()
            .map(Arc::clone(&channel))
            .unwrap();
        channel.set_next_write_value("ABC").unwrap();
        assert_eq!(element.encode(), Some(b"ABC\0".to_vec()));
    }

    #[test]
    fn oversized_or_non_ascii_text_is_dropped() {
        let channel = Channel::read_write("Name", ValueType::String);
        let element = StringElement::new(0, 1)
            .unwrap()
            .map(Arc::clone(&channel))
            .unwrap();
        channel.set_next_write_value("ABC").unwrap();
        assert_eq!(element.encode(), None);
        channel.set_next_write_value("Ä").unwrap();
        assert_eq!(element.encode(), None);
        assert_eq!(channel.next_write_value(), None);
    }

    #[test]
    fn rejects_zero_length_and_wrong_channel() {
        assert!(matches!(
            StringElement::new(0, 0),
            Err(BridgeError::Validation(ValidationError::RegisterCount { .. }))
        ));
        let channel = Channel::read_only("Power", ValueType::I32);
        assert!(StringElement::new(0, 2).unwrap().map(channel).is_err());
    }
}
