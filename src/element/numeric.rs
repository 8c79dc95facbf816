use super::check_raw_length;
use crate::channel::Channel;
use crate::converter::ElementToChannelConverter;
use crate::error::{Result, ValidationError};
use crate::invalidation::{InvalidationState, Invalidator};
use crate::order::{self, ByteOrder, WordOrder};
use crate::value::ValueType;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ChannelMapping {
    pub channel: Arc<Channel>,
    pub converter: ElementToChannelConverter,
}

/// A one, two or four register integer or floating point value.
#[derive(Debug)]
pub struct NumericElement {
    address: u16,
    value_type: ValueType,
    byte_order: ByteOrder,
    word_order: WordOrder,
    mapping: Option<ChannelMapping>,
    invalidator: Invalidator,
}

impl NumericElement {
    pub fn new(address: u16, value_type: ValueType) -> Result<Self> {
        if !value_type.is_numeric() {
            return Err(ValidationError::NotNumeric(value_type).into());
        }
        Ok(Self::of(address, value_type))
    }

    fn of(address: u16, value_type: ValueType) -> Self {
        Self {
            address,
            value_type,
            byte_order: ByteOrder::default(),
            word_order: WordOrder::default(),
            mapping: None,
            invalidator: Invalidator::default(),
        }
    }

    pub fn unsigned_word(address: u16) -> Self {
        Self::of(address, ValueType::U16)
    }

    pub fn signed_word(address: u16) -> Self {
        Self::of(address, ValueType::I16)
    }

    pub fn unsigned_doubleword(address: u16) -> Self {
        Self::of(address, ValueType::U32)
    }

    pub fn signed_doubleword(address: u16) -> Self {
        Self::of(address, ValueType::I32)
    }

    pub fn float_doubleword(address: u16) -> Self {
        Self::of(address, ValueType::F32)
    }

    pub fn unsigned_quadrupleword(address: u16) -> Self {
        Self::of(address, ValueType::U64)
    }

    pub fn signed_quadrupleword(address: u16) -> Self {
        Self::of(address, ValueType::I64)
    }

    pub fn float_quadrupleword(address: u16) -> Self {
        Self::of(address, ValueType::F64)
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Only meaningful for doublewords and quadruplewords.
    pub fn with_word_order(mut self, word_order: WordOrder) -> Self {
        self.word_order = word_order;
        self
    }

    pub fn map(self, channel: Arc<Channel>) -> Result<Self> {
        self.map_with(channel, ElementToChannelConverter::Direct)
    }

    pub fn map_with(
        mut self,
        channel: Arc<Channel>,
        converter: ElementToChannelConverter,
    ) -> Result<Self> {
        if self.mapping.is_some() {
            return Err(ValidationError::AlreadyMapped(self.address).into());
        }
        if channel.value_type() == ValueType::String {
            return Err(ValidationError::ChannelType {
                channel: channel.id().to_string(),
                actual: channel.value_type(),
                element: "numeric",
            }
            .into());
        }
        self.mapping = Some(ChannelMapping { channel, converter });
        Ok(self)
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn register_count(&self) -> u16 {
        self.value_type.width().map_or(1, |w| (w / 2) as u16)
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn word_order(&self) -> WordOrder {
        self.word_order
    }

    pub fn mapping(&self) -> Option<&ChannelMapping> {
        self.mapping.as_ref()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.invalidator.consecutive_failures()
    }

    /// Decodes `raw` (`2 * register_count` bytes) into the mapped channel.
    ///
    /// `None` marks the value as unknown without counting as a failure.
    pub fn decode(&mut self, raw: Option<&[u8]>) -> Result<()> {
        if let Some(raw) = raw {
            check_raw_length(self.address, self.register_count(), raw)?;
        }
        self.invalidator.reset();
        let Some(mapping) = &self.mapping else {
            return Ok(());
        };
        let next = match raw {
            None => None,
            Some(raw) => {
                let value =
                    order::from_bytes(raw, self.value_type, self.byte_order, self.word_order)?;
                let converted = mapping
                    .converter
                    .element_to_channel(value.clone(), mapping.channel.value_type());
                match (&converted, mapping.converter) {
                    (Some(_), _) => {}
                    (None, ElementToChannelConverter::NoneIf(_)) => tracing::debug!(
                        "Element at {}: {} marks {} as not available",
                        self.address,
                        value,
                        mapping.channel.id()
                    ),
                    (None, _) => tracing::warn!(
                        "Element at {}: {} does not fit {} ({})",
                        self.address,
                        value,
                        mapping.channel.id(),
                        mapping.channel.value_type()
                    ),
                }
                converted
            }
        };
        mapping.channel.set_next_value(next);
        Ok(())
    }

    /// Takes the mapped channel's pending write and serializes it.
    ///
    /// A pending value that cannot be represented by this element is dropped.
    pub fn encode(&self) -> Option<Vec<u8>> {
        let mapping = self.mapping.as_ref()?;
        let value = mapping.channel.take_next_write_value()?;
        let Some(element_value) = mapping
            .converter
            .channel_to_element(value.clone(), self.value_type)
        else {
            tracing::warn!(
                "Element at {}: cannot write {} from {} as {}",
                self.address,
                value,
                mapping.channel.id(),
                self.value_type
            );
            return None;
        };
        match order::to_bytes(&element_value, self.byte_order, self.word_order) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!("Element at {}: {}", self.address, e);
                None
            }
        }
    }

    pub fn invalidate(&mut self, tolerated: u32) -> InvalidationState {
        let channels = self.mapping.iter().map(|m| &m.channel);
        self.invalidator.invalidate(self.address, tolerated, channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::value::Value;

    const ORDERS: [(ByteOrder, WordOrder); 4] = [
        (ByteOrder::BigEndian, WordOrder::MswLsw),
        (ByteOrder::BigEndian, WordOrder::LswMsw),
        (ByteOrder::LittleEndian, WordOrder::MswLsw),
        (ByteOrder::LittleEndian, WordOrder::LswMsw),
    ];

    fn round_trip(make: fn(u16) -> NumericElement, values: &[Value]) {
        for (byte_order, word_order) in ORDERS {
            for value in values {
                let channel = Channel::read_write("Test", value.value_type());
                let mut element = make(100)
                    .with_byte_order(byte_order)
                    .with_word_order(word_order)
                    .map(Arc::clone(&channel))
                    .unwrap();

                channel.set_next_write_value(value.clone()).unwrap();
                let frame = element.encode().unwrap();
                assert_eq!(frame.len(), element.register_count() as usize * 2);
                assert_eq!(channel.next_write_value(), None);

                element.decode(Some(&frame)).unwrap();
                assert_eq!(channel.next_value().as_ref(), Some(value));
            }
        }
    }

    #[test]
    fn round_trip_every_variant_and_order() {
        round_trip(
            NumericElement::unsigned_word,
            &[Value::U16(0), Value::U16(0xABCD), Value::U16(u16::MAX)],
        );
        round_trip(
            NumericElement::signed_word,
            &[Value::I16(i16::MIN), Value::I16(-1), Value::I16(i16::MAX)],
        );
        round_trip(
            NumericElement::unsigned_doubleword,
            &[Value::U32(0), Value::U32(0x1234_5678), Value::U32(u32::MAX)],
        );
        round_trip(
            NumericElement::signed_doubleword,
            &[Value::I32(i32::MIN), Value::I32(-42), Value::I32(i32::MAX)],
        );
        round_trip(
            NumericElement::float_doubleword,
            &[Value::F32(-1234.56), Value::F32(f32::MIN), Value::F32(f32::MAX)],
        );
        round_trip(
            NumericElement::unsigned_quadrupleword,
            &[Value::U64(0), Value::U64(u64::MAX)],
        );
        round_trip(
            NumericElement::signed_quadrupleword,
            &[Value::I64(i64::MIN), Value::I64(-7), Value::I64(i64::MAX)],
        );
        round_trip(
            NumericElement::float_quadrupleword,
            &[Value::F64(-1.0e-300), Value::F64(f64::MAX)],
        );
    }

    #[test]
    fn decodes_float_reference_vector() {
        let channel = Channel::read_only("Energy", ValueType::F32);
        let mut element = NumericElement::float_doubleword(0)
            .map(Arc::clone(&channel))
            .unwrap();
        element.decode(Some(&[0x44, 0x9A, 0x51, 0xEC])).unwrap();
        let Some(Value::F32(v)) = channel.next_value() else {
            panic!("Wrong type");
        };
        assert!((v - 1234.56).abs() < 0.001);
    }

    #[test]
    fn decodes_word_in_both_byte_orders() {
        let channel = Channel::read_only("Word", ValueType::U16);
        let mut be = NumericElement::unsigned_word(0)
            .map(Arc::clone(&channel))
            .unwrap();
        be.decode(Some(&[0xAB, 0xCD])).unwrap();
        assert_eq!(channel.next_value(), Some(Value::U16(0xABCD)));

        let mut le = NumericElement::unsigned_word(0)
            .with_byte_order(ByteOrder::LittleEndian)
            .map(Arc::clone(&channel))
            .unwrap();
        le.decode(Some(&[0xAB, 0xCD])).unwrap();
        assert_eq!(channel.next_value(), Some(Value::U16(0xCDAB)));
    }

    #[test]
    fn signed_doubleword_sign_extends_into_wide_channel() {
        let channel = Channel::read_only("Power", ValueType::I64);
        let mut element = NumericElement::signed_doubleword(0)
            .map(Arc::clone(&channel))
            .unwrap();
        element.decode(Some(&[0xAB, 0xCD, 0x12, 0x34])).unwrap();
        assert_eq!(
            channel.next_value(),
            Some(Value::I64(0xFFFF_FFFF_ABCD_1234_u64 as i64))
        );
    }

    #[test]
    fn absent_input_clears_without_error() {
        let channel = Channel::read_only("Power", ValueType::I16);
        let mut element = NumericElement::signed_word(0)
            .map(Arc::clone(&channel))
            .unwrap();
        element.decode(Some(&[0x00, 0x05])).unwrap();
        assert_eq!(channel.next_value(), Some(Value::I16(5)));
        element.decode(None).unwrap();
        assert_eq!(channel.next_value(), None);
    }

    #[test]
    fn wrong_raw_length_is_a_validation_error() {
        let mut element = NumericElement::unsigned_doubleword(7);
        let err = element.decode(Some(&[0x00, 0x01])).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Validation(ValidationError::RawLength {
                address: 7,
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn no_pending_write_means_no_frame() {
        let channel = Channel::read_write("Setpoint", ValueType::I32);
        let element = NumericElement::signed_doubleword(0)
            .map(Arc::clone(&channel))
            .unwrap();
        assert_eq!(element.encode(), None);
    }

    #[test]
    fn converter_applies_on_both_paths() {
        let channel = Channel::read_write("Voltage", ValueType::F64);
        let mut element = NumericElement::unsigned_word(0)
            .map_with(
                Arc::clone(&channel),
                ElementToChannelConverter::ScaleFactor(-1),
            )
            .unwrap();

        element.decode(Some(&[0x09, 0x01])).unwrap();
        assert_eq!(channel.next_value(), Some(Value::F64(230.5)));

        channel.set_next_write_value(231.2).unwrap();
        assert_eq!(element.encode(), Some(vec![0x09, 0x08]));
    }

    #[test]
    fn unrepresentable_write_is_dropped() {
        let channel = Channel::read_write("Setpoint", ValueType::I32);
        let element = NumericElement::unsigned_word(0)
            .map(Arc::clone(&channel))
            .unwrap();
        channel.set_next_write_value(-5).unwrap();
        assert_eq!(element.encode(), None);
        assert_eq!(channel.next_write_value(), None);
    }

    #[test]
    fn rejects_string_channel_and_double_mapping() {
        let text = Channel::read_only("Serial", ValueType::String);
        assert!(NumericElement::unsigned_word(0).map(text).is_err());

        let a = Channel::read_only("A", ValueType::U16);
        let b = Channel::read_only("B", ValueType::U16);
        let err = NumericElement::unsigned_word(3)
            .map(a)
            .unwrap()
            .map(b)
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Validation(ValidationError::AlreadyMapped(3))
        ));
    }

    #[test]
    fn rejects_non_numeric_wire_type() {
        assert!(NumericElement::new(0, ValueType::Bool).is_err());
        assert_eq!(
            NumericElement::new(0, ValueType::F64).unwrap().register_count(),
            4
        );
    }

    #[test]
    fn invalidation_sequence() {
        let channel = Channel::read_only("Soc", ValueType::U16);
        let mut element = NumericElement::unsigned_word(0)
            .map(Arc::clone(&channel))
            .unwrap();

        element.decode(Some(&[0x00, 0x50])).unwrap();
        assert_eq!(
            element.invalidate(1),
            InvalidationState::PendingInvalidate { failures: 1 }
        );
        assert_eq!(channel.next_value(), Some(Value::U16(80)));

        assert_eq!(element.invalidate(1), InvalidationState::Invalid);
        assert_eq!(channel.next_value(), None);

        element.decode(Some(&[0x00, 0x51])).unwrap();
        assert_eq!(channel.next_value(), Some(Value::U16(81)));
        assert_eq!(element.consecutive_failures(), 0);
    }
}
