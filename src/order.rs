//! Byte and word ordering for multi-byte register values.
//!
//! A register is two bytes on the wire. [`ByteOrder`] decides which of the
//! two holds the high byte of the 16-bit word, [`WordOrder`] decides whether
//! the first register of a multi-register value holds the most or the least
//! significant word. The two axes are independent.

use crate::error::ValidationError;
use crate::value::{Value, ValueType};
use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WordOrder {
    /// Most significant word in the first register.
    #[default]
    MswLsw,
    /// Least significant word in the first register.
    LswMsw,
}

/// Reads the 16-bit words of `bytes`, returned most significant word first.
///
/// `bytes` must have an even length; a trailing odd byte is ignored.
pub fn read_words(bytes: &[u8], byte_order: ByteOrder, word_order: WordOrder) -> Vec<u16> {
    let mut words: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|register| match byte_order {
            ByteOrder::BigEndian => BigEndian::read_u16(register),
            ByteOrder::LittleEndian => LittleEndian::read_u16(register),
        })
        .collect();
    if word_order == WordOrder::LswMsw {
        words.reverse();
    }
    words
}

/// Lays out `words` (most significant first) as register bytes.
pub fn write_words(words: &[u16], byte_order: ByteOrder, word_order: WordOrder) -> Vec<u8> {
    let mut data = vec![0u8; words.len() * 2];
    let ordered: Box<dyn Iterator<Item = &u16>> = match word_order {
        WordOrder::MswLsw => Box::new(words.iter()),
        WordOrder::LswMsw => Box::new(words.iter().rev()),
    };
    for (register, word) in data.chunks_exact_mut(2).zip(ordered) {
        match byte_order {
            ByteOrder::BigEndian => BigEndian::write_u16(register, *word),
            ByteOrder::LittleEndian => LittleEndian::write_u16(register, *word),
        }
    }
    data
}

/// Serializes a numeric value into `width(value_type)` register bytes.
pub fn to_bytes(
    value: &Value,
    byte_order: ByteOrder,
    word_order: WordOrder,
) -> Result<Vec<u8>, ValidationError> {
    let value_type = value.value_type();
    let (Some(width), Some(bits)) = (value_type.width(), value.raw_bits()) else {
        return Err(ValidationError::NotNumeric(value_type));
    };
    let count = width / 2;
    let words: Vec<u16> = (0..count)
        .map(|i| (bits >> (16 * (count - 1 - i))) as u16)
        .collect();
    Ok(write_words(&words, byte_order, word_order))
}

/// Decodes register bytes into a value of `value_type`.
///
/// Signed types keep their sign; use [`Value::as_i64`] for the
/// sign-extended 64-bit view.
pub fn from_bytes(
    bytes: &[u8],
    value_type: ValueType,
    byte_order: ByteOrder,
    word_order: WordOrder,
) -> Result<Value, ValidationError> {
    let width = value_type
        .width()
        .ok_or(ValidationError::NotNumeric(value_type))?;
    if bytes.len() != width {
        return Err(ValidationError::ByteCount {
            value_type,
            expected: width,
            actual: bytes.len(),
        });
    }
    let bits = read_words(bytes, byte_order, word_order)
        .into_iter()
        .fold(0u64, |acc, word| (acc << 16) | u64::from(word));
    Value::from_raw_bits(bits, value_type).ok_or(ValidationError::NotNumeric(value_type))
}

/// Flattens register values as transferred on the wire (high byte first).
pub fn registers_to_bytes(registers: &[u16]) -> Vec<u8> {
    let mut data = vec![0u8; registers.len() * 2];
    BigEndian::write_u16_into(registers, &mut data);
    data
}

/// Inverse of [`registers_to_bytes`].
pub fn bytes_to_registers(bytes: &[u8]) -> Vec<u16> {
    bytes.chunks_exact(2).map(BigEndian::read_u16).collect()
}
