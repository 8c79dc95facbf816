//! Wire shapes and their channel bindings.

pub mod bits;
pub mod coil;
pub mod dummy;
pub mod numeric;
pub mod string;

pub use bits::{BitConverter, BitMapping, BitsElement};
pub use coil::CoilElement;
pub use dummy::DummyElement;
pub use numeric::{ChannelMapping, NumericElement};
pub use string::StringElement;

use crate::error::{Result, ValidationError};
use crate::invalidation::{DEFAULT_TOLERATED_READ_ERRORS, InvalidationState};

pub(crate) fn check_raw_length(
    address: u16,
    register_count: u16,
    raw: &[u8],
) -> std::result::Result<(), ValidationError> {
    let expected = usize::from(register_count) * 2;
    if raw.len() != expected {
        return Err(ValidationError::RawLength {
            address,
            expected,
            actual: raw.len(),
        });
    }
    Ok(())
}

/// Outbound payload of one element for one write tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteFrame {
    Coil(bool),
    Registers(Vec<u8>),
}

#[derive(Debug)]
pub enum ModbusElement {
    Coil(CoilElement),
    Register(NumericElement),
    String(StringElement),
    Bits(BitsElement),
    Dummy(DummyElement),
}

impl ModbusElement {
    pub fn address(&self) -> u16 {
        match self {
            ModbusElement::Coil(e) => e.address(),
            ModbusElement::Register(e) => e.address(),
            ModbusElement::String(e) => e.address(),
            ModbusElement::Bits(e) => e.address(),
            ModbusElement::Dummy(e) => e.address(),
        }
    }

    /// Registers covered, or 1 for a coil.
    pub fn length(&self) -> u16 {
        match self {
            ModbusElement::Coil(_) | ModbusElement::Bits(_) => 1,
            ModbusElement::Register(e) => e.register_count(),
            ModbusElement::String(e) => e.register_count(),
            ModbusElement::Dummy(e) => e.register_count(),
        }
    }

    pub fn is_coil(&self) -> bool {
        matches!(self, ModbusElement::Coil(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ModbusElement::Coil(_) => "coil",
            ModbusElement::Register(_) => "numeric",
            ModbusElement::String(_) => "string",
            ModbusElement::Bits(_) => "bits",
            ModbusElement::Dummy(_) => "dummy",
        }
    }

    /// Feeds `2 * length()` bytes of register data, or `None` when the value
    /// is known to be unavailable.
    pub fn decode_registers(&mut self, raw: Option<&[u8]>) -> Result<()> {
        match self {
            ModbusElement::Register(e) => e.decode(raw),
            ModbusElement::String(e) => e.decode(raw),
            ModbusElement::Bits(e) => e.decode(raw),
            ModbusElement::Dummy(e) => e.decode(raw),
            ModbusElement::Coil(e) => Err(ValidationError::DataKind {
                element: "coil",
                address: e.address(),
                data: "register",
            }
            .into()),
        }
    }

    pub fn decode_coil(&mut self, coil: Option<bool>) -> Result<()> {
        match self {
            ModbusElement::Coil(e) => {
                e.decode(coil);
                Ok(())
            }
            other => Err(ValidationError::DataKind {
                element: other.kind(),
                address: other.address(),
                data: "coil",
            }
            .into()),
        }
    }

    /// Takes the pending writes and composes this element's frame, if any.
    pub fn encode(&self) -> Option<WriteFrame> {
        match self {
            ModbusElement::Coil(e) => e.encode().map(WriteFrame::Coil),
            ModbusElement::Register(e) => e.encode().map(WriteFrame::Registers),
            ModbusElement::String(e) => e.encode().map(WriteFrame::Registers),
            ModbusElement::Bits(e) => e.encode().map(WriteFrame::Registers),
            ModbusElement::Dummy(_) => None,
        }
    }

    pub fn invalidate(&mut self) -> InvalidationState {
        self.invalidate_after(DEFAULT_TOLERATED_READ_ERRORS)
    }

    /// Records a failed read, clearing channels after `tolerated` misses.
    pub fn invalidate_after(&mut self, tolerated: u32) -> InvalidationState {
        match self {
            ModbusElement::Coil(e) => e.invalidate(tolerated),
            ModbusElement::Register(e) => e.invalidate(tolerated),
            ModbusElement::String(e) => e.invalidate(tolerated),
            ModbusElement::Bits(e) => e.invalidate(tolerated),
            ModbusElement::Dummy(_) => InvalidationState::Ok,
        }
    }
}

macro_rules! impl_from_element {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for ModbusElement {
                fn from(element: $ty) -> Self {
                    ModbusElement::$variant(element)
                }
            }
        )*
    };
}

impl_from_element!(
    Coil(CoilElement),
    Register(NumericElement),
    String(StringElement),
    Bits(BitsElement),
    Dummy(DummyElement),
);
