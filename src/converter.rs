use crate::value::{Value, ValueType, integer_value};

/// Converts between the value on the wire and the value in the channel.
///
/// `ScaleFactor(n)` means `channel = element * 10^n`, so a register holding
/// decivolts is mapped to volts with `ScaleFactor(-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElementToChannelConverter {
    #[default]
    Direct,
    ScaleFactor(i8),
    /// Arithmetic negation, e.g. for devices that count discharge as negative.
    Invert,
    ScaleFactorAndInvert(i8),
    /// A raw bit pattern the device uses for "not available" (typically
    /// `0x8000` or `0xFFFF`). Matching values decode as unknown.
    NoneIf(u64),
}

impl ElementToChannelConverter {
    /// `Invert` when `invert` is set, `Direct` otherwise. Lets a device
    /// setting such as "meter installed reversed" pick the converter.
    pub const fn invert_if(invert: bool) -> Self {
        if invert { Self::Invert } else { Self::Direct }
    }

    pub const fn scale_factor_and_invert_if(exponent: i8, invert: bool) -> Self {
        match (exponent, invert) {
            (0, invert) => Self::invert_if(invert),
            (n, true) => Self::ScaleFactorAndInvert(n),
            (n, false) => Self::ScaleFactor(n),
        }
    }

    pub fn element_to_channel(&self, value: Value, target: ValueType) -> Option<Value> {
        let converted = match *self {
            Self::Direct => value,
            Self::ScaleFactor(n) => scale(&value, n)?,
            Self::Invert => invert(&value)?,
            Self::ScaleFactorAndInvert(n) => invert(&scale(&value, n)?)?,
            Self::NoneIf(raw) => {
                if value.raw_bits() == Some(raw) {
                    return None;
                }
                value
            }
        };
        converted.cast(target)
    }

    pub fn channel_to_element(&self, value: Value, target: ValueType) -> Option<Value> {
        let converted = match *self {
            Self::Direct | Self::NoneIf(_) => value,
            Self::ScaleFactor(n) => scale(&value, n.checked_neg()?)?,
            Self::Invert => invert(&value)?,
            Self::ScaleFactorAndInvert(n) => scale(&invert(&value)?, n.checked_neg()?)?,
        };
        converted.cast(target)
    }
}

fn scale(value: &Value, exponent: i8) -> Option<Value> {
    if exponent == 0 {
        return Some(value.clone());
    }
    let magnitude = u32::from(exponent.unsigned_abs());
    if exponent > 0 {
        if let Some(v) = value.as_exact_integer() {
            return Some(integer_value(v.checked_mul(10i128.checked_pow(magnitude)?)?));
        }
    }
    let v = value.as_f64()?;
    let factor = 10f64.powi(magnitude as i32);
    Some(Value::F64(if exponent > 0 { v * factor } else { v / factor }))
}

fn invert(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(!b)),
        Value::F32(v) => Some(Value::F32(-v)),
        Value::F64(v) => Some(Value::F64(-v)),
        other => Some(integer_value(-other.as_exact_integer()?)),
    }
}
