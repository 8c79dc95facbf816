use std::fmt;

/// The declared type of a channel or the wire type of a numeric element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    String,
}

impl ValueType {
    /// Number of bytes the type occupies on the wire, `None` for bool and string.
    pub const fn width(self) -> Option<usize> {
        match self {
            ValueType::I16 | ValueType::U16 => Some(2),
            ValueType::I32 | ValueType::U32 | ValueType::F32 => Some(4),
            ValueType::I64 | ValueType::U64 | ValueType::F64 => Some(8),
            ValueType::Bool | ValueType::String => None,
        }
    }

    pub const fn is_numeric(self) -> bool {
        self.width().is_some()
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            ValueType::I16
                | ValueType::I32
                | ValueType::I64
                | ValueType::F32
                | ValueType::F64
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "bool",
            ValueType::I16 => "i16",
            ValueType::U16 => "u16",
            ValueType::I32 => "i32",
            ValueType::U32 => "u32",
            ValueType::I64 => "i64",
            ValueType::U64 => "u64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::String => "string",
        };
        f.write_str(name)
    }
}

/// A typed channel value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::I16(_) => ValueType::I16,
            Value::U16(_) => ValueType::U16,
            Value::I32(_) => ValueType::I32,
            Value::U32(_) => ValueType::U32,
            Value::I64(_) => ValueType::I64,
            Value::U64(_) => ValueType::U64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
            Value::String(_) => ValueType::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of the value; signed types are sign-extended.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::I16(v) => Some(i64::from(*v)),
            Value::U16(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::U32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            Value::U64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::I16(v) => Some(f64::from(*v)),
            Value::U16(v) => Some(f64::from(*v)),
            Value::I32(v) => Some(f64::from(*v)),
            Value::U32(v) => Some(f64::from(*v)),
            Value::I64(v) => Some(*v as f64),
            Value::U64(v) => Some(*v as f64),
            Value::F32(v) => Some(f64::from(*v)),
            Value::F64(v) => Some(*v),
            Value::String(s) => s.trim().parse().ok(),
        }
    }

    /// The wire bit pattern of a numeric value, zero-extended to 64 bits.
    pub fn raw_bits(&self) -> Option<u64> {
        match self {
            Value::I16(v) => Some(u64::from(*v as u16)),
            Value::U16(v) => Some(u64::from(*v)),
            Value::I32(v) => Some(u64::from(*v as u32)),
            Value::U32(v) => Some(u64::from(*v)),
            Value::I64(v) => Some(*v as u64),
            Value::U64(v) => Some(*v),
            Value::F32(v) => Some(u64::from(v.to_bits())),
            Value::F64(v) => Some(v.to_bits()),
            Value::Bool(_) | Value::String(_) => None,
        }
    }

    /// Rebuilds a numeric value of type `value_type` from its wire bit pattern.
    ///
    /// Only the low `width * 8` bits of `bits` are used.
    pub fn from_raw_bits(bits: u64, value_type: ValueType) -> Option<Value> {
        let value = match value_type {
            ValueType::I16 => Value::I16(bits as u16 as i16),
            ValueType::U16 => Value::U16(bits as u16),
            ValueType::I32 => Value::I32(bits as u32 as i32),
            ValueType::U32 => Value::U32(bits as u32),
            ValueType::I64 => Value::I64(bits as i64),
            ValueType::U64 => Value::U64(bits),
            ValueType::F32 => Value::F32(f32::from_bits(bits as u32)),
            ValueType::F64 => Value::F64(f64::from_bits(bits)),
            ValueType::Bool | ValueType::String => return None,
        };
        Some(value)
    }

    /// Integer view without rounding; `None` for floats and strings.
    pub(crate) fn as_exact_integer(&self) -> Option<i128> {
        match self {
            Value::Bool(b) => Some(i128::from(*b)),
            Value::I16(v) => Some(i128::from(*v)),
            Value::U16(v) => Some(i128::from(*v)),
            Value::I32(v) => Some(i128::from(*v)),
            Value::U32(v) => Some(i128::from(*v)),
            Value::I64(v) => Some(i128::from(*v)),
            Value::U64(v) => Some(i128::from(*v)),
            Value::F32(_) | Value::F64(_) | Value::String(_) => None,
        }
    }

    fn as_integer(&self) -> Option<i128> {
        if let Some(v) = self.as_exact_integer() {
            return Some(v);
        }
        match self {
            Value::F32(v) => round_to_integer(f64::from(*v)),
            Value::F64(v) => round_to_integer(*v),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Converts the value to `target`.
    ///
    /// Floats are rounded when the target is an integer type. Returns `None`
    /// when the value does not fit into the target type.
    pub fn cast(&self, target: ValueType) -> Option<Value> {
        if self.value_type() == target {
            return Some(self.clone());
        }
        match target {
            ValueType::Bool => match self.as_integer()? {
                0 => Some(Value::Bool(false)),
                1 => Some(Value::Bool(true)),
                _ => None,
            },
            ValueType::I16 => i16::try_from(self.as_integer()?).ok().map(Value::I16),
            ValueType::U16 => u16::try_from(self.as_integer()?).ok().map(Value::U16),
            ValueType::I32 => i32::try_from(self.as_integer()?).ok().map(Value::I32),
            ValueType::U32 => u32::try_from(self.as_integer()?).ok().map(Value::U32),
            ValueType::I64 => i64::try_from(self.as_integer()?).ok().map(Value::I64),
            ValueType::U64 => u64::try_from(self.as_integer()?).ok().map(Value::U64),
            ValueType::F32 => self.as_f64().map(|v| Value::F32(v as f32)),
            ValueType::F64 => self.as_f64().map(Value::F64),
            ValueType::String => Some(Value::String(self.to_string())),
        }
    }
}

fn round_to_integer(v: f64) -> Option<i128> {
    // Anything beyond u64/i64 range fails the later try_from anyway.
    if v.is_finite() && v.abs() < 1e20 {
        Some(v.round() as i128)
    } else {
        None
    }
}

/// Builds the narrowest signed-or-unsigned 64-bit value that holds `v`.
pub(crate) fn integer_value(v: i128) -> Value {
    if let Ok(v) = i64::try_from(v) {
        Value::I64(v)
    } else if let Ok(v) = u64::try_from(v) {
        Value::U64(v)
    } else {
        Value::F64(v as f64)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from!(
    bool => Bool,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
