use modbus_bridge::{ByteOrder, Value, ValueType, WordOrder};

/// Register or unit address, decimal or `0x` hex.
pub fn parse_address(s: &str) -> Result<u16, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse()
            .map_err(|e: std::num::ParseIntError| e.to_string())
    }
}

pub fn parse_unit(s: &str) -> Result<u8, String> {
    let address = parse_address(s)?;
    u8::try_from(address).map_err(|_| format!("unit id {} out of range", address))
}

/// What to decode the registers as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Numeric(ValueType),
    /// Number of registers.
    String(u16),
}

pub fn parse_element_type(s: &str) -> Result<ElementType, String> {
    let s = s.trim().to_ascii_lowercase();
    if let Some(length) = s.strip_prefix("string:") {
        let length: u16 = length
            .parse()
            .map_err(|e: std::num::ParseIntError| e.to_string())?;
        if length == 0 {
            return Err("string length must be at least one register".into());
        }
        return Ok(ElementType::String(length));
    }
    let value_type = match s.as_str() {
        "u16" => ValueType::U16,
        "i16" => ValueType::I16,
        "u32" => ValueType::U32,
        "i32" => ValueType::I32,
        "f32" => ValueType::F32,
        "u64" => ValueType::U64,
        "i64" => ValueType::I64,
        "f64" => ValueType::F64,
        other => return Err(format!("unknown type '{}'", other)),
    };
    Ok(ElementType::Numeric(value_type))
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ByteOrderArg {
    Big,
    Little,
}

impl From<ByteOrderArg> for ByteOrder {
    fn from(arg: ByteOrderArg) -> Self {
        match arg {
            ByteOrderArg::Big => ByteOrder::BigEndian,
            ByteOrderArg::Little => ByteOrder::LittleEndian,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum WordOrderArg {
    Msw,
    Lsw,
}

impl From<WordOrderArg> for WordOrder {
    fn from(arg: WordOrderArg) -> Self {
        match arg {
            WordOrderArg::Msw => WordOrder::MswLsw,
            WordOrderArg::Lsw => WordOrder::LswMsw,
        }
    }
}

pub fn print_value(address: u16, value: Option<&Value>) {
    match value {
        Some(Value::String(s)) => println!("{}: {:?}", address, s),
        Some(v) => println!("{}: {}", address, v),
        None => println!("{}: <unknown>", address),
    }
}
