use crate::task::FunctionCode;
use crate::value::ValueType;
use thiserror::Error;

/// Setup-time contract violations.
///
/// These are raised while elements, bit mappings and tasks are assembled
/// (and when a read response does not have the shape the element expects).
/// They are never absorbed by the read/write cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("element at {address} expects {expected} bytes, got {actual}")]
    RawLength {
        address: u16,
        expected: usize,
        actual: usize,
    },
    #[error("{value_type} needs {expected} bytes, got {actual}")]
    ByteCount {
        value_type: ValueType,
        expected: usize,
        actual: usize,
    },
    #[error("invalid register count {count} for {element} element")]
    RegisterCount { element: &'static str, count: u16 },
    #[error("{0} is not a numeric register type")]
    NotNumeric(ValueType),
    #[error("bit index {0} is outside 0..=15")]
    BitIndex(i32),
    #[error("bit index {0} is already mapped")]
    DuplicateBitIndex(u8),
    #[error("channel {0} is already mapped to another bit")]
    DuplicateChannel(String),
    #[error("channel {channel} of type {actual} cannot be mapped to a {element} element")]
    ChannelType {
        channel: String,
        actual: ValueType,
        element: &'static str,
    },
    #[error("{element} element at {address} cannot decode {data} data")]
    DataKind {
        element: &'static str,
        address: u16,
        data: &'static str,
    },
    #[error("element at {0} is already mapped to a channel")]
    AlreadyMapped(u16),
    #[error("{function_code} cannot carry {element} elements")]
    ElementKind {
        function_code: FunctionCode,
        element: &'static str,
    },
    #[error("{0} task has no elements")]
    EmptyTask(FunctionCode),
    #[error("{function_code} writes exactly one element, got {count}")]
    SingleElement {
        function_code: FunctionCode,
        count: usize,
    },
    #[error("expected element at address {expected}, found {actual}")]
    AddressGap { expected: u32, actual: u16 },
    #[error("{function_code} task spans {length} items, limit is {max}")]
    TaskTooLong {
        function_code: FunctionCode,
        length: u32,
        max: u16,
    },
    #[error("task expects {expected} items, response has {actual}")]
    ResponseLength { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("channel {0} is not writable")]
    NotWritable(String),
    #[error("value {value} cannot be converted to {target}")]
    ValueType { value: String, target: ValueType },
    #[error("{0} is not a read function code")]
    NotReadable(FunctionCode),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
