pub mod channel;
pub mod client;
pub mod config;
pub mod converter;
pub mod element;
pub mod error;
pub mod executor;
pub mod invalidation;
pub mod order;
pub mod task;
pub mod transport;
pub mod value;

pub use channel::{AccessMode, Channel, ChannelId};
pub use config::BridgeConfig;
pub use converter::ElementToChannelConverter;
pub use element::{
    BitConverter, BitMapping, BitsElement, CoilElement, DummyElement, ModbusElement,
    NumericElement, StringElement, WriteFrame,
};
pub use error::{BridgeError, Result, ValidationError};
pub use executor::{read_task, write_task};
pub use invalidation::{InvalidationState, Invalidator};
pub use order::{ByteOrder, WordOrder};
pub use task::{FunctionCode, Priority, Task, TaskId, TaskSet, WriteRequest};
pub use transport::Transport;
pub use value::{Value, ValueType};
