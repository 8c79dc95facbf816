use super::check_raw_length;
use crate::error::{Result, ValidationError};

/// Registers that are read to keep a task contiguous but carry nothing.
#[derive(Debug)]
pub struct DummyElement {
    address: u16,
    length: u16,
}

impl DummyElement {
    /// Covers `start..=end`.
    pub fn new(start: u16, end: u16) -> Result<Self> {
        if end < start {
            return Err(ValidationError::RegisterCount {
                element: "dummy",
                count: 0,
            }
            .into());
        }
        Ok(Self {
            address: start,
            length: end - start + 1,
        })
    }

    pub fn single(address: u16) -> Self {
        Self { address, length: 1 }
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn register_count(&self) -> u16 {
        self.length
    }

    pub fn decode(&self, raw: Option<&[u8]>) -> Result<()> {
        if let Some(raw) = raw {
            check_raw_length(self.address, self.length, raw)?;
        }
        Ok(())
    }
}
