//! `Transport` over a `tokio-modbus` client context.
//!
//! Works for both TCP and RTU contexts; opening the connection is left to
//! the caller (see [`connect_tcp`] and [`open_serial`] for the usual cases).

use crate::error::{BridgeError, Result};
use crate::transport::Transport;
use std::net::SocketAddr;
use tokio_modbus::client::{Context, Reader, Writer};
use tokio_modbus::slave::Slave;
use tokio_serial::SerialPortBuilderExt;

pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Connects to a Modbus TCP server and addresses `unit` on it.
pub async fn connect_tcp(socket_addr: SocketAddr, unit: u8) -> Result<Context> {
    tracing::debug!("Connecting to {} unit {}", socket_addr, unit);
    let ctx = tokio_modbus::client::tcp::connect_slave(socket_addr, Slave(unit)).await?;
    Ok(ctx)
}

/// Opens a serial port for Modbus RTU and addresses `unit` on the bus.
pub fn open_serial(path: &str, baud_rate: u32, unit: u8) -> Result<Context> {
    tracing::debug!("Opening {} at {} baud, unit {}", path, baud_rate, unit);
    let port = tokio_serial::new(path, baud_rate)
        .open_native_async()
        .map_err(|e| BridgeError::Io(std::io::Error::other(e.to_string())))?;
    Ok(tokio_modbus::client::rtu::attach_slave(port, Slave(unit)))
}

impl Transport for Context {
    async fn read_coils(&mut self, address: u16, quantity: u16) -> Result<Vec<bool>> {
        Ok(Reader::read_coils(self, address, quantity).await?)
    }

    async fn read_discrete_inputs(&mut self, address: u16, quantity: u16) -> Result<Vec<bool>> {
        Ok(Reader::read_discrete_inputs(self, address, quantity).await?)
    }

    async fn read_holding_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>> {
        Ok(Reader::read_holding_registers(self, address, quantity).await?)
    }

    async fn read_input_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>> {
        Ok(Reader::read_input_registers(self, address, quantity).await?)
    }

    async fn write_single_coil(&mut self, address: u16, value: bool) -> Result<()> {
        Ok(Writer::write_single_coil(self, address, value).await?)
    }

    async fn write_single_register(&mut self, address: u16, value: u16) -> Result<()> {
        Ok(Writer::write_single_register(self, address, value).await?)
    }

    async fn write_multiple_coils(&mut self, address: u16, values: &[bool]) -> Result<()> {
        Ok(Writer::write_multiple_coils(self, address, values).await?)
    }

    async fn write_multiple_registers(&mut self, address: u16, registers: &[u16]) -> Result<()> {
        Ok(Writer::write_multiple_registers(self, address, registers).await?)
    }
}
