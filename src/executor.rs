//! Runs one task against a transport.

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::task::{FunctionCode, Task, WriteRequest};
use crate::transport::Transport;

/// Reads the task's span and feeds the response to its elements.
///
/// Any failure, from the transport or a malformed response, is absorbed by
/// invalidating the task's elements. Returns whether the read succeeded.
pub async fn read_task<T: Transport>(
    task: &mut Task,
    transport: &mut T,
    config: &BridgeConfig,
) -> bool {
    let id = task.id();
    let (address, quantity) = (task.start_address(), task.length());
    let result = match id.function_code {
        FunctionCode::ReadCoils => match transport.read_coils(address, quantity).await {
            Ok(coils) => task.decode_coils(&coils),
            Err(e) => Err(e),
        },
        FunctionCode::ReadDiscreteInputs => {
            match transport.read_discrete_inputs(address, quantity).await {
                Ok(coils) => task.decode_coils(&coils),
                Err(e) => Err(e),
            }
        }
        FunctionCode::ReadHoldingRegisters => {
            match transport.read_holding_registers(address, quantity).await {
                Ok(registers) => task.decode_registers(&registers),
                Err(e) => Err(e),
            }
        }
        FunctionCode::ReadInputRegisters => {
            match transport.read_input_registers(address, quantity).await {
                Ok(registers) => task.decode_registers(&registers),
                Err(e) => Err(e),
            }
        }
        fc => {
            tracing::warn!("{}: {}", id, BridgeError::NotReadable(fc));
            return false;
        }
    };

    match result {
        Ok(()) => {
            tracing::trace!("{}: read {} items", id, quantity);
            true
        }
        Err(e) => {
            tracing::warn!("{}: read failed: {}", id, e);
            task.invalidate(config);
            false
        }
    }
}

/// Sends every request the task composes this tick. Returns how many
/// requests were acknowledged.
pub async fn write_task<T: Transport>(task: &Task, transport: &mut T) -> usize {
    let id = task.id();
    let mut sent = 0;
    for request in task.encode_all() {
        let result = match &request {
            WriteRequest::SingleCoil { address, value } => {
                transport.write_single_coil(*address, *value).await
            }
            WriteRequest::SingleRegister { address, value } => {
                transport.write_single_register(*address, *value).await
            }
            WriteRequest::MultipleCoils { address, values } => {
                transport.write_multiple_coils(*address, values).await
            }
            WriteRequest::MultipleRegisters { address, registers } => {
                transport.write_multiple_registers(*address, registers).await
            }
        };
        match result {
            Ok(()) => {
                tracing::debug!("{}: wrote {:?}", id, request);
                sent += 1;
            }
            Err(e) => {
                tracing::warn!("{}: write at {} failed: {}", id, request.address(), e);
            }
        }
    }
    sent
}
