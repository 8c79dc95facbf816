use crate::error::Result;
use std::future::Future;

/// The Modbus data access operations a task needs from a connection.
///
/// Implementations own the physical link (TCP, RTU, a test double) and
/// the unit id. Connection management and retries stay on their side.
pub trait Transport {
    /// FC1
    fn read_coils(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> impl Future<Output = Result<Vec<bool>>> + Send;

    /// FC2
    fn read_discrete_inputs(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> impl Future<Output = Result<Vec<bool>>> + Send;

    /// FC3
    fn read_holding_registers(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> impl Future<Output = Result<Vec<u16>>> + Send;

    /// FC4
    fn read_input_registers(
        &mut self,
        address: u16,
        quantity: u16,
    ) -> impl Future<Output = Result<Vec<u16>>> + Send;

    /// FC5
    fn write_single_coil(
        &mut self,
        address: u16,
        value: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// FC6
    fn write_single_register(
        &mut self,
        address: u16,
        value: u16,
    ) -> impl Future<Output = Result<()>> + Send;

    /// FC15
    fn write_multiple_coils(
        &mut self,
        address: u16,
        values: &[bool],
    ) -> impl Future<Output = Result<()>> + Send;

    /// FC16
    fn write_multiple_registers(
        &mut self,
        address: u16,
        registers: &[u16],
    ) -> impl Future<Output = Result<()>> + Send;
}
