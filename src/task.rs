use crate::config::BridgeConfig;
use crate::element::{ModbusElement, WriteFrame};
use crate::error::{Result, ValidationError};
use crate::invalidation::InvalidationState;
use crate::order;
use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum FunctionCode {
    ReadCoils = 0x01,
    ReadDiscreteInputs = 0x02,
    ReadHoldingRegisters = 0x03,
    ReadInputRegisters = 0x04,
    WriteSingleCoil = 0x05,
    WriteSingleRegister = 0x06,
    WriteMultipleCoils = 0x0F,
    WriteMultipleRegisters = 0x10,
}

impl FunctionCode {
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<FunctionCode> {
        match code {
            0x01 => Some(FunctionCode::ReadCoils),
            0x02 => Some(FunctionCode::ReadDiscreteInputs),
            0x03 => Some(FunctionCode::ReadHoldingRegisters),
            0x04 => Some(FunctionCode::ReadInputRegisters),
            0x05 => Some(FunctionCode::WriteSingleCoil),
            0x06 => Some(FunctionCode::WriteSingleRegister),
            0x0F => Some(FunctionCode::WriteMultipleCoils),
            0x10 => Some(FunctionCode::WriteMultipleRegisters),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_write_operation(self) -> bool {
        matches!(
            self,
            FunctionCode::WriteSingleCoil
                | FunctionCode::WriteSingleRegister
                | FunctionCode::WriteMultipleCoils
                | FunctionCode::WriteMultipleRegisters
        )
    }

    #[must_use]
    pub fn accesses_coils(self) -> bool {
        matches!(
            self,
            FunctionCode::ReadCoils
                | FunctionCode::ReadDiscreteInputs
                | FunctionCode::WriteSingleCoil
                | FunctionCode::WriteMultipleCoils
        )
    }

    #[must_use]
    pub fn is_single_write(self) -> bool {
        matches!(
            self,
            FunctionCode::WriteSingleCoil | FunctionCode::WriteSingleRegister
        )
    }

    /// Largest number of coils or registers one request may carry.
    #[must_use]
    pub fn max_quantity(self) -> u16 {
        match self {
            FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => 2000,
            FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => 125,
            FunctionCode::WriteSingleCoil | FunctionCode::WriteSingleRegister => 1,
            FunctionCode::WriteMultipleCoils => 1968,
            FunctionCode::WriteMultipleRegisters => 123,
        }
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FC{}", *self as u8)
    }
}

/// How often the scheduler runs a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Every cycle.
    High,
    /// Round-robin, one per cycle.
    Low,
    /// Only until the first successful read.
    Once,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    pub function_code: FunctionCode,
    pub start_address: u16,
    pub priority: Priority,
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} ({:?})",
            self.function_code, self.start_address, self.priority
        )
    }
}

/// A request produced by a write task for one write tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRequest {
    SingleCoil { address: u16, value: bool },
    SingleRegister { address: u16, value: u16 },
    MultipleCoils { address: u16, values: Vec<bool> },
    MultipleRegisters { address: u16, registers: Vec<u16> },
}

impl WriteRequest {
    pub fn address(&self) -> u16 {
        match self {
            WriteRequest::SingleCoil { address, .. }
            | WriteRequest::SingleRegister { address, .. }
            | WriteRequest::MultipleCoils { address, .. }
            | WriteRequest::MultipleRegisters { address, .. } => *address,
        }
    }
}

/// Contiguous elements accessed with one function code.
#[derive(Debug)]
pub struct Task {
    id: TaskId,
    length: u16,
    elements: Vec<ModbusElement>,
}

impl Task {
    pub fn new(
        function_code: FunctionCode,
        start_address: u16,
        priority: Priority,
        elements: Vec<ModbusElement>,
    ) -> Result<Self> {
        if elements.is_empty() {
            return Err(ValidationError::EmptyTask(function_code).into());
        }
        if function_code.is_single_write() && elements.len() != 1 {
            return Err(ValidationError::SingleElement {
                function_code,
                count: elements.len(),
            }
            .into());
        }

        let mut next = u32::from(start_address);
        for element in &elements {
            if element.is_coil() != function_code.accesses_coils() {
                return Err(ValidationError::ElementKind {
                    function_code,
                    element: element.kind(),
                }
                .into());
            }
            if u32::from(element.address()) != next {
                return Err(ValidationError::AddressGap {
                    expected: next,
                    actual: element.address(),
                }
                .into());
            }
            next += u32::from(element.length());
        }

        let length = next - u32::from(start_address);
        let max = function_code.max_quantity();
        if length > u32::from(max) {
            return Err(ValidationError::TaskTooLong {
                function_code,
                length,
                max,
            }
            .into());
        }

        Ok(Self {
            id: TaskId {
                function_code,
                start_address,
                priority,
            },
            length: length as u16,
            elements,
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn function_code(&self) -> FunctionCode {
        self.id.function_code
    }

    pub fn start_address(&self) -> u16 {
        self.id.start_address
    }

    pub fn priority(&self) -> Priority {
        self.id.priority
    }

    /// Registers or coils spanned by the task.
    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn elements(&self) -> &[ModbusElement] {
        &self.elements
    }

    pub fn is_write(&self) -> bool {
        self.id.function_code.is_write_operation()
    }

    /// Distributes one read response over the elements.
    pub fn decode_registers(&mut self, registers: &[u16]) -> Result<()> {
        self.check_response_length(registers.len())?;
        let bytes = order::registers_to_bytes(&registers[..usize::from(self.length)]);
        let mut offset = 0;
        for element in &mut self.elements {
            let end = offset + usize::from(element.length()) * 2;
            element.decode_registers(Some(&bytes[offset..end]))?;
            offset = end;
        }
        Ok(())
    }

    /// Coil responses may be padded up to a byte boundary.
    pub fn decode_coils(&mut self, coils: &[bool]) -> Result<()> {
        self.check_response_length(coils.len())?;
        for (element, coil) in self.elements.iter_mut().zip(coils) {
            element.decode_coil(Some(*coil))?;
        }
        Ok(())
    }

    fn check_response_length(&self, actual: usize) -> Result<()> {
        let expected = usize::from(self.length);
        if actual < expected {
            return Err(ValidationError::ResponseLength { expected, actual }.into());
        }
        Ok(())
    }

    /// Records a failed read on every element of the task.
    pub fn invalidate(&mut self, config: &BridgeConfig) -> Vec<InvalidationState> {
        self.elements
            .iter_mut()
            .map(|element| element.invalidate_after(config.invalidate_after_read_errors))
            .collect()
    }

    /// Collects this tick's requests.
    ///
    /// Multiple-write tasks merge frames of neighbouring elements into one
    /// request. An element without a frame splits the run.
    pub fn encode_all(&self) -> Vec<WriteRequest> {
        let function_code = self.id.function_code;
        if !function_code.is_write_operation() {
            return Vec::new();
        }

        let mut requests = Vec::new();
        let mut run: Option<WriteRequest> = None;
        for element in &self.elements {
            let address = element.address();
            let Some(frame) = element.encode() else {
                requests.extend(run.take());
                continue;
            };
            match (function_code, frame) {
                (FunctionCode::WriteSingleCoil, WriteFrame::Coil(value)) => {
                    requests.push(WriteRequest::SingleCoil { address, value });
                }
                (FunctionCode::WriteSingleRegister, WriteFrame::Registers(bytes)) => {
                    for (i, value) in order::bytes_to_registers(&bytes).into_iter().enumerate() {
                        requests.push(WriteRequest::SingleRegister {
                            address: address + i as u16,
                            value,
                        });
                    }
                }
                (FunctionCode::WriteMultipleCoils, WriteFrame::Coil(value)) => match &mut run {
                    Some(WriteRequest::MultipleCoils { values, .. }) => values.push(value),
                    _ => {
                        run = Some(WriteRequest::MultipleCoils {
                            address,
                            values: vec![value],
                        })
                    }
                },
                (FunctionCode::WriteMultipleRegisters, WriteFrame::Registers(bytes)) => {
                    let words = order::bytes_to_registers(&bytes);
                    match &mut run {
                        Some(WriteRequest::MultipleRegisters { registers, .. }) => {
                            registers.extend(words)
                        }
                        _ => {
                            run = Some(WriteRequest::MultipleRegisters {
                                address,
                                registers: words,
                            })
                        }
                    }
                }
                (function_code, frame) => {
                    tracing::warn!(
                        "{}: element at {} produced unexpected frame {:?}",
                        function_code,
                        address,
                        frame
                    );
                }
            }
        }
        requests.extend(run);
        requests
    }
}

/// All tasks of one device, grouped for the scheduler.
#[derive(Debug, Default)]
pub struct TaskSet {
    tasks: Vec<Task>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, task: Task) -> &mut Self {
        self.tasks.push(task);
        self
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn read_tasks(&mut self, priority: Priority) -> impl Iterator<Item = &mut Task> {
        self.tasks
            .iter_mut()
            .filter(move |task| !task.is_write() && task.priority() == priority)
    }

    pub fn write_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| task.is_write())
    }

    /// Write tasks come first, then reads ordered by priority.
    pub fn ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<_> = self.tasks.iter().map(Task::id).collect();
        ids.sort_by_key(|id| (!id.function_code.is_write_operation(), id.priority));
        ids
    }
}

impl FromIterator<Task> for TaskSet {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::element::{BitsElement, CoilElement, DummyElement, NumericElement, StringElement};
    use crate::error::BridgeError;
    use crate::value::{Value, ValueType};
    use std::sync::Arc;

    fn u16_element(address: u16, channel: &Arc<Channel>) -> ModbusElement {
        NumericElement::unsigned_word(address)
            .map(Arc::clone(channel))
            .unwrap()
            .into()
    }

    #[test]
    fn function_code_round_trip() {
        for code in [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x0F, 0x10] {
            let fc = FunctionCode::from_u8(code).unwrap();
            assert_eq!(fc as u8, code);
        }
        assert_eq!(FunctionCode::from_u8(0x2B), None);
        assert_eq!(FunctionCode::WriteMultipleRegisters.to_string(), "FC16");
    }

    #[test]
    fn decodes_contiguous_registers() {
        let voltage = Channel::read_only("Voltage", ValueType::U16);
        let energy = Channel::read_only("Energy", ValueType::U32);
        let mut task = Task::new(
            FunctionCode::ReadHoldingRegisters,
            100,
            Priority::High,
            vec![
                u16_element(100, &voltage),
                DummyElement::single(101).into(),
                NumericElement::unsigned_doubleword(102)
                    .map(Arc::clone(&energy))
                    .unwrap()
                    .into(),
            ],
        )
        .unwrap();
        assert_eq!(task.length(), 4);

        task.decode_registers(&[2305, 0xFFFF, 0x0001, 0x0002]).unwrap();
        assert_eq!(voltage.next_value(), Some(Value::U16(2305)));
        assert_eq!(energy.next_value(), Some(Value::U32(0x0001_0002)));

        assert!(matches!(
            task.decode_registers(&[1, 2]),
            Err(BridgeError::Validation(ValidationError::ResponseLength {
                expected: 4,
                actual: 2
            }))
        ));
    }

    #[test]
    fn decodes_padded_coil_response() {
        let a = Channel::read_only("A", ValueType::Bool);
        let b = Channel::read_only("B", ValueType::Bool);
        let mut task = Task::new(
            FunctionCode::ReadDiscreteInputs,
            0,
            Priority::Low,
            vec![
                CoilElement::new(0).map(Arc::clone(&a)).unwrap().into(),
                CoilElement::new(1).map(Arc::clone(&b)).unwrap().into(),
            ],
        )
        .unwrap();
        task.decode_coils(&[true, false, false, false, false, false, false, false])
            .unwrap();
        assert_eq!(a.next_value(), Some(Value::Bool(true)));
        assert_eq!(b.next_value(), Some(Value::Bool(false)));
    }

    #[test]
    fn rejects_gaps_and_wrong_kinds() {
        let c = Channel::read_only("C", ValueType::U16);
        assert!(matches!(
            Task::new(
                FunctionCode::ReadInputRegisters,
                0,
                Priority::High,
                vec![u16_element(0, &c), u16_element(2, &c)],
            ),
            Err(BridgeError::Validation(ValidationError::AddressGap {
                expected: 1,
                actual: 2
            }))
        ));
        assert!(matches!(
            Task::new(
                FunctionCode::ReadCoils,
                0,
                Priority::High,
                vec![u16_element(0, &c)],
            ),
            Err(BridgeError::Validation(ValidationError::ElementKind { .. }))
        ));
        assert!(matches!(
            Task::new(FunctionCode::ReadCoils, 0, Priority::High, Vec::new()),
            Err(BridgeError::Validation(ValidationError::EmptyTask(_)))
        ));
        assert!(matches!(
            Task::new(
                FunctionCode::WriteSingleRegister,
                0,
                Priority::High,
                vec![u16_element(0, &c), u16_element(1, &c)],
            ),
            Err(BridgeError::Validation(ValidationError::SingleElement { count: 2, .. }))
        ));
    }

    #[test]
    fn rejects_oversized_read() {
        let text = Channel::read_only("Text", ValueType::String);
        let element = StringElement::new(0, 126).unwrap().map(text).unwrap();
        assert!(matches!(
            Task::new(
                FunctionCode::ReadHoldingRegisters,
                0,
                Priority::Once,
                vec![element.into()],
            ),
            Err(BridgeError::Validation(ValidationError::TaskTooLong {
                length: 126,
                max: 125,
                ..
            }))
        ));
    }

    #[test]
    fn merges_adjacent_frames_and_splits_on_gaps() {
        let channels: Vec<_> = (0..4)
            .map(|i| Channel::read_write(format!("Setpoint{}", i), ValueType::U16))
            .collect();
        let task = Task::new(
            FunctionCode::WriteMultipleRegisters,
            10,
            Priority::High,
            channels
                .iter()
                .enumerate()
                .map(|(i, c)| u16_element(10 + i as u16, c))
                .collect(),
        )
        .unwrap();

        assert!(task.encode_all().is_empty());

        channels[0].set_next_write_value(1u16).unwrap();
        channels[1].set_next_write_value(2u16).unwrap();
        channels[3].set_next_write_value(4u16).unwrap();
        assert_eq!(
            task.encode_all(),
            vec![
                WriteRequest::MultipleRegisters {
                    address: 10,
                    registers: vec![1, 2],
                },
                WriteRequest::MultipleRegisters {
                    address: 13,
                    registers: vec![4],
                },
            ]
        );
        assert!(task.encode_all().is_empty());
    }

    #[test]
    fn merges_coils() {
        let a = Channel::read_write("A", ValueType::Bool);
        let b = Channel::read_write("B", ValueType::Bool);
        let task = Task::new(
            FunctionCode::WriteMultipleCoils,
            4,
            Priority::High,
            vec![
                CoilElement::new(4).map(Arc::clone(&a)).unwrap().into(),
                CoilElement::new(5).map(Arc::clone(&b)).unwrap().into(),
            ],
        )
        .unwrap();
        a.set_next_write_value(true).unwrap();
        b.set_next_write_value(false).unwrap();
        assert_eq!(
            task.encode_all(),
            vec![WriteRequest::MultipleCoils {
                address: 4,
                values: vec![true, false],
            }]
        );
    }

    #[test]
    fn single_register_write_from_bits() {
        let on = Channel::read_write("On", ValueType::Bool);
        let task = Task::new(
            FunctionCode::WriteSingleRegister,
            7,
            Priority::High,
            vec![BitsElement::new(7).bit(3, Arc::clone(&on)).unwrap().into()],
        )
        .unwrap();
        on.set_next_write_value(true).unwrap();
        assert_eq!(
            task.encode_all(),
            vec![WriteRequest::SingleRegister {
                address: 7,
                value: 0x0008,
            }]
        );
    }

    #[test]
    fn read_task_writes_nothing() {
        let c = Channel::read_write("C", ValueType::U16);
        let task = Task::new(
            FunctionCode::ReadHoldingRegisters,
            0,
            Priority::High,
            vec![u16_element(0, &c)],
        )
        .unwrap();
        c.set_next_write_value(5u16).unwrap();
        assert!(task.encode_all().is_empty());
        assert_eq!(c.next_write_value(), Some(Value::U16(5)));
    }

    #[test]
    fn task_invalidation_honors_config() {
        let c = Channel::read_only("C", ValueType::U16);
        let mut task = Task::new(
            FunctionCode::ReadHoldingRegisters,
            0,
            Priority::High,
            vec![u16_element(0, &c)],
        )
        .unwrap();
        task.decode_registers(&[9]).unwrap();
        let config = BridgeConfig {
            invalidate_after_read_errors: 0,
        };
        assert_eq!(task.invalidate(&config), vec![InvalidationState::Invalid]);
        assert_eq!(c.next_value(), None);
    }

    #[test]
    fn task_set_groups_by_priority_and_direction() {
        let c = Channel::read_write("C", ValueType::U16);
        let mut set: TaskSet = [
            Task::new(
                FunctionCode::ReadHoldingRegisters,
                0,
                Priority::Low,
                vec![u16_element(0, &c)],
            )
            .unwrap(),
            Task::new(
                FunctionCode::ReadHoldingRegisters,
                1,
                Priority::High,
                vec![u16_element(1, &c)],
            )
            .unwrap(),
            Task::new(
                FunctionCode::WriteSingleRegister,
                0,
                Priority::High,
                vec![u16_element(0, &c)],
            )
            .unwrap(),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 3);
        assert_eq!(set.write_tasks().count(), 1);
        let high: Vec<_> = set
            .read_tasks(Priority::High)
            .map(|t| t.start_address())
            .collect();
        assert_eq!(high, vec![1]);
        let ids = set.ids();
        assert_eq!(ids[0].function_code, FunctionCode::WriteSingleRegister);
        assert_eq!(ids[1].priority, Priority::High);
        assert_eq!(ids[2].priority, Priority::Low);
    }
}
