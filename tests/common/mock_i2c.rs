//! Mock I2C bus for testing the register framework and drivers
//!
//! Targets come in three flavours:
//! - byte memory: the first written byte is a register pointer and data bytes
//!   auto-increment through consecutive addresses (BQ25756)
//! - word memory: the pointer selects a register holding several bytes, so
//!   pointer 0x03 does not overlap pointer 0x02 (MCP9808)
//! - port: every written byte sets an 8-bit port that reads back unchanged
//!   (PCF8574)

use embedded_hal::i2c::{self, ErrorKind, ErrorType, NoAcknowledgeSource, SevenBitAddress};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Records bus transfers performed on the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Bytes read from a target
    Read {
        /// Target address
        address: u8,
        /// Bytes returned
        data: Vec<u8>,
    },
    /// Bytes written to a target
    Write {
        /// Target address
        address: u8,
        /// Bytes written, register pointer included
        data: Vec<u8>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    ByteMemory,
    WordMemory(u16),
    Port,
}

#[derive(Debug)]
struct Target {
    kind: Kind,
    memory: HashMap<u16, u8>,
    pointer: u8,
    port: u8,
    /// memory cell -> (forced high, forced low)
    stuck: HashMap<u16, (u8, u8)>,
}

impl Target {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            memory: HashMap::new(),
            pointer: 0,
            port: 0,
            stuck: HashMap::new(),
        }
    }

    /// Memory cell holding byte `index` of `register`
    fn cell(&self, register: u8, index: usize) -> u16 {
        match self.kind {
            Kind::WordMemory(width) => u16::from(register) * width + index as u16,
            _ => u16::from(register.wrapping_add(index as u8)),
        }
    }

    /// Number of cells per register
    fn stride(&self) -> usize {
        match self.kind {
            Kind::WordMemory(width) => usize::from(width),
            _ => 1,
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        if self.kind == Kind::Port {
            if let Some(&last) = bytes.last() {
                self.port = last;
            }
            return;
        }

        let Some((&pointer, data)) = bytes.split_first() else {
            return;
        };
        self.pointer = pointer;
        for (index, &byte) in data.iter().enumerate() {
            let cell = self.cell(pointer, index);
            let (high, low) = self.stuck.get(&cell).copied().unwrap_or((0, 0));
            self.memory.insert(cell, (byte | high) & !low);
        }
    }

    fn read(&mut self, buf: &mut [u8]) {
        if self.kind == Kind::Port {
            // Stuck bits model pins held by external circuitry
            let (high, low) = self.stuck.get(&0).copied().unwrap_or((0, 0));
            buf.fill((self.port | high) & !low);
            return;
        }

        for (index, byte) in buf.iter_mut().enumerate() {
            let cell = self.cell(self.pointer, index);
            *byte = self.memory.get(&cell).copied().unwrap_or(0);
        }
    }
}

/// Shared state for the mock bus (uses interior mutability)
#[derive(Debug, Default)]
struct MockState {
    targets: HashMap<u8, Target>,

    /// Operations log for verification
    operations: Vec<Operation>,

    /// Failure injection flags
    fail_next_read: bool,
    fail_next_write: bool,
}

/// Mock I2C bus
///
/// Clones share state, so a test keeps one clone to inspect the bus while the
/// driver owns another.
#[derive(Clone, Default)]
pub struct MockI2c {
    state: Rc<RefCell<MockState>>,
}

impl MockI2c {
    /// Create an empty bus; addresses without a target NACK
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a byte-addressed memory target
    pub fn add_memory_target(&self, address: u8) {
        self.add_target(address, Kind::ByteMemory);
    }

    /// Add a memory target whose registers each hold `width` bytes
    #[allow(dead_code)]
    pub fn add_word_target(&self, address: u8, width: u16) {
        self.add_target(address, Kind::WordMemory(width));
    }

    /// Add a port target (I/O expander)
    #[allow(dead_code)]
    pub fn add_port_target(&self, address: u8) {
        self.add_target(address, Kind::Port);
    }

    fn add_target(&self, address: u8, kind: Kind) {
        self.state
            .borrow_mut()
            .targets
            .insert(address, Target::new(kind));
    }

    /// Preload the first byte of a register
    #[allow(dead_code)]
    pub fn set_byte(&self, address: u8, register: u8, value: u8) {
        self.set_bytes(address, register, &[value]);
    }

    /// Preload the bytes of a register, in bus order
    ///
    /// On byte-addressed targets the bytes spill into the following registers.
    #[allow(dead_code)]
    pub fn set_bytes(&self, address: u8, register: u8, values: &[u8]) {
        if let Some(target) = self.state.borrow_mut().targets.get_mut(&address) {
            for (index, &value) in values.iter().enumerate() {
                let cell = target.cell(register, index);
                target.memory.insert(cell, value);
            }
        }
    }

    /// First byte of a register, read without logging
    #[allow(dead_code)]
    pub fn byte(&self, address: u8, register: u8) -> u8 {
        self.bytes(address, register, 1)[0]
    }

    /// `len` bytes of a register in bus order, read without logging
    #[allow(dead_code)]
    pub fn bytes(&self, address: u8, register: u8, len: usize) -> Vec<u8> {
        let state = self.state.borrow();
        let Some(target) = state.targets.get(&address) else {
            return vec![0; len];
        };
        (0..len)
            .map(|index| {
                let cell = target.cell(register, index);
                target.memory.get(&cell).copied().unwrap_or(0)
            })
            .collect()
    }

    /// Force bits of every byte of a register high or low regardless of what is written
    ///
    /// On a port target use register 0; the bits then apply to what is read.
    #[allow(dead_code)]
    pub fn stick_bits(&self, address: u8, register: u8, high: u8, low: u8) {
        if let Some(target) = self.state.borrow_mut().targets.get_mut(&address) {
            for index in 0..target.stride() {
                let cell = target.cell(register, index);
                target.stuck.insert(cell, (high, low));
            }
        }
    }

    /// Current port value of a port target
    #[allow(dead_code)]
    pub fn port(&self, address: u8) -> u8 {
        self.state
            .borrow()
            .targets
            .get(&address)
            .map_or(0, |target| target.port)
    }

    /// Inject a failure on the next read transfer
    #[allow(dead_code)]
    pub fn fail_next_read(&self) {
        self.state.borrow_mut().fail_next_read = true;
    }

    /// Inject a failure on the next write transfer
    #[allow(dead_code)]
    pub fn fail_next_write(&self) {
        self.state.borrow_mut().fail_next_write = true;
    }

    /// Get the operations log
    pub fn operations(&self) -> Vec<Operation> {
        self.state.borrow().operations.clone()
    }

    /// Clear the operations log
    pub fn clear_operations(&self) {
        self.state.borrow_mut().operations.clear();
    }

    /// Number of logged transfers
    #[allow(dead_code)]
    pub fn operation_count(&self) -> usize {
        self.state.borrow().operations.len()
    }

    /// Every write to `address`, in order
    #[allow(dead_code)]
    pub fn writes_to(&self, address: u8) -> Vec<Vec<u8>> {
        self.state
            .borrow()
            .operations
            .iter()
            .filter_map(|op| match op {
                Operation::Write { address: a, data } if *a == address => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// Writes to `address` that carry data, i.e. not just a register pointer
    #[allow(dead_code)]
    pub fn data_writes_to(&self, address: u8) -> Vec<Vec<u8>> {
        self.writes_to(address)
            .into_iter()
            .filter(|data| data.len() > 1)
            .collect()
    }
}

/// Mock error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    /// Simulated communication error
    Communication,
    /// No target at the address
    NoAcknowledge,
}

impl i2c::Error for MockError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Communication => ErrorKind::Other,
            Self::NoAcknowledge => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
        }
    }
}

impl ErrorType for MockI2c {
    type Error = MockError;
}

impl MockState {
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), MockError> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(MockError::Communication);
        }
        let target = self
            .targets
            .get_mut(&address)
            .ok_or(MockError::NoAcknowledge)?;
        target.write(bytes);
        self.operations.push(Operation::Write {
            address,
            data: bytes.to_vec(),
        });
        Ok(())
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), MockError> {
        if self.fail_next_read {
            self.fail_next_read = false;
            return Err(MockError::Communication);
        }
        let target = self
            .targets
            .get_mut(&address)
            .ok_or(MockError::NoAcknowledge)?;
        target.read(buf);
        self.operations.push(Operation::Read {
            address,
            data: buf.to_vec(),
        });
        Ok(())
    }
}

impl i2c::I2c<SevenBitAddress> for MockI2c {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();

        // Adjacent writes are one bus write: no restart between them
        let mut pending: Vec<u8> = Vec::new();
        for operation in operations {
            match operation {
                i2c::Operation::Write(bytes) => pending.extend_from_slice(bytes),
                i2c::Operation::Read(buf) => {
                    if !pending.is_empty() {
                        state.write(address, &pending)?;
                        pending.clear();
                    }
                    state.read(address, buf)?;
                }
            }
        }
        if !pending.is_empty() {
            state.write(address, &pending)?;
        }

        Ok(())
    }
}
