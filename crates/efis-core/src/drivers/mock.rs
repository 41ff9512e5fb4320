//! Scripted I2C bus for driver tests.

use std::collections::{HashMap, VecDeque};
use std::vec::Vec;

use crate::bus::{BusError, I2cBus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Write(u8, Vec<u8>),
    Read(u8, usize),
    WriteRead(u8, Vec<u8>, usize),
}

/// Devices are 256-byte register files. Register writes land in the file;
/// queued responses take precedence over the file for reads.
#[derive(Default)]
pub struct MockBus {
    ops: Vec<Op>,
    regs: HashMap<u8, [u8; 256]>,
    queued: HashMap<u8, VecDeque<Vec<u8>>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, addr: u8) {
        self.regs.entry(addr).or_insert([0; 256]);
    }

    pub fn set_regs(&mut self, addr: u8, start: u8, bytes: &[u8]) {
        let file = self.regs.entry(addr).or_insert([0; 256]);
        for (i, b) in bytes.iter().enumerate() {
            file[start as usize + i] = *b;
        }
    }

    pub fn queue(&mut self, addr: u8, bytes: &[u8]) {
        self.queued.entry(addr).or_default().push_back(bytes.to_vec());
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.clone()
    }

    fn fill(&mut self, addr: u8, start: Option<u8>, buf: &mut [u8]) -> Result<(), BusError> {
        let file = self.regs.get(&addr).ok_or(BusError::Nack)?;
        if let Some(bytes) = self.queued.get_mut(&addr).and_then(|q| q.pop_front()) {
            let n = bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&bytes[..n]);
            return Ok(());
        }
        let start = start.unwrap_or(0) as usize;
        for (i, b) in buf.iter_mut().enumerate() {
            *b = file[(start + i) & 0xFF];
        }
        Ok(())
    }
}

impl I2cBus for MockBus {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.ops.push(Op::Write(addr, bytes.to_vec()));
        let file = self.regs.get_mut(&addr).ok_or(BusError::Nack)?;
        if let [reg, values @ ..] = bytes {
            for (i, v) in values.iter().enumerate() {
                file[(*reg as usize + i) & 0xFF] = *v;
            }
        }
        Ok(())
    }

    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), BusError> {
        self.ops.push(Op::Read(addr, buf.len()));
        self.fill(addr, None, buf)
    }

    fn write_read(&mut self, addr: u8, bytes: &[u8], buf: &mut [u8]) -> Result<(), BusError> {
        self.ops.push(Op::WriteRead(addr, bytes.to_vec(), buf.len()));
        self.fill(addr, bytes.first().copied(), buf)
    }
}
