use crate::bus::{BusError, Delay, I2cBus};
use crate::sensor::Sensor;

pub const MS4525DO_ADDR: u8 = 0x28;

const PA_PER_PSI: f32 = 6894.757;
const FULL_SCALE_COUNTS: f32 = 16383.0;

/// Bridge status from the two top bits of the first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BridgeStatus {
    Normal,
    Reserved,
    Stale,
    Fault,
}

impl BridgeStatus {
    fn from_byte(b: u8) -> Self {
        match b >> 6 {
            0 => BridgeStatus::Normal,
            1 => BridgeStatus::Reserved,
            2 => BridgeStatus::Stale,
            _ => BridgeStatus::Fault,
        }
    }
}

/// Differential pressure transducer, output type A (10 % .. 90 %).
pub struct Ms4525do {
    addr: u8,
    p_min_psi: f32,
    p_max_psi: f32,
}

impl Ms4525do {
    /// ±1 psi part at the default address.
    pub fn new() -> Self {
        Self::with_range(MS4525DO_ADDR, -1.0, 1.0)
    }

    pub fn with_range(addr: u8, p_min_psi: f32, p_max_psi: f32) -> Self {
        Self {
            addr,
            p_min_psi,
            p_max_psi,
        }
    }

    fn fetch<B: I2cBus>(&self, bus: &mut B) -> Result<(BridgeStatus, u16), BusError> {
        let mut buf = [0u8; 4];
        bus.read(self.addr, &mut buf)?;
        let status = BridgeStatus::from_byte(buf[0]);
        let counts = (u16::from(buf[0] & 0x3F) << 8) | u16::from(buf[1]);
        Ok((status, counts))
    }

    /// A probe succeeds only on a complete read with normal status.
    pub fn begin<B: I2cBus>(&mut self, bus: &mut B) -> bool {
        matches!(self.fetch(bus), Ok((BridgeStatus::Normal, _)))
    }

    fn counts_to_pa(&self, counts: u16) -> f32 {
        let psi = (counts as f32 - 0.1 * FULL_SCALE_COUNTS) * (self.p_max_psi - self.p_min_psi)
            / (0.8 * FULL_SCALE_COUNTS)
            + self.p_min_psi;
        psi * PA_PER_PSI
    }
}

impl Default for Ms4525do {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: I2cBus> Sensor<B> for Ms4525do {
    /// Differential (impact) pressure (Pa)
    type Raw = f32;

    fn probe(&mut self, bus: &mut B) -> bool {
        self.begin(bus)
    }

    fn init(&mut self, bus: &mut B) {
        let _ = self.begin(bus);
    }

    fn read_raw(&mut self, bus: &mut B, _delay: &mut dyn Delay) -> Result<f32, BusError> {
        match self.fetch(bus)? {
            (BridgeStatus::Fault, _) | (BridgeStatus::Reserved, _) => Err(BusError::Bus),
            (_, counts) => Ok(self.counts_to_pa(counts)),
        }
    }
}
