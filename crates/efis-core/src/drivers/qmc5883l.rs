use crate::bus::{BusError, Delay, I2cBus};
use crate::sensor::{Magnetometer, Sensor};

pub const QMC5883L_ADDR: u8 = 0x0D;

const REG_DATA_X_LSB: u8 = 0x00;
const REG_STATUS: u8 = 0x06;
const REG_CONTROL_1: u8 = 0x09;
const REG_SET_RESET: u8 = 0x0B;

const STATUS_DRDY: u8 = 0b0000_0001;

/// Continuous mode, 100 Hz ODR, 8 G range, OSR 512
const CONTROL_VALUE: u8 = 0b0000_0001 | 0b0000_1000 | 0b0001_0000;
const SET_RESET_VALUE: u8 = 0x01;

pub struct Qmc5883l {
    addr: u8,
}

impl Qmc5883l {
    pub fn new() -> Self {
        Self { addr: QMC5883L_ADDR }
    }

    fn configure<B: I2cBus>(&self, bus: &mut B) -> Result<(), BusError> {
        bus.write(self.addr, &[REG_SET_RESET, SET_RESET_VALUE])?;
        bus.write(self.addr, &[REG_CONTROL_1, CONTROL_VALUE])
    }
}

impl Default for Qmc5883l {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: I2cBus> Sensor<B> for Qmc5883l {
    type Raw = [i16; 3];

    fn probe(&mut self, bus: &mut B) -> bool {
        bus.probe(self.addr)
    }

    fn init(&mut self, bus: &mut B) {
        let _ = self.configure(bus);
    }

    fn read_raw(&mut self, bus: &mut B, _delay: &mut dyn Delay) -> Result<[i16; 3], BusError> {
        let mut data = [0u8; 6];
        bus.write_read(self.addr, &[REG_DATA_X_LSB], &mut data)?;

        // X, Y, Z, little endian
        let x = i16::from_le_bytes([data[0], data[1]]);
        let y = i16::from_le_bytes([data[2], data[3]]);
        let z = i16::from_le_bytes([data[4], data[5]]);
        Ok([x, y, z])
    }
}

impl<B: I2cBus> Magnetometer<B> for Qmc5883l {
    fn data_ready(&mut self, bus: &mut B) -> Result<bool, BusError> {
        let mut status = [0u8; 1];
        bus.write_read(self.addr, &[REG_STATUS], &mut status)?;
        Ok(status[0] & STATUS_DRDY != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::NoDelay;
    use crate::drivers::mock::{MockBus, Op};

    #[test]
    fn init_sets_period_then_mode() {
        let mut bus = MockBus::new();
        bus.attach(QMC5883L_ADDR);
        Qmc5883l::new().init(&mut bus);
        assert_eq!(
            bus.ops(),
            vec![
                Op::Write(QMC5883L_ADDR, vec![0x0B, 0x01]),
                Op::Write(QMC5883L_ADDR, vec![0x09, 0x19]),
            ]
        );
    }

    #[test]
    fn data_ready_reads_status_bit() {
        let mut bus = MockBus::new();
        bus.set_regs(QMC5883L_ADDR, 0x06, &[0x04]);
        let mut mag = Qmc5883l::new();
        assert!(!mag.data_ready(&mut bus).unwrap());
        bus.set_regs(QMC5883L_ADDR, 0x06, &[0x05]);
        assert!(mag.data_ready(&mut bus).unwrap());
    }

    #[test]
    fn vector_is_little_endian_xyz() {
        let mut bus = MockBus::new();
        bus.set_regs(QMC5883L_ADDR, 0x00, &[0xB8, 0x0B, 0x48, 0xF4, 0x00, 0x00]);
        let v = Qmc5883l::new().read_raw(&mut bus, &mut NoDelay).unwrap();
        assert_eq!(v, [3000, -3000, 0]);
    }
}
