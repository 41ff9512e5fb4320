use crate::bus::{BusError, Delay, I2cBus};
use crate::sensor::{ImuRaw, Sensor};

pub const MPU6050_ADDR: u8 = 0x68;

const REG_SMPLRT_DIV: u8 = 0x19;
const REG_CONFIG: u8 = 0x1A;
const REG_GYRO_CONFIG: u8 = 0x1B;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_GYRO_XOUT_H: u8 = 0x43;
const REG_PWR_MGMT_1: u8 = 0x6B;

/// EXT_SYNC off, DLPF_CFG = 6 (5 Hz)
const CONFIG_VALUE: u8 = 0 << 3 | 6;
/// Sample rate = gyro output rate / (1 + 3)
const SMPLRT_DIV_VALUE: u8 = 3;
/// FS_SEL = 1, ±500 °/s
const GYRO_CONFIG_VALUE: u8 = 1 << 3;
/// AFS_SEL = 2, ±8 g
const ACCEL_CONFIG_VALUE: u8 = 2 << 3;
/// Internal 8 MHz oscillator, temperature sensor disabled
const PWR_MGMT_VALUE: u8 = 0b0000_1000;

pub struct Mpu6050 {
    addr: u8,
}

impl Mpu6050 {
    pub fn new() -> Self {
        Self { addr: MPU6050_ADDR }
    }

    fn write_reg<B: I2cBus>(&self, bus: &mut B, reg: u8, val: u8) -> Result<(), BusError> {
        bus.write(self.addr, &[reg, val])
    }

    fn read_vector<B: I2cBus>(&self, bus: &mut B, reg: u8) -> Result<[i16; 3], BusError> {
        let mut buf = [0u8; 6];
        bus.write_read(self.addr, &[reg], &mut buf)?;
        Ok([
            i16::from_be_bytes([buf[0], buf[1]]),
            i16::from_be_bytes([buf[2], buf[3]]),
            i16::from_be_bytes([buf[4], buf[5]]),
        ])
    }

    fn configure<B: I2cBus>(&self, bus: &mut B) -> Result<(), BusError> {
        self.write_reg(bus, REG_CONFIG, CONFIG_VALUE)?;
        self.write_reg(bus, REG_SMPLRT_DIV, SMPLRT_DIV_VALUE)?;
        self.write_reg(bus, REG_ACCEL_CONFIG, ACCEL_CONFIG_VALUE)?;
        self.write_reg(bus, REG_GYRO_CONFIG, GYRO_CONFIG_VALUE)?;
        self.write_reg(bus, REG_PWR_MGMT_1, PWR_MGMT_VALUE)
    }
}

impl Default for Mpu6050 {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: I2cBus> Sensor<B> for Mpu6050 {
    type Raw = ImuRaw;

    fn probe(&mut self, bus: &mut B) -> bool {
        bus.probe(self.addr)
    }

    fn init(&mut self, bus: &mut B) {
        let _ = self.configure(bus);
    }

    fn read_raw(&mut self, bus: &mut B, _delay: &mut dyn Delay) -> Result<ImuRaw, BusError> {
        let accel = self.read_vector(bus, REG_ACCEL_XOUT_H)?;
        let gyro = self.read_vector(bus, REG_GYRO_XOUT_H)?;
        Ok(ImuRaw { accel, gyro })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::NoDelay;
    use crate::drivers::mock::{MockBus, Op};

    #[test]
    fn init_writes_configuration_registers() {
        let mut bus = MockBus::new();
        bus.attach(MPU6050_ADDR);
        let mut imu = Mpu6050::new();
        imu.init(&mut bus);
        assert_eq!(
            bus.ops(),
            vec![
                Op::Write(MPU6050_ADDR, vec![0x1A, 0x06]),
                Op::Write(MPU6050_ADDR, vec![0x19, 0x03]),
                Op::Write(MPU6050_ADDR, vec![0x1C, 0x10]),
                Op::Write(MPU6050_ADDR, vec![0x1B, 0x08]),
                Op::Write(MPU6050_ADDR, vec![0x6B, 0x08]),
            ]
        );
    }

    #[test]
    fn reads_accel_and_gyro_from_their_own_blocks() {
        let mut bus = MockBus::new();
        bus.set_regs(MPU6050_ADDR, 0x3B, &[0x10, 0x00, 0xF0, 0x00, 0x00, 0x01]);
        bus.set_regs(MPU6050_ADDR, 0x43, &[0x00, 0x41, 0xFF, 0xBF, 0x00, 0x00]);
        let mut imu = Mpu6050::new();
        let raw = imu.read_raw(&mut bus, &mut NoDelay).unwrap();
        assert_eq!(raw.accel, [4096, -4096, 1]);
        assert_eq!(raw.gyro, [65, -65, 0]);
    }

    #[test]
    fn probe_fails_when_absent() {
        let mut bus = MockBus::new();
        let mut imu = Mpu6050::new();
        assert!(!imu.probe(&mut bus));
    }
}
