use crate::bus::{BusError, Delay, I2cBus};
use crate::sensor::Sensor;

pub const BMP180_ADDR: u8 = 0x77;

const REG_CALIB: u8 = 0xAA;
const REG_CHIP_ID: u8 = 0xD0;
const REG_CONTROL: u8 = 0xF4;
const REG_RESULT: u8 = 0xF6;

const CHIP_ID: u8 = 0x55;
const CMD_TEMPERATURE: u8 = 0x2E;
const CMD_PRESSURE: u8 = 0x34;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oversampling {
    UltraLowPower = 0,
    Standard = 1,
    HighRes = 2,
    UltraHighRes = 3,
}

impl Oversampling {
    /// Worst-case conversion time (ms)
    const fn conversion_ms(self) -> u32 {
        match self {
            Oversampling::UltraLowPower => 5,
            Oversampling::Standard => 8,
            Oversampling::HighRes => 14,
            Oversampling::UltraHighRes => 26,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Bmp180Coeffs {
    ac1: i16,
    ac2: i16,
    ac3: i16,
    ac4: u16,
    ac5: u16,
    ac6: u16,
    b1: i16,
    b2: i16,
    mc: i16,
    md: i16,
}

pub struct Bmp180 {
    coeffs: Bmp180Coeffs,
    oss: Oversampling,
}

impl Bmp180 {
    pub fn new() -> Self {
        Self::with_oversampling(Oversampling::UltraHighRes)
    }

    pub fn with_oversampling(oss: Oversampling) -> Self {
        Self {
            coeffs: Bmp180Coeffs::default(),
            oss,
        }
    }

    /// Chip-id check plus calibration read.
    pub fn begin<B: I2cBus>(&mut self, bus: &mut B) -> Result<(), BusError> {
        let mut id = [0u8; 1];
        bus.write_read(BMP180_ADDR, &[REG_CHIP_ID], &mut id)?;
        if id[0] != CHIP_ID {
            return Err(BusError::Bus);
        }
        self.read_coeffs(bus)
    }

    fn read_coeffs<B: I2cBus>(&mut self, bus: &mut B) -> Result<(), BusError> {
        let mut buf = [0u8; 22];
        bus.write_read(BMP180_ADDR, &[REG_CALIB], &mut buf)?;
        let word = |i: usize| [buf[2 * i], buf[2 * i + 1]];

        // an erased or unreadable EEPROM word reads 0x0000 or 0xFFFF
        if (0..11).map(|i| u16::from_be_bytes(word(i))).any(|w| w == 0x0000 || w == 0xFFFF) {
            return Err(BusError::Bus);
        }

        self.coeffs = Bmp180Coeffs {
            ac1: i16::from_be_bytes(word(0)),
            ac2: i16::from_be_bytes(word(1)),
            ac3: i16::from_be_bytes(word(2)),
            ac4: u16::from_be_bytes(word(3)),
            ac5: u16::from_be_bytes(word(4)),
            ac6: u16::from_be_bytes(word(5)),
            b1: i16::from_be_bytes(word(6)),
            b2: i16::from_be_bytes(word(7)),
            // word 8 is MB, unused by the compensation
            mc: i16::from_be_bytes(word(9)),
            md: i16::from_be_bytes(word(10)),
        };
        Ok(())
    }

    fn read_uncompensated<B: I2cBus>(
        &mut self,
        bus: &mut B,
        delay: &mut dyn Delay,
    ) -> Result<(i32, i32), BusError> {
        bus.write(BMP180_ADDR, &[REG_CONTROL, CMD_TEMPERATURE])?;
        delay.delay_ms(5);
        let mut ut = [0u8; 2];
        bus.write_read(BMP180_ADDR, &[REG_RESULT], &mut ut)?;

        let oss = self.oss as u8;
        bus.write(BMP180_ADDR, &[REG_CONTROL, CMD_PRESSURE + (oss << 6)])?;
        delay.delay_ms(self.oss.conversion_ms());
        let mut up = [0u8; 3];
        bus.write_read(BMP180_ADDR, &[REG_RESULT], &mut up)?;

        let ut = i32::from(u16::from_be_bytes(ut));
        let up = ((i32::from(up[0]) << 16) | (i32::from(up[1]) << 8) | i32::from(up[2]))
            >> (8 - oss);
        Ok((ut, up))
    }

    /// Bosch integer compensation. Returns (pressure Pa, temperature 0.1 °C).
    ///
    /// Runs in `i64` so a corrupted sample cannot overflow; a zero divisor
    /// or an out-of-range result is a failed read.
    fn compensate(&self, ut: i32, up: i32) -> Result<(i32, i32), BusError> {
        let c = &self.coeffs;
        let oss = self.oss as u32;
        let (ut, up) = (i64::from(ut), i64::from(up));

        let x1 = ((ut - i64::from(c.ac6)) * i64::from(c.ac5)) >> 15;
        let x2 = (i64::from(c.mc) << 11)
            .checked_div(x1 + i64::from(c.md))
            .ok_or(BusError::Bus)?;
        let b5 = x1 + x2;
        let temp = (b5 + 8) >> 4;

        let b6 = b5 - 4000;
        let x1 = (i64::from(c.b2) * ((b6 * b6) >> 12)) >> 11;
        let x2 = (i64::from(c.ac2) * b6) >> 11;
        let x3 = x1 + x2;
        let b3 = (((i64::from(c.ac1) * 4 + x3) << oss) + 2) / 4;

        let x1 = (i64::from(c.ac3) * b6) >> 13;
        let x2 = (i64::from(c.b1) * ((b6 * b6) >> 12)) >> 16;
        let x3 = (x1 + x2 + 2) >> 2;
        let b4 = (i64::from(c.ac4) * (x3 + 32768)) >> 15;
        let b7 = (up - b3) * (50_000 >> oss);
        if b4 <= 0 || b7 < 0 {
            return Err(BusError::Bus);
        }

        let p = if b7 < 0x8000_0000 {
            (b7 * 2) / b4
        } else {
            (b7 / b4) * 2
        };
        if p > i64::from(i32::MAX) {
            return Err(BusError::Bus);
        }

        let x1 = (p >> 8) * (p >> 8);
        let x1 = (x1 * 3038) >> 16;
        let x2 = (-7357 * p) >> 16;
        let p = p + ((x1 + x2 + 3791) >> 4);

        let p = i32::try_from(p).map_err(|_| BusError::Bus)?;
        let temp = i32::try_from(temp).map_err(|_| BusError::Bus)?;
        Ok((p, temp))
    }
}

impl Default for Bmp180 {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: I2cBus> Sensor<B> for Bmp180 {
    /// Static pressure (Pa)
    type Raw = f32;

    fn probe(&mut self, bus: &mut B) -> bool {
        self.begin(bus).is_ok()
    }

    fn init(&mut self, bus: &mut B) {
        let _ = self.begin(bus);
    }

    fn read_raw(&mut self, bus: &mut B, delay: &mut dyn Delay) -> Result<f32, BusError> {
        let (ut, up) = self.read_uncompensated(bus, delay)?;
        let (pressure, _temp) = self.compensate(ut, up)?;
        Ok(pressure as f32)
    }
}
