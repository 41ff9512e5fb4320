//! Embassy adapters for the core's bus, delay and clock seams.

use efis_core::bus::{BusError, Delay, I2cBus};
use efis_core::clock::Clock;
use embassy_stm32::i2c::{Error as I2cError, I2c};
use embassy_stm32::peripherals::{DMA1_CH0, DMA1_CH7, I2C1};
use embassy_time::{block_for, Duration, Instant};

/// Sensor bus: I2C1 behind the TCA9548A switch.
pub type SensorI2c = I2c<'static, I2C1, DMA1_CH7, DMA1_CH0>;

pub struct Stm32Bus {
    i2c: SensorI2c,
}

impl Stm32Bus {
    pub fn new(i2c: SensorI2c) -> Self {
        Self { i2c }
    }
}

fn map_err(e: I2cError) -> BusError {
    match e {
        I2cError::Nack => BusError::Nack,
        I2cError::Timeout => BusError::Timeout,
        I2cError::Arbitration => BusError::Arbitration,
        _ => BusError::Bus,
    }
}

impl I2cBus for Stm32Bus {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.i2c.blocking_write(addr, bytes).map_err(map_err)
    }

    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), BusError> {
        self.i2c.blocking_read(addr, buf).map_err(map_err)
    }

    fn write_read(&mut self, addr: u8, bytes: &[u8], buf: &mut [u8]) -> Result<(), BusError> {
        self.i2c.blocking_write_read(addr, bytes, buf).map_err(map_err)
    }
}

/// Busy-wait delay. The acquisition pass is synchronous, so it spins
/// rather than yields.
#[derive(Clone, Copy, Default)]
pub struct EmbassyDelay;

impl Delay for EmbassyDelay {
    fn delay_ms(&mut self, ms: u32) {
        block_for(Duration::from_millis(ms as u64));
    }
}

/// Embassy time driver as the monotonic clock.
#[derive(Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}
