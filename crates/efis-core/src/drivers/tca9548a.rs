use crate::bus::{BusChannel, BusError, BusMux, I2cBus};

pub const TCA9548A_ADDR: u8 = 0x70;

/// 8-port I2C switch. Exactly one downstream port is enabled at a time.
pub struct Tca9548a {
    addr: u8,
}

impl Tca9548a {
    pub fn new() -> Self {
        Self { addr: TCA9548A_ADDR }
    }
}

impl Default for Tca9548a {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: I2cBus> BusMux<B> for Tca9548a {
    fn select_channel(&mut self, bus: &mut B, channel: BusChannel) -> Result<(), BusError> {
        bus.write(self.addr, &[channel.mask()])
    }
}
