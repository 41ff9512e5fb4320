//! Shared I2C bus, mux and delay abstractions.
//!
//! The sensor unit hangs every chip off one I2C bus behind a TCA9548A
//! switch. Nothing here locks: the cycle is single threaded, but a
//! [`BusMux::select_channel`] call must directly precede each transaction
//! meant for the sensor on that channel.

/// I2C-level failures, mapped from whatever the HAL reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Address or data byte not acknowledged
    Nack,
    /// Transaction did not complete within the HAL timeout
    Timeout,
    /// Misplaced start/stop or other bus fault
    Bus,
    /// Lost arbitration to another master
    Arbitration,
}

/// Blocking I2C master.
pub trait I2cBus {
    /// START - ADDR(W) - DATA - STOP
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), BusError>;

    /// START - ADDR(R) - DATA - STOP
    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), BusError>;

    /// Register-style write then read with a repeated START.
    fn write_read(&mut self, addr: u8, bytes: &[u8], buf: &mut [u8]) -> Result<(), BusError>;

    /// Address-only transaction; `true` when the device acknowledges.
    fn probe(&mut self, addr: u8) -> bool {
        self.write(addr, &[]).is_ok()
    }
}

impl<T: I2cBus + ?Sized> I2cBus for &mut T {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), BusError> {
        (**self).write(addr, bytes)
    }

    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), BusError> {
        (**self).read(addr, buf)
    }

    fn write_read(&mut self, addr: u8, bytes: &[u8], buf: &mut [u8]) -> Result<(), BusError> {
        (**self).write_read(addr, bytes, buf)
    }

    fn probe(&mut self, addr: u8) -> bool {
        (**self).probe(addr)
    }
}

/// Short blocking delay (ADC settling, data-ready retry, conversion waits).
pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
}

/// Delay that returns immediately. Used by host tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

impl Delay for NoDelay {
    fn delay_ms(&mut self, _ms: u32) {}
}

/// Port index on the bus switch (0..=7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusChannel(pub u8);

impl BusChannel {
    /// One-hot control byte for the switch.
    pub const fn mask(self) -> u8 {
        1 << (self.0 & 0x07)
    }
}

/// Switched-bus channel selection.
pub trait BusMux<B: I2cBus> {
    fn select_channel(&mut self, bus: &mut B, channel: BusChannel) -> Result<(), BusError>;
}

/// Unswitched bus: every sensor is reachable without selection.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectBus;

impl<B: I2cBus> BusMux<B> for DirectBus {
    fn select_channel(&mut self, _bus: &mut B, _channel: BusChannel) -> Result<(), BusError> {
        Ok(())
    }
}
