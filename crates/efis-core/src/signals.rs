//! Analog and discrete inputs sampled directly by the MCU.

/// Number of air/ground sense contacts.
pub const GROUND_CONTACTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcChannel {
    /// AOA vane potentiometer
    Aoa,
    /// Temperature probe reference leg
    TempRef,
    /// Temperature probe output leg
    TempOut,
}

pub trait SignalInputs {
    /// One blocking conversion on `channel`.
    fn sample(&mut self, channel: AdcChannel) -> u16;

    /// `true` for each contact reporting weight-on-wheels. The inputs are
    /// pulled up, so a grounded pin reads low.
    fn ground_contacts(&mut self) -> [bool; GROUND_CONTACTS];
}

/// Fixed readings for host tests and bench runs without the analog board.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedSignals {
    pub aoa: u16,
    pub temp_ref: u16,
    pub temp_out: u16,
    pub ground: [bool; GROUND_CONTACTS],
}

impl SignalInputs for FixedSignals {
    fn sample(&mut self, channel: AdcChannel) -> u16 {
        match channel {
            AdcChannel::Aoa => self.aoa,
            AdcChannel::TempRef => self.temp_ref,
            AdcChannel::TempOut => self.temp_out,
        }
    }

    fn ground_contacts(&mut self) -> [bool; GROUND_CONTACTS] {
        self.ground
    }
}
