//! Analog board: AOA vane and temperature probe on ADC1, three air/ground
//! contacts on pulled-up GPIOs.

use efis_core::signals::{AdcChannel, SignalInputs, GROUND_CONTACTS};
use embassy_stm32::adc::{Adc, SampleTime};
use embassy_stm32::gpio::{AnyPin, Input};
use embassy_stm32::peripherals::{ADC1, PC0, PC1, PC2};

pub struct Frontend {
    adc: Adc<'static, ADC1>,
    aoa: PC0,
    temp_ref: PC1,
    temp_out: PC2,
    ground: [Input<'static, AnyPin>; GROUND_CONTACTS],
}

impl Frontend {
    pub fn new(
        mut adc: Adc<'static, ADC1>,
        aoa: PC0,
        temp_ref: PC1,
        temp_out: PC2,
        ground: [Input<'static, AnyPin>; GROUND_CONTACTS],
    ) -> Self {
        // probe legs are high impedance
        adc.set_sample_time(SampleTime::Cycles480);
        Self {
            adc,
            aoa,
            temp_ref,
            temp_out,
            ground,
        }
    }
}

impl SignalInputs for Frontend {
    fn sample(&mut self, channel: AdcChannel) -> u16 {
        match channel {
            AdcChannel::Aoa => self.adc.read(&mut self.aoa),
            AdcChannel::TempRef => self.adc.read(&mut self.temp_ref),
            AdcChannel::TempOut => self.adc.read(&mut self.temp_out),
        }
    }

    fn ground_contacts(&mut self) -> [bool; GROUND_CONTACTS] {
        [
            self.ground[0].is_low(),
            self.ground[1].is_low(),
            self.ground[2].is_low(),
        ]
    }
}
