use efis_core::config::{AnalogConfig, EfisConfig};
use embassy_stm32::rcc::*;
use embassy_stm32::time::Hertz as TimeHertz;
use embassy_stm32::Config;

pub struct Board {
    pub p: embassy_stm32::Peripherals,
}

impl Board {
    pub fn init() -> Self {
        let mut config = Config::default();
        config.rcc.hse = Some(Hse {
            freq: TimeHertz(8_000_000),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL168,
            divp: Some(PllPDiv::DIV2), // 168 MHz
            divq: Some(PllQDiv::DIV7), // 48 MHz USB
            divr: None,
        });
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;

        let p = embassy_stm32::init(config);

        Self { p }
    }
}

/// 12-bit ADC on a 3.3 V reference.
pub const ADC_FULL_SCALE: u16 = 4095;

/// Loop configuration for this board's analog front end.
pub fn efis_config() -> EfisConfig {
    EfisConfig {
        analog: AnalogConfig {
            aoa_adc_max: ADC_FULL_SCALE,
            // 3300 mV / 4096 counts / 10 mV per °C
            temp_factor: 3300.0 / 4096.0 / 10.0,
            ..AnalogConfig::default()
        },
        ..EfisConfig::default()
    }
}
