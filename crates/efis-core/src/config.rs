//! Unit configuration.
//!
//! `Default` reproduces the constants of the deployed sensor unit
//! (10-bit / 5 V analog front end). Boards with a different ADC override
//! [`AnalogConfig`] before handing the config to the loop.

use crate::axis::{AxisTransform, VectorCalibration, INVERT_X};
use crate::bus::BusChannel;

/// Default loop period (ms)
pub const LOOP_PERIOD_MS: u32 = 100;
/// Delay between a sensor's health check and its read (ms)
pub const SETTLE_DELAY_MS: u32 = 1;
/// Magnetometer data-ready retry wait (ms)
pub const MAG_RETRY_DELAY_MS: u32 = 2;
/// Cycles per vertical-speed window
pub const VSPEED_WINDOW_CYCLES: u8 = 5;

/// ±8 g range
pub const IMU_ACCEL_LSB_PER_G: f32 = 4096.0;
/// ±500 °/s range
pub const IMU_GYRO_LSB_PER_DPS: f32 = 65.5;
/// 8 G range
pub const MAG_LSB_PER_GAUSS: f32 = 3000.0;

/// Mux ports of the four bus sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMap {
    pub imu: BusChannel,
    pub mag: BusChannel,
    pub baro: BusChannel,
    pub diff: BusChannel,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            imu: BusChannel(1),
            mag: BusChannel(2),
            baro: BusChannel(5),
            diff: BusChannel(6),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuCalibration {
    pub accel: VectorCalibration,
    pub gyro: VectorCalibration,
}

impl Default for ImuCalibration {
    fn default() -> Self {
        let transform = AxisTransform::from_legacy(true, INVERT_X);
        Self {
            accel: VectorCalibration::new(IMU_ACCEL_LSB_PER_G, transform),
            gyro: VectorCalibration::new(IMU_GYRO_LSB_PER_DPS, transform),
        }
    }
}

/// ADC scaling for the AOA vane and the temperature probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogConfig {
    pub aoa_adc_min: u16,
    pub aoa_adc_max: u16,
    pub aoa_min_deg: f32,
    pub aoa_max_deg: f32,
    /// °C per count of (output - reference)
    pub temp_factor: f32,
}

impl AnalogConfig {
    /// Linear vane mapping from ADC counts to degrees.
    pub fn aoa_deg(&self, adc: u16) -> f32 {
        let span = (self.aoa_max_deg - self.aoa_min_deg)
            / (self.aoa_adc_max as f32 - self.aoa_adc_min as f32);
        (adc as f32 - self.aoa_adc_min as f32) * span + self.aoa_min_deg
    }

    /// Probe temperature from the output and reference channels.
    pub fn temp_c(&self, out_adc: u16, ref_adc: u16) -> f32 {
        (out_adc as i32 - ref_adc as i32) as f32 * self.temp_factor
    }
}

impl Default for AnalogConfig {
    fn default() -> Self {
        Self {
            aoa_adc_min: 0,
            aoa_adc_max: 1023,
            aoa_min_deg: -135.0,
            aoa_max_deg: 135.0,
            // 5000 mV / 1024 counts / 10 mV per °C
            temp_factor: 0.488_281_25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EfisConfig {
    pub loop_period_ms: u32,
    pub settle_delay_ms: u32,
    pub mag_retry_delay_ms: u32,
    pub channels: ChannelMap,
    pub imu: ImuCalibration,
    pub mag: VectorCalibration,
    /// Fixed error added to the differential reading (Pa)
    pub diff_offset_pa: f32,
    pub analog: AnalogConfig,
    pub window_cycles: u8,
}

impl Default for EfisConfig {
    fn default() -> Self {
        Self {
            loop_period_ms: LOOP_PERIOD_MS,
            settle_delay_ms: SETTLE_DELAY_MS,
            mag_retry_delay_ms: MAG_RETRY_DELAY_MS,
            channels: ChannelMap::default(),
            imu: ImuCalibration::default(),
            mag: VectorCalibration::new(
                MAG_LSB_PER_GAUSS,
                AxisTransform::from_legacy(true, INVERT_X),
            ),
            diff_offset_pa: -10.0,
            analog: AnalogConfig::default(),
            window_cycles: VSPEED_WINDOW_CYCLES,
        }
    }
}
