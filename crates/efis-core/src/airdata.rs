//! Air-data computer.
//!
//! [`compute`] is a pure function of the latest snapshot, the pilot
//! settings and the previous state. Atmosphere math runs in `f64`, attitude
//! in `f32`, both through `libm` on host and target alike. Any non-finite
//! result is reported as zero.

use crate::acquisition::RawSnapshot;
use crate::config::EfisConfig;
use crate::settings::Settings;

/// Standard sea-level pressure (Pa)
pub const P0: f64 = 101_325.0;
/// Standard sea-level temperature (K)
pub const T0: f64 = 288.15;
/// Troposphere lapse rate (K/m)
pub const LB: f64 = -0.0065;
/// Standard gravity (m/s²)
pub const G0: f64 = 9.80665;
/// Molar mass of dry air (kg/mol)
pub const M0: f64 = 0.028_964_42;
/// Universal gas constant (J/(K·mol))
pub const R: f64 = 8.314_32;
/// Heat capacity ratio of air
pub const GAMMA: f64 = 1.401;
/// Sea-level air density (kg/m³)
pub const RHO0: f64 = 1.225;
/// Specific gas constant of dry air (J/(kg·K))
pub const R_SPECIFIC: f64 = 287.052_87;

const KT_PER_MPS: f64 = 1.943_845_249_221_964;
const FT_PER_M: f64 = 3.280_839_9;
const KELVIN_OFFSET: f64 = 273.15;

/// Derived values of one cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AirData {
    pub pitch_deg: f32,
    pub roll_deg: f32,
    pub turn_rate_dps: f32,
    /// Nose-axis acceleration in g with the pitch share of gravity removed
    pub linear_accel_g: f32,
    pub sat_c: f32,
    pub pressure_alt_ft: f32,
    pub indicated_alt_ft: f32,
    pub vspeed_fpm: f32,
    pub ias_kt: f32,
    pub cas_kt: f32,
    pub tas_kt: f32,
    pub mach: f32,
    /// Uncorrected magnetic heading, 0..360
    pub heading_deg: f32,
    /// Heading after deviation correction; no deviation table yet, so equal to `heading_deg`
    pub corrected_heading_deg: f32,
}

/// Vertical-speed accumulation window.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct VspeedWindow {
    pub count: u8,
    pub sum_ft: f64,
    pub start_ms: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AirDataState {
    pub data: AirData,
    pub prev_pressure_alt_ft: f64,
    pub window: VspeedWindow,
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn finite_or_zero_f32(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Barometric altitude (ft) of static pressure `p` against reference `p_ref`.
pub fn altitude_ft(p: f64, p_ref: f64) -> f64 {
    let exponent = -R * LB / (G0 * M0);
    finite_or_zero((T0 / LB) * (libm::pow(p / p_ref, exponent) - 1.0) * FT_PER_M)
}

/// Indicated airspeed (kt) from static pressure `p` and impact pressure `q`.
pub fn indicated_airspeed_kt(p: f64, q: f64) -> f64 {
    let k = (GAMMA - 1.0) / GAMMA;
    let v2 = (2.0 * GAMMA * p / ((GAMMA - 1.0) * RHO0)) * (libm::pow((p + q) / p, k) - 1.0);
    finite_or_zero(KT_PER_MPS * libm::sqrt(v2))
}

/// True airspeed (kt) with the air density taken from `p` and `sat_c`.
pub fn true_airspeed_kt(p: f64, q: f64, sat_c: f64) -> f64 {
    let rho = p / (R_SPECIFIC * (sat_c + KELVIN_OFFSET));
    finite_or_zero(KT_PER_MPS * libm::sqrt(2.0 * q * RHO0 / libm::sqrt(rho * rho)))
}

pub fn mach(p: f64, q: f64) -> f64 {
    let k = (GAMMA - 1.0) / GAMMA;
    finite_or_zero(libm::sqrt((2.0 / (GAMMA - 1.0)) * (libm::pow(q / p + 1.0, k) - 1.0)))
}

/// Heading of the horizontal field components, 0..360.
fn heading_deg(mag: [f32; 3]) -> f32 {
    let mut hdg = libm::atan2f(mag[2], mag[0]).to_degrees();
    if hdg < 0.0 {
        hdg += 360.0;
    }
    finite_or_zero_f32(hdg)
}

/// Derives this cycle's air data.
pub fn compute(
    snapshot: &RawSnapshot,
    settings: &Settings,
    prev: &AirDataState,
    cfg: &EfisConfig,
    now_ms: u64,
) -> AirDataState {
    let [ax, ay, az] = snapshot.accel;
    let pitch_deg = finite_or_zero_f32(libm::atan2f(az, ay).to_degrees());
    let roll_deg = finite_or_zero_f32(libm::atan2f(ax, ay).to_degrees());
    let turn_rate_dps = finite_or_zero_f32(-snapshot.gyro[1] / libm::cosf(roll_deg.to_radians()));
    let linear_accel_g = finite_or_zero_f32(az - libm::sinf(pitch_deg.to_radians()));

    let sat_c = cfg.analog.temp_c(snapshot.temp_out_adc, snapshot.temp_ref_adc);

    let p = snapshot.static_pa as f64;
    let q = snapshot.diff_pa as f64;

    let pressure_alt = altitude_ft(p, P0);
    let indicated_alt = if settings.alt_std {
        pressure_alt
    } else {
        altitude_ft(p, settings.alt_setting_pa as f64)
    };

    let mut window = prev.window;
    let mut vspeed_fpm = prev.data.vspeed_fpm;
    window.count += 1;
    window.sum_ft += pressure_alt - prev.prev_pressure_alt_ft;
    if window.count >= cfg.window_cycles.max(1) {
        let n = window.count as f64;
        let elapsed = now_ms.saturating_sub(window.start_ms) as f64;
        vspeed_fpm = finite_or_zero(60_000.0 * (window.sum_ft / n) / elapsed) as f32;
        window = VspeedWindow {
            count: 0,
            sum_ft: 0.0,
            start_ms: now_ms,
        };
    }

    let ias = indicated_airspeed_kt(p, q) as f32;
    let heading = heading_deg(snapshot.mag);

    AirDataState {
        data: AirData {
            pitch_deg,
            roll_deg,
            turn_rate_dps,
            linear_accel_g,
            sat_c,
            pressure_alt_ft: pressure_alt as f32,
            indicated_alt_ft: indicated_alt as f32,
            vspeed_fpm,
            ias_kt: ias,
            // no compressibility correction at this level
            cas_kt: ias,
            tas_kt: true_airspeed_kt(p, q, sat_c as f64) as f32,
            mach: mach(p, q) as f32,
            heading_deg: heading,
            corrected_heading_deg: heading,
        },
        prev_pressure_alt_ft: pressure_alt,
        window,
    }
}
