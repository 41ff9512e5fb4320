//! Sensor driver capability traits.
//!
//! Drivers borrow the shared bus per call. The acquisition cycle selects the
//! mux channel before handing the bus over.

use crate::bus::{BusError, Delay, I2cBus};

/// The four bus sensors of the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorKind {
    Imu,
    Magnetometer,
    StaticPressure,
    DifferentialPressure,
}

impl SensorKind {
    pub const ALL: [SensorKind; 4] = [
        SensorKind::Imu,
        SensorKind::Magnetometer,
        SensorKind::StaticPressure,
        SensorKind::DifferentialPressure,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Key used for the health flag in telemetry
    pub const fn key(self) -> &'static str {
        match self {
            SensorKind::Imu => "imu",
            SensorKind::Magnetometer => "mag",
            SensorKind::StaticPressure => "prs",
            SensorKind::DifferentialPressure => "dif",
        }
    }
}

/// Raw accelerometer and gyroscope counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImuRaw {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

/// probe / init / read capability of one sensor.
pub trait Sensor<B: I2cBus> {
    type Raw;

    /// `true` when the sensor answers on the bus.
    fn probe(&mut self, bus: &mut B) -> bool;

    /// (Re-)apply configuration registers. Failures are not reported.
    fn init(&mut self, bus: &mut B);

    fn read_raw(&mut self, bus: &mut B, delay: &mut dyn Delay) -> Result<Self::Raw, BusError>;
}

/// Magnetometers additionally expose a data-ready flag.
pub trait Magnetometer<B: I2cBus>: Sensor<B, Raw = [i16; 3]> {
    fn data_ready(&mut self, bus: &mut B) -> Result<bool, BusError>;
}
