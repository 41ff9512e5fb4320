//! Outbound telemetry frame.
//!
//! One frame per cycle, built as a list of tagged fields and serialised by
//! [`write_frame`]. The sigils, keys and their order are what the display
//! software matches on:
//!
//! ```text
//! #
//! /i=12
//! @2024-05-01T10:00:00Z
//! !asd=0
//! !atg=101300.00
//! $gn1=1
//! ...
//! ?vtg=
//! +
//! ```

use core::fmt::{self, Write};

use heapless::Vec;

use crate::acquisition::RawSnapshot;
use crate::airdata::AirData;
use crate::gnss::{GnssCache, SentenceKind};
use crate::health::HealthMonitor;
use crate::rtc::DateTime;
use crate::sensor::SensorKind;
use crate::settings::Settings;

pub const FRAME_START: char = '#';
pub const FRAME_END: char = '+';
pub const LINE_END: &str = "\r\n";

/// Upper bound on fields per frame.
pub const MAX_FIELDS: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sigil {
    /// Previous cycle's busy time
    Elapsed,
    Timestamp,
    Setting,
    Raw,
    Health,
    Derived,
    Gnss,
}

impl Sigil {
    pub const fn as_char(self) -> char {
        match self {
            Sigil::Elapsed => '/',
            Sigil::Timestamp => '@',
            Sigil::Setting => '!',
            Sigil::Raw => '$',
            Sigil::Health => '%',
            Sigil::Derived => '&',
            Sigil::Gnss => '?',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Bool(bool),
    UInt(u32),
    Float { value: f32, decimals: u8 },
    Time(DateTime),
    Text(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field<'a> {
    pub sigil: Sigil,
    /// Empty for the timestamp line, which carries no `key=`
    pub key: &'static str,
    pub value: Value<'a>,
}

impl fmt::Display for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char(self.sigil.as_char())?;
        if !self.key.is_empty() {
            write!(f, "{}=", self.key)?;
        }
        match self.value {
            Value::Bool(b) => f.write_char(if b { '1' } else { '0' }),
            Value::UInt(n) => write!(f, "{}", n),
            Value::Float { value, decimals } => write!(f, "{:.*}", decimals as usize, value),
            Value::Time(t) => write!(f, "{}", t),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Ordered field list of one frame.
#[derive(Debug, Clone, Default)]
pub struct Frame<'a> {
    fields: Vec<Field<'a>, MAX_FIELDS>,
}

impl<'a> Frame<'a> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    fn push(&mut self, sigil: Sigil, key: &'static str, value: Value<'a>) {
        // MAX_FIELDS covers the full table
        let _ = self.fields.push(Field { sigil, key, value });
    }

    fn float(&mut self, sigil: Sigil, key: &'static str, value: f32, decimals: u8) {
        self.push(sigil, key, Value::Float { value, decimals });
    }

    pub fn fields(&self) -> &[Field<'a>] {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Field<'a>> {
        self.fields.iter().find(|f| f.key == key)
    }
}

/// Everything one frame reports.
pub struct FrameInputs<'a> {
    pub busy_ms: u32,
    pub time: Option<DateTime>,
    pub settings: &'a Settings,
    pub snapshot: &'a RawSnapshot,
    pub health: &'a HealthMonitor,
    pub air: &'a AirData,
    pub gnss: &'a GnssCache,
}

pub fn build_frame<'a>(inputs: &FrameInputs<'a>) -> Frame<'a> {
    let mut frame = Frame::new();
    let snap = inputs.snapshot;
    let air = inputs.air;

    frame.push(Sigil::Elapsed, "i", Value::UInt(inputs.busy_ms));
    if let Some(t) = inputs.time {
        frame.push(Sigil::Timestamp, "", Value::Time(t));
    }

    frame.push(Sigil::Setting, "asd", Value::Bool(inputs.settings.alt_std));
    frame.float(Sigil::Setting, "atg", inputs.settings.alt_setting_pa, 2);

    for (key, on_ground) in ["gn1", "gn2", "gn3"].into_iter().zip(snap.ground) {
        frame.push(Sigil::Raw, key, Value::Bool(on_ground));
    }
    frame.float(Sigil::Raw, "aoa", snap.aoa_deg, 2);
    frame.float(Sigil::Raw, "tat", air.sat_c, 2);

    let health = |kind: SensorKind| Value::Bool(inputs.health.is_connected(kind));

    frame.push(Sigil::Health, SensorKind::Imu.key(), health(SensorKind::Imu));
    for (key, v) in ["ax", "ay", "az"].into_iter().zip(snap.accel) {
        frame.float(Sigil::Raw, key, v, 2);
    }
    for (key, v) in ["gx", "gy", "gz"].into_iter().zip(snap.gyro) {
        frame.float(Sigil::Raw, key, v, 2);
    }

    frame.push(Sigil::Health, SensorKind::Magnetometer.key(), health(SensorKind::Magnetometer));
    for (key, v) in ["mx", "my", "mz"].into_iter().zip(snap.mag) {
        frame.float(Sigil::Raw, key, v, 3);
    }

    frame.push(Sigil::Health, SensorKind::StaticPressure.key(), health(SensorKind::StaticPressure));
    frame.float(Sigil::Raw, "prs", snap.static_pa, 1);

    frame.push(
        Sigil::Health,
        SensorKind::DifferentialPressure.key(),
        health(SensorKind::DifferentialPressure),
    );
    frame.float(Sigil::Raw, "dif", snap.diff_pa, 2);

    frame.float(Sigil::Derived, "pit", air.pitch_deg, 2);
    frame.float(Sigil::Derived, "rol", air.roll_deg, 2);
    frame.float(Sigil::Derived, "trn", air.turn_rate_dps, 2);
    frame.float(Sigil::Derived, "lac", air.linear_accel_g, 3);
    frame.float(Sigil::Derived, "sat", air.sat_c, 2);
    frame.float(Sigil::Derived, "plt", air.pressure_alt_ft, 2);
    frame.float(Sigil::Derived, "ilt", air.indicated_alt_ft, 2);
    frame.float(Sigil::Derived, "vsp", air.vspeed_fpm, 2);
    frame.float(Sigil::Derived, "ias", air.ias_kt, 2);
    frame.float(Sigil::Derived, "cas", air.cas_kt, 2);
    frame.float(Sigil::Derived, "tas", air.tas_kt, 2);
    frame.float(Sigil::Derived, "mac", air.mach, 4);
    frame.float(Sigil::Derived, "umh", air.heading_deg, 2);
    frame.float(Sigil::Derived, "cmh", air.corrected_heading_deg, 2);

    for kind in SentenceKind::ALL {
        frame.push(Sigil::Gnss, kind.key(), Value::Text(inputs.gnss.sentence(kind)));
    }

    frame
}

/// Serialises `frame` between the start and end markers.
pub fn write_frame<W: Write>(frame: &Frame<'_>, out: &mut W) -> fmt::Result {
    write!(out, "{}{}", FRAME_START, LINE_END)?;
    for field in frame.fields() {
        write!(out, "{}{}", field, LINE_END)?;
    }
    write!(out, "{}{}", FRAME_END, LINE_END)
}
