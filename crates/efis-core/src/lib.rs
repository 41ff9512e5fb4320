//! efis-core - acquisition and air-data core of the EFIS sensor unit.
//!
//! Everything here is platform agnostic and `no_std`: the firmware crate
//! supplies the bus, delay, clock and signal adapters through the traits in
//! [`bus`], [`signals`], [`clock`] and [`rtc`], and this crate sequences them.
//!
//! # Modules
//!
//! - [`health`]: per-sensor connected/disconnected tracking with re-init on reconnect
//! - [`acquisition`]: channel select + raw reads + calibration into a [`acquisition::RawSnapshot`]
//! - [`airdata`]: standard-atmosphere derivation of attitude, altitude and speeds
//! - [`settings`]: framed `!key=value` inbound settings parser
//! - [`telemetry`]: sigil-tagged outbound frame builder and formatter
//! - [`governor`]: fixed-period cycle pacing
//! - [`context`]: the per-process state object tying the cycle together

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;

pub mod acquisition;
pub mod airdata;
pub mod axis;
pub mod bus;
pub mod clock;
pub mod config;
pub mod context;
pub mod drivers;
pub mod gnss;
pub mod governor;
pub mod health;
pub mod rtc;
pub mod sensor;
pub mod settings;
pub mod signals;
pub mod telemetry;

pub use context::EfisContext;
