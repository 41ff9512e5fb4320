//! Per-sensor connection tracking.
//!
//! A sensor is re-initialised exactly once per Disconnected -> Connected
//! edge. Probing happens every cycle with no backoff, and each sensor's
//! recovery depends only on its own previous status.

use crate::sensor::SensorKind;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorStatus {
    #[default]
    Disconnected,
    Connected,
}

impl SensorStatus {
    pub const fn is_connected(self) -> bool {
        matches!(self, SensorStatus::Connected)
    }
}

/// Result of feeding one probe outcome to the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// Disconnected -> Connected: the caller must run `init()`
    Reconnected,
    /// Connected -> Disconnected
    Lost,
    Unchanged,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HealthMonitor {
    status: [SensorStatus; 4],
    reinit_count: [u32; 4],
}

impl HealthMonitor {
    pub const fn new() -> Self {
        Self {
            status: [SensorStatus::Disconnected; 4],
            reinit_count: [0; 4],
        }
    }

    pub fn status(&self, kind: SensorKind) -> SensorStatus {
        self.status[kind.index()]
    }

    pub fn is_connected(&self, kind: SensorKind) -> bool {
        self.status(kind).is_connected()
    }

    /// Number of reconnect edges seen since start-up.
    pub fn reinit_count(&self, kind: SensorKind) -> u32 {
        self.reinit_count[kind.index()]
    }

    /// Records this cycle's probe result for `kind`.
    pub fn update(&mut self, kind: SensorKind, acked: bool) -> Transition {
        let prev = self.status[kind.index()];
        let next = if acked {
            SensorStatus::Connected
        } else {
            SensorStatus::Disconnected
        };
        self.status[kind.index()] = next;

        match (prev, next) {
            (SensorStatus::Disconnected, SensorStatus::Connected) => {
                self.reinit_count[kind.index()] += 1;
                efis_info!("{} connected, re-initialising", kind);
                Transition::Reconnected
            }
            (SensorStatus::Connected, SensorStatus::Disconnected) => {
                efis_warn!("{} disconnected", kind);
                Transition::Lost
            }
            _ => Transition::Unchanged,
        }
    }

    /// Overrides the probe result after a failed read in the same cycle.
    pub fn mark_disconnected(&mut self, kind: SensorKind) {
        if self.status[kind.index()].is_connected() {
            efis_warn!("{} read failed, marked disconnected", kind);
        }
        self.status[kind.index()] = SensorStatus::Disconnected;
    }
}
