//! Per-cycle sensor acquisition.
//!
//! Every cycle samples the discrete and analog inputs, then walks the four
//! bus sensors in a fixed order: select the mux channel, probe, update the
//! health record (re-initialising on a reconnect edge), settle, and read if
//! connected. A sensor that is disconnected, or whose read fails, leaves its
//! snapshot fields untouched.

use crate::bus::{BusChannel, BusMux, Delay, I2cBus};
use crate::config::EfisConfig;
use crate::health::{HealthMonitor, Transition};
use crate::sensor::{ImuRaw, Magnetometer, Sensor, SensorKind};
use crate::signals::{AdcChannel, SignalInputs, GROUND_CONTACTS};

/// Latest successfully read value of every measurement.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RawSnapshot {
    /// Weight-on-wheels per contact
    pub ground: [bool; GROUND_CONTACTS],
    /// Vane angle (deg)
    pub aoa_deg: f32,
    pub temp_ref_adc: u16,
    pub temp_out_adc: u16,
    /// Body acceleration (g)
    pub accel: [f32; 3],
    /// Body rate (°/s)
    pub gyro: [f32; 3],
    /// Geomagnetic vector (gauss)
    pub mag: [f32; 3],
    /// Static pressure (Pa)
    pub static_pa: f32,
    /// Differential pressure including the fixed error (Pa)
    pub diff_pa: f32,
}

/// One acquisition pass over every input.
pub trait Acquire {
    fn acquire(&mut self, health: &mut HealthMonitor, snapshot: &mut RawSnapshot, cfg: &EfisConfig);
}

/// The four bus sensors.
pub struct SensorSet<I, M, P, Q> {
    pub imu: I,
    pub mag: M,
    pub baro: P,
    pub diff: Q,
}

/// Owns the shared bus and everything hanging off it.
pub struct Acquisition<B, X, D, S, I, M, P, Q> {
    bus: B,
    mux: X,
    delay: D,
    signals: S,
    sensors: SensorSet<I, M, P, Q>,
}

impl<B, X, D, S, I, M, P, Q> Acquisition<B, X, D, S, I, M, P, Q>
where
    B: I2cBus,
    X: BusMux<B>,
    D: Delay,
    S: SignalInputs,
    I: Sensor<B, Raw = ImuRaw>,
    M: Magnetometer<B>,
    P: Sensor<B, Raw = f32>,
    Q: Sensor<B, Raw = f32>,
{
    pub fn new(bus: B, mux: X, delay: D, signals: S, sensors: SensorSet<I, M, P, Q>) -> Self {
        Self {
            bus,
            mux,
            delay,
            signals,
            sensors,
        }
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Selects `channel`, probes with `probe` and runs `init` on a
    /// reconnect edge. Returns whether the sensor may be read this cycle.
    fn check(
        &mut self,
        health: &mut HealthMonitor,
        kind: SensorKind,
        channel: BusChannel,
        cfg: &EfisConfig,
        probe: impl FnOnce(&mut SensorSet<I, M, P, Q>, &mut B) -> bool,
        init: impl FnOnce(&mut SensorSet<I, M, P, Q>, &mut B),
    ) -> bool {
        let acked = self.mux.select_channel(&mut self.bus, channel).is_ok()
            && probe(&mut self.sensors, &mut self.bus);
        if health.update(kind, acked) == Transition::Reconnected {
            init(&mut self.sensors, &mut self.bus);
        }
        self.delay.delay_ms(cfg.settle_delay_ms);
        acked
    }

    /// Re-selects the channel right before a read. A failing switch counts
    /// as a failed read.
    fn select(&mut self, channel: BusChannel) -> bool {
        self.mux.select_channel(&mut self.bus, channel).is_ok()
    }

    fn acquire_imu(&mut self, health: &mut HealthMonitor, snapshot: &mut RawSnapshot, cfg: &EfisConfig) {
        let channel = cfg.channels.imu;
        if !self.check(
            health,
            SensorKind::Imu,
            channel,
            cfg,
            |s, bus| s.imu.probe(bus),
            |s, bus| s.imu.init(bus),
        ) {
            return;
        }

        let read = if self.select(channel) {
            self.sensors.imu.read_raw(&mut self.bus, &mut self.delay).ok()
        } else {
            None
        };
        match read {
            Some(raw) => {
                snapshot.accel = cfg.imu.accel.apply(raw.accel);
                snapshot.gyro = cfg.imu.gyro.apply(raw.gyro);
            }
            None => health.mark_disconnected(SensorKind::Imu),
        }
    }

    fn acquire_mag(&mut self, health: &mut HealthMonitor, snapshot: &mut RawSnapshot, cfg: &EfisConfig) {
        let channel = cfg.channels.mag;
        if !self.check(
            health,
            SensorKind::Magnetometer,
            channel,
            cfg,
            |s, bus| s.mag.probe(bus),
            |s, bus| s.mag.init(bus),
        ) {
            return;
        }

        if !self.select(channel) || !self.mag_ready(cfg) {
            efis_debug!("magnetometer data not ready");
            health.mark_disconnected(SensorKind::Magnetometer);
            return;
        }

        match self.sensors.mag.read_raw(&mut self.bus, &mut self.delay) {
            Ok(raw) => snapshot.mag = cfg.mag.apply(raw),
            Err(_) => health.mark_disconnected(SensorKind::Magnetometer),
        }
    }

    /// Data-ready poll with a single delayed retry.
    fn mag_ready(&mut self, cfg: &EfisConfig) -> bool {
        if let Ok(true) = self.sensors.mag.data_ready(&mut self.bus) {
            return true;
        }
        self.delay.delay_ms(cfg.mag_retry_delay_ms);
        matches!(self.sensors.mag.data_ready(&mut self.bus), Ok(true))
    }

    fn acquire_baro(&mut self, health: &mut HealthMonitor, snapshot: &mut RawSnapshot, cfg: &EfisConfig) {
        let channel = cfg.channels.baro;
        if !self.check(
            health,
            SensorKind::StaticPressure,
            channel,
            cfg,
            |s, bus| s.baro.probe(bus),
            |s, bus| s.baro.init(bus),
        ) {
            return;
        }

        let read = if self.select(channel) {
            self.sensors.baro.read_raw(&mut self.bus, &mut self.delay).ok()
        } else {
            None
        };
        match read {
            Some(pa) => snapshot.static_pa = pa,
            None => health.mark_disconnected(SensorKind::StaticPressure),
        }
    }

    fn acquire_diff(&mut self, health: &mut HealthMonitor, snapshot: &mut RawSnapshot, cfg: &EfisConfig) {
        let channel = cfg.channels.diff;
        if !self.check(
            health,
            SensorKind::DifferentialPressure,
            channel,
            cfg,
            |s, bus| s.diff.probe(bus),
            |s, bus| s.diff.init(bus),
        ) {
            return;
        }

        let read = if self.select(channel) {
            self.sensors.diff.read_raw(&mut self.bus, &mut self.delay).ok()
        } else {
            None
        };
        match read {
            Some(pa) => snapshot.diff_pa = pa + cfg.diff_offset_pa,
            None => health.mark_disconnected(SensorKind::DifferentialPressure),
        }
    }
}

impl<B, X, D, S, I, M, P, Q> Acquire for Acquisition<B, X, D, S, I, M, P, Q>
where
    B: I2cBus,
    X: BusMux<B>,
    D: Delay,
    S: SignalInputs,
    I: Sensor<B, Raw = ImuRaw>,
    M: Magnetometer<B>,
    P: Sensor<B, Raw = f32>,
    Q: Sensor<B, Raw = f32>,
{
    /// Refreshes `snapshot` in place: discretes, analog channels, then the
    /// bus sensors in IMU, magnetometer, barometer, differential order.
    fn acquire(&mut self, health: &mut HealthMonitor, snapshot: &mut RawSnapshot, cfg: &EfisConfig) {
        snapshot.ground = self.signals.ground_contacts();

        snapshot.aoa_deg = cfg.analog.aoa_deg(self.signals.sample(AdcChannel::Aoa));
        snapshot.temp_ref_adc = self.signals.sample(AdcChannel::TempRef);
        snapshot.temp_out_adc = self.signals.sample(AdcChannel::TempOut);

        self.acquire_imu(health, snapshot, cfg);
        self.acquire_mag(health, snapshot, cfg);
        self.acquire_baro(health, snapshot, cfg);
        self.acquire_diff(health, snapshot, cfg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BusError, DirectBus, NoDelay};
    use crate::drivers::mock::{MockBus, Op};
    use crate::drivers::tca9548a::{Tca9548a, TCA9548A_ADDR};
    use crate::health::SensorStatus;
    use crate::signals::FixedSignals;

    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    /// Sensor with scripted presence and readings. `log` is shared so tests
    /// can inspect call order after the set is moved into the acquisition.
    struct Scripted<R: Copy> {
        present: bool,
        fail_read: bool,
        value: R,
        ready: Vec<bool>,
        inits: Rc<RefCell<u32>>,
    }

    impl<R: Copy> Scripted<R> {
        fn new(value: R) -> Self {
            Self {
                present: true,
                fail_read: false,
                value,
                ready: Vec::new(),
                inits: Rc::new(RefCell::new(0)),
            }
        }
    }

    impl<B: I2cBus, R: Copy> Sensor<B> for Scripted<R> {
        type Raw = R;

        fn probe(&mut self, _bus: &mut B) -> bool {
            self.present
        }

        fn init(&mut self, _bus: &mut B) {
            *self.inits.borrow_mut() += 1;
        }

        fn read_raw(&mut self, _bus: &mut B, _delay: &mut dyn Delay) -> Result<R, BusError> {
            if self.fail_read {
                Err(BusError::Nack)
            } else {
                Ok(self.value)
            }
        }
    }

    impl<B: I2cBus> Magnetometer<B> for Scripted<[i16; 3]> {
        fn data_ready(&mut self, _bus: &mut B) -> Result<bool, BusError> {
            if self.ready.is_empty() {
                Ok(true)
            } else {
                Ok(self.ready.remove(0))
            }
        }
    }

    /// Delay that records each requested wait.
    #[derive(Default)]
    struct RecordingDelay(Rc<RefCell<Vec<u32>>>);

    impl Delay for RecordingDelay {
        fn delay_ms(&mut self, ms: u32) {
            self.0.borrow_mut().push(ms);
        }
    }

    type Set = SensorSet<Scripted<ImuRaw>, Scripted<[i16; 3]>, Scripted<f32>, Scripted<f32>>;

    fn sensors() -> Set {
        SensorSet {
            imu: Scripted::new(ImuRaw {
                accel: [4096, 0, 0],
                gyro: [655, 0, 0],
            }),
            mag: Scripted::new([3000, 0, 0]),
            baro: Scripted::new(100_000.0),
            diff: Scripted::new(50.0),
        }
    }

    #[test]
    fn reads_and_calibrates_connected_sensors() {
        let signals = FixedSignals {
            aoa: 1023,
            temp_ref: 10,
            temp_out: 20,
            ground: [true, false, true],
        };
        let mut acq = Acquisition::new(MockBus::new(), DirectBus, NoDelay, signals, sensors());
        let mut health = HealthMonitor::new();
        let mut snap = RawSnapshot::default();
        let cfg = EfisConfig::default();

        acq.acquire(&mut health, &mut snap, &cfg);

        assert_eq!(snap.ground, [true, false, true]);
        assert!((snap.aoa_deg - 135.0).abs() < 1e-3);
        assert_eq!((snap.temp_ref_adc, snap.temp_out_adc), (10, 20));
        // swap Y/Z and invert X apply to the raw X axis
        assert!((snap.accel[0] + 1.0).abs() < 1e-6);
        assert!((snap.gyro[0] + 10.0).abs() < 1e-3);
        assert!((snap.mag[0] + 1.0).abs() < 1e-6);
        assert_eq!(snap.static_pa, 100_000.0);
        assert_eq!(snap.diff_pa, 40.0);
        for kind in SensorKind::ALL {
            assert!(health.is_connected(kind));
        }
    }

    #[test]
    fn disconnected_sensor_keeps_stale_values() {
        let mut set = sensors();
        set.baro.present = false;
        let mut acq = Acquisition::new(MockBus::new(), DirectBus, NoDelay, FixedSignals::default(), set);
        let mut health = HealthMonitor::new();
        let mut snap = RawSnapshot {
            static_pa: 95_000.0,
            ..RawSnapshot::default()
        };

        acq.acquire(&mut health, &mut snap, &EfisConfig::default());

        assert_eq!(snap.static_pa, 95_000.0);
        assert_eq!(health.status(SensorKind::StaticPressure), SensorStatus::Disconnected);
    }

    #[test]
    fn init_runs_once_per_reconnect() {
        let set = sensors();
        let inits = set.imu.inits.clone();
        let mut acq = Acquisition::new(MockBus::new(), DirectBus, NoDelay, FixedSignals::default(), set);
        let mut health = HealthMonitor::new();
        let mut snap = RawSnapshot::default();
        let cfg = EfisConfig::default();

        acq.acquire(&mut health, &mut snap, &cfg);
        acq.acquire(&mut health, &mut snap, &cfg);
        assert_eq!(*inits.borrow(), 1);
    }

    #[test]
    fn failed_read_forces_reinit_next_cycle() {
        let mut set = sensors();
        set.diff.fail_read = true;
        let inits = set.diff.inits.clone();
        let mut acq = Acquisition::new(MockBus::new(), DirectBus, NoDelay, FixedSignals::default(), set);
        let mut health = HealthMonitor::new();
        let mut snap = RawSnapshot::default();
        let cfg = EfisConfig::default();

        acq.acquire(&mut health, &mut snap, &cfg);
        assert!(!health.is_connected(SensorKind::DifferentialPressure));
        assert_eq!(snap.diff_pa, 0.0);

        acq.acquire(&mut health, &mut snap, &cfg);
        assert_eq!(*inits.borrow(), 2);
    }

    #[test]
    fn magnetometer_retries_once_after_delay() {
        let mut set = sensors();
        set.mag.ready = std::vec![false, true];
        let waits = Rc::new(RefCell::new(Vec::new()));
        let mut acq = Acquisition::new(
            MockBus::new(),
            DirectBus,
            RecordingDelay(waits.clone()),
            FixedSignals::default(),
            set,
        );
        let mut health = HealthMonitor::new();
        let mut snap = RawSnapshot::default();
        let cfg = EfisConfig::default();

        acq.acquire(&mut health, &mut snap, &cfg);

        assert!(health.is_connected(SensorKind::Magnetometer));
        assert!((snap.mag[0] + 1.0).abs() < 1e-6);
        // imu settle, mag settle, retry, baro settle, diff settle
        assert_eq!(*waits.borrow(), std::vec![1, 1, 2, 1, 1]);
    }

    #[test]
    fn magnetometer_not_ready_twice_marks_disconnected() {
        let mut set = sensors();
        set.mag.ready = std::vec![false, false];
        let mut acq = Acquisition::new(MockBus::new(), DirectBus, NoDelay, FixedSignals::default(), set);
        let mut health = HealthMonitor::new();
        let mut snap = RawSnapshot {
            mag: [0.5, 0.5, 0.5],
            ..RawSnapshot::default()
        };

        acq.acquire(&mut health, &mut snap, &EfisConfig::default());

        assert!(!health.is_connected(SensorKind::Magnetometer));
        assert_eq!(snap.mag, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn channel_select_precedes_each_sensor() {
        let mut bus = MockBus::new();
        bus.attach(TCA9548A_ADDR);
        let mut acq = Acquisition::new(bus, Tca9548a::new(), NoDelay, FixedSignals::default(), sensors());
        let mut health = HealthMonitor::new();
        let mut snap = RawSnapshot::default();

        acq.acquire(&mut health, &mut snap, &EfisConfig::default());

        let masks: Vec<u8> = acq
            .bus_mut()
            .ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Write(TCA9548A_ADDR, bytes) => bytes.first().copied(),
                _ => None,
            })
            .collect();
        // probe select then read select per sensor: IMU 1, mag 2, baro 5, diff 6
        assert_eq!(
            masks,
            std::vec![0x02, 0x02, 0x04, 0x04, 0x20, 0x20, 0x40, 0x40]
        );
    }

    #[test]
    fn missing_switch_reads_as_disconnected() {
        let mut acq = Acquisition::new(
            MockBus::new(),
            Tca9548a::new(),
            NoDelay,
            FixedSignals::default(),
            sensors(),
        );
        let mut health = HealthMonitor::new();
        let mut snap = RawSnapshot::default();

        acq.acquire(&mut health, &mut snap, &EfisConfig::default());

        for kind in SensorKind::ALL {
            assert!(!health.is_connected(kind));
        }
    }
}
