//! Process-wide state of the sensor unit, passed by reference through the
//! cycle.
//!
//! A cycle is [`EfisContext::run_cycle`] followed by an idle wait that keeps
//! draining host and GNSS bytes until the next boundary. The firmware does
//! the wait with async timers; [`EfisContext::idle_until_boundary`] is the
//! blocking form.

use core::fmt::Write;

use crate::acquisition::{Acquire, RawSnapshot};
use crate::airdata::{self, AirDataState};
use crate::clock::Clock;
use crate::config::EfisConfig;
use crate::gnss::{GnssCache, NmeaAssembler};
use crate::governor::Governor;
use crate::health::HealthMonitor;
use crate::rtc::Rtc;
use crate::settings::{Settings, SettingsParser};
use crate::telemetry::{build_frame, write_frame, FrameInputs};

/// Non-blocking byte source (host link, GNSS UART).
pub trait ByteSource {
    /// Copies whatever is pending into `buf`, returning the count. Zero when
    /// nothing is waiting.
    fn read_available(&mut self, buf: &mut [u8]) -> usize;
}

pub struct EfisContext {
    pub config: EfisConfig,
    pub health: HealthMonitor,
    pub snapshot: RawSnapshot,
    pub settings: Settings,
    pub air: AirDataState,
    pub gnss: GnssCache,
    settings_rx: SettingsParser,
    nmea: NmeaAssembler,
    governor: Governor,
}

impl EfisContext {
    pub fn new(config: EfisConfig) -> Self {
        Self {
            governor: Governor::new(config.loop_period_ms),
            config,
            health: HealthMonitor::new(),
            snapshot: RawSnapshot::default(),
            settings: Settings::default(),
            air: AirDataState::default(),
            gnss: GnssCache::new(),
            settings_rx: SettingsParser::new(),
            nmea: NmeaAssembler::new(),
        }
    }

    pub fn governor(&self) -> &Governor {
        &self.governor
    }

    /// One full cycle: pending RTC set, acquisition, air data, and the
    /// telemetry frame written to `out`.
    pub fn run_cycle<C, A, R, W>(
        &mut self,
        clock: &C,
        acq: &mut A,
        rtc: &mut R,
        out: &mut W,
    ) -> core::fmt::Result
    where
        C: Clock,
        A: Acquire,
        R: Rtc,
        W: Write,
    {
        let start = clock.now_ms();
        self.governor.start_cycle(start);

        if let Some(time) = self.settings.pending_rtc.take() {
            if !rtc.set_time(time) {
                efis_warn!("rtc rejected set-time");
            }
        }

        acq.acquire(&mut self.health, &mut self.snapshot, &self.config);
        self.air = airdata::compute(
            &self.snapshot,
            &self.settings,
            &self.air,
            &self.config,
            clock.now_ms(),
        );

        let frame = build_frame(&FrameInputs {
            busy_ms: self.governor.last_busy_ms(),
            time: rtc.current_time(),
            settings: &self.settings,
            snapshot: &self.snapshot,
            health: &self.health,
            air: &self.air.data,
            gnss: &self.gnss,
        });
        let written = write_frame(&frame, out);

        self.governor.finish_work(clock.now_ms());
        written
    }

    /// Feeds host-link bytes to the settings parser. Returns the number of
    /// frames closed.
    pub fn service_host_bytes(&mut self, bytes: &[u8]) -> usize {
        self.settings_rx.feed_all(bytes, &mut self.settings)
    }

    pub fn service_gnss_bytes(&mut self, bytes: &[u8]) {
        self.nmea.push_data(bytes, &mut self.gnss);
    }

    /// Blocking idle wait: drains both sources until the period elapses.
    pub fn idle_until_boundary<C, H, G>(&mut self, clock: &C, host: &mut H, gnss: &mut G) -> u64
    where
        C: Clock,
        H: ByteSource,
        G: ByteSource,
    {
        let Self {
            governor,
            settings_rx,
            settings,
            nmea,
            gnss: cache,
            ..
        } = self;
        let mut buf = [0u8; 64];
        governor.idle_until_boundary(clock, || {
            let n = host.read_available(&mut buf);
            settings_rx.feed_all(&buf[..n], settings);
            let n = gnss.read_available(&mut buf);
            nmea.push_data(&buf[..n], cache);
        })
    }
}

impl Default for EfisContext {
    fn default() -> Self {
        Self::new(EfisConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::rtc::{DateTime, SoftRtc};
    use crate::sensor::SensorKind;
    use std::string::String;

    /// Acquisition stand-in writing fixed readings for connected sensors.
    struct FixedAcquire {
        static_pa: f32,
    }

    impl Acquire for FixedAcquire {
        fn acquire(&mut self, health: &mut HealthMonitor, snapshot: &mut RawSnapshot, _cfg: &EfisConfig) {
            health.update(SensorKind::StaticPressure, true);
            snapshot.accel = [0.0, 1.0, 0.0];
            snapshot.static_pa = self.static_pa;
        }
    }

    #[test]
    fn pending_rtc_is_applied_on_next_cycle() {
        let clock = MockClock::new();
        let mut rtc = SoftRtc::new(&clock);
        let mut ctx = EfisContext::default();
        let mut acq = FixedAcquire { static_pa: 101_325.0 };

        ctx.service_host_bytes(b"#!rtc=2024-05-01T10:00:00Z+");
        assert!(ctx.settings.pending_rtc.is_some());

        let mut out = String::new();
        ctx.run_cycle(&clock, &mut acq, &mut rtc, &mut out).unwrap();
        assert!(out.contains("@2024-05-01T10:00:00Z\r\n"));
        assert_eq!(ctx.settings.pending_rtc, None);
        assert_eq!(rtc.current_time(), DateTime::new(2024, 5, 1, 10, 0, 0));
    }

    #[test]
    fn busy_time_is_reported_one_frame_late() {
        let clock = MockClock::new();
        let mut rtc = crate::rtc::NoRtc;
        let mut ctx = EfisContext::default();
        let mut acq = FixedAcquire { static_pa: 101_325.0 };

        let mut out = String::new();
        ctx.run_cycle(&clock, &mut acq, &mut rtc, &mut out).unwrap();
        assert!(out.starts_with("#\r\n/i=0\r\n"));
        clock.advance(100);

        struct Slow<'a>(&'a MockClock, FixedAcquire);
        impl Acquire for Slow<'_> {
            fn acquire(&mut self, h: &mut HealthMonitor, s: &mut RawSnapshot, c: &EfisConfig) {
                self.0.advance(17);
                self.1.acquire(h, s, c);
            }
        }
        let mut slow = Slow(&clock, FixedAcquire { static_pa: 101_325.0 });
        out.clear();
        ctx.run_cycle(&clock, &mut slow, &mut rtc, &mut out).unwrap();
        assert!(out.starts_with("#\r\n/i=0\r\n"));
        assert_eq!(ctx.governor().last_busy_ms(), 17);

        out.clear();
        ctx.run_cycle(&clock, &mut acq, &mut rtc, &mut out).unwrap();
        assert!(out.starts_with("#\r\n/i=17\r\n"));
    }

    struct Script<'a> {
        chunks: std::vec::Vec<&'a [u8]>,
    }

    impl ByteSource for Script<'_> {
        fn read_available(&mut self, buf: &mut [u8]) -> usize {
            if self.chunks.is_empty() {
                return 0;
            }
            let chunk = self.chunks.remove(0);
            buf[..chunk.len()].copy_from_slice(chunk);
            chunk.len()
        }
    }

    /// Clock that moves forward every time it is read.
    struct Ticking(core::cell::Cell<u64>);

    impl Clock for Ticking {
        fn now_ms(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 10);
            t
        }
    }

    #[test]
    fn idle_wait_drains_host_and_gnss() {
        let clock = Ticking(core::cell::Cell::new(0));
        let mut ctx = EfisContext::default();
        ctx.governor.start_cycle(0);
        let mut host = Script {
            chunks: std::vec![&b"#!atg="[..], &b"100500+"[..]],
        };
        let mut gnss = Script {
            chunks: std::vec![&b"$GNVTG,,T,,M,0.0,N,0.0,K\r\n"[..]],
        };
        let at = ctx.idle_until_boundary(&clock, &mut host, &mut gnss);
        assert!(at >= 100);
        assert_eq!(ctx.settings.alt_setting_pa, 100_500.0);
        assert_eq!(
            ctx.gnss.sentence(crate::gnss::SentenceKind::Vtg),
            "$GNVTG,,T,,M,0.0,N,0.0,K"
        );
    }
}
