use efis_core::acquisition::Acquisition;
use efis_core::clock::Clock;
use efis_core::drivers::bmp180::Bmp180;
use efis_core::drivers::mpu6050::Mpu6050;
use efis_core::drivers::ms4525do::Ms4525do;
use efis_core::drivers::qmc5883l::Qmc5883l;
use efis_core::drivers::tca9548a::Tca9548a;
use efis_core::rtc::SoftRtc;
use efis_core::EfisContext;
use embassy_executor::task;
use embassy_futures::select::{select3, Either3};
use embassy_time::{Instant, Timer};
use heapless::String;

use crate::bus::{EmbassyClock, EmbassyDelay, Stm32Bus};
use crate::frontend::Frontend;
use crate::tasks::gnss_task::GNSS_RX;
use crate::usb::{self, HostTx, HOST_RX};

pub type SensorUnit =
    Acquisition<Stm32Bus, Tca9548a, EmbassyDelay, Frontend, Mpu6050, Qmc5883l, Bmp180, Ms4525do>;

/// Worst-case rendered frame, four full NMEA sentences included.
const FRAME_BYTES: usize = 1536;

/// The 10 Hz acquisition loop. Acquisition and air data run synchronously;
/// the rest of the period is spent draining the host and GNSS pipes.
#[task]
pub async fn efis_loop_task(
    mut ctx: EfisContext,
    mut unit: SensorUnit,
    mut rtc: SoftRtc<EmbassyClock>,
    mut host_tx: HostTx,
) {
    let clock = EmbassyClock;
    let mut host_buf = [0u8; 64];
    let mut gnss_buf = [0u8; 128];
    let mut frame: String<FRAME_BYTES> = String::new();

    loop {
        frame.clear();
        if ctx.run_cycle(&clock, &mut unit, &mut rtc, &mut frame).is_err() {
            defmt::warn!("frame truncated at {} bytes", frame.len());
        }
        if usb::write_frame(&mut host_tx, frame.as_bytes()).await.is_err() {
            defmt::debug!("frame dropped: host link down");
        }

        loop {
            let deadline = Instant::from_millis(ctx.governor().deadline_ms());
            let event = select3(
                HOST_RX.read(&mut host_buf),
                GNSS_RX.read(&mut gnss_buf),
                Timer::at(deadline),
            )
            .await;
            match event {
                Either3::First(n) => {
                    ctx.service_host_bytes(&host_buf[..n]);
                }
                Either3::Second(n) => ctx.service_gnss_bytes(&gnss_buf[..n]),
                Either3::Third(()) => {}
            }
            if ctx.governor().is_boundary(clock.now_ms()) {
                break;
            }
        }
    }
}
