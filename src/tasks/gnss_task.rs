use embassy_executor::task;
use embassy_futures::select::{select, Either};
use embassy_stm32::peripherals::{DMA1_CH1, DMA1_CH3, USART3};
use embassy_stm32::usart::Uart;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use embassy_time::{Duration, Timer};

pub type GnssUart = Uart<'static, USART3, DMA1_CH3, DMA1_CH1>;

/// Raw NMEA bytes, assembled into lines by the loop between cycles.
pub static GNSS_RX: Pipe<CriticalSectionRawMutex, 512> = Pipe::new();

/// GNSS task: moves receiver bursts from USART3 into [`GNSS_RX`].
#[task]
pub async fn gnss_task(mut uart: GnssUart) {
    let mut buf = [0u8; 256];

    loop {
        // 1 Hz receiver; a burst is a handful of sentences
        match select(
            uart.read_until_idle(&mut buf),
            Timer::after(Duration::from_millis(1100)),
        )
        .await
        {
            Either::First(Ok(n)) => {
                // overflow drops the tail; the assembler waits for the next '$'
                if GNSS_RX.try_write(&buf[..n]).map_or(true, |w| w < n) {
                    defmt::debug!("gnss pipe full");
                }
            }
            Either::First(Err(_)) | Either::Second(_) => {
                // framing error or silence
            }
        }
    }
}
