#![no_std]
#![no_main]

mod board;
mod bus;
mod frontend;
mod tasks;
mod usb;

use efis_core::acquisition::{Acquisition, SensorSet};
use efis_core::drivers::bmp180::Bmp180;
use efis_core::drivers::mpu6050::Mpu6050;
use efis_core::drivers::ms4525do::Ms4525do;
use efis_core::drivers::qmc5883l::Qmc5883l;
use efis_core::drivers::tca9548a::Tca9548a;
use efis_core::rtc::SoftRtc;
use efis_core::EfisContext;
use embassy_executor::Spawner;
use embassy_stm32::adc::Adc;
use embassy_stm32::gpio::{Input, Level, Output, Pin, Pull, Speed};
use embassy_stm32::i2c::I2c;
use embassy_stm32::time::Hertz as TimeHertz;
use embassy_stm32::usart::{Config as UsartConfig, Uart};
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_time::{Delay, Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

use crate::board::Board;
use crate::bus::{EmbassyClock, EmbassyDelay, Stm32Bus};
use crate::frontend::Frontend;
use crate::tasks::efis_loop::efis_loop_task;
use crate::tasks::gnss_task::gnss_task;

/// GNSS receiver default rate.
const GNSS_BAUDRATE: u32 = 9_600;

bind_interrupts!(struct Irqs {
    I2C1_EV  => embassy_stm32::i2c::EventInterruptHandler<peripherals::I2C1>;
    I2C1_ER  => embassy_stm32::i2c::ErrorInterruptHandler<peripherals::I2C1>;
    USART3   => embassy_stm32::usart::InterruptHandler<peripherals::USART3>;
});

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // 1. Board init (168 MHz PLL)
    let board = Board::init();
    let p = board.p;
    defmt::info!("efis-mcu starting");

    // 2. USB CDC-ACM link to the display
    let (usb_dev, host_tx, host_rx) = usb::init(p.USB_OTG_FS, p.PA12, p.PA11);
    spawner.spawn(usb::usb_task(usb_dev)).unwrap();
    spawner.spawn(usb::host_rx_task(host_rx)).unwrap();

    // 3. I2C1 @ 100 kHz to the TCA9548A switch (SCL=PB8, SDA=PB9)
    let i2c = I2c::new(
        p.I2C1,
        p.PB8, p.PB9,
        Irqs,
        p.DMA1_CH7,
        p.DMA1_CH0,
        TimeHertz(100_000),
        Default::default(),
    );

    // 4. Analog front end: AOA on PC0, temperature ref/out on PC1/PC2,
    //    air/ground contacts on PC6..PC8 (closed to ground = on ground)
    let adc = Adc::new(p.ADC1, &mut Delay);
    let ground = [
        Input::new(p.PC6.degrade(), Pull::Up),
        Input::new(p.PC7.degrade(), Pull::Up),
        Input::new(p.PC8.degrade(), Pull::Up),
    ];
    let frontend = Frontend::new(adc, p.PC0, p.PC1, p.PC2, ground);

    // 5. GNSS USART3 (TX=PB10, RX=PB11)
    let mut gnss_config = UsartConfig::default();
    gnss_config.baudrate = GNSS_BAUDRATE;
    let gnss_uart = Uart::new(
        p.USART3, p.PB11, p.PB10,
        Irqs,
        p.DMA1_CH3, p.DMA1_CH1,
        gnss_config,
    ).unwrap();

    // 6. Heartbeat LED (PC13)
    let mut led = Output::new(p.PC13, Level::High, Speed::Low);

    // 7. Sensors come up on the first cycle that probes them
    Timer::after(Duration::from_millis(100)).await;
    let unit = Acquisition::new(
        Stm32Bus::new(i2c),
        Tca9548a::new(),
        EmbassyDelay,
        frontend,
        SensorSet {
            imu: Mpu6050::new(),
            mag: Qmc5883l::new(),
            baro: Bmp180::new(),
            diff: Ms4525do::new(),
        },
    );
    let ctx = EfisContext::new(board::efis_config());

    // 8. Spawn tasks
    spawner.spawn(gnss_task(gnss_uart)).unwrap();
    spawner.spawn(efis_loop_task(
        ctx,
        unit,
        SoftRtc::new(EmbassyClock),
        host_tx,
    )).unwrap();

    // 9. Main task: LED heartbeat @ 1 Hz
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(500)).await;
    }
}
