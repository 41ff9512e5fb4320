use embassy_stm32::usb_otg::{self, Driver};
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use embassy_usb::class::cdc_acm::{CdcAcmClass, Receiver, Sender, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;

bind_interrupts!(pub struct Irqs {
    OTG_FS => usb_otg::InterruptHandler<peripherals::USB_OTG_FS>;
});

pub type UsbDriver = Driver<'static, peripherals::USB_OTG_FS>;
pub type HostTx = Sender<'static, UsbDriver>;
pub type HostRx = Receiver<'static, UsbDriver>;

const MAX_PACKET: usize = 64;

/// Settings bytes from the display, drained by the loop between cycles.
pub static HOST_RX: Pipe<CriticalSectionRawMutex, 256> = Pipe::new();

/// Descriptor and endpoint buffers the stack borrows for its lifetime.
pub struct UsbResources<'a> {
    config_desc: [u8; 256],
    bos_desc: [u8; 256],
    control_buf: [u8; 64],
    state: State<'a>,
    ep_out_buffer: [u8; 256],
}

impl<'a> UsbResources<'a> {
    pub fn new() -> Self {
        Self {
            config_desc: [0; 256],
            bos_desc: [0; 256],
            control_buf: [0; 64],
            state: State::new(),
            ep_out_buffer: [0; 256],
        }
    }
}

static USB_RES: StaticCell<UsbResources<'static>> = StaticCell::new();

#[embassy_executor::task]
pub async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    device.run().await
}

/// Forwards every OUT packet from the display into [`HOST_RX`]. Bytes that
/// do not fit are dropped; the settings parser resynchronises on the next
/// start byte.
#[embassy_executor::task]
pub async fn host_rx_task(mut rx: HostRx) -> ! {
    let mut buf = [0u8; MAX_PACKET];
    loop {
        rx.wait_connection().await;
        defmt::info!("host link up");
        loop {
            match rx.read_packet(&mut buf).await {
                Ok(n) => {
                    let _ = HOST_RX.try_write(&buf[..n]);
                }
                Err(EndpointError::Disabled) => break,
                Err(EndpointError::BufferOverflow) => {}
            }
        }
        defmt::info!("host link down");
    }
}

/// Sends one telemetry frame. Nothing is queued while no terminal holds
/// the port open.
pub async fn write_frame(tx: &mut HostTx, bytes: &[u8]) -> Result<(), EndpointError> {
    if !tx.dtr() {
        return Ok(());
    }
    for chunk in bytes.chunks(MAX_PACKET) {
        tx.write_packet(chunk).await?;
    }
    if !bytes.is_empty() && bytes.len() % MAX_PACKET == 0 {
        // short packet closes the transfer
        tx.write_packet(&[]).await?;
    }
    Ok(())
}

pub fn init(
    usb_periph: peripherals::USB_OTG_FS,
    pa12: peripherals::PA12,
    pa11: peripherals::PA11,
) -> (UsbDevice<'static, UsbDriver>, HostTx, HostRx) {
    let res = USB_RES.init(UsbResources::new());
    let driver_buf = &mut res.ep_out_buffer;
    let mut usb_config = embassy_stm32::usb_otg::Config::default();
    usb_config.vbus_detection = false;
    let driver = Driver::new_fs(usb_periph, Irqs, pa12, pa11, driver_buf, usb_config);

    let mut config = Config::new(0xc0de, 0xcafe);
    config.manufacturer = Some("EFIS");
    config.product = Some("EFIS Air Data Unit");
    config.serial_number = Some("12345678");

    let mut builder = Builder::new(
        driver,
        config,
        &mut res.config_desc,
        &mut res.bos_desc,
        &mut [], // msos_descs
        &mut res.control_buf,
    );

    let class = CdcAcmClass::new(&mut builder, &mut res.state, MAX_PACKET as u16);
    let usb = builder.build();
    let (tx, rx) = class.split();

    (usb, tx, rx)
}
