//! ieee802154-sniffer — promiscuous IEEE 802.15.4 capture firmware
//!
//! Puts the ESP32-C6/H2 802.15.4 radio into promiscuous mode and logs every
//! received frame. A line console on the USB-Serial-JTAG port starts and
//! stops reception and selects the channel.

#![no_std]
#![no_main]

use esp_backtrace as _;

esp_bootloader_esp_idf::esp_app_desc!();

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Instant;
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::usb_serial_jtag::UsbSerialJtag;
use esp_hal::Async;
use esp_radio::ieee802154::{Config, Ieee802154};

use ieee802154_sniffer::board;
use ieee802154_sniffer::capture::{CaptureSink, FormatConsumer};
use ieee802154_sniffer::channel::Channel;
use ieee802154_sniffer::config::{OutputFormat, SnifferConfig};
use ieee802154_sniffer::console::{Console, LineReader, EXIT_SUCCESS};
use ieee802154_sniffer::frame::{rssi_to_lqi, trailer_rssi, FrameInfo};
use ieee802154_sniffer::protocol::{to_msg_buffer, DeviceMessage, VERSION};
use ieee802154_sniffer::radio::{HardwareError, Radio, RadioController, RadioState};

/// ESP_ERR_INVALID_STATE
const ERR_INVALID_STATE: i32 = 0x103;

type Driver = Ieee802154<'static>;

// ── Shared driver and rx notification ────────────────────────────────

/// The radio driver, shared between the console (configuration) and the
/// capture task (draining received frames).
static DRIVER: Mutex<RefCell<Option<Driver>>> = Mutex::new(RefCell::new(None));

/// Raised by the driver whenever a received frame is available.
static RX_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Rx-available callback — called from interrupt context, must not block.
fn on_rx_available() {
    RX_SIGNAL.signal(());
}

// ── Radio adapter ────────────────────────────────────────────────────

/// Drives the esp-radio 802.15.4 driver through the [`Radio`] trait.
///
/// The driver is configured as a whole, so each setter updates the cached
/// `Config` and reapplies it. The driver has no power-down or sleep entry
/// point; `disable()` and `sleep()` park the receiver by clearing
/// rx-when-idle.
struct EspRadio {
    config: Config,
    state: RadioState,
}

impl EspRadio {
    fn new() -> Self {
        Self {
            config: Config {
                auto_ack_rx: false,
                auto_ack_tx: false,
                ..Default::default()
            },
            state: RadioState::Disabled,
        }
    }

    fn with_driver<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Driver) -> T,
    ) -> Result<T, HardwareError> {
        critical_section::with(|cs| {
            DRIVER
                .borrow_ref_mut(cs)
                .as_mut()
                .map(f)
                .ok_or(HardwareError::new(operation, ERR_INVALID_STATE))
        })
    }

    fn apply(&self, operation: &'static str) -> Result<(), HardwareError> {
        let config = self.config.clone();
        self.with_driver(operation, |driver| driver.set_config(config))
    }
}

impl Radio for EspRadio {
    fn enable(&mut self) -> Result<(), HardwareError> {
        self.apply("enable")?;
        self.state = RadioState::Idle;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), HardwareError> {
        self.config.rx_when_idle = false;
        self.apply("disable")?;
        self.state = RadioState::Disabled;
        Ok(())
    }

    fn set_promiscuous(&mut self, enabled: bool) -> Result<(), HardwareError> {
        self.config.promiscuous = enabled;
        self.apply("set_promiscuous")
    }

    fn set_rx_when_idle(&mut self, enabled: bool) -> Result<(), HardwareError> {
        self.config.rx_when_idle = enabled;
        self.apply("set_rx_when_idle")
    }

    fn set_channel(&mut self, channel: Channel) -> Result<(), HardwareError> {
        self.config.channel = channel.get();
        self.apply("set_channel")
    }

    fn receive(&mut self) -> Result<(), HardwareError> {
        self.with_driver("receive", |driver| driver.start_receive())?;
        self.state = RadioState::Receiving;
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), HardwareError> {
        self.config.rx_when_idle = false;
        self.apply("sleep")?;
        self.state = RadioState::Sleeping;
        Ok(())
    }

    fn get_state(&self) -> RadioState {
        self.state
    }
}

// ── Entry point ──────────────────────────────────────────────────────

#[esp_rtos::main]
async fn main(spawner: embassy_executor::Spawner) {
    esp_println::logger::init_logger_from_env();

    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_alloc::heap_allocator!(size: 64 * 1024);

    // Start the RTOS — requires timer + software interrupt
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);

    log::info!("ieee802154-sniffer v{} starting on {}", VERSION, board::BOARD_NAME);

    let config = SnifferConfig::new();

    let mut driver = Ieee802154::new(peripherals.IEEE802154);
    driver.set_rx_available_callback_fn(on_rx_available);
    critical_section::with(|cs| DRIVER.borrow(cs).replace(Some(driver)));

    // A radio that cannot come up leaves nothing to do.
    let mut controller = RadioController::new(EspRadio::new());
    controller
        .bring_up(&config)
        .expect("IEEE 802.15.4 radio bring-up failed");
    log::info!(
        "Radio enabled in {} mode on channel {}",
        if config.promiscuous { "promiscuous" } else { "filtered" },
        controller.channel()
    );

    if config.format == OutputFormat::Ndjson {
        let msg = DeviceMessage::Status {
            state: controller.state().as_str(),
            channel: controller.channel().get(),
            board: board::BOARD_NAME,
            version: VERSION,
        };
        if let Some(line) = to_msg_buffer(&msg) {
            write_ndjson(&line);
        }
    }

    spawner.spawn(capture_task(config.format)).unwrap();

    let usb = UsbSerialJtag::new(peripherals.USB_DEVICE).into_async();
    spawner
        .spawn(console_task(usb, Console::new(controller)))
        .unwrap();
}

/// Capture task — the only caller of `CaptureSink::on_frame`, so frames
/// are handled strictly one at a time.
#[embassy_executor::task]
async fn capture_task(format: OutputFormat) {
    log::info!("Capture task started");

    let mut sink = CaptureSink::new(FormatConsumer::new(format, write_ndjson as fn(&[u8])));

    loop {
        RX_SIGNAL.wait().await;

        while let Some(raw) = critical_section::with(|cs| {
            DRIVER
                .borrow_ref_mut(cs)
                .as_mut()
                .and_then(|driver| driver.raw_received())
        }) {
            let rssi = trailer_rssi(&raw.data);
            let info = FrameInfo {
                channel: raw.channel,
                rssi,
                lqi: rssi.map(rssi_to_lqi),
                timestamp_ms: (Instant::now().as_millis() & 0xFFFF_FFFF) as u32,
            };
            // Octet 0 of the driver buffer is the PHY length.
            sink.on_frame(&raw.data, raw.data[0] as usize, info);
        }
    }
}

fn write_ndjson(line: &[u8]) {
    if let Ok(s) = core::str::from_utf8(line) {
        esp_println::print!("{}", s);
    }
}

/// Console task — reads command lines from USB-Serial-JTAG and runs them.
#[embassy_executor::task]
async fn console_task(usb: UsbSerialJtag<'static, Async>, mut console: Console<EspRadio>) {
    let (mut rx, _tx) = usb.split();
    let mut reader = LineReader::new();
    let mut buf = [0u8; 64];

    esp_println::print!("{}", board::PROMPT);

    loop {
        let n = match embedded_io_async::Read::read(&mut rx, &mut buf).await {
            Ok(n) => n,
            Err(e) => {
                log::error!("Console read error: {:?}", e);
                continue;
            }
        };

        for &byte in &buf[..n] {
            if let Some(line) = reader.feed(byte) {
                let mut out = heapless::String::<512>::new();
                let code = console.execute(line, &mut out);
                esp_println::print!("{}", out);
                if code != EXIT_SUCCESS {
                    log::debug!("'{}' exited with {}", line, code);
                }
                esp_println::print!("{}", board::PROMPT);
            }
        }
    }
}
