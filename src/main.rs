//! Scoring bracelet firmware, main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  ButtonPins     MqttLink      NvsAdapter     SystemClock     │
//! │  (ButtonPort)   (PubSubPort)  (Storage+Cfg)  (ClockPort)     │
//! │  LogEventSink + LedIndicator  (EventSink fan-out)            │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                                              │
//! │  ┌──────────────────────────────────────────────────────┐    │
//! │  │        DeviceState (pure logic)                      │    │
//! │  │  InputTracker · Pairing FSM · TransportSession       │    │
//! │  └──────────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use anyhow::{Result, anyhow};
use log::{info, warn};

use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, PinDriver, Pull};
use esp_idf_hal::modem::Modem;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use bracelet::adapters::device_id;
use bracelet::adapters::hardware::ButtonPins;
use bracelet::adapters::indicator::LedIndicator;
use bracelet::adapters::log_sink::LogEventSink;
use bracelet::adapters::mqtt::{MqttLink, MqttSettings};
use bracelet::adapters::nvs::NvsAdapter;
use bracelet::adapters::time::SystemClock;
use bracelet::app::events::AppEvent;
use bracelet::app::ports::{ClockPort, ConfigPort, EventSink};
use bracelet::app::service::DeviceState;
use bracelet::config::BraceletConfig;
use bracelet::drivers::status_led::StatusLed;
use bracelet::error::Error;
use bracelet::pins;

const WIFI_CONNECT_ATTEMPTS: u32 = 5;
const WIFI_RETRY_DELAY_MS: u32 = 2_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("Bracelet v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let mut clock = SystemClock::new();

    // ── 2. Storage + config ───────────────────────────────────
    let (mut nvs, storage_fault) = match NvsAdapter::new() {
        Ok(nvs) => (nvs, None),
        Err(e) => {
            warn!("NVS init failed ({}), running without persistence", e);
            (NvsAdapter::unmounted(), Some(e))
        }
    };
    let config = nvs.load().unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        BraceletConfig::default()
    });

    // ── 3. Identity ───────────────────────────────────────────
    let id = device_id::device_id(&device_id::read_mac());
    info!("Device id: {}", id);

    // ── 4. Network ────────────────────────────────────────────
    let _wifi = connect_wifi(peripherals.modem, sys_loop, &mut clock)?;

    // ── 5. GPIO ───────────────────────────────────────────────
    // SAFETY: the pin numbers come from `pins` and each is claimed once.
    let mut increment = PinDriver::input(unsafe { AnyIOPin::new(pins::BUTTON_INCREMENT_GPIO) })?;
    increment.set_pull(Pull::Up)?;
    let mut decrement = PinDriver::input(unsafe { AnyIOPin::new(pins::BUTTON_DECREMENT_GPIO) })?;
    decrement.set_pull(Pull::Up)?;
    let mut buttons = ButtonPins::new(increment, decrement);

    let led_pin = PinDriver::output(unsafe { AnyOutputPin::new(pins::STATUS_LED_GPIO) })?;
    let mut sink = (LogEventSink::new(), LedIndicator::new(StatusLed::new(led_pin)));
    if let Some(e) = storage_fault {
        sink.emit(&AppEvent::Fault(Error::StorageUnavailable(e)));
    }

    // ── 6. Core ───────────────────────────────────────────────
    let mut link = MqttLink::new(MqttSettings::default());
    let loop_interval_ms = config.loop_interval_ms;
    let mut device = DeviceState::new(config, id);
    device.start(&nvs, &mut sink);

    // ── 7. Main loop ──────────────────────────────────────────
    let mut last_ms = clock.now_ms();
    loop {
        device.step(&mut buttons, &mut link, &mut nvs, &mut clock, &mut sink);

        let now_ms = clock.now_ms();
        sink.1.tick(now_ms.saturating_sub(last_ms) as u32);
        last_ms = now_ms;

        clock.sleep_ms(loop_interval_ms);
    }
}

/// Station-mode bring-up with credentials fixed at build time.
fn connect_wifi(
    modem: Modem,
    sys_loop: EspSystemEventLoop,
    clock: &mut SystemClock,
) -> Result<EspWifi<'static>> {
    let ssid = option_env!("BRACELET_WIFI_SSID").unwrap_or("");
    let pass = option_env!("BRACELET_WIFI_PASS").unwrap_or("");

    let mut esp_wifi = EspWifi::new(modem, sys_loop.clone(), None)?;
    let mut wifi = BlockingWifi::wrap(&mut esp_wifi, sys_loop)?;

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid.try_into().map_err(|_| anyhow!("wifi ssid too long"))?,
        password: pass.try_into().map_err(|_| anyhow!("wifi password too long"))?,
        auth_method: if pass.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        },
        ..Default::default()
    }))?;
    wifi.start()?;

    let mut attempt = 1;
    loop {
        match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
            Ok(()) => {
                info!("WiFi: connected to '{}' on attempt {}", ssid, attempt);
                break;
            }
            Err(e) if attempt < WIFI_CONNECT_ATTEMPTS => {
                warn!("WiFi: attempt {} failed: {}", attempt, e);
                let _ = wifi.disconnect();
                clock.sleep_ms(WIFI_RETRY_DELAY_MS);
                attempt += 1;
            }
            Err(e) => return Err(anyhow!("WiFi: giving up after {} attempts: {}", attempt, e)),
        }
    }

    drop(wifi);
    Ok(esp_wifi)
}
