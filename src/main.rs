//! Hangline firmware — main entry point.
//!
//! Hexagonal architecture: the adapters below are the only code touching
//! hardware or the network; everything inside [`AppService`] is pure logic
//! shared with the host test suite.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  HardwareAdapter    LogEventSink   NvsAdapter   Esp32Clock   │
//! │  (Sensor+Actuator)  (EventSink)    (Config+NVS) (Clock)      │
//! │  HttpRemoteAdapter                                           │
//! │  (cloud record)                                              │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ────────────────────    │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │            AppService (pure logic)                 │      │
//! │  │  Arbiter · PositionDriver · Occupancy · Supervisor │      │
//! │  └────────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use hangline::adapters::device_id;
use hangline::adapters::hardware::HardwareAdapter;
use hangline::adapters::log_sink::LogEventSink;
use hangline::adapters::nvs::NvsAdapter;
use hangline::adapters::remote::HttpRemoteAdapter;
use hangline::adapters::time::Esp32Clock;
use hangline::app::ports::{Clock, ConfigPort, StoragePort};
use hangline::app::service::AppService;
use hangline::config::SystemConfig;
use hangline::drivers::hw_init;
use hangline::pins;

/// RTDB-style backend root.  Overridable at build time.
const BACKEND_URL: &str = match option_env!("HANGLINE_BACKEND_URL") {
    Some(url) => url,
    None => "https://hangline-default-rtdb.firebaseio.com",
};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("hangline v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Hardware peripherals ───────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 3. Config from NVS (or defaults) ──────────────────────
    let mut nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running without persistence", e);
            return Err(anyhow::anyhow!("NVS unavailable"));
        }
    };

    // Boot button held low at power-up: factory-reset the stored config.
    if !hw_init::gpio_read(pins::CONFIG_BUTTON_GPIO) {
        warn!("config button held at boot: clearing stored configuration");
        if let Err(e) = nvs.delete("hangline", "syscfg") {
            warn!("config reset failed: {}", e);
        }
    }

    let config = match nvs.load() {
        Ok(cfg) => {
            info!("config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 4. Adapters ───────────────────────────────────────────
    let mut clock = Esp32Clock::new();
    let mut hw = HardwareAdapter::with_default_pins();
    let mut sink = LogEventSink::new();

    let mac = device_id::read_mac();
    let dev_id = device_id::device_id(&mac);
    info!("device ID: {}", dev_id);

    let mut remote = HttpRemoteAdapter::new(BACKEND_URL, dev_id.as_str());

    // ── 5. App service ────────────────────────────────────────
    let mut app = AppService::new(config);
    app.start(&mut hw, &clock, &mut sink);
    app.register(&mut remote, dev_id.as_str());

    info!("system ready, entering control loop");

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        app.cycle(&mut hw, &mut clock, &mut sink, &mut remote, &mut nvs);
        let interval = app.cycle_interval_ms();
        clock.sleep_ms(interval);
    }
}
