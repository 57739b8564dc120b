//! Oven firmware — main entry point.
//!
//! Boot order matters: peripherals and the control loop come up before any
//! network service, and a failure in sensing/actuation bring-up halts boot
//! outright — the oven must never run with partial control.
//!
//! ```text
//! hw_init ─▶ controller + control task ─▶ ZCD ISR ─▶ WiFi ─▶ HTTP ─▶ console
//!  (fatal)                                (fatal)    (best effort)  (parks)
//! ```

#![deny(unused_must_use)]

use anyhow::{anyhow, Result};
use log::{error, info, warn};

use reflowctl::config::OvenConfig;
use reflowctl::drivers::hw_init;
use reflowctl::oven::OvenController;
use reflowctl::{console, server, wifi};

/// Station credentials, baked in at build time.  Leave the SSID unset to
/// run the oven standalone (console only).
const WIFI_SSID: &str = match option_env!("REFLOW_WIFI_SSID") {
    Some(ssid) => ssid,
    None => "",
};
const WIFI_PASSWORD: &str = match option_env!("REFLOW_WIFI_PASSWORD") {
    Some(password) => password,
    None => "",
};

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("reflowctl v{} booting", env!("CARGO_PKG_VERSION"));

    // ── 1. Peripherals (fatal on failure) ─────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        error!("hardware init failed: {} — cannot run without sensing/actuation", e);
        return Err(anyhow!("hardware init failed: {e}"));
    }

    // ── 2. Controller + control task ──────────────────────────
    let config = OvenConfig::default();
    let (controller, oven) = OvenController::new(&config);
    let _control_task = controller
        .spawn()
        .map_err(|e| anyhow!("control task spawn failed: {e}"))?;

    // The modulator is configured by the controller constructor; only now
    // may the zero-cross edge start firing.
    hw_init::init_isr_service().map_err(|e| anyhow!("zero-cross ISR install failed: {e}"))?;

    // ── 3. Network + UI (best effort — the oven runs standalone) ──
    let mut _net = None;
    match wifi::WifiCredentials::new(WIFI_SSID, WIFI_PASSWORD) {
        Ok(creds) => {
            let joined = (|| -> Result<_> {
                let peripherals = esp_idf_svc::hal::peripherals::Peripherals::take()?;
                let sysloop = esp_idf_svc::eventloop::EspSystemEventLoop::take()?;
                let nvs = esp_idf_svc::nvs::EspDefaultNvsPartition::take()?;
                Ok(wifi::connect(peripherals.modem, sysloop, nvs, &creds)?)
            })();
            match joined {
                Ok(conn) => {
                    if let Err(e) = server::mount_spiffs() {
                        warn!("SPIFFS unavailable ({}), UI will 404", e);
                    }
                    match server::start(oven.clone()) {
                        Ok(http) => _net = Some((conn, http)),
                        Err(e) => warn!("HTTP server failed to start: {e:?}"),
                    }
                }
                Err(e) => warn!("wifi join failed ({e:?}), continuing offline"),
            }
        }
        Err(e) => info!("no usable WiFi credentials ({}), running offline", e),
    }

    // ── 4. Operator console (parks the main task forever) ─────
    console::run(&oven)
}
