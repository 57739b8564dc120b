//! Wi-Fi station bring-up.
//!
//! Connects to the configured access point so the HTTP UI is reachable.
//! Connectivity is best effort: the oven controller runs identically with
//! or without it, so a failed join is logged and boot continues.
//!
//! Credential validation is target-independent and tested on the host; the
//! actual driver calls are ESP-IDF-only.

use core::fmt;

/// Credential validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiError {
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
        }
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Validated station credentials.  The heapless capacities match the
/// embedded-svc `ClientConfiguration` field types.
#[derive(Debug, Clone)]
pub struct WifiCredentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, WifiError> {
        if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
            return Err(WifiError::InvalidSsid);
        }
        if !password.is_empty() && (password.len() < 8 || password.len() > 64) {
            return Err(WifiError::InvalidPassword);
        }

        let mut s = heapless::String::new();
        s.push_str(ssid).map_err(|()| WifiError::InvalidSsid)?;
        let mut p = heapless::String::new();
        p.push_str(password).map_err(|()| WifiError::InvalidPassword)?;
        Ok(Self { ssid: s, password: p })
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn is_open_network(&self) -> bool {
        self.password.is_empty()
    }
}

// ── ESP-IDF wiring ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod espidf {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sys::EspError;
    use esp_idf_svc::wifi::{
        AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi,
    };
    use log::info;

    use super::WifiCredentials;

    /// Join the configured AP and wait for an address.  The returned
    /// driver must be kept alive; dropping it tears the connection down.
    pub fn connect(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        creds: &WifiCredentials,
    ) -> Result<BlockingWifi<EspWifi<'static>>, EspError> {
        let mut wifi = BlockingWifi::wrap(
            EspWifi::new(modem, sysloop.clone(), Some(nvs))?,
            sysloop,
        )?;

        let auth_method = if creds.is_open_network() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: creds.ssid.clone(),
            password: creds.password.clone(),
            auth_method,
            ..Default::default()
        }))?;

        wifi.start()?;
        info!("wifi: joining '{}'", creds.ssid());
        wifi.connect()?;
        wifi.wait_netif_up()?;
        info!("wifi: connected");
        Ok(wifi)
    }
}

#[cfg(target_os = "espidf")]
pub use espidf::connect;
