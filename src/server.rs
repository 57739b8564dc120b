//! HTTP front end: status/control endpoints plus the static web UI.
//!
//! The handlers are thin — they parse, call one [`OvenHandle`] operation,
//! and shape the response.  All request/response shaping lives in pure
//! functions so it can be tested on the host; only the server wiring and
//! SPIFFS access are ESP-IDF-specific.
//!
//! Endpoints:
//! - `GET  /api/status`   → `{"current": <n|null>, "target": <n>, "running": <b>}`
//! - `POST /api/start`    ← `{"idx": <int>, "temp": <number>}`
//!   (400 malformed body, 422 unknown profile — controller state untouched)
//! - `POST /api/stop`
//! - `GET  /api/profiles` → JSON array of profile names
//! - `GET  /*`            → files from SPIFFS (`/` serves `index.html`)

use serde::Deserialize;

use crate::oven::OvenStatus;

/// Body of a start request.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StartRequest {
    pub idx: usize,
    pub temp: f32,
}

/// Parse a start request body; missing or mistyped fields are rejected
/// here, before anything reaches the controller.
pub fn parse_start_request(body: &[u8]) -> Result<StartRequest, serde_json::Error> {
    serde_json::from_slice(body)
}

/// Serialize the status record into its wire shape.
pub fn status_json(status: &OvenStatus) -> serde_json::Result<String> {
    serde_json::to_string(status)
}

/// Profile-name listing for the UI's profile picker.
pub fn profiles_json() -> serde_json::Result<String> {
    let names: Vec<&str> = crate::profile::PROFILES.iter().map(|p| p.name).collect();
    serde_json::to_string(&names)
}

/// Map a request URI onto the SPIFFS filesystem; `/` serves the UI entry
/// point.
pub fn resolve_path(uri: &str) -> String {
    if uri == "/" {
        format!("{SPIFFS_BASE}/index.html")
    } else {
        format!("{SPIFFS_BASE}{uri}")
    }
}

/// MIME type by file extension; unknown extensions are served as plain
/// text.
pub fn mime_for_path(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext {
        "html" => "text/html",
        "js" => "application/javascript",
        "css" => "text/css",
        "ico" => "image/x-icon",
        "png" => "image/png",
        "json" => "application/json",
        _ => "text/plain",
    }
}

const SPIFFS_BASE: &str = "/spiffs";

// ── ESP-IDF wiring ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod espidf {
    use std::fs::File;
    use std::io::Read as _;

    use esp_idf_svc::http::server::{Configuration, EspHttpServer};
    use esp_idf_svc::http::Method;
    use esp_idf_svc::io::{Read as _, Write};
    use esp_idf_svc::sys::{esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register, ESP_OK};
    use log::info;

    use super::{
        mime_for_path, parse_start_request, profiles_json, resolve_path, status_json, SPIFFS_BASE,
    };
    use crate::error::InitError;
    use crate::oven::OvenHandle;

    /// Mount the SPIFFS partition holding the web UI.
    pub fn mount_spiffs() -> Result<(), InitError> {
        let conf = esp_vfs_spiffs_conf_t {
            base_path: c"/spiffs".as_ptr(),
            partition_label: core::ptr::null(),
            max_files: 8,
            format_if_mount_failed: true,
        };
        // SAFETY: conf and its strings outlive the call; registration is a
        // one-shot at boot.
        let ret = unsafe { esp_vfs_spiffs_register(&conf) };
        if ret != ESP_OK as i32 {
            return Err(InitError::SpiffsMountFailed(ret));
        }
        info!("server: SPIFFS mounted at {}", SPIFFS_BASE);
        Ok(())
    }

    /// Start the HTTP server.  The returned server must be kept alive for
    /// the process lifetime; dropping it unregisters every handler.
    pub fn start(oven: OvenHandle) -> anyhow::Result<EspHttpServer<'static>> {
        let mut server = EspHttpServer::new(&Configuration {
            uri_match_wildcard: true,
            ..Default::default()
        })?;

        // API routes must be registered before the wildcard file handler:
        // esp-idf matches in registration order.

        let h = oven.clone();
        server.fn_handler("/api/status", Method::Get, move |req| -> anyhow::Result<()> {
            let body = status_json(&h.status())?;
            let mut resp = req.into_response(
                200,
                Some("OK"),
                &[("Content-Type", "application/json")],
            )?;
            resp.write_all(body.as_bytes())?;
            Ok(())
        })?;

        let h = oven.clone();
        server.fn_handler("/api/start", Method::Post, move |mut req| -> anyhow::Result<()> {
            let mut buf = [0u8; 256];
            let mut len = 0;
            loop {
                let n = req.read(&mut buf[len..])?;
                if n == 0 {
                    break;
                }
                len += n;
                if len == buf.len() {
                    break;
                }
            }

            match parse_start_request(&buf[..len]) {
                Ok(start) if h.start(start.idx, start.temp) => {
                    req.into_ok_response()?;
                }
                Ok(_) => {
                    req.into_status_response(422)?;
                }
                Err(_) => {
                    req.into_status_response(400)?;
                }
            }
            Ok(())
        })?;

        let h = oven.clone();
        server.fn_handler("/api/stop", Method::Post, move |req| -> anyhow::Result<()> {
            h.stop();
            req.into_ok_response()?;
            Ok(())
        })?;

        server.fn_handler("/api/profiles", Method::Get, move |req| -> anyhow::Result<()> {
            let body = profiles_json()?;
            let mut resp = req.into_response(
                200,
                Some("OK"),
                &[("Content-Type", "application/json")],
            )?;
            resp.write_all(body.as_bytes())?;
            Ok(())
        })?;

        server.fn_handler("/*", Method::Get, move |req| -> anyhow::Result<()> {
            let path = resolve_path(req.uri());
            let Ok(mut file) = File::open(&path) else {
                req.into_status_response(404)?;
                return Ok(());
            };

            let mime = mime_for_path(&path);
            let mut resp = req.into_response(200, Some("OK"), &[("Content-Type", mime)])?;

            let mut chunk = vec![0u8; 4096];
            loop {
                let n = file.read(&mut chunk)?;
                if n == 0 {
                    break;
                }
                resp.write_all(&chunk[..n])?;
            }
            Ok(())
        })?;

        info!("server: HTTP up (api + static UI)");
        Ok(server)
    }
}

#[cfg(target_os = "espidf")]
pub use espidf::{mount_spiffs, start};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_start_request() {
        let req = parse_start_request(br#"{"idx": 1, "temp": 0.0}"#).unwrap();
        assert_eq!(req.idx, 1);
        assert_eq!(req.temp, 0.0);

        let req = parse_start_request(br#"{"idx": 0, "temp": 182.5}"#).unwrap();
        assert_eq!(req.idx, 0);
        assert!((req.temp - 182.5).abs() < 1e-6);
    }

    #[test]
    fn rejects_malformed_start_requests() {
        assert!(parse_start_request(b"").is_err());
        assert!(parse_start_request(b"not json").is_err());
        assert!(parse_start_request(br#"{"idx": 1}"#).is_err());
        assert!(parse_start_request(br#"{"temp": 100.0}"#).is_err());
        assert!(parse_start_request(br#"{"idx": "manual", "temp": 100.0}"#).is_err());
        assert!(parse_start_request(br#"{"idx": -1, "temp": 100.0}"#).is_err());
    }

    #[test]
    fn status_wire_shape() {
        let json = status_json(&crate::oven::OvenStatus {
            current: 24.5,
            target: 150.0,
            running: true,
        })
        .unwrap();
        assert_eq!(json, r#"{"current":24.5,"target":150.0,"running":true}"#);
    }

    #[test]
    fn faulted_reading_serializes_as_null() {
        let json = status_json(&crate::oven::OvenStatus {
            current: f32::NAN,
            target: 25.0,
            running: false,
        })
        .unwrap();
        assert_eq!(json, r#"{"current":null,"target":25.0,"running":false}"#);
    }

    #[test]
    fn profiles_listing_matches_table() {
        assert_eq!(profiles_json().unwrap(), r#"["Manual","SAC305","Sn63/Pb37"]"#);
    }

    #[test]
    fn uri_resolution() {
        assert_eq!(resolve_path("/"), "/spiffs/index.html");
        assert_eq!(resolve_path("/app.js"), "/spiffs/app.js");
        assert_eq!(resolve_path("/assets/logo.png"), "/spiffs/assets/logo.png");
    }

    #[test]
    fn mime_mapping() {
        assert_eq!(mime_for_path("/spiffs/index.html"), "text/html");
        assert_eq!(mime_for_path("/spiffs/app.js"), "application/javascript");
        assert_eq!(mime_for_path("/spiffs/style.css"), "text/css");
        assert_eq!(mime_for_path("/spiffs/favicon.ico"), "image/x-icon");
        assert_eq!(mime_for_path("/spiffs/logo.png"), "image/png");
        assert_eq!(mime_for_path("/spiffs/data.json"), "application/json");
        assert_eq!(mime_for_path("/spiffs/README"), "text/plain");
        assert_eq!(mime_for_path("/spiffs/notes.txt"), "text/plain");
    }
}
