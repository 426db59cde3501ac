//! Remote record adapter.
//!
//! Talks to the per-device record on the cloud backend (an RTDB-style
//! JSON-over-HTTP API: one document per path, GET to read, PUT to
//! replace).  Connectivity bring-up is someone else's job; this adapter
//! only tracks whether its last request went through.
//!
//! [`NullRemote`] is the offline stand-in: never connected, so the
//! control cycle simply skips reconciliation.

use crate::app::events::{DeviceRegistration, DeviceStatus, SensorReport};
use crate::app::ports::RemotePort;
use crate::error::RemoteError;
use crate::sync::record::RemoteRecord;

/// Offline adapter: reports disconnected, rejects everything else.
#[derive(Debug, Default)]
pub struct NullRemote;

impl RemotePort for NullRemote {
    fn is_connected(&self) -> bool {
        false
    }

    fn fetch_record(&mut self) -> Result<RemoteRecord, RemoteError> {
        Err(RemoteError::Unavailable)
    }

    fn clear_requested_state(&mut self) -> Result<(), RemoteError> {
        Err(RemoteError::Unavailable)
    }

    fn publish_status(&mut self, _status: &DeviceStatus) -> Result<(), RemoteError> {
        Err(RemoteError::Unavailable)
    }

    fn publish_sensors(&mut self, _report: &SensorReport) -> Result<(), RemoteError> {
        Err(RemoteError::Unavailable)
    }

    fn register_device(&mut self, _reg: &DeviceRegistration<'_>) -> Result<(), RemoteError> {
        Err(RemoteError::Unavailable)
    }
}

/// HTTP adapter for the real backend.  ESP-IDF only: the host never talks
/// to the backend directly (tests inject mock [`RemotePort`]s).
#[cfg(target_os = "espidf")]
pub struct HttpRemoteAdapter {
    base_url: String,
    device_id: String,
    /// Updated after every request; a failed request marks the backend
    /// unreachable until one succeeds again.
    reachable: bool,
}

#[cfg(target_os = "espidf")]
impl HttpRemoteAdapter {
    pub fn new(base_url: &str, device_id: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            device_id: device_id.to_string(),
            reachable: true,
        }
    }

    fn device_url(&self, leaf: &str) -> String {
        format!("{}/devices/{}/{}.json", self.base_url, self.device_id, leaf)
    }

    fn track<T>(&mut self, result: Result<T, RemoteError>) -> Result<T, RemoteError> {
        self.reachable = result.is_ok();
        result
    }
}

#[cfg(target_os = "espidf")]
impl RemotePort for HttpRemoteAdapter {
    fn is_connected(&self) -> bool {
        self.reachable
    }

    fn fetch_record(&mut self) -> Result<RemoteRecord, RemoteError> {
        let url = self.device_url("config");
        let body = self.track(http::get(&url))?;
        serde_json::from_slice(&body).map_err(|_| RemoteError::InvalidData)
    }

    fn clear_requested_state(&mut self) -> Result<(), RemoteError> {
        let url = format!(
            "{}/devices/{}/config/requestedState.json",
            self.base_url, self.device_id
        );
        let result = http::put(&url, b"\"none\"");
        self.track(result)
    }

    fn publish_status(&mut self, status: &DeviceStatus) -> Result<(), RemoteError> {
        let url = self.device_url("status");
        let body = serde_json::to_vec(status).map_err(|_| RemoteError::WriteFailed)?;
        let result = http::put(&url, &body);
        self.track(result)
    }

    fn publish_sensors(&mut self, report: &SensorReport) -> Result<(), RemoteError> {
        let url = self.device_url("sensors");
        let body = serde_json::to_vec(report).map_err(|_| RemoteError::WriteFailed)?;
        let result = http::put(&url, &body);
        self.track(result)
    }

    fn register_device(&mut self, reg: &DeviceRegistration<'_>) -> Result<(), RemoteError> {
        let url = self.device_url("info");
        let body = serde_json::to_vec(reg).map_err(|_| RemoteError::WriteFailed)?;
        let result = http::put(&url, &body);
        self.track(result)
    }
}

/// Minimal blocking HTTP helpers over the ESP-IDF client.
#[cfg(target_os = "espidf")]
mod http {
    use std::ffi::CString;

    use esp_idf_svc::sys::*;

    use crate::error::RemoteError;

    const TIMEOUT_MS: i32 = 5_000;
    const MAX_RESPONSE: usize = 4096;

    pub fn get(url: &str) -> Result<Vec<u8>, RemoteError> {
        request(url, esp_http_client_method_t_HTTP_METHOD_GET, None)
    }

    pub fn put(url: &str, body: &[u8]) -> Result<(), RemoteError> {
        request(url, esp_http_client_method_t_HTTP_METHOD_PUT, Some(body)).map(|_| ())
    }

    fn request(
        url: &str,
        method: esp_http_client_method_t,
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>, RemoteError> {
        let url_c = CString::new(url).map_err(|_| RemoteError::InvalidData)?;

        // SAFETY: client handle is created, used and cleaned up within this
        // function; single-threaded access from the control loop only.
        unsafe {
            let config = esp_http_client_config_t {
                url: url_c.as_ptr(),
                timeout_ms: TIMEOUT_MS,
                ..Default::default()
            };
            let client = esp_http_client_init(&config);
            if client.is_null() {
                return Err(RemoteError::Unavailable);
            }

            let result = (|| {
                if esp_http_client_set_method(client, method) != ESP_OK {
                    return Err(RemoteError::Unavailable);
                }
                let body_len = body.map_or(0, <[u8]>::len);
                if body.is_some() {
                    let key = b"Content-Type\0";
                    let value = b"application/json\0";
                    esp_http_client_set_header(
                        client,
                        key.as_ptr() as *const _,
                        value.as_ptr() as *const _,
                    );
                }

                if esp_http_client_open(client, body_len as i32) != ESP_OK {
                    return Err(RemoteError::Unavailable);
                }
                if let Some(data) = body {
                    let written =
                        esp_http_client_write(client, data.as_ptr() as *const _, data.len() as i32);
                    if written < data.len() as i32 {
                        return Err(RemoteError::WriteFailed);
                    }
                }

                if esp_http_client_fetch_headers(client) < 0 {
                    return Err(RemoteError::ReadFailed);
                }

                let mut response = Vec::new();
                let mut chunk = [0u8; 256];
                loop {
                    let n = esp_http_client_read(
                        client,
                        chunk.as_mut_ptr() as *mut _,
                        chunk.len() as i32,
                    );
                    if n < 0 {
                        return Err(RemoteError::ReadFailed);
                    }
                    if n == 0 {
                        break;
                    }
                    response.extend_from_slice(&chunk[..n as usize]);
                    if response.len() > MAX_RESPONSE {
                        return Err(RemoteError::InvalidData);
                    }
                }

                let status = esp_http_client_get_status_code(client);
                if !(200..300).contains(&status) {
                    return Err(RemoteError::ReadFailed);
                }
                Ok(response)
            })();

            esp_http_client_close(client);
            esp_http_client_cleanup(client);
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_remote_is_never_connected() {
        let mut remote = NullRemote;
        assert!(!remote.is_connected());
        assert!(remote.fetch_record().is_err());
        assert!(remote.clear_requested_state().is_err());
    }
}
