//! Persisted network settings adapter.
//!
//! Implements [`SettingsPort`] over NVS on ESP-IDF and over in-memory
//! values elsewhere. This adapter is read-only by design: provisioning
//! writes the `network` namespace, the network core only snapshots it at
//! boot.
//!
//! Credentials are stored in plaintext NVS; the provisioning flow owns
//! that tradeoff, not this reader.

#[cfg(target_os = "espidf")]
use log::info;

use crate::app::ports::SettingsPort;
use crate::config::{DEFAULT_MODE, DEFAULT_PASSWORD, DEFAULT_SSID, clipped};

#[cfg(target_os = "espidf")]
const SETTINGS_NAMESPACE: &str = "network";

pub struct SettingsStore {
    mode: heapless::String<8>,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl SettingsStore {
    /// Load settings, falling back to factory defaults for any key that is
    /// missing or unreadable.
    #[cfg(target_os = "espidf")]
    pub fn load(partition: esp_idf_svc::nvs::EspDefaultNvsPartition) -> Self {
        use esp_idf_svc::nvs::EspNvs;

        let mut store = Self::defaults();
        let Ok(nvs) = EspNvs::new(partition, SETTINGS_NAMESPACE, false) else {
            info!("settings: namespace '{SETTINGS_NAMESPACE}' absent, using defaults");
            return store;
        };

        let mut buf = [0u8; 64];
        if let Ok(Some(mode)) = nvs.get_str("mode", &mut buf) {
            store.mode = clipped(mode);
        }
        if let Ok(Some(ssid)) = nvs.get_str("ssid", &mut buf) {
            store.ssid = clipped(ssid);
        }
        if let Ok(Some(password)) = nvs.get_str("password", &mut buf) {
            store.password = clipped(password);
        }
        info!(
            "settings: mode={} ssid='{}'",
            store.mode, store.ssid
        );
        store
    }

    pub fn defaults() -> Self {
        Self {
            mode: clipped(DEFAULT_MODE),
            ssid: clipped(DEFAULT_SSID),
            password: clipped(DEFAULT_PASSWORD),
        }
    }

    /// Override the in-memory values (simulation and tests).
    #[cfg(not(target_os = "espidf"))]
    pub fn with_values(mode: &str, ssid: &str, password: &str) -> Self {
        Self {
            mode: clipped(mode),
            ssid: clipped(ssid),
            password: clipped(password),
        }
    }
}

impl SettingsPort for SettingsStore {
    fn mode(&self) -> &str {
        &self.mode
    }

    fn ssid(&self) -> &str {
        &self.ssid
    }

    fn password(&self) -> &str {
        &self.password
    }
}
