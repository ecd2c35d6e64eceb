//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter      | Implements        | Connects to                    |
//! |--------------|-------------------|--------------------------------|
//! | `wifi`       | WifiPort          | ESP-IDF WiFi STA/AP driver     |
//! | `flash`      | FlashPort         | OTA partition writer           |
//! | `settings`   | SettingsPort      | NVS / in-memory store          |
//! | `system`     | DelayPort         | FreeRTOS delay                 |
//! |              | RestartPort       | esp_restart                    |
//! | `dns_socket` | DnsSocketPort     | UDP port 53                    |
//! | `mdns`       | —                 | mDNS service advertisement     |
//! | `log_sink`   | EventListener     | Serial log output              |
//! | `httpd`      | —                 | HTTP server, WS, event stream  |
//!
//! Each adapter carries a simulation backend for host-side tests; the
//! ESP-IDF paths are guarded by `#[cfg(target_os = "espidf")]`.

pub mod dns_socket;
pub mod flash;
#[cfg(target_os = "espidf")]
pub mod httpd;
pub mod log_sink;
pub mod mdns;
pub mod settings;
pub mod system;
pub mod wifi;
