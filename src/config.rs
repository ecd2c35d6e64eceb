//! Compile-time device configuration and the per-boot network identity.
//!
//! Defaults mirror a factory-fresh device. The persisted-settings
//! collaborator (see [`SettingsPort`](crate::app::ports::SettingsPort))
//! can override mode/SSID/password; everything else is fixed at build time.

use core::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// WiFi mode string for joining an existing network.
pub const MODE_STATION: &str = "STA";
/// WiFi mode string for hosting our own network.
pub const MODE_ACCESS_POINT: &str = "AP";

/// Factory-default WiFi mode.
pub const DEFAULT_MODE: &str = MODE_STATION;
/// Factory-default SSID, used for both STA and AP.
pub const DEFAULT_SSID: &str = "cmdlink";
/// Factory-default passphrase, used for both STA and AP.
pub const DEFAULT_PASSWORD: &str = "cmdlink";
/// mDNS / DHCP hostname.
pub const DEFAULT_HOSTNAME: &str = "cmdlink";
/// Domain the captive portal nominally answers for (it answers everything).
pub const DEFAULT_CAPTIVE_DOMAIN: &str = "cmd.link";

/// Gateway address when hosting the access point.
pub const AP_GATEWAY: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);
/// Netmask for the access point subnet.
pub const AP_NETMASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

/// Station-mode connect attempts before degrading to AP mode.
pub const MAX_STA_ATTEMPTS: u8 = 10;
/// Delay between failed station-mode attempts.
pub const STA_RETRY_DELAY_MS: u32 = 10_000;

/// UDP port the captive DNS responder listens on.
pub const DNS_PORT: u16 = 53;
/// TTL for every captive DNS answer, in seconds.
pub const DNS_TTL_SECS: u32 = 300;
/// Pending DNS packets serviced per `tick()` so DNS cannot starve the loop.
pub const DNS_QUERIES_PER_TICK: usize = 4;

/// TCP port of the HTTP surface (also advertised over mDNS).
pub const HTTP_PORT: u16 = 80;
/// Keep-alive interval reported in the event-stream hello, in milliseconds.
pub const EVENT_KEEPALIVE_MS: u32 = 1000;

/// Maximum length of one command line, shared by all transports.
pub const COMMAND_BUFFER_SIZE: usize = 256;
/// Fixed I2C packet size.
pub const I2C_PACKET_SIZE: usize = 32;
/// Concurrent long-lived WebSocket peers tracked by the registry.
pub const MAX_WS_CLIENTS: usize = 8;

/// Flash kept free below the reported space when opening an update target.
pub const UPDATE_RESERVED_MARGIN: u32 = 0x1000;
/// Update targets are rounded down to a flash-sector boundary.
pub const UPDATE_SECTOR_MASK: u32 = 0xFFFF_F000;

/// Immutable-per-boot network identity, snapshotted from the settings
/// collaborator during bootstrap. This core never writes it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkIdentity {
    pub mode: heapless::String<8>,
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
    pub hostname: heapless::String<24>,
    pub captive_domain: heapless::String<32>,
}

impl NetworkIdentity {
    /// Snapshot the identity from a settings source. Oversized values are
    /// truncated at the field capacity; the settings store enforces real
    /// limits before we ever see them.
    pub fn from_settings(settings: &impl crate::app::ports::SettingsPort) -> Self {
        Self {
            mode: clipped(settings.mode()),
            ssid: clipped(settings.ssid()),
            password: clipped(settings.password()),
            hostname: clipped(DEFAULT_HOSTNAME),
            captive_domain: clipped(DEFAULT_CAPTIVE_DOMAIN),
        }
    }

    /// Whether the configured mode requests station (client) operation.
    pub fn wants_station(&self) -> bool {
        self.mode.as_str() == MODE_STATION
    }
}

impl Default for NetworkIdentity {
    fn default() -> Self {
        Self {
            mode: clipped(DEFAULT_MODE),
            ssid: clipped(DEFAULT_SSID),
            password: clipped(DEFAULT_PASSWORD),
            hostname: clipped(DEFAULT_HOSTNAME),
            captive_domain: clipped(DEFAULT_CAPTIVE_DOMAIN),
        }
    }
}

pub(crate) fn clipped<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    let mut end = s.len().min(N);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let _ = out.push_str(&s[..end]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_identity_is_station() {
        let id = NetworkIdentity::default();
        assert!(id.wants_station());
        assert_eq!(id.ssid.as_str(), DEFAULT_SSID);
        assert_eq!(id.captive_domain.as_str(), DEFAULT_CAPTIVE_DOMAIN);
    }

    #[test]
    fn serde_roundtrip() {
        let id = NetworkIdentity::default();
        let json = serde_json::to_string(&id).unwrap();
        let id2: NetworkIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(id.ssid, id2.ssid);
        assert_eq!(id.mode, id2.mode);
    }

    #[test]
    fn clipped_respects_char_boundaries() {
        let s: heapless::String<4> = clipped("héllo");
        assert!(s.len() <= 4);
        assert!(s.as_str().starts_with('h'));
    }

    #[test]
    fn retry_policy_is_bounded() {
        assert_eq!(MAX_STA_ATTEMPTS, 10);
        assert_eq!(STA_RETRY_DELAY_MS, 10_000);
        assert!(DNS_QUERIES_PER_TICK > 0);
    }
}
