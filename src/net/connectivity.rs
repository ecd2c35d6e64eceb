//! Connectivity manager — station connect-and-retry with AP fallback.
//!
//! `bootstrap()` is the only deliberately blocking piece of the firmware:
//! it runs before the main loop accepts any work, attempts a station
//! connection up to [`MAX_STA_ATTEMPTS`] times with a fixed inter-retry
//! delay, and degrades to a self-hosted access point when the attempts are
//! exhausted (or when the configured mode never asked for station). After
//! boot, `tick()` services a bounded amount of captive-DNS work per call.
//!
//! Exhaustion is not fatal. The device always ends up reachable, worst
//! case on its own network at 192.168.4.1.

use core::fmt;
use core::net::Ipv4Addr;

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{DelayPort, DnsSocketPort, EventSink, WifiPort};
use crate::config::{AP_GATEWAY, AP_NETMASK, MAX_STA_ATTEMPTS, NetworkIdentity, STA_RETRY_DELAY_MS};
use crate::net::dns::CaptiveDns;

/// Exactly one of these is active at any time. `AccessPoint` is terminal
/// for the boot sequence: no further station retries until reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting { attempt: u8 },
    ConnectedStation { ip: Ipv4Addr },
    AccessPoint { ip: Ipv4Addr },
}

impl ConnectionState {
    /// Address the device answers on, present only once connected.
    pub fn address(&self) -> Option<Ipv4Addr> {
        match self {
            Self::ConnectedStation { ip } | Self::AccessPoint { ip } => Some(*ip),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting { attempt } => write!(f, "connecting (attempt {attempt})"),
            Self::ConnectedStation { ip } => write!(f, "station {ip}"),
            Self::AccessPoint { ip } => write!(f, "access point {ip}"),
        }
    }
}

/// Owns WiFi mode selection and the captive DNS responder.
pub struct ConnectivityManager {
    state: ConnectionState,
    dns: CaptiveDns,
}

impl ConnectivityManager {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            dns: CaptiveDns::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Queries answered by the captive responder so far.
    pub fn dns_answered(&self) -> u64 {
        self.dns.answered()
    }

    /// Bring the device onto a network. Blocking; call once, before the
    /// main loop goes live.
    pub fn bootstrap(
        &mut self,
        wifi: &mut impl WifiPort,
        delay: &mut impl DelayPort,
        identity: &NetworkIdentity,
        sink: &mut impl EventSink,
    ) -> ConnectionState {
        wifi.set_hostname(&identity.hostname);

        if identity.wants_station() {
            info!("net: station mode, connecting to '{}'", identity.ssid);

            for attempt in 1..=MAX_STA_ATTEMPTS {
                self.transition(ConnectionState::Connecting { attempt }, sink);

                match wifi.connect_station(&identity.ssid, &identity.password) {
                    Ok(ip) => {
                        self.transition(ConnectionState::ConnectedStation { ip }, sink);
                        self.dns.arm(ip);
                        info!("net: connected, address {ip}");
                        return self.state;
                    }
                    Err(e) => {
                        warn!("net: attempt {attempt}/{MAX_STA_ATTEMPTS} failed ({e})");
                        delay.delay_ms(STA_RETRY_DELAY_MS);
                    }
                }
            }
            warn!("net: all {MAX_STA_ATTEMPTS} attempts failed, degrading to access point");
        } else {
            info!("net: mode '{}', hosting access point", identity.mode);
        }

        match wifi.start_access_point(&identity.ssid, &identity.password, AP_GATEWAY, AP_NETMASK) {
            Ok(ip) => {
                self.transition(ConnectionState::AccessPoint { ip }, sink);
                self.dns.arm(ip);
                info!(
                    "net: '{}' mode SSID '{}', captive portal at {ip}",
                    identity.mode, identity.ssid
                );
            }
            Err(e) => {
                // Device stays up command-able over serial/I2C.
                error!("net: access point failed ({e}), network surfaces unavailable");
                self.transition(ConnectionState::Disconnected, sink);
            }
        }
        self.state
    }

    /// Periodic service: bounded captive-DNS work. Non-blocking.
    pub fn tick(&mut self, dns_socket: &mut impl DnsSocketPort) {
        self.dns.service(dns_socket);
    }

    fn transition(&mut self, next: ConnectionState, sink: &mut impl EventSink) {
        if next == self.state {
            return;
        }
        self.state = next;
        sink.emit(&AppEvent::ConnectionChanged(next));
    }
}
