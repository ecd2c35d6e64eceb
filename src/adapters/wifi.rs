//! WiFi driver adapter.
//!
//! Implements [`WifiPort`] — the boundary the connectivity manager drives
//! during bootstrap. Policy (retry counts, AP fallback) lives in the
//! manager; this adapter does exactly one thing per call.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation backend with a scriptable failure
//!   count, for host-side tests and demos.

use core::net::Ipv4Addr;
use log::{info, warn};

use crate::app::ports::WifiPort;
use crate::error::ConnectivityError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, BlockingWifi, ClientConfiguration, Configuration,
    EspWifi,
};

pub struct WifiAdapter {
    #[cfg(target_os = "espidf")]
    driver: BlockingWifi<EspWifi<'static>>,
    /// Simulation: attempts that fail before a connect succeeds.
    #[cfg(not(target_os = "espidf"))]
    sim_failures_left: u32,
    #[cfg(not(target_os = "espidf"))]
    hostname: heapless::String<32>,
}

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    pub fn new(driver: BlockingWifi<EspWifi<'static>>) -> Self {
        Self { driver }
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    pub fn new() -> Self {
        Self {
            sim_failures_left: 0,
            hostname: heapless::String::new(),
        }
    }

    /// Make the next `n` station attempts fail, to exercise the retry and
    /// AP-fallback paths.
    pub fn fail_next(&mut self, n: u32) {
        self.sim_failures_left = n;
    }
}

// ── Platform-specific ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl WifiPort for WifiAdapter {
    fn set_hostname(&mut self, hostname: &str) {
        let mut buf = [0u8; 33];
        let bytes = hostname.as_bytes();
        let len = bytes.len().min(32);
        buf[..len].copy_from_slice(&bytes[..len]);

        let handle = self.driver.wifi().sta_netif().handle();
        // SAFETY: buf is NUL-terminated and outlives the call; the netif
        // handle is valid for the driver's lifetime.
        let ret = unsafe {
            esp_idf_svc::sys::esp_netif_set_hostname(handle, buf.as_ptr().cast())
        };
        if ret != esp_idf_svc::sys::ESP_OK {
            warn!("wifi: esp_netif_set_hostname failed ({ret})");
        }
    }

    fn connect_station(
        &mut self,
        ssid: &str,
        password: &str,
    ) -> Result<Ipv4Addr, ConnectivityError> {
        let config = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| ConnectivityError::ConnectFailed)?,
            password: password
                .try_into()
                .map_err(|_| ConnectivityError::ConnectFailed)?,
            auth_method: if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        });

        self.driver
            .set_configuration(&config)
            .map_err(|_| ConnectivityError::ConnectFailed)?;
        self.driver
            .start()
            .map_err(|_| ConnectivityError::ConnectFailed)?;
        self.driver
            .connect()
            .map_err(|_| ConnectivityError::ConnectFailed)?;
        self.driver
            .wait_netif_up()
            .map_err(|_| ConnectivityError::ConnectFailed)?;

        let ip = self
            .driver
            .wifi()
            .sta_netif()
            .get_ip_info()
            .map_err(|_| ConnectivityError::ConnectFailed)?
            .ip;
        info!("wifi: station up, ip={ip}");
        Ok(ip)
    }

    fn start_access_point(
        &mut self,
        ssid: &str,
        password: &str,
        gateway: Ipv4Addr,
        netmask: Ipv4Addr,
    ) -> Result<Ipv4Addr, ConnectivityError> {
        let config = Configuration::AccessPoint(AccessPointConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| ConnectivityError::AccessPointFailed)?,
            password: password
                .try_into()
                .map_err(|_| ConnectivityError::AccessPointFailed)?,
            auth_method: if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        });

        self.driver
            .set_configuration(&config)
            .map_err(|_| ConnectivityError::AccessPointFailed)?;
        self.driver
            .start()
            .map_err(|_| ConnectivityError::AccessPointFailed)?;

        self.reconfigure_ap_subnet(gateway, netmask)?;

        info!("wifi: access point '{ssid}' up at {gateway}");
        Ok(gateway)
    }
}

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    /// Move the AP interface onto the configured gateway/netmask. DHCP
    /// must be stopped while the address changes.
    fn reconfigure_ap_subnet(
        &mut self,
        gateway: Ipv4Addr,
        netmask: Ipv4Addr,
    ) -> Result<(), ConnectivityError> {
        use esp_idf_svc::sys::{
            ESP_OK, esp_netif_dhcps_start, esp_netif_dhcps_stop, esp_netif_ip_info_t,
            esp_netif_set_ip_info,
        };

        fn as_u32(addr: Ipv4Addr) -> u32 {
            u32::from_le_bytes(addr.octets())
        }

        let handle = self.driver.wifi().ap_netif().handle();
        let info = esp_netif_ip_info_t {
            ip: esp_idf_svc::sys::esp_ip4_addr_t { addr: as_u32(gateway) },
            gw: esp_idf_svc::sys::esp_ip4_addr_t { addr: as_u32(gateway) },
            netmask: esp_idf_svc::sys::esp_ip4_addr_t { addr: as_u32(netmask) },
        };

        // SAFETY: the AP netif handle stays valid for the driver's
        // lifetime; dhcps is restarted before returning.
        unsafe {
            esp_netif_dhcps_stop(handle);
            if esp_netif_set_ip_info(handle, &info) != ESP_OK {
                esp_netif_dhcps_start(handle);
                return Err(ConnectivityError::AccessPointFailed);
            }
            esp_netif_dhcps_start(handle);
        }
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiPort for WifiAdapter {
    fn set_hostname(&mut self, hostname: &str) {
        self.hostname = crate::config::clipped(hostname);
        info!("wifi(sim): hostname '{}'", self.hostname);
    }

    fn connect_station(
        &mut self,
        ssid: &str,
        _password: &str,
    ) -> Result<Ipv4Addr, ConnectivityError> {
        if self.sim_failures_left > 0 {
            self.sim_failures_left -= 1;
            warn!("wifi(sim): connect to '{ssid}' failed ({} more scripted)", self.sim_failures_left);
            return Err(ConnectivityError::ConnectFailed);
        }
        let ip = Ipv4Addr::new(192, 168, 1, 77);
        info!("wifi(sim): connected to '{ssid}', ip={ip}");
        Ok(ip)
    }

    fn start_access_point(
        &mut self,
        ssid: &str,
        _password: &str,
        gateway: Ipv4Addr,
        _netmask: Ipv4Addr,
    ) -> Result<Ipv4Addr, ConnectivityError> {
        info!("wifi(sim): access point '{ssid}' up at {gateway}");
        Ok(gateway)
    }
}
