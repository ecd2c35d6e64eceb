//! mDNS service advertisement.
//!
//! Advertises the HTTP surface as `_http._tcp` on port 80 under the
//! configured hostname, so the device is reachable as `cmdlink.local`
//! without the captive portal. Started once the network is up, in either
//! station or access-point mode.

use log::info;

use crate::config::HTTP_PORT;

const MDNS_SERVICE_TYPE: &str = "_http";
#[allow(dead_code)]
const MDNS_SERVICE_PROTO: &str = "_tcp";

pub struct MdnsAdapter {
    hostname: heapless::String<24>,
    active: bool,
}

impl MdnsAdapter {
    pub fn new(hostname: heapless::String<24>) -> Self {
        Self {
            hostname,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start hostname + service advertisement. Call once the interface
    /// holds an address.
    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.platform_start();
        self.active = true;
        info!(
            "mdns: advertising {}.local → {}:{}",
            self.hostname, MDNS_SERVICE_TYPE, HTTP_PORT
        );
    }

    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.platform_stop();
        self.active = false;
        info!("mdns: stopped");
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&self) {
        use esp_idf_svc::sys::*;
        unsafe {
            let ret = mdns_init();
            if ret != ESP_OK {
                log::error!("mdns: mdns_init failed ({ret})");
                return;
            }

            let mut hostname_buf = [0u8; 32];
            let hb = self.hostname.as_bytes();
            let hl = hb.len().min(31);
            hostname_buf[..hl].copy_from_slice(&hb[..hl]);
            mdns_hostname_set(hostname_buf.as_ptr().cast());
            mdns_instance_name_set(c"Cmdlink Device".as_ptr());

            mdns_service_add(
                c"Cmdlink".as_ptr(),
                c"_http".as_ptr(),
                c"_tcp".as_ptr(),
                HTTP_PORT,
                core::ptr::null_mut(),
                0,
            );

            let ver = concat!(env!("CARGO_PKG_VERSION"), "\0");
            mdns_service_txt_item_set(
                c"_http".as_ptr(),
                c"_tcp".as_ptr(),
                c"version".as_ptr(),
                ver.as_ptr().cast(),
            );
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&self) {
        info!(
            "mdns(sim): registered {}.local {}:{} v={}",
            self.hostname,
            MDNS_SERVICE_TYPE,
            HTTP_PORT,
            env!("CARGO_PKG_VERSION")
        );
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&self) {
        unsafe {
            esp_idf_svc::sys::mdns_free();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&self) {
        info!("mdns(sim): unregistered");
    }
}
