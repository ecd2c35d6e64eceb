//! System services: blocking delay and full restart.

use log::info;

use crate::app::ports::{DelayPort, RestartPort};

/// Blocking delay via FreeRTOS (or the host scheduler in simulation).
pub struct SystemDelay;

impl DelayPort for SystemDelay {
    #[cfg(target_os = "espidf")]
    fn delay_ms(&mut self, ms: u32) {
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

/// Full device restart. In simulation it only records the request so the
/// process (and the test harness) keeps running.
pub struct SystemRestart {
    #[cfg(not(target_os = "espidf"))]
    requested: bool,
}

impl SystemRestart {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            requested: false,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn was_requested(&self) -> bool {
        self.requested
    }
}

impl RestartPort for SystemRestart {
    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        info!("system: restarting");
        // SAFETY: esp_restart never returns; all services are torn down by
        // the IDF shutdown handlers.
        unsafe { esp_idf_svc::sys::esp_restart() };
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        info!("system(sim): restart requested");
        self.requested = true;
    }
}
