//! Log-backed event listener.
//!
//! Mirrors every broadcast event onto the serial log, so a device with no
//! browser attached still leaves a trace of connectivity and update
//! activity.

use log::info;

use crate::app::broadcast::EventListener;

pub struct LogListener;

impl EventListener for LogListener {
    fn on_event(&mut self, channel: &str, message: &str) {
        info!("event [{channel}] {message}");
    }
}
