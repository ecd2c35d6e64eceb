//! Network bootstrap: WiFi mode selection with bounded retry, AP fallback,
//! and the captive DNS responder that redirects everything to the device.

pub mod connectivity;
pub mod dns;
