//! Cmdlink network core.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod channels;
pub mod config;
pub mod net;
pub mod transports;
pub mod update;

mod error;

pub mod adapters;

pub use error::{ConnectivityError, DnsError, Error, Result, UpdateError};
