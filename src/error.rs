//! Unified error types for the network core.
//!
//! One `Error` enum every subsystem converts into, keeping the main loop's
//! error handling uniform. All variants are `Copy` so they can move through
//! state machines and event publication without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the network core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Bringing the device onto a network failed.
    Connectivity(ConnectivityError),
    /// A firmware-update step failed.
    Update(UpdateError),
    /// The captive DNS responder hit an internal fault.
    Dns(DnsError),
    /// Peripheral or service initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connectivity(e) => write!(f, "connectivity: {e}"),
            Self::Update(e) => write!(f, "update: {e}"),
            Self::Dns(e) => write!(f, "dns: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Connectivity errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    /// A single station-mode connect attempt failed or timed out.
    ConnectFailed,
    /// All bounded attempts failed. Not fatal: the caller degrades to AP.
    AttemptsExhausted,
    /// The access point could not be started.
    AccessPointFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "station connect failed"),
            Self::AttemptsExhausted => write!(f, "station attempts exhausted"),
            Self::AccessPointFailed => write!(f, "access point start failed"),
        }
    }
}

impl From<ConnectivityError> for Error {
    fn from(e: ConnectivityError) -> Self {
        Self::Connectivity(e)
    }
}

// ---------------------------------------------------------------------------
// Update errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    /// The write target could not be opened (no space, no partition).
    BeginFailed,
    /// A chunk write returned fewer bytes than supplied.
    ShortWrite,
    /// Sealing or validating the finished image failed.
    FinalizeFailed,
    /// A non-initial chunk arrived with no session in progress.
    NoSession,
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeginFailed => write!(f, "begin failed"),
            Self::ShortWrite => write!(f, "short write"),
            Self::FinalizeFailed => write!(f, "finalize failed"),
            Self::NoSession => write!(f, "no update session"),
        }
    }
}

impl From<UpdateError> for Error {
    fn from(e: UpdateError) -> Self {
        Self::Update(e)
    }
}

// ---------------------------------------------------------------------------
// DNS errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsError {
    /// Packet too short or not a query; answered with SERVFAIL when possible.
    Malformed,
    /// The response did not fit the reply buffer.
    ResponseTooLarge,
}

impl fmt::Display for DnsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed query"),
            Self::ResponseTooLarge => write!(f, "response too large"),
        }
    }
}

impl From<DnsError> for Error {
    fn from(e: DnsError) -> Self {
        Self::Dns(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
