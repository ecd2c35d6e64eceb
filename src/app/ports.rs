//! Port traits — the boundary between the network core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ core (router / connectivity / update)
//! ```
//!
//! Driven adapters (WiFi driver, flash writer, DNS socket, settings store,
//! command parser) implement these traits. The core consumes them via
//! generics, so it never touches hardware directly and every state machine
//! runs unmodified in host-side tests.

use core::net::Ipv4Addr;

use crate::error::{ConnectivityError, UpdateError};

// ───────────────────────────────────────────────────────────────
// Settings port (external collaborator: persisted configuration)
// ───────────────────────────────────────────────────────────────

/// Read-only accessors over the persisted settings store.
/// This core never writes settings; credential lifecycle is the
/// collaborator's concern.
pub trait SettingsPort {
    /// Configured WiFi mode string ("STA" or "AP").
    fn mode(&self) -> &str;
    fn ssid(&self) -> &str;
    fn password(&self) -> &str;
}

// ───────────────────────────────────────────────────────────────
// Parser port (external collaborator: the command language)
// ───────────────────────────────────────────────────────────────

/// The command-language interpreter.
///
/// `emit` receives zero or more response lines; it must not be retained
/// beyond the call (the borrow makes that unrepresentable). Reentrancy is
/// not required — the router guarantees single-flight execution.
pub trait ParserPort {
    fn parse(&mut self, input: &str, emit: &mut dyn FnMut(&str), interactive: bool);
}

// ───────────────────────────────────────────────────────────────
// Response sink (driven adapter: core → originating transport)
// ───────────────────────────────────────────────────────────────

/// Destination for the response lines of exactly one command, bound to the
/// transport/client that issued it.
pub trait ResponseSink {
    fn write_line(&mut self, line: &str);
}

/// Sink that discards every line. Used where a transport has no response
/// path of its own.
pub struct NullSink;

impl ResponseSink for NullSink {
    fn write_line(&mut self, _line: &str) {}
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: core → broadcast listeners)
// ───────────────────────────────────────────────────────────────

/// The core publishes structured [`AppEvent`](super::events::AppEvent)s
/// through this port, independent of any command/response exchange.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// WiFi port (driven adapter: core → radio driver)
// ───────────────────────────────────────────────────────────────

/// Station/AP control over the WiFi driver.
///
/// `connect_station` blocks for one handshake with the driver's internal
/// timeout and returns a definitive result; the bounded-retry policy lives
/// in the connectivity manager, not here.
pub trait WifiPort {
    fn set_hostname(&mut self, hostname: &str);

    /// One blocking connect attempt. `Ok` carries the assigned address.
    fn connect_station(
        &mut self,
        ssid: &str,
        password: &str,
    ) -> Result<Ipv4Addr, ConnectivityError>;

    /// Host an access point on the given gateway/netmask.
    /// `Ok` carries the gateway address the device answers on.
    fn start_access_point(
        &mut self,
        ssid: &str,
        password: &str,
        gateway: Ipv4Addr,
        netmask: Ipv4Addr,
    ) -> Result<Ipv4Addr, ConnectivityError>;
}

// ───────────────────────────────────────────────────────────────
// Delay port (boot-time blocking waits)
// ───────────────────────────────────────────────────────────────

/// Blocking delay, used only during the synchronous bootstrap (the main
/// loop is not live yet, so blocking here contends with nothing).
pub trait DelayPort {
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Flash port (driven adapter: update controller → OTA partition)
// ───────────────────────────────────────────────────────────────

/// Write target for a firmware image. Exclusively owned by the update
/// controller from session open until finalize/abort.
pub trait FlashPort {
    /// Space available for a new image, before margin/sector shaping.
    fn free_space(&self) -> u32;

    /// Open a write target of at most `max_size` bytes.
    fn begin(&mut self, max_size: u32) -> Result<(), UpdateError>;

    /// Append bytes. Returns the count actually written, which the
    /// controller compares against the chunk length.
    fn write(&mut self, data: &[u8]) -> Result<usize, UpdateError>;

    /// Seal and validate the written image.
    fn finalize(&mut self) -> Result<(), UpdateError>;

    /// Discard the in-progress target, if any. Idempotent.
    fn abort(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Restart port (deferred post-update reboot)
// ───────────────────────────────────────────────────────────────

/// Full device restart. Invoked from `tick()` only, never from inside an
/// upload handler, so the client sees its acknowledgment first.
pub trait RestartPort {
    fn restart(&mut self);
}

// ───────────────────────────────────────────────────────────────
// DNS socket port (driven adapter: captive responder → UDP 53)
// ───────────────────────────────────────────────────────────────

/// Non-blocking UDP socket for the captive DNS responder. The adapter
/// remembers the peer of the last received packet; `reply` answers it.
pub trait DnsSocketPort {
    /// Receive one pending packet into `buf`, or `None` if nothing waits.
    fn poll(&mut self, buf: &mut [u8]) -> Option<usize>;

    /// Send a reply to the peer of the last successful `poll`.
    fn reply(&mut self, data: &[u8]);
}
