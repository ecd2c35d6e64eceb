//! Cmdlink firmware — main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  WifiAdapter    FlashAdapter   SettingsStore   UdpDnsSocket    │
//! │  (WifiPort)     (FlashPort)    (SettingsPort)  (DnsSocketPort) │
//! │  httpd (HTTP/WS/events)        MdnsAdapter     SystemDelay     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            Network core (pure logic)                   │    │
//! │  │  ConnectivityManager · CommandRouter · UpdateController│    │
//! │  │  EventBroadcaster · CaptiveDns                         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::info;

use cmdlink::app::ports::ParserPort;
use cmdlink::app::router::{CommandContext, CommandRouter, TransportId};

// ── Built-in command language ─────────────────────────────────
//
// The full command language is a separate collaborator behind
// ParserPort. The firmware ships this minimal diagnostic set so a bare
// device still answers something useful on every transport.

struct BuiltinParser;

impl ParserPort for BuiltinParser {
    fn parse(&mut self, input: &str, emit: &mut dyn FnMut(&str), interactive: bool) {
        match input.trim() {
            "" => {}
            "help" => {
                emit("commands: help, version, status");
            }
            "version" => {
                emit(concat!("cmdlink v", env!("CARGO_PKG_VERSION")));
            }
            "status" => {
                emit("ready");
            }
            other => {
                if interactive {
                    emit(&format!("ERROR: unknown command '{other}'"));
                }
            }
        }
    }
}

// ── ESP-IDF entry point ───────────────────────────────────────

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use std::sync::{Arc, Mutex};

    use esp_idf_hal::delay::NON_BLOCK;
    use esp_idf_hal::gpio::AnyIOPin;
    use esp_idf_hal::i2c::{I2cSlaveConfig, I2cSlaveDriver};
    use esp_idf_hal::prelude::Peripherals;
    use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
    use esp_idf_hal::units::Hertz;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

    use cmdlink::adapters::dns_socket::UdpDnsSocket;
    use cmdlink::adapters::flash::FlashAdapter;
    use cmdlink::adapters::httpd;
    use cmdlink::adapters::log_sink::LogListener;
    use cmdlink::adapters::mdns::MdnsAdapter;
    use cmdlink::adapters::settings::SettingsStore;
    use cmdlink::adapters::system::{SystemDelay, SystemRestart};
    use cmdlink::adapters::wifi::WifiAdapter;
    use cmdlink::app::broadcast::EventBroadcaster;
    use cmdlink::channels::{CMD_CHANNEL, EVENT_CHANNEL, OUT_CHANNEL, submit_command};
    use cmdlink::config::NetworkIdentity;
    use cmdlink::net::connectivity::ConnectivityManager;
    use cmdlink::transports::http::HttpRunSink;
    use cmdlink::transports::i2c::{I2cAdapter, I2cSink};
    use cmdlink::transports::serial::{SerialAdapter, SerialSink};
    use cmdlink::transports::ws::WsPeerSink;
    use cmdlink::update::UpdateController;

    /// Bus address this device answers on as an I2C target.
    const I2C_ADDR: u8 = 0x31;

    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("cmdlink v{} starting", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 2. Settings snapshot ──────────────────────────────────
    let settings = SettingsStore::load(nvs.clone());
    let identity = NetworkIdentity::from_settings(&settings);

    // ── 3. Core state machines ────────────────────────────────
    let mut broadcaster = EventBroadcaster::new();
    broadcaster.subscribe(Box::new(LogListener));
    broadcaster.subscribe(Box::new(httpd::StreamPublisher));

    let mut router = CommandRouter::new();
    let mut parser = BuiltinParser;
    let mut connectivity = ConnectivityManager::new();

    // ── 4. Network bring-up (blocking, before the loop) ───────
    let driver = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?;
    let mut wifi = WifiAdapter::new(BlockingWifi::wrap(driver, sysloop)?);
    let mut delay = SystemDelay;

    let state = connectivity.bootstrap(&mut wifi, &mut delay, &identity, &mut broadcaster);

    // The captive responder serves in both station and AP modes; it is
    // armed with whichever address bootstrap ended on.
    let mut dns_socket = state.address().and_then(|ip| UdpDnsSocket::bind(ip).ok());

    let mut mdns = MdnsAdapter::new(identity.hostname.clone());
    if state.address().is_some() {
        mdns.start();
    }

    // ── 5. Command transports ─────────────────────────────────
    // Command-link UART on GPIO17/18; the console UART stays with the
    // logger.
    let uart = UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio17,
        peripherals.pins.gpio18,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::new().baudrate(Hertz(115_200)),
    )?;
    let mut serial = SerialAdapter::new();

    let mut i2c = I2cSlaveDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio4,
        peripherals.pins.gpio5,
        I2C_ADDR,
        &I2cSlaveConfig::new(),
    )?;
    let mut i2c_adapter = I2cAdapter::new();

    // ── 6. Update surface ─────────────────────────────────────
    let update = Arc::new(Mutex::new(UpdateController::new()));
    let flash = Arc::new(Mutex::new(FlashAdapter::new()));
    let _server = httpd::start(Arc::clone(&update), Arc::clone(&flash))?;
    let mut restart = SystemRestart::new();

    info!("cmdlink ready: {state}");

    // ── 7. Main loop ──────────────────────────────────────────
    let mut uart_buf = [0u8; 64];
    let mut i2c_buf = [0u8; cmdlink::config::I2C_PACKET_SIZE];

    loop {
        // Raised by server callbacks; fan out to the listeners.
        while let Ok(event) = EVENT_CHANNEL.try_receive() {
            broadcaster.publish(&event);
        }

        // Byte-stream transports.
        if let Ok(n) = uart.read(&mut uart_buf, NON_BLOCK) {
            if n > 0 {
                serial.feed(&uart_buf[..n], |cmd| {
                    submit_command(TransportId::Serial, cmd);
                });
            }
        }
        if let Ok(n) = i2c.read(&mut i2c_buf, NON_BLOCK) {
            if n > 0 {
                if let Some(cmd) = i2c_adapter.feed_packet(&i2c_buf[..n]) {
                    submit_command(TransportId::I2c, &cmd);
                }
            }
        }

        // Single-flight command execution, one sink per origin.
        while let Ok(msg) = CMD_CHANNEL.try_receive() {
            match msg.origin {
                TransportId::Serial => {
                    let mut sink = SerialSink::new(|bytes: &[u8]| {
                        let _ = uart.write(bytes);
                    });
                    let ctx = CommandContext::new(msg.origin, &mut sink);
                    router.submit(&mut parser, ctx, &msg.text);
                }
                TransportId::I2c => {
                    let mut sink = I2cSink::new(|bytes: &[u8]| {
                        let _ = i2c.write(bytes, NON_BLOCK);
                    });
                    let ctx = CommandContext::new(msg.origin, &mut sink);
                    router.submit(&mut parser, ctx, &msg.text);
                }
                TransportId::WebSocket(peer) => {
                    let mut sink = WsPeerSink::new(peer, |p, line: &str| {
                        cmdlink::channels::submit_response(p, line);
                    });
                    let ctx = CommandContext::new(msg.origin, &mut sink);
                    router.submit(&mut parser, ctx, &msg.text);
                }
                TransportId::HttpRun => {
                    let mut sink = HttpRunSink::new();
                    let ctx = CommandContext::new(msg.origin, &mut sink);
                    router.submit(&mut parser, ctx, &msg.text);
                    for line in sink.lines() {
                        info!("run: {line}");
                    }
                }
            }
        }

        // Peer responses queued by the router pass.
        while let Ok(out) = OUT_CHANNEL.try_receive() {
            httpd::send_to_peer(out.peer, &out.line);
        }

        // Captive DNS, bounded per tick.
        if let Some(dns) = dns_socket.as_mut() {
            connectivity.tick(dns);
        }

        // Deferred post-update restart.
        if let Ok(mut controller) = update.lock() {
            controller.tick(&mut restart);
        }

        esp_idf_hal::delay::FreeRtos::delay_ms(10);
    }
}

// ── Host simulation ───────────────────────────────────────────
//
// `cargo run` on a host boots the same core against the simulation
// adapters: one bootstrap, one command over the serial framing, then
// exit. The real loop only exists on the device.

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    use cmdlink::adapters::log_sink::LogListener;
    use cmdlink::adapters::settings::SettingsStore;
    use cmdlink::adapters::system::SystemDelay;
    use cmdlink::adapters::wifi::WifiAdapter;
    use cmdlink::app::broadcast::EventBroadcaster;
    use cmdlink::app::ports::ResponseSink;
    use cmdlink::config::NetworkIdentity;
    use cmdlink::net::connectivity::ConnectivityManager;
    use cmdlink::transports::serial::SerialAdapter;

    env_logger_init();

    let settings = SettingsStore::defaults();
    let identity = NetworkIdentity::from_settings(&settings);

    let mut broadcaster = EventBroadcaster::new();
    broadcaster.subscribe(Box::new(LogListener));

    let mut wifi = WifiAdapter::new();
    let mut delay = SystemDelay;
    let mut connectivity = ConnectivityManager::new();
    let state = connectivity.bootstrap(&mut wifi, &mut delay, &identity, &mut broadcaster);
    info!("sim: network state {state}");

    let mut router = CommandRouter::new();
    let mut parser = BuiltinParser;
    let mut serial = SerialAdapter::new();

    struct StdoutSink;
    impl ResponseSink for StdoutSink {
        fn write_line(&mut self, line: &str) {
            println!("{line}");
        }
    }

    serial.feed(b"\x04help", |cmd| {
        let mut sink = StdoutSink;
        let ctx = CommandContext::new(TransportId::Serial, &mut sink);
        router.submit(&mut parser, ctx, cmd);
    });

    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn env_logger_init() {
    // The simulation keeps the device's log facade; a plain stderr
    // logger is enough on a host.
    struct StderrLogger;
    impl log::Log for StderrLogger {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }
        fn log(&self, record: &log::Record) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
        fn flush(&self) {}
    }
    static LOGGER: StderrLogger = StderrLogger;
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(log::LevelFilter::Info);
}
