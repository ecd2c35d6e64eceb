//! HTTP server wiring (ESP-IDF only).
//!
//! Binds the route table from [`transports::http`](crate::transports::http)
//! onto `esp_idf_svc`'s httpd, and hosts the three long-lived surfaces:
//! the `/ws` command socket, the `/events` stream, and the `/update`
//! firmware upload. Handlers run on httpd worker threads; everything
//! they touch goes through the static channels or a mutex.

use std::sync::{Arc, Mutex};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::PubSubChannel;
use esp_idf_svc::http::Method;
use esp_idf_svc::http::server::{Configuration, EspHttpServer, EspHttpWsDetachedSender};
use esp_idf_svc::io::{Read, Write};
use esp_idf_svc::ws::FrameType;
use log::{debug, info, warn};

use crate::adapters::flash::FlashAdapter;
use crate::app::broadcast::EventListener;
use crate::app::router::{PeerId, TransportId};
use crate::channels::{QueueEventSink, submit_command};
use crate::config::{EVENT_KEEPALIVE_MS, HTTP_PORT, MAX_WS_CLIENTS};
use crate::transports::http::{Route, cmd_param, route, run_ack};
use crate::transports::ws::{WsAdapter, WsEvent};
use crate::update::{UpdateController, UpdateState};

const UPLOAD_CHUNK: usize = 1024;
const SSE_POLL_MS: u32 = 50;

// ── Event stream fan-out ──────────────────────────────────────

#[derive(Clone)]
struct EventFrame {
    channel: &'static str,
    message: heapless::String<96>,
}

/// One slot per stream client plus the main-loop publisher.
static SSE_BUS: PubSubChannel<CriticalSectionRawMutex, EventFrame, 8, MAX_WS_CLIENTS, 1> =
    PubSubChannel::new();

/// Broadcaster listener feeding the `/events` connections.
pub struct StreamPublisher;

impl EventListener for StreamPublisher {
    fn on_event(&mut self, channel: &str, message: &str) {
        // Channels are the static names from app::events; anything else
        // would be a listener wired to the wrong broadcaster.
        let channel = match channel {
            crate::app::events::CHANNEL_OTA => crate::app::events::CHANNEL_OTA,
            crate::app::events::CHANNEL_NET => crate::app::events::CHANNEL_NET,
            _ => crate::app::events::CHANNEL_HELLO,
        };
        let Ok(message) = heapless::String::try_from(message) else {
            return;
        };
        SSE_BUS
            .publisher()
            .map(|p| p.publish_immediate(EventFrame { channel, message }))
            .ok();
    }
}

// ── WebSocket outbound registry ───────────────────────────────

static WS_SENDERS: Mutex<Vec<(PeerId, EspHttpWsDetachedSender)>> = Mutex::new(Vec::new());

/// Deliver one response line to a connected peer. Called from the main
/// loop while draining the outbound channel.
pub fn send_to_peer(peer: PeerId, line: &str) {
    let Ok(mut senders) = WS_SENDERS.lock() else {
        return;
    };
    if let Some((_, sender)) = senders.iter_mut().find(|(p, _)| *p == peer) {
        if sender.send(FrameType::Text(false), line.as_bytes()).is_err() {
            debug!("httpd: ws send to {peer} failed, dropping sender");
            senders.retain(|(p, _)| *p != peer);
        }
    }
}

fn register_sender(peer: PeerId, sender: EspHttpWsDetachedSender) {
    if let Ok(mut senders) = WS_SENDERS.lock() {
        senders.retain(|(p, _)| *p != peer);
        senders.push((peer, sender));
    }
}

fn unregister_sender(peer: PeerId) {
    if let Ok(mut senders) = WS_SENDERS.lock() {
        senders.retain(|(p, _)| *p != peer);
    }
}

// ── Server wiring ─────────────────────────────────────────────

/// Start the HTTP surface. The returned server owns its worker threads;
/// keep the handle alive for the process lifetime.
pub fn start(
    update: Arc<Mutex<UpdateController>>,
    flash: Arc<Mutex<FlashAdapter>>,
) -> anyhow::Result<EspHttpServer<'static>> {
    let mut server = EspHttpServer::new(&Configuration {
        http_port: HTTP_PORT,
        uri_match_wildcard: true,
        ..Default::default()
    })?;

    // Both verbs run the command; the route table treats them alike.
    server.fn_handler::<anyhow::Error, _>("/run", Method::Get, run_handler)?;
    server.fn_handler::<anyhow::Error, _>("/run", Method::Post, run_handler)?;

    let upd = Arc::clone(&update);
    server.fn_handler::<anyhow::Error, _>("/update", Method::Post, move |mut req| {
        let name: heapless::String<32> = req
            .header("X-Filename")
            .map_or_else(|| crate::config::clipped("firmware.bin"), crate::config::clipped);

        let mut sink = QueueEventSink;
        let mut buf = [0u8; UPLOAD_CHUNK];
        let mut index: u32 = 0;
        loop {
            let read = req.read(&mut buf)?;
            let is_final = read == 0;
            let mut controller = upd.lock().map_err(|_| anyhow::anyhow!("update lock"))?;
            let mut flash = flash.lock().map_err(|_| anyhow::anyhow!("flash lock"))?;
            controller.on_chunk(&mut *flash, &mut sink, &name, index, &buf[..read], is_final);
            if is_final {
                break;
            }
            index += 1;
        }

        let ok = {
            let controller = upd.lock().map_err(|_| anyhow::anyhow!("update lock"))?;
            controller.state() == UpdateState::Applied
        };
        // The acknowledgment must reach the client before the deferred
        // restart fires; Connection: close flushes it out.
        let mut resp = req.into_response(
            200,
            None,
            &[("Connection", "close"), ("Content-Type", "text/plain")],
        )?;
        resp.write_all(if ok { b"OK" } else { b"FAIL" })?;
        info!("httpd: update upload finished ({})", if ok { "OK" } else { "FAIL" });
        Ok(())
    })?;

    server.fn_handler::<anyhow::Error, _>("/events", Method::Get, |req| {
        let mut resp = req.into_response(
            200,
            None,
            &[
                ("Content-Type", "text/event-stream"),
                ("Cache-Control", "no-cache"),
            ],
        )?;

        let Ok(mut sub) = SSE_BUS.subscriber() else {
            return Ok(());
        };
        write!(
            resp,
            "event: hello\ndata: hello! keepalive={EVENT_KEEPALIVE_MS}\n\n"
        )?;

        let mut since_keepalive: u32 = 0;
        loop {
            while let Some(frame) = sub.try_next_message_pure() {
                write!(resp, "event: {}\ndata: {}\n\n", frame.channel, frame.message)?;
                since_keepalive = 0;
            }
            if since_keepalive >= EVENT_KEEPALIVE_MS {
                // Comment line keeps intermediaries from timing us out.
                resp.write_all(b": keepalive\n\n")?;
                since_keepalive = 0;
            }
            resp.flush()?;
            esp_idf_hal::delay::FreeRtos::delay_ms(SSE_POLL_MS);
            since_keepalive += SSE_POLL_MS;
        }
    })?;

    let ws_state: Mutex<WsAdapter> = Mutex::new(WsAdapter::new());
    server.ws_handler("/ws", move |conn| -> anyhow::Result<()> {
        let peer = conn.session() as PeerId;
        let Ok(mut adapter) = ws_state.lock() else {
            return Ok(());
        };

        if conn.is_new() {
            adapter.handle(WsEvent::Connect { peer });
            if let Ok(sender) = conn.create_detached_sender() {
                register_sender(peer, sender);
            }
            return Ok(());
        }
        if conn.is_closed() {
            adapter.handle(WsEvent::Disconnect { peer });
            unregister_sender(peer);
            return Ok(());
        }

        let mut buf = [0u8; crate::config::COMMAND_BUFFER_SIZE];
        match conn.recv(&mut buf) {
            Ok((FrameType::Text(false), len)) => {
                if let Some(cmd) = adapter.handle(WsEvent::Text {
                    peer,
                    payload: &buf[..len],
                }) {
                    submit_command(TransportId::WebSocket(cmd.peer), &cmd.text);
                }
            }
            Ok((FrameType::Binary(_), _)) => {
                adapter.handle(WsEvent::Binary { peer });
            }
            Ok((FrameType::Pong, _)) => {
                adapter.handle(WsEvent::Pong { peer });
            }
            Ok(_) => {}
            Err(e) => {
                warn!("httpd: ws recv error on {peer}: {e}");
                adapter.handle(WsEvent::Error {
                    peer,
                    code: e.code() as u16,
                });
                unregister_sender(peer);
            }
        }
        Ok(())
    })?;

    // Page redirects, registered after the concrete handlers so the
    // wildcard only sees what they did not claim. httpd wants one
    // registration per method; unknown paths redirect under either verb.
    server.fn_handler::<anyhow::Error, _>("/", Method::Get, |req| {
        redirect(req, Route::RedirectIndex)
    })?;
    server.fn_handler::<anyhow::Error, _>("/*", Method::Get, |req| {
        let path = req.uri().split_once('?').map_or(req.uri(), |(p, _)| p);
        redirect(req, route("GET", path))
    })?;
    server.fn_handler::<anyhow::Error, _>("/*", Method::Post, |req| {
        let path = req.uri().split_once('?').map_or(req.uri(), |(p, _)| p);
        redirect(req, route("POST", path))
    })?;

    info!("httpd: listening on port {HTTP_PORT}");
    Ok(server)
}

fn run_handler(
    req: esp_idf_svc::http::server::Request<&mut esp_idf_svc::http::server::EspHttpConnection<'_>>,
) -> anyhow::Result<()> {
    let query = req.uri().split_once('?').map_or("", |(_, q)| q);
    let cmd = cmd_param(query);
    submit_command(TransportId::HttpRun, &cmd);

    let ack = run_ack(&cmd);
    let mut resp = req.into_ok_response()?;
    resp.write_all(ack.as_bytes())?;
    Ok(())
}

fn redirect(
    req: esp_idf_svc::http::server::Request<&mut esp_idf_svc::http::server::EspHttpConnection<'_>>,
    to: Route,
) -> anyhow::Result<()> {
    let Some(target) = to.target() else {
        // Static pages are served by the asset handler a collaborator
        // registers; a non-redirect route landing here means none did.
        req.into_status_response(404)?;
        return Ok(());
    };
    req.into_response(302, None, &[("Location", target)])?;
    Ok(())
}
