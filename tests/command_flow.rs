//! Integration tests: transport adapters → router → response sinks.

use cmdlink::app::ports::{ParserPort, ResponseSink};
use cmdlink::app::router::{CommandContext, CommandRouter, TransportId};
use cmdlink::transports::http::{HttpRunSink, cmd_param, run_ack};
use cmdlink::transports::serial::{SerialAdapter, SerialSink};
use cmdlink::transports::ws::{WsAdapter, WsEvent, WsPeerSink};

// ── Mock implementations ──────────────────────────────────────

/// Stand-in for the command-language collaborator: answers "help" with two
/// lines, echoes anything else as one acknowledgment line.
struct ScriptParser;

impl ParserPort for ScriptParser {
    fn parse(&mut self, input: &str, emit: &mut dyn FnMut(&str), _interactive: bool) {
        match input {
            "" => {}
            "help" => {
                emit("commands:");
                emit("  LED <r> <g> <b>");
            }
            other => emit(&format!("> {other}")),
        }
    }
}

#[derive(Default)]
struct VecSink(Vec<String>);

impl ResponseSink for VecSink {
    fn write_line(&mut self, line: &str) {
        self.0.push(line.to_owned());
    }
}

// ── Serial round trip ─────────────────────────────────────────

#[test]
fn serial_frame_to_framed_response() {
    let mut router = CommandRouter::new();
    let mut parser = ScriptParser;
    let mut adapter = SerialAdapter::new();
    let mut wire_out: Vec<u8> = Vec::new();

    adapter.feed(b"\x04help", |cmd| {
        let mut sink = SerialSink::new(|bytes: &[u8]| wire_out.extend_from_slice(bytes));
        router.submit(
            &mut parser,
            CommandContext::new(TransportId::Serial, &mut sink),
            cmd,
        );
    });

    // Two response lines, each as its own length-prefixed frame.
    assert_eq!(wire_out[0] as usize, "commands:".len());
    assert_eq!(&wire_out[1..10], b"commands:");
    let second = &wire_out[10..];
    assert_eq!(second[0] as usize, "  LED <r> <g> <b>".len());
    assert_eq!(router.executed(), 1);
}

#[test]
fn garbage_between_frames_does_not_break_later_commands() {
    let mut router = CommandRouter::new();
    let mut parser = ScriptParser;
    let mut adapter = SerialAdapter::new();
    let mut seen = Vec::new();

    // Non-UTF-8 frame, then a clean one.
    adapter.feed(b"\x02\xff\xfe\x06status", |cmd| {
        let mut sink = VecSink::default();
        router.submit(
            &mut parser,
            CommandContext::new(TransportId::Serial, &mut sink),
            cmd,
        );
        seen.extend(sink.0);
    });

    assert_eq!(seen, vec!["> status"]);
}

// ── WebSocket peer scenario ───────────────────────────────────

#[test]
fn ws_command_is_answered_to_the_sending_peer_only() {
    let mut ws = WsAdapter::new();
    ws.handle(WsEvent::Connect { peer: 1 });
    ws.handle(WsEvent::Connect { peer: 2 });

    let cmd = ws
        .handle(WsEvent::Text {
            peer: 2,
            payload: b"LED 0 25 0",
        })
        .expect("text frame must yield a command");

    let mut router = CommandRouter::new();
    let mut parser = ScriptParser;
    let mut delivered: Vec<(u16, String)> = Vec::new();
    {
        let mut sink = WsPeerSink::new(cmd.peer, |peer, line: &str| {
            delivered.push((peer, line.to_owned()));
        });
        router.submit(
            &mut parser,
            CommandContext::new(TransportId::WebSocket(cmd.peer), &mut sink),
            &cmd.text,
        );
    }

    assert_eq!(delivered, vec![(2, "> LED 0 25 0".to_owned())]);
}

#[test]
fn ws_control_events_never_execute_commands() {
    let mut ws = WsAdapter::new();
    ws.handle(WsEvent::Connect { peer: 5 });

    assert!(ws.handle(WsEvent::Pong { peer: 5 }).is_none());
    assert!(ws.handle(WsEvent::Binary { peer: 5 }).is_none());
    assert!(ws.handle(WsEvent::Disconnect { peer: 5 }).is_none());
    assert!(ws.registry().is_empty());
}

// ── HTTP /run ─────────────────────────────────────────────────

#[test]
fn http_run_acknowledges_synchronously_and_captures_lines() {
    let query = "cmd=LED+0+25+0";
    let cmd = cmd_param(query);
    assert_eq!(run_ack(&cmd).as_str(), "Run: LED 0 25 0");

    let mut router = CommandRouter::new();
    let mut parser = ScriptParser;
    let mut sink = HttpRunSink::new();
    router.submit(
        &mut parser,
        CommandContext::new(TransportId::HttpRun, &mut sink),
        &cmd,
    );

    let lines: Vec<&str> = sink.lines().collect();
    assert_eq!(lines, vec!["> LED 0 25 0"]);
}

#[test]
fn http_run_without_parameter_is_an_empty_no_op() {
    let cmd = cmd_param("other=1");
    assert_eq!(run_ack(&cmd).as_str(), "Run: ");

    let mut router = CommandRouter::new();
    let mut parser = ScriptParser;
    let mut sink = HttpRunSink::new();
    router.submit(
        &mut parser,
        CommandContext::new(TransportId::HttpRun, &mut sink),
        &cmd,
    );
    assert_eq!(sink.lines().count(), 0);
}
