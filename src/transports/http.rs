//! HTTP adapter: request routing and the `/run` command endpoint.
//!
//! The routing table and parameter handling are kept free of any server
//! types so they test on the host; the platform layer maps [`Route`] onto
//! its handler registrations.

use crate::app::ports::ResponseSink;
use crate::config::COMMAND_BUFFER_SIZE;

/// Where a request should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `GET /` — send the client to the main page.
    RedirectIndex,
    /// Run a command from the query string.
    Run,
    /// Firmware upload endpoint.
    Update,
    /// Live event stream subscription.
    Events,
    /// WebSocket upgrade endpoint.
    WebSocket,
    /// Anything else — send the client to the error page.
    RedirectNotFound,
}

impl Route {
    pub fn target(self) -> Option<&'static str> {
        match self {
            Self::RedirectIndex => Some("/index.html"),
            Self::RedirectNotFound => Some("/error404.html"),
            _ => None,
        }
    }
}

/// Resolve a request line to a route. `path` excludes the query string.
pub fn route(method: &str, path: &str) -> Route {
    match (method, path) {
        ("GET", "/") => Route::RedirectIndex,
        // The command endpoint answers both verbs; clients and simple
        // scripts use whichever is handy.
        ("GET" | "POST", "/run") => Route::Run,
        ("POST", "/update") => Route::Update,
        ("GET", "/events") => Route::Events,
        ("GET", "/ws") => Route::WebSocket,
        _ => Route::RedirectNotFound,
    }
}

/// Extract and decode the `cmd` query parameter. A missing parameter is
/// the empty command, which the router treats as a no-op.
pub fn cmd_param(query: &str) -> heapless::String<COMMAND_BUFFER_SIZE> {
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("cmd=") {
            return percent_decode(value);
        }
    }
    heapless::String::new()
}

/// The synchronous acknowledgment body for `/run`.
pub fn run_ack(cmd: &str) -> heapless::String<{ COMMAND_BUFFER_SIZE + 8 }> {
    let mut ack = heapless::String::new();
    let _ = ack.push_str("Run: ");
    let _ = ack.push_str(cmd);
    ack
}

/// application/x-www-form-urlencoded decoding: `+` is space, `%XX` is a
/// byte. Undecodable sequences pass through verbatim; output is clipped
/// at the command buffer limit.
fn percent_decode(value: &str) -> heapless::String<COMMAND_BUFFER_SIZE> {
    let mut decoded: heapless::Vec<u8, COMMAND_BUFFER_SIZE> = heapless::Vec::new();
    let bytes = value.as_bytes();
    let mut i = 0;

    while i < bytes.len() && !decoded.is_full() {
        let b = match bytes[i] {
            b'+' => {
                i += 1;
                b' '
            }
            b'%' if i + 2 < bytes.len() => match hex_pair(bytes[i + 1], bytes[i + 2]) {
                Some(b) => {
                    i += 3;
                    b
                }
                None => {
                    i += 1;
                    b'%'
                }
            },
            other => {
                i += 1;
                other
            }
        };
        let _ = decoded.push(b);
    }

    core::str::from_utf8(&decoded)
        .ok()
        .and_then(|s| heapless::String::try_from(s).ok())
        .unwrap_or_default()
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let hi = (hi as char).to_digit(16)?;
    let lo = (lo as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

/// Sink for `/run`: response lines are captured so the platform layer can
/// log them, while the HTTP body stays the fixed acknowledgment.
pub struct HttpRunSink {
    lines: heapless::Vec<heapless::String<COMMAND_BUFFER_SIZE>, 16>,
}

impl HttpRunSink {
    pub fn new() -> Self {
        Self {
            lines: heapless::Vec::new(),
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.as_str())
    }
}

impl ResponseSink for HttpRunSink {
    fn write_line(&mut self, line: &str) {
        if let Ok(line) = heapless::String::try_from(line) {
            // Overflow drops oldest-last; 16 lines is ample for the CLI.
            let _ = self.lines.push(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_redirects_to_index() {
        assert_eq!(route("GET", "/"), Route::RedirectIndex);
        assert_eq!(Route::RedirectIndex.target(), Some("/index.html"));
    }

    #[test]
    fn unknown_paths_redirect_to_error_page() {
        assert_eq!(route("GET", "/nope"), Route::RedirectNotFound);
        assert_eq!(route("PUT", "/run"), Route::RedirectNotFound);
        assert_eq!(Route::RedirectNotFound.target(), Some("/error404.html"));
    }

    #[test]
    fn known_endpoints_resolve() {
        assert_eq!(route("GET", "/run"), Route::Run);
        assert_eq!(route("POST", "/update"), Route::Update);
        assert_eq!(route("GET", "/events"), Route::Events);
        assert_eq!(route("GET", "/ws"), Route::WebSocket);
    }

    #[test]
    fn run_accepts_both_verbs() {
        assert_eq!(route("POST", "/run"), Route::Run);
        assert_eq!(route("GET", "/run"), route("POST", "/run"));
    }

    #[test]
    fn cmd_param_is_decoded() {
        assert_eq!(cmd_param("cmd=help").as_str(), "help");
        assert_eq!(cmd_param("cmd=LED+0+25+0").as_str(), "LED 0 25 0");
        assert_eq!(cmd_param("cmd=STRING%20hi%21").as_str(), "STRING hi!");
    }

    #[test]
    fn missing_cmd_param_is_empty_command() {
        assert_eq!(cmd_param("").as_str(), "");
        assert_eq!(cmd_param("other=1").as_str(), "");
    }

    #[test]
    fn cmd_param_picks_right_pair() {
        assert_eq!(cmd_param("x=1&cmd=help&y=2").as_str(), "help");
    }

    #[test]
    fn bad_percent_escape_passes_through() {
        assert_eq!(cmd_param("cmd=50%ZZoff").as_str(), "50%ZZoff");
        assert_eq!(cmd_param("cmd=100%").as_str(), "100%");
    }

    #[test]
    fn ack_echoes_the_command() {
        assert_eq!(run_ack("help").as_str(), "Run: help");
        assert_eq!(run_ack("").as_str(), "Run: ");
    }

    #[test]
    fn run_sink_captures_lines() {
        let mut sink = HttpRunSink::new();
        sink.write_line("version 1");
        sink.write_line("ok");
        let lines: Vec<&str> = sink.lines().collect();
        assert_eq!(lines, vec!["version 1", "ok"]);
    }
}
