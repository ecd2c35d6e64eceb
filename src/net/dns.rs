//! Captive DNS responder.
//!
//! Answers every incoming query with the device's own address so that any
//! client joining the access point lands on the web interface no matter
//! what name it looks up. Internal faults are answered with SERVFAIL.
//!
//! The wire codec is pure (`answer_query` / `build_servfail`) and the
//! responder services at most [`DNS_QUERIES_PER_TICK`] packets per call so
//! DNS load can never starve the other periodic work on the loop.

use core::net::Ipv4Addr;

use log::{debug, trace, warn};

use crate::app::ports::DnsSocketPort;
use crate::config::{DNS_QUERIES_PER_TICK, DNS_TTL_SECS};
use crate::error::DnsError;

/// Largest packet we accept or emit (classic UDP DNS limit).
pub const MAX_PACKET: usize = 512;

const HEADER_LEN: usize = 12;
/// QR=1, RD=1, RA=1, RCODE=0.
const FLAGS_RESPONSE: [u8; 2] = [0x81, 0x80];
/// QR=1, RD=1, RA=1, RCODE=2 (server failure).
const FLAGS_SERVFAIL: [u8; 2] = [0x81, 0x82];

/// Captive responder; armed with the device address once a connection
/// state carrying an address is reached.
pub struct CaptiveDns {
    ip: Option<Ipv4Addr>,
    answered: u64,
}

impl CaptiveDns {
    pub fn new() -> Self {
        Self {
            ip: None,
            answered: 0,
        }
    }

    /// Start answering queries with `ip`.
    pub fn arm(&mut self, ip: Ipv4Addr) {
        debug!("dns: captive responder armed, answering with {ip}");
        self.ip = Some(ip);
    }

    pub fn is_armed(&self) -> bool {
        self.ip.is_some()
    }

    /// Total queries answered (SERVFAILs included).
    pub fn answered(&self) -> u64 {
        self.answered
    }

    /// Service pending queries, bounded per call. Returns packets handled.
    pub fn service(&mut self, sock: &mut impl DnsSocketPort) -> usize {
        let Some(ip) = self.ip else {
            return 0;
        };

        let mut handled = 0;
        let mut query = [0u8; MAX_PACKET];
        let mut reply = [0u8; MAX_PACKET + 16];

        while handled < DNS_QUERIES_PER_TICK {
            let Some(len) = sock.poll(&mut query) else {
                break;
            };
            handled += 1;

            match answer_query(&query[..len], ip, &mut reply) {
                Ok(reply_len) => {
                    trace!("dns: answered {len}-byte query with {ip}");
                    sock.reply(&reply[..reply_len]);
                    self.answered += 1;
                }
                Err(e) => match build_servfail(&query[..len], &mut reply) {
                    Some(reply_len) => {
                        warn!("dns: {e}, replying SERVFAIL");
                        sock.reply(&reply[..reply_len]);
                        self.answered += 1;
                    }
                    // Not even an id to echo; drop on the floor.
                    None => warn!("dns: {e}, dropped"),
                },
            }
        }
        handled
    }
}

// ───────────────────────────────────────────────────────────────
// Wire codec
// ───────────────────────────────────────────────────────────────

/// Build the captive answer for `query`: the query echoed back with the
/// response flags set and a single A record pointing at `ip`, TTL
/// [`DNS_TTL_SECS`].
pub fn answer_query(query: &[u8], ip: Ipv4Addr, out: &mut [u8]) -> Result<usize, DnsError> {
    validate_query(query)?;

    let answer_len = query.len() + 16;
    if answer_len > out.len() {
        return Err(DnsError::ResponseTooLarge);
    }

    out[..query.len()].copy_from_slice(query);
    out[2..4].copy_from_slice(&FLAGS_RESPONSE);
    // ANCOUNT = 1; authority and additional cleared.
    out[6..8].copy_from_slice(&1u16.to_be_bytes());
    out[8..12].fill(0);

    let a = &mut out[query.len()..answer_len];
    a[0..2].copy_from_slice(&[0xC0, 0x0C]); // name: pointer to the question
    a[2..4].copy_from_slice(&1u16.to_be_bytes()); // TYPE A
    a[4..6].copy_from_slice(&1u16.to_be_bytes()); // CLASS IN
    a[6..10].copy_from_slice(&DNS_TTL_SECS.to_be_bytes());
    a[10..12].copy_from_slice(&4u16.to_be_bytes()); // RDLENGTH
    a[12..16].copy_from_slice(&ip.octets());

    Ok(answer_len)
}

/// SERVFAIL reply echoing the query id. `None` when the packet is too
/// short to even carry an id.
pub fn build_servfail(query: &[u8], out: &mut [u8]) -> Option<usize> {
    if query.len() < 2 || out.len() < HEADER_LEN {
        return None;
    }
    out[..HEADER_LEN].fill(0);
    out[..2].copy_from_slice(&query[..2]);
    out[2..4].copy_from_slice(&FLAGS_SERVFAIL);
    Some(HEADER_LEN)
}

/// A query must carry a full header, the query bit, at least one question,
/// and a complete QNAME + QTYPE + QCLASS within the packet.
fn validate_query(query: &[u8]) -> Result<(), DnsError> {
    if query.len() < HEADER_LEN {
        return Err(DnsError::Malformed);
    }
    if query[2] & 0x80 != 0 {
        // A response, not a query.
        return Err(DnsError::Malformed);
    }
    let qdcount = u16::from_be_bytes([query[4], query[5]]);
    if qdcount == 0 {
        return Err(DnsError::Malformed);
    }

    // Walk the first QNAME.
    let mut pos = HEADER_LEN;
    loop {
        let len = *query.get(pos).ok_or(DnsError::Malformed)? as usize;
        if len == 0 {
            pos += 1;
            break;
        }
        if len > 63 {
            // Compression pointers are not legal in a question we parse.
            return Err(DnsError::Malformed);
        }
        pos += 1 + len;
    }
    // QTYPE + QCLASS.
    if pos + 4 > query.len() {
        return Err(DnsError::Malformed);
    }
    Ok(())
}
