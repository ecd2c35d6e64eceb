//! UDP socket adapter for the captive DNS responder.
//!
//! Binds port 53 on the access-point interface. Non-blocking; the
//! connectivity manager polls it once per main-loop tick. The ESP-IDF
//! lwIP stack exposes standard sockets, so one implementation serves
//! both targets.

use core::net::Ipv4Addr;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use log::{debug, info};

use crate::app::ports::DnsSocketPort;

const DNS_PORT: u16 = 53;

pub struct UdpDnsSocket {
    socket: UdpSocket,
    last_peer: Option<SocketAddr>,
}

impl UdpDnsSocket {
    /// Bind the responder socket on `addr`. Call once the AP interface
    /// holds its address.
    pub fn bind(addr: Ipv4Addr) -> std::io::Result<Self> {
        let socket = UdpSocket::bind((addr, DNS_PORT))?;
        socket.set_nonblocking(true)?;
        info!("dns: listening on {addr}:{DNS_PORT}");
        Ok(Self {
            socket,
            last_peer: None,
        })
    }
}

impl DnsSocketPort for UdpDnsSocket {
    fn poll(&mut self, buf: &mut [u8]) -> Option<usize> {
        match self.socket.recv_from(buf) {
            Ok((len, peer)) => {
                self.last_peer = Some(peer);
                Some(len)
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => None,
            Err(e) => {
                debug!("dns: recv error: {e}");
                None
            }
        }
    }

    fn reply(&mut self, data: &[u8]) {
        let Some(peer) = self.last_peer else {
            return;
        };
        if let Err(e) = self.socket.send_to(data, peer) {
            debug!("dns: send to {peer} failed: {e}");
        }
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    // Binding port 53 needs privileges; loopback tests for the socket
    // behaviour run against an ephemeral port instead.
    fn ephemeral_pair() -> (UdpDnsSocket, UdpSocket) {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        server.set_nonblocking(true).unwrap();
        let addr = server.local_addr().unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client.connect(addr).unwrap();
        (
            UdpDnsSocket {
                socket: server,
                last_peer: None,
            },
            client,
        )
    }

    #[test]
    fn poll_returns_none_when_idle() {
        let (mut dns, _client) = ephemeral_pair();
        let mut buf = [0u8; 64];
        assert!(dns.poll(&mut buf).is_none());
    }

    #[test]
    fn reply_goes_to_the_last_poller() {
        let (mut dns, client) = ephemeral_pair();
        client.send(b"query").unwrap();
        // Give the loopback a moment.
        std::thread::sleep(std::time::Duration::from_millis(20));

        let mut buf = [0u8; 64];
        let len = dns.poll(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"query");

        dns.reply(b"answer");
        std::thread::sleep(std::time::Duration::from_millis(20));
        let mut back = [0u8; 64];
        let n = client.recv(&mut back).unwrap();
        assert_eq!(&back[..n], b"answer");
    }

    #[test]
    fn reply_without_peer_is_a_no_op() {
        let (mut dns, _client) = ephemeral_pair();
        dns.reply(b"answer");
    }
}
