//! Property tests for the wire-facing codecs.
//!
//! Runs on host only — proptest is not available for ESP32 targets.

#![cfg(not(target_os = "espidf"))]

use core::net::Ipv4Addr;

use cmdlink::net::dns::{MAX_PACKET, answer_query, build_servfail};
use cmdlink::transports::frame::{FrameDecoder, encode_frame};
use cmdlink::transports::http::cmd_param;
use proptest::prelude::*;

// ── Frame codec ───────────────────────────────────────────────

proptest! {
    /// Any sequence of frames survives arbitrary read-boundary splits.
    #[test]
    fn frames_survive_arbitrary_splits(
        payloads in proptest::collection::vec(
            proptest::collection::vec(0u8..=255, 1..=64),
            1..=8,
        ),
        split in 1usize..=16,
    ) {
        let mut wire = Vec::new();
        for p in &payloads {
            wire.extend_from_slice(&encode_frame(p).unwrap());
        }

        let mut decoder = FrameDecoder::new();
        let mut decoded: Vec<Vec<u8>> = Vec::new();
        for chunk in wire.chunks(split) {
            decoder.feed(chunk, |f| decoded.push(f.to_vec()));
        }

        prop_assert_eq!(decoded, payloads);
    }

    /// Arbitrary line noise never panics the decoder, and a clean frame
    /// afterwards still decodes (zero-length bytes resync).
    #[test]
    fn decoder_tolerates_noise(noise in proptest::collection::vec(any::<u8>(), 0..=128)) {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&noise, |_| {});
        decoder.reset();

        let mut seen = Vec::new();
        decoder.feed(b"\x02ok", |f| seen.push(f.to_vec()));
        prop_assert_eq!(seen, vec![b"ok".to_vec()]);
    }
}

// ── Captive DNS codec ─────────────────────────────────────────

fn valid_query() -> impl Strategy<Value = Vec<u8>> {
    (
        any::<u16>(),
        proptest::collection::vec("[a-z]{1,16}", 1..=4),
    )
        .prop_map(|(id, labels)| {
            let mut q = Vec::new();
            q.extend_from_slice(&id.to_be_bytes());
            q.extend_from_slice(&[0x01, 0x00]);
            q.extend_from_slice(&1u16.to_be_bytes());
            q.extend_from_slice(&[0u8; 6]);
            for label in &labels {
                q.push(label.len() as u8);
                q.extend_from_slice(label.as_bytes());
            }
            q.push(0);
            q.extend_from_slice(&1u16.to_be_bytes());
            q.extend_from_slice(&1u16.to_be_bytes());
            q
        })
}

proptest! {
    /// Every well-formed query gets an answer carrying the device address
    /// and echoing the question section verbatim.
    #[test]
    fn every_valid_query_resolves_to_the_device(query in valid_query()) {
        let ip = Ipv4Addr::new(192, 168, 4, 1);
        let mut out = [0u8; MAX_PACKET + 16];
        let len = answer_query(&query, ip, &mut out).unwrap();

        prop_assert_eq!(len, query.len() + 16);
        prop_assert_eq!(&out[..2], &query[..2]);
        prop_assert_eq!(&out[12..query.len()], &query[12..]);
        prop_assert_eq!(&out[len - 4..len], &[192, 168, 4, 1]);
    }

    /// Arbitrary bytes never panic the codec; they either answer, SERVFAIL,
    /// or drop.
    #[test]
    fn codec_never_panics_on_garbage(packet in proptest::collection::vec(any::<u8>(), 0..=160)) {
        let ip = Ipv4Addr::new(192, 168, 4, 1);
        let mut out = [0u8; MAX_PACKET + 16];
        if answer_query(&packet, ip, &mut out).is_err() {
            let _ = build_servfail(&packet, &mut out);
        }
    }
}

// ── HTTP query decoding ───────────────────────────────────────

proptest! {
    #[test]
    fn cmd_param_never_panics(query in "[ -~]{0,128}") {
        let _ = cmd_param(&query);
    }

    /// Plus-for-space decoding holds for any command made of word
    /// characters and spaces.
    #[test]
    fn plus_decodes_to_space(words in proptest::collection::vec("[a-zA-Z0-9]{1,8}", 1..=5)) {
        let joined = words.join(" ");
        let encoded = words.join("+");
        let query = format!("cmd={encoded}");
        let decoded = cmd_param(&query);
        prop_assert_eq!(decoded.as_str(), joined.as_str());
    }
}
