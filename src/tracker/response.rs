use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use log::warn;

use crate::bencoding::Value;

const COMPACT_PEER_LEN: usize = 6;

/// The interesting parts of an announce reply. Anything that cannot be understood yields an
/// empty peer list rather than an error, since one bad tracker reply should not end a download.
#[derive(Debug, PartialEq, Default)]
pub struct TrackerResponse {
    pub interval: Option<Duration>,
    pub peers: Vec<SocketAddrV4>,
}

impl TrackerResponse {
    pub fn parse(body: &[u8]) -> Self {
        if body.first() == Some(&b'<') {
            warn!("tracker returned an HTML page instead of a bencoded reply");
            return Self::default();
        }
        let value = match Value::try_from(body) {
            Ok(value) => value,
            Err(err) => {
                warn!("unable to decode tracker reply: {}", err);
                return Self::default();
            }
        };
        if let Some(reason) = value.get("failure reason") {
            warn!(
                "tracker refused announce: {}",
                String::from_utf8_lossy(reason.as_bytes().unwrap_or_default())
            );
            return Self::default();
        }

        let interval = value
            .get("interval")
            .and_then(Value::as_integer)
            .and_then(|secs| u64::try_from(secs).ok())
            .map(Duration::from_secs);

        let peers = match select_peers(&value) {
            Some(Value::String(compact)) => compact_peers(compact),
            Some(Value::List(entries)) => entries.iter().filter_map(dictionary_peer).collect(),
            _ => Vec::new(),
        };
        Self { interval, peers }
    }
}

/// `peers` wins unless it is absent or empty, in which case `peers6` is tried.
fn select_peers(value: &Value) -> Option<&Value> {
    let is_empty = |peers: &Value| match peers {
        Value::String(bytes) => bytes.is_empty(),
        Value::List(entries) => entries.is_empty(),
        _ => false,
    };
    match value.get("peers") {
        Some(peers) if !is_empty(peers) => Some(peers),
        _ => value.get("peers6"),
    }
}

/// 6 bytes per peer: IPv4 address then big-endian port. A trailing partial record is ignored.
fn compact_peers(bytes: &[u8]) -> Vec<SocketAddrV4> {
    bytes
        .chunks_exact(COMPACT_PEER_LEN)
        .map(|chunk| {
            let ip = Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]);
            let port = u16::from_be_bytes([chunk[4], chunk[5]]);
            SocketAddrV4::new(ip, port)
        })
        .collect()
}

fn dictionary_peer(value: &Value) -> Option<SocketAddrV4> {
    let ip = value.get("ip")?.as_str()?.parse::<Ipv4Addr>().ok()?;
    let port = u16::try_from(value.get("port")?.as_integer()?).ok()?;
    Some(SocketAddrV4::new(ip, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn localhost(port: u16) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::LOCALHOST, port)
    }

    #[test]
    fn compact_peers_reply() {
        let body = b"d8:intervali1800e5:peers12:\x7f\x00\x00\x01\x1a\xe1\x7f\x00\x00\x01\x1a\xe2e";

        let response = TrackerResponse::parse(body);

        assert_eq!(
            response,
            TrackerResponse {
                interval: Some(Duration::from_secs(1800)),
                peers: vec![localhost(6881), localhost(6882)]
            }
        );
    }

    #[test]
    fn trailing_partial_record_is_ignored() {
        let body = b"d5:peers9:\x0a\x00\x00\x01\x1a\xe1\x0a\x00\x00e";

        let response = TrackerResponse::parse(body);

        assert_eq!(
            response.peers,
            vec![SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 6881)]
        );
    }

    #[test]
    fn empty_peers_falls_back_to_peers6() {
        let body = b"d5:peers0:6:peers66:\x7f\x00\x00\x01\x1a\xe1e";

        assert_eq!(TrackerResponse::parse(body).peers, vec![localhost(6881)]);
    }

    #[test]
    fn dictionary_peers_reply() {
        let body = Value::dictionary()
            .with_entry(
                "peers",
                Value::list()
                    .with_value(
                        Value::dictionary()
                            .with_entry("ip", Value::string("12.34.56.78"))
                            .with_entry("peer id", Value::string("-TR3000-47qm0ov7eav4"))
                            .with_entry("port", Value::Integer(51413)),
                    )
                    .with_value(
                        Value::dictionary()
                            .with_entry("ip", Value::string("2600:1702:6aa3:b210::72"))
                            .with_entry("port", Value::Integer(51413)),
                    ),
            )
            .to_bytes();

        let response = TrackerResponse::parse(&body);

        assert_eq!(
            response.peers,
            vec![SocketAddrV4::new(Ipv4Addr::new(12, 34, 56, 78), 51413)]
        );
        assert_eq!(response.interval, None);
    }

    #[test]
    fn failure_reason_yields_no_peers() {
        let body = b"d14:failure reason17:torrent not founde";

        assert_eq!(TrackerResponse::parse(body), TrackerResponse::default());
    }

    #[test]
    fn html_page_yields_no_peers() {
        let body = b"<html><body>Not Found</body></html>";

        assert_eq!(TrackerResponse::parse(body), TrackerResponse::default());
    }

    #[test]
    fn undecodable_reply_yields_no_peers() {
        assert_eq!(TrackerResponse::parse(b"d5:peers"), TrackerResponse::default());
        assert_eq!(TrackerResponse::parse(b""), TrackerResponse::default());
    }
}
