use log::warn;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_encode};
use size::Size;
use url::Url;

use crate::client::Config;
use crate::core::{PeerId, Sha1};
use crate::torrent::Torrent;

/// Used in place of `udp://` announce URLs, since only the HTTP tracker protocol is spoken. Peers
/// returned by it are not necessarily part of the intended swarm.
pub const FALLBACK_TRACKER: &str = "http://tracker.opentrackr.org:1337/announce";

/// Everything but the RFC 3986 unreserved characters is escaped, so a space is `%20` and never `+`.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug)]
pub struct TrackerRequest {
    pub announce: Url,
    pub info_hash: Sha1,
    pub peer_id: PeerId,
    /// The port number that the client is listening on. Ports reserved for BitTorrent are
    /// typically 6881-6889.
    pub port: u16,
    /// The total amount uploaded (since the client sent the 'started' event to the tracker).
    pub uploaded: Size,
    /// The total amount downloaded (since the client sent the 'started' event to the tracker).
    pub downloaded: Size,
    /// The number of bytes needed to download to be 100% complete and get all the included files
    /// in the torrent.
    pub left: Size,
}

impl TrackerRequest {
    pub fn started(torrent: &Torrent, config: &Config) -> Result<Self, url::ParseError> {
        let announce = if torrent.announce.scheme() == "udp" {
            warn!(
                "udp tracker {} not supported, using {} instead",
                torrent.announce, FALLBACK_TRACKER
            );
            Url::parse(FALLBACK_TRACKER)?
        } else {
            torrent.announce.clone()
        };
        Ok(Self {
            announce,
            info_hash: torrent.info.info_hash,
            peer_id: config.client_id.clone(),
            port: config.port,
            uploaded: Size::from_bytes(0),
            downloaded: Size::from_bytes(0),
            left: Size::from_bytes(torrent.info.total_length()),
        })
    }
}

impl From<TrackerRequest> for Url {
    fn from(value: TrackerRequest) -> Self {
        let mut url = value.announce;
        let mut query = url
            .query()
            .filter(|query| !query.is_empty())
            .map(|query| format!("{}&", query))
            .unwrap_or_default();
        query.push_str(&format!(
            "info_hash={}&peer_id={}&port={}&uploaded={}&downloaded={}&left={}&compact=1&event=started",
            url_encode(&value.info_hash.0),
            url_encode(&value.peer_id.0),
            value.port,
            value.uploaded.bytes(),
            value.downloaded.bytes(),
            value.left.bytes(),
        ));
        url.set_query(Some(&query));
        url
    }
}

fn url_encode(bytes: &[u8]) -> String {
    percent_encode(bytes, QUERY_VALUE).to_string()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::torrent::tests::{info_value, metainfo};

    use super::*;

    fn torrent(announce: &str) -> Torrent {
        let info = info_value(5678, 4096, &[Sha1([0x01; 20]), Sha1([b'a'; 20])]);
        Torrent::try_from(&metainfo(announce, info)).unwrap()
    }

    fn config() -> Config {
        Config::new(PathBuf::from("/tmp")).with_client_id(PeerId(*b"-PM0001-abcdefghijkl"))
    }

    #[test]
    fn request_url() {
        let torrent = torrent("http://tracker.example.com/announce");
        let request = TrackerRequest::started(&torrent, &config()).unwrap();
        let info_hash = url_encode(&torrent.info.info_hash.0);

        let url = Url::from(request);

        assert_eq!(
            url.as_str(),
            format!(
                "http://tracker.example.com/announce?info_hash={}&peer_id=-PM0001-abcdefghijkl\
                 &port=6881&uploaded=0&downloaded=0&left=5678&compact=1&event=started",
                info_hash
            )
        );
    }

    #[test]
    fn raw_bytes_are_percent_encoded() {
        assert_eq!(url_encode(&[0x00, 0x7f, b'a', 0xff]), "%00%7Fa%FF");
        assert_eq!(url_encode(&[0x20, b'*', b'A', b'+']), "%20%2AA%2B");
        assert_eq!(url_encode(b"-PM0001-a.b_c~"), "-PM0001-a.b_c~");
    }

    #[test]
    fn existing_query_is_preserved() {
        let torrent = torrent("http://tracker.example.com/announce?passkey=secret");
        let request = TrackerRequest::started(&torrent, &config()).unwrap();

        let url = Url::from(request);

        assert!(url.query().unwrap().starts_with("passkey=secret&info_hash="));
    }

    #[test]
    fn udp_tracker_falls_back_to_http() {
        let torrent = torrent("udp://tracker.opentrackr.org:1337/announce");

        let request = TrackerRequest::started(&torrent, &config()).unwrap();

        assert_eq!(request.announce.as_str(), FALLBACK_TRACKER);
    }
}
