use std::io::Result;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::{AsyncDecoder, AsyncEncoder};
use crate::core::{PeerId, Sha1};

pub const PROTOCOL: &[u8; 19] = b"BitTorrent protocol";
pub const HANDSHAKE_LEN: usize = 68;

/// The handshake is a required message and must be the first message transmitted by the client.
///
/// _handshake: <pstrlen><pstr><reserved><info\_hash><peer\_id>_
///
/// * **pstrlen**: string length of <pstr>, as a single raw byte (19)
/// * **pstr**: string identifier of the protocol (`BitTorrent protocol`)
/// * **reserved**: eight (8) reserved bytes, all zero
/// * **info\_hash**: 20-byte SHA1 hash of the info key in the metainfo file. This is the same
///   info\_hash that is transmitted in tracker requests.
/// * **peer\_id**: 20-byte string used as a unique ID for the client.
///
/// Only version 1.0 of the protocol is spoken, so a handshake is always exactly 68 bytes and a
/// reply is read as exactly 68 bytes as well.
#[derive(Debug, PartialEq, Clone)]
pub struct Handshake {
    /// The 19 bytes following the length byte.
    pub protocol: Vec<u8>,
    pub info_hash: Sha1,
    pub peer_id: PeerId,
}

impl Handshake {
    pub fn new(info_hash: Sha1, peer_id: PeerId) -> Self {
        Self {
            protocol: PROTOCOL.to_vec(),
            info_hash,
            peer_id,
        }
    }

    pub fn is_standard_protocol(&self) -> bool {
        self.protocol == PROTOCOL
    }

    pub fn to_bytes(&self) -> [u8; HANDSHAKE_LEN] {
        let mut buf = [0; HANDSHAKE_LEN];
        buf[0] = PROTOCOL.len() as u8;
        buf[1..20].copy_from_slice(PROTOCOL);
        // bytes 20..28 are reserved and stay zero
        buf[28..48].copy_from_slice(&self.info_hash.0);
        buf[48..68].copy_from_slice(&self.peer_id.0);
        buf
    }

    fn from_bytes(buf: &[u8; HANDSHAKE_LEN]) -> Self {
        let mut info_hash = [0; 20];
        info_hash.copy_from_slice(&buf[28..48]);
        let mut peer_id = [0; 20];
        peer_id.copy_from_slice(&buf[48..68]);
        Self {
            protocol: buf[1..20].to_vec(),
            info_hash: Sha1(info_hash),
            peer_id: PeerId(peer_id),
        }
    }
}

impl AsyncDecoder for Handshake {
    async fn decode<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Self> {
        let mut buf = [0; HANDSHAKE_LEN];
        stream.read_exact(&mut buf).await?;
        Ok(Self::from_bytes(&buf))
    }
}

impl AsyncEncoder for Handshake {
    async fn encode<S: AsyncWrite + Unpin>(&self, stream: &mut S) -> Result<()> {
        stream.write_all(&self.to_bytes()).await?;
        stream.flush().await?;
        Ok(())
    }
}
