mod block;
mod codec;
mod handshake;

use std::fmt::Formatter;

use bit_set::BitSet;

pub use block::*;
pub use codec::*;
pub use handshake::*;

/// All of the remaining messages in the protocol take the form of <length prefix><message
/// ID><payload>. The length prefix is a four byte big-endian value. The message ID is a single
/// decimal byte. The payload is message dependent.
#[derive(PartialEq, Eq, Clone)]
pub enum Message {
    /// # keep-alive: <len=0000>
    ///
    /// A message with zero bytes: no message ID and no payload.
    KeepAlive,

    /// # choke: <len=0001><id=0>
    Choke,

    /// # unchoke: <len=0001><id=1>
    Unchoke,

    /// # interested: <len=0001><id=2>
    Interested,

    /// # not interested: <len=0001><id=3>
    NotInterested,

    /// # have: <len=0005><id=4><piece index>
    Have(usize),

    /// # bitfield: <len=0001+X><id=5><bitfield>
    ///
    /// The payload is a bitfield representing the pieces that have been successfully downloaded.
    /// The high bit in the first byte corresponds to piece index 0. Spare bits at the end are
    /// expected to be zero but are ignored when read (see [`available_pieces`]).
    Bitfield(BitSet),

    /// # request: <len=0013><id=6><index><begin><length>
    Request(Block),

    /// # piece: <len=0009+X><id=7><index><begin><block>
    Piece(BlockData),

    /// # cancel: <len=0013><id=8><index><begin><length>
    Cancel(Block),

    /// # port: <len=0003><id=9><listen-port>
    Port(u16),

    /// Any frame whose id (or length, for the given id) is not understood. The payload has been
    /// consumed from the stream; `length` includes the id byte.
    Unknown { id: u8, length: usize },
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::KeepAlive => write!(f, "KeepAlive"),
            Message::Choke => write!(f, "Choke"),
            Message::Unchoke => write!(f, "Unchoke"),
            Message::Interested => write!(f, "Interested"),
            Message::NotInterested => write!(f, "NotInterested"),
            Message::Have(piece) => write!(f, "Have {{ piece: {} }}", piece),
            Message::Bitfield(bitset) => write!(f, "Bitfield(<{} pieces>)", bitset.len()),
            Message::Request(block) => write!(f, "Request({:?})", block),
            Message::Piece(block) => write!(f, "Piece({:?})", block),
            Message::Cancel(block) => write!(f, "Cancel({:?})", block),
            Message::Port(port) => write!(f, "Port({})", port),
            Message::Unknown { id, length } => {
                write!(f, "Unknown {{ id: {}, length: {} }}", id, length)
            }
        }
    }
}

/// Piece indices advertised by a bitfield, most significant bit first, limited to
/// `total_pieces` (spare bits at the end of the last byte are dropped).
pub fn available_pieces(bitfield: &BitSet, total_pieces: usize) -> BitSet {
    bitfield
        .iter()
        .take_while(|&piece| piece < total_pieces)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Seek};

    use futures::{SinkExt, StreamExt};
    use tokio_util::bytes::BytesMut;
    use tokio_util::codec::{Decoder, Encoder, Framed};

    use super::*;

    fn encode(message: Message) -> Vec<u8> {
        let mut buf = BytesMut::new();
        MessageCodec::new(1024)
            .encode(message, &mut buf)
            .expect("unable to encode");
        buf.to_vec()
    }

    fn decode(bytes: &[u8]) -> Option<Message> {
        let mut buf = BytesMut::from(bytes);
        MessageCodec::new(1024)
            .decode(&mut buf)
            .expect("unable to decode")
    }

    #[test]
    fn interested_is_five_bytes() {
        assert_eq!(encode(Message::Interested), vec![0, 0, 0, 1, 2]);
    }

    #[test]
    fn request_layout() {
        let bytes = encode(Message::Request(Block::new(3, 0, 16384)));

        assert_eq!(
            bytes,
            vec![0, 0, 0, 13, 6, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0x40, 0]
        );
    }

    #[test]
    fn keep_alive() {
        assert_eq!(decode(&[0, 0, 0, 0]), Some(Message::KeepAlive));
    }

    #[test]
    fn wait_for_complete_frame() {
        assert_eq!(decode(&[0, 0]), None);
        assert_eq!(decode(&[0, 0, 0, 5, 4, 0, 0]), None);
    }

    #[test]
    fn piece() {
        let bytes = [0, 0, 0, 12, 7, 0, 0, 0, 2, 0, 0, 0, 0, 9, 8, 7];

        assert_eq!(
            decode(&bytes),
            Some(Message::Piece(BlockData {
                piece: 2,
                offset: 0,
                data: vec![9, 8, 7]
            }))
        );
    }

    #[test]
    fn unknown_message_payload_is_skipped() {
        let mut buf = BytesMut::from(&[0, 0, 0, 3, 20, 1, 2, 0, 0, 0, 1, 1][..]);
        let mut codec = MessageCodec::new(1024);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Message::Unknown { id: 20, length: 3 })
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Message::Unchoke));
    }

    #[test]
    fn known_id_with_unexpected_length_is_unknown() {
        assert_eq!(
            decode(&[0, 0, 0, 2, 1, 0]),
            Some(Message::Unknown { id: 1, length: 2 })
        );
    }

    #[test]
    fn bitfield_is_most_significant_bit_first() {
        let Some(Message::Bitfield(bitfield)) = decode(&[0, 0, 0, 2, 5, 0b10100000]) else {
            panic!("expected bitfield");
        };

        assert_eq!(available_pieces(&bitfield, 5), BitSet::from_iter([0, 2]));
    }

    #[test]
    fn bitfield_ignores_spare_bits() {
        let bitfield = BitSet::from_bytes(&[0b10100111, 0b11000000]);

        assert_eq!(available_pieces(&bitfield, 5), BitSet::from_iter([0, 2]));
        assert_eq!(
            available_pieces(&bitfield, 9),
            BitSet::from_iter([0, 2, 5, 6, 7, 8])
        );
    }

    #[tokio::test]
    async fn framed_round_trip() {
        let messages = vec![
            Message::KeepAlive,
            Message::Unchoke,
            Message::Have(1234),
            Message::Bitfield(BitSet::from_bytes(&[0b11010000])),
            Message::Piece(BlockData {
                piece: 1,
                offset: 2,
                data: vec![1, 2, 3],
            }),
            Message::Port(6881),
        ];
        let cursor = Cursor::new(Vec::new());
        let mut framed = Framed::new(cursor, MessageCodec::new(16));

        for message in &messages {
            framed.send(message.clone()).await.expect("unable to write");
        }
        framed.get_mut().rewind().expect("unable to rewind");

        for message in messages {
            let message_read = framed.next().await.expect("empty").expect("error");
            assert_eq!(message_read, message);
        }
    }

    #[tokio::test]
    async fn verify_max_length() {
        let message = Message::Piece(BlockData {
            piece: 1,
            offset: 2,
            data: vec![1, 2, 3],
        });
        let cursor = Cursor::new(Vec::new());
        let mut framed = Framed::new(cursor, MessageCodec::new(5));

        framed.send(message).await.expect("unable to write");
        framed.get_mut().rewind().expect("unable to rewind");
        let message_read = framed.next().await.expect("empty");

        assert!(message_read.is_err());
    }
}
