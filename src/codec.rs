use std::io::Result;

use tokio::io::{AsyncRead, AsyncWrite};

/// Written straight to a stream, before any framing is in place (the peer handshake).
pub trait AsyncEncoder {
    async fn encode<S: AsyncWrite + Unpin>(&self, stream: &mut S) -> Result<()>;
}

/// Read straight from a stream, consuming exactly the bytes that belong to the value.
pub trait AsyncDecoder: Sized {
    async fn decode<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Self>;
}

/// Size of a message on the wire, length prefix included.
pub trait TransportMessage {
    fn transport_bytes(&self) -> usize;
}
