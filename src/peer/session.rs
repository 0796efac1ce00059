use std::io::{self, ErrorKind};
use std::net::SocketAddrV4;
use std::sync::Arc;

use bit_set::BitSet;
use futures::SinkExt;
use log::{debug, info, warn};
use size::Size;
use tokio::net::TcpStream;
use tokio::time::{self, Instant};
use tokio_stream::StreamExt;
use tokio_util::codec::Framed;

use crate::client::Download;
use crate::codec::{AsyncDecoder, AsyncEncoder};
use crate::core::{Sha1, TransferRate};
use crate::message::{Block, BlockData, Handshake, Message, MessageCodec, available_pieces};
use crate::peer::{RunSignal, SessionError};
use crate::scheduler::Coordinator;
use crate::storage::Storage;

/// Frame overhead of a piece message: id, index and begin.
const PIECE_HEADER_LEN: usize = 9;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Phase {
    Connecting,
    Handshaking,
    AwaitingReady,
    Unchoked,
    Requesting,
    Closed,
    Error,
}

/// Why a session finished without an error.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SessionEnd {
    /// Every piece has been handed out.
    Exhausted,
    /// The claimed piece is not advertised by the peer. It stays claimed.
    Unservable(usize),
    Stopped,
}

type Messages = Framed<TcpStream, MessageCodec>;

/// Downloads pieces from a single peer, one whole piece per request.
pub struct Session {
    addr: SocketAddrV4,
    download: Arc<Download>,
    coordinator: Arc<Coordinator>,
    storage: Arc<Storage>,
    signal: RunSignal,
    phase: Phase,
    available: BitSet,
}

impl Session {
    pub fn new(
        addr: SocketAddrV4,
        download: Arc<Download>,
        coordinator: Arc<Coordinator>,
        storage: Arc<Storage>,
        signal: RunSignal,
    ) -> Self {
        Self {
            addr,
            download,
            coordinator,
            storage,
            signal,
            phase: Phase::Connecting,
            available: BitSet::new(),
        }
    }

    pub async fn run(mut self) -> Result<SessionEnd, SessionError> {
        let result = self.drive().await;
        match &result {
            Ok(end) => {
                self.transition(Phase::Closed);
                info!("[{}] session closed: {:?}", self.addr, end);
            }
            Err(err) => {
                self.transition(Phase::Error);
                warn!("[{}] session failed: {}", self.addr, err);
            }
        }
        result
    }

    async fn drive(&mut self) -> Result<SessionEnd, SessionError> {
        let mut socket = self.connect().await?;

        self.transition(Phase::Handshaking);
        self.exchange_handshakes(&mut socket).await?;
        let mut messages = Framed::new(socket, MessageCodec::new(self.max_message_length()));
        messages.send(Message::Interested).await?;

        self.transition(Phase::AwaitingReady);
        self.await_unchoke(&mut messages).await?;

        self.transition(Phase::Unchoked);
        let end = self.download_pieces(&mut messages).await?;
        if let Err(err) = SinkExt::<Message>::close(&mut messages).await {
            debug!("[{}] error closing connection: {}", self.addr, err);
        }
        Ok(end)
    }

    fn transition(&mut self, phase: Phase) {
        debug!("[{}] {:?} -> {:?}", self.addr, self.phase, phase);
        self.phase = phase;
    }

    async fn connect(&self) -> Result<TcpStream, SessionError> {
        debug!("[{}] connecting...", self.addr);
        let timeout = self.download.config.connect_timeout;
        let socket = time::timeout(timeout, TcpStream::connect(self.addr))
            .await
            .map_err(io::Error::from)
            .and_then(|result| result)
            .map_err(SessionError::Connect)?;
        Ok(socket)
    }

    /// Fails with `HandshakeMismatch` when the reply speaks another protocol, and also when it
    /// names a different info hash than ours.
    async fn exchange_handshakes(&self, socket: &mut TcpStream) -> Result<(), SessionError> {
        let info_hash = self.download.torrent.info.info_hash;
        let handshake = Handshake::new(info_hash, self.download.config.client_id.clone());
        handshake.encode(socket).await?;
        let reply = Handshake::decode(socket).await?;
        if !reply.is_standard_protocol() || reply.info_hash != info_hash {
            return Err(SessionError::HandshakeMismatch);
        }
        debug!("[{}] handshake with {:?}", self.addr, reply.peer_id);
        Ok(())
    }

    /// Large enough for a whole piece or a bitfield covering every piece.
    fn max_message_length(&self) -> usize {
        let info = &self.download.torrent.info;
        info.piece_length.max(info.total_pieces().div_ceil(8)) + PIECE_HEADER_LEN
    }

    async fn await_unchoke(&mut self, messages: &mut Messages) -> Result<(), SessionError> {
        loop {
            match next_message(messages).await? {
                Message::Unchoke => return Ok(()),
                Message::Bitfield(bitfield) => {
                    let total_pieces = self.coordinator.total_pieces();
                    self.available = available_pieces(&bitfield, total_pieces);
                    debug!(
                        "[{}] peer has {}/{} pieces",
                        self.addr,
                        self.available.len(),
                        total_pieces
                    );
                }
                message => debug!("[{}] ignoring {:?}", self.addr, message),
            }
        }
    }

    async fn download_pieces(&mut self, messages: &mut Messages) -> Result<SessionEnd, SessionError> {
        let piece_length = self.download.torrent.info.piece_length;
        loop {
            if !self.signal.proceed().await {
                return Ok(SessionEnd::Stopped);
            }
            let Some(index) = self.coordinator.claim_next() else {
                return Ok(SessionEnd::Exhausted);
            };
            if !self.available.contains(index) {
                debug!("[{}] peer does not have piece {}", self.addr, index);
                return Ok(SessionEnd::Unservable(index));
            }

            self.transition(Phase::Requesting);
            let start = Instant::now();
            messages
                .send(Message::Request(Block::new(index, 0, piece_length)))
                .await?;
            let reply = loop {
                match next_message(messages).await? {
                    Message::KeepAlive => continue,
                    message => break message,
                }
            };
            self.transition(Phase::Unchoked);

            let Message::Piece(block) = reply else {
                debug!(
                    "[{}] expected piece {}, discarding {:?}",
                    self.addr, index, reply
                );
                continue;
            };
            let transfer_rate = TransferRate(Size::from_bytes(block.data.len()), start.elapsed());
            debug!("[{}] piece {} at {}", self.addr, index, transfer_rate);
            self.complete_piece(index, block).await?;
            self.pace(transfer_rate).await;
        }
    }

    /// Verifies the block against the piece hash and persists it. A mismatching block is dropped
    /// and the piece stays claimed.
    async fn complete_piece(&self, index: usize, block: BlockData) -> Result<(), SessionError> {
        let matches = self
            .coordinator
            .expected_hash(index)
            .is_ok_and(|expected| Sha1::digest(&block.data) == *expected);
        if !matches {
            warn!(
                "[{}] hash mismatch for piece {} ({} bytes, expected {}), dropping",
                self.addr,
                index,
                block.data.len(),
                self.download.torrent.info.piece_size(index)
            );
            return Ok(());
        }
        self.storage
            .write_block(index, 0, &block.data)
            .await
            .map_err(SessionError::Storage)?;
        if let Ok(true) = self.coordinator.mark_verified(index) {
            info!(
                "[{}] verified piece {} ({}/{})",
                self.addr,
                index,
                self.coordinator.verified_count(),
                self.coordinator.total_pieces()
            );
        }
        Ok(())
    }

    async fn pace(&self, transfer_rate: TransferRate) {
        let Some(limit) = self.download.config.download_limit else {
            return;
        };
        let delay = transfer_rate.throttle(limit);
        if !delay.is_zero() {
            debug!("[{}] throttling for {:?}", self.addr, delay);
            time::sleep(delay).await;
        }
    }
}

async fn next_message(messages: &mut Messages) -> Result<Message, SessionError> {
    let message = messages
        .next()
        .await
        .ok_or_else(|| io::Error::from(ErrorKind::UnexpectedEof))??;
    Ok(message)
}
