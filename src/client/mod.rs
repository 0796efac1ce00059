mod config;
mod download;
mod settings;

use std::net::SocketAddrV4;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::task::JoinSet;

use crate::peer::{Control, Session, SessionEnd, SessionError};
use crate::scheduler::Coordinator;
use crate::storage::Storage;
use crate::tracker;

pub use config::*;
pub use download::*;
pub use settings::*;

/// Announces to the tracker and downloads from every peer it returns. `None` when the tracker
/// knows no peers.
pub async fn run(download: Download, control: Control) -> Result<Option<Summary>> {
    let peers = tracker::announce(&download.torrent, &download.config).await;
    if peers.is_empty() {
        info!("no peers found");
        return Ok(None);
    }
    run_with_peers(download, peers, control).await.map(Some)
}

/// Runs one session per peer until all of them finished. A storage failure in any session aborts
/// the others and is returned.
pub async fn run_with_peers(
    download: Download,
    peers: Vec<SocketAddrV4>,
    control: Control,
) -> Result<Summary> {
    let info = &download.torrent.info;
    let coordinator = Arc::new(Coordinator::new(info.pieces.clone()));
    let path = download.target_path();
    let storage = Storage::create(&path, info.total_length(), info.piece_length)
        .await
        .with_context(|| format!("unable to create {}", path.display()))?;
    info!(
        "downloading {} ({} pieces) from {} peers into {}",
        info.name(),
        info.total_pieces(),
        peers.len(),
        storage.path().display()
    );

    let download = Arc::new(download);
    let storage = Arc::new(storage);
    let mut sessions = JoinSet::new();
    for addr in peers {
        let session = Session::new(
            addr,
            Arc::clone(&download),
            Arc::clone(&coordinator),
            Arc::clone(&storage),
            control.subscribe(),
        );
        sessions.spawn(async move { (addr, session.run().await) });
    }

    while let Some(result) = sessions.join_next().await {
        match result {
            Ok((addr, Ok(end))) => log_end(addr, end),
            Ok((addr, Err(err))) if err.is_fatal() => {
                error!("[{}] {}, aborting download", addr, err);
                sessions.abort_all();
                return Err(fatal(err));
            }
            // Already logged by the session
            Ok((_, Err(_))) => {}
            Err(err) => warn!("session task failed: {}", err),
        }
    }

    let summary = Summary {
        verified: coordinator.verified_count(),
        total: coordinator.total_pieces(),
    };
    info!("verified {}/{} pieces", summary.verified, summary.total);
    Ok(summary)
}

fn log_end(addr: SocketAddrV4, end: SessionEnd) {
    match end {
        SessionEnd::Exhausted => info!("[{}] no pieces left", addr),
        SessionEnd::Unservable(piece) => info!("[{}] peer cannot serve piece {}", addr, piece),
        SessionEnd::Stopped => info!("[{}] stopped", addr),
    }
}

fn fatal(err: SessionError) -> anyhow::Error {
    anyhow::Error::new(err).context("download aborted")
}
