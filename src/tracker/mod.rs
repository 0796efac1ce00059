use std::net::SocketAddrV4;

use anyhow::Result;
use log::{debug, info, warn};
use url::Url;

use crate::client::Config;
use crate::torrent::Torrent;

pub use request::*;
pub use response::*;

mod request;
mod response;

/// Announces the download to its tracker and returns the peers it knows about. Every failure
/// is logged and results in an empty list.
pub async fn announce(torrent: &Torrent, config: &Config) -> Vec<SocketAddrV4> {
    match request(torrent, config).await {
        Ok(response) => {
            info!("tracker returned {} peers", response.peers.len());
            if let Some(interval) = response.interval {
                debug!("tracker asks to re-announce every {:?}", interval);
            }
            response.peers
        }
        Err(err) => {
            warn!("unable to contact tracker: {}", err);
            Vec::new()
        }
    }
}

pub async fn request(torrent: &Torrent, config: &Config) -> Result<TrackerResponse> {
    let url = Url::from(TrackerRequest::started(torrent, config)?);
    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        // Some trackers still send a bencoded failure reason along with an error status
        warn!("tracker returned status {}", response.status());
    }
    let body = response.bytes().await?;
    Ok(TrackerResponse::parse(&body))
}
