use std::{path::PathBuf, time::Duration};

use size::Size;

use crate::core::PeerId;

/// Configuration settings for a download
#[derive(Clone, Debug)]
pub struct Config {
    /// Identifier sent to the tracker and in every handshake
    pub client_id: PeerId,
    /// Directory the downloaded file is created in
    pub download_dir: PathBuf,
    /// Port reported to the tracker
    pub port: u16,
    /// Per-session download ceiling in bytes per second, `None` for unlimited
    pub download_limit: Option<Size>,
    /// Timeout for establishing new connections
    pub connect_timeout: Duration,
}

impl Config {
    #[allow(dead_code)]
    pub fn with_client_id(mut self, client_id: PeerId) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_download_limit(mut self, limit: Option<Size>) -> Self {
        self.download_limit = limit;
        self
    }
}

impl Config {
    pub fn new(download_dir: PathBuf) -> Self {
        Self {
            client_id: PeerId::random(),
            download_dir,
            port: 6881,
            download_limit: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}
