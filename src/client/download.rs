use std::path::PathBuf;

use crate::client::Config;
use crate::torrent::Torrent;

/// A torrent together with the settings it is downloaded with. Shared read-only by every session.
#[derive(Debug)]
pub struct Download {
    pub torrent: Torrent,
    pub config: Config,
}

impl Download {
    pub fn target_path(&self) -> PathBuf {
        self.config.download_dir.join(self.torrent.info.name())
    }
}

/// Outcome of a finished run.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Summary {
    pub verified: usize,
    pub total: usize,
}

impl Summary {
    pub fn is_complete(&self) -> bool {
        self.verified == self.total
    }
}
