use std::path::Path;

use log::{debug, warn};
use serde::Deserialize;
use size::Size;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Deserialize)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// User settings shared with the front-end, stored as JSON:
///
/// ```json
/// { "upload_limit": 0, "download_limit": 512, "theme": "Dark" }
/// ```
///
/// Limits are in KB/s, 0 meaning unlimited. Only the download limit is used by the downloader.
#[derive(Debug, PartialEq, Eq, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[allow(dead_code)]
    pub upload_limit: u64,
    pub download_limit: u64,
    #[allow(dead_code)]
    pub theme: Theme,
}

impl Settings {
    /// Reads settings from `path`. A missing or unreadable file yields the defaults.
    pub async fn load(path: &Path) -> Self {
        let contents = match tokio::fs::read(path).await {
            Ok(contents) => contents,
            Err(err) => {
                debug!("no settings at {}: {}", path.display(), err);
                return Self::default();
            }
        };
        match serde_json::from_slice(&contents) {
            Ok(settings) => settings,
            Err(err) => {
                warn!("ignoring invalid settings at {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn download_limit(&self) -> Option<Size> {
        (self.download_limit > 0).then(|| Size::from_kibibytes(self.download_limit))
    }
}
