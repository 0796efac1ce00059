use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};
use size::Size;
use url::Url;

use crate::client::{Config, Download, Settings};
use crate::peer::Control;
use crate::torrent::{DownloadType, Torrent};

mod bencoding;
mod client;
mod codec;
mod core;
mod message;
mod peer;
mod scheduler;
mod storage;
mod torrent;
mod tracker;

const DEFAULT_TORRENT_FILE: &str = "download.torrent";

/// Downloads the content of a torrent from the peers its tracker knows about.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path or http(s) URL of the .torrent file
    source: String,

    /// Directory to write the downloaded file to
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Settings file (JSON with upload_limit, download_limit and theme)
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Download limit per peer in KB/s, overrides the settings file (0 for unlimited)
    #[arg(long, value_name = "KBPS")]
    download_limit: Option<u64>,

    /// Port reported to the tracker
    #[arg(long, default_value_t = 6881)]
    port: u16,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(err) = run(Args::parse()).await {
        error!("{:#}", err);
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings::load(&args.config).await;
    let download_limit = match args.download_limit {
        Some(0) => None,
        Some(limit) => Some(Size::from_kibibytes(limit)),
        None => settings.download_limit(),
    };

    let path = fetch_if_remote(&args.source, Path::new(".")).await?;
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("unable to read {}", path.display()))?;
    let torrent = Torrent::from_bytes(&bytes)
        .with_context(|| format!("invalid torrent file {}", path.display()))?;
    info!(
        "loaded {} ({}, info hash {})",
        torrent.info.name(),
        Size::from_bytes(torrent.info.total_length()),
        torrent.info.info_hash
    );
    if let DownloadType::MultiFile { files, .. } = &torrent.info.download_type {
        warn!(
            "multi-file torrent, its {} files are written back to back into a single file",
            files.len()
        );
        for file in files {
            debug!("{} ({})", file.path.display(), Size::from_bytes(file.length));
        }
    }

    let config = Config::new(args.output)
        .with_port(args.port)
        .with_download_limit(download_limit);
    let control = Control::new();
    let signal_control = control.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("stopping, press Ctrl-C again to quit immediately");
            signal_control.stop();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(1);
            }
        }
    });

    match client::run(Download { torrent, config }, control).await? {
        Some(summary) if summary.is_complete() => info!("download complete"),
        Some(summary) => warn!(
            "download incomplete: {}/{} pieces verified",
            summary.verified, summary.total
        ),
        None => {}
    }
    Ok(())
}

/// Downloads the torrent file into `dir` when `source` is an http(s) URL and returns where it was
/// saved. Anything else is treated as a local path.
async fn fetch_if_remote(source: &str, dir: &Path) -> Result<PathBuf> {
    let url = match Url::parse(source) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        _ => return Ok(PathBuf::from(source)),
    };
    let file_name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or(DEFAULT_TORRENT_FILE);
    let path = dir.join(file_name);

    info!("fetching {}", url);
    let response = reqwest::get(url.clone())
        .await
        .and_then(|response| response.error_for_status())
        .with_context(|| format!("unable to fetch {}", url))?;
    let bytes = response.bytes().await?;
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("unable to save {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use super::*;

    #[tokio::test]
    async fn local_path_is_used_as_is() {
        let dir = tempdir().unwrap();

        let path = fetch_if_remote("some/dir/file.torrent", dir.path())
            .await
            .unwrap();

        assert_eq!(path, PathBuf::from("some/dir/file.torrent"));
    }

    #[tokio::test]
    async fn remote_torrent_is_saved_under_its_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/piecemeal-test-fetch.torrent"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                b"d8:announce3:abce".to_vec(),
                "application/x-bittorrent",
            ))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();

        let path = fetch_if_remote(
            &format!("{}/files/piecemeal-test-fetch.torrent", server.uri()),
            dir.path(),
        )
        .await
        .unwrap();

        assert_eq!(path, dir.path().join("piecemeal-test-fetch.torrent"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"d8:announce3:abce");
    }

    #[test]
    fn parse_args() {
        let args = Args::parse_from([
            "piecemeal",
            "ubuntu.torrent",
            "-o",
            "/tmp/downloads",
            "--download-limit",
            "512",
        ]);

        assert_eq!(args.source, "ubuntu.torrent");
        assert_eq!(args.output, PathBuf::from("/tmp/downloads"));
        assert_eq!(args.download_limit, Some(512));
        assert_eq!(args.port, 6881);
    }
}
