//! Release asset download into the staging directory

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use log::{debug, info};
use reqwest::StatusCode;
use semver::Version;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use super::github::ReleaseAsset;
use crate::install::error::{BootstrapError, Result};
use crate::install::progress::{InstallProgress, ProgressSink};

/// Emit a progress update every 256KB
const PROGRESS_CHUNK: u64 = 256 * 1024;

/// Download `asset` to `dest`, bounded by `budget` end to end.
///
/// The budget covers connecting, the response headers and the whole body.
/// When it fires the transfer is dropped mid-flight and nothing is retried.
/// `dest` must not exist yet; whatever was partially written is left for the
/// caller's staging guard to discard.
pub async fn download_asset(
    client: &reqwest::Client,
    asset: &ReleaseAsset,
    dest: &Path,
    version: &Version,
    budget: Duration,
    progress: &mut ProgressSink,
) -> Result<u64> {
    info!("Fetching {}", asset.download_url);
    match timeout(budget, fetch_to_file(client, asset, dest, version, budget, progress)).await {
        Ok(result) => result,
        Err(_) => Err(BootstrapError::DownloadTimeout {
            url: asset.download_url.clone(),
            timeout: budget,
        }),
    }
}

async fn fetch_to_file(
    client: &reqwest::Client,
    asset: &ReleaseAsset,
    dest: &Path,
    version: &Version,
    budget: Duration,
    progress: &mut ProgressSink,
) -> Result<u64> {
    let url = asset.download_url.as_str();
    let transport_error = |e: reqwest::Error| {
        if e.is_timeout() {
            BootstrapError::DownloadTimeout {
                url: url.to_string(),
                timeout: budget,
            }
        } else {
            BootstrapError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(transport_error)?;
    if response.status() != StatusCode::OK {
        return Err(BootstrapError::DownloadFailed {
            url: url.to_string(),
            reason: format!("Download returned status {}", response.status()),
        });
    }

    let total_bytes = response.content_length().unwrap_or(asset.size);
    let write_error = |source: std::io::Error| BootstrapError::Write {
        path: dest.to_path_buf(),
        source,
    };

    info!("Writing {}", dest.display());
    // create_new: never clobber a concurrent download of the same version
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .await
        .map_err(write_error)?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let mut last_progress_bytes = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(transport_error)?;
        file.write_all(&chunk).await.map_err(write_error)?;
        downloaded += chunk.len() as u64;

        if downloaded - last_progress_bytes >= PROGRESS_CHUNK {
            progress.send(InstallProgress::download(version, downloaded, total_bytes));
            last_progress_bytes = downloaded;
        }
    }

    // The archive must be fully on disk before extraction starts
    file.flush().await.map_err(write_error)?;
    file.sync_all().await.map_err(write_error)?;
    drop(file);

    if asset.size > 0 && downloaded != asset.size {
        return Err(BootstrapError::DownloadFailed {
            url: url.to_string(),
            reason: format!(
                "received {} bytes but the release advertises {}",
                downloaded, asset.size
            ),
        });
    }

    progress.send(InstallProgress::download(version, downloaded, total_bytes));
    debug!("Downloaded {} bytes to {}", downloaded, dest.display());
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn asset(server: &MockServer, size: u64) -> ReleaseAsset {
        ReleaseAsset {
            name: "ginko_ls-x86_64-unknown-linux-gnu.zip".to_string(),
            download_url: format!("{}/download/ginko_ls.zip", server.uri()),
            size,
        }
    }

    #[tokio::test]
    async fn test_download_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/ginko_ls.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"zip-bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.zip");
        let written = download_asset(
            &reqwest::Client::new(),
            &asset(&server, 9),
            &dest,
            &Version::new(1, 2, 0),
            Duration::from_secs(5),
            &mut ProgressSink::default(),
        )
        .await
        .unwrap();

        assert_eq!(written, 9);
        assert_eq!(std::fs::read(&dest).unwrap(), b"zip-bytes");
    }

    #[tokio::test]
    async fn test_download_refuses_existing_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.zip");
        std::fs::write(&dest, b"concurrent").unwrap();

        let result = download_asset(
            &reqwest::Client::new(),
            &asset(&server, 0),
            &dest,
            &Version::new(1, 2, 0),
            Duration::from_secs(5),
            &mut ProgressSink::default(),
        )
        .await;

        assert!(matches!(result, Err(BootstrapError::Write { .. })));
        assert_eq!(std::fs::read(&dest).unwrap(), b"concurrent");
    }

    #[tokio::test]
    async fn test_download_non_ok_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.zip");
        let result = download_asset(
            &reqwest::Client::new(),
            &asset(&server, 0),
            &dest,
            &Version::new(1, 2, 0),
            Duration::from_secs(5),
            &mut ProgressSink::default(),
        )
        .await;

        assert!(matches!(result, Err(BootstrapError::DownloadFailed { .. })));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late".to_vec())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let result = download_asset(
            &reqwest::Client::new(),
            &asset(&server, 0),
            &dir.path().join("a.zip"),
            &Version::new(1, 2, 0),
            Duration::from_millis(200),
            &mut ProgressSink::default(),
        )
        .await;

        assert!(matches!(
            result,
            Err(BootstrapError::DownloadTimeout { timeout, .. }) if timeout == Duration::from_millis(200)
        ));
    }

    #[tokio::test]
    async fn test_download_truncated_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"short".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let result = download_asset(
            &reqwest::Client::new(),
            &asset(&server, 1024),
            &dir.path().join("a.zip"),
            &Version::new(1, 2, 0),
            Duration::from_secs(5),
            &mut ProgressSink::default(),
        )
        .await;

        assert!(matches!(result, Err(BootstrapError::DownloadFailed { .. })));
    }
}
