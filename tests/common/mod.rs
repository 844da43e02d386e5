//! Shared test utilities and fixtures
//!
//! A mock GitHub release registry, zip archives that contain a fake server
//! script, and a host that records everything it is told.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use ginko_bootstrap::install::layout::ServerLayout;
use ginko_bootstrap::install::{Installer, Platform, artifact_for};
use ginko_bootstrap::install::download::github::ReleaseClient;
use ginko_bootstrap::{BootstrapConfig, Host};
use walkdir::WalkDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const OWNER: &str = "Schottkyc137";
pub const REPO: &str = "ginko";
pub const LINUX_ASSET: &str = "ginko_ls-x86_64-unknown-linux-gnu.zip";
pub const LINUX_DIR: &str = "ginko_ls-x86_64-unknown-linux-gnu";

/// Host that records notifications and log lines
pub struct RecordingHost {
    config: BootstrapConfig,
    pub notices: Mutex<Vec<String>>,
    pub lines: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn new(config: BootstrapConfig) -> Self {
        Self {
            config,
            notices: Mutex::new(Vec::new()),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Host for RecordingHost {
    fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    fn notify(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }

    fn log(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

/// Config rooted at `root` talking to the mock registry
pub fn test_config(server: &MockServer, root: &Path) -> BootstrapConfig {
    BootstrapConfig {
        root: Some(root.to_path_buf()),
        api_base_url: server.uri(),
        download_timeout_secs: 5,
        ..Default::default()
    }
}

/// Installer for x86_64 linux regardless of the machine running the tests
pub fn linux_installer(server: &MockServer, root: &Path, timeout: Duration) -> Installer {
    let artifact = artifact_for(&Platform::X86_64Linux, "ginko_ls").unwrap();
    Installer::new(
        ReleaseClient::new(server.uri()).unwrap(),
        ServerLayout::new(root, "ginko_ls"),
        artifact,
        OWNER,
        REPO,
        timeout,
    )
}

pub fn linux_executable(root: &Path) -> PathBuf {
    root.join("server")
        .join("ginko_ls")
        .join(LINUX_DIR)
        .join("bin")
        .join("ginko_ls")
}

pub fn staging_root(root: &Path) -> PathBuf {
    root.join("server").join("install")
}

pub fn download_url(server: &MockServer, version: &str, asset: &str) -> String {
    format!("{}/download/{}/{}", server.uri(), version, asset)
}

/// Serve `releases/latest` with the given display name and asset names
pub async fn mount_latest_release(
    server: &MockServer,
    name: &str,
    prerelease: bool,
    assets: &[(&str, u64)],
) {
    let assets: Vec<_> = assets
        .iter()
        .map(|(asset, size)| {
            serde_json::json!({
                "name": asset,
                "browser_download_url": download_url(server, name, asset),
                "size": size,
            })
        })
        .collect();

    let body = serde_json::json!({
        "name": name,
        "tag_name": name,
        "prerelease": prerelease,
        "assets": assets,
    });

    Mock::given(method("GET"))
        .and(path(format!("/repos/{OWNER}/{REPO}/releases/latest")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Serve `bytes` at the asset's download URL, expecting `hits` requests
pub async fn mount_asset(server: &MockServer, version: &str, asset: &str, bytes: Vec<u8>, hits: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/download/{version}/{asset}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
        .expect(hits)
        .mount(server)
        .await;
}

/// Fail the test if anything is downloaded
pub async fn forbid_downloads(server: &MockServer) {
    Mock::given(method("GET"))
        .and(wiremock::matchers::path_regex(r"^/download/.*"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

pub fn server_script(version: &str) -> String {
    format!("#!/bin/sh\necho 'ginko_ls {version}'\n")
}

/// Release archive containing a fake `ginko_ls` that reports `version`
pub fn server_zip(version: &str) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o755);
        zip.add_directory(format!("{LINUX_DIR}/bin/"), options)
            .unwrap();
        zip.start_file(format!("{LINUX_DIR}/bin/ginko_ls"), options)
            .unwrap();
        zip.write_all(server_script(version).as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

/// Place a fake server reporting `version` at the managed location
#[cfg(unix)]
pub fn install_fake_server(root: &Path, version: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let exe = linux_executable(root);
    std::fs::create_dir_all(exe.parent().unwrap()).unwrap();
    std::fs::write(&exe, server_script(version)).unwrap();
    std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
    exe
}

/// Every file under `dir` with its contents, for byte-identical comparisons
pub fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let rel = entry.path().strip_prefix(dir).unwrap().to_path_buf();
            (rel, std::fs::read(entry.path()).unwrap())
        })
        .collect()
}
