//! Check-and-update state machine for the managed server
//!
//! ```text
//! Checking ─┬─> UpToDate
//!           ├─> SkippingPrerelease
//!           └─> Downloading ─> Extracting ─> Installed
//!                    │              │
//!                    └──────────────┴─> FailedRolledBack
//! ```

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};
use semver::Version;
use tokio::sync::mpsc;

use super::download::core::download_asset;
use super::download::extract::install_archive;
use super::download::github::{ReleaseClient, ReleaseMetadata};
use super::download::platform::{ArtifactDescriptor, Platform, artifact_for};
use super::error::{BootstrapError, Result};
use super::host::Host;
use super::layout::ServerLayout;
use super::progress::{InstallPhase, InstallProgress, ProgressSink};
use super::staging::StagingDir;
use super::version::{InstalledServer, Probe, cmp_release, probe};
use crate::config::BootstrapConfig;

/// How a successful run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    UpToDate,
    SkippedPrerelease { latest: Version },
    Installed { previous: Option<Version> },
}

/// Result of one installer run
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub outcome: InstallOutcome,
    /// Executable to launch and the version it is known to report
    pub server: InstalledServer,
    /// Phases visited, in order
    pub phases: Vec<InstallPhase>,
}

/// Installer for the managed language server of one platform
#[derive(Debug, Clone)]
pub struct Installer {
    client: ReleaseClient,
    layout: ServerLayout,
    artifact: ArtifactDescriptor,
    owner: String,
    repo: String,
    download_timeout: Duration,
}

impl Installer {
    pub fn new(
        client: ReleaseClient,
        layout: ServerLayout,
        artifact: ArtifactDescriptor,
        owner: impl Into<String>,
        repo: impl Into<String>,
        download_timeout: Duration,
    ) -> Self {
        Self {
            client,
            layout,
            artifact,
            owner: owner.into(),
            repo: repo.into(),
            download_timeout,
        }
    }

    /// Installer wired from configuration for `platform`.
    ///
    /// Fails with `UnsupportedPlatform` before touching the network or disk.
    pub fn from_config(config: &BootstrapConfig, platform: &Platform) -> Result<Self> {
        let artifact = artifact_for(platform, &config.binary_name)?;
        let layout = ServerLayout::new(config.resolved_root()?, config.binary_name.clone());
        let client = ReleaseClient::new(config.api_base_url.clone())?;
        Ok(Self::new(
            client,
            layout,
            artifact,
            config.owner.clone(),
            config.repo.clone(),
            config.download_timeout(),
        ))
    }

    /// Path the managed executable lives at, installed or not
    pub fn executable_path(&self) -> PathBuf {
        self.layout.executable_path(&self.artifact)
    }

    pub fn artifact(&self) -> &ArtifactDescriptor {
        &self.artifact
    }

    pub fn layout(&self) -> &ServerLayout {
        &self.layout
    }

    /// Check for a newer release and install it if there is one.
    pub async fn run(
        &self,
        host: &dyn Host,
        progress: Option<mpsc::Sender<InstallProgress>>,
    ) -> Result<InstallReport> {
        let mut tracker = PhaseTracker::new(ProgressSink::new(progress));
        let executable = self.executable_path();
        let binary = &self.artifact.binary_base_name;

        tracker.enter(InstallPhase::Checking, "Checking installed language server", None);
        host.log(&format!(
            "Using language server executable at {}",
            executable.display()
        ));

        let current = probe(&executable).await?;
        match &current {
            Probe::Installed(version) => host.log(&format!("Current {binary} version: {version}")),
            Probe::NotInstalled => host.log("No language server installed"),
        }

        let latest = self.client.latest_release(&self.owner, &self.repo).await?;
        host.log(&format!("Latest {binary} version: {}", latest.version));

        let installed = |version: Option<Version>| InstalledServer {
            executable_path: executable.clone(),
            reported_version: version,
        };

        if latest.is_prerelease() {
            host.log("Latest version is pre-release, skipping");
            tracker.enter(
                InstallPhase::SkippingPrerelease,
                format!("{} is a prerelease", latest.version),
                Some(&latest.version),
            );
            return Ok(tracker.finish(
                InstallOutcome::SkippedPrerelease {
                    latest: latest.version,
                },
                installed(current.version().cloned()),
            ));
        }

        // Not installed counts as 0.0.0: always older than any release
        if let Probe::Installed(version) = &current
            && cmp_release(&latest.version, version) != Ordering::Greater
        {
            host.log("Language server is up-to-date");
            tracker.enter(
                InstallPhase::UpToDate,
                format!("{binary} {version} is up-to-date"),
                Some(version),
            );
            return Ok(tracker.finish(InstallOutcome::UpToDate, installed(Some(version.clone()))));
        }

        host.notify("Downloading language server...");
        match self.download_and_extract(&latest, host, &mut tracker).await {
            Ok(path) => {
                tracker.enter(
                    InstallPhase::Installed,
                    format!("Installed {binary} {}", latest.version),
                    Some(&latest.version),
                );
                Ok(tracker.finish(
                    InstallOutcome::Installed {
                        previous: current.version().cloned(),
                    },
                    InstalledServer {
                        executable_path: path,
                        reported_version: Some(latest.version),
                    },
                ))
            }
            Err(e) => {
                tracker.enter(InstallPhase::FailedRolledBack, e.to_string(), Some(&latest.version));
                Err(e)
            }
        }
    }

    async fn download_and_extract(
        &self,
        latest: &ReleaseMetadata,
        host: &dyn Host,
        tracker: &mut PhaseTracker,
    ) -> Result<PathBuf> {
        let version = &latest.version;
        let asset_name = &self.artifact.compressed_asset_name;
        tracker.enter(
            InstallPhase::Downloading,
            format!("Downloading {asset_name}"),
            Some(version),
        );

        let asset = latest
            .find_asset(asset_name)
            .ok_or_else(|| BootstrapError::AssetNotFound {
                asset: asset_name.clone(),
                release: latest.name.clone(),
            })?;

        let staging_root = self.layout.staging_root();
        let version_dir = PathBuf::from(version.to_string());
        // Early exits drop the guard, which removes the staging root
        let staging = StagingDir::acquire(staging_root.clone(), &version_dir)
            .await
            .map_err(|source| BootstrapError::Write {
                path: staging_root.join(&version_dir),
                source,
            })?;

        let archive = self.layout.staged_archive(version, asset_name);
        host.log(&format!("Fetching {}", asset.download_url));
        download_asset(
            self.client.http(),
            asset,
            &archive,
            version,
            self.download_timeout,
            &mut tracker.sink,
        )
        .await?;

        tracker.enter(
            InstallPhase::Extracting,
            format!("Extracting {asset_name}"),
            Some(version),
        );
        let platform_dir = self.layout.platform_dir(&self.artifact);
        let work_dir = archive.parent().unwrap_or(staging.path());
        host.log(&format!(
            "Extracting {} to {}",
            archive.display(),
            platform_dir.display()
        ));
        let executable = install_archive(&archive, work_dir, &self.artifact, &platform_dir).await?;
        host.log(&format!("Server extracted to {}", platform_dir.display()));

        if let Err(e) = staging.close().await {
            warn!("Cannot remove {}: {}", staging_root.display(), e);
        }
        Ok(executable)
    }
}

/// Records visited phases and mirrors them onto the progress channel
struct PhaseTracker {
    sink: ProgressSink,
    phases: Vec<InstallPhase>,
}

impl PhaseTracker {
    fn new(sink: ProgressSink) -> Self {
        Self {
            sink,
            phases: Vec::with_capacity(4),
        }
    }

    fn enter(&mut self, phase: InstallPhase, message: impl Into<String>, version: Option<&Version>) {
        let message = message.into();
        debug!("installer -> {phase}: {message}");
        self.phases.push(phase);

        let mut progress = InstallProgress::phase(phase, message);
        if let Some(version) = version {
            progress = progress.with_version(version);
        }
        self.sink.send(progress);
    }

    fn finish(self, outcome: InstallOutcome, server: InstalledServer) -> InstallReport {
        InstallReport {
            outcome,
            server,
            phases: self.phases,
        }
    }
}

/// True when `path` holds a previously installed executable
pub(crate) async fn has_installed(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
