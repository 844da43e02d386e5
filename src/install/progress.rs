//! Installer phase tracking and progress events

use std::fmt;

use log::warn;
use semver::Version;
use tokio::sync::mpsc;

/// Installer state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Checking,           // Probing local version and querying the latest release
    UpToDate,           // Terminal: nothing newer published
    SkippingPrerelease, // Terminal: latest release is a prerelease
    Downloading,        // Streaming the archive into staging
    Extracting,         // Unpacking and swapping into the install directory
    Installed,          // Terminal: new server in place
    FailedRolledBack,   // Terminal: failure, prior install untouched
}

impl InstallPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            InstallPhase::UpToDate
                | InstallPhase::SkippingPrerelease
                | InstallPhase::Installed
                | InstallPhase::FailedRolledBack
        )
    }
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallPhase::Checking => "checking",
            InstallPhase::UpToDate => "up-to-date",
            InstallPhase::SkippingPrerelease => "skipping-prerelease",
            InstallPhase::Downloading => "downloading",
            InstallPhase::Extracting => "extracting",
            InstallPhase::Installed => "installed",
            InstallPhase::FailedRolledBack => "failed-rolled-back",
        };
        f.write_str(name)
    }
}

/// Progress update emitted while the installer runs
#[derive(Debug, Clone)]
pub struct InstallProgress {
    pub phase: InstallPhase,
    pub message: String,

    /// Release being installed, once known
    pub version: Option<Version>,

    /// Bytes written to staging so far (download phase only)
    pub bytes_downloaded: u64,

    /// Advertised archive size, 0 when unknown
    pub total_bytes: u64,
}

impl InstallProgress {
    pub fn phase(phase: InstallPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            version: None,
            bytes_downloaded: 0,
            total_bytes: 0,
        }
    }

    /// Download progress with byte counts
    pub fn download(version: &Version, bytes_downloaded: u64, total_bytes: u64) -> Self {
        let message = if total_bytes > 0 {
            let mb_downloaded = bytes_downloaded as f64 / 1_048_576.0;
            let mb_total = total_bytes as f64 / 1_048_576.0;
            let percent = (bytes_downloaded * 100 / total_bytes).min(100);
            format!(
                "Downloading {} ({:.1} MB / {:.1} MB) - {}%",
                version, mb_downloaded, mb_total, percent
            )
        } else {
            format!("Downloading {} ({} bytes)", version, bytes_downloaded)
        };

        Self {
            phase: InstallPhase::Downloading,
            message,
            version: Some(version.clone()),
            bytes_downloaded,
            total_bytes,
        }
    }

    pub fn with_version(mut self, version: &Version) -> Self {
        self.version = Some(version.clone());
        self
    }
}

/// Best-effort progress sink.
///
/// Progress is advisory: a full or closed channel never fails the install.
/// After the receiver goes away further updates are dropped silently.
#[derive(Debug, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::Sender<InstallProgress>>,
    disabled: bool,
}

impl ProgressSink {
    pub fn new(tx: Option<mpsc::Sender<InstallProgress>>) -> Self {
        Self {
            tx,
            disabled: false,
        }
    }

    pub fn send(&mut self, progress: InstallProgress) {
        if self.disabled {
            return;
        }
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.try_send(progress)
            && matches!(e, mpsc::error::TrySendError::Closed(_))
        {
            warn!("Progress channel closed, continuing without updates");
            self.disabled = true;
        }
    }
}
