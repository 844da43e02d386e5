//! Error taxonomy for the bootstrap flow

use std::path::PathBuf;
use std::time::Duration;

/// Errors raised while resolving, probing, or installing the language server.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Host has no prebuilt server binary
    #[error(
        "Unsupported platform {arch}-{os}. Only x86_64 linux, x86_64 windows and Apple Silicon are supported."
    )]
    UnsupportedPlatform { arch: String, os: String },

    /// `--version` output could not be coerced into a semantic version
    #[error("Cannot parse a version from '{output}'")]
    VersionParse { output: String },

    /// Executable exists but could not be run (or exited with an error)
    #[error("Failed to run {} --version: {reason}", path.display())]
    ProbeExecution { path: PathBuf, reason: String },

    #[error("Failed to query latest release of {owner}/{repo}: {reason}")]
    ReleaseQuery {
        owner: String,
        repo: String,
        reason: String,
    },

    /// Release exists but lacks the platform archive
    #[error("No asset with name {asset} in release {release}")]
    AssetNotFound { asset: String, release: String },

    #[error("Language server download from {url} timed out after {:.2} seconds", timeout.as_secs_f64())]
    DownloadTimeout { url: String, timeout: Duration },

    #[error("Failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to extract {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },

    /// Nothing installed and the latest release is not eligible for install
    #[error("No language server installed and latest release {latest} is a pre-release")]
    NoEligibleRelease { latest: String },

    #[error("{name} was not found on the system path")]
    NotOnPath { name: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BootstrapError {
    /// Errors raised after the check phase that leave the prior install untouched.
    ///
    /// A caller holding a previously installed executable can keep using it
    /// when one of these surfaces.
    pub fn is_rollback(&self) -> bool {
        matches!(
            self,
            Self::ReleaseQuery { .. }
                | Self::DownloadTimeout { .. }
                | Self::DownloadFailed { .. }
                | Self::Write { .. }
                | Self::Extraction { .. }
        )
    }
}

/// Result type for bootstrap operations.
pub type Result<T> = std::result::Result<T, BootstrapError>;
