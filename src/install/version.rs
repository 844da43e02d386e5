//! Local server version probing and loose semantic version coercion

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use semver::{Prerelease, Version};

use super::error::{BootstrapError, Result};

/// Flag passed to the server to print its version
pub const VERSION_FLAG: &str = "--version";

/// First `[v]MAJOR[.MINOR[.PATCH]][-PRERELEASE]` run found in a string
static LOOSE_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9a-z-]+(?:\.[0-9a-z-]+)*))?",
    )
    .expect("static version pattern is valid")
});

/// Outcome of probing a local server executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Installed(Version),
    /// Nothing at the probed path (first run)
    NotInstalled,
}

impl Probe {
    /// Installed version, or 0.0.0 so that any release counts as newer
    pub fn version_or_zero(&self) -> Version {
        match self {
            Probe::Installed(version) => version.clone(),
            Probe::NotInstalled => Version::new(0, 0, 0),
        }
    }

    pub fn version(&self) -> Option<&Version> {
        match self {
            Probe::Installed(version) => Some(version),
            Probe::NotInstalled => None,
        }
    }
}

/// A server executable on disk and the version it reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledServer {
    pub executable_path: PathBuf,
    pub reported_version: Option<Version>,
}

/// Coerce loosely formatted version text into a strict semantic version.
///
/// `v1.2` becomes `1.2.0`, `ginko 3` becomes `3.0.0`, and a `-rc1` style
/// suffix is kept as the prerelease. Build metadata is dropped.
pub fn coerce(text: &str) -> Option<Version> {
    let caps = LOOSE_VERSION.captures(text)?;
    let part = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    let mut version = Version::new(part(1)?, part(2)?, part(3)?);
    if let Some(pre) = caps.get(4) {
        let pre = pre.as_str();
        version.pre = Prerelease::new(pre)
            .or_else(|_| Prerelease::new(&strip_leading_zeros(pre)))
            .ok()?;
    }
    Some(version)
}

/// `rc.01` -> `rc.1`: semver rejects leading zeros in numeric identifiers.
fn strip_leading_zeros(pre: &str) -> String {
    pre.split('.')
        .map(|id| {
            if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
                let trimmed = id.trim_start_matches('0');
                if trimmed.is_empty() { "0" } else { trimmed }
            } else {
                id
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Order two versions by `major.minor.patch`, ignoring prerelease and build.
pub fn cmp_release(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch).cmp(&(b.major, b.minor, b.patch))
}

/// Extract the version from `--version` output (`<name> <version> ...`).
pub fn parse_version_output(stdout: &str) -> Result<Version> {
    let parse_error = || BootstrapError::VersionParse {
        output: stdout.trim().to_string(),
    };
    let token = stdout.split_whitespace().nth(1).ok_or_else(parse_error)?;
    coerce(token).ok_or_else(parse_error)
}

/// Probe the executable at `path` for its version.
///
/// A missing file is `NotInstalled`. A file that cannot be run, or that
/// exits unsuccessfully, is a `ProbeExecution` error: a broken binary is
/// not the same thing as an absent one.
pub async fn probe(path: &Path) -> Result<Probe> {
    let exists = tokio::fs::try_exists(path)
        .await
        .map_err(|e| BootstrapError::ProbeExecution {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if !exists {
        debug!("No executable at {}", path.display());
        return Ok(Probe::NotInstalled);
    }

    let output = tokio::process::Command::new(path)
        .arg(VERSION_FLAG)
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .stdout(Stdio::piped())
        .output()
        .await
        .map_err(|e| BootstrapError::ProbeExecution {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BootstrapError::ProbeExecution {
            path: path.to_path_buf(),
            reason: format!("exited with {}: {}", output.status, stderr.trim()),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = parse_version_output(&stdout)?;
    debug!("{} reports version {}", path.display(), version);
    Ok(Probe::Installed(version))
}

/// Resolve a bare executable name on the search path.
pub fn locate_on_path(name: &str) -> Option<PathBuf> {
    match which::which(name) {
        Ok(path) => Some(path),
        Err(e) => {
            debug!("{name} not found on PATH: {e}");
            None
        }
    }
}
