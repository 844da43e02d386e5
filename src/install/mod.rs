//! Language server bootstrap
//!
//! Resolves which `ginko_ls` executable the editor should launch. In
//! `embedded` mode the managed copy under the extension root is checked
//! against the latest GitHub release and replaced when a newer one exists;
//! in `systemPath` mode the binary on the search path is version-checked and
//! used as is.

pub mod download;
pub mod error;
pub mod host;
pub mod installer;
pub mod layout;
pub mod progress;
pub mod staging;
pub mod version;

use std::path::PathBuf;

use semver::Version;
use tokio::sync::mpsc;

use crate::config::LanguageServerSource;
pub use download::platform::{ArtifactDescriptor, Platform, artifact_for, local_executable_name, resolve};
pub use error::{BootstrapError, Result};
pub use host::{Host, LogHost};
pub use installer::{InstallOutcome, InstallReport, Installer};
pub use progress::{InstallPhase, InstallProgress};
pub use version::{InstalledServer, Probe, probe};

/// Executable the editor should start, threaded back to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    pub program: PathBuf,
    /// Version the executable reports, when known
    pub version: Option<Version>,
    pub source: LanguageServerSource,
}

/// Resolve the server executable for the running host.
pub async fn bootstrap(host: &dyn Host) -> Result<ServerCommand> {
    bootstrap_with_progress(host, Platform::detect(), None).await
}

/// Resolve the server executable for `platform`, reporting installer progress on `progress`.
pub async fn bootstrap_with_progress(
    host: &dyn Host,
    platform: &Platform,
    progress: Option<mpsc::Sender<InstallProgress>>,
) -> Result<ServerCommand> {
    let result = match host.config().language_server {
        LanguageServerSource::Embedded => embedded(host, platform, progress).await,
        LanguageServerSource::SystemPath => system_path(host).await,
    };
    if let Err(e) = &result {
        host.notify(&format!("Cannot start language server: {e}"));
    }
    result
}

async fn embedded(
    host: &dyn Host,
    platform: &Platform,
    progress: Option<mpsc::Sender<InstallProgress>>,
) -> Result<ServerCommand> {
    let installer = Installer::from_config(host.config(), platform)?;
    host.log(&format!(
        "Checking for language server executable in {}",
        installer.layout().install_root().display()
    ));

    match installer.run(host, progress).await {
        // A skipped prerelease on first run leaves nothing to launch
        Ok(InstallReport {
            outcome: InstallOutcome::SkippedPrerelease { latest },
            server: InstalledServer {
                reported_version: None,
                ..
            },
            ..
        }) => Err(BootstrapError::NoEligibleRelease {
            latest: latest.to_string(),
        }),
        Ok(report) => Ok(ServerCommand {
            program: report.server.executable_path,
            version: report.server.reported_version,
            source: LanguageServerSource::Embedded,
        }),
        Err(e) if e.is_rollback() && installer::has_installed(&installer.executable_path()).await => {
            let program = installer.executable_path();
            host.notify(&format!(
                "Language server update failed: {e}. Continuing with the installed version."
            ));
            let version = probe(&program).await.ok().and_then(|p| p.version().cloned());
            Ok(ServerCommand {
                program,
                version,
                source: LanguageServerSource::Embedded,
            })
        }
        Err(e) => Err(e),
    }
}

async fn system_path(host: &dyn Host) -> Result<ServerCommand> {
    let name = &host.config().binary_name;
    let not_found = || BootstrapError::NotOnPath { name: name.clone() };

    let program = version::locate_on_path(name).ok_or_else(not_found)?;
    match probe(&program).await? {
        Probe::Installed(version) => {
            host.log(&format!("Using {name} version {version} from the system path"));
            Ok(ServerCommand {
                program,
                version: Some(version),
                source: LanguageServerSource::SystemPath,
            })
        }
        Probe::NotInstalled => Err(not_found()),
    }
}
