//! On-disk layout under the extension-private root
//!
//! ```text
//! <root>/server/<binary>/<binary>-<target>/bin/<binary>[.exe]   installed server
//! <root>/server/install/<version>/<asset>.zip                 staged download
//! ```

use std::path::{Path, PathBuf};

use semver::Version;

use super::download::platform::ArtifactDescriptor;

const SERVER_DIR: &str = "server";
const STAGING_DIR: &str = "install";
const BIN_DIR: &str = "bin";

/// Paths for one server binary under an extension-private root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLayout {
    root: PathBuf,
    binary_name: String,
}

impl ServerLayout {
    pub fn new(root: impl Into<PathBuf>, binary_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            binary_name: binary_name.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `server/<binary>`, the directory release archives unpack into
    pub fn install_root(&self) -> PathBuf {
        self.root.join(SERVER_DIR).join(&self.binary_name)
    }

    /// Authoritative install directory for one platform
    pub fn platform_dir(&self, artifact: &ArtifactDescriptor) -> PathBuf {
        self.install_root().join(artifact.qualified_name())
    }

    /// Path of the installed executable for `artifact`
    pub fn executable_path(&self, artifact: &ArtifactDescriptor) -> PathBuf {
        self.platform_dir(artifact)
            .join(BIN_DIR)
            .join(artifact.executable_name())
    }

    /// Executable location relative to an extracted archive root
    pub fn relative_executable(artifact: &ArtifactDescriptor) -> PathBuf {
        PathBuf::from(artifact.qualified_name())
            .join(BIN_DIR)
            .join(artifact.executable_name())
    }

    /// `server/install`, removed after every install attempt
    pub fn staging_root(&self) -> PathBuf {
        self.root.join(SERVER_DIR).join(STAGING_DIR)
    }

    /// Version-tagged location of a downloaded archive
    pub fn staged_archive(&self, version: &Version, asset_name: &str) -> PathBuf {
        self.staging_root()
            .join(version.to_string())
            .join(asset_name)
    }
}
