//! Archive extraction and install directory swap
//!
//! The archive is unpacked next to the staged download, checked for the
//! expected executable, and only then renamed over the authoritative install
//! directory. The previous install is moved aside first and moved back if the
//! swap fails, so the install directory is never left half written.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::platform::ArtifactDescriptor;
use crate::install::error::{BootstrapError, Result};
use crate::install::layout::ServerLayout;

const UNPACK_DIR: &str = "extracted";
const BACKUP_DIR: &str = "previous";

/// Unpack `archive` inside `work_dir` and swap the result into `platform_dir`.
///
/// Returns the path of the installed executable.
pub async fn install_archive(
    archive: &Path,
    work_dir: &Path,
    artifact: &ArtifactDescriptor,
    platform_dir: &Path,
) -> Result<PathBuf> {
    let extraction_error = |reason: String| BootstrapError::Extraction {
        path: archive.to_path_buf(),
        reason,
    };

    let unpack_dir = work_dir.join(UNPACK_DIR);
    info!("Extracting {} to {}", archive.display(), unpack_dir.display());

    let result = unpack_and_swap(archive, &unpack_dir, work_dir, artifact, platform_dir).await;
    if result.is_err() {
        warn!("Error when extracting server");
        if let Err(e) = tokio::fs::remove_dir_all(&unpack_dir).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Cannot remove {}: {}", unpack_dir.display(), e);
        }
    }
    result.map_err(|e| match e {
        BootstrapError::Extraction { .. } => e,
        other => extraction_error(other.to_string()),
    })
}

async fn unpack_and_swap(
    archive: &Path,
    unpack_dir: &Path,
    work_dir: &Path,
    artifact: &ArtifactDescriptor,
    platform_dir: &Path,
) -> Result<PathBuf> {
    let extraction_error = |reason: String| BootstrapError::Extraction {
        path: archive.to_path_buf(),
        reason,
    };

    unzip(archive, unpack_dir).await?;

    let relative_exe = ServerLayout::relative_executable(artifact);
    let extracted_exe = unpack_dir.join(&relative_exe);
    if !tokio::fs::try_exists(&extracted_exe).await? {
        return Err(extraction_error(format!(
            "archive does not contain {}",
            relative_exe.display()
        )));
    }
    mark_executable(&extracted_exe).await?;

    let extracted_root = unpack_dir.join(artifact.qualified_name());
    swap_into_place(&extracted_root, &work_dir.join(BACKUP_DIR), platform_dir)
        .await
        .map_err(|e| extraction_error(format!("cannot move server into place: {e}")))?;

    info!("Server extracted to {}", platform_dir.display());
    Ok(platform_dir.join("bin").join(artifact.executable_name()))
}

/// Unzip on a blocking thread (CPU and sync I/O bound)
async fn unzip(archive: &Path, dest: &Path) -> Result<()> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    let archive_display = archive.clone();

    tokio::task::spawn_blocking(move || -> std::result::Result<(), String> {
        let file = std::fs::File::open(&archive).map_err(|e| e.to_string())?;
        let mut zip = zip::ZipArchive::new(file).map_err(|e| e.to_string())?;
        std::fs::create_dir_all(&dest).map_err(|e| e.to_string())?;
        zip.extract(&dest).map_err(|e| e.to_string())?;
        debug!("Unpacked {} entries into {}", zip.len(), dest.display());
        Ok(())
    })
    .await
    .map_err(|e| BootstrapError::Extraction {
        path: archive_display.clone(),
        reason: format!("extraction task failed: {e}"),
    })?
    .map_err(|reason| BootstrapError::Extraction {
        path: archive_display,
        reason,
    })
}

#[cfg(unix)]
async fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o755);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Replace `target` with `source`, keeping the old tree in `backup` until done.
async fn swap_into_place(source: &Path, backup: &Path, target: &Path) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let had_previous = tokio::fs::try_exists(target).await?;
    if had_previous {
        if tokio::fs::try_exists(backup).await? {
            tokio::fs::remove_dir_all(backup).await?;
        }
        tokio::fs::rename(target, backup).await?;
    }

    if let Err(e) = tokio::fs::rename(source, target).await {
        if had_previous && let Err(restore) = tokio::fs::rename(backup, target).await {
            warn!(
                "Cannot restore previous server from {}: {}",
                backup.display(),
                restore
            );
        }
        return Err(e);
    }
    Ok(())
}
