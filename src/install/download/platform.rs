//! Platform detection and release artifact naming

use std::fmt;

use once_cell::sync::OnceCell;

use crate::install::error::{BootstrapError, Result};

/// Host platforms that have a prebuilt language server
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Platform {
    X86_64Linux,      // x86_64-unknown-linux-gnu
    X86_64Windows,    // x86_64-pc-windows-msvc
    Aarch64Apple,     // aarch64-apple-darwin
    Unsupported { arch: String, os: String },
}

/// Global cache for platform detection (initialized once, used everywhere)
static PLATFORM_CACHE: OnceCell<Platform> = OnceCell::new();

/// Map a host architecture and operating system onto a platform.
///
/// Accepts both Rust (`x86_64`, `macos`) and Node-style (`x64`, `darwin`,
/// `win32`) spellings. Anything else is `Unsupported`, which is a valid value
/// rather than an error.
pub fn resolve(arch: &str, os: &str) -> Platform {
    let arch_norm = match arch {
        "x86_64" | "x64" | "amd64" => "x86_64",
        "aarch64" | "arm64" => "aarch64",
        other => other,
    };
    let os_norm = match os {
        "windows" | "win32" => "windows",
        "macos" | "darwin" => "macos",
        other => other,
    };

    match (arch_norm, os_norm) {
        ("x86_64", "linux") => Platform::X86_64Linux,
        ("x86_64", "windows") => Platform::X86_64Windows,
        ("aarch64", "macos") => Platform::Aarch64Apple,
        _ => Platform::Unsupported {
            arch: arch.to_string(),
            os: os.to_string(),
        },
    }
}

impl Platform {
    /// Detect current platform (cached after first call)
    pub fn detect() -> &'static Platform {
        PLATFORM_CACHE
            .get_or_init(|| resolve(std::env::consts::ARCH, std::env::consts::OS))
    }

    /// Reject `Unsupported`, naming the offending pair.
    pub fn require(&self) -> Result<&Self> {
        self.tag().map(|_| self)
    }

    /// Rust target triple used to tag release assets and install directories
    pub fn tag(&self) -> Result<&'static str> {
        match self {
            Platform::X86_64Linux => Ok("x86_64-unknown-linux-gnu"),
            Platform::X86_64Windows => Ok("x86_64-pc-windows-msvc"),
            Platform::Aarch64Apple => Ok("aarch64-apple-darwin"),
            Platform::Unsupported { arch, os } => Err(BootstrapError::UnsupportedPlatform {
                arch: arch.clone(),
                os: os.clone(),
            }),
        }
    }

    /// Suffix appended to executables on this platform
    pub fn executable_extension(&self) -> Result<&'static str> {
        match self.require()? {
            Platform::X86_64Windows => Ok(".exe"),
            _ => Ok(""),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Unsupported { arch, os } => write!(f, "{arch}-{os} (unsupported)"),
            supported => match supported.tag() {
                Ok(tag) => f.write_str(tag),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

/// Names derived from a platform for one server binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub platform: Platform,
    pub binary_base_name: String,
    pub executable_extension: &'static str,
    pub compressed_asset_name: String,
}

impl ArtifactDescriptor {
    /// Platform-qualified server name, e.g. `ginko_ls-aarch64-apple-darwin`
    pub fn qualified_name(&self) -> String {
        self.compressed_asset_name
            .trim_end_matches(".zip")
            .to_string()
    }

    /// File name of the executable inside the install tree
    pub fn executable_name(&self) -> String {
        format!("{}{}", self.binary_base_name, self.executable_extension)
    }
}

/// Release asset and executable names for `base_name` on `platform`.
pub fn artifact_for(platform: &Platform, base_name: &str) -> Result<ArtifactDescriptor> {
    let tag = platform.tag()?;
    Ok(ArtifactDescriptor {
        platform: platform.clone(),
        binary_base_name: base_name.to_string(),
        executable_extension: platform.executable_extension()?,
        compressed_asset_name: format!("{base_name}-{tag}.zip"),
    })
}

/// Executable file name for `base_name` on `platform` (`.exe` on Windows).
pub fn local_executable_name(platform: &Platform, base_name: &str) -> Result<String> {
    Ok(format!("{base_name}{}", platform.executable_extension()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_supported() {
        assert_eq!(resolve("x86_64", "linux"), Platform::X86_64Linux);
        assert_eq!(resolve("x64", "linux"), Platform::X86_64Linux);
        assert_eq!(resolve("x86_64", "windows"), Platform::X86_64Windows);
        assert_eq!(resolve("x64", "win32"), Platform::X86_64Windows);
        assert_eq!(resolve("aarch64", "macos"), Platform::Aarch64Apple);
        assert_eq!(resolve("arm64", "darwin"), Platform::Aarch64Apple);
    }

    #[test]
    fn test_resolve_unsupported_pairs() {
        let pairs = [
            ("x86_64", "macos"),
            ("aarch64", "linux"),
            ("aarch64", "windows"),
            ("x86", "linux"),
            ("riscv64", "linux"),
            ("x86_64", "freebsd"),
            ("", ""),
        ];
        for (arch, os) in pairs {
            let platform = resolve(arch, os);
            assert_eq!(
                platform,
                Platform::Unsupported {
                    arch: arch.to_string(),
                    os: os.to_string()
                }
            );

            match artifact_for(&platform, "ginko_ls") {
                Err(BootstrapError::UnsupportedPlatform { arch: a, os: o }) => {
                    assert_eq!(a, arch);
                    assert_eq!(o, os);
                }
                other => panic!("expected UnsupportedPlatform, got {other:?}"),
            }
            assert!(local_executable_name(&platform, "ginko_ls").is_err());
        }
    }

    #[test]
    fn test_artifact_names() {
        let linux = artifact_for(&Platform::X86_64Linux, "ginko_ls").unwrap();
        assert_eq!(
            linux.compressed_asset_name,
            "ginko_ls-x86_64-unknown-linux-gnu.zip"
        );
        assert_eq!(linux.qualified_name(), "ginko_ls-x86_64-unknown-linux-gnu");
        assert_eq!(linux.executable_name(), "ginko_ls");

        let windows = artifact_for(&Platform::X86_64Windows, "ginko_ls").unwrap();
        assert_eq!(
            windows.compressed_asset_name,
            "ginko_ls-x86_64-pc-windows-msvc.zip"
        );
        assert_eq!(windows.executable_name(), "ginko_ls.exe");

        let apple = artifact_for(&Platform::Aarch64Apple, "ginko_ls").unwrap();
        assert_eq!(
            apple.compressed_asset_name,
            "ginko_ls-aarch64-apple-darwin.zip"
        );
        assert_eq!(apple.executable_extension, "");
    }

    #[test]
    fn test_local_executable_name() {
        assert_eq!(
            local_executable_name(&Platform::X86_64Windows, "ginko_ls").unwrap(),
            "ginko_ls.exe"
        );
        assert_eq!(
            local_executable_name(&Platform::X86_64Linux, "ginko_ls").unwrap(),
            "ginko_ls"
        );
    }

    #[test]
    fn test_detect_is_cached() {
        let first = Platform::detect();
        let second = Platform::detect();
        assert!(std::ptr::eq(first, second));
        assert_eq!(
            *first,
            resolve(std::env::consts::ARCH, std::env::consts::OS)
        );
    }

    #[test]
    fn test_platform_display() {
        assert_eq!(Platform::Aarch64Apple.to_string(), "aarch64-apple-darwin");
        assert_eq!(
            resolve("sparc", "solaris").to_string(),
            "sparc-solaris (unsupported)"
        );
    }
}
