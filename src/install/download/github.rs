//! GitHub release API interaction

use std::time::Duration;

use log::debug;
use semver::Version;
use serde::Deserialize;

use crate::install::error::{BootstrapError, Result};
use crate::install::version::coerce;

/// Public GitHub REST endpoint
pub const GITHUB_API: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("ginko-bootstrap/", env!("CARGO_PKG_VERSION"));
const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub release metadata from API
#[derive(Deserialize, Debug)]
struct GitHubRelease {
    #[serde(default)]
    name: Option<String>,
    tag_name: String,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    assets: Vec<GitHubAsset>,
}

/// GitHub release asset metadata
#[derive(Deserialize, Debug)]
struct GitHubAsset {
    name: String,
    browser_download_url: String,
    #[serde(default)]
    size: u64,
}

/// One downloadable file attached to a release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub download_url: String,
    /// Advertised size in bytes, 0 when unknown
    pub size: u64,
}

/// Latest published release, fetched fresh on every check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseMetadata {
    /// Display name coerced to a version
    pub version: Version,
    pub name: String,
    pub tag_name: String,
    /// GitHub's own prerelease flag
    pub flagged_prerelease: bool,
    pub assets: Vec<ReleaseAsset>,
}

impl ReleaseMetadata {
    /// Never auto-installed when true
    pub fn is_prerelease(&self) -> bool {
        self.flagged_prerelease || !self.version.pre.is_empty()
    }

    pub fn find_asset(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

/// Client for a GitHub-compatible release registry
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    http: reqwest::Client,
    api_base: String,
}

impl ReleaseClient {
    pub fn new(api_base: impl Into<String>) -> Result<Self> {
        let api_base = api_base.into();
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BootstrapError::Config {
                reason: format!("cannot build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Client against api.github.com
    pub fn github() -> Result<Self> {
        Self::new(GITHUB_API)
    }

    /// Shared HTTP client, reused for asset downloads
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Fetch the latest release of `owner/repo`.
    pub async fn latest_release(&self, owner: &str, repo: &str) -> Result<ReleaseMetadata> {
        let url = format!("{}/repos/{}/{}/releases/latest", self.api_base, owner, repo);
        let query_error = |reason: String| BootstrapError::ReleaseQuery {
            owner: owner.to_string(),
            repo: repo.to_string(),
            reason,
        };

        debug!("Querying {url}");
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .timeout(QUERY_TIMEOUT)
            .send()
            .await
            .map_err(|e| query_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(query_error(format!("HTTP {} from {}", response.status(), url)));
        }

        let release: GitHubRelease = response
            .json()
            .await
            .map_err(|e| query_error(format!("invalid release JSON: {e}")))?;

        release.into_metadata()
    }
}

impl GitHubRelease {
    fn into_metadata(self) -> Result<ReleaseMetadata> {
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.tag_name.clone(),
        };
        let version = coerce(&name).ok_or_else(|| BootstrapError::VersionParse {
            output: name.clone(),
        })?;

        Ok(ReleaseMetadata {
            version,
            name,
            tag_name: self.tag_name,
            flagged_prerelease: self.prerelease,
            assets: self
                .assets
                .into_iter()
                .map(|a| ReleaseAsset {
                    name: a.name,
                    download_url: a.browser_download_url,
                    size: a.size,
                })
                .collect(),
        })
    }
}
