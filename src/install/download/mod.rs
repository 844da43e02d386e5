//! GitHub release download and archive extraction
//!
//! ## Module Organization
//!
//! - `platform` - Platform detection and release artifact naming
//! - `github` - GitHub API interaction for release discovery
//! - `core` - Time-bounded asset download into staging
//! - `extract` - Zip extraction and install directory swap

pub mod core;
pub mod extract;
pub mod github;
pub mod platform;
