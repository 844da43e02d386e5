//! Bootstrapper for the ginko language server
//!
//! Picks the prebuilt `ginko_ls` binary for the host, keeps the managed copy
//! in step with the latest published release, and hands back the executable
//! path for the editor's language client to launch.

pub mod config;
pub mod install;

pub use config::{BootstrapConfig, LanguageServerSource};
pub use install::{BootstrapError, Host, LogHost, ServerCommand, bootstrap, bootstrap_with_progress};
