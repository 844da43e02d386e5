//! Boundary to the host editor
//!
//! The bootstrap core never sees editor types. Whatever embeds it supplies
//! configuration and two output surfaces: a user-visible notification and a
//! diagnostic log line.

use crate::config::BootstrapConfig;

pub trait Host: Send + Sync {
    fn config(&self) -> &BootstrapConfig;

    /// User-visible message (editor notification)
    fn notify(&self, message: &str);

    /// Diagnostic line (editor output channel)
    fn log(&self, line: &str);
}

/// Host for terminal use: everything goes through the `log` facade.
#[derive(Debug, Clone)]
pub struct LogHost {
    config: BootstrapConfig,
}

impl LogHost {
    pub fn new(config: BootstrapConfig) -> Self {
        Self { config }
    }
}

impl Host for LogHost {
    fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    fn notify(&self, message: &str) {
        log::warn!("{message}");
    }

    fn log(&self, line: &str) {
        log::info!("{line}");
    }
}
