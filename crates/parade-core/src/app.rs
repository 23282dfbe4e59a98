use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::Config;

/// Main application state and lifecycle manager
pub struct App {
    config: Arc<Config>,
    shutdown: CancellationToken,
}

impl App {
    /// Create a new application instance from the on-disk config and environment
    pub fn new() -> Result<Self> {
        let (config, _warnings) = Config::load_validated()?;
        Ok(Self::with_config(config))
    }

    /// Create an application around an already-loaded configuration
    pub fn with_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }

    /// Get application configuration
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Token cancelled when the application shuts down.
    ///
    /// Servers and background tasks select on `cancelled()` to stop.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Signal every holder of the shutdown token to stop
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::info!("Shutting down application");
            self.shutdown.cancel();
        }
    }
}
