//! Serve command handler.

use askstore_core::{config::AppConfig, AppError, AppResult};
use clap::Args;

/// Serve the JSON HTTP API
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (default from config, 0.0.0.0:5000)
    #[arg(short, long, env = "ASKSTORE_BIND")]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, mut config: AppConfig) -> AppResult<()> {
        if let Some(ref bind) = self.bind {
            config.server.bind = bind.clone();
        }

        tracing::info!("Starting server on {}", config.server.bind);

        askstore_server::run_server(&config)
            .await
            .map_err(|e| AppError::Other(format!("Server error: {:#}", e)))
    }
}
