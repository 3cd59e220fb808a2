use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::app::services::ApplicationServices;
use crate::app::tasks::Tasks;
use crate::config::DaemonArgs;

/// Application core structure with explicit dependencies
pub struct Application {
    services: ApplicationServices,
    daemon_args: DaemonArgs,
}

impl Application {
    pub fn new(services: ApplicationServices, daemon_args: DaemonArgs) -> Self {
        Self {
            services,
            daemon_args,
        }
    }

    pub fn services(&self) -> &ApplicationServices {
        &self.services
    }

    pub fn daemon_args(&self) -> &DaemonArgs {
        &self.daemon_args
    }

    /// Run until a shutdown signal arrives or any task exits.
    pub async fn run(&self) -> Result<()> {
        self.run_until(CancellationToken::new()).await
    }

    /// Like [`Application::run`], but `token` can also stop the daemon.
    pub async fn run_until(&self, token: CancellationToken) -> Result<()> {
        tracing::info!("Starting all application tasks...");

        let mut tasks = Tasks::with_token(token);

        if let Err(e) = tasks.spawn_all_tasks(self) {
            tracing::error!("Failed to spawn application tasks: {}", e);
            return Err(e);
        }

        if let Err(e) = tasks.wait_for_completion().await {
            tracing::error!("Error during task execution: {}", e);
            return Err(e);
        }

        tracing::info!("Application run completed");
        Ok(())
    }

    /// Gracefully shutdown application
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down application...");

        let snapshot = self.services.store.snapshot();
        tracing::info!(
            version = snapshot.version,
            node_count = snapshot.state.nodes.len(),
            is_live = snapshot.state.is_live,
            "Final topology snapshot"
        );

        tracing::info!("Application shutdown completed");
        Ok(())
    }
}
