use anyhow::Result;
use utils::logging;
use utils::version;

use crate::app::Application;
use crate::app::ApplicationServices;
use crate::config::DaemonArgs;

pub async fn run_daemon(daemon_args: DaemonArgs) -> Result<()> {
    let _guard = logging::init(daemon_args.topology.log_dir.as_deref());

    tracing::info!("Starting nebula daemon {}", &**version::VERSION);

    let services = ApplicationServices::from_args(&daemon_args)?;
    let app = Application::new(services, daemon_args);

    app.run().await?;
    app.shutdown().await?;

    Ok(())
}
