use color_eyre::eyre::{Result, WrapErr};
use echoportd::{Service, ServiceConfig};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("echoportd=info")
        .init();

    // Parse the port lists before anything binds; a malformed entry aborts
    // the whole process with no partial startup
    let config = ServiceConfig::from_env().wrap_err("Invalid port configuration")?;

    if config.bindings.is_empty() {
        warn!("No ports configured; set DUMMY_TCPPORTS and/or DUMMY_UDPPORTS (\"|\"-delimited)");
    }

    let service = Service::launch(config);
    info!(listeners = service.listener_count(), "echoportd started");

    // The process stays up until interrupted; supervisors run forever
    signal::ctrl_c()
        .await
        .wrap_err("Failed to listen for shutdown signal")?;

    info!("Shutting down");
    service.shutdown();
    service.join().await;

    Ok(())
}
