use crate::{
    api::{self, Services},
    auth::Argon2Hasher,
    cli::telemetry,
    clock::SystemClock,
    config::Settings,
    dav::UnavailableDispatcher,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Load the users file and serve until shutdown.
/// # Errors
/// Returns an error if the users file is invalid or the server fails to start.
pub async fn execute(settings: Settings) -> Result<()> {
    log_startup(&settings);

    let hasher = Arc::new(Argon2Hasher::new());
    let directory = settings
        .load_directory(hasher.as_ref())
        .with_context(|| format!("Could not load users from {}", settings.users_file.display()))?;

    info!(users = directory.len().await, "users loaded");

    let services = Services {
        directory: Arc::new(directory),
        hasher,
        clock: Arc::new(SystemClock),
        dispatcher: Arc::new(UnavailableDispatcher),
    };

    let result = api::serve(&settings, services).await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup(settings: &Settings) {
    info!(
        address = %settings.address,
        port = settings.port,
        prefix = %settings.prefix,
        web3 = settings.web3.is_some(),
        cors = settings.cors.enabled(),
        tls = settings.tls.is_some(),
        write_timeout = ?settings.timeouts.write,
        shutdown_timeout = ?settings.timeouts.shutdown,
        "starting web3dav"
    );
    debug!("Settings: {:?}", settings);
}
