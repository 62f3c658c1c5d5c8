use anyhow::Result;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod credentials;
mod routes;

use guard::{BanGuard, BanState, Settings};

use crate::credentials::CredentialVerifier;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ban_guard: BanGuard,
    pub credentials: CredentialVerifier,
}

#[tokio::main]
async fn main() -> Result<()> {
    // `auth hash-password <password>` prints a value for credentials.hash
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("hash-password") {
        let password = args
            .get(2)
            .ok_or_else(|| anyhow::anyhow!("usage: auth hash-password <password>"))?;
        println!("{}", credentials::hash_password(password)?);
        return Ok(());
    }

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting authentication service");

    let settings = Settings::from_env()?;

    let ban_guard = BanGuard::load(
        settings.security.clone(),
        settings.resource.ban_file.clone(),
        BanState::shared(),
    )
    .await;
    let credentials = CredentialVerifier::new(&settings.credentials)?;

    if settings.security.sweep_interval > 0 {
        spawn_expiry_sweep(
            ban_guard.clone(),
            Duration::from_secs(settings.security.sweep_interval),
        );
    }

    let app_state = AppState {
        ban_guard,
        credentials,
    };

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&settings.server.bind_addr).await?;
    info!(
        "Authentication service listening on {}",
        settings.server.bind_addr
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Periodically lift expired bans so the ban file does not grow forever
fn spawn_expiry_sweep(ban_guard: BanGuard, period: Duration) {
    info!("Sweeping expired bans every {} seconds", period.as_secs());

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = ban_guard.purge_expired().await {
                error!("Expired ban sweep failed: {}", e);
            }
        }
    });
}
