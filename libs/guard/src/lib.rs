//! Login brute-force guard
//!
//! This crate tracks failed login attempts per client IP, bans clients that
//! exceed a failure threshold and persists that state across restarts. It
//! also resolves the effective client address behind trusted reverse proxies.

pub mod ban_guard;
pub mod client_ip;
pub mod config;
pub mod error;
pub mod state;
pub mod store;

pub use ban_guard::BanGuard;
pub use client_ip::RequestMeta;
pub use crate::config::{SecurityConfig, Settings};
pub use error::{GuardError, GuardResult};
pub use state::{BanState, SharedBanState};

/// Example usage of the ban guard
///
/// ```rust,no_run
/// use guard::{BanGuard, BanState, RequestMeta, Settings};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let settings = Settings::from_env()?;
///     let guard = BanGuard::load(
///         settings.security,
///         settings.resource.ban_file,
///         BanState::shared(),
///     )
///     .await;
///
///     let meta = RequestMeta::new("127.0.0.1");
///     if guard.can_login(&meta).await {
///         guard.handle_failed_login(&meta).await?;
///     }
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
