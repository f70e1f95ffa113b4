//! ReUse Exchange Server
//!
//! Serves the account, item and request APIs over one SQLite database.
//!
//! ## Configuration
//!
//! Settings come from a TOML file (first CLI argument, `REUSE_CONFIG`, or the
//! standard search paths) with `REUSE_*` environment overrides:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `REUSE_HTTP_PORT` | `8000` | HTTP API port |
//! | `REUSE_DATABASE_URL` | `sqlite://reuse.db` | SQLite database URL |
//! | `REUSE_JWT_SECRET` | - | Token signing secret (required outside dev mode) |
//! | `REUSE_ADMIN_EMAIL` / `REUSE_ADMIN_PASSWORD` | - | Superuser seeded at startup |
//! | `REUSE_DEV_MODE` | `false` | Allow the development signing secret |
//! | `RUST_LOG` | `info` | Log level |
//! | `LOG_FORMAT` | `text` | `json` for structured output |

use std::sync::Arc;

use anyhow::Result;
use axum::{http::HeaderValue, response::Json, routing::get, Router};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use reuse_config::{AppConfig, ConfigLoader};
use reuse_platform::auth::{Argon2Config, PasswordPolicy, TokenConfig};
use reuse_platform::seed::SeedOutcome;
use reuse_platform::shared::db;
use reuse_platform::{LogNotifier, Platform, PlatformSettings};

#[tokio::main]
async fn main() -> Result<()> {
    reuse_common::logging::init_logging("reuse-server");

    let loader = match std::env::args().nth(1) {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;
    if config.dev_mode && config.auth.jwt_secret.is_empty() {
        warn!("Using the development signing secret; do not run this in production");
    }

    info!("Starting ReUse Exchange Server...");

    let pool = db::connect(&config.database.url, config.database.max_connections).await?;
    db::init_schema(&pool).await?;

    let platform = Platform::new(pool, platform_settings(&config), Arc::new(LogNotifier))?;

    if let Some((email, password)) = config.auth.admin_credentials() {
        match platform.admin_seeder().seed_admin(email, password).await? {
            SeedOutcome::Created => info!(email, "Seeded administrator account"),
            SeedOutcome::AlreadyPresent => {}
        }
    }

    let (api, openapi) = platform.router();

    let app = Router::new()
        .merge(api)
        .route(
            "/openapi.json",
            get(move || {
                let doc = openapi.clone();
                async move { Json(doc) }
            }),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.http.cors_origins));

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("ReUse Exchange Server shutdown complete");
    Ok(())
}

fn platform_settings(config: &AppConfig) -> PlatformSettings {
    PlatformSettings {
        token: TokenConfig {
            secret: config.jwt_secret().to_string(),
            access_ttl_minutes: config.auth.access_token_minutes,
            refresh_ttl_minutes: config.auth.refresh_token_minutes,
        },
        argon2: Argon2Config::default(),
        password_policy: PasswordPolicy::with_min_length(config.auth.min_password_length),
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received...");
}
