/*
 * Responsibility
 * - Config読み込み → 依存生成 → Router 組み立て
 * - Middleware の適用 (authentication filter / HTTP layers)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::{Config, SeedUser};
use crate::middleware::{self, http::HttpLimits};
use crate::repos::user_directory::{
    InMemoryUserDirectory, PgUserDirectory, UserAccount, UserDirectory,
};
use crate::services::auth::build_auth_components;
use crate::services::auth::password::{Argon2PasswordHasher, PasswordHasher};
use crate::services::clock::SystemClock;
use crate::state::{AppState, BearerConfig};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,shop_auth=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Surface panics via tracing; stderr may be hidden depending on how the process runs.
        tracing::error!(?info, "panic");

        // Development: crash so we notice. Production: default hook, keep serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("failed to load configuration")?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        app_env = ?config.app_env,
        addr = %config.addr,
        access_ttl_secs = config.jwt.access_ttl.num_seconds(),
        refresh_ttl_secs = config.jwt.refresh_ttl.num_seconds(),
        "starting auth API"
    );

    let state = build_state(&config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2PasswordHasher);

    let directory: Arc<dyn UserDirectory> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .context("failed to connect to the user database")?;
            tracing::info!("using postgres user directory");
            Arc::new(PgUserDirectory::new(pool))
        }
        None => {
            let directory = seeded_directory(&config.seed_users, hasher.as_ref())?;
            tracing::warn!(
                accounts = directory.len(),
                "DATABASE_URL not set, using in-memory user directory"
            );
            Arc::new(directory)
        }
    };

    let components = build_auth_components(&config.jwt, directory, hasher, Arc::new(SystemClock));

    Ok(AppState::new(
        components,
        BearerConfig {
            header_name: config.jwt.header_name.clone(),
            prefix: config.jwt.token_prefix.clone(),
        },
    ))
}

fn seeded_directory(
    seeds: &[SeedUser],
    hasher: &dyn PasswordHasher,
) -> Result<InMemoryUserDirectory> {
    let mut directory = InMemoryUserDirectory::new();
    for seed in seeds {
        let password_hash = hasher
            .hash(&seed.password)
            .with_context(|| format!("failed to hash seed password for {}", seed.username))?;
        directory.insert(UserAccount {
            username: seed.username.clone(),
            password_hash,
            authorities: seed.authorities.iter().cloned().collect(),
        });
    }
    Ok(directory)
}

/// Routes + authentication filter + HTTP layers, ready to serve.
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(api::v1::handlers::health::health))
        .nest("/api/v1", api::v1::routes())
        .with_state(state.clone());

    let router = middleware::auth::access::apply(router, state);
    middleware::http::apply(router, HttpLimits::default())
}
