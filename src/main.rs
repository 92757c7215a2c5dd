// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Rolesync Contributors

use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rolesync_server::{
    api::router,
    chain::SolanaRpcClient,
    config::Config,
    discord::DiscordRestClient,
    provision::ChannelProvisioner,
    ratelimit::RateLimiter,
    state::AppState,
    storage::{DataStore, StoragePaths},
    sync::RoleReconciler,
    vault::Vault,
};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,rolesync_server=debug"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration is invalid, refusing to start");
            std::process::exit(1);
        }
    };

    let mut store = DataStore::new(StoragePaths::new(&config.data_dir));
    store
        .initialize()
        .expect("failed to initialize data store");
    let store = Arc::new(store);

    let vault = Vault::new(config.encryption_key);
    let rate_limiter = Arc::new(
        RateLimiter::open(
            &store.paths().ratelimit_db(),
            config.rate_limit_window_ms,
            config.rate_limit_max_requests,
        )
        .expect("failed to open rate-limit database"),
    );

    let reconciler = Arc::new(RoleReconciler::new(
        store.clone(),
        vault.clone(),
        SolanaRpcClient::new(&config.solana_rpc_url, &config.subscription_program_id),
        DiscordRestClient::new(config.discord_bot_token.clone(), config.discord_guild_id.clone()),
        Duration::from_millis(config.role_sync_interval_ms),
    ));
    let provisioner = Arc::new(ChannelProvisioner::new(
        store.clone(),
        DiscordRestClient::new(config.discord_bot_token.clone(), config.discord_guild_id.clone()),
    ));

    let shutdown = CancellationToken::new();
    let sync_task = tokio::spawn({
        let reconciler = reconciler.clone();
        let token = shutdown.clone();
        async move { reconciler.run(token).await }
    });

    let host = config.host.clone();
    let port = config.port;
    let state = AppState {
        config: Arc::new(config),
        store,
        vault,
        rate_limiter,
        reconciler,
        provisioner,
    };
    let app = router(state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("failed to parse bind address");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind server address");

    info!(%addr, "rolesync server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");

    shutdown.cancel();
    let _ = sync_task.await;
    info!("shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    info!("shutdown signal received");
}
