// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 CreditCore Contributors
//
// This file is part of CreditCore.
//
// CreditCore is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// CreditCore is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with CreditCore. If not, see <https://www.gnu.org/licenses/>.

//! API server: HTTP intake, webhook intake, WebSocket fan-out.

use anyhow::Context;
use creditcore::{tracing_setup, Config};
use creditcore_api::{AppState, WebhookSignature};
use creditcore_persistence::{ApplicationRepository, PiiCipher, WebhookEventStore};
use creditcore_realtime::{
    run_subscriber, ConnectionManager, RedisUpdatePublisher, SubscriberConfig,
};
use creditcore_strategies::StrategyRegistry;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_setup::init_tracing();
    let config = Config::from_env().context("loading configuration")?;

    let pool = creditcore_persistence::connect(&config.database_url, config.db_pool_size)
        .await
        .context("connecting to postgres")?;
    creditcore_persistence::run_migrations(&pool)
        .await
        .context("running migrations")?;

    let cipher = PiiCipher::new(config.encryption_key.expose_secret().as_bytes())
        .context("building pii cipher")?;
    let webhook_signature = WebhookSignature::new(config.webhook_secret.clone())
        .map_err(|e| anyhow::anyhow!(e))
        .context("building webhook verifier")?;

    let publisher = Arc::new(
        RedisUpdatePublisher::new(&config.redis_url)
            .await
            .context("connecting update publisher")?,
    );
    let ws_manager = ConnectionManager::new();

    let shutdown = Arc::new(Notify::new());
    let subscriber = tokio::spawn(run_subscriber(
        config.redis_url.clone(),
        Arc::clone(&ws_manager),
        SubscriberConfig::default(),
        Arc::clone(&shutdown),
    ));

    let state = AppState {
        repository: ApplicationRepository::new(pool.clone()),
        webhook_events: WebhookEventStore::new(pool.clone()),
        strategies: Arc::new(StrategyRegistry::with_mock_providers()),
        publisher,
        ws_manager,
        cipher,
        webhook_signature,
    };

    let app = creditcore_api::router(state);
    let listener = tokio::net::TcpListener::bind(&config.http_bind)
        .await
        .with_context(|| format!("binding {}", config.http_bind))?;
    info!(bind = %config.http_bind, "api server listening");

    let shutdown_signal = Arc::clone(&shutdown);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_termination().await;
            info!("termination signal received, shutting down");
            shutdown_signal.notify_waiters();
        })
        .await
        .context("serving http")?;

    let _ = subscriber.await;
    info!("api server stopped");
    Ok(())
}

async fn wait_for_termination() {
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("installing SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
