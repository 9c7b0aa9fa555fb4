// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Arbor Server
//!
//! HTTP boundary of the repository: path-addressed dispatch, content
//! negotiation and streamed RDF responses.

pub mod api;
pub mod config;

use anyhow::Result;
use axum::{
    routing::{any, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{dispatch, health_check, AppState};
use config::ServerConfig;

pub async fn run_server(config: ServerConfig) -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "arbor_server=info,arbor_storage=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Arbor Server");
    tracing::debug!("Configuration: {:#?}", config);

    config.validate()?;
    let addr = config.socket_addr()?;
    let state = AppState::from_config(&config)?;
    tracing::info!(
        base_url = %config.server.base_url,
        resources = state.repository.resource_count(),
        "Repository ready"
    );

    let app = build_router(state).layer(if config.server.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Router serving the repository under the base URL's path, plus `/health`
pub fn build_router(state: AppState) -> Router {
    let base = state.base_path().trim_end_matches('/').to_string();

    let mut router = Router::new().route("/health", get(health_check));
    router = if base.is_empty() {
        router
            .route("/", any(dispatch))
            .route("/*path", any(dispatch))
    } else {
        router
            .route(&base, any(dispatch))
            .route(&format!("{}/", base), any(dispatch))
            .route(&format!("{}/*path", base), any(dispatch))
    };

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        futures::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
