use anyhow::Context;
use axum::http::HeaderValue;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod agent;
mod aggregator;
mod cache;
mod config;
mod error;
mod refresher;
mod routes;
mod satellites;
mod space_weather;
mod upstream;

use agent::{fixture::FixtureModel, llm::OpenRouterClient};
use config::{Config, LogFormat};
use routes::{create_router, AppState, Providers};
use satellites::{fixture::FixturePassProvider, n2yo::N2yoClient};
use space_weather::{fixture::FixtureFeed, swpc::SwpcClient};

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "space_agent_server=debug,tower_http=debug".into());

    let (pretty, json) = match format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();
}

fn build_providers(config: &Config) -> anyhow::Result<Providers> {
    if config.demo_mode {
        tracing::warn!("DEMO_MODE enabled: serving fixture data, no upstream calls");
        return Ok(Providers {
            passes: Arc::new(FixturePassProvider::new()),
            weather: Arc::new(FixtureFeed::new()),
            model: Arc::new(FixtureModel),
        });
    }

    let passes = N2yoClient::new(
        config.n2yo_base_url.clone(),
        config.n2yo_api_key.clone(),
        config.upstream_timeout,
    )?;
    let weather = SwpcClient::new(
        config.noaa_swpc_base_url.clone(),
        config.nasa_donki_base_url.clone(),
        config.nasa_api_key.clone(),
        config.upstream_timeout,
    )?;
    let model = OpenRouterClient::new(
        config.llm_base_url.clone(),
        config.llm_api_key.clone(),
        config.llm_model.clone(),
        config.llm_timeout,
    )?;

    Ok(Providers {
        passes: Arc::new(passes),
        weather: Arc::new(weather),
        model: Arc::new(model),
    })
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    if origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid CORS origin '{}'", origin))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let providers = build_providers(&config)?;
    let state = AppState::new(
        providers,
        config.demo_mode,
        config.upstream_timeout,
        config.llm_timeout,
    );

    let refresher = if config.enable_scheduler {
        Some(refresher::spawn(
            state.weather.clone(),
            config.space_weather_update_interval,
        ))
    } else {
        tracing::info!("Space weather refresher disabled");
        None
    };

    let app = create_router(state)
        .layer(cors_layer(&config.cors_origins)?)
        .layer(TraceLayer::new_for_http());

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    tracing::info!(demo_mode = config.demo_mode, "Server starting on http://{}", address);
    tracing::info!("API docs at http://{}/api/docs", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = refresher {
        handle.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}
