use anyhow::Context;
use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use env_logger::Builder;
use log::LevelFilter;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use werewolf_server::{app, state::AppState, utils::config::CONFIG};

fn init_logger() {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .filter_module("werewolf_server", LevelFilter::Debug)
        .filter_module("tower_http", LevelFilter::Debug)
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .format_target(true)
        .parse_default_env()
        .init();
}

fn init_tracing() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("tracing subscriber already set")
}

fn cors_layer() -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE]);
    if CONFIG.allowed_origins.is_empty() {
        return Ok(cors.allow_origin(Any));
    }
    let origins = CONFIG
        .allowed_origins
        .iter()
        .map(|o| o.parse::<HeaderValue>().with_context(|| format!("invalid origin {}", o)))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(cors.allow_origin(AllowOrigin::list(origins)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenv() {
        eprintln!("Warning: could not load .env: {}", e);
    }
    init_logger();
    init_tracing()?;

    let state = AppState::new();
    log::info!("game timings: {:?}", state.game_config);

    let app = app::create_app_with_state(state)
        .layer(cors_layer()?)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &http::Request<_>| {
                tracing::info_span!(
                    "HTTP request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        );

    let listener = tokio::net::TcpListener::bind(&CONFIG.server_addr)
        .await
        .with_context(|| format!("could not bind {}", CONFIG.server_addr))?;
    log::info!("listening on http://{}", CONFIG.server_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
