//! HTTP server for the generation API
//!
//! - `GET /` static description
//! - `POST /api/generate` forwards `{ prompt, model? }` to the LLM provider

use crate::config::ServerConfig;
use crate::llm::{GeminiProvider, LlmProvider};
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::api::{ErrorResponse, GenerateRequest, GenerateResponse};

/// Text served at `GET /`
pub const HEALTH_TEXT: &str = "promptcode generation API is running. POST /api/generate { prompt }";

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state
struct AppState {
    provider: Arc<dyn LlmProvider>,
    default_model: String,
}

/// Build the API router around a provider
pub fn router(provider: Arc<dyn LlmProvider>, default_model: impl Into<String>) -> Router {
    let state = Arc::new(AppState {
        provider,
        default_model: default_model.into(),
    });

    Router::new()
        .route("/", get(health_check))
        .route("/api/generate", post(handle_generate))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_http_server(config: ServerConfig) -> Result<()> {
    let provider: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::new(config.api_key.clone()));
    let app = router(provider, config.default_model.clone());

    let addr = listen_addr(&config.host, config.port)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(
        "Server listening on http://{} (default model: {})",
        addr,
        config.default_model
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Socket address for `host` (an IPv4 or IPv6 literal) and `port`
fn listen_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = host
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .with_context(|| format!("Invalid HOST value: {}", host))?;
    Ok(SocketAddr::new(ip, port))
}

async fn health_check() -> &'static str {
    HEALTH_TEXT
}

async fn handle_generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!("Rejected generate body: {}", rejection);
            return prompt_required();
        }
    };

    let prompt = match request.prompt {
        Some(prompt) if !prompt.trim().is_empty() => prompt,
        _ => return prompt_required(),
    };

    let model = request
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.default_model.clone());

    tracing::info!("Calling {} model: {}", state.provider.name(), model);

    match state.provider.generate(&model, &prompt).await {
        Ok(generated) => Json(GenerateResponse {
            generated: Some(generated),
        })
        .into_response(),
        Err(e) => {
            if e.is_configuration_problem() {
                tracing::error!("Generation error (check API key and model): {}", e);
            } else {
                tracing::error!("Generation error: {}", e);
            }
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Generation failed".to_string(),
                    details: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

fn prompt_required() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "Prompt is required".to_string(),
            details: None,
        }),
    )
        .into_response()
}
