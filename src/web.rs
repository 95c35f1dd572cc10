use crate::{
    auth,
    errors::AppError,
    problems::ProblemBank,
};
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

pub struct SharedState {
    pub bank: Arc<ProblemBank>,
    pub api_key: String,
}

pub fn router(state: Arc<SharedState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/classify", post(classify))
        .route("/store", post(store))
        .route("/meta_store", post(meta_store))
        .route("/search", post(search))
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(state)
}

async fn start_app(state: SharedState, bind_addr: &str) {
    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(bind_addr).await.unwrap();
    log::info!("listening on {bind_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

pub fn start_daemon(state: SharedState, bind_addr: &str) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(state, bind_addr).await });
}

// Make our own error that wraps `AppError`.
#[derive(Debug)]
struct HttpError(AppError);

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self.0 {
            AppError::InvalidApiKey => (
                axum::http::StatusCode::UNAUTHORIZED,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            AppError::EmptyText | AppError::MalformedLine(_) => (
                axum::http::StatusCode::BAD_REQUEST,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            AppError::Index(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::BAD_GATEWAY,
                    json!({"error": self.0.to_string()}).to_string(),
                )
            }
            AppError::Embedding(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": self.0.to_string()}).to_string(),
                )
            }
            AppError::Other(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": self.0.to_string()}).to_string(),
                )
            }
        }
        .into_response()
    }
}

// This enables using `?` on functions that return `Result<_, AppError>` to
// turn them into `Result<_, HttpError>`.
impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

fn require_api_key(headers: &HeaderMap, expected: &str) -> Result<(), HttpError> {
    let provided = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if !auth::validate_key(provided, expected) {
        return Err(HttpError(AppError::InvalidApiKey));
    }

    Ok(())
}

/// Serialize to JSON with an explicit UTF-8 charset on the content type.
fn json_utf8(value: serde_json::Value) -> Response {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "application/json; charset=utf-8",
        )],
        value.to_string(),
    )
        .into_response()
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({"message": "Hello World"}))
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreRequest {
    pub text: String,
    /// Labels the user confirmed for this problem
    pub labels: Vec<String>,
}

async fn classify(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Json(payload): Json<TextRequest>,
) -> Result<Response, HttpError> {
    require_api_key(&headers, &state.api_key)?;

    log::debug!("payload: {payload:?}");

    let bank = state.bank.clone();

    tokio::task::block_in_place(move || {
        let suggested = bank.assign_labels(&payload.text)?;

        Ok(json_utf8(json!({
            "input": payload.text,
            "suggested_labels": suggested,
        })))
    })
}

async fn store(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Json(payload): Json<StoreRequest>,
) -> Result<Response, HttpError> {
    require_api_key(&headers, &state.api_key)?;

    log::debug!("payload: {payload:?}");

    let bank = state.bank.clone();

    tokio::task::block_in_place(move || {
        let inserted = bank.store(&payload.text, payload.labels)?;

        Ok(json_utf8(json!({
            "stored": inserted,
            "text": payload.text,
        })))
    })
}

// Deliberately unauthenticated; used for bulk seeding from trusted scripts.
// Anyone who can reach this port can write to the index, so front it with
// auth or keep it off public networks.
async fn meta_store(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<TextRequest>,
) -> Result<Response, HttpError> {
    log::debug!("payload: {payload:?}");

    let bank = state.bank.clone();

    tokio::task::block_in_place(move || {
        let outcome = bank.store_batch(&payload.text)?;

        Ok(json_utf8(json!({
            "status": "success",
            "stored": outcome.stored,
            "labels": outcome.labels,
        })))
    })
}

async fn search(
    State(state): State<Arc<SharedState>>,
    headers: HeaderMap,
    Json(payload): Json<StoreRequest>,
) -> Result<Response, HttpError> {
    require_api_key(&headers, &state.api_key)?;

    log::debug!("payload: {payload:?}");

    let bank = state.bank.clone();

    tokio::task::block_in_place(move || {
        let similar = bank.search_similar(&payload.text, &payload.labels)?;

        Ok(json_utf8(json!({
            "message": "Text searched successfully!",
            "text": payload.text,
            "labels": payload.labels,
            "similar_texts": similar,
        })))
    })
}
