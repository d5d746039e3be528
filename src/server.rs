//! HTTP surface over the orchestrator.
//!
//! `POST /query` accepts either a form post (field `query`, or `queryInput`
//! as sent by the course page) or a JSON body with the same field.

use crate::corpus::CorpusHandle;
use crate::orchestrator::{Orchestrator, QueryError, QueryFailure};
use axum::{
    extract::{FromRequest, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the application router.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/query", post(query))
        .route("/search", post(search))
        .route("/corpus", get(corpus))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(orchestrator)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    #[serde(default, alias = "queryInput")]
    query: String,
}

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(default, alias = "queryInput")]
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: &'static str,
    rate_limited: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    query: String,
    error: ErrorBody,
}

/// Body extractor that reads JSON when the request says so and a
/// url-encoded form otherwise.
struct JsonOrForm<T>(T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(body) = Json::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(body))
        } else {
            let Form(body) = Form::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(body))
        }
    }
}

/// HTTP status for each failure kind.
pub fn status_for(error: &QueryError) -> StatusCode {
    if error.is_rate_limited() {
        return StatusCode::TOO_MANY_REQUESTS;
    }
    match error {
        QueryError::EmptyQuery => StatusCode::BAD_REQUEST,
        QueryError::CorpusUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        QueryError::RetrievalUnavailable(_) | QueryError::GenerationUnavailable(_) => StatusCode::BAD_GATEWAY,
        QueryError::Ranking(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure_response(failure: QueryFailure) -> Response {
    let status = status_for(&failure.error);
    let body = ErrorResponse {
        error: ErrorBody {
            kind: failure.error.kind(),
            message: failure.error.user_message(),
            rate_limited: failure.error.is_rate_limited(),
        },
        query: failure.query,
    };
    (status, Json(body)).into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(
    State(orchestrator): State<Arc<Orchestrator>>,
    JsonOrForm(req): JsonOrForm<QueryRequest>,
) -> Response {
    match orchestrator.answer(&req.query).await {
        Ok(answer) => Json(answer).into_response(),
        Err(failure) => failure_response(failure),
    }
}

async fn search(
    State(orchestrator): State<Arc<Orchestrator>>,
    JsonOrForm(req): JsonOrForm<SearchRequest>,
) -> Response {
    match orchestrator.search(&req.query, req.limit).await {
        Ok(results) => Json(results).into_response(),
        Err(failure) => failure_response(failure),
    }
}

async fn corpus(State(orchestrator): State<Arc<Orchestrator>>) -> Response {
    match orchestrator.corpus() {
        CorpusHandle::Ready(store) => Json(store.summary()).into_response(),
        CorpusHandle::Unavailable { reason } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "unavailable", "reason": reason })),
        )
            .into_response(),
    }
}
