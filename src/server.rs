//! REST server for the task store.
//!
//! ## Endpoints
//!
//! - `GET /api/tasks`: list every task
//! - `GET /api/tasks/{id}`: fetch one task
//! - `POST /api/tasks`: create a task (`201` + `Location`)
//! - `PUT /api/tasks/{id}`: replace a task (`204`)
//! - `DELETE /api/tasks/{id}`: delete a task (`204`)

use axum::Router;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::store::{SqliteTaskStore, StoreError};
use crate::task::{ApiTask, TaskPayload};

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details within an [`ErrorResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub message: String,
    /// `"not_found"`, `"invalid_request"` or `"server_error"`.
    #[serde(rename = "type")]
    pub error_type: String,
}

/// A failed request, rendered as an [`ErrorResponse`].
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn error_type(&self) -> &'static str {
        match self.status {
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::BAD_REQUEST => "invalid_request",
            _ => "server_error",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let status = match &e {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("task store failure: {e}");
        }
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::invalid(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                error_type: self.error_type().to_owned(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// TaskServer
// ---------------------------------------------------------------------------

/// Build the `/api` router over a shared store.
pub fn router(store: Arc<SqliteTaskStore>) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .with_state(store)
}

/// HTTP server exposing the task store.
pub struct TaskServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TaskServer {
    /// Start serving in a background tokio task.
    ///
    /// Binds to `{config.host}:{config.port}` (use port `0` for auto-assign).
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot bind.
    pub async fn start(
        store: Arc<SqliteTaskStore>,
        config: &ServerConfig,
    ) -> crate::error::Result<Self> {
        let app = router(store);

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            crate::error::KanbanError::Transport(format!("bind {bind_addr} failed: {e}"))
        })?;
        let addr = listener.local_addr()?;

        info!("task server listening on http://{addr}/api");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("task server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Base URL of the API, e.g. `http://127.0.0.1:5000/api`.
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }

    /// Wait until the server task ends.
    pub async fn join(&mut self) {
        if let Err(e) = (&mut self.handle).await
            && !e.is_cancelled()
        {
            error!("task server panicked: {e}");
        }
    }
}

impl Drop for TaskServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// `GET /api/tasks`
async fn list_tasks(
    State(store): State<Arc<SqliteTaskStore>>,
) -> Result<Json<Vec<ApiTask>>, ApiError> {
    Ok(Json(store.list()?))
}

/// `GET /api/tasks/{id}`
async fn get_task(
    State(store): State<Arc<SqliteTaskStore>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiTask>, ApiError> {
    let Path(id) = id?;
    Ok(Json(store.get(id)?))
}

/// `POST /api/tasks`
async fn create_task(
    State(store): State<Arc<SqliteTaskStore>>,
    payload: Result<Json<TaskPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let created = store.create(&payload)?;
    info!(task_id = created.id, "task created");
    let location = format!("/api/tasks/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(created),
    )
        .into_response())
}

/// `PUT /api/tasks/{id}`
async fn update_task(
    State(store): State<Arc<SqliteTaskStore>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TaskPayload>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    if payload.id != Some(id) {
        warn!(task_id = id, body_id = ?payload.id, "rejected update with mismatched id");
        return Err(ApiError::invalid(format!(
            "body id {:?} does not match route id {id}",
            payload.id
        )));
    }
    store.update(id, &payload)?;
    info!(task_id = id, "task updated");
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/tasks/{id}`
async fn delete_task(
    State(store): State<Arc<SqliteTaskStore>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    store.delete(id)?;
    info!(task_id = id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn error_response_uses_type_key() {
        let err = ErrorResponse {
            error: ErrorBody {
                message: "task not found: 3".to_owned(),
                error_type: "not_found".to_owned(),
            },
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"]["type"], "not_found");
        assert_eq!(json["error"]["message"], "task not found: 3");
    }

    #[test]
    fn store_errors_map_to_status_codes() {
        let cases = [
            (StoreError::NotFound(1), StatusCode::NOT_FOUND, "not_found"),
            (
                StoreError::Validation("title is required".to_owned()),
                StatusCode::BAD_REQUEST,
                "invalid_request",
            ),
            (
                StoreError::Conflict(1),
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
            ),
        ];
        for (store_error, status, error_type) in cases {
            let api_error = ApiError::from(store_error);
            assert_eq!(api_error.status, status);
            assert_eq!(api_error.error_type(), error_type);
        }
    }

    #[test]
    fn server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5000);
    }
}
