//! Task API consumed by the board controller.
//!
//! [`HttpTaskApi`] talks to a running `kanban-server`; [`LocalTaskApi`]
//! drives a [`SqliteTaskStore`] in-process.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{debug, error};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{KanbanError, Result};
use crate::server::ErrorResponse;
use crate::store::SqliteTaskStore;
use crate::task::{ApiTask, TaskPayload};

/// CRUD operations on the task store, in wire representation.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<ApiTask>>;

    /// Create a task; the store assigns the id and timestamps.
    async fn create_task(&self, payload: &TaskPayload) -> Result<ApiTask>;

    /// Replace task `id`. `payload.id` must equal `id`.
    async fn update_task(&self, id: i64, payload: &TaskPayload) -> Result<()>;

    async fn delete_task(&self, id: i64) -> Result<()>;
}

#[async_trait]
impl<T: TaskApi + ?Sized> TaskApi for Arc<T> {
    async fn list_tasks(&self) -> Result<Vec<ApiTask>> {
        (**self).list_tasks().await
    }

    async fn create_task(&self, payload: &TaskPayload) -> Result<ApiTask> {
        (**self).create_task(payload).await
    }

    async fn update_task(&self, id: i64, payload: &TaskPayload) -> Result<()> {
        (**self).update_task(id, payload).await
    }

    async fn delete_task(&self, id: i64) -> Result<()> {
        (**self).delete_task(id).await
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// REST client for `/api/tasks`.
#[derive(Clone)]
pub struct HttpTaskApi {
    base: Url,
    client: reqwest::Client,
}

impl HttpTaskApi {
    /// Build a client from config.
    ///
    /// # Errors
    ///
    /// Returns [`KanbanError::Config`] for an unparseable base URL.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| KanbanError::Transport(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(&config.base_url, client)
    }

    /// Use an existing `reqwest::Client`.
    pub fn with_client(base_url: &str, client: reqwest::Client) -> Result<Self> {
        // A trailing slash makes `Url::join` append instead of replacing `api`.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base = Url::parse(&normalized)
            .map_err(|e| KanbanError::Config(format!("invalid base_url {base_url:?}: {e}")))?;
        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| KanbanError::Config(format!("invalid endpoint {path:?}: {e}")))
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            error!("{what} failed: {e}");
            KanbanError::Transport(format!("{what} failed: {e}"))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|r| r.error.message)
            .unwrap_or(body);
        Err(match status {
            StatusCode::NOT_FOUND => KanbanError::NotFound(message),
            StatusCode::BAD_REQUEST => KanbanError::Validation(message),
            _ => {
                error!("{what} failed ({status}): {message}");
                KanbanError::Transport(format!("{what} failed ({status}): {message}"))
            }
        })
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list_tasks(&self) -> Result<Vec<ApiTask>> {
        let url = self.endpoint("tasks")?;
        let response = self.send(self.client.get(url), "list tasks").await?;
        let tasks: Vec<ApiTask> = response
            .json()
            .await
            .map_err(|e| KanbanError::Transport(format!("invalid task list: {e}")))?;
        debug!(count = tasks.len(), "fetched tasks");
        Ok(tasks)
    }

    async fn create_task(&self, payload: &TaskPayload) -> Result<ApiTask> {
        let url = self.endpoint("tasks")?;
        let response = self
            .send(self.client.post(url).json(payload), "create task")
            .await?;
        response
            .json()
            .await
            .map_err(|e| KanbanError::Transport(format!("invalid created task: {e}")))
    }

    async fn update_task(&self, id: i64, payload: &TaskPayload) -> Result<()> {
        let url = self.endpoint(&format!("tasks/{id}"))?;
        self.send(self.client.put(url).json(payload), "update task")
            .await?;
        Ok(())
    }

    async fn delete_task(&self, id: i64) -> Result<()> {
        let url = self.endpoint(&format!("tasks/{id}"))?;
        self.send(self.client.delete(url), "delete task").await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-process
// ---------------------------------------------------------------------------

/// Task API backed directly by a SQLite store, without HTTP.
#[derive(Clone)]
pub struct LocalTaskApi {
    store: Arc<SqliteTaskStore>,
}

impl LocalTaskApi {
    pub fn new(store: Arc<SqliteTaskStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<SqliteTaskStore> {
        &self.store
    }
}

#[async_trait]
impl TaskApi for LocalTaskApi {
    async fn list_tasks(&self) -> Result<Vec<ApiTask>> {
        Ok(self.store.list()?)
    }

    async fn create_task(&self, payload: &TaskPayload) -> Result<ApiTask> {
        Ok(self.store.create(payload)?)
    }

    async fn update_task(&self, id: i64, payload: &TaskPayload) -> Result<()> {
        if payload.id != Some(id) {
            return Err(KanbanError::Validation(format!(
                "body id {:?} does not match task {id}",
                payload.id
            )));
        }
        self.store.update(id, payload)?;
        Ok(())
    }

    async fn delete_task(&self, id: i64) -> Result<()> {
        Ok(self.store.delete(id)?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::task::WireEnum;

    #[test]
    fn base_url_gets_trailing_slash() {
        let api = HttpTaskApi::with_client("http://localhost:5000/api", reqwest::Client::new())
            .unwrap();
        assert_eq!(
            api.endpoint("tasks/3").unwrap().as_str(),
            "http://localhost:5000/api/tasks/3"
        );
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let result = HttpTaskApi::with_client("not a url", reqwest::Client::new());
        assert!(matches!(result, Err(KanbanError::Config(_))));
    }

    #[tokio::test]
    async fn local_api_round_trip() {
        let store = Arc::new(SqliteTaskStore::open_in_memory().unwrap());
        let api = LocalTaskApi::new(store);

        let payload = TaskPayload {
            title: "Local".to_owned(),
            priority: WireEnum::Code(3),
            ..TaskPayload::default()
        };
        let created = api.create_task(&payload).await.unwrap();

        let update = TaskPayload {
            id: Some(created.id),
            status: WireEnum::Code(1),
            ..payload
        };
        api.update_task(created.id, &update).await.unwrap();
        let tasks = api.list_tasks().await.unwrap();
        assert_eq!(tasks[0].status, WireEnum::Code(1));

        api.delete_task(created.id).await.unwrap();
        let err = api.delete_task(created.id).await.unwrap_err();
        assert!(matches!(err, KanbanError::NotFound(_)));
    }

    #[tokio::test]
    async fn local_api_rejects_mismatched_id() {
        let store = Arc::new(SqliteTaskStore::open_in_memory().unwrap());
        let api = LocalTaskApi::new(store);
        let payload = TaskPayload {
            id: Some(2),
            title: "x".to_owned(),
            ..TaskPayload::default()
        };
        let err = api.update_task(1, &payload).await.unwrap_err();
        assert!(matches!(err, KanbanError::Validation(_)));
    }
}
