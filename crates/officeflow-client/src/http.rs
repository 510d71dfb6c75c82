use std::time::Duration;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use officeflow_core::config::BackendConfig;
use officeflow_core::error::{OfficeflowError, Result};
use officeflow_core::traits::Backend;
use officeflow_core::types::*;

/// REST client for the backend service.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// Body of `PATCH /workflows/{id}`.
#[derive(Serialize)]
struct WorkflowPatch<'a> {
    name: &'a str,
    steps: &'a [RoleTag],
    nodes_data: &'a [NodeData],
    edges_data: &'a [EdgeData],
    is_active: bool,
}

/// Body of `POST /projects/{id}/workflows`.
#[derive(Serialize)]
struct WorkflowCreate<'a> {
    name: &'a str,
    steps: [RoleTag; 0],
    nodes_data: [NodeData; 0],
    edges_data: [EdgeData; 0],
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OfficeflowError::Backend(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, mut req: reqwest::RequestBuilder) -> Result<T> {
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| OfficeflowError::Backend(format!("Request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(OfficeflowError::Backend(format!("HTTP {status}: {body}")));
        }

        resp.json()
            .await
            .map_err(|e| OfficeflowError::Backend(format!("Invalid response body: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "GET");
        self.send(self.client.get(self.url(path))).await
    }

    async fn patch<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        debug!(path, "PATCH");
        self.send(self.client.patch(self.url(path)).json(body)).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Option<&impl Serialize>) -> Result<T> {
        debug!(path, "POST");
        let mut req = self.client.post(self.url(path));
        if let Some(body) = body {
            req = req.json(body);
        }
        self.send(req).await
    }
}

impl Backend for HttpBackend {
    fn list_agents(&self, project: ProjectId) -> BoxFuture<'_, Result<Vec<Agent>>> {
        Box::pin(async move { self.get(&format!("/projects/{project}/agents")).await })
    }

    fn list_tasks(&self, project: ProjectId) -> BoxFuture<'_, Result<Vec<Task>>> {
        Box::pin(async move { self.get(&format!("/projects/{project}/tasks")).await })
    }

    fn update_task(&self, task: TaskId, update: TaskUpdate) -> BoxFuture<'_, Result<Task>> {
        Box::pin(async move { self.patch(&format!("/tasks/{task}"), &update).await })
    }

    fn list_workflows(&self, project: ProjectId) -> BoxFuture<'_, Result<Vec<WorkflowRecord>>> {
        Box::pin(async move { self.get(&format!("/projects/{project}/workflows")).await })
    }

    fn save_workflow(&self, record: WorkflowRecord) -> BoxFuture<'_, Result<WorkflowRecord>> {
        Box::pin(async move {
            let body = WorkflowPatch {
                name: &record.name,
                steps: &record.steps,
                nodes_data: &record.nodes_data,
                edges_data: &record.edges_data,
                is_active: record.is_active,
            };
            self.patch(&format!("/workflows/{}", record.id), &body).await
        })
    }

    fn create_workflow(
        &self,
        project: ProjectId,
        name: String,
    ) -> BoxFuture<'_, Result<WorkflowRecord>> {
        Box::pin(async move {
            let body = WorkflowCreate {
                name: &name,
                steps: [],
                nodes_data: [],
                edges_data: [],
            };
            self.post(&format!("/projects/{project}/workflows"), Some(&body))
                .await
        })
    }

    fn activate_workflow(&self, workflow: i64) -> BoxFuture<'_, Result<WorkflowRecord>> {
        Box::pin(async move {
            self.post(&format!("/workflows/{workflow}/activate"), None::<&()>)
                .await
        })
    }
}
