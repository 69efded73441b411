//! Backend REST client
//!
//! One method per backend operation. Each call normalizes failures into
//! the [`SyncError`] taxonomy: 401-class responses into `Auth`, other
//! client errors into `Validation`, transport failures and server faults
//! into `Network`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use td_core::task::{Task, TaskDraft};

use crate::error::{Result, SyncError};
use crate::session::{Credential, Session, User};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    token: String,
    user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReorderRequest<'a> {
    task_ids: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Interface to the task backend, one method per REST operation.
///
/// The reconciler and session manager are written against this trait so
/// they can be driven by a test double as easily as by [`HttpBackend`].
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// POST /login
    async fn login(&self, username: &str, password: &str) -> Result<Credential>;

    /// POST /register
    async fn register(&self, username: &str, password: &str) -> Result<Credential>;

    /// GET /tasks, the authoritative list sorted by position
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    /// POST /tasks
    async fn create_task(&self, draft: &TaskDraft) -> Result<Task>;

    /// PUT /tasks/:id, a full-payload update of a single task
    async fn update_task(&self, task: &Task) -> Result<Task>;

    /// DELETE /tasks/:id
    async fn delete_task(&self, id: &str) -> Result<()>;

    /// PUT /tasks/reorder: redefine every task's position as its index
    /// in `ids`
    async fn reorder_tasks(&self, ids: &[String]) -> Result<()>;
}

/// reqwest-backed implementation against an API base URL.
///
/// The bearer credential is read from the shared [`Session`] on every
/// call, so a logout immediately stops authenticating new requests.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    session: Session,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match self.session.token().await {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let res = req
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;
        check_status(res).await
    }

    async fn parse<T: serde::de::DeserializeOwned>(res: Response) -> Result<T> {
        res.json()
            .await
            .map_err(|e| SyncError::Network(format!("Malformed response body: {}", e)))
    }
}

/// Normalize a non-success response into the error taxonomy
async fn check_status(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let message = match res.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    };
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::Auth(message),
        s if s.is_client_error() => SyncError::Validation(message),
        _ => SyncError::Network(message),
    })
}

#[async_trait]
impl TaskBackend for HttpBackend {
    async fn login(&self, username: &str, password: &str) -> Result<Credential> {
        debug!("POST /login");
        let res = self
            .send(
                self.client
                    .post(self.url("/login"))
                    .json(&CredentialsRequest { username, password }),
            )
            .await?;
        let auth: AuthResponse = Self::parse(res).await?;
        Ok(Credential {
            token: auth.token,
            user: auth.user,
        })
    }

    async fn register(&self, username: &str, password: &str) -> Result<Credential> {
        debug!("POST /register");
        let res = self
            .send(
                self.client
                    .post(self.url("/register"))
                    .json(&CredentialsRequest { username, password }),
            )
            .await?;
        let auth: AuthResponse = Self::parse(res).await?;
        Ok(Credential {
            token: auth.token,
            user: auth.user,
        })
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        debug!("GET /tasks");
        let req = self.authed(self.client.get(self.url("/tasks"))).await;
        let res = self.send(req).await?;
        Self::parse(res).await
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task> {
        debug!("POST /tasks at position {}", draft.position);
        let req = self
            .authed(self.client.post(self.url("/tasks")).json(draft))
            .await;
        let res = self.send(req).await?;
        Self::parse(res).await
    }

    async fn update_task(&self, task: &Task) -> Result<Task> {
        debug!("PUT /tasks/{}", task.id);
        let req = self
            .authed(
                self.client
                    .put(self.url(&format!("/tasks/{}", task.id)))
                    .json(task),
            )
            .await;
        let res = self.send(req).await?;
        Self::parse(res).await
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        debug!("DELETE /tasks/{}", id);
        let req = self
            .authed(self.client.delete(self.url(&format!("/tasks/{}", id))))
            .await;
        self.send(req).await?;
        Ok(())
    }

    async fn reorder_tasks(&self, ids: &[String]) -> Result<()> {
        debug!("PUT /tasks/reorder with {} ids", ids.len());
        let req = self
            .authed(
                self.client
                    .put(self.url("/tasks/reorder"))
                    .json(&ReorderRequest { task_ids: ids }),
            )
            .await;
        self.send(req).await?;
        Ok(())
    }
}
