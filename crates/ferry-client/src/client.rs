//! # API client
//!
//! Typed calls against the task and chat backend. Every call attaches the
//! session's bearer token. Responses go through one classification path:
//!
//! - 401/403: the [`SessionGate`] is told (token cleared, one broadcast) and
//!   the call fails with [`ApiError::Unauthorized`]; the body is ignored
//! - other non-2xx: [`ApiError::Http`]
//! - 2xx with `success: false`: [`ApiError::Application`]
//!
//! Payloads are normalized with [`ferry_core::normalize`] before they leave
//! this module.

use std::sync::Arc;

use ferry_auth::SessionGate;
use ferry_core::normalize::{
    is_success, normalize_contacts, normalize_messages, normalize_targets, normalize_task,
    normalize_tasks, normalize_user, normalize_users, server_message, unread_total,
};
use ferry_core::{
    Contact, Message, Priority, TargetDepartment, Task, TaskId, TaskStatus, UserSummary,
};
use ferry_settings::{ApiSettings, EndpointSettings};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::errors::{ApiError, ApiResult, TransportError};
use crate::mime::guess_mime;
use crate::transport::{
    FormPart, HttpRequest, HttpResponse, Method, RequestBody, ReqwestTransport, Transport,
};

/// How strictly a response envelope is checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Envelope {
    /// Body must be an object with a truthy `success`.
    Strict,
    /// Objects and bare arrays pass unless `success` is present and falsy.
    Lenient,
}

/// Fields for a new task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTask {
    /// Title (already trimmed by the caller).
    pub title: String,
    /// Description; empty is sent as empty.
    pub description: String,
    /// Priority.
    pub priority: Priority,
    /// Department the task is addressed to.
    pub target_department_id: i64,
}

/// A file to attach to a task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    /// File name sent to the server.
    pub file_name: String,
    /// MIME type; guessed from the extension when absent.
    pub mime: Option<String>,
    /// Content.
    pub bytes: Vec<u8>,
}

/// Contact list response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactList {
    /// Contacts in server order.
    pub contacts: Vec<Contact>,
    /// Aggregate unread count.
    pub unread_total: u32,
}

/// Authenticated REST client.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    gate: Arc<SessionGate>,
    base_url: String,
    endpoints: EndpointSettings,
    conversation_limit: u32,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client over `transport`.
    pub fn new(transport: Arc<dyn Transport>, gate: Arc<SessionGate>, api: &ApiSettings) -> Self {
        Self {
            transport,
            gate,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            endpoints: api.endpoints.clone(),
            conversation_limit: api.conversation_limit,
        }
    }

    /// Client over a [`ReqwestTransport`] with the configured timeout.
    pub fn from_settings(
        gate: Arc<SessionGate>,
        api: &ApiSettings,
    ) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(api.request_timeout())?;
        Ok(Self::new(Arc::new(transport), gate, api))
    }

    /// The session gate this client reports to.
    pub fn gate(&self) -> &Arc<SessionGate> {
        &self.gate
    }

    // ── Plumbing ────────────────────────────────────────────────────

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: RequestBody,
    ) -> ApiResult<HttpResponse> {
        let request = HttpRequest {
            method,
            url: format!("{}{endpoint}", self.base_url),
            query: query
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            bearer: self.gate.token(),
            body,
        };
        let response = self.transport.send(request).await?;

        if matches!(response.status, 401 | 403) {
            warn!(status = response.status, endpoint, "authorization rejected");
            self.gate.report_unauthorized(None);
            return Err(ApiError::Unauthorized {
                status: response.status,
            });
        }
        if !response.is_success() {
            debug!(status = response.status, endpoint, "request failed");
            return Err(ApiError::Http {
                status: response.status,
                message: server_message(&response.body),
            });
        }
        Ok(response)
    }

    async fn call(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: RequestBody,
        envelope: Envelope,
    ) -> ApiResult<Value> {
        let body = self.send(method, endpoint, query, body).await?.body;
        let accepted = match envelope {
            Envelope::Strict if !body.is_object() => return Err(ApiError::InvalidBody),
            Envelope::Lenient if !(body.is_object() || body.is_array()) => {
                return Err(ApiError::InvalidBody);
            }
            Envelope::Strict => is_success(&body),
            Envelope::Lenient => body.get("success").is_none() || is_success(&body),
        };
        if accepted {
            Ok(body)
        } else {
            Err(ApiError::Application {
                message: server_message(&body),
            })
        }
    }

    // ── Tasks ───────────────────────────────────────────────────────

    /// `GET tasks`.
    pub async fn list_tasks(&self) -> ApiResult<Vec<Task>> {
        let body = self
            .call(Method::Get, &self.endpoints.tasks, &[], RequestBody::Empty, Envelope::Lenient)
            .await?;
        Ok(normalize_tasks(&body))
    }

    /// `GET tasks?id=<id>`.
    pub async fn task_detail(&self, id: TaskId) -> ApiResult<Task> {
        let body = self
            .call(
                Method::Get,
                &self.endpoints.tasks,
                &[("id", id.to_string())],
                RequestBody::Empty,
                Envelope::Strict,
            )
            .await?;
        body.get("task")
            .and_then(normalize_task)
            .ok_or(ApiError::InvalidBody)
    }

    /// `POST tasks`. Returns the server's message, if any.
    pub async fn create_task(&self, task: &NewTask) -> ApiResult<Option<String>> {
        let payload = json!({
            "title": task.title,
            "description": task.description,
            "priority": task.priority.as_str(),
            "target_department_id": task.target_department_id,
        });
        let body = self
            .call(
                Method::Post,
                &self.endpoints.tasks,
                &[],
                RequestBody::Json(payload),
                Envelope::Strict,
            )
            .await?;
        info!(title = %task.title, "task created");
        Ok(server_message(&body))
    }

    /// `PUT tasks?id=<id>&action=status`.
    pub async fn update_status(&self, id: TaskId, status: TaskStatus) -> ApiResult<()> {
        self.call(
            Method::Put,
            &self.endpoints.tasks,
            &[("id", id.to_string()), ("action", "status".into())],
            RequestBody::Json(json!({ "status_code": status.as_str() })),
            Envelope::Strict,
        )
        .await
        .map(drop)
    }

    /// `PUT tasks?id=<id>&action=comment`.
    pub async fn add_comment(&self, id: TaskId, comment: &str) -> ApiResult<()> {
        self.call(
            Method::Put,
            &self.endpoints.tasks,
            &[("id", id.to_string()), ("action", "comment".into())],
            RequestBody::Json(json!({ "comment": comment })),
            Envelope::Strict,
        )
        .await
        .map(drop)
    }

    /// `POST tasks?action=add_step&task_id=<id>`.
    pub async fn add_step(&self, task_id: TaskId, title: &str) -> ApiResult<()> {
        self.call(
            Method::Post,
            &self.endpoints.tasks,
            &[("action", "add_step".into()), ("task_id", task_id.to_string())],
            RequestBody::Json(json!({ "step_title": title })),
            Envelope::Strict,
        )
        .await
        .map(drop)
    }

    /// `PUT tasks?action=update_step&step_id=<id>` with `is_completed: 0|1`.
    pub async fn update_step(&self, step_id: i64, is_completed: bool) -> ApiResult<()> {
        self.call(
            Method::Put,
            &self.endpoints.tasks,
            &[("action", "update_step".into()), ("step_id", step_id.to_string())],
            RequestBody::Json(json!({ "is_completed": u8::from(is_completed) })),
            Envelope::Strict,
        )
        .await
        .map(drop)
    }

    /// `DELETE tasks?action=delete_step&step_id=<id>`.
    pub async fn delete_step(&self, step_id: i64) -> ApiResult<()> {
        self.call(
            Method::Delete,
            &self.endpoints.tasks,
            &[("action", "delete_step".into()), ("step_id", step_id.to_string())],
            RequestBody::Empty,
            Envelope::Strict,
        )
        .await
        .map(drop)
    }

    /// `GET tasks?action=create_targets`, normalized and deduplicated.
    pub async fn create_targets(&self) -> ApiResult<Vec<TargetDepartment>> {
        let body = self
            .call(
                Method::Get,
                &self.endpoints.tasks,
                &[("action", "create_targets".into())],
                RequestBody::Empty,
                Envelope::Lenient,
            )
            .await?;
        Ok(normalize_targets(&body))
    }

    /// Multipart upload of one file to a task.
    pub async fn upload_task_file(&self, task_id: TaskId, file: FileUpload) -> ApiResult<()> {
        let mime = file
            .mime
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| guess_mime(&file.file_name).to_string());
        debug!(task_id, file = %file.file_name, %mime, "uploading task file");
        let parts = vec![
            FormPart::text("task_id", task_id.to_string()),
            FormPart::File {
                name: "file".into(),
                file_name: file.file_name,
                mime,
                bytes: file.bytes,
            },
        ];
        self.call(
            Method::Post,
            &self.endpoints.upload,
            &[],
            RequestBody::Multipart(parts),
            Envelope::Strict,
        )
        .await
        .map(drop)
    }

    // ── Chat ────────────────────────────────────────────────────────

    /// Contact list with the aggregate unread count.
    pub async fn contacts(&self) -> ApiResult<ContactList> {
        let body = self
            .call(
                Method::Get,
                &self.endpoints.contacts,
                &[],
                RequestBody::Empty,
                Envelope::Lenient,
            )
            .await?;
        Ok(ContactList {
            contacts: normalize_contacts(&body),
            unread_total: unread_total(&body),
        })
    }

    /// User directory for starting a new chat.
    pub async fn all_users(&self) -> ApiResult<Vec<UserSummary>> {
        let body = self
            .call(
                Method::Get,
                &self.endpoints.all_users,
                &[],
                RequestBody::Empty,
                Envelope::Strict,
            )
            .await?;
        Ok(normalize_users(&body))
    }

    /// Messages with one contact, ascending by `created_at`.
    pub async fn conversation(&self, contact_id: i64) -> ApiResult<Vec<Message>> {
        let body = self
            .call(
                Method::Get,
                &self.endpoints.conversation,
                &[
                    ("contact_id", contact_id.to_string()),
                    ("limit", self.conversation_limit.to_string()),
                ],
                RequestBody::Empty,
                Envelope::Strict,
            )
            .await?;
        Ok(normalize_messages(&body))
    }

    /// Multipart `receiver_id` + `message`.
    pub async fn send_message(&self, receiver_id: i64, message: &str) -> ApiResult<()> {
        let parts = vec![
            FormPart::text("receiver_id", receiver_id.to_string()),
            FormPart::text("message", message),
        ];
        self.call(
            Method::Post,
            &self.endpoints.send_message,
            &[],
            RequestBody::Multipart(parts),
            Envelope::Strict,
        )
        .await
        .map(drop)
    }

    // ── Session ─────────────────────────────────────────────────────

    /// `GET auth?action=me`.
    pub async fn me(&self) -> ApiResult<UserSummary> {
        let body = self
            .call(
                Method::Get,
                &self.endpoints.auth,
                &[("action", "me".into())],
                RequestBody::Empty,
                Envelope::Strict,
            )
            .await?;
        body.get("user")
            .and_then(normalize_user)
            .ok_or(ApiError::InvalidBody)
    }

    /// Probe the stored token with `GET tasks`. Any failure clears the token.
    pub async fn validate_session(&self) -> bool {
        if !self.gate.is_authenticated() {
            return false;
        }
        match self
            .send(Method::Get, &self.endpoints.tasks, &[], RequestBody::Empty)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                info!(error = %e, "stored session rejected");
                if let Err(e) = self.gate.clear_session() {
                    warn!(error = %e, "failed to clear session");
                }
                false
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
