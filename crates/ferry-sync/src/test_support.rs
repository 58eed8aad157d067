//! In-memory backend for controller tests.

use std::sync::Arc;
use std::time::Duration;

use ferry_auth::{MemoryCredentialStore, SessionGate, UnauthorizedBus};
use ferry_client::testing::ScriptedTransport;
use ferry_client::{ApiClient, FormPart, HttpRequest, HttpResponse, Method, RequestBody};
use ferry_settings::ApiSettings;
use parking_lot::Mutex;
use serde_json::{Value, json};

/// Mutable backend state behind a [`ScriptedTransport`].
#[derive(Default)]
pub(crate) struct FakeBackend {
    pub tasks: Mutex<Vec<Value>>,
    pub contacts: Mutex<Value>,
    pub users: Mutex<Value>,
    pub messages: Mutex<Vec<Value>>,
    pub me: Mutex<Value>,
    /// Response for every write while set.
    pub write_failure: Mutex<Option<HttpResponse>>,
    /// Response for every read while set.
    pub read_failure: Mutex<Option<HttpResponse>>,
}

impl FakeBackend {
    pub fn with_tasks(tasks: Vec<Value>) -> Arc<Self> {
        let backend = Self::default();
        *backend.tasks.lock() = tasks;
        *backend.contacts.lock() = json!({"success": true, "contacts": [], "unread_count": 0});
        *backend.users.lock() = json!({"success": true, "users": []});
        *backend.me.lock() = json!({"success": true, "user": {"id": 1, "username": "me"}});
        Arc::new(backend)
    }

    fn ok(body: Value) -> HttpResponse {
        HttpResponse::json(200, body)
    }

    fn task_mut<'a>(tasks: &'a mut [Value], id: &str) -> Option<&'a mut Value> {
        tasks.iter_mut().find(|t| t["id"].to_string() == id)
    }

    fn handle(&self, req: &HttpRequest) -> HttpResponse {
        let is_write = req.method != Method::Get;
        if is_write {
            if let Some(resp) = self.write_failure.lock().clone() {
                return resp;
            }
        } else if let Some(resp) = self.read_failure.lock().clone() {
            return resp;
        }

        let body = match &req.body {
            RequestBody::Json(v) => v.clone(),
            _ => Value::Null,
        };
        let action = req.query_value("action");

        if req.url.ends_with("/tasks.php") {
            let mut tasks = self.tasks.lock();
            return match (req.method, action) {
                (Method::Get, None) => match req.query_value("id") {
                    None => Self::ok(json!({"success": true, "tasks": *tasks})),
                    Some(id) => match Self::task_mut(&mut tasks, id) {
                        Some(t) => Self::ok(json!({"success": true, "task": t})),
                        None => Self::ok(json!({"success": false, "message": "Task not found"})),
                    },
                },
                (Method::Get, Some("create_targets")) => Self::ok(json!({
                    "success": true,
                    "targets": [
                        {"id": 3, "department_name": "IT"},
                        {"id": 4, "department_name": "HR"},
                        {"id": 3, "department_name": "IT"},
                    ],
                })),
                (Method::Put, Some("status")) => {
                    let id = req.query_value("id").unwrap_or_default();
                    let status = body["status_code"].clone();
                    if let Some(t) = Self::task_mut(&mut tasks, id) {
                        // Server-side cascade the client cannot predict.
                        if status == "COMPLETED" {
                            if let Some(steps) = t["steps"].as_array_mut() {
                                for s in steps {
                                    s["is_completed"] = json!(1);
                                }
                            }
                        }
                        t["status_code"] = status;
                    }
                    Self::ok(json!({"success": true}))
                }
                (Method::Put, Some("comment")) => {
                    let id = req.query_value("id").unwrap_or_default();
                    if let Some(t) = Self::task_mut(&mut tasks, id) {
                        let comment = json!({
                            "full_name": "Server",
                            "comment": body["comment"],
                            "created_at": "2026-02-11 10:00:00",
                        });
                        push(&mut t["comments"], comment);
                    }
                    Self::ok(json!({"success": true}))
                }
                (Method::Post, Some("add_step")) => {
                    let id = req.query_value("task_id").unwrap_or_default();
                    let next = 100 + tasks.len();
                    if let Some(t) = Self::task_mut(&mut tasks, id) {
                        let step = json!({
                            "id": next,
                            "step_title": body["step_title"],
                            "is_completed": 0,
                        });
                        push(&mut t["steps"], step);
                    }
                    Self::ok(json!({"success": true}))
                }
                (Method::Put, Some("update_step")) => {
                    let step_id = req.query_value("step_id").unwrap_or_default().to_string();
                    for t in tasks.iter_mut() {
                        if let Some(steps) = t["steps"].as_array_mut() {
                            for s in steps.iter_mut().filter(|s| s["id"].to_string() == step_id) {
                                s["is_completed"] = body["is_completed"].clone();
                            }
                        }
                    }
                    Self::ok(json!({"success": true}))
                }
                (Method::Delete, Some("delete_step")) => {
                    let step_id = req.query_value("step_id").unwrap_or_default().to_string();
                    for t in tasks.iter_mut() {
                        if let Some(steps) = t["steps"].as_array_mut() {
                            steps.retain(|s| s["id"].to_string() != step_id);
                        }
                    }
                    Self::ok(json!({"success": true}))
                }
                (Method::Post, None) => {
                    let id = 1000 + tasks.len();
                    tasks.push(json!({
                        "id": id,
                        "title": body["title"],
                        "priority": body["priority"],
                        "status_code": "OPENED",
                    }));
                    Self::ok(json!({"success": true, "message": "Task created"}))
                }
                _ => HttpResponse::json(400, json!({"message": "unsupported"})),
            };
        }
        if req.url.ends_with("/upload.php") {
            return Self::ok(json!({"success": true}));
        }
        if req.url.ends_with("/get-contacts.php") {
            return Self::ok(self.contacts.lock().clone());
        }
        if req.url.ends_with("/get-all-users.php") {
            return Self::ok(self.users.lock().clone());
        }
        if req.url.ends_with("/get-conversation.php") {
            return Self::ok(json!({"success": true, "messages": *self.messages.lock()}));
        }
        if req.url.ends_with("/send.php") {
            let RequestBody::Multipart(parts) = &req.body else {
                return HttpResponse::json(400, Value::Null);
            };
            let text = parts.iter().find_map(|p| match p {
                FormPart::Text { name, value } if name == "message" => Some(value.clone()),
                _ => None,
            });
            let mut messages = self.messages.lock();
            let id = messages.len() + 1;
            messages.push(json!({
                "id": id,
                "sender_id": 1,
                "receiver_id": 2,
                "message": text,
                "created_at": format!("2026-02-11 12:00:{id:02}"),
            }));
            return Self::ok(json!({"success": true}));
        }
        if req.url.ends_with("/auth.php") {
            return Self::ok(self.me.lock().clone());
        }
        HttpResponse::json(404, Value::Null)
    }
}

fn push(slot: &mut Value, item: Value) {
    if let Some(list) = slot.as_array_mut() {
        list.push(item);
    } else {
        *slot = json!([item]);
    }
}

/// Signed-in client wired to `backend`.
pub(crate) fn client_for(
    backend: &Arc<FakeBackend>,
    delay: Duration,
) -> (ApiClient, Arc<ScriptedTransport>) {
    let gate = Arc::new(SessionGate::new(
        Arc::new(MemoryCredentialStore::new()),
        UnauthorizedBus::new(),
    ));
    let _ = gate.set_session("tok");
    let handler_backend = Arc::clone(backend);
    let transport = Arc::new(
        ScriptedTransport::new(move |req| Ok(handler_backend.handle(req))).with_delay(delay),
    );
    let client = ApiClient::new(transport.clone(), gate, &ApiSettings::default());
    (client, transport)
}

/// Raw task record.
pub(crate) fn raw_task(id: i64, title: &str, status: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "status_code": status,
        "priority": "medium",
        "created_at": "2026-02-11 08:00:00",
        "steps": [
            {"id": id * 10, "step_title": "first", "is_completed": 0},
            {"id": id * 10 + 1, "step_title": "second", "is_completed": 0},
        ],
        "comments": [],
    })
}
