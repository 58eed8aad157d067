//! Response normalization.
//!
//! The backend is inconsistent about key names, id conventions, enum casing,
//! and where it puts lists. Every function here is total: malformed or missing
//! fields degrade to a default (medium priority, an excluded record, an unread
//! message) and nothing ever returns an error. This is a best-effort display
//! policy, not data-integrity enforcement.
//!
//! Field lookups use explicit fallback chains: the first key whose value is
//! present and non-null wins, even when that value later turns out unusable.

use std::collections::HashSet;

use serde_json::Value;

use crate::model::{
    Comment, Contact, Message, Priority, Step, TargetDepartment, Task, TaskFile, TaskStatus,
    UserSummary,
};

/// Keys that may carry the create-target list, in priority order. `tasks` is
/// a known backend slip on the `create_targets` action.
const TARGET_LIST_KEYS: &[&str] = &["targets", "departments", "tasks"];

// ─────────────────────────────────────────────────────────────────────────────
// Field access
// ─────────────────────────────────────────────────────────────────────────────

/// First present, non-null value among `keys`.
fn first<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .find(|v| !v.is_null())
}

/// Coerce a number or numeric string to an integer.
#[allow(clippy::cast_possible_truncation)]
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Identity from a fallback chain. Zero and unparseable ids count as absent.
fn id_of(value: &Value, keys: &[&str]) -> Option<i64> {
    first(value, keys).and_then(as_i64).filter(|id| *id != 0)
}

/// Text from a fallback chain. Numbers are rendered; other shapes are absent.
fn text_of(value: &Value, keys: &[&str]) -> Option<String> {
    match first(value, keys)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-empty text from a fallback chain.
fn non_empty_text(value: &Value, keys: &[&str]) -> Option<String> {
    text_of(value, keys).filter(|s| !s.trim().is_empty())
}

/// Truthy flag: `true`, `1`, `"1"`, `"true"`.
fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| (f - 1.0).abs() < f64::EPSILON),
        Value::String(s) => matches!(s.trim(), "1" | "true"),
        _ => false,
    }
}

/// First array found under `keys`, or the value itself when it is an array.
fn list_of<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    if let Value::Array(items) = value {
        return items;
    }
    keys.iter()
        .find_map(|k| value.get(*k).and_then(Value::as_array))
        .map_or(&[][..], Vec::as_slice)
}

// ─────────────────────────────────────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// Whether a response body reports `success`.
pub fn is_success(body: &Value) -> bool {
    body.get("success").is_some_and(flag)
}

/// Server-provided message, when the body carries a non-empty one.
pub fn server_message(body: &Value) -> Option<String> {
    non_empty_text(body, &["message", "error"])
}

// ─────────────────────────────────────────────────────────────────────────────
// Scalars
// ─────────────────────────────────────────────────────────────────────────────

/// Canonicalize a priority string. Unrecognized input becomes `medium`.
pub fn normalize_priority(input: &str) -> Priority {
    match input.trim().to_ascii_lowercase().as_str() {
        "low" => Priority::Low,
        "high" => Priority::High,
        "urgent" => Priority::Urgent,
        _ => Priority::Medium,
    }
}

fn priority_of(value: &Value) -> Priority {
    value
        .get("priority")
        .and_then(Value::as_str)
        .map_or(Priority::Medium, normalize_priority)
}

/// Read state of a raw message: `is_read` of `1` or `"1"`, or any
/// non-null, non-empty `read_at` timestamp.
pub fn normalize_read_state(message: &Value) -> bool {
    let marked = match message.get("is_read") {
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => s.trim() == "1",
        _ => false,
    };
    if marked {
        return true;
    }
    match message.get("read_at") {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

/// Stable ascending sort by `created_at` string. Ties keep input order.
pub fn sort_messages(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    messages
}

// ─────────────────────────────────────────────────────────────────────────────
// Targets
// ─────────────────────────────────────────────────────────────────────────────

/// Normalize a create-target response into unique, named departments.
///
/// The list is taken from the first of `targets`, `departments`, `tasks` that
/// holds an array. Identity resolves `id` → `department_id` →
/// `target_department_id`; name resolves `department_name` → `name`. Entries
/// without an identity or a name are dropped; duplicates keep the first.
pub fn normalize_targets(raw: &Value) -> Vec<TargetDepartment> {
    let entries = TARGET_LIST_KEYS
        .iter()
        .find_map(|k| raw.get(*k).and_then(Value::as_array))
        .map_or(&[][..], Vec::as_slice);

    let mut seen = HashSet::new();
    entries
        .iter()
        .filter_map(|entry| {
            let id = id_of(entry, &["id", "department_id", "target_department_id"])?;
            let department_name = non_empty_text(entry, &["department_name", "name"])?;
            seen.insert(id).then_some(TargetDepartment {
                id,
                department_name,
            })
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tasks
// ─────────────────────────────────────────────────────────────────────────────

fn normalize_step(raw: &Value) -> Option<Step> {
    Some(Step {
        id: id_of(raw, &["id", "step_id"])?,
        title: text_of(raw, &["step_title", "title"]).unwrap_or_default(),
        is_completed: raw.get("is_completed").is_some_and(flag),
    })
}

fn normalize_comment(raw: &Value) -> Option<Comment> {
    Some(Comment {
        author: text_of(raw, &["full_name", "author", "username", "user_name"])
            .unwrap_or_default(),
        text: non_empty_text(raw, &["comment", "text", "body"])?,
        created_at: text_of(raw, &["created_at"]).unwrap_or_default(),
    })
}

fn normalize_file(raw: &Value) -> Option<TaskFile> {
    Some(TaskFile {
        id: id_of(raw, &["id", "file_id"]),
        name: non_empty_text(raw, &["original_name", "file_name", "name"])?,
        url: text_of(raw, &["file_url", "url", "file_path"]),
    })
}

/// Normalize one task record. Returns `None` without a usable identity.
pub fn normalize_task(raw: &Value) -> Option<Task> {
    let id = id_of(raw, &["id", "task_id"])?;
    Some(Task {
        id,
        title: text_of(raw, &["title"]).unwrap_or_default(),
        description: non_empty_text(raw, &["description"]),
        status_code: text_of(raw, &["status_code", "status"])
            .as_deref()
            .and_then(TaskStatus::parse),
        priority: priority_of(raw),
        created_at: text_of(raw, &["created_at"]).unwrap_or_default(),
        steps: list_of(raw.get("steps").unwrap_or(&Value::Null), &[])
            .iter()
            .filter_map(normalize_step)
            .collect(),
        comments: list_of(raw.get("comments").unwrap_or(&Value::Null), &[])
            .iter()
            .filter_map(normalize_comment)
            .collect(),
        files: list_of(first(raw, &["files", "attachments"]).unwrap_or(&Value::Null), &[])
            .iter()
            .filter_map(normalize_file)
            .collect(),
    })
}

/// Normalize a task list response (`{ tasks: [...] }`).
pub fn normalize_tasks(body: &Value) -> Vec<Task> {
    list_of(body, &["tasks"])
        .iter()
        .filter_map(normalize_task)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────────────────

/// Contact identity: `contact_id` → `id` → `user_id`.
pub fn contact_id(raw: &Value) -> Option<i64> {
    id_of(raw, &["contact_id", "id", "user_id"])
}

fn normalize_contact(raw: &Value) -> Option<Contact> {
    let id = contact_id(raw)?;
    let username = text_of(raw, &["username"]).unwrap_or_default();
    let display_name = non_empty_text(raw, &["full_name", "username", "name"])
        .unwrap_or_else(|| format!("#{id}"));
    let unread_count = first(raw, &["unread_count"])
        .and_then(as_i64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0);
    Some(Contact {
        id,
        display_name,
        username,
        unread_count,
        last_message: non_empty_text(raw, &["last_message"]),
    })
}

/// Normalize a contact list: `contacts`, `data`, or a bare array.
pub fn normalize_contacts(body: &Value) -> Vec<Contact> {
    list_of(body, &["contacts", "data"])
        .iter()
        .filter_map(normalize_contact)
        .collect()
}

/// Aggregate unread count on a contact list response.
pub fn unread_total(body: &Value) -> u32 {
    first(body, &["unread_count", "unread_total"])
        .and_then(as_i64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn normalize_message(raw: &Value) -> Option<Message> {
    Some(Message {
        id: id_of(raw, &["id", "message_id"])?,
        sender_id: id_of(raw, &["sender_id"]).unwrap_or(0),
        receiver_id: id_of(raw, &["receiver_id"]).unwrap_or(0),
        body: text_of(raw, &["message", "body", "text"]).unwrap_or_default(),
        created_at: text_of(raw, &["created_at"]).unwrap_or_default(),
        is_read: normalize_read_state(raw),
    })
}

/// Normalize a conversation (`messages` or `data`), sorted ascending.
pub fn normalize_messages(body: &Value) -> Vec<Message> {
    sort_messages(
        list_of(body, &["messages", "data"])
            .iter()
            .filter_map(normalize_message)
            .collect(),
    )
}

/// Normalize one user record.
pub fn normalize_user(raw: &Value) -> Option<UserSummary> {
    Some(UserSummary {
        id: id_of(raw, &["id", "user_id"])?,
        full_name: text_of(raw, &["full_name", "name"]).unwrap_or_default(),
        username: text_of(raw, &["username"]).unwrap_or_default(),
        role_name: text_of(raw, &["role_name"]).unwrap_or_default(),
        department_name: text_of(raw, &["department_name"]).unwrap_or_default(),
    })
}

/// Normalize a user directory (`users` or `data`).
pub fn normalize_users(body: &Value) -> Vec<UserSummary> {
    list_of(body, &["users", "data"])
        .iter()
        .filter_map(normalize_user)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
