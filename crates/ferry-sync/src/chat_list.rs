//! Contact list and new-chat user picker.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ferry_client::{ApiClient, ContactList};
use ferry_core::{Contact, UserSummary};
use parking_lot::Mutex;

use crate::errors::SyncError;
use crate::poller::{FetchMode, PollTarget};

/// Controller for the chat list screen.
pub struct ChatList {
    client: ApiClient,
    contacts: Mutex<ContactList>,
    users: Mutex<Vec<UserSummary>>,
    query: Mutex<String>,
    loading: AtomicBool,
}

impl std::fmt::Debug for ChatList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatList")
            .field("contacts", &self.contacts.lock().contacts.len())
            .field("users", &self.users.lock().len())
            .finish_non_exhaustive()
    }
}

impl ChatList {
    /// Empty list.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            contacts: Mutex::new(ContactList::default()),
            users: Mutex::new(Vec::new()),
            query: Mutex::new(String::new()),
            loading: AtomicBool::new(false),
        }
    }

    /// Current contacts.
    pub fn contacts(&self) -> Vec<Contact> {
        self.contacts.lock().contacts.clone()
    }

    /// Aggregate unread count (the tab badge).
    pub fn unread_total(&self) -> u32 {
        self.contacts.lock().unread_total
    }

    /// Whether a visible fetch is running.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Replace the contact list with server truth.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let list = self.client.contacts().await?;
        *self.contacts.lock() = list;
        Ok(())
    }

    /// Fetch the list and look up `contact_id` in it (deep links).
    pub async fn find_contact(&self, contact_id: i64) -> Result<Option<Contact>, SyncError> {
        self.refresh().await?;
        Ok(self
            .contacts
            .lock()
            .contacts
            .iter()
            .find(|c| c.id == contact_id)
            .cloned())
    }

    /// Load the user directory for the new-chat picker.
    pub async fn load_users(&self) -> Result<(), SyncError> {
        let users = self.client.all_users().await?;
        *self.users.lock() = users;
        Ok(())
    }

    /// Set the picker filter.
    pub fn set_query(&self, query: impl Into<String>) {
        *self.query.lock() = query.into();
    }

    /// Directory entries matching the filter, case-insensitively, on full
    /// name, username, role, or department.
    pub fn filtered_users(&self) -> Vec<UserSummary> {
        let needle = self.query.lock().trim().to_lowercase();
        let users = self.users.lock();
        if needle.is_empty() {
            return users.clone();
        }
        users
            .iter()
            .filter(|u| {
                [&u.full_name, &u.username, &u.role_name, &u.department_name]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    /// Close the picker: drop the directory and the filter.
    pub fn reset_picker(&self) {
        self.users.lock().clear();
        self.query.lock().clear();
    }

    /// Forget everything (logout).
    pub fn clear(&self) {
        *self.contacts.lock() = ContactList::default();
        self.reset_picker();
    }
}

#[async_trait]
impl PollTarget for ChatList {
    type Item = ContactList;

    async fn fetch(&self, mode: FetchMode) -> Result<ContactList, SyncError> {
        let visible = mode == FetchMode::Visible;
        if visible {
            self.loading.store(true, Ordering::Release);
        }
        let result = self.client.contacts().await.map_err(SyncError::from);
        if visible {
            self.loading.store(false, Ordering::Release);
        }
        result
    }

    fn apply(&self, list: ContactList) {
        *self.contacts.lock() = list;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeBackend, client_for};
    use serde_json::json;
    use std::time::Duration;

    fn chats() -> (ChatList, std::sync::Arc<FakeBackend>) {
        let backend = FakeBackend::with_tasks(vec![]);
        *backend.contacts.lock() = json!({
            "success": true,
            "unread_count": "4",
            "contacts": [
                {"contact_id": 2, "full_name": "Ayşe Kaya", "username": "ayse", "unread_count": 3},
                {"id": 5, "username": "mehmet", "unread_count": 1, "last_message": "ok"},
                {"full_name": "no id"},
            ],
        });
        *backend.users.lock() = json!({
            "success": true,
            "users": [
                {
                    "id": 2,
                    "full_name": "Ayşe Kaya",
                    "username": "ayse",
                    "role_name": "Admin",
                    "department_name": "IT",
                },
                {
                    "id": 5,
                    "full_name": "Mehmet Demir",
                    "username": "mehmet",
                    "role_name": "Staff",
                    "department_name": "Finance",
                },
            ],
        });
        let (client, _) = client_for(&backend, Duration::ZERO);
        (ChatList::new(client), backend)
    }

    #[tokio::test]
    async fn refresh_normalizes_contacts() {
        let (chats, _) = chats();
        chats.refresh().await.unwrap();
        let contacts = chats.contacts();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].display_name, "Ayşe Kaya");
        assert_eq!(contacts[1].display_name, "mehmet");
        assert_eq!(chats.unread_total(), 4);
    }

    #[tokio::test]
    async fn find_contact_uses_fresh_list() {
        let (chats, backend) = chats();
        assert!(chats.find_contact(9).await.unwrap().is_none());
        backend.contacts.lock()["contacts"]
            .as_array_mut()
            .unwrap()
            .push(json!({"id": 9, "username": "new"}));
        let found = chats.find_contact(9).await.unwrap().unwrap();
        assert_eq!(found.username, "new");
    }

    #[tokio::test]
    async fn filter_matches_any_field() {
        let (chats, _) = chats();
        chats.load_users().await.unwrap();
        assert_eq!(chats.filtered_users().len(), 2);

        chats.set_query("FINANCE");
        let names: Vec<_> = chats.filtered_users().into_iter().map(|u| u.id).collect();
        assert_eq!(names, vec![5]);

        chats.set_query("adm");
        assert_eq!(chats.filtered_users()[0].id, 2);

        chats.set_query("nobody");
        assert!(chats.filtered_users().is_empty());

        chats.reset_picker();
        assert!(chats.filtered_users().is_empty());
    }

    #[tokio::test]
    async fn failed_poll_keeps_list() {
        let (chats, backend) = chats();
        chats.refresh().await.unwrap();
        *backend.read_failure.lock() = Some(ferry_client::HttpResponse::json(500, json!({})));
        assert!(chats.fetch(FetchMode::Silent).await.is_err());
        assert_eq!(chats.contacts().len(), 2);
        assert!(!chats.is_loading());
    }
}
