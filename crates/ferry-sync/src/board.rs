//! # Task board
//!
//! Headless controller for the kanban list, the task detail view, and the
//! create-task form. The list and the open detail live in one
//! [`TaskLists`] value so an optimistic patch that touches both is rolled
//! back atomically.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use ferry_client::{ApiClient, FileUpload, NewTask};
use ferry_core::{Comment, Priority, Step, TargetDepartment, Task, TaskId, TaskStatus};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::errors::SyncError;
use crate::flight::SingleFlight;
use crate::optimistic::{MutationOutcome, apply_optimistic};
use crate::poller::{FetchMode, PollTarget};

/// List plus open detail, patched and restored together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskLists {
    /// Every task on the board.
    pub tasks: Vec<Task>,
    /// The task open in the detail view, once loaded.
    pub detail: Option<Task>,
}

/// One board column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardSection {
    /// Column status.
    pub status: TaskStatus,
    /// Tasks in list order.
    pub tasks: Vec<Task>,
}

/// Create-task form state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskDraft {
    /// Title (required).
    pub title: String,
    /// Optional description.
    pub description: String,
    /// Priority.
    pub priority: Priority,
    /// Addressed department (required).
    pub target_department_id: Option<i64>,
}

/// Controller for the task screens.
pub struct TaskBoard {
    client: ApiClient,
    lists: Mutex<TaskLists>,
    selected: Mutex<Option<TaskId>>,
    targets: Mutex<Vec<TargetDepartment>>,
    loading: AtomicBool,
    next_temp_id: AtomicI64,
    status_flight: SingleFlight,
    step_flight: SingleFlight,
    comment_flight: SingleFlight,
    create_flight: SingleFlight,
    upload_flight: SingleFlight,
}

impl std::fmt::Debug for TaskBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskBoard")
            .field("tasks", &self.lists.lock().tasks.len())
            .field("selected", &*self.selected.lock())
            .finish_non_exhaustive()
    }
}

impl TaskBoard {
    /// Empty board.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            lists: Mutex::new(TaskLists::default()),
            selected: Mutex::new(None),
            targets: Mutex::new(Vec::new()),
            loading: AtomicBool::new(false),
            next_temp_id: AtomicI64::new(-1),
            status_flight: SingleFlight::new(),
            step_flight: SingleFlight::new(),
            comment_flight: SingleFlight::new(),
            create_flight: SingleFlight::new(),
            upload_flight: SingleFlight::new(),
        }
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Snapshot of the list and detail.
    pub fn lists(&self) -> TaskLists {
        self.lists.lock().clone()
    }

    /// All tasks in list order.
    pub fn tasks(&self) -> Vec<Task> {
        self.lists.lock().tasks.clone()
    }

    /// The loaded detail, if any.
    pub fn detail(&self) -> Option<Task> {
        self.lists.lock().detail.clone()
    }

    /// The task the detail view is showing (or loading).
    pub fn selected(&self) -> Option<TaskId> {
        *self.selected.lock()
    }

    /// Cached create targets.
    pub fn targets(&self) -> Vec<TargetDepartment> {
        self.targets.lock().clone()
    }

    /// Whether a visible list fetch is running.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Tasks grouped into columns in [`TaskStatus::ALL`] order. A task
    /// without a status sits under `OPENED`.
    pub fn sections(&self) -> Vec<BoardSection> {
        let lists = self.lists.lock();
        TaskStatus::ALL
            .into_iter()
            .map(|status| BoardSection {
                status,
                tasks: lists
                    .tasks
                    .iter()
                    .filter(|t| t.column() == status)
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    // ── Loading ─────────────────────────────────────────────────────

    /// Replace the list with server truth.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let tasks = self.client.list_tasks().await?;
        self.lists.lock().tasks = tasks;
        Ok(())
    }

    /// Select `id` and load its detail. The result is dropped if the user
    /// has moved on to another task meanwhile.
    pub async fn open_task(&self, id: TaskId) -> Result<(), SyncError> {
        *self.selected.lock() = Some(id);
        self.lists.lock().detail = None;
        self.load_detail(id).await
    }

    /// Deep-link entry: like [`Self::open_task`], but a failed load clears
    /// the selection.
    pub async fn open_task_by_id(&self, id: TaskId) -> Result<(), SyncError> {
        let result = self.open_task(id).await;
        if let Err(e) = &result {
            warn!(task_id = id, error = %e, "deep link to task failed");
            let mut selected = self.selected.lock();
            if *selected == Some(id) {
                *selected = None;
            }
        }
        result
    }

    /// Close the detail view.
    pub fn close_task(&self) {
        *self.selected.lock() = None;
        self.lists.lock().detail = None;
    }

    /// Re-fetch the open detail. No-op without a selection.
    pub async fn refresh_detail(&self) -> Result<(), SyncError> {
        match self.selected() {
            Some(id) => self.load_detail(id).await,
            None => Ok(()),
        }
    }

    /// Forget everything (logout).
    pub fn clear(&self) {
        *self.lists.lock() = TaskLists::default();
        *self.selected.lock() = None;
        self.targets.lock().clear();
    }

    async fn load_detail(&self, id: TaskId) -> Result<(), SyncError> {
        let task = self.client.task_detail(id).await?;
        if self.selected() == Some(id) {
            self.lists.lock().detail = Some(task);
        } else {
            debug!(task_id = id, "detail arrived after selection changed");
        }
        Ok(())
    }

    fn temp_id(&self) -> i64 {
        self.next_temp_id.fetch_sub(1, Ordering::Relaxed)
    }

    fn open_detail_id(&self) -> Result<TaskId, SyncError> {
        self.selected()
            .ok_or_else(|| SyncError::precondition("No task is open"))
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Move a task to `status`, patching the list and any open detail.
    pub async fn change_status(
        &self,
        id: TaskId,
        status: TaskStatus,
    ) -> Result<MutationOutcome<()>, SyncError> {
        apply_optimistic(
            &self.lists,
            &self.status_flight,
            |lists| {
                for task in lists.tasks.iter_mut().filter(|t| t.id == id) {
                    task.status_code = Some(status);
                }
                if let Some(detail) = lists.detail.as_mut().filter(|d| d.id == id) {
                    detail.status_code = Some(status);
                }
            },
            || self.client.update_status(id, status),
            || async {
                if let Err(e) = self.refresh().await {
                    warn!(error = %e, "board refresh after status change failed");
                }
                if self.selected() == Some(id) {
                    self.reconcile_detail().await;
                }
            },
        )
        .await
    }

    /// Append a step to the open task.
    pub async fn add_step(&self, title: &str) -> Result<MutationOutcome<()>, SyncError> {
        let task_id = self.open_detail_id()?;
        let title = title.trim();
        if title.is_empty() {
            return Err(SyncError::precondition("Step title is required"));
        }
        let step = Step {
            id: self.temp_id(),
            title: title.to_string(),
            is_completed: false,
        };
        apply_optimistic(
            &self.lists,
            &self.step_flight,
            |lists| {
                if let Some(detail) = lists.detail.as_mut().filter(|d| d.id == task_id) {
                    detail.steps.push(step);
                }
            },
            || self.client.add_step(task_id, title),
            || self.reconcile_detail(),
        )
        .await
    }

    /// Flip a step's completion flag.
    pub async fn toggle_step(&self, step_id: i64) -> Result<MutationOutcome<()>, SyncError> {
        let current = self
            .lists
            .lock()
            .detail
            .as_ref()
            .and_then(|d| d.steps.iter().find(|s| s.id == step_id))
            .map(|s| s.is_completed)
            .ok_or_else(|| SyncError::precondition("Unknown step"))?;
        let next = !current;
        apply_optimistic(
            &self.lists,
            &self.step_flight,
            |lists| {
                if let Some(detail) = lists.detail.as_mut() {
                    for step in detail.steps.iter_mut().filter(|s| s.id == step_id) {
                        step.is_completed = next;
                    }
                }
            },
            || self.client.update_step(step_id, next),
            || self.reconcile_detail(),
        )
        .await
    }

    /// Remove a step from the open task.
    pub async fn delete_step(&self, step_id: i64) -> Result<MutationOutcome<()>, SyncError> {
        let _ = self.open_detail_id()?;
        apply_optimistic(
            &self.lists,
            &self.step_flight,
            |lists| {
                if let Some(detail) = lists.detail.as_mut() {
                    detail.steps.retain(|s| s.id != step_id);
                }
            },
            || self.client.delete_step(step_id),
            || self.reconcile_detail(),
        )
        .await
    }

    /// Comment on the open task.
    pub async fn add_comment(&self, text: &str) -> Result<MutationOutcome<()>, SyncError> {
        let task_id = self.open_detail_id()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SyncError::precondition("Comment is required"));
        }
        let comment = Comment {
            author: String::new(),
            text: text.to_string(),
            created_at: String::new(),
        };
        apply_optimistic(
            &self.lists,
            &self.comment_flight,
            |lists| {
                if let Some(detail) = lists.detail.as_mut().filter(|d| d.id == task_id) {
                    detail.comments.push(comment);
                }
            },
            || self.client.add_comment(task_id, text),
            || self.reconcile_detail(),
        )
        .await
    }

    /// Load create targets and return a fresh draft with the first target
    /// preselected.
    pub async fn prepare_create(&self) -> Result<TaskDraft, SyncError> {
        let targets = self.client.create_targets().await?;
        let draft = TaskDraft {
            target_department_id: targets.first().map(|t| t.id),
            ..TaskDraft::default()
        };
        *self.targets.lock() = targets;
        Ok(draft)
    }

    /// Submit a draft. Validation failures never reach the network.
    ///
    /// Returns the server's confirmation message, if it sent one.
    pub async fn create_task(
        &self,
        draft: &TaskDraft,
    ) -> Result<MutationOutcome<Option<String>>, SyncError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(SyncError::precondition("Title is required"));
        }
        let Some(target_department_id) = draft.target_department_id else {
            return Err(SyncError::precondition("Select a target department"));
        };
        let request = NewTask {
            title: title.to_string(),
            description: draft.description.trim().to_string(),
            priority: draft.priority,
            target_department_id,
        };
        let placeholder = Task {
            id: self.temp_id(),
            title: request.title.clone(),
            description: Some(request.description.clone()).filter(|d| !d.is_empty()),
            status_code: Some(TaskStatus::Opened),
            priority: request.priority,
            created_at: String::new(),
            steps: Vec::new(),
            comments: Vec::new(),
            files: Vec::new(),
        };
        apply_optimistic(
            &self.lists,
            &self.create_flight,
            |lists| lists.tasks.push(placeholder),
            || self.client.create_task(&request),
            || async {
                if let Err(e) = self.refresh().await {
                    warn!(error = %e, "board refresh after create failed");
                }
            },
        )
        .await
    }

    /// Attach a file to the open task, then reload its detail.
    pub async fn upload_file(&self, file: FileUpload) -> Result<MutationOutcome<()>, SyncError> {
        let task_id = self.open_detail_id()?;
        let Some(_guard) = self.upload_flight.try_acquire() else {
            return Ok(MutationOutcome::Dropped);
        };
        self.client.upload_task_file(task_id, file).await?;
        self.reconcile_detail().await;
        Ok(MutationOutcome::Applied(()))
    }

    async fn reconcile_detail(&self) {
        if let Err(e) = self.refresh_detail().await {
            warn!(error = %e, "detail refresh failed");
        }
    }
}

#[async_trait]
impl PollTarget for TaskBoard {
    type Item = Vec<Task>;

    async fn fetch(&self, mode: FetchMode) -> Result<Vec<Task>, SyncError> {
        let visible = mode == FetchMode::Visible;
        if visible {
            self.loading.store(true, Ordering::Release);
        }
        let result = self.client.list_tasks().await.map_err(SyncError::from);
        if visible {
            self.loading.store(false, Ordering::Release);
        }
        result
    }

    fn apply(&self, tasks: Vec<Task>) {
        self.lists.lock().tasks = tasks;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
