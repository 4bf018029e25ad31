// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::api::{HttpTaskApi, TaskApi};
use crate::config::ApiConfig;
use crate::error::{ClientError, ErrorKind};
use crate::requests::{Channel, RequestLedger, Ticket};
use common::{Priority, Status, StatusFilter, Task, TaskDraft};
use parking_lot::RwLock;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// What the user was doing when a call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Create,
    Update,
    Delete,
    Reload,
}

impl Operation {
    /// The message shown to the user. The cause is kept in [`ViewError::kind`].
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::Load => "An error occurred while loading tasks.",
            Operation::Create => "An error occurred while adding a task.",
            Operation::Update => "An error occurred while updating a task.",
            Operation::Delete => "An error occurred while deleting a task.",
            Operation::Reload => "An error occurred while refreshing a task.",
        }
    }
}

/// The error banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewError {
    pub operation: Operation,
    pub kind: ErrorKind,
    pub message: String,
}

/// A task being edited in the edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub id: i64,
    pub draft: TaskDraft,
}

/// Everything the task page displays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    /// In server order; local creates are appended.
    pub tasks: Vec<Task>,
    /// The "add task" form.
    pub draft: TaskDraft,
    pub filter: StatusFilter,
    pub error: Option<ViewError>,
    /// True while the latest list fetch is outstanding.
    pub loading: bool,
    pub editing: Option<EditSession>,
}

impl ViewState {
    pub fn task(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

/// How a controller operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The server's answer is now reflected in the view.
    Applied,
    /// A newer request on the same channel superseded this one, or there was
    /// nothing to do; the view was left alone.
    Discarded,
    /// The call failed and the view's error banner was set.
    Failed(ErrorKind),
}

struct Inner {
    view: ViewState,
    ledger: RequestLedger,
}

impl Inner {
    fn fail(&mut self, operation: Operation, err: &ClientError) -> Outcome {
        warn!("{:?} failed: {}", operation, err);
        let kind = err.kind();
        self.view.error = Some(ViewError {
            operation,
            kind,
            message: operation.failure_message().to_string(),
        });
        Outcome::Failed(kind)
    }
}

/// Owns the displayed task list and keeps it in step with the server.
///
/// Every operation takes `&self`, so several calls can be in flight at once.
/// The state lock is only taken between awaits, to issue a request ticket
/// before the call and to reconcile its answer after it. Answers that lost a
/// race against a newer request on the same [`Channel`] are dropped.
pub struct TaskBoard<A> {
    api: A,
    inner: RwLock<Inner>,
}

impl TaskBoard<HttpTaskApi> {
    /// A board talking HTTP to the configured task API.
    pub fn connect(config: &ApiConfig) -> crate::error::Result<Self> {
        Ok(Self::new(HttpTaskApi::new(config)?))
    }
}

impl<A: TaskApi> TaskBoard<A> {
    pub fn new(api: A) -> Self {
        Self::with_filter(api, StatusFilter::All)
    }

    pub fn with_filter(api: A, filter: StatusFilter) -> Self {
        Self {
            api,
            inner: RwLock::new(Inner {
                view: ViewState {
                    filter,
                    ..ViewState::default()
                },
                ledger: RequestLedger::new(),
            }),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// A copy of the current view.
    pub fn snapshot(&self) -> ViewState {
        self.inner.read().view.clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.inner.read().view.tasks.clone()
    }

    pub fn error(&self) -> Option<ViewError> {
        self.inner.read().view.error.clone()
    }

    pub fn filter(&self) -> StatusFilter {
        self.inner.read().view.filter
    }

    /// Fetches the list for the current filter and replaces the view with it.
    pub async fn load(&self) -> Outcome {
        let (ticket, filter) = {
            let mut inner = self.inner.write();
            inner.view.loading = true;
            (inner.ledger.issue(Channel::List), inner.view.filter)
        };
        self.fetch(ticket, filter).await
    }

    pub async fn refresh(&self) -> Outcome {
        self.load().await
    }

    /// Switches the filter and refetches. The server does the filtering.
    pub async fn set_filter(&self, filter: StatusFilter) -> Outcome {
        let ticket = {
            let mut inner = self.inner.write();
            inner.view.filter = filter;
            inner.view.loading = true;
            inner.ledger.issue(Channel::List)
        };
        self.fetch(ticket, filter).await
    }

    async fn fetch(&self, ticket: Ticket, filter: StatusFilter) -> Outcome {
        debug!("Fetching tasks for filter {} (request {})", filter, ticket.seq);
        let result = match filter.status() {
            None => self.api.list_all().await,
            Some(status) => self.api.list_by_status(status).await,
        };

        let mut inner = self.inner.write();
        if !inner.ledger.is_current(&ticket) {
            debug!("Discarding stale list response (request {})", ticket.seq);
            return Outcome::Discarded;
        }
        inner.view.loading = false;

        match result {
            Ok(mut tasks) => {
                let mut seen = HashSet::new();
                tasks.retain(|t| seen.insert(t.id));
                info!("Successfully retrieved {} tasks.", tasks.len());
                inner.view.tasks = tasks;
                inner.view.error = None;
                Outcome::Applied
            }
            Err(err) => inner.fail(Operation::Load, &err),
        }
    }

    /// Edits the "add task" form.
    pub fn update_draft(&self, change: impl FnOnce(&mut TaskDraft)) {
        change(&mut self.inner.write().view.draft);
    }

    pub fn set_draft(&self, draft: TaskDraft) {
        self.inner.write().view.draft = draft;
    }

    /// Creates a task from the form. On success the server's task is appended
    /// and the form is reset; on failure the form keeps what the user typed.
    pub async fn submit_draft(&self) -> Outcome {
        let draft = self.inner.read().view.draft.clone();
        debug!("Received request to create task: {}", draft.title);

        let result = self.api.create(&draft).await;

        let mut inner = self.inner.write();
        match result {
            Ok(task) => {
                info!("Task created successfully with ID: {}", task.id);
                // A list fetch that finished first may already hold it.
                match inner.view.tasks.iter_mut().find(|t| t.id == task.id) {
                    Some(existing) => *existing = task,
                    None => inner.view.tasks.push(task),
                }
                // Keep anything typed into the form while the call was out.
                if inner.view.draft == draft {
                    inner.view.draft = TaskDraft::default();
                }
                inner.view.error = None;
                Outcome::Applied
            }
            Err(err) => inner.fail(Operation::Create, &err),
        }
    }

    /// Replaces task `id` on the server and then in the view, with the
    /// server's copy. Nothing changes locally before the server answers.
    pub async fn update_task(&self, id: i64, draft: TaskDraft) -> Outcome {
        let ticket = self.inner.write().ledger.issue(Channel::Task(id));
        debug!("Updating task with ID: {} (request {})", id, ticket.seq);

        let result = self.api.update(id, &draft).await;
        self.reconcile_task(ticket, id, Operation::Update, result)
    }

    pub async fn set_priority(&self, id: i64, priority: Priority) -> Outcome {
        self.edit_field(id, |draft| draft.priority = priority).await
    }

    pub async fn set_status(&self, id: i64, status: Status) -> Outcome {
        self.edit_field(id, |draft| draft.status = status).await
    }

    /// Sends the displayed task with one field changed.
    async fn edit_field(&self, id: i64, change: impl FnOnce(&mut TaskDraft)) -> Outcome {
        let current = self.inner.read().view.task(id).map(Task::to_draft);
        let Some(mut draft) = current else {
            return self
                .inner
                .write()
                .fail(Operation::Update, &ClientError::NotFound { id });
        };
        change(&mut draft);
        self.update_task(id, draft).await
    }

    /// Re-reads one task from the server and replaces it in the view.
    pub async fn reload_task(&self, id: i64) -> Outcome {
        let ticket = self.inner.write().ledger.issue(Channel::Task(id));
        debug!("Reloading task with ID: {} (request {})", id, ticket.seq);

        let result = self.api.get(id).await;
        self.reconcile_task(ticket, id, Operation::Reload, result)
    }

    fn reconcile_task(
        &self,
        ticket: Ticket,
        id: i64,
        operation: Operation,
        result: crate::error::Result<Task>,
    ) -> Outcome {
        let mut inner = self.inner.write();
        if !inner.ledger.is_current(&ticket) {
            debug!("Discarding stale response for task {} (request {})", id, ticket.seq);
            return Outcome::Discarded;
        }

        match result {
            Ok(task) => {
                match inner.view.tasks.iter_mut().find(|t| t.id == id) {
                    Some(slot) => {
                        info!("Task with ID {} updated successfully.", id);
                        *slot = task;
                    }
                    None => debug!("Task with ID {} is no longer displayed.", id),
                }
                inner.view.error = None;
                Outcome::Applied
            }
            Err(err) => inner.fail(operation, &err),
        }
    }

    /// Deletes task `id`; it leaves the view once the server confirms.
    ///
    /// A confirmed delete always applies, even if a later edit of the same
    /// task is still outstanding, and it invalidates that edit's answer.
    pub async fn delete_task(&self, id: i64) -> Outcome {
        let ticket = self.inner.write().ledger.issue(Channel::Task(id));
        debug!("Attempting to delete task with ID: {}", id);

        let result = self.api.delete(id).await;

        let mut inner = self.inner.write();
        match result {
            Ok(()) => {
                info!("Task with ID {} deleted successfully.", id);
                inner.view.tasks.retain(|t| t.id != id);
                inner.ledger.retire(Channel::Task(id));
                if inner.view.editing.as_ref().is_some_and(|e| e.id == id) {
                    inner.view.editing = None;
                }
                inner.view.error = None;
                Outcome::Applied
            }
            Err(_) if !inner.ledger.is_current(&ticket) => {
                debug!("Discarding stale delete failure for task {}", id);
                Outcome::Discarded
            }
            Err(err) => inner.fail(Operation::Delete, &err),
        }
    }

    /// Opens the edit form on a displayed task. Returns false if it is not displayed.
    pub fn begin_edit(&self, id: i64) -> bool {
        let mut inner = self.inner.write();
        let Some(draft) = inner.view.task(id).map(Task::to_draft) else {
            return false;
        };
        inner.view.editing = Some(EditSession { id, draft });
        true
    }

    /// Changes the open edit form. Returns false if no edit is open.
    pub fn edit_draft(&self, change: impl FnOnce(&mut TaskDraft)) -> bool {
        match self.inner.write().view.editing.as_mut() {
            Some(session) => {
                change(&mut session.draft);
                true
            }
            None => false,
        }
    }

    pub fn cancel_edit(&self) {
        self.inner.write().view.editing = None;
    }

    /// Sends the edit form. The form closes once the server accepts it.
    pub async fn submit_edit(&self) -> Outcome {
        let Some(session) = self.inner.read().view.editing.clone() else {
            debug!("No edit in progress.");
            return Outcome::Discarded;
        };

        let outcome = self.update_task(session.id, session.draft.clone()).await;
        if outcome == Outcome::Applied {
            let mut inner = self.inner.write();
            if inner.view.editing.as_ref() == Some(&session) {
                inner.view.editing = None;
            }
        }
        outcome
    }

    pub fn dismiss_error(&self) {
        self.inner.write().view.error = None;
    }
}
