//! The task list client.
//!
//! [`TaskStore`] owns the in-memory task list for one user and keeps it in
//! step with the row-store: a fetch on mount and on every filter change,
//! optimistic toggles and deletes, and a standing change subscription that
//! answers every event with a full re-fetch.
//!
//! Fetches are sequenced by a request token; a response is applied only if
//! no newer fetch was issued after it. Toggles and deletes are queued per
//! task with the state they replaced. A failed write puts that state back
//! if it is still the newest change to the task and no fetch has replaced
//! the list in the meantime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::editor::{TaskEditor, TaskForm};
use super::filter::{FilterChange, FilterState};
use crate::context::ServiceContext;
use crate::error::TaskError;
use crate::model::{Task, TaskId, TaskStatus};
use crate::ports::{Clock, LocalZone, RowStore};

/// What happened to a fetch response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response replaced the list.
    Applied {
        /// Number of tasks now in the list.
        count: usize,
    },
    /// A newer fetch was issued before this one resolved; the response was dropped.
    Superseded,
}

#[derive(Debug)]
enum PendingOp {
    Toggle { previous: TaskStatus, next: TaskStatus },
    Delete { task: Task, index: usize },
}

#[derive(Debug)]
struct Pending {
    seq: u64,
    op: PendingOp,
    /// List generation the optimistic change was applied to.
    generation: u64,
}

#[derive(Debug, Default)]
struct ListState {
    tasks: Vec<Task>,
    filters: FilterState,
    loading: bool,
    /// Bumped every time a fetch replaces the list.
    generation: u64,
    next_seq: u64,
    /// Unconfirmed writes per task, oldest first.
    pending: HashMap<TaskId, Vec<Pending>>,
}

impl ListState {
    fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    fn begin(&mut self, id: &str, op: PendingOp) -> u64 {
        self.next_seq += 1;
        let pending = Pending { seq: self.next_seq, op, generation: self.generation };
        self.pending.entry(id.to_string()).or_default().push(pending);
        self.next_seq
    }

    /// Flips the listed status and queues the write.
    fn toggle(&mut self, id: &str) -> Result<(TaskStatus, u64), TaskError> {
        let task = self.find_mut(id).ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        let previous = task.status;
        let next = previous.toggled();
        task.status = next;
        Ok((next, self.begin(id, PendingOp::Toggle { previous, next })))
    }

    /// Removes write `seq` from the task's queue once the store has answered.
    ///
    /// A failed write that is still the newest change is reverted. An older
    /// one hands the state it replaced to the change queued after it, so
    /// that change reverts to what the store actually holds.
    fn settle(&mut self, id: &str, seq: u64, failed: bool) {
        let Some(queue) = self.pending.get_mut(id) else {
            return;
        };
        let Some(index) = queue.iter().position(|pending| pending.seq == seq) else {
            return;
        };
        let settled = queue.remove(index);
        let newest = index == queue.len();
        if failed && !newest && queue[index].generation == settled.generation {
            match (&settled.op, &mut queue[index].op) {
                (PendingOp::Toggle { previous, .. }, PendingOp::Toggle { previous: later, .. }) => {
                    *later = *previous;
                }
                (PendingOp::Toggle { previous, .. }, PendingOp::Delete { task, .. }) => {
                    task.status = *previous;
                }
                _ => {}
            }
        }
        if queue.is_empty() {
            self.pending.remove(id);
        }
        if failed && newest {
            self.revert(id, settled);
        }
    }

    fn revert(&mut self, id: &str, pending: Pending) {
        if pending.generation != self.generation {
            debug!(task_id = id, "list replaced since optimistic change; nothing to revert");
            return;
        }
        match pending.op {
            PendingOp::Toggle { previous, next } => {
                if let Some(task) = self.find_mut(id) {
                    if task.status == next {
                        task.status = previous;
                        warn!(task_id = id, status = %previous, "reverted optimistic toggle");
                    }
                }
            }
            PendingOp::Delete { task, index } => {
                if !self.tasks.iter().any(|t| t.id == task.id) {
                    let index = index.min(self.tasks.len());
                    self.tasks.insert(index, task);
                    warn!(task_id = id, "restored optimistically deleted task");
                }
            }
        }
    }
}

struct Inner {
    rows: Arc<dyn RowStore>,
    clock: Arc<dyn Clock>,
    zone: LocalZone,
    user_id: String,
    latest_fetch: AtomicU64,
    state: Mutex<ListState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the loading flag if a fetch is dropped before its response arrives.
struct Loading<'a> {
    inner: &'a Inner,
    token: u64,
    armed: bool,
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        if self.armed && self.inner.latest_fetch.load(Ordering::SeqCst) == self.token {
            self.inner.lock().loading = false;
        }
    }
}

/// Owner of one user's in-memory task list.
///
/// Cloning is cheap; clones share the same list.
#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<Inner>,
}

impl TaskStore {
    /// Creates an empty list for `user_id`. Nothing is fetched until
    /// [`TaskStore::fetch`] or [`TaskStore::mount`] is called.
    pub fn new(
        rows: Arc<dyn RowStore>,
        clock: Arc<dyn Clock>,
        zone: LocalZone,
        user_id: impl Into<String>,
        filters: FilterState,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                rows,
                clock,
                zone,
                user_id: user_id.into(),
                latest_fetch: AtomicU64::new(0),
                state: Mutex::new(ListState { filters, ..ListState::default() }),
            }),
        }
    }

    /// Creates a list wired to the ports of `ctx`.
    pub fn from_context(
        ctx: &ServiceContext,
        user_id: impl Into<String>,
        filters: FilterState,
    ) -> Self {
        Self::new(Arc::clone(&ctx.rows), Arc::clone(&ctx.clock), ctx.zone, user_id, filters)
    }

    /// Owner of the list.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    /// Time zone used for dates and day boundaries.
    #[must_use]
    pub fn zone(&self) -> LocalZone {
        self.inner.zone
    }

    /// Snapshot of the list, in store order.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.inner.lock().tasks.clone()
    }

    /// Snapshot of one task in the list.
    #[must_use]
    pub fn task(&self, id: &str) -> Option<Task> {
        self.inner.lock().tasks.iter().find(|task| task.id == id).cloned()
    }

    /// Current filter state.
    #[must_use]
    pub fn filters(&self) -> FilterState {
        self.inner.lock().filters
    }

    /// Whether the most recent fetch is still outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.lock().loading
    }

    /// Whether a toggle or delete of `id` awaits confirmation.
    #[must_use]
    pub fn is_pending(&self, id: &str) -> bool {
        self.inner.lock().pending.contains_key(id)
    }

    /// Replaces the filters and runs a fetch cycle.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Fetch`] if the read fails; the previous list stays.
    pub async fn set_filters(&self, filters: FilterState) -> Result<FetchOutcome, TaskError> {
        self.inner.lock().filters = filters;
        self.fetch().await
    }

    /// Changes one filter dimension and runs a fetch cycle.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Fetch`] if the read fails; the previous list stays.
    pub async fn change_filter(&self, change: FilterChange) -> Result<FetchOutcome, TaskError> {
        let filters = self.filters().apply(change);
        self.set_filters(filters).await
    }

    /// Reads the tasks matching the current filters and replaces the list.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Fetch`] if the read fails. The previous list is
    /// left in place.
    pub async fn fetch(&self) -> Result<FetchOutcome, TaskError> {
        let token = self.inner.latest_fetch.fetch_add(1, Ordering::SeqCst) + 1;
        let query = {
            let mut state = self.inner.lock();
            state.loading = true;
            state.filters.query(&self.inner.user_id, self.inner.clock.today(self.inner.zone))
        };
        let mut loading = Loading { inner: &self.inner, token, armed: true };
        debug!(token, ?query, "fetching tasks");

        let result = self.inner.rows.select_tasks(&query).await;
        loading.armed = false;

        let mut state = self.inner.lock();
        let latest = self.inner.latest_fetch.load(Ordering::SeqCst);
        if token != latest {
            warn!(token, latest, "discarding superseded fetch response");
            return Ok(FetchOutcome::Superseded);
        }
        state.loading = false;
        match result {
            Ok(tasks) => {
                let count = tasks.len();
                state.tasks = tasks;
                state.generation += 1;
                info!(count, filters = %state.filters, "task list refreshed");
                Ok(FetchOutcome::Applied { count })
            }
            Err(err) => {
                warn!(error = %err, "fetch failed; keeping previous list");
                Err(TaskError::fetch(&err))
            }
        }
    }

    /// Submits the create form.
    ///
    /// The list is not touched; the new row shows up through the change
    /// subscription or the next fetch. The form is cleared on success.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Validation`] before any write for a blank title,
    /// [`TaskError::Busy`] if the form is already submitting, and
    /// [`TaskError::Mutation`] if the insert fails.
    pub async fn create(&self, form: &mut TaskForm) -> Result<Task, TaskError> {
        let _guard = form.begin_submit()?;
        let payload = form.to_new_task(&self.inner.user_id, self.inner.zone)?;
        info!(title = %payload.title, priority = %payload.priority, "creating task");

        let task =
            self.inner.rows.insert_task(&payload).await.map_err(|e| TaskError::mutation(&e))?;
        form.reset();
        Ok(task)
    }

    /// Opens the edit dialog for a task in the list.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if the task is not in the list.
    pub fn edit(&self, id: &str) -> Result<TaskEditor, TaskError> {
        let task = self.task(id).ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        Ok(TaskEditor::open(&task, self.inner.zone))
    }

    /// Submits the edit dialog, closes it, and re-fetches the list.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Validation`], [`TaskError::Busy`] or
    /// [`TaskError::Mutation`] if the write did not happen. A
    /// [`TaskError::Fetch`] means the write succeeded but the refresh failed.
    pub async fn update(&self, editor: &mut TaskEditor) -> Result<Task, TaskError> {
        let guard = editor.begin_submit()?;
        let (id, changes) = editor.to_changes(self.inner.clock.now(), self.inner.zone)?;
        info!(task_id = %id, status = %changes.status, "updating task");

        let task = self
            .inner
            .rows
            .update_task(&id, &changes)
            .await
            .map_err(|e| TaskError::mutation(&e))?;
        drop(guard);
        editor.close();

        self.fetch().await?;
        Ok(task)
    }

    /// Flips a task between completed and pending.
    ///
    /// The list shows the new status immediately, even while earlier
    /// toggles of the same task are unconfirmed. If the write fails and no
    /// later change superseded it, the previous status is restored.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if the task is not in the list and
    /// [`TaskError::Mutation`] if the write fails.
    pub async fn toggle_status(&self, id: &str) -> Result<TaskStatus, TaskError> {
        let (next, seq) = self.inner.lock().toggle(id)?;
        debug!(task_id = id, status = %next, seq, "optimistic toggle applied");

        let now = self.inner.clock.now();
        let result = self.inner.rows.set_task_status(id, next, now).await;

        let mut state = self.inner.lock();
        state.settle(id, seq, result.is_err());
        match result {
            Ok(()) => {
                if let Some(task) = state.find_mut(id) {
                    if task.status == next {
                        task.updated_at = Some(now);
                    }
                }
                Ok(next)
            }
            Err(err) => Err(TaskError::mutation(&err)),
        }
    }

    /// Deletes a task.
    ///
    /// The task leaves the list immediately. If the delete fails it is put
    /// back where it was.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Mutation`] if the delete fails.
    pub async fn delete(&self, id: &str) -> Result<(), TaskError> {
        let seq = {
            let mut state = self.inner.lock();
            let index = state.tasks.iter().position(|task| task.id == id);
            index.map(|index| {
                let task = state.tasks.remove(index);
                state.begin(id, PendingOp::Delete { task, index })
            })
        };
        info!(task_id = id, "deleting task");

        let result = self.inner.rows.delete_task(id).await;

        if let Some(seq) = seq {
            self.inner.lock().settle(id, seq, result.is_err());
        }
        result.map_err(|err| TaskError::mutation(&err))
    }

    /// Subscribes to changes, fetches the list, and keeps it fresh until
    /// the returned handle is unmounted or dropped.
    ///
    /// Every change event triggers a full re-fetch rather than patching the
    /// list from the event payload. The result of the initial fetch and of
    /// every re-fetch is delivered through [`MountedList::next_refresh`].
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Fetch`] if the subscription cannot be opened.
    pub async fn mount(&self) -> Result<MountedList, TaskError> {
        let mut feed = self
            .inner
            .rows
            .subscribe(&self.inner.user_id)
            .await
            .map_err(|e| TaskError::fetch(&e))?;
        info!(user_id = %self.inner.user_id, "subscribed to task changes");

        let (tx, refreshes) = mpsc::unbounded_channel();
        let _ = tx.send(self.fetch().await);

        let store = self.clone();
        let listener = tokio::spawn(async move {
            while let Some(event) = feed.next().await {
                debug!(kind = ?event.kind, task_id = %event.task_id, "change event; refetching");
                if tx.send(store.fetch().await).is_err() {
                    break;
                }
            }
            debug!("change feed closed");
        });

        Ok(MountedList { listener, refreshes })
    }
}

/// A mounted task list: the change subscription and its listener task.
///
/// Dropping the handle stops listening and releases the subscription.
pub struct MountedList {
    listener: JoinHandle<()>,
    refreshes: mpsc::UnboundedReceiver<Result<FetchOutcome, TaskError>>,
}

impl MountedList {
    /// Waits for the next fetch triggered by mounting or by a change event.
    ///
    /// Returns `None` once the change feed has closed and every pending
    /// result has been consumed.
    pub async fn next_refresh(&mut self) -> Option<Result<FetchOutcome, TaskError>> {
        self.refreshes.recv().await
    }

    /// Stops listening and waits until the subscription is released.
    pub async fn unmount(mut self) {
        self.listener.abort();
        let _ = (&mut self.listener).await;
        info!("unsubscribed from task changes");
    }
}

impl Drop for MountedList {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
