//! In-memory row-store with change notification.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::trace;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{NewTask, Profile, Task, TaskChanges, TaskStatus};
use crate::ports::clock::Clock;
use crate::ports::row_store::{
    ChangeEvent, ChangeFeed, ChangeKind, RowStore, StoreFuture, TaskQuery,
};

struct Subscriber {
    user_id: String,
    events: mpsc::UnboundedSender<ChangeEvent>,
}

#[derive(Default)]
struct MemoryState {
    tasks: Vec<Task>,
    profiles: HashMap<String, Profile>,
    subscribers: HashMap<u64, Subscriber>,
    next_subscriber: u64,
    read_failures: VecDeque<StoreError>,
    write_failures: VecDeque<StoreError>,
    writes: usize,
    write_gate: Option<watch::Receiver<bool>>,
}

impl MemoryState {
    fn notify(&mut self, user_id: &str, kind: ChangeKind, task_id: &str) {
        self.subscribers.retain(|id, sub| {
            if sub.user_id != user_id {
                return true;
            }
            let event = ChangeEvent { kind, task_id: task_id.to_string() };
            let delivered = sub.events.send(event).is_ok();
            if !delivered {
                trace!(subscriber = id, "dropping closed subscriber");
            }
            delivered
        });
    }

    fn begin_write(&mut self) -> Result<(), StoreError> {
        self.writes += 1;
        self.write_failures.pop_front().map_or(Ok(()), Err)
    }

    fn begin_read(&mut self) -> Result<(), StoreError> {
        self.read_failures.pop_front().map_or(Ok(()), Err)
    }

    fn task_mut(&mut self, id: &str) -> Result<&mut Task, StoreError> {
        self.tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| StoreError::new(format!("task {id} not found")).with_status(404))
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Opens held writes when released or dropped.
#[derive(Debug)]
pub struct WriteGate {
    open: watch::Sender<bool>,
}

impl WriteGate {
    /// Lets held and future writes proceed.
    pub fn release(self) {}
}

impl Drop for WriteGate {
    fn drop(&mut self) {
        self.open.send_replace(true);
    }
}

/// Row-store kept entirely in memory.
///
/// Rows are owned per user exactly as in the hosted store, every write
/// notifies the subscribers watching the row's owner, and failures can be
/// scripted for the next read or write.
pub struct MemoryRowStore {
    state: Arc<Mutex<MemoryState>>,
    clock: Option<Arc<dyn Clock>>,
}

impl Default for MemoryRowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRowStore {
    /// An empty store stamping rows with the system time.
    #[must_use]
    pub fn new() -> Self {
        Self { state: Arc::default(), clock: None }
    }

    /// An empty store stamping rows with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { state: Arc::default(), clock: Some(clock) }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.as_ref().map_or_else(Utc::now, |clock| clock.now())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        lock(&self.state)
    }

    fn insert_row(&self, task: &NewTask) -> Task {
        let now = self.now();
        let row = Task {
            id: Uuid::new_v4().to_string(),
            user_id: task.user_id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            created_at: Some(now),
            updated_at: Some(now),
        };
        let mut state = self.lock();
        state.tasks.push(row.clone());
        state.notify(&row.user_id, ChangeKind::Insert, &row.id);
        row
    }

    /// Inserts a row directly, as another session would. Subscribers are notified.
    pub fn seed(&self, task: NewTask) -> Task {
        self.insert_row(&task)
    }

    /// Copy of one stored row.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Task> {
        self.lock().tasks.iter().find(|task| task.id == id).cloned()
    }

    /// Copy of every stored task row, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    /// Number of open change subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Number of write requests received, including rejected ones.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Makes the next read fail with `err`.
    pub fn fail_next_read(&self, err: StoreError) {
        self.lock().read_failures.push_back(err);
    }

    /// Makes the next write fail with `err`.
    pub fn fail_next_write(&self, err: StoreError) {
        self.lock().write_failures.push_back(err);
    }

    /// Holds every write until the returned gate is released.
    #[must_use]
    pub fn hold_writes(&self) -> WriteGate {
        let (open, gate) = watch::channel(false);
        self.lock().write_gate = Some(gate);
        WriteGate { open }
    }

    async fn wait_for_gate(&self) {
        let gate = self.lock().write_gate.clone();
        if let Some(mut gate) = gate {
            // A dropped sender counts as released.
            let _ = gate.wait_for(|open| *open).await;
        }
    }
}

impl RowStore for MemoryRowStore {
    fn select_tasks(&self, query: &TaskQuery) -> StoreFuture<'_, Vec<Task>> {
        let query = query.clone();
        Box::pin(async move {
            let mut state = self.lock();
            state.begin_read()?;
            let mut rows: Vec<Task> =
                state.tasks.iter().filter(|task| query.matches(task)).cloned().collect();
            query.sort(&mut rows);
            Ok(rows)
        })
    }

    fn insert_task(&self, task: &NewTask) -> StoreFuture<'_, Task> {
        let task = task.clone();
        Box::pin(async move {
            self.wait_for_gate().await;
            self.lock().begin_write()?;
            Ok(self.insert_row(&task))
        })
    }

    fn update_task(&self, id: &str, changes: &TaskChanges) -> StoreFuture<'_, Task> {
        let id = id.to_string();
        let changes = changes.clone();
        Box::pin(async move {
            self.wait_for_gate().await;
            let mut state = self.lock();
            state.begin_write()?;
            let task = state.task_mut(&id)?;
            task.apply(&changes);
            let row = task.clone();
            state.notify(&row.user_id, ChangeKind::Update, &row.id);
            Ok(row)
        })
    }

    fn set_task_status(
        &self,
        id: &str,
        status: TaskStatus,
        updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()> {
        let id = id.to_string();
        Box::pin(async move {
            self.wait_for_gate().await;
            let mut state = self.lock();
            state.begin_write()?;
            let task = state.task_mut(&id)?;
            task.status = status;
            task.updated_at = Some(updated_at);
            let owner = task.user_id.clone();
            state.notify(&owner, ChangeKind::Update, &id);
            Ok(())
        })
    }

    fn delete_task(&self, id: &str) -> StoreFuture<'_, ()> {
        let id = id.to_string();
        Box::pin(async move {
            self.wait_for_gate().await;
            let mut state = self.lock();
            state.begin_write()?;
            if let Some(index) = state.tasks.iter().position(|task| task.id == id) {
                let removed = state.tasks.remove(index);
                state.notify(&removed.user_id, ChangeKind::Delete, &removed.id);
            }
            Ok(())
        })
    }

    fn subscribe(&self, user_id: &str) -> StoreFuture<'_, ChangeFeed> {
        let user_id = user_id.to_string();
        Box::pin(async move {
            let (events, rx) = mpsc::unbounded_channel();
            let id = {
                let mut state = self.lock();
                let id = state.next_subscriber;
                state.next_subscriber += 1;
                state.subscribers.insert(id, Subscriber { user_id, events });
                id
            };
            let state = Arc::downgrade(&self.state);
            Ok(ChangeFeed::new(rx, move || {
                if let Some(state) = state.upgrade() {
                    lock(&state).subscribers.remove(&id);
                }
            }))
        })
    }

    fn select_profile(&self, id: &str) -> StoreFuture<'_, Option<Profile>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut state = self.lock();
            state.begin_read()?;
            Ok(state.profiles.get(&id).cloned())
        })
    }

    fn upsert_profile(&self, profile: &Profile) -> StoreFuture<'_, Profile> {
        let profile = profile.clone();
        Box::pin(async move {
            self.wait_for_gate().await;
            let mut state = self.lock();
            state.begin_write()?;
            state.profiles.insert(profile.id.clone(), profile.clone());
            Ok(profile)
        })
    }
}
