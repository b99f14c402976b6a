//! Replaying adapter for the `RowStore` port.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::model::{NewTask, Profile, Task, TaskChanges, TaskStatus};
use crate::ports::row_store::{ChangeFeed, RowStore, StoreFuture, TaskQuery};

/// Serves recorded row-store results from a cassette.
///
/// Arguments are not compared with the recording; calls to each method are
/// answered in recorded order. Subscriptions succeed or fail as recorded
/// and never deliver events.
pub struct ReplayingRowStore {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingRowStore {
    /// Create a replaying row-store backed by the given replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }

    fn replay<T: serde::de::DeserializeOwned + Send + 'static>(
        &self,
        method: &str,
    ) -> StoreFuture<'_, T> {
        let output = next_output(&self.replayer, "rows", method);
        Box::pin(async move { replay_result(output) })
    }
}

impl RowStore for ReplayingRowStore {
    fn select_tasks(&self, _query: &TaskQuery) -> StoreFuture<'_, Vec<Task>> {
        self.replay("select_tasks")
    }

    fn insert_task(&self, _task: &NewTask) -> StoreFuture<'_, Task> {
        self.replay("insert_task")
    }

    fn update_task(&self, _id: &str, _changes: &TaskChanges) -> StoreFuture<'_, Task> {
        self.replay("update_task")
    }

    fn set_task_status(
        &self,
        _id: &str,
        _status: TaskStatus,
        _updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()> {
        self.replay("set_task_status")
    }

    fn delete_task(&self, _id: &str) -> StoreFuture<'_, ()> {
        self.replay("delete_task")
    }

    fn subscribe(&self, _user_id: &str) -> StoreFuture<'_, ChangeFeed> {
        let output = next_output(&self.replayer, "rows", "subscribe");
        Box::pin(async move { replay_result::<()>(output).map(|()| ChangeFeed::idle()) })
    }

    fn select_profile(&self, _id: &str) -> StoreFuture<'_, Option<Profile>> {
        self.replay("select_profile")
    }

    fn upsert_profile(&self, _profile: &Profile) -> StoreFuture<'_, Profile> {
        self.replay("upsert_profile")
    }
}
