//! Recording adapter for the `RowStore` port.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::model::{NewTask, Profile, Task, TaskChanges, TaskStatus};
use crate::ports::row_store::{ChangeFeed, RowStore, StoreFuture, TaskQuery};

/// Records row-store calls while delegating to an inner store.
///
/// Change feeds pass through untouched; only the subscription call itself
/// is recorded.
pub struct RecordingRowStore {
    inner: Arc<dyn RowStore>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingRowStore {
    /// Creates a new recording row-store wrapping the given implementation.
    pub fn new(inner: Arc<dyn RowStore>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct IdInput<'a> {
    id: &'a str,
}

#[derive(Serialize)]
struct UpdateInput<'a> {
    id: &'a str,
    changes: &'a TaskChanges,
}

#[derive(Serialize)]
struct StatusInput<'a> {
    id: &'a str,
    status: TaskStatus,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct SubscribeInput<'a> {
    user_id: &'a str,
}

impl RowStore for RecordingRowStore {
    fn select_tasks(&self, query: &TaskQuery) -> StoreFuture<'_, Vec<Task>> {
        let query = query.clone();
        Box::pin(async move {
            let result = self.inner.select_tasks(&query).await;
            record_result(&self.recorder, "rows", "select_tasks", &query, &result);
            result
        })
    }

    fn insert_task(&self, task: &NewTask) -> StoreFuture<'_, Task> {
        let task = task.clone();
        Box::pin(async move {
            let result = self.inner.insert_task(&task).await;
            record_result(&self.recorder, "rows", "insert_task", &task, &result);
            result
        })
    }

    fn update_task(&self, id: &str, changes: &TaskChanges) -> StoreFuture<'_, Task> {
        let id = id.to_string();
        let changes = changes.clone();
        Box::pin(async move {
            let result = self.inner.update_task(&id, &changes).await;
            let input = UpdateInput { id: &id, changes: &changes };
            record_result(&self.recorder, "rows", "update_task", &input, &result);
            result
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
            let result = self.inner.set_task_status(&id, status, updated_at).await;
            let input = StatusInput { id: &id, status, updated_at };
            record_result(&self.recorder, "rows", "set_task_status", &input, &result);
            result
        })
    }

    fn delete_task(&self, id: &str) -> StoreFuture<'_, ()> {
        let id = id.to_string();
        Box::pin(async move {
            let result = self.inner.delete_task(&id).await;
            record_result(&self.recorder, "rows", "delete_task", &IdInput { id: &id }, &result);
            result
        })
    }

    fn subscribe(&self, user_id: &str) -> StoreFuture<'_, ChangeFeed> {
        let user_id = user_id.to_string();
        Box::pin(async move {
            let result = self.inner.subscribe(&user_id).await;
            let recorded = result.as_ref().map(|_| ()).map_err(Clone::clone);
            let input = SubscribeInput { user_id: &user_id };
            record_result(&self.recorder, "rows", "subscribe", &input, &recorded);
            result
        })
    }

    fn select_profile(&self, id: &str) -> StoreFuture<'_, Option<Profile>> {
        let id = id.to_string();
        Box::pin(async move {
            let result = self.inner.select_profile(&id).await;
            let input = IdInput { id: &id };
            record_result(&self.recorder, "rows", "select_profile", &input, &result);
            result
        })
    }

    fn upsert_profile(&self, profile: &Profile) -> StoreFuture<'_, Profile> {
        let profile = profile.clone();
        Box::pin(async move {
            let result = self.inner.upsert_profile(&profile).await;
            record_result(&self.recorder, "rows", "upsert_profile", &profile, &result);
            result
        })
    }

    fn set_access_token(&self, token: Option<String>) {
        self.inner.set_access_token(token);
    }
}
