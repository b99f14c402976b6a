//! Live row-store speaking the PostgREST dialect of the hosted backend.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::Serialize;
use tracing::debug;

use super::poller;
use super::rest::RestClient;
use crate::error::StoreError;
use crate::model::{NewTask, Profile, Task, TaskChanges, TaskStatus};
use crate::ports::row_store::{ChangeFeed, DueOrder, RowStore, StoreFuture, TaskQuery};

const TASKS: &str = "/rest/v1/tasks";
const PROFILES: &str = "/rest/v1/profiles";

/// Row-store backed by the backend's REST interface.
pub struct LiveRowStore {
    rest: Arc<RestClient>,
    poll_interval: Duration,
}

impl LiveRowStore {
    /// Creates a row-store sharing `rest`; change feeds poll every `poll_interval`.
    #[must_use]
    pub fn new(rest: Arc<RestClient>, poll_interval: Duration) -> Self {
        Self { rest, poll_interval }
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Renders a [`TaskQuery`] as PostgREST query parameters.
#[must_use]
pub fn query_params(query: &TaskQuery) -> Vec<(String, String)> {
    let mut params = vec![
        ("select".to_string(), "*".to_string()),
        ("user_id".to_string(), format!("eq.{}", query.user_id)),
    ];
    if let Some(status) = query.status {
        params.push(("status".into(), format!("eq.{status}")));
    }
    if let Some(priority) = query.priority {
        params.push(("priority".into(), format!("eq.{priority}")));
    }
    // Both bounds on one column need the `and` form.
    match (query.due_from, query.due_before) {
        (Some(from), Some(before)) => params.push((
            "and".into(),
            format!("(due_date.gte.{},due_date.lt.{})", timestamp(from), timestamp(before)),
        )),
        (Some(from), None) => params.push(("due_date".into(), format!("gte.{}", timestamp(from)))),
        (None, Some(before)) => {
            params.push(("due_date".into(), format!("lt.{}", timestamp(before))));
        }
        (None, None) => {}
    }
    if let Some(excluded) = query.exclude_status {
        params.push(("status".into(), format!("neq.{excluded}")));
    }
    let order = match query.order {
        DueOrder::AscendingNullsLast => "due_date.asc.nullslast",
    };
    params.push(("order".into(), order.into()));
    params
}

fn id_filter(id: &str) -> [(&'static str, String); 1] {
    [("id", format!("eq.{id}"))]
}

fn first_row<T>(rows: Vec<T>, what: &str, id: &str) -> Result<T, StoreError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| StoreError::new(format!("{what} {id} not found")).with_status(404))
}

#[derive(Serialize)]
struct StatusPatch {
    status: TaskStatus,
    updated_at: DateTime<Utc>,
}

impl RowStore for LiveRowStore {
    fn select_tasks(&self, query: &TaskQuery) -> StoreFuture<'_, Vec<Task>> {
        let params = query_params(query);
        Box::pin(async move {
            let request = self.rest.request(Method::GET, TASKS).query(&params);
            let rows: Vec<Task> = self.rest.send_json(request).await?;
            debug!(rows = rows.len(), "selected tasks");
            Ok(rows)
        })
    }

    fn insert_task(&self, task: &NewTask) -> StoreFuture<'_, Task> {
        let task = task.clone();
        Box::pin(async move {
            let request = self
                .rest
                .request(Method::POST, TASKS)
                .header("Prefer", "return=representation")
                .json(&task);
            let rows: Vec<Task> = self.rest.send_json(request).await?;
            rows.into_iter().next().ok_or_else(|| StoreError::new("Insert returned no row"))
        })
    }

    fn update_task(&self, id: &str, changes: &TaskChanges) -> StoreFuture<'_, Task> {
        let id = id.to_string();
        let changes = changes.clone();
        Box::pin(async move {
            let request = self
                .rest
                .request(Method::PATCH, TASKS)
                .query(&id_filter(&id))
                .header("Prefer", "return=representation")
                .json(&changes);
            let rows: Vec<Task> = self.rest.send_json(request).await?;
            first_row(rows, "task", &id)
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
            let request = self
                .rest
                .request(Method::PATCH, TASKS)
                .query(&id_filter(&id))
                .header("Prefer", "return=minimal")
                .json(&StatusPatch { status, updated_at });
            self.rest.send_empty(request).await
        })
    }

    fn delete_task(&self, id: &str) -> StoreFuture<'_, ()> {
        let id = id.to_string();
        Box::pin(async move {
            let request = self.rest.request(Method::DELETE, TASKS).query(&id_filter(&id));
            self.rest.send_empty(request).await
        })
    }

    fn subscribe(&self, user_id: &str) -> StoreFuture<'_, ChangeFeed> {
        let user_id = user_id.to_string();
        Box::pin(async move {
            poller::subscribe(Arc::clone(&self.rest), user_id, self.poll_interval).await
        })
    }

    fn select_profile(&self, id: &str) -> StoreFuture<'_, Option<Profile>> {
        let id = id.to_string();
        Box::pin(async move {
            let request = self
                .rest
                .request(Method::GET, PROFILES)
                .query(&[("select", "*")])
                .query(&id_filter(&id));
            let rows: Vec<Profile> = self.rest.send_json(request).await?;
            Ok(rows.into_iter().next())
        })
    }

    fn upsert_profile(&self, profile: &Profile) -> StoreFuture<'_, Profile> {
        let profile = profile.clone();
        Box::pin(async move {
            let request = self
                .rest
                .request(Method::POST, PROFILES)
                .header("Prefer", "resolution=merge-duplicates,return=representation")
                .json(&profile);
            let rows: Vec<Profile> = self.rest.send_json(request).await?;
            first_row(rows, "profile", &profile.id)
        })
    }

    fn set_access_token(&self, token: Option<String>) {
        self.rest.set_access_token(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        params.iter().filter(|(k, _)| k == key).map(|(_, v)| v.as_str()).collect()
    }

    #[test]
    fn unfiltered_query_scopes_to_owner_and_orders() {
        let params = query_params(&TaskQuery::for_user("u-1"));
        assert_eq!(param(&params, "user_id"), ["eq.u-1"]);
        assert_eq!(param(&params, "order"), ["due_date.asc.nullslast"]);
        assert!(param(&params, "status").is_empty());
        assert!(param(&params, "due_date").is_empty());
    }

    #[test]
    fn today_window_uses_both_bounds() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let query = TaskQuery {
            due_from: Some(start),
            due_before: Some(start + chrono::Duration::days(1)),
            ..TaskQuery::for_user("u-1")
        };
        let params = query_params(&query);
        assert_eq!(
            param(&params, "and"),
            ["(due_date.gte.2025-03-01T00:00:00.000Z,due_date.lt.2025-03-02T00:00:00.000Z)"]
        );
    }

    #[test]
    fn overdue_excludes_completed() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let query = TaskQuery {
            due_before: Some(start),
            exclude_status: Some(TaskStatus::Completed),
            ..TaskQuery::for_user("u-1")
        };
        let params = query_params(&query);
        assert_eq!(param(&params, "due_date"), ["lt.2025-03-01T00:00:00.000Z"]);
        assert_eq!(param(&params, "status"), ["neq.completed"]);
    }

    #[test]
    fn equality_filters_use_wire_names() {
        let query = TaskQuery {
            status: Some(TaskStatus::InProgress),
            priority: Some(crate::model::Priority::High),
            ..TaskQuery::for_user("u-1")
        };
        let params = query_params(&query);
        assert_eq!(param(&params, "status"), ["eq.in-progress"]);
        assert_eq!(param(&params, "priority"), ["eq.high"]);
    }
}
