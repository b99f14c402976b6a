//! Change feed built by polling the `tasks` relation.
//!
//! The backend's realtime channel is not spoken here. Instead a background
//! task re-reads the `id,updated_at` projection of the user's rows on an
//! interval and turns each difference into a [`ChangeEvent`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::rest::RestClient;
use crate::error::StoreError;
use crate::model::TaskId;
use crate::ports::row_store::{ChangeEvent, ChangeFeed, ChangeKind};

/// Last-seen write time per row.
pub type Versions = HashMap<TaskId, Option<DateTime<Utc>>>;

#[derive(Deserialize)]
struct VersionRow {
    id: TaskId,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

async fn versions(rest: &RestClient, user_id: &str) -> Result<Versions, StoreError> {
    let request = rest
        .request(Method::GET, "/rest/v1/tasks")
        .query(&[("select", "id,updated_at".to_string()), ("user_id", format!("eq.{user_id}"))]);
    let rows: Vec<VersionRow> = rest.send_json(request).await?;
    Ok(rows.into_iter().map(|row| (row.id, row.updated_at)).collect())
}

/// Events that turn `before` into `after`, inserts first, then updates, then deletes.
#[must_use]
pub fn diff(before: &Versions, after: &Versions) -> Vec<ChangeEvent> {
    let mut inserts = Vec::new();
    let mut updates = Vec::new();
    for (id, version) in after {
        match before.get(id) {
            None => inserts.push(id.clone()),
            Some(old) if old != version => updates.push(id.clone()),
            Some(_) => {}
        }
    }
    let mut deletes: Vec<TaskId> =
        before.keys().filter(|id| !after.contains_key(*id)).cloned().collect();
    inserts.sort();
    updates.sort();
    deletes.sort();

    let tagged = |kind: ChangeKind, ids: Vec<TaskId>| {
        ids.into_iter().map(move |task_id| ChangeEvent { kind, task_id })
    };
    tagged(ChangeKind::Insert, inserts)
        .chain(tagged(ChangeKind::Update, updates))
        .chain(tagged(ChangeKind::Delete, deletes))
        .collect()
}

/// Takes an initial snapshot, then polls every `interval` until the feed is dropped.
///
/// # Errors
///
/// Returns an error if the initial snapshot cannot be read.
pub async fn subscribe(
    rest: Arc<RestClient>,
    user_id: String,
    interval: Duration,
) -> Result<ChangeFeed, StoreError> {
    let mut seen = versions(&rest, &user_id).await?;
    let (tx, rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let current = match versions(&rest, &user_id).await {
                Ok(current) => current,
                Err(e) => {
                    warn!(error = %e, "change poll failed");
                    continue;
                }
            };
            for event in diff(&seen, &current) {
                debug!(kind = ?event.kind, task = %event.task_id, "row changed");
                if tx.send(event).is_err() {
                    return;
                }
            }
            seen = current;
        }
    });

    Ok(ChangeFeed::new(rx, move || handle.abort()))
}
