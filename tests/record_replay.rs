//! Record-replay round-trip integration test.
//!
//! Proves that the record/replay system works end-to-end:
//! 1. Run a task list session on in-memory adapters while recording the
//!    clock and row-store to per-port cassettes.
//! 2. Replay the same session from those cassettes alone.
//! 3. Assert identical outputs between recording and replaying.
//! 4. Replay a second time and assert determinism.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;

use taskdeck::adapters::memory::ManualClock;
use taskdeck::cassette::config::{CassetteConfig, CLOCK_CASSETTE, ROWS_CASSETTE};
use taskdeck::cassette::recorder::CassetteRecorder;
use taskdeck::cassette::session::RecordingSession;
use taskdeck::context::ServiceContext;
use taskdeck::error::TaskError;
use taskdeck::model::{Priority, Task, TaskStatus};
use taskdeck::ports::LocalZone;
use taskdeck::tasks::{FilterState, TaskForm, TaskStore};

const USER: &str = "user-42";

fn utc() -> LocalZone {
    LocalZone::utc()
}

fn fresh_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("taskdeck_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// What a session observed, for comparison across runs.
#[derive(Debug, PartialEq)]
struct Observed {
    created: Task,
    toggled_to: TaskStatus,
    listed: Vec<Task>,
    now: String,
}

/// Creates a task, toggles it and lists the result.
async fn exercise(ctx: &ServiceContext) -> Observed {
    let store = TaskStore::from_context(ctx, USER, FilterState::default());
    let mut form = TaskForm::new();
    form.title = "Water plants".into();
    form.priority = Priority::High;
    let created = store.create(&mut form).await.unwrap();
    store.fetch().await.unwrap();
    let toggled_to = store.toggle_status(&created.id).await.unwrap();
    store.fetch().await.unwrap();
    Observed { created, toggled_to, listed: store.tasks(), now: ctx.clock.now().to_rfc3339() }
}

#[tokio::test]
async fn record_then_replay_produces_identical_outputs() {
    let dir = fresh_dir("record_replay");

    // --- Phase 1: Record ---
    let recorded = {
        let start = Utc.with_ymd_and_hms(2025, 3, 15, 14, 30, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let session = RecordingSession::start(&dir, "memory").unwrap();
        let ctx = ServiceContext::in_memory(clock, utc()).recorded_into(session);
        let observed = exercise(&ctx).await;
        let written = ctx.finish_recording().unwrap();
        assert_eq!(written, Some(dir.as_path()));
        observed
    };
    assert_eq!(recorded.toggled_to, TaskStatus::Completed);
    assert_eq!(recorded.listed[0].status, TaskStatus::Completed);
    assert!(dir.join(CLOCK_CASSETTE).exists());
    assert!(dir.join(ROWS_CASSETTE).exists());

    // --- Phase 2: Replay ---
    let config = CassetteConfig::in_dir(&dir);
    let replay = ServiceContext::replaying_from(&config, utc()).unwrap();
    assert_eq!(exercise(&replay).await, recorded);

    // --- Phase 3: Replay again, same answers ---
    let again = ServiceContext::replaying_from(&config, utc()).unwrap();
    assert_eq!(exercise(&again).await, recorded);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn recorded_failure_replays_as_the_same_error() {
    let dir = fresh_dir("replay_failure");
    let rows_path = dir.join(ROWS_CASSETTE);

    let mut recorder = CassetteRecorder::new(&rows_path, "failure", "https://project.example");
    recorder.record(
        "rows",
        "select_tasks",
        json!({"user_id": USER}),
        json!({"Err": {"message": "JWT expired", "status": 401}}),
    );
    recorder.write().unwrap();

    let mut clock = CassetteRecorder::new(dir.join(CLOCK_CASSETTE), "failure", "");
    clock.record("clock", "now", json!({}), json!("2025-03-15T14:30:00Z"));
    clock.write().unwrap();

    let replay = ServiceContext::replaying_from(&CassetteConfig::in_dir(&dir), utc()).unwrap();
    let store = TaskStore::from_context(&replay, USER, FilterState::default());
    assert_eq!(store.fetch().await.unwrap_err(), TaskError::Fetch("JWT expired".into()));
    assert!(store.tasks().is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_cassette_file_is_reported() {
    let config = CassetteConfig {
        clock: None,
        rows: Some(Path::new("/nonexistent/rows.cassette.yaml").to_path_buf()),
    };
    assert!(ServiceContext::replaying_from(&config, utc()).is_err());
}
