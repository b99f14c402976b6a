//! Service context bundling all port trait objects.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::adapters::live::{LiveAuthService, LiveFileSystem, LiveRowStore, RestClient, SystemClock};
use crate::adapters::memory::{MemoryAuthService, MemoryFileSystem, MemoryRowStore};
use crate::adapters::recording::{RecordingClock, RecordingRowStore};
use crate::adapters::replaying::{ReplayingClock, ReplayingRowStore};
use crate::cassette::config::CassetteConfig;
use crate::cassette::session::RecordingSession;
use crate::config::Config;
use crate::error::TaskError;
use crate::model::{NewTask, Profile, Task, TaskChanges, TaskStatus};
use crate::ports::auth::AuthService;
use crate::ports::clock::{Clock, LocalZone};
use crate::ports::filesystem::FileSystem;
use crate::ports::row_store::{ChangeFeed, RowStore, StoreFuture, TaskQuery};

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live, recording, in-memory,
/// replaying). Ports are shared so a task list can hold on to them.
pub struct ServiceContext {
    /// Clock for obtaining the current time.
    pub clock: Arc<dyn Clock>,
    /// The `tasks` and `profiles` relations.
    pub rows: Arc<dyn RowStore>,
    /// Sign-in and session verification.
    pub auth: Arc<dyn AuthService>,
    /// Filesystem for the persisted session.
    pub fs: Arc<dyn FileSystem>,
    /// Local time zone for day boundaries and date entry.
    pub zone: LocalZone,
    recording: Option<RecordingSession>,
}

impl ServiceContext {
    /// Wires explicit adapters together.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        rows: Arc<dyn RowStore>,
        auth: Arc<dyn AuthService>,
        fs: Arc<dyn FileSystem>,
        zone: LocalZone,
    ) -> Self {
        Self { clock, rows, auth, fs, zone, recording: None }
    }

    /// Creates a context talking to the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if the backend URL or key is missing.
    pub fn live(config: &Config) -> Result<Self, TaskError> {
        let (url, key) = config.backend()?;
        let rest = Arc::new(RestClient::new(url, key));
        Ok(Self::new(
            Arc::new(SystemClock),
            Arc::new(LiveRowStore::new(Arc::clone(&rest), config.poll_interval)),
            Arc::new(LiveAuthService::new(rest)),
            Arc::new(LiveFileSystem),
            config.zone,
        ))
    }

    /// Creates a live context whose clock and row-store calls are recorded
    /// to per-port cassettes in `dir`.
    ///
    /// Cassettes are written when the context is dropped or
    /// [`ServiceContext::finish_recording`] is called. This is the
    /// mechanism behind `TASKDECK_RECORD`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if the backend is not configured or the
    /// cassette directory cannot be created.
    pub fn recording(config: &Config, dir: &Path) -> Result<Self, TaskError> {
        let live = Self::live(config)?;
        let endpoint = config.url.clone().unwrap_or_default();
        let session = RecordingSession::start(dir, &endpoint).map_err(TaskError::Config)?;
        Ok(live.recorded_into(session))
    }

    /// Picks [`ServiceContext::recording`] when `TASKDECK_RECORD` is set,
    /// [`ServiceContext::live`] otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] as the chosen constructor does.
    pub fn from_config(config: &Config) -> Result<Self, TaskError> {
        match &config.record_dir {
            Some(dir) => Self::recording(config, dir),
            None => Self::live(config),
        }
    }

    /// Wraps this context's clock and row-store with recorders.
    #[must_use]
    pub fn recorded_into(mut self, session: RecordingSession) -> Self {
        info!(dir = %session.output_dir().display(), "recording port interactions");
        self.clock = Arc::new(RecordingClock::new(
            Arc::clone(&self.clock),
            Arc::clone(&session.clock),
        ));
        self.rows =
            Arc::new(RecordingRowStore::new(Arc::clone(&self.rows), Arc::clone(&session.rows)));
        self.recording = Some(session);
        self
    }

    /// Creates a context backed entirely by in-memory adapters.
    #[must_use]
    pub fn in_memory(clock: Arc<dyn Clock>, zone: LocalZone) -> Self {
        let rows = Arc::new(MemoryRowStore::with_clock(Arc::clone(&clock)));
        Self::new(
            clock,
            rows,
            Arc::new(MemoryAuthService::new()),
            Arc::new(MemoryFileSystem::new()),
            zone,
        )
    }

    /// Creates a replaying context from per-port cassette files.
    ///
    /// Ports without a configured cassette use a panicking adapter that
    /// fails with a clear message when called. Auth and the filesystem are
    /// never recorded and use in-memory adapters.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette file cannot be read or parsed.
    pub fn replaying_from(config: &CassetteConfig, zone: LocalZone) -> Result<Self, String> {
        let replayers = config.load_all()?;
        let clock: Arc<dyn Clock> = match replayers.clock {
            Some(r) => Arc::new(ReplayingClock::new(r)),
            None => Arc::new(Unconfigured),
        };
        let rows: Arc<dyn RowStore> = match replayers.rows {
            Some(r) => Arc::new(ReplayingRowStore::new(r)),
            None => Arc::new(Unconfigured),
        };
        Ok(Self::new(
            clock,
            rows,
            Arc::new(MemoryAuthService::new()),
            Arc::new(MemoryFileSystem::new()),
            zone,
        ))
    }

    /// Writes the cassettes recorded so far. Returns the cassette directory,
    /// or `None` when this context is not recording.
    ///
    /// # Errors
    ///
    /// Returns an error if a cassette cannot be written.
    pub fn finish_recording(&self) -> Result<Option<&Path>, String> {
        self.recording.as_ref().map(RecordingSession::finish).transpose()
    }
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        if let Err(e) = self.finish_recording() {
            warn!(error = %e, "failed to write cassettes");
        }
    }
}

// --- Panicking adapter for ports without a cassette ---

struct Unconfigured;

fn unconfigured(port: &str) -> ! {
    panic!("{port} port not configured in CassetteConfig - no cassette loaded for {port}");
}

impl Clock for Unconfigured {
    fn now(&self) -> DateTime<Utc> {
        unconfigured("clock")
    }
}

impl RowStore for Unconfigured {
    fn select_tasks(&self, _query: &TaskQuery) -> StoreFuture<'_, Vec<Task>> {
        unconfigured("rows")
    }

    fn insert_task(&self, _task: &NewTask) -> StoreFuture<'_, Task> {
        unconfigured("rows")
    }

    fn update_task(&self, _id: &str, _changes: &TaskChanges) -> StoreFuture<'_, Task> {
        unconfigured("rows")
    }

    fn set_task_status(
        &self,
        _id: &str,
        _status: TaskStatus,
        _updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, ()> {
        unconfigured("rows")
    }

    fn delete_task(&self, _id: &str) -> StoreFuture<'_, ()> {
        unconfigured("rows")
    }

    fn subscribe(&self, _user_id: &str) -> StoreFuture<'_, ChangeFeed> {
        unconfigured("rows")
    }

    fn select_profile(&self, _id: &str) -> StoreFuture<'_, Option<Profile>> {
        unconfigured("rows")
    }

    fn upsert_profile(&self, _profile: &Profile) -> StoreFuture<'_, Profile> {
        unconfigured("rows")
    }
}
