//! The signed-in user's profile row.

use std::sync::Arc;

use tracing::info;

use crate::context::ServiceContext;
use crate::error::TaskError;
use crate::model::Profile;
use crate::ports::clock::Clock;
use crate::ports::row_store::RowStore;

/// Editable profile fields. Blank fields are stored as null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    /// Display name.
    pub full_name: String,
    /// Avatar image link.
    pub avatar_url: String,
}

impl ProfileForm {
    /// Pre-fills the form from a stored profile, or leaves it empty.
    #[must_use]
    pub fn from_profile(profile: Option<&Profile>) -> Self {
        let field = |value: Option<&String>| value.cloned().unwrap_or_default();
        profile.map_or_else(Self::default, |p| Self {
            full_name: field(p.full_name.as_ref()),
            avatar_url: field(p.avatar_url.as_ref()),
        })
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Loads and saves profiles.
pub struct ProfileService {
    rows: Arc<dyn RowStore>,
    clock: Arc<dyn Clock>,
}

impl ProfileService {
    /// Creates a service over the ports of `ctx`.
    #[must_use]
    pub fn new(ctx: &ServiceContext) -> Self {
        Self { rows: Arc::clone(&ctx.rows), clock: Arc::clone(&ctx.clock) }
    }

    /// The profile of `user_id`; `None` if it was never saved.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Fetch`] if the read fails.
    pub async fn load(&self, user_id: &str) -> Result<Option<Profile>, TaskError> {
        self.rows.select_profile(user_id).await.map_err(|e| TaskError::fetch(&e))
    }

    /// Upserts the profile of `user_id` from `form`, stamping `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Mutation`] if the write fails.
    pub async fn save(&self, user_id: &str, form: &ProfileForm) -> Result<Profile, TaskError> {
        let profile = Profile {
            id: user_id.to_string(),
            full_name: optional(&form.full_name),
            avatar_url: optional(&form.avatar_url),
            updated_at: Some(self.clock.now()),
        };
        let saved = self.rows.upsert_profile(&profile).await.map_err(|e| TaskError::mutation(&e))?;
        info!(user = %user_id, "profile saved");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{ManualClock, MemoryRowStore};
    use crate::error::StoreError;
    use crate::ports::LocalZone;
    use chrono::{TimeZone, Utc};

    fn setup() -> (ProfileService, Arc<MemoryRowStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()));
        let rows = Arc::new(MemoryRowStore::new());
        let mut ctx = ServiceContext::in_memory(clock.clone(), LocalZone::utc());
        ctx.rows = rows.clone();
        (ProfileService::new(&ctx), rows, clock)
    }

    #[tokio::test]
    async fn missing_profile_is_none() {
        let (service, _, _) = setup();
        assert!(service.load("u-1").await.unwrap().is_none());
        assert_eq!(ProfileForm::from_profile(None), ProfileForm::default());
    }

    #[tokio::test]
    async fn save_upserts_and_stamps() {
        let (service, _, clock) = setup();
        let form =
            ProfileForm { full_name: " Ada Lovelace ".into(), avatar_url: String::new() };
        let saved = service.save("u-1", &form).await.unwrap();
        assert_eq!(saved.full_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(saved.avatar_url, None);
        assert_eq!(saved.updated_at, Some(clock.now()));

        let loaded = service.load("u-1").await.unwrap().unwrap();
        let form = ProfileForm::from_profile(Some(&loaded));
        assert_eq!(form.full_name, "Ada Lovelace");
        assert_eq!(form.avatar_url, "");
    }

    #[tokio::test]
    async fn failed_save_is_a_mutation_error() {
        let (service, rows, _) = setup();
        rows.fail_next_write(StoreError::new("new row violates row-level security policy"));
        let err = service.save("u-1", &ProfileForm::default()).await.unwrap_err();
        assert!(matches!(err, TaskError::Mutation(msg) if msg.contains("row-level security")));
    }
}
