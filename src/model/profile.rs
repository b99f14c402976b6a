//! User profile row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `profiles` relation, keyed by the owning user's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Same value as the user id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Link to an avatar image.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Last save time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Upper-cased first character of each word of `name`.
#[must_use]
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}
