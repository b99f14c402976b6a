//! Filter state derived from navigable query parameters.
//!
//! Three independent dimensions (status, priority, date) live in the
//! query string of the current location. Absent or unrecognized values mean
//! "all". Changing one dimension rewrites the query string and keeps every
//! other parameter as it was.

use std::fmt;

use reqwest::Url;

use crate::model::{Priority, TaskStatus};
use crate::ports::{DayBounds, TaskQuery};

/// Query parameter for the status dimension.
pub const STATUS_PARAM: &str = "status";
/// Query parameter for the priority dimension.
pub const PRIORITY_PARAM: &str = "priority";
/// Query parameter for the date dimension.
pub const DATE_PARAM: &str = "date";

const ALL: &str = "all";
const PARSE_BASE: &str = "http://localhost/";

/// Date dimension of the filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateFilter {
    /// No date restriction.
    #[default]
    All,
    /// Due within the current local day.
    Today,
    /// Due before the current local day and not completed.
    Overdue,
}

impl DateFilter {
    /// Query-string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => ALL,
            Self::Today => "today",
            Self::Overdue => "overdue",
        }
    }

    /// Reads a query-string value; anything unrecognized is [`DateFilter::All`].
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        match value {
            "today" => Self::Today,
            "overdue" => Self::Overdue,
            _ => Self::All,
        }
    }
}

/// A change to one filter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChange {
    /// Set the status dimension; `None` is "all".
    Status(Option<TaskStatus>),
    /// Set the priority dimension; `None` is "all".
    Priority(Option<Priority>),
    /// Set the date dimension.
    Date(DateFilter),
}

impl FilterChange {
    /// Query parameter name and value for this change.
    #[must_use]
    pub fn param(self) -> (&'static str, &'static str) {
        match self {
            Self::Status(status) => (STATUS_PARAM, status.map_or(ALL, TaskStatus::as_str)),
            Self::Priority(priority) => (PRIORITY_PARAM, priority.map_or(ALL, Priority::as_str)),
            Self::Date(date) => (DATE_PARAM, date.as_str()),
        }
    }
}

/// The user's current filter choices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterState {
    /// Only tasks with this status; `None` is "all".
    pub status: Option<TaskStatus>,
    /// Only tasks with this priority; `None` is "all".
    pub priority: Option<Priority>,
    /// Date restriction.
    pub date: DateFilter,
}

impl FilterState {
    /// Reads the filter from a query string such as `?status=pending&date=today`.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut state = Self::default();
        for (name, value) in query_pairs(query) {
            match name.as_str() {
                STATUS_PARAM => state.status = value.parse().ok(),
                PRIORITY_PARAM => state.priority = value.parse().ok(),
                DATE_PARAM => state.date = DateFilter::parse_lenient(&value),
                _ => {}
            }
        }
        state
    }

    /// Returns the state with one dimension changed.
    #[must_use]
    pub fn apply(mut self, change: FilterChange) -> Self {
        match change {
            FilterChange::Status(status) => self.status = status,
            FilterChange::Priority(priority) => self.priority = priority,
            FilterChange::Date(date) => self.date = date,
        }
        self
    }

    /// Renders the three dimensions as a query string.
    #[must_use]
    pub fn to_query(&self) -> String {
        [
            FilterChange::Status(self.status),
            FilterChange::Priority(self.priority),
            FilterChange::Date(self.date),
        ]
        .into_iter()
        .fold(String::new(), |query, change| rewrite_query(&query, change))
    }

    /// Builds the store read for `user_id` given the bounds of the current day.
    #[must_use]
    pub fn query(&self, user_id: &str, today: DayBounds) -> TaskQuery {
        let mut query = TaskQuery::for_user(user_id);
        query.status = self.status;
        query.priority = self.priority;
        match self.date {
            DateFilter::All => {}
            DateFilter::Today => {
                query.due_from = Some(today.start);
                query.due_before = Some(today.end);
            }
            DateFilter::Overdue => {
                query.due_before = Some(today.start);
                query.exclude_status = Some(TaskStatus::Completed);
            }
        }
        query
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status={} priority={} date={}",
            self.status.map_or(ALL, TaskStatus::as_str),
            self.priority.map_or(ALL, Priority::as_str),
            self.date.as_str()
        )
    }
}

/// Sets one filter parameter in `query`, keeping every other parameter.
#[must_use]
pub fn rewrite_query(query: &str, change: FilterChange) -> String {
    let (name, value) = change.param();
    let mut pairs = query_pairs(query);
    match pairs.iter().position(|(key, _)| key == name) {
        Some(index) => {
            pairs[index].1 = value.to_string();
            let mut seen = 0;
            pairs.retain(|(key, _)| {
                if key != name {
                    return true;
                }
                seen += 1;
                seen == 1
            });
        }
        None => pairs.push((name.to_string(), value.to_string())),
    }
    encode_pairs(&pairs)
}

fn query_pairs(query: &str) -> Vec<(String, String)> {
    let query = query.trim().trim_start_matches('?');
    Url::parse(&format!("{PARSE_BASE}?{query}"))
        .map(|url| url.query_pairs().into_owned().collect())
        .unwrap_or_default()
}

fn encode_pairs(pairs: &[(String, String)]) -> String {
    let Ok(mut url) = Url::parse(PARSE_BASE) else {
        return String::new();
    };
    url.query_pairs_mut().extend_pairs(pairs);
    url.query().unwrap_or_default().to_string()
}
