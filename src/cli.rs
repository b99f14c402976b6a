//! CLI argument definitions.

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::model::{Priority, TaskStatus};
use crate::tasks::filter::{rewrite_query, DateFilter, FilterChange, FilterState};

/// Top-level CLI parser for `taskdeck`.
#[derive(Debug, Parser)]
#[command(name = "taskdeck", version, about = "Keep a task list in sync with your backend")]
pub struct Cli {
    /// Log more (`-v` info, `-vv` debug, `-vvv` trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Log less (`-q` warnings, `-qq` errors only).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with email and password.
    #[command(name = "signin")]
    SignIn {
        /// Account email.
        #[arg(long)]
        email: String,
        /// Account password.
        #[arg(long)]
        password: String,
    },
    /// Create an account.
    #[command(name = "signup")]
    SignUp {
        /// Account email.
        #[arg(long)]
        email: String,
        /// Password, at least 6 characters.
        #[arg(long)]
        password: String,
        /// Display name stored with the account.
        #[arg(long)]
        full_name: Option<String>,
    },
    /// Sign out and forget the stored session.
    #[command(name = "signout")]
    SignOut,
    /// Show the signed-in user.
    #[command(name = "whoami")]
    WhoAmI,
    /// Fetch and print the task list.
    List {
        /// Filter selection.
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Create a task.
    Add(AddArgs),
    /// Change a task. Unset flags keep their current value.
    Edit(EditArgs),
    /// Flip a task between completed and pending.
    Toggle {
        /// Task id or unique id prefix.
        id: String,
    },
    /// Delete a task.
    Delete {
        /// Task id or unique id prefix.
        id: String,
    },
    /// Print the task list and reprint it whenever it changes.
    Watch {
        /// Filter selection.
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Show or change the profile.
    Profile {
        /// Profile action.
        #[command(subcommand)]
        action: ProfileCommand,
    },
}

/// `taskdeck profile` subcommands.
#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Print the stored profile.
    Show,
    /// Update the profile. Unset flags keep their current value.
    Set {
        /// Display name; an empty string clears it.
        #[arg(long)]
        full_name: Option<String>,
        /// Avatar image link; an empty string clears it.
        #[arg(long)]
        avatar_url: Option<String>,
    },
}

/// Fields of `taskdeck add`.
#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// Task title.
    pub title: String,
    /// Longer description.
    #[arg(long)]
    pub description: Option<String>,
    /// Priority.
    #[arg(long, default_value_t = Priority::Medium)]
    pub priority: Priority,
    /// Due date (`YYYY-MM-DD`).
    #[arg(long)]
    pub date: Option<String>,
    /// Due time (`HH:MM`); ignored without a due date.
    #[arg(long)]
    pub time: Option<String>,
}

/// Fields of `taskdeck edit`.
#[derive(Debug, Clone, Args)]
pub struct EditArgs {
    /// Task id or unique id prefix.
    pub id: String,
    /// New title.
    #[arg(long)]
    pub title: Option<String>,
    /// New description; an empty string removes it.
    #[arg(long)]
    pub description: Option<String>,
    /// New priority.
    #[arg(long)]
    pub priority: Option<Priority>,
    /// New status.
    #[arg(long)]
    pub status: Option<TaskStatus>,
    /// New due date (`YYYY-MM-DD`).
    #[arg(long)]
    pub date: Option<String>,
    /// New due time (`HH:MM`).
    #[arg(long)]
    pub time: Option<String>,
    /// Remove the due date.
    #[arg(long, conflicts_with_all = ["date", "time"])]
    pub clear_due: bool,
}

/// Filter flags shared by `list` and `watch`.
///
/// `--filter` takes a whole query string (`status=pending&date=today`); the
/// other flags then rewrite one dimension each. Unknown values mean "all".
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Starting query string.
    #[arg(long, value_name = "QUERY", default_value = "")]
    pub filter: String,
    /// `pending`, `in-progress`, `completed` or `all`.
    #[arg(long)]
    pub status: Option<String>,
    /// `low`, `medium`, `high` or `all`.
    #[arg(long)]
    pub priority: Option<String>,
    /// `today`, `overdue` or `all`.
    #[arg(long)]
    pub date: Option<String>,
}

impl FilterArgs {
    /// The query string after applying each dimension flag.
    #[must_use]
    pub fn query(&self) -> String {
        let changes = [
            self.status.as_deref().map(|s| FilterChange::Status(s.parse().ok())),
            self.priority.as_deref().map(|p| FilterChange::Priority(p.parse().ok())),
            self.date.as_deref().map(|d| FilterChange::Date(DateFilter::parse_lenient(d))),
        ];
        changes
            .into_iter()
            .flatten()
            .fold(self.filter.clone(), |query, change| rewrite_query(&query, change))
    }

    /// The selected filter.
    #[must_use]
    pub fn state(&self) -> FilterState {
        FilterState::from_query(&self.query())
    }
}
