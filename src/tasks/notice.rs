//! User-visible transient notifications for operation outcomes.

use std::fmt;

use super::editor::TITLE_REQUIRED;
use crate::error::TaskError;
use crate::model::TaskStatus;

/// Visual weight of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Confirmation.
    Default,
    /// Something went wrong.
    Destructive,
}

/// A short title plus a description line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Headline.
    pub title: String,
    /// Detail line; for errors this is the collaborator's message.
    pub description: String,
    /// Visual weight.
    pub variant: Variant,
}

/// The operation a notice reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Loading the task list.
    Fetch,
    /// Submitting the create form.
    Create,
    /// Submitting the edit dialog.
    Update,
    /// Toggling completion; carries the status the task moved to.
    Toggle(TaskStatus),
    /// Deleting a task.
    Delete,
    /// Signing in.
    SignIn,
    /// Registering.
    SignUp,
    /// Signing out.
    SignOut,
    /// Loading the profile.
    LoadProfile,
    /// Saving the profile.
    SaveProfile,
}

impl Notice {
    /// A confirmation notice.
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { title: title.into(), description: description.into(), variant: Variant::Default }
    }

    /// An error notice.
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: Variant::Destructive,
        }
    }

    /// Builds the notice shown after `action` finished with `result`.
    #[must_use]
    pub fn for_outcome<T>(action: Action, result: &Result<T, TaskError>) -> Self {
        match result {
            Ok(_) => Self::on_success(action),
            Err(err) => Self::for_error(action, err),
        }
    }

    fn on_success(action: Action) -> Self {
        match action {
            Action::Fetch => Self::success("Tasks loaded", "Your task list is up to date"),
            Action::Create => {
                Self::success("Task created", "Your task has been added successfully")
            }
            Action::Update => {
                Self::success("Task updated", "Your task has been updated successfully")
            }
            Action::Toggle(status) => Self::success(
                if status.is_completed() { "Task completed" } else { "Task marked as pending" },
                "Task status updated successfully",
            ),
            Action::Delete => Self::success("Task deleted", "Task has been removed successfully"),
            Action::SignIn => Self::success("Success!", "You have been signed in."),
            Action::SignUp => {
                let detail = "Please check your email to confirm your account.";
                Self::success("Account created!", detail)
            }
            Action::SignOut => Self::success("Signed out", "Your session has been cleared."),
            Action::LoadProfile => Self::success("Profile loaded", "Your profile is up to date"),
            Action::SaveProfile => {
                Self::success("Profile updated", "Your profile has been updated successfully")
            }
        }
    }

    /// Builds the notice shown after `action` failed with `err`.
    #[must_use]
    pub fn for_error(action: Action, err: &TaskError) -> Self {
        if let TaskError::Validation(msg) = err {
            let title = if msg == TITLE_REQUIRED { "Title required" } else { "Invalid input" };
            return Self::error(title, msg.clone());
        }
        if matches!(err, TaskError::Busy) {
            return Self::error("Please wait", err.detail());
        }
        let title = match action {
            Action::Fetch => "Error fetching tasks",
            Action::Create => "Error creating task",
            Action::Update | Action::Toggle(_) => "Error updating task",
            Action::Delete => "Error deleting task",
            Action::SignIn => "Error signing in",
            Action::SignUp => "Error creating account",
            Action::SignOut => "Error signing out",
            Action::LoadProfile => "Error loading profile",
            Action::SaveProfile => "Error updating profile",
        };
        Self::error(title, err.detail())
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_reads_title_required() {
        let result: Result<(), _> =
            Err(TaskError::Validation("Please enter a task title".into()));
        let notice = Notice::for_outcome(Action::Create, &result);
        assert_eq!(notice.title, "Title required");
        assert_eq!(notice.variant, Variant::Destructive);
    }

    #[test]
    fn collaborator_message_is_the_description() {
        let result: Result<(), _> =
            Err(TaskError::Fetch("permission denied for table tasks".into()));
        let notice = Notice::for_outcome(Action::Fetch, &result);
        assert_eq!(notice.title, "Error fetching tasks");
        assert_eq!(notice.description, "permission denied for table tasks");
    }

    #[test]
    fn toggle_title_follows_new_status() {
        let ok: Result<(), TaskError> = Ok(());
        assert_eq!(
            Notice::for_outcome(Action::Toggle(TaskStatus::Completed), &ok).title,
            "Task completed"
        );
        assert_eq!(
            Notice::for_outcome(Action::Toggle(TaskStatus::Pending), &ok).title,
            "Task marked as pending"
        );
    }

    #[test]
    fn session_errors_use_the_action_title() {
        let notice = Notice::for_error(Action::Delete, &TaskError::NotSignedIn);
        assert_eq!(notice.to_string(), "Error deleting task: Sign in to continue");
    }
}
