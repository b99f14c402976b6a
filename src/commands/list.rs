//! `taskdeck list` command.

use chrono::{DateTime, Utc};

use super::{check, report, short_id, signed_in};
use crate::cli::FilterArgs;
use crate::context::ServiceContext;
use crate::model::Task;
use crate::ports::{DayBounds, LocalZone};
use crate::session::SessionContext;
use crate::tasks::{Action, TaskStore};

/// Message printed for an empty list.
pub const EMPTY_LIST: &str = "No tasks found. Create a new task to get started!";

/// Execute the `list` command.
///
/// Fetches the signed-in user's tasks under the selected filter and prints
/// them as a table.
///
/// # Errors
///
/// Returns the error notice if nobody is signed in or the fetch fails.
pub async fn run(
    ctx: &ServiceContext,
    session: &mut SessionContext,
    filters: &FilterArgs,
) -> Result<(), String> {
    let current = check(Action::Fetch, signed_in(session).await)?;
    let store = TaskStore::from_context(ctx, current.user.id, filters.state());
    report(Action::Fetch, store.fetch().await)?;
    print!("{}", render(&store, ctx.clock.now()));
    Ok(())
}

/// The filter line followed by the task table.
pub(crate) fn render(store: &TaskStore, now: DateTime<Utc>) -> String {
    format!("Filters: {}\n{}", store.filters(), render_tasks(&store.tasks(), now, store.zone()))
}

/// Renders tasks as an aligned table.
///
/// Deadlines read "Today at HH:MM" within the current local day; past
/// deadlines of unfinished tasks are marked overdue.
#[must_use]
pub fn render_tasks(tasks: &[Task], now: DateTime<Utc>, zone: LocalZone) -> String {
    if tasks.is_empty() {
        return format!("{EMPTY_LIST}\n");
    }
    let today = DayBounds::of(zone.date_of(now), zone);

    let rows: Vec<[String; 5]> = tasks
        .iter()
        .map(|task| {
            let done = if task.status.is_completed() { "[x]" } else { "[ ]" };
            [
                short_id(&task.id),
                format!("{done} {}", task.status),
                task.priority.to_string(),
                due_label(task, today, zone),
                task.title.clone(),
            ]
        })
        .collect();

    let headers = ["ID", "STATUS", "PRIORITY", "DUE", "TITLE"];
    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }
    let dashes = widths.map(|width| "-".repeat(width));
    let mut out = table_line(headers, widths);
    out.push_str(&table_line(dashes.each_ref().map(String::as_str), widths));
    let indent: usize = widths[..4].iter().map(|width| width + 2).sum();
    for (row, task) in rows.iter().zip(tasks) {
        out.push_str(&table_line(row.each_ref().map(String::as_str), widths));
        if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
            out.push_str(&format!("{:indent$}{description}\n", ""));
        }
    }
    out.push_str(&format!("\n{} task(s)\n", tasks.len()));
    out
}

/// Pads every cell but the last to its column width.
fn table_line(cells: [&str; 5], widths: [usize; 5]) -> String {
    let mut out = String::new();
    for (cell, width) in cells.iter().zip(widths).take(cells.len() - 1) {
        out.push_str(&format!("{cell:<width$}  "));
    }
    out.push_str(cells[cells.len() - 1]);
    out.push('\n');
    out
}

fn due_label(task: &Task, today: DayBounds, zone: LocalZone) -> String {
    let Some(due) = task.due_date else {
        return "-".to_string();
    };
    let local = zone.localize(due);
    if today.contains(due) {
        return format!("Today at {}", local.format("%H:%M"));
    }
    let label = local.format("%b %-d, %Y at %H:%M").to_string();
    if due < today.start && !task.status.is_completed() {
        format!("{label} (overdue)")
    } else {
        label
    }
}
