use chrono::Utc;

use todo_atoms::error::TaskError;
use todo_atoms::tasks::{
    store, CreateTaskPayload, Task, TaskPriority, TaskStats, TaskStatus, UpdateTaskPayload,
};

use crate::auth::Identity;
use crate::reminders::scheduler;
use crate::AppState;

/// Listing filter, parsed at the request boundary. Unrecognized enum values
/// are rejected there, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskListFilter {
    All,
    Overdue,
    Status(TaskStatus),
    Priority(TaskPriority),
}

impl TaskListFilter {
    /// Query-string precedence: overdue wins, then status, then priority.
    pub fn from_query(
        status: Option<&str>,
        priority: Option<&str>,
        overdue: bool,
    ) -> Result<TaskListFilter, TaskError> {
        if overdue {
            return Ok(TaskListFilter::Overdue);
        }
        if let Some(status) = status.map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(TaskListFilter::Status(status.parse()?));
        }
        if let Some(priority) = priority.map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(TaskListFilter::Priority(priority.parse()?));
        }
        Ok(TaskListFilter::All)
    }
}

/// Create a task for the caller and, when reminder fields are present,
/// register its trigger. Scheduling is best-effort: the task write is the
/// source of truth and a registry failure never unwinds it.
pub async fn create_task(
    state: &AppState,
    table_name: &str,
    identity: &Identity,
    payload: CreateTaskPayload,
) -> Result<Task, TaskError> {
    let task = Task::new(&identity.user_id, payload, Utc::now())?;
    tracing::info!(
        "Creating task {} for user {} with title: {}",
        task.task_id,
        identity.user_id,
        task.title
    );

    store::save(&state.dynamo_client, table_name, &task).await?;

    if task.has_reminder() {
        let scheduled = scheduler::schedule(&state.scheduler_client, &task, &identity.email).await;
        if !scheduled {
            tracing::warn!("Reminder not scheduled for task {}", task.task_id);
        }
    }

    Ok(task)
}

/// Partial update; absent fields stay untouched. When the patch touched the
/// reminder registration inputs and the reminder has not fired yet, the
/// trigger is re-registered (overwriting by name).
pub async fn update_task(
    state: &AppState,
    table_name: &str,
    identity: &Identity,
    task_id: &str,
    patch: UpdateTaskPayload,
) -> Result<Task, TaskError> {
    let mut task = store::find_one(&state.dynamo_client, table_name, &identity.user_id, task_id).await?;

    let touched_reminder = patch.touches_reminder();
    task.apply_update(patch, Utc::now())?;
    store::save(&state.dynamo_client, table_name, &task).await?;
    tracing::info!("Task {} updated for user {}", task_id, identity.user_id);

    if touched_reminder && task.has_reminder() && !task.reminder_sent {
        let scheduled = scheduler::schedule(&state.scheduler_client, &task, &identity.email).await;
        if !scheduled {
            tracing::warn!("Reminder not rescheduled for task {}", task.task_id);
        }
    }

    Ok(task)
}

pub async fn delete_task(
    state: &AppState,
    table_name: &str,
    identity: &Identity,
    task_id: &str,
) -> Result<(), TaskError> {
    store::soft_delete(&state.dynamo_client, table_name, &identity.user_id, task_id).await
}

pub async fn get_task(
    state: &AppState,
    table_name: &str,
    identity: &Identity,
    task_id: &str,
) -> Result<Task, TaskError> {
    store::find_one(&state.dynamo_client, table_name, &identity.user_id, task_id).await
}

pub async fn list_tasks(
    state: &AppState,
    table_name: &str,
    identity: &Identity,
    filter: TaskListFilter,
) -> Result<Vec<Task>, TaskError> {
    let client = &state.dynamo_client;
    match filter {
        TaskListFilter::All => store::find_all(client, table_name, &identity.user_id).await,
        TaskListFilter::Overdue => store::find_overdue(client, table_name, &identity.user_id).await,
        TaskListFilter::Status(status) => {
            store::find_by_status(client, table_name, &identity.user_id, status).await
        }
        TaskListFilter::Priority(priority) => {
            store::find_by_priority(client, table_name, &identity.user_id, priority).await
        }
    }
}

pub async fn task_stats(
    state: &AppState,
    table_name: &str,
    identity: &Identity,
) -> Result<TaskStats, TaskError> {
    store::stats(&state.dynamo_client, table_name, &identity.user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_defaults_to_all() {
        assert_eq!(
            TaskListFilter::from_query(None, None, false).unwrap(),
            TaskListFilter::All
        );
        assert_eq!(
            TaskListFilter::from_query(Some("  "), Some(""), false).unwrap(),
            TaskListFilter::All
        );
    }

    #[test]
    fn filter_overdue_takes_precedence() {
        assert_eq!(
            TaskListFilter::from_query(Some("PENDING"), Some("HIGH"), true).unwrap(),
            TaskListFilter::Overdue
        );
    }

    #[test]
    fn filter_parses_enums_case_insensitively() {
        assert_eq!(
            TaskListFilter::from_query(Some("in_progress"), None, false).unwrap(),
            TaskListFilter::Status(TaskStatus::InProgress)
        );
        assert_eq!(
            TaskListFilter::from_query(None, Some("low"), false).unwrap(),
            TaskListFilter::Priority(TaskPriority::Low)
        );
    }

    #[test]
    fn filter_rejects_unknown_values() {
        assert!(TaskListFilter::from_query(Some("DONE"), None, false).is_err());
        assert!(TaskListFilter::from_query(None, Some("URGENT"), false).is_err());
    }
}
