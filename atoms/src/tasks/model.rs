use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TaskError;

pub const TITLE_MAX_LEN: usize = 200;
pub const DESCRIPTION_MAX_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TaskStatus::Pending),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "COMPLETED" => Ok(TaskStatus::Completed),
            other => Err(TaskError::validation(format!(
                "invalid status value: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(TaskPriority::Low),
            "MEDIUM" => Ok(TaskPriority::Medium),
            "HIGH" => Ok(TaskPriority::High),
            other => Err(TaskError::validation(format!(
                "invalid priority value: {other}"
            ))),
        }
    }
}

/// Delivery channel for a one-shot task reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderType {
    Email,
    Sms,
    Alarm,
}

impl ReminderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderType::Email => "EMAIL",
            ReminderType::Sms => "SMS",
            ReminderType::Alarm => "ALARM",
        }
    }

    /// Lowercase form, used in trigger names.
    pub fn slug(&self) -> &'static str {
        match self {
            ReminderType::Email => "email",
            ReminderType::Sms => "sms",
            ReminderType::Alarm => "alarm",
        }
    }
}

impl fmt::Display for ReminderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderType {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EMAIL" => Ok(ReminderType::Email),
            "SMS" => Ok(ReminderType::Sms),
            "ALARM" => Ok(ReminderType::Alarm),
            other => Err(TaskError::validation(format!(
                "invalid reminder type: {other}"
            ))),
        }
    }
}

/// Task domain model. Identity is (owner_id, task_id); owner_id is the
/// partition key, task_id the sort key within it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Task {
    pub task_id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,

    // Reminder sub-state, present only when a reminder was requested.
    pub reminder_type: Option<ReminderType>,
    pub reminder_time: Option<DateTime<Utc>>,
    pub phone_number: Option<String>,
    pub reminder_sent: bool,
}

impl Task {
    /// Build a new task from a create payload. Status starts at PENDING,
    /// priority defaults to MEDIUM.
    pub fn new(
        owner_id: &str,
        payload: CreateTaskPayload,
        now: DateTime<Utc>,
    ) -> Result<Task, TaskError> {
        let title = validate_title(&payload.title)?;
        let description = validate_description(payload.description)?;

        Ok(Task {
            task_id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title,
            description,
            status: TaskStatus::Pending,
            priority: payload.priority.unwrap_or_default(),
            due_date: payload.due_date,
            created_at: now,
            updated_at: now,
            is_deleted: false,
            reminder_type: payload.reminder_type,
            reminder_time: payload.reminder_time,
            phone_number: payload.phone_number,
            reminder_sent: false,
        })
    }

    /// Apply a partial update. Absent fields leave existing values untouched;
    /// there is no way to clear a field back to unset. `reminder_sent` is not
    /// writable through updates.
    pub fn apply_update(
        &mut self,
        patch: UpdateTaskPayload,
        now: DateTime<Utc>,
    ) -> Result<(), TaskError> {
        if let Some(title) = patch.title {
            self.title = validate_title(&title)?;
        }
        if let Some(description) = patch.description {
            self.description = validate_description(Some(description))?;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = Some(due_date);
        }
        if let Some(reminder_type) = patch.reminder_type {
            self.reminder_type = Some(reminder_type);
        }
        if let Some(reminder_time) = patch.reminder_time {
            self.reminder_time = Some(reminder_time);
        }
        if let Some(phone_number) = patch.phone_number {
            self.phone_number = Some(phone_number);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Derived predicate, never stored: not completed, has a due date, and
    /// the due date is before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != TaskStatus::Completed
            && self.due_date.map(|due| due < today).unwrap_or(false)
    }

    /// Both reminder fields are required to derive a trigger registration.
    pub fn has_reminder(&self) -> bool {
        self.reminder_type.is_some() && self.reminder_time.is_some()
    }

    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.is_deleted = true;
        self.updated_at = now;
    }
}

fn validate_title(raw: &str) -> Result<String, TaskError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(TaskError::validation("title must not be blank"));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(TaskError::validation(format!(
            "title must be at most {TITLE_MAX_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_description(raw: Option<String>) -> Result<Option<String>, TaskError> {
    match raw {
        None => Ok(None),
        Some(d) => {
            let description = d.trim().to_string();
            if description.chars().count() > DESCRIPTION_MAX_LEN {
                return Err(TaskError::validation(format!(
                    "description must be at most {DESCRIPTION_MAX_LEN} characters"
                )));
            }
            Ok(Some(description))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskPayload {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
    pub reminder_type: Option<ReminderType>,
    pub reminder_time: Option<DateTime<Utc>>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
    pub reminder_type: Option<ReminderType>,
    pub reminder_time: Option<DateTime<Utc>>,
    pub phone_number: Option<String>,
}

impl UpdateTaskPayload {
    /// True when the patch touches the reminder registration inputs.
    pub fn touches_reminder(&self) -> bool {
        self.reminder_type.is_some() || self.reminder_time.is_some() || self.phone_number.is_some()
    }
}

/// Best-effort snapshot counts over an owner's visible tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub pending_tasks: u64,
    pub in_progress_tasks: u64,
    pub overdue_tasks: u64,
}

impl TaskStats {
    pub fn compute(tasks: &[Task], today: NaiveDate) -> TaskStats {
        let mut stats = TaskStats {
            total_tasks: tasks.len() as u64,
            completed_tasks: 0,
            pending_tasks: 0,
            in_progress_tasks: 0,
            overdue_tasks: 0,
        };
        for task in tasks {
            match task.status {
                TaskStatus::Completed => stats.completed_tasks += 1,
                TaskStatus::Pending => stats.pending_tasks += 1,
                TaskStatus::InProgress => stats.in_progress_tasks += 1,
            }
            if task.is_overdue(today) {
                stats.overdue_tasks += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_payload(title: &str) -> CreateTaskPayload {
        CreateTaskPayload {
            title: title.to_string(),
            description: None,
            priority: None,
            due_date: None,
            reminder_type: None,
            reminder_time: None,
            phone_number: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(
            "in_progress".parse::<TaskStatus>().unwrap(),
            TaskStatus::InProgress
        );
        assert_eq!(
            "COMPLETED".parse::<TaskStatus>().unwrap(),
            TaskStatus::Completed
        );
        assert!(matches!(
            "done".parse::<TaskStatus>(),
            Err(TaskError::Validation(_))
        ));
    }

    #[test]
    fn priority_rejects_unknown_values() {
        assert_eq!("high".parse::<TaskPriority>().unwrap(), TaskPriority::High);
        assert!(matches!(
            "urgent".parse::<TaskPriority>(),
            Err(TaskError::Validation(_))
        ));
    }

    #[test]
    fn reminder_type_round_trips_through_serde() {
        let json = serde_json::to_string(&ReminderType::Sms).unwrap();
        assert_eq!(json, "\"SMS\"");
        let parsed: ReminderType = serde_json::from_str("\"EMAIL\"").unwrap();
        assert_eq!(parsed, ReminderType::Email);
    }

    #[test]
    fn new_task_defaults_to_pending_medium() {
        let task = Task::new("user-1", create_payload("Pay rent"), now()).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert!(!task.is_deleted);
        assert!(!task.reminder_sent);
    }

    #[test]
    fn new_task_rejects_blank_title() {
        let err = Task::new("user-1", create_payload("   "), now()).unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
    }

    #[test]
    fn new_task_rejects_oversized_fields() {
        let long_title = "x".repeat(TITLE_MAX_LEN + 1);
        assert!(Task::new("user-1", create_payload(&long_title), now()).is_err());

        let mut payload = create_payload("ok");
        payload.description = Some("y".repeat(DESCRIPTION_MAX_LEN + 1));
        assert!(Task::new("user-1", payload, now()).is_err());
    }

    #[test]
    fn completed_tasks_are_never_overdue() {
        let mut task = Task::new("user-1", create_payload("Pay rent"), now()).unwrap();
        task.due_date = Some(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        task.status = TaskStatus::Completed;
        assert!(!task.is_overdue(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()));
    }

    #[test]
    fn overdue_requires_past_due_date() {
        let mut task = Task::new("user-1", create_payload("Pay rent"), now()).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert!(!task.is_overdue(today));

        task.due_date = Some(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap());
        assert!(task.is_overdue(today));

        task.due_date = Some(today);
        assert!(!task.is_overdue(today));
    }

    #[test]
    fn update_leaves_absent_fields_untouched() {
        let mut payload = create_payload("Pay rent");
        payload.reminder_type = Some(ReminderType::Sms);
        payload.reminder_time = Some(now());
        payload.phone_number = Some("+15550100".to_string());
        let mut task = Task::new("user-1", payload, now()).unwrap();

        let patch = UpdateTaskPayload {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        };
        task.apply_update(patch, now()).unwrap();

        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.title, "Pay rent");
        assert_eq!(task.reminder_type, Some(ReminderType::Sms));
        assert_eq!(task.reminder_time, Some(now()));
        assert_eq!(task.phone_number.as_deref(), Some("+15550100"));
        assert!(!task.reminder_sent);
    }

    #[test]
    fn update_rejects_blank_title() {
        let mut task = Task::new("user-1", create_payload("Pay rent"), now()).unwrap();
        let patch = UpdateTaskPayload {
            title: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(task.apply_update(patch, now()).is_err());
        assert_eq!(task.title, "Pay rent");
    }

    #[test]
    fn stats_track_overdue_transitions() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();

        let mut payload = create_payload("Pay rent");
        payload.priority = Some(TaskPriority::High);
        payload.due_date = Some(yesterday);
        let mut task = Task::new("user-1", payload, now()).unwrap();

        let stats = TaskStats::compute(std::slice::from_ref(&task), today);
        assert_eq!(stats.total_tasks, 1);
        assert_eq!(stats.overdue_tasks, 1);
        assert_eq!(stats.pending_tasks, 1);

        task.status = TaskStatus::Completed;
        let stats = TaskStats::compute(std::slice::from_ref(&task), today);
        assert_eq!(stats.total_tasks, 1);
        assert_eq!(stats.overdue_tasks, 0);
        assert_eq!(stats.completed_tasks, 1);
    }
}
