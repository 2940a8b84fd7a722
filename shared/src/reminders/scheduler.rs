use aws_sdk_scheduler::types::{
    ActionAfterCompletion, FlexibleTimeWindow, FlexibleTimeWindowMode, Target,
};
use aws_sdk_scheduler::Client as SchedulerClient;
use chrono::{DateTime, Utc};
use std::env;

use todo_atoms::error::TaskError;
use todo_atoms::tasks::{ReminderType, Task};

use super::ReminderPayload;

/// Trigger names are derived from the task and channel, so there is at most
/// one live trigger per (task_id, reminder_type) pair.
pub fn trigger_name(task_id: &str, reminder_type: ReminderType) -> String {
    format!("reminder-task-{}-{}", task_id, reminder_type.slug())
}

/// One-shot EventBridge Scheduler expression for an absolute UTC timestamp.
pub fn schedule_expression(fire_at: DateTime<Utc>) -> String {
    format!("at({})", fire_at.format("%Y-%m-%dT%H:%M:%S"))
}

/// Derive the trigger payload from a task. Returns None unless both reminder
/// fields are set. EMAIL addressing comes from the owner's email; SMS from
/// the task's phone number.
pub fn build_payload(task: &Task, owner_email: &str) -> Option<ReminderPayload> {
    let reminder_type = task.reminder_type?;
    task.reminder_time?;

    Some(ReminderPayload {
        task_id: task.task_id.clone(),
        owner_id: task.owner_id.clone(),
        reminder_type,
        email: Some(owner_email.to_string()).filter(|e| !e.is_empty()),
        phone_number: task.phone_number.clone(),
    })
}

/// Register the task's one-shot trigger. Best-effort: every failure path is
/// caught and reported as `false`, so a reminder problem can never abort the
/// task write that preceded it.
pub async fn schedule(client: &SchedulerClient, task: &Task, owner_email: &str) -> bool {
    let (Some(payload), Some(fire_at)) = (build_payload(task, owner_email), task.reminder_time)
    else {
        // No reminder requested; nothing to register.
        return false;
    };

    if let Some(reason) = payload.addressing_error() {
        tracing::warn!(
            "Refusing to schedule {} reminder for task {}: {}",
            payload.reminder_type,
            task.task_id,
            reason
        );
        return false;
    }

    match register_trigger(client, &payload, fire_at).await {
        Ok(()) => {
            tracing::info!(
                "Scheduled {} reminder for task {} at {}",
                payload.reminder_type,
                task.task_id,
                fire_at.to_rfc3339()
            );
            true
        }
        Err(e) => {
            tracing::warn!("Failed to schedule reminder for task {}: {}", task.task_id, e);
            false
        }
    }
}

async fn register_trigger(
    client: &SchedulerClient,
    payload: &ReminderPayload,
    fire_at: DateTime<Utc>,
) -> Result<(), TaskError> {
    let target_arn = env::var("REMINDER_TARGET_ARN")
        .map_err(|_| TaskError::dependency("REMINDER_TARGET_ARN not set"))?;
    let role_arn = env::var("REMINDER_ROLE_ARN")
        .map_err(|_| TaskError::dependency("REMINDER_ROLE_ARN not set"))?;

    let name = trigger_name(&payload.task_id, payload.reminder_type);
    let expression = schedule_expression(fire_at);
    let input = serde_json::to_string(payload).map_err(TaskError::dependency)?;

    let window = FlexibleTimeWindow::builder()
        .mode(FlexibleTimeWindowMode::Off)
        .build()
        .map_err(TaskError::dependency)?;
    let target = Target::builder()
        .arn(&target_arn)
        .role_arn(&role_arn)
        .input(&input)
        .build()
        .map_err(TaskError::dependency)?;

    let created = client
        .create_schedule()
        .name(&name)
        .schedule_expression(&expression)
        .schedule_expression_timezone("UTC")
        .flexible_time_window(window.clone())
        .target(target.clone())
        .action_after_completion(ActionAfterCompletion::Delete)
        .send()
        .await;

    match created {
        Ok(_) => Ok(()),
        Err(err) => {
            let service_err = err.into_service_error();
            if service_err.is_conflict_exception() {
                // A trigger with this name already exists; overwrite it so
                // two schedule calls never leave two live triggers.
                client
                    .update_schedule()
                    .name(&name)
                    .schedule_expression(&expression)
                    .schedule_expression_timezone("UTC")
                    .flexible_time_window(window)
                    .target(target)
                    .action_after_completion(ActionAfterCompletion::Delete)
                    .send()
                    .await
                    .map_err(TaskError::dependency)?;
                Ok(())
            } else {
                Err(TaskError::dependency(service_err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use todo_atoms::tasks::CreateTaskPayload;

    fn task_with_reminder(reminder_type: Option<ReminderType>, time: bool) -> Task {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        Task::new(
            "user-1",
            CreateTaskPayload {
                title: "Pay rent".to_string(),
                description: None,
                priority: None,
                due_date: None,
                reminder_type,
                reminder_time: time.then_some(now + chrono::Duration::hours(2)),
                phone_number: Some("+15550100".to_string()),
            },
            now,
        )
        .unwrap()
    }

    #[test]
    fn trigger_names_are_unique_per_channel() {
        let email = trigger_name("abc", ReminderType::Email);
        let sms = trigger_name("abc", ReminderType::Sms);
        assert_eq!(email, "reminder-task-abc-email");
        assert_eq!(sms, "reminder-task-abc-sms");
        assert_ne!(email, sms);
    }

    #[test]
    fn schedule_expression_is_one_shot_utc() {
        let fire_at = Utc.with_ymd_and_hms(2025, 6, 15, 14, 30, 0).unwrap();
        assert_eq!(schedule_expression(fire_at), "at(2025-06-15T14:30:00)");
    }

    #[test]
    fn payload_requires_both_reminder_fields() {
        assert!(build_payload(&task_with_reminder(None, true), "a@b.com").is_none());
        assert!(build_payload(&task_with_reminder(Some(ReminderType::Email), false), "a@b.com").is_none());
    }

    #[test]
    fn email_payload_carries_owner_and_addressing() {
        let task = task_with_reminder(Some(ReminderType::Email), true);
        let payload = build_payload(&task, "a@b.com").unwrap();
        assert_eq!(payload.task_id, task.task_id);
        assert_eq!(payload.owner_id, "user-1");
        assert_eq!(payload.reminder_type, ReminderType::Email);
        assert_eq!(payload.email.as_deref(), Some("a@b.com"));
        assert!(payload.addressing_error().is_none());
    }

    #[test]
    fn sms_payload_without_phone_fails_addressing() {
        let mut task = task_with_reminder(Some(ReminderType::Sms), true);
        task.phone_number = None;
        let payload = build_payload(&task, "a@b.com").unwrap();
        assert!(payload.addressing_error().is_some());
    }
}
