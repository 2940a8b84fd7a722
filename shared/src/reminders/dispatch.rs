use std::env;

use todo_atoms::error::TaskError;
use todo_atoms::tasks::{store as task_store, ReminderType, Task};

use super::{messages, ReminderPayload};
use crate::{email, sms, AppState};

/// What a dispatch invocation did. `Failed` covers both missing addressing
/// and a channel send error; the reminder stays eligible for a manual resend
/// in either case.
#[derive(Debug)]
pub enum DispatchOutcome {
    Sent,
    AlreadySent,
    Failed(String),
}

/// Handle one trigger fire. The trigger mechanism delivers at-least-once, so
/// the reminder_sent check makes redelivery a no-op; it is the only
/// idempotence guard here, not a distributed lock.
pub async fn process_reminder(
    state: &AppState,
    table_name: &str,
    payload: &ReminderPayload,
) -> Result<DispatchOutcome, TaskError> {
    let mut task = task_store::find_one(
        &state.dynamo_client,
        table_name,
        &payload.owner_id,
        &payload.task_id,
    )
    .await?;

    if task.reminder_sent {
        tracing::info!("Reminder already sent for task {}", payload.task_id);
        return Ok(DispatchOutcome::AlreadySent);
    }

    if let Some(reason) = payload.addressing_error() {
        tracing::warn!(
            "Cannot dispatch {} reminder for task {}: {}",
            payload.reminder_type,
            payload.task_id,
            reason
        );
        return Ok(DispatchOutcome::Failed(reason.to_string()));
    }

    if let Err(e) = send_via_channel(state, payload, &task).await {
        tracing::warn!(
            "Failed to send {} reminder for task {}: {}",
            payload.reminder_type,
            payload.task_id,
            e
        );
        return Ok(DispatchOutcome::Failed(e.to_string()));
    }

    // false -> true exactly once; a send failure above leaves it untouched.
    task.reminder_sent = true;
    task_store::save(&state.dynamo_client, table_name, &task).await?;

    tracing::info!("Reminder dispatched for task {}", payload.task_id);
    Ok(DispatchOutcome::Sent)
}

async fn send_via_channel(
    state: &AppState,
    payload: &ReminderPayload,
    task: &Task,
) -> Result<(), TaskError> {
    match payload.reminder_type {
        ReminderType::Email => {
            let from = env::var("REMINDER_FROM_EMAIL")
                .map_err(|_| TaskError::dependency("REMINDER_FROM_EMAIL not set"))?;
            let to = payload.email.as_deref().unwrap_or_default();
            email::send_email(
                &state.ses_client,
                &from,
                to,
                &messages::email_subject(task),
                &messages::email_html_body(task),
                &messages::email_text_body(task),
            )
            .await
        }
        ReminderType::Sms => {
            let phone = payload.phone_number.as_deref().unwrap_or_default();
            sms::send_text(&state.sns_client, phone, &messages::sms_body(task)).await
        }
        ReminderType::Alarm => {
            // In-app signal only; nothing leaves the process.
            tracing::info!("Alarm reminder for task {}: {}", task.task_id, task.title);
            Ok(())
        }
    }
}
