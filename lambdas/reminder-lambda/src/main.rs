use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use std::sync::Arc;

use todo_atoms::error::TaskError;
use todo_shared::reminders::dispatch::{self, DispatchOutcome};
use todo_shared::reminders::ReminderPayload;
use todo_shared::{table_name, AppState};

/// Entry point for scheduled trigger fires. Delivery is at-least-once, so the
/// handler must stay idempotent; dispatch guards on the reminder_sent flag.
#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::tracing::init_default_subscriber();

    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let state = Arc::new(AppState::new(&config));

    run(service_fn(move |event: LambdaEvent<Value>| {
        let state = state.clone();
        async move { handler(event, state).await }
    }))
    .await
}

async fn handler(event: LambdaEvent<Value>, state: Arc<AppState>) -> Result<String, Error> {
    tracing::info!("Processing reminder event");

    let payload: ReminderPayload = match serde_json::from_value(event.payload) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Missing required fields in reminder event: {}", e);
            return Ok("ERROR: Missing task_id, owner_id or reminder_type".to_string());
        }
    };

    let table = table_name();
    match dispatch::process_reminder(&state, &table, &payload).await {
        Ok(DispatchOutcome::Sent) => {
            tracing::info!("Reminder processed successfully for task {}", payload.task_id);
            Ok("SUCCESS: Reminder sent".to_string())
        }
        Ok(DispatchOutcome::AlreadySent) => Ok("INFO: Reminder already sent".to_string()),
        Ok(DispatchOutcome::Failed(reason)) => {
            tracing::warn!("Failed to process reminder for task {}", payload.task_id);
            Ok(format!("ERROR: Failed to send reminder: {reason}"))
        }
        Err(TaskError::NotFound) => {
            tracing::warn!("Task not found: {}", payload.task_id);
            Ok("ERROR: Task not found".to_string())
        }
        Err(e) => {
            tracing::error!("Error processing reminder: {}", e);
            Ok(format!("ERROR: {e}"))
        }
    }
}
