use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

use super::model::{Task, TaskPriority, TaskStats, TaskStatus};
use crate::error::TaskError;

const USER_PREFIX: &str = "USER#";
const TASK_PREFIX: &str = "TASK#";

fn task_pk(owner_id: &str) -> String {
    format!("{USER_PREFIX}{owner_id}")
}

fn task_sk(task_id: &str) -> String {
    format!("{TASK_PREFIX}{task_id}")
}

/// Flatten a task into a DynamoDB item. Full overwrite on every save;
/// last-writer-wins, no version attribute.
fn task_to_item(task: &Task) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert("PK".to_string(), AttributeValue::S(task_pk(&task.owner_id)));
    item.insert("SK".to_string(), AttributeValue::S(task_sk(&task.task_id)));
    item.insert("title".to_string(), AttributeValue::S(task.title.clone()));
    item.insert(
        "status".to_string(),
        AttributeValue::S(task.status.to_string()),
    );
    item.insert(
        "priority".to_string(),
        AttributeValue::S(task.priority.to_string()),
    );
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(task.created_at.to_rfc3339()),
    );
    item.insert(
        "updated_at".to_string(),
        AttributeValue::S(task.updated_at.to_rfc3339()),
    );
    item.insert(
        "is_deleted".to_string(),
        AttributeValue::Bool(task.is_deleted),
    );
    item.insert(
        "reminder_sent".to_string(),
        AttributeValue::Bool(task.reminder_sent),
    );

    if let Some(description) = &task.description {
        item.insert(
            "description".to_string(),
            AttributeValue::S(description.clone()),
        );
    }
    if let Some(due_date) = task.due_date {
        item.insert(
            "due_date".to_string(),
            AttributeValue::S(due_date.to_string()),
        );
    }
    if let Some(reminder_type) = task.reminder_type {
        item.insert(
            "reminder_type".to_string(),
            AttributeValue::S(reminder_type.to_string()),
        );
    }
    if let Some(reminder_time) = task.reminder_time {
        item.insert(
            "reminder_time".to_string(),
            AttributeValue::S(reminder_time.to_rfc3339()),
        );
    }
    if let Some(phone_number) = &task.phone_number {
        item.insert(
            "phone_number".to_string(),
            AttributeValue::S(phone_number.clone()),
        );
    }
    item
}

fn attr_s(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
}

fn attr_bool(item: &HashMap<String, AttributeValue>, name: &str) -> bool {
    item.get(name)
        .and_then(|v| v.as_bool().ok())
        .copied()
        .unwrap_or(false)
}

fn attr_datetime(item: &HashMap<String, AttributeValue>, name: &str) -> Option<DateTime<Utc>> {
    attr_s(item, name)
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Rebuild a task from a DynamoDB item. Identity comes from the key
/// attributes; unknown or missing enum values fall back to defaults rather
/// than dropping the record.
fn task_from_item(item: &HashMap<String, AttributeValue>) -> Option<Task> {
    let owner_id = attr_s(item, "PK")?.strip_prefix(USER_PREFIX)?.to_string();
    let task_id = attr_s(item, "SK")?.strip_prefix(TASK_PREFIX)?.to_string();

    Some(Task {
        task_id,
        owner_id,
        title: attr_s(item, "title").unwrap_or_default(),
        description: attr_s(item, "description"),
        status: attr_s(item, "status")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        priority: attr_s(item, "priority")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        due_date: attr_s(item, "due_date").and_then(|s| s.parse::<NaiveDate>().ok()),
        created_at: attr_datetime(item, "created_at").unwrap_or_default(),
        updated_at: attr_datetime(item, "updated_at").unwrap_or_default(),
        is_deleted: attr_bool(item, "is_deleted"),
        reminder_type: attr_s(item, "reminder_type").and_then(|s| s.parse().ok()),
        reminder_time: attr_datetime(item, "reminder_time"),
        phone_number: attr_s(item, "phone_number"),
        reminder_sent: attr_bool(item, "reminder_sent"),
    })
}

fn retain_visible(tasks: Vec<Task>) -> Vec<Task> {
    tasks.into_iter().filter(|t| !t.is_deleted).collect()
}

/// Insert or fully overwrite the record at (owner_id, task_id).
pub async fn save(client: &DynamoClient, table_name: &str, task: &Task) -> Result<(), TaskError> {
    tracing::info!("Saving task {} for user {}", task.task_id, task.owner_id);

    let mut builder = client.put_item().table_name(table_name);
    for (k, v) in task_to_item(task) {
        builder = builder.item(k, v);
    }
    builder.send().await.map_err(TaskError::dependency)?;
    Ok(())
}

/// Look up one visible task. Soft-deleted records are treated identically to
/// absent ones.
pub async fn find_one(
    client: &DynamoClient,
    table_name: &str,
    owner_id: &str,
    task_id: &str,
) -> Result<Task, TaskError> {
    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(task_pk(owner_id)))
        .key("SK", AttributeValue::S(task_sk(task_id)))
        .send()
        .await
        .map_err(TaskError::dependency)?;

    let task = result
        .item()
        .and_then(task_from_item)
        .ok_or(TaskError::NotFound)?;
    if task.is_deleted {
        return Err(TaskError::NotFound);
    }
    Ok(task)
}

/// All visible tasks for an owner. Filtering happens application-side over
/// the per-owner query; fine at low task-per-user volumes.
pub async fn find_all(
    client: &DynamoClient,
    table_name: &str,
    owner_id: &str,
) -> Result<Vec<Task>, TaskError> {
    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(":pk", AttributeValue::S(task_pk(owner_id)))
        .expression_attribute_values(":sk_prefix", AttributeValue::S(TASK_PREFIX.to_string()))
        .send()
        .await
        .map_err(TaskError::dependency)?;

    let tasks = result
        .items()
        .iter()
        .filter_map(task_from_item)
        .collect();
    Ok(retain_visible(tasks))
}

pub async fn find_by_status(
    client: &DynamoClient,
    table_name: &str,
    owner_id: &str,
    status: TaskStatus,
) -> Result<Vec<Task>, TaskError> {
    let tasks = find_all(client, table_name, owner_id).await?;
    Ok(tasks.into_iter().filter(|t| t.status == status).collect())
}

pub async fn find_by_priority(
    client: &DynamoClient,
    table_name: &str,
    owner_id: &str,
    priority: TaskPriority,
) -> Result<Vec<Task>, TaskError> {
    let tasks = find_all(client, table_name, owner_id).await?;
    Ok(tasks
        .into_iter()
        .filter(|t| t.priority == priority)
        .collect())
}

/// Visible tasks that are overdue as of the caller's current date.
pub async fn find_overdue(
    client: &DynamoClient,
    table_name: &str,
    owner_id: &str,
) -> Result<Vec<Task>, TaskError> {
    let today = Utc::now().date_naive();
    let tasks = find_all(client, table_name, owner_id).await?;
    Ok(tasks
        .into_iter()
        .filter(|t| t.is_overdue(today))
        .collect())
}

/// Flag-based logical deletion; the record is retained but excluded from all
/// normal visibility. Fails with NotFound when no visible record exists.
pub async fn soft_delete(
    client: &DynamoClient,
    table_name: &str,
    owner_id: &str,
    task_id: &str,
) -> Result<(), TaskError> {
    let mut task = find_one(client, table_name, owner_id, task_id).await?;
    task.mark_deleted(Utc::now());
    save(client, table_name, &task).await?;
    tracing::info!("Task {} soft deleted for user {}", task_id, owner_id);
    Ok(())
}

/// Counts over the full visible set. Best-effort snapshot read; not
/// transactionally consistent with concurrent writes.
pub async fn stats(
    client: &DynamoClient,
    table_name: &str,
    owner_id: &str,
) -> Result<TaskStats, TaskError> {
    let tasks = find_all(client, table_name, owner_id).await?;
    Ok(TaskStats::compute(&tasks, Utc::now().date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::model::{CreateTaskPayload, ReminderType};
    use chrono::TimeZone;

    fn sample_task() -> Task {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        Task::new(
            "user-1",
            CreateTaskPayload {
                title: "Pay rent".to_string(),
                description: Some("Transfer before noon".to_string()),
                priority: Some(TaskPriority::High),
                due_date: Some(NaiveDate::from_ymd_opt(2025, 6, 20).unwrap()),
                reminder_type: Some(ReminderType::Sms),
                reminder_time: Some(now + chrono::Duration::hours(3)),
                phone_number: Some("+15550100".to_string()),
            },
            now,
        )
        .unwrap()
    }

    #[test]
    fn item_mapping_round_trips_every_field() {
        let task = sample_task();
        let restored = task_from_item(&task_to_item(&task)).unwrap();

        assert_eq!(restored.task_id, task.task_id);
        assert_eq!(restored.owner_id, "user-1");
        assert_eq!(restored.title, task.title);
        assert_eq!(restored.description, task.description);
        assert_eq!(restored.status, task.status);
        assert_eq!(restored.priority, task.priority);
        assert_eq!(restored.due_date, task.due_date);
        assert_eq!(restored.created_at, task.created_at);
        assert_eq!(restored.updated_at, task.updated_at);
        assert_eq!(restored.is_deleted, task.is_deleted);
        assert_eq!(restored.reminder_type, task.reminder_type);
        assert_eq!(restored.reminder_time, task.reminder_time);
        assert_eq!(restored.phone_number, task.phone_number);
        assert_eq!(restored.reminder_sent, task.reminder_sent);
    }

    #[test]
    fn item_mapping_handles_absent_optionals() {
        let mut task = sample_task();
        task.description = None;
        task.due_date = None;
        task.reminder_type = None;
        task.reminder_time = None;
        task.phone_number = None;

        let item = task_to_item(&task);
        assert!(!item.contains_key("description"));
        assert!(!item.contains_key("reminder_type"));

        let restored = task_from_item(&item).unwrap();
        assert!(restored.description.is_none());
        assert!(restored.reminder_type.is_none());
        assert!(restored.reminder_time.is_none());
    }

    #[test]
    fn reminder_sent_flag_survives_the_item_mapping() {
        let mut task = sample_task();
        task.reminder_sent = true;
        let restored = task_from_item(&task_to_item(&task)).unwrap();
        assert!(restored.reminder_sent);
    }

    #[test]
    fn soft_deleted_tasks_are_filtered_from_visible_sets() {
        let mut deleted = sample_task();
        deleted.mark_deleted(Utc.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap());
        let visible = retain_visible(vec![sample_task(), deleted]);
        assert_eq!(visible.len(), 1);
        assert!(!visible[0].is_deleted);
    }

    #[test]
    fn foreign_items_are_skipped() {
        let mut item = HashMap::new();
        item.insert(
            "PK".to_string(),
            AttributeValue::S("USER#user-1".to_string()),
        );
        item.insert(
            "SK".to_string(),
            AttributeValue::S("PROFILE".to_string()),
        );
        assert!(task_from_item(&item).is_none());
    }
}
