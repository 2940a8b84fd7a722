use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::model::User;
use crate::error::TaskError;

const USER_PREFIX: &str = "USER#";
const PROFILE_SK: &str = "PROFILE";

fn user_pk(user_id: &str) -> String {
    format!("{USER_PREFIX}{user_id}")
}

fn attr_s(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
}

fn attr_datetime(item: &HashMap<String, AttributeValue>, name: &str) -> Option<DateTime<Utc>> {
    attr_s(item, name)
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn user_from_item(item: &HashMap<String, AttributeValue>) -> Option<User> {
    let user_id = attr_s(item, "PK")?.strip_prefix(USER_PREFIX)?.to_string();
    Some(User {
        user_id,
        email: attr_s(item, "email").unwrap_or_default(),
        first_name: attr_s(item, "first_name").unwrap_or_default(),
        last_name: attr_s(item, "last_name").unwrap_or_default(),
        is_active: item
            .get("is_active")
            .and_then(|v| v.as_bool().ok())
            .copied()
            .unwrap_or(true),
        created_at: attr_datetime(item, "created_at").unwrap_or_default(),
        updated_at: attr_datetime(item, "updated_at").unwrap_or_default(),
    })
}

pub async fn put_user(client: &DynamoClient, table_name: &str, user: &User) -> Result<(), TaskError> {
    tracing::info!("Saving user profile {}", user.user_id);

    client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(user_pk(&user.user_id)))
        .item("SK", AttributeValue::S(PROFILE_SK.to_string()))
        .item("email", AttributeValue::S(user.email.clone()))
        .item("first_name", AttributeValue::S(user.first_name.clone()))
        .item("last_name", AttributeValue::S(user.last_name.clone()))
        .item("is_active", AttributeValue::Bool(user.is_active))
        .item(
            "created_at",
            AttributeValue::S(user.created_at.to_rfc3339()),
        )
        .item(
            "updated_at",
            AttributeValue::S(user.updated_at.to_rfc3339()),
        )
        .send()
        .await
        .map_err(TaskError::dependency)?;
    Ok(())
}

pub async fn get_user(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
) -> Result<User, TaskError> {
    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(user_pk(user_id)))
        .key("SK", AttributeValue::S(PROFILE_SK.to_string()))
        .send()
        .await
        .map_err(TaskError::dependency)?;

    result
        .item()
        .and_then(user_from_item)
        .ok_or(TaskError::NotFound)
}

/// Email uniqueness is enforced only among active users; a deactivated
/// user's email may be reused.
pub async fn email_taken(
    client: &DynamoClient,
    table_name: &str,
    email: &str,
) -> Result<bool, TaskError> {
    let result = client
        .scan()
        .table_name(table_name)
        .filter_expression("SK = :profile AND email = :email")
        .expression_attribute_values(":profile", AttributeValue::S(PROFILE_SK.to_string()))
        .expression_attribute_values(":email", AttributeValue::S(email.to_string()))
        .send()
        .await
        .map_err(TaskError::dependency)?;

    Ok(result
        .items()
        .iter()
        .filter_map(user_from_item)
        .any(|u| u.is_active))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_item(user_id: &str, email: &str, active: bool) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();
        item.insert(
            "PK".to_string(),
            AttributeValue::S(format!("USER#{user_id}")),
        );
        item.insert("SK".to_string(), AttributeValue::S("PROFILE".to_string()));
        item.insert("email".to_string(), AttributeValue::S(email.to_string()));
        item.insert(
            "first_name".to_string(),
            AttributeValue::S("Ada".to_string()),
        );
        item.insert(
            "last_name".to_string(),
            AttributeValue::S("Lovelace".to_string()),
        );
        item.insert("is_active".to_string(), AttributeValue::Bool(active));
        item
    }

    #[test]
    fn profile_items_map_back_to_users() {
        let user = user_from_item(&profile_item("u-1", "ada@example.com", true)).unwrap();
        assert_eq!(user.user_id, "u-1");
        assert_eq!(user.email, "ada@example.com");
        assert!(user.is_active);
    }

    #[test]
    fn inactive_users_do_not_reserve_their_email() {
        let users: Vec<User> = vec![
            user_from_item(&profile_item("u-1", "ada@example.com", false)).unwrap(),
            user_from_item(&profile_item("u-2", "grace@example.com", true)).unwrap(),
        ];
        assert!(!users.iter().any(|u| u.email == "ada@example.com" && u.is_active));
        assert!(users.iter().any(|u| u.email == "grace@example.com" && u.is_active));
    }
}
