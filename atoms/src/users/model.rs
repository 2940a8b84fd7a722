use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile record. Credentials live with the identity provider; this is
/// the record the task partition key (owner_id) points back to.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        user_id: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
        now: DateTime<Utc>,
    ) -> User {
        User {
            user_id: user_id.to_string(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
