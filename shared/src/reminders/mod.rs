pub mod dispatch;
pub mod messages;
pub mod scheduler;

use serde::{Deserialize, Serialize};
use todo_atoms::tasks::ReminderType;

/// Input carried by a scheduled trigger, sized so the dispatch handler can
/// act without re-querying the task for addressing info. `owner_id` is
/// required because the store is partitioned per owner; a bare task_id
/// cannot be resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderPayload {
    pub task_id: String,
    pub owner_id: String,
    pub reminder_type: ReminderType,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl ReminderPayload {
    /// Channel addressing requirement: EMAIL needs a non-empty address, SMS
    /// a non-empty phone number, ALARM nothing.
    pub fn addressing_error(&self) -> Option<&'static str> {
        match self.reminder_type {
            ReminderType::Email if self.email.as_deref().unwrap_or("").is_empty() => {
                Some("no email address for EMAIL reminder")
            }
            ReminderType::Sms if self.phone_number.as_deref().unwrap_or("").is_empty() => {
                Some("no phone number for SMS reminder")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sms_payload_without_phone_is_rejected() {
        let payload = ReminderPayload {
            task_id: "t-1".to_string(),
            owner_id: "u-1".to_string(),
            reminder_type: ReminderType::Sms,
            email: Some("ada@example.com".to_string()),
            phone_number: None,
        };
        assert!(payload.addressing_error().is_some());
    }

    #[test]
    fn alarm_payload_needs_no_addressing() {
        let payload = ReminderPayload {
            task_id: "t-1".to_string(),
            owner_id: "u-1".to_string(),
            reminder_type: ReminderType::Alarm,
            email: None,
            phone_number: None,
        };
        assert!(payload.addressing_error().is_none());
    }

    #[test]
    fn payload_uses_snake_case_wire_names() {
        let payload = ReminderPayload {
            task_id: "t-1".to_string(),
            owner_id: "u-1".to_string(),
            reminder_type: ReminderType::Email,
            email: Some("ada@example.com".to_string()),
            phone_number: None,
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&payload).unwrap()).unwrap();
        assert_eq!(json["task_id"], "t-1");
        assert_eq!(json["owner_id"], "u-1");
        assert_eq!(json["reminder_type"], "EMAIL");
        assert_eq!(json["email"], "ada@example.com");
    }

    #[test]
    fn payload_missing_required_fields_fails_to_parse() {
        let err = serde_json::from_str::<ReminderPayload>(r#"{"task_id": "t-1"}"#);
        assert!(err.is_err());
    }
}
