pub mod auth;
pub mod email;
pub mod reminders;
pub mod sms;
pub mod tasks;

use aws_config::SdkConfig;

/// Shared clients, constructed once at process start and passed by reference
/// into every handler. No ambient global registry.
pub struct AppState {
    pub dynamo_client: aws_sdk_dynamodb::Client,
    pub cognito_client: aws_sdk_cognitoidentityprovider::Client,
    pub ses_client: aws_sdk_sesv2::Client,
    pub sns_client: aws_sdk_sns::Client,
    pub scheduler_client: aws_sdk_scheduler::Client,
}

impl AppState {
    pub fn new(config: &SdkConfig) -> AppState {
        AppState {
            dynamo_client: aws_sdk_dynamodb::Client::new(config),
            cognito_client: aws_sdk_cognitoidentityprovider::Client::new(config),
            ses_client: aws_sdk_sesv2::Client::new(config),
            sns_client: aws_sdk_sns::Client::new(config),
            scheduler_client: aws_sdk_scheduler::Client::new(config),
        }
    }
}

pub fn table_name() -> String {
    std::env::var("TABLE_NAME").unwrap_or_else(|_| "todo".to_string())
}
