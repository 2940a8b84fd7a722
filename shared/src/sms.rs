use aws_sdk_sns::Client as SnsClient;

use todo_atoms::error::TaskError;

/// Send one text message via SNS direct publish.
pub async fn send_text(
    client: &SnsClient,
    phone_number: &str,
    body: &str,
) -> Result<(), TaskError> {
    let result = client
        .publish()
        .phone_number(phone_number)
        .message(body)
        .send()
        .await
        .map_err(TaskError::dependency)?;

    tracing::info!(
        "SMS sent to {} (message id: {})",
        phone_number,
        result.message_id().unwrap_or("unknown")
    );
    Ok(())
}
