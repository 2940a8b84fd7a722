use aws_sdk_sesv2::types::{Body as EmailBody, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client as SesClient;

use todo_atoms::error::TaskError;

/// Send one email through SES. Caller supplies both HTML and plain-text
/// renderings.
pub async fn send_email(
    client: &SesClient,
    from: &str,
    to: &str,
    subject: &str,
    html_body: &str,
    text_body: &str,
) -> Result<(), TaskError> {
    let subject = Content::builder()
        .data(subject)
        .charset("UTF-8")
        .build()
        .map_err(TaskError::dependency)?;
    let html = Content::builder()
        .data(html_body)
        .charset("UTF-8")
        .build()
        .map_err(TaskError::dependency)?;
    let text = Content::builder()
        .data(text_body)
        .charset("UTF-8")
        .build()
        .map_err(TaskError::dependency)?;

    let message = Message::builder()
        .subject(subject)
        .body(EmailBody::builder().html(html).text(text).build())
        .build();

    let result = client
        .send_email()
        .from_email_address(from)
        .destination(Destination::builder().to_addresses(to).build())
        .content(EmailContent::builder().simple(message).build())
        .send()
        .await
        .map_err(TaskError::dependency)?;

    tracing::info!(
        "Email sent to {} (message id: {})",
        to,
        result.message_id().unwrap_or("unknown")
    );
    Ok(())
}
