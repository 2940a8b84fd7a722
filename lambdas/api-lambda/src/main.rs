use lambda_http::{run, service_fn, Error};
use std::sync::Arc;
use todo_shared::AppState;

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_http::tracing::init_default_subscriber();

    // Clients are built once here and shared across invocations.
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let state = Arc::new(AppState::new(&config));

    run(service_fn(move |event| {
        let state = state.clone();
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
