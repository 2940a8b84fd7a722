use lambda_http::{
    http::{HeaderValue, Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use std::env;
use std::sync::Arc;

use todo_atoms::error::TaskError;
use todo_atoms::tasks::{CreateTaskPayload, UpdateTaskPayload};
use todo_atoms::users::store as user_store;
use todo_shared::tasks::{self, TaskListFilter};
use todo_shared::{auth, table_name, AppState};

fn with_cors_headers(mut resp: Response<Body>) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,PATCH,DELETE,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type,Authorization"),
    );
    resp
}

fn finalize_response(resp: Result<Response<Body>, Error>) -> Result<Response<Body>, Error> {
    resp.map(with_cors_headers)
}

fn json_response(status: StatusCode, body: String) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body.into())
        .map_err(Box::new)?)
}

fn error_json(status: StatusCode, message: &str) -> Result<Response<Body>, Error> {
    json_response(status, serde_json::json!({ "error": message }).to_string())
}

fn not_found() -> Result<Response<Body>, Error> {
    error_json(StatusCode::NOT_FOUND, "Not found")
}

fn method_not_allowed() -> Result<Response<Body>, Error> {
    error_json(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Map the domain error taxonomy onto HTTP statuses. Callers branch on the
/// variant; message text is display-only.
fn task_error_response(err: TaskError) -> Result<Response<Body>, Error> {
    match err {
        TaskError::NotFound => error_json(StatusCode::NOT_FOUND, "Task not found"),
        TaskError::Validation(msg) => error_json(StatusCode::BAD_REQUEST, &msg),
        TaskError::AlreadyProcessed => error_json(StatusCode::CONFLICT, "Reminder already sent"),
        TaskError::Dependency(msg) => {
            tracing::error!("Dependency failure: {}", msg);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

/// Main Lambda handler - routes requests to auth, user and task endpoints.
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method().clone();
    let path = event.uri().path().to_string();
    let body = event.body();
    tracing::info!("API invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == Method::OPTIONS {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp));
    }

    let table = table_name();
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    // Auth endpoints (no token required)
    if path.starts_with("/auth") {
        let client_id = env::var("COGNITO_CLIENT_ID").expect("COGNITO_CLIENT_ID must be set");
        let client_secret =
            env::var("COGNITO_CLIENT_SECRET").expect("COGNITO_CLIENT_SECRET must be set");

        return match (&method, parts.as_slice()) {
            (&Method::POST, ["auth", "register"]) => finalize_response(
                auth::register(
                    &state.cognito_client,
                    &state.dynamo_client,
                    &table,
                    &client_id,
                    &client_secret,
                    body,
                )
                .await,
            ),
            (&Method::POST, ["auth", "login"]) => finalize_response(
                auth::login(&state.cognito_client, &client_id, &client_secret, body).await,
            ),
            (_, ["auth", "register" | "login"]) => finalize_response(method_not_allowed()),
            _ => finalize_response(not_found()),
        };
    }

    // Everything below requires a valid bearer token.
    let identity = match auth::authenticate_request(&state.cognito_client, event.headers()).await {
        Ok(identity) => identity,
        Err(resp) => return Ok(with_cors_headers(resp)),
    };

    if path.starts_with("/users") {
        let resp = match (&method, parts.as_slice()) {
            (&Method::GET, ["users", "me"]) => {
                match user_store::get_user(&state.dynamo_client, &table, &identity.user_id).await {
                    Ok(user) => json_response(StatusCode::OK, serde_json::to_string(&user)?),
                    Err(TaskError::NotFound) => error_json(StatusCode::NOT_FOUND, "User not found"),
                    Err(e) => task_error_response(e),
                }
            }
            _ => not_found(),
        };
        return finalize_response(resp);
    }

    if path.starts_with("/tasks") {
        let resp = match (&method, parts.as_slice()) {
            // POST /tasks - create task
            (&Method::POST, ["tasks"]) => {
                let payload: CreateTaskPayload = match serde_json::from_slice(body) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!("Malformed create task request: {}", e);
                        return finalize_response(error_json(
                            StatusCode::BAD_REQUEST,
                            "Invalid request body",
                        ));
                    }
                };
                match tasks::create_task(&state, &table, &identity, payload).await {
                    Ok(task) => json_response(StatusCode::CREATED, serde_json::to_string(&task)?),
                    Err(e) => task_error_response(e),
                }
            }

            // GET /tasks - list with optional status/priority/overdue filters
            (&Method::GET, ["tasks"]) => {
                let params = event.query_string_parameters();
                let overdue = params
                    .first("overdue")
                    .map(|v| v.eq_ignore_ascii_case("true"))
                    .unwrap_or(false);
                let include_stats = params
                    .first("include_stats")
                    .map(|v| v.eq_ignore_ascii_case("true"))
                    .unwrap_or(false);

                let filter = match TaskListFilter::from_query(
                    params.first("status"),
                    params.first("priority"),
                    overdue,
                ) {
                    Ok(filter) => filter,
                    Err(e) => return finalize_response(task_error_response(e)),
                };

                match tasks::list_tasks(&state, &table, &identity, filter).await {
                    Ok(found) => {
                        let count = found.len();
                        let mut response = serde_json::json!({
                            "tasks": found,
                            "count": count,
                        });
                        if include_stats {
                            match tasks::task_stats(&state, &table, &identity).await {
                                Ok(stats) => {
                                    response["statistics"] = serde_json::to_value(stats)?;
                                }
                                Err(e) => return finalize_response(task_error_response(e)),
                            }
                        }
                        json_response(StatusCode::OK, response.to_string())
                    }
                    Err(e) => task_error_response(e),
                }
            }

            // GET /tasks/stats - counts over the visible set
            (&Method::GET, ["tasks", "stats"]) => {
                match tasks::task_stats(&state, &table, &identity).await {
                    Ok(stats) => json_response(StatusCode::OK, serde_json::to_string(&stats)?),
                    Err(e) => task_error_response(e),
                }
            }

            // GET /tasks/{id} - get one task
            (&Method::GET, ["tasks", task_id]) => {
                match tasks::get_task(&state, &table, &identity, task_id).await {
                    Ok(task) => json_response(StatusCode::OK, serde_json::to_string(&task)?),
                    Err(e) => task_error_response(e),
                }
            }

            // PATCH /tasks/{id} - partial update
            (&Method::PATCH, ["tasks", task_id]) => {
                let patch: UpdateTaskPayload = match serde_json::from_slice(body) {
                    Ok(patch) => patch,
                    Err(e) => {
                        tracing::warn!("Malformed update task request: {}", e);
                        return finalize_response(error_json(
                            StatusCode::BAD_REQUEST,
                            "Invalid request body",
                        ));
                    }
                };
                match tasks::update_task(&state, &table, &identity, task_id, patch).await {
                    Ok(task) => json_response(StatusCode::OK, serde_json::to_string(&task)?),
                    Err(e) => task_error_response(e),
                }
            }

            // DELETE /tasks/{id} - soft delete
            (&Method::DELETE, ["tasks", task_id]) => {
                match tasks::delete_task(&state, &table, &identity, task_id).await {
                    Ok(()) => json_response(
                        StatusCode::OK,
                        serde_json::json!({ "message": "Task deleted successfully" }).to_string(),
                    ),
                    Err(e) => task_error_response(e),
                }
            }

            _ => not_found(),
        };
        return finalize_response(resp);
    }

    tracing::warn!("No route matched - Method: {} Path: {}", method, path);
    finalize_response(not_found())
}
