use aws_sdk_cognitoidentityprovider::types::{AttributeType, AuthFlowType};
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use lambda_http::http::{HeaderMap, HeaderValue, StatusCode};
use lambda_http::{Body, Error, Response};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use todo_atoms::users::{model::User, store as user_store};

/// Authenticated caller, as vouched for by the identity provider. The core
/// trusts this for all owner_id scoping and never re-verifies credentials.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub expires_in: i32,
}

/// Cognito SECRET_HASH: HMAC-SHA256 over username + client_id, keyed with the
/// app client secret, base64-encoded.
pub fn secret_hash(client_id: &str, client_secret: &str, username: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(client_secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(username.as_bytes());
    mac.update(client_id.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Pull the bearer token out of the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    let mut resp = Response::new(Body::from(
        serde_json::json!({ "error": message }).to_string(),
    ));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert("Content-Type", HeaderValue::from_static("application/json"));
    resp
}

/// Register a new user: credentials go to Cognito, the profile record goes to
/// DynamoDB. Email uniqueness is checked among active users only.
pub async fn register(
    cognito_client: &CognitoClient,
    dynamo_client: &DynamoClient,
    table_name: &str,
    client_id: &str,
    client_secret: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: RegisterPayload = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!("Malformed register request: {}", e);
            return Ok(error_response(StatusCode::BAD_REQUEST, "Invalid request body"));
        }
    };

    if user_store::email_taken(dynamo_client, table_name, &req.email)
        .await
        .map_err(Box::new)?
    {
        tracing::warn!("Registration rejected, email already in use: {}", req.email);
        return Ok(error_response(StatusCode::CONFLICT, "Email already registered"));
    }

    let signup = cognito_client
        .sign_up()
        .client_id(client_id)
        .secret_hash(secret_hash(client_id, client_secret, &req.email))
        .username(&req.email)
        .password(&req.password)
        .user_attributes(
            AttributeType::builder()
                .name("email")
                .value(&req.email)
                .build()?,
        )
        .user_attributes(
            AttributeType::builder()
                .name("given_name")
                .value(&req.first_name)
                .build()?,
        )
        .user_attributes(
            AttributeType::builder()
                .name("family_name")
                .value(&req.last_name)
                .build()?,
        )
        .send()
        .await;

    if let Err(e) = signup {
        tracing::error!("Cognito sign_up failed: {}", e);
        return Ok(error_response(StatusCode::BAD_REQUEST, "Registration failed"));
    }

    // Auto-login so the client gets a session token straight away; the
    // profile record is keyed by the user id the provider vouches for.
    let Some((token, expires_in)) =
        initiate_auth(cognito_client, client_id, client_secret, &req.email, &req.password).await
    else {
        return Ok(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Registration succeeded but login failed",
        ));
    };
    let Some(identity) = identity_from_token(cognito_client, &token).await else {
        return Ok(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Registration succeeded but login failed",
        ));
    };

    let user = User::new(
        &identity.user_id,
        &req.email,
        &req.first_name,
        &req.last_name,
        Utc::now(),
    );
    user_store::put_user(dynamo_client, table_name, &user)
        .await
        .map_err(Box::new)?;

    tracing::info!("User registered: {}", identity.user_id);

    let resp = AuthResponse {
        token,
        user_id: identity.user_id,
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        expires_in,
    };
    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("Content-Type", "application/json")
        .body(serde_json::to_string(&resp)?.into())
        .map_err(Box::new)?)
}

/// Authenticate email + password, returning a session token and profile.
pub async fn login(
    cognito_client: &CognitoClient,
    client_id: &str,
    client_secret: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: LoginPayload = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!("Malformed login request: {}", e);
            return Ok(error_response(StatusCode::BAD_REQUEST, "Invalid request body"));
        }
    };

    let Some((token, expires_in)) =
        initiate_auth(cognito_client, client_id, client_secret, &req.email, &req.password).await
    else {
        return Ok(error_response(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    };

    let Some(identity) = identity_from_token(cognito_client, &token).await else {
        return Ok(error_response(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    };

    tracing::info!("User logged in: {}", identity.user_id);

    let resp = AuthResponse {
        token,
        user_id: identity.user_id,
        email: identity.email,
        first_name: identity.first_name,
        last_name: identity.last_name,
        expires_in,
    };
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(serde_json::to_string(&resp)?.into())
        .map_err(Box::new)?)
}

/// Resolve the caller's identity from the request's bearer token, or produce
/// the 401 response to return instead.
pub async fn authenticate_request(
    cognito_client: &CognitoClient,
    headers: &HeaderMap,
) -> Result<Identity, Response<Body>> {
    let Some(token) = bearer_token(headers) else {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Missing bearer token",
        ));
    };

    match identity_from_token(cognito_client, token).await {
        Some(identity) => Ok(identity),
        None => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Invalid or expired token",
        )),
    }
}

async fn initiate_auth(
    cognito_client: &CognitoClient,
    client_id: &str,
    client_secret: &str,
    email: &str,
    password: &str,
) -> Option<(String, i32)> {
    let result = cognito_client
        .initiate_auth()
        .auth_flow(AuthFlowType::UserPasswordAuth)
        .client_id(client_id)
        .auth_parameters("USERNAME", email)
        .auth_parameters("PASSWORD", password)
        .auth_parameters("SECRET_HASH", secret_hash(client_id, client_secret, email))
        .send()
        .await;

    match result {
        Ok(out) => {
            let auth = out.authentication_result()?;
            let token = auth.access_token()?.to_string();
            Some((token, auth.expires_in()))
        }
        Err(e) => {
            tracing::warn!("Cognito initiate_auth failed: {}", e);
            None
        }
    }
}

async fn identity_from_token(cognito_client: &CognitoClient, token: &str) -> Option<Identity> {
    let user = match cognito_client.get_user().access_token(token).send().await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!("Cognito get_user failed: {}", e);
            return None;
        }
    };

    let attr = |name: &str| {
        user.user_attributes()
            .iter()
            .find(|a| a.name() == name)
            .and_then(|a| a.value())
            .unwrap_or_default()
            .to_string()
    };

    Some(Identity {
        user_id: attr("sub"),
        email: attr("email"),
        first_name: attr("given_name"),
        last_name: attr("family_name"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_hash_is_deterministic() {
        let a = secret_hash("client", "secret", "ada@example.com");
        let b = secret_hash("client", "secret", "ada@example.com");
        assert_eq!(a, b);
        assert!(!a.is_empty());
        assert_ne!(a, secret_hash("client", "secret", "grace@example.com"));
    }

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert("Authorization", HeaderValue::from_static("Basic abc123"));
        assert!(bearer_token(&headers).is_none());

        headers.insert("Authorization", HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_none());
    }
}
