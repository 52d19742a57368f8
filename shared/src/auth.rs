use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub email: String,
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct SetPasswordRequest {
    pub new_password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i32,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

type HmacSha256 = Hmac<Sha256>;

/// Compute the SECRET_HASH for Cognito authentication
pub(crate) fn compute_secret_hash(username: &str, client_id: &str, client_secret: &str) -> String {
    let message = format!("{}{}", username, client_id);
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    let result = mac.finalize();
    general_purpose::STANDARD.encode(result.into_bytes())
}

fn error_response(status: StatusCode, error: &str, message: String) -> Result<Response<Body>, Error> {
    let body = ErrorResponse {
        error: error.to_string(),
        message,
    };
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&body)?.into())
        .map_err(Box::new)?)
}

fn body_str(body: &Body) -> &str {
    match body {
        Body::Text(text) => text,
        Body::Binary(bytes) => std::str::from_utf8(bytes).unwrap_or(""),
        Body::Empty => "",
    }
}

fn tokens_response(
    auth_result: &aws_sdk_cognitoidentityprovider::types::AuthenticationResultType,
) -> Result<Response<Body>, Error> {
    let login_response = LoginResponse {
        id_token: auth_result.id_token().unwrap_or_default().to_string(),
        access_token: auth_result.access_token().unwrap_or_default().to_string(),
        refresh_token: auth_result.refresh_token().unwrap_or_default().to_string(),
        expires_in: auth_result.expires_in(),
    };

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&login_response)?.into())
        .map_err(Box::new)?)
}

/// Handle user login with Cognito
pub async fn login(
    cognito_client: &CognitoClient,
    client_id: &str,
    client_secret: &str,
    body: &Body,
) -> Result<Response<Body>, Error> {
    tracing::info!("Login request received");

    let login_request: LoginRequest = match serde_json::from_str(body_str(body)) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!("Failed to parse request body: {}", e);
            return error_response(
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                format!("Invalid request body: {}", e),
            );
        }
    };

    tracing::info!("Authenticating user: {}", login_request.email);

    let secret_hash = compute_secret_hash(&login_request.email, client_id, client_secret);

    let auth_result = cognito_client
        .initiate_auth()
        .auth_flow(aws_sdk_cognitoidentityprovider::types::AuthFlowType::UserPasswordAuth)
        .client_id(client_id)
        .auth_parameters("USERNAME", &login_request.email)
        .auth_parameters("PASSWORD", &login_request.password)
        .auth_parameters("SECRET_HASH", &secret_hash)
        .send()
        .await;

    match auth_result {
        Ok(response) => {
            if let Some(auth_result) = response.authentication_result() {
                tracing::info!("Authentication successful for user: {}", login_request.email);
                tokens_response(auth_result)
            } else {
                tracing::error!("No authentication result returned");
                error_response(
                    StatusCode::UNAUTHORIZED,
                    "AuthenticationFailed",
                    "No authentication result returned".to_string(),
                )
            }
        }
        Err(e) => {
            let error_message = format!("{:?}", e);
            tracing::error!("Cognito authentication error: {}", error_message);

            // Extract user-friendly error message
            let user_message = if error_message.contains("NotAuthorizedException") {
                "Incorrect email or password".to_string()
            } else if error_message.contains("UserNotConfirmedException") {
                "Please verify your email before logging in".to_string()
            } else if error_message.contains("UserNotFoundException") {
                "No account found with this email".to_string()
            } else if error_message.contains("PasswordResetRequiredException") {
                "Password reset required".to_string()
            } else if error_message.contains("TooManyRequestsException") {
                "Too many login attempts. Please try again later".to_string()
            } else {
                "Login failed. Please check your credentials".to_string()
            };

            error_response(StatusCode::UNAUTHORIZED, "AuthenticationFailed", user_message)
        }
    }
}

/// Exchange a refresh token for fresh id/access tokens
pub async fn refresh_token(
    cognito_client: &CognitoClient,
    client_id: &str,
    client_secret: &str,
    body: &Body,
) -> Result<Response<Body>, Error> {
    let refresh_request: RefreshRequest = match serde_json::from_str(body_str(body)) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!("Failed to parse request body: {}", e);
            return error_response(
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                format!("Invalid request body: {}", e),
            );
        }
    };

    let secret_hash = compute_secret_hash(&refresh_request.email, client_id, client_secret);

    let auth_result = cognito_client
        .initiate_auth()
        .auth_flow(aws_sdk_cognitoidentityprovider::types::AuthFlowType::RefreshTokenAuth)
        .client_id(client_id)
        .auth_parameters("REFRESH_TOKEN", &refresh_request.refresh_token)
        .auth_parameters("SECRET_HASH", &secret_hash)
        .send()
        .await;

    match auth_result {
        Ok(response) => {
            if let Some(auth_result) = response.authentication_result() {
                tokens_response(auth_result)
            } else {
                error_response(
                    StatusCode::UNAUTHORIZED,
                    "RefreshFailed",
                    "No authentication result returned".to_string(),
                )
            }
        }
        Err(e) => {
            let error_message = format!("{:?}", e);
            tracing::error!("Cognito refresh error: {}", error_message);
            error_response(
                StatusCode::UNAUTHORIZED,
                "RefreshFailed",
                "Session expired. Please log in again".to_string(),
            )
        }
    }
}

/// Set a new password for the authenticated user.
///
/// The profile screen collects only the new password, so this goes through
/// `admin_set_user_password` (permanent) rather than the change-password flow
/// that would require the current one.
pub async fn set_password(
    cognito_client: &CognitoClient,
    dynamo_client: &aws_sdk_dynamodb::Client,
    table_name: &str,
    user_pool_id: &str,
    user_id: &str,
    body: &Body,
) -> Result<Response<Body>, Error> {
    let request: SetPasswordRequest = match serde_json::from_str(body_str(body)) {
        Ok(req) => req,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                format!("Invalid request body: {}", e),
            );
        }
    };

    if request.new_password.len() < 8 {
        return error_response(
            StatusCode::BAD_REQUEST,
            "InvalidPassword",
            "Password must be at least 8 characters".to_string(),
        );
    }

    // Cognito usernames in this pool are emails; look it up from the profile row
    let email = match crate::users::lookup_email(dynamo_client, table_name, user_id).await? {
        Some(email) => email,
        None => {
            return error_response(
                StatusCode::NOT_FOUND,
                "UserNotFound",
                "No profile found for this user".to_string(),
            );
        }
    };

    let result = cognito_client
        .admin_set_user_password()
        .user_pool_id(user_pool_id)
        .username(&email)
        .password(&request.new_password)
        .permanent(true)
        .send()
        .await;

    match result {
        Ok(_) => {
            tracing::info!("Password updated for user: {}", user_id);
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(
                    serde_json::json!({"message": "Password updated"})
                        .to_string()
                        .into(),
                )
                .map_err(Box::new)?)
        }
        Err(e) => {
            let error_message = format!("{:?}", e);
            tracing::error!("Cognito set password error: {}", error_message);

            let user_message = if error_message.contains("InvalidPasswordException") {
                "Password must contain at least 8 characters with uppercase, lowercase, number, and special character".to_string()
            } else {
                "Could not update password. Please try again".to_string()
            };

            error_response(StatusCode::BAD_REQUEST, "SetPasswordFailed", user_message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_hash_is_deterministic() {
        let a = compute_secret_hash("ana@example.com", "client-id", "client-secret");
        let b = compute_secret_hash("ana@example.com", "client-id", "client-secret");
        assert_eq!(a, b);
        // Different username must change the hash
        let c = compute_secret_hash("bia@example.com", "client-id", "client-secret");
        assert_ne!(a, c);
    }
}
