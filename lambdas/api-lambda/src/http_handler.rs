use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use plantao_shared::{auth, availability, roster, shifts, swaps, users, AppState};
use plantao_shared::types::SwapStatus;
use std::env;
use std::sync::Arc;

/// Main Lambda handler - routes requests to auth, profile or hospital endpoints
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    tracing::info!("API Lambda invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == "OPTIONS" {
        return Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Access-Control-Allow-Origin", "*")
            .header(
                "Access-Control-Allow-Methods",
                "GET,POST,PUT,PATCH,DELETE,OPTIONS",
            )
            .header(
                "Access-Control-Allow-Headers",
                "Content-Type,Authorization,X-User-Id",
            )
            .body(Body::Empty)
            .map_err(Box::new)?);
    }

    let table_name = env::var("TABLE_NAME").unwrap_or_else(|_| "plantao-scheduler".to_string());

    // Route to auth endpoints (no JWT validation)
    if path.starts_with("/login") || path.starts_with("/refresh") {
        let client_id = env::var("COGNITO_CLIENT_ID").expect("COGNITO_CLIENT_ID must be set");
        let client_secret =
            env::var("COGNITO_CLIENT_SECRET").expect("COGNITO_CLIENT_SECRET must be set");

        if method != Method::POST {
            return method_not_allowed();
        }

        return if path.starts_with("/login") {
            auth::login(&state.cognito_client, &client_id, &client_secret, body).await
        } else {
            auth::refresh_token(&state.cognito_client, &client_id, &client_secret, body).await
        };
    }

    // Everything else requires a caller identity (JWT validated by API Gateway;
    // X-User-Id is the local-development override)
    let user_id = match caller_user_id(&event) {
        Some(id) => id,
        None => {
            tracing::warn!("Could not extract user ID from JWT or header");
            return Ok(Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(
                    serde_json::json!({"error": "Missing caller identity"})
                        .to_string()
                        .into(),
                )
                .map_err(Box::new)?);
        }
    };

    // Password change goes through Cognito's admin API
    if path == "/password" {
        if method != Method::POST {
            return method_not_allowed();
        }
        let user_pool_id =
            env::var("COGNITO_USER_POOL_ID").expect("COGNITO_USER_POOL_ID must be set");
        return auth::set_password(
            &state.cognito_client,
            &state.dynamo_client,
            &table_name,
            &user_pool_id,
            &user_id,
            body,
        )
        .await;
    }

    // Profile endpoints
    if path.starts_with("/users") {
        return match (method, path) {
            (&Method::GET, "/users/me") => {
                users::get_current_user(&state.dynamo_client, &table_name, &user_id).await
            }
            (&Method::PATCH, "/users/me") => {
                users::update_user(&state.dynamo_client, &table_name, &user_id, body).await
            }
            _ => not_found(),
        };
    }

    // Hospital-scoped endpoints: the caller's membership in the path hospital
    // scopes every read and write (the code-level stand-in for row-level
    // security)
    if path.starts_with("/hospitals") {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let hospital_id = match parts.get(1) {
            Some(id) => id.to_string(),
            None => return not_found(),
        };

        let membership = match roster::membership_in(
            &state.dynamo_client,
            &table_name,
            &hospital_id,
            &user_id,
        )
        .await?
        {
            Some(m) => m,
            None => return forbidden("You are not a member of this hospital"),
        };

        return match (method, parts.as_slice()) {
            // --- ROSTER ---
            (&Method::GET, ["hospitals", _, "doctors"]) => {
                roster::list_doctors(&state.dynamo_client, &table_name, &hospital_id).await
            }
            (&Method::POST, ["hospitals", _, "doctors"]) => {
                if !membership.role.is_admin() {
                    return forbidden("Only admins can manage the roster");
                }
                let user_pool_id = env::var("COGNITO_USER_POOL_ID")
                    .expect("COGNITO_USER_POOL_ID must be set");
                roster::add_doctor(
                    &state.cognito_client,
                    &state.dynamo_client,
                    &table_name,
                    &user_pool_id,
                    &hospital_id,
                    body,
                )
                .await
            }
            (&Method::PATCH, ["hospitals", _, "doctors", member_id]) => {
                if !membership.role.is_admin() {
                    return forbidden("Only admins can manage the roster");
                }
                roster::change_role(
                    &state.dynamo_client,
                    &table_name,
                    &hospital_id,
                    member_id,
                    body,
                )
                .await
            }
            (&Method::DELETE, ["hospitals", _, "doctors", member_id]) => {
                if !membership.role.is_admin() {
                    return forbidden("Only admins can manage the roster");
                }
                roster::remove_doctor(&state.dynamo_client, &table_name, &hospital_id, member_id)
                    .await
            }

            // --- SHIFT CALENDAR ---
            (&Method::GET, ["hospitals", _, "shifts"]) => {
                let params = event.query_string_parameters_ref();
                if let Some(date) = params.and_then(|p| p.first("date")) {
                    shifts::get_day(&state.dynamo_client, &table_name, &hospital_id, date).await
                } else if let Some(month) = params.and_then(|p| p.first("month")) {
                    shifts::list_month(&state.dynamo_client, &table_name, &hospital_id, month)
                        .await
                } else {
                    bad_request("Provide a date or month query parameter")
                }
            }
            (&Method::POST, ["hospitals", _, "shifts", "copy-month"]) => {
                if !membership.role.can_edit_schedule() {
                    return forbidden("Only admins and coordinators can edit the schedule");
                }
                shifts::copy_month(&state.dynamo_client, &table_name, &hospital_id, body).await
            }
            (&Method::PUT, ["hospitals", _, "shifts", date]) => {
                if !membership.role.can_edit_schedule() {
                    return forbidden("Only admins and coordinators can edit the schedule");
                }
                shifts::replace_day(&state.dynamo_client, &table_name, &hospital_id, date, body)
                    .await
            }
            (&Method::DELETE, ["hospitals", _, "shifts", date]) => {
                if !membership.role.can_edit_schedule() {
                    return forbidden("Only admins and coordinators can edit the schedule");
                }
                shifts::clear_day(&state.dynamo_client, &table_name, &hospital_id, date).await
            }
            (&Method::POST, ["hospitals", _, "shifts", date, "copy"]) => {
                if !membership.role.can_edit_schedule() {
                    return forbidden("Only admins and coordinators can edit the schedule");
                }
                shifts::copy_day(&state.dynamo_client, &table_name, &hospital_id, date, body)
                    .await
            }

            // --- AVAILABILITY ---
            (&Method::GET, ["hospitals", _, "availability"]) => {
                let params = event.query_string_parameters_ref();
                if let Some(date) = params.and_then(|p| p.first("date")) {
                    availability::list_day(&state.dynamo_client, &table_name, &hospital_id, date)
                        .await
                } else if let Some(month) = params.and_then(|p| p.first("month")) {
                    availability::list_month_for_user(
                        &state.dynamo_client,
                        &table_name,
                        &hospital_id,
                        &user_id,
                        month,
                    )
                    .await
                } else {
                    bad_request("Provide a date or month query parameter")
                }
            }
            (&Method::POST, ["hospitals", _, "availability", "bulk"]) => {
                availability::set_bulk(
                    &state.dynamo_client,
                    &table_name,
                    &hospital_id,
                    &user_id,
                    body,
                )
                .await
            }
            (&Method::PUT, ["hospitals", _, "availability", date]) => {
                availability::set_day(
                    &state.dynamo_client,
                    &table_name,
                    &hospital_id,
                    &user_id,
                    date,
                    body,
                )
                .await
            }

            // --- SHIFT SWAPS ---
            (&Method::POST, ["hospitals", _, "swaps"]) => {
                swaps::create_swap(&state.dynamo_client, &table_name, &hospital_id, &user_id, body)
                    .await
            }
            (&Method::GET, ["hospitals", _, "swaps"]) => {
                let params = swap_list_params(&event);
                swaps::list_swaps(
                    &state.dynamo_client,
                    &table_name,
                    &hospital_id,
                    &user_id,
                    &params,
                )
                .await
            }
            (&Method::GET, ["hospitals", _, "swaps", request_id]) => {
                swaps::get_swap(&state.dynamo_client, &table_name, &hospital_id, request_id).await
            }
            (&Method::POST, ["hospitals", _, "swaps", request_id, "interest"]) => {
                swaps::register_interest(
                    &state.dynamo_client,
                    &table_name,
                    &hospital_id,
                    request_id,
                    &user_id,
                )
                .await
            }
            (&Method::POST, ["hospitals", _, "swaps", request_id, "approve"]) => {
                if !membership.role.is_admin() {
                    return forbidden("Only admins can approve swap requests");
                }
                swaps::approve_swap(
                    &state.dynamo_client,
                    &table_name,
                    &hospital_id,
                    request_id,
                    body,
                )
                .await
            }
            (&Method::POST, ["hospitals", _, "swaps", request_id, "reject"]) => {
                swaps::reject_swap(
                    &state.dynamo_client,
                    &table_name,
                    &hospital_id,
                    request_id,
                    &user_id,
                    membership.role.is_admin(),
                )
                .await
            }
            (&Method::POST, ["hospitals", _, "swaps", request_id, "cancel"]) => {
                swaps::cancel_swap(
                    &state.dynamo_client,
                    &table_name,
                    &hospital_id,
                    request_id,
                    &user_id,
                )
                .await
            }
            _ => not_found(),
        };
    }

    // No matching route
    tracing::warn!("No route matched - Method: {} Path: {}", method, path);
    not_found()
}

/// Caller identity: JWT claims from the API Gateway authorizer, with an
/// X-User-Id header override for local development.
fn caller_user_id(event: &Request) -> Option<String> {
    event
        .headers()
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .or_else(|| {
            event
                .request_context()
                .authorizer()
                .and_then(|auth| auth.jwt.as_ref())
                .and_then(|jwt| jwt.claims.get("sub"))
                .map(|s| s.to_string())
        })
}

fn swap_list_params(event: &Request) -> swaps::ListSwapsParams {
    let mut params = swaps::ListSwapsParams::default();
    if let Some(query) = event.query_string_parameters_ref() {
        params.status = query.first("status").and_then(SwapStatus::parse);
        params.mine = query.first("mine") == Some("1");
        params.inbox = query.first("inbox") == Some("1");
        params.since = query.first("since").map(|s| s.to_string());
        params.limit = query
            .first("limit")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
    }
    params
}

fn bad_request(message: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}

fn forbidden(message: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::FORBIDDEN)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}

fn method_not_allowed() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"error": "Method not allowed"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": "Not found"}).to_string().into())
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_status_query_values() {
        assert_eq!(SwapStatus::parse("pending"), Some(SwapStatus::Pending));
        assert_eq!(SwapStatus::parse("approved"), Some(SwapStatus::Approved));
        assert_eq!(SwapStatus::parse("bogus"), None);
    }

    #[test]
    fn test_path_split_matches_route_shapes() {
        let path = "/hospitals/h1/swaps/r1/approve";
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        assert!(matches!(
            parts.as_slice(),
            ["hospitals", _, "swaps", _, "approve"]
        ));

        let path = "/hospitals/h1/shifts/copy-month";
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        // copy-month must not be mistaken for a date segment
        assert!(matches!(
            parts.as_slice(),
            ["hospitals", _, "shifts", "copy-month"]
        ));
    }
}
