use lambda_http::{http::StatusCode, Body, Error, Request, RequestExt, Response};
use std::{env, sync::Arc};

use super::connections::{remove_connection, save_connection};
use super::messages::WebSocketMessage;
use crate::AppState;

/// Handle WebSocket events ($connect, $disconnect, $default)
pub async fn handle_websocket_event(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let table_name = env::var("TABLE_NAME").unwrap_or_else(|_| "plantao-scheduler".to_string());

    // For WebSocket events, connection ID and route key come from headers/context
    let connection_id = event
        .headers()
        .get("connectionid")
        .or_else(|| event.headers().get("connectionId"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let route_key = event
        .headers()
        .get("routekey")
        .or_else(|| event.headers().get("routeKey"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or(event.uri().path());

    tracing::info!("WebSocket event: {} for connection: {}", route_key, connection_id);

    match route_key {
        "$connect" => handle_connect(event, state, &table_name, &connection_id).await,
        "$disconnect" => handle_disconnect(state, &table_name, &connection_id).await,
        "$default" => handle_message(event, &connection_id).await,
        _ => {
            tracing::warn!("Unknown WebSocket route: {}", route_key);
            Ok(Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .body(Body::Empty)
                .map_err(Box::new)?)
        }
    }
}

/// Handle $connect: the connection is keyed to the user's hospital so
/// broadcasts stay inside it.
async fn handle_connect(
    event: Request,
    state: Arc<AppState>,
    table_name: &str,
    connection_id: &str,
) -> Result<Response<Body>, Error> {
    let user_id = event
        .query_string_parameters_ref()
        .and_then(|params| params.first("user_id"))
        .map(|s| s.to_string())
        .or_else(|| {
            event
                .request_context()
                .authorizer()
                .and_then(|auth| auth.jwt.as_ref())
                .and_then(|jwt| jwt.claims.get("sub"))
                .map(|s| s.to_string())
        });

    let user_id = match user_id {
        Some(id) => id,
        None => {
            tracing::warn!("WebSocket connect without user identity");
            return Ok(Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .body(Body::Empty)
                .map_err(Box::new)?);
        }
    };

    let membership =
        crate::roster::get_membership(&state.dynamo_client, table_name, &user_id).await?;
    let hospital_id = match membership {
        Some(m) => m.hospital_id,
        None => {
            tracing::warn!("WebSocket connect from user without membership: {}", user_id);
            return Ok(Response::builder()
                .status(StatusCode::FORBIDDEN)
                .body(Body::Empty)
                .map_err(Box::new)?);
        }
    };

    tracing::info!(
        "WebSocket connect: {} (user: {}, hospital: {})",
        connection_id,
        user_id,
        hospital_id
    );

    save_connection(
        &state.dynamo_client,
        table_name,
        connection_id,
        &user_id,
        &hospital_id,
    )
    .await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .body(Body::Empty)
        .map_err(Box::new)?)
}

/// Handle $disconnect event
async fn handle_disconnect(
    state: Arc<AppState>,
    table_name: &str,
    connection_id: &str,
) -> Result<Response<Body>, Error> {
    tracing::info!("WebSocket disconnect: {}", connection_id);

    remove_connection(&state.dynamo_client, table_name, connection_id).await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .body(Body::Empty)
        .map_err(Box::new)?)
}

/// Handle $default: the channel is server-push only, so incoming messages are
/// acknowledged and ignored.
async fn handle_message(event: Request, connection_id: &str) -> Result<Response<Body>, Error> {
    let body = event.body();

    match serde_json::from_slice::<WebSocketMessage>(body) {
        Ok(message) => {
            tracing::info!(
                "Ignoring client message on {}: action {}",
                connection_id,
                message.action
            );
        }
        Err(e) => {
            tracing::warn!("Unparseable WebSocket message on {}: {}", connection_id, e);
        }
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .body(Body::Empty)
        .map_err(Box::new)?)
}
