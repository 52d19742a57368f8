use aws_config;
use aws_lambda_events::event::dynamodb::{Event, EventRecord};
use aws_sdk_apigatewaymanagement::Client as ApiGatewayManagementClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use plantao_shared::sockets::broadcast::broadcast_to_hospital;
use plantao_shared::sockets::messages::BroadcastMessage;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    run(service_fn(function_handler)).await
}

async fn function_handler(event: LambdaEvent<Event>) -> Result<(), Error> {
    tracing::info!(
        "DynamoDB Stream event received with {} records",
        event.payload.records.len()
    );

    // Initialize AWS clients
    let config = aws_config::load_from_env().await;
    let dynamo_client = DynamoClient::new(&config);

    // Get WebSocket API endpoint from environment
    let ws_endpoint =
        std::env::var("WS_API_ENDPOINT").expect("WS_API_ENDPOINT must be set for stream handler");

    let api_config = aws_sdk_apigatewaymanagement::config::Builder::from(&config)
        .endpoint_url(ws_endpoint)
        .build();
    let api_gateway_client = ApiGatewayManagementClient::from_conf(api_config);

    let table_name =
        std::env::var("TABLE_NAME").unwrap_or_else(|_| "plantao-scheduler".to_string());

    // Process each record
    for record in event.payload.records {
        if let Err(e) =
            process_record(&record, &dynamo_client, &api_gateway_client, &table_name).await
        {
            tracing::error!("Failed to process record: {}", e);
        }
    }

    Ok(())
}

async fn process_record(
    record: &EventRecord,
    dynamo_client: &DynamoClient,
    api_gateway_client: &ApiGatewayManagementClient,
    table_name: &str,
) -> Result<(), Error> {
    let event_name = &record.event_name;

    // For REMOVE events, new_image is empty; use old_image instead
    let image = if record.change.new_image.is_empty() {
        &record.change.old_image
    } else {
        &record.change.new_image
    };

    let pk = attr_string(image, "PK").ok_or("Missing PK")?;
    let sk = attr_string(image, "SK").ok_or("Missing SK")?;

    // Only hospital-scoped rows fan out; connection and profile records are
    // not data changes anyone watches
    let hospital_id = match pk.strip_prefix("HOSPITAL#") {
        Some(id) => id,
        None => return Ok(()),
    };

    let message_type = match change_kind(&sk) {
        Some(kind) => kind,
        None => return Ok(()),
    };

    let change = match event_name.as_str() {
        "INSERT" => "insert",
        "MODIFY" => "modify",
        "REMOVE" => "remove",
        _ => return Ok(()),
    };

    // Clients reload the affected list on receipt; the payload only says what
    // kind of row changed
    let message = BroadcastMessage::new(
        message_type,
        hospital_id,
        serde_json::json!({ "change": change, "key": sk }),
    );

    broadcast_to_hospital(
        dynamo_client,
        api_gateway_client,
        table_name,
        hospital_id,
        &message,
    )
    .await?;

    tracing::info!("Broadcast sent: {} for hospital {}", message.r#type, hospital_id);

    Ok(())
}

/// Map a sort key onto the list a client would need to reload.
fn change_kind(sk: &str) -> Option<&'static str> {
    if sk.starts_with("SHIFT#") {
        Some("shift_changed")
    } else if sk.starts_with("AVAIL#") {
        Some("availability_changed")
    } else if sk.starts_with("SWAP#") {
        Some("swap_request_changed")
    } else if sk.starts_with("MEMBER#") {
        Some("roster_changed")
    } else {
        None
    }
}

/// Stream images encode attributes as `{"S": "..."}` objects; newer event
/// payloads may already be plain strings. Accept both.
fn attr_string<T: serde::Serialize>(image: &T, key: &str) -> Option<String> {
    let value = serde_json::to_value(image).ok()?;
    match value.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) => map
            .get("S")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_kind_by_sort_key() {
        assert_eq!(change_kind("SHIFT#2026-03-14#night#doc-1"), Some("shift_changed"));
        assert_eq!(
            change_kind("AVAIL#2026-03-14#doc-1#morning"),
            Some("availability_changed")
        );
        assert_eq!(change_kind("SWAP#abc"), Some("swap_request_changed"));
        assert_eq!(change_kind("MEMBER#doc-1"), Some("roster_changed"));
        assert_eq!(change_kind("HOSPITAL#h1"), None);
        assert_eq!(change_kind("CONNECTION#c1"), None);
    }

    #[test]
    fn test_attr_string_accepts_both_encodings() {
        let wrapped = serde_json::json!({"PK": {"S": "HOSPITAL#h1"}});
        assert_eq!(attr_string(&wrapped, "PK"), Some("HOSPITAL#h1".to_string()));

        let plain = serde_json::json!({"PK": "HOSPITAL#h1"});
        assert_eq!(attr_string(&plain, "PK"), Some("HOSPITAL#h1".to_string()));

        assert_eq!(attr_string(&plain, "SK"), None);
    }
}
