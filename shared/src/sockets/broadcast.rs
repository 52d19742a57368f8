use aws_sdk_apigatewaymanagement::Client as ApiGatewayManagementClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::Error;

use super::connections::{get_hospital_connections, remove_connection};
use super::messages::BroadcastMessage;

/// Broadcast a message to every connected client of one hospital.
/// Connections that refuse the post are treated as stale and dropped.
pub async fn broadcast_to_hospital(
    dynamo_client: &DynamoClient,
    api_gateway_client: &ApiGatewayManagementClient,
    table_name: &str,
    hospital_id: &str,
    message: &BroadcastMessage,
) -> Result<(), Error> {
    let connections = get_hospital_connections(dynamo_client, table_name, hospital_id).await?;
    let message_json = serde_json::to_string(message)?;

    tracing::info!(
        "Broadcasting {} to {} connections of hospital {}",
        message.r#type,
        connections.len(),
        hospital_id
    );

    for conn in connections {
        let result = api_gateway_client
            .post_to_connection()
            .connection_id(&conn.connection_id)
            .data(message_json.as_bytes().to_vec().into())
            .send()
            .await;

        if let Err(e) = result {
            tracing::warn!(
                "Failed to send to connection {}: {}. Dropping stale connection.",
                conn.connection_id,
                e
            );
            remove_connection(dynamo_client, table_name, &conn.connection_id)
                .await
                .ok();
        }
    }

    Ok(())
}
