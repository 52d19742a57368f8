use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::Error;
use serde::{Deserialize, Serialize};

/// WebSocket connection stored in DynamoDB
#[derive(Debug, Serialize, Deserialize)]
pub struct Connection {
    pub connection_id: String,
    pub user_id: String,
    pub hospital_id: String,
    pub connected_at: String,
}

/// Save a WebSocket connection to DynamoDB
pub async fn save_connection(
    client: &DynamoClient,
    table_name: &str,
    connection_id: &str,
    user_id: &str,
    hospital_id: &str,
) -> Result<(), Error> {
    let now = chrono::Utc::now().to_rfc3339();
    let pk = format!("CONNECTION#{}", connection_id);

    client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(pk.clone()))
        .item("SK", AttributeValue::S(pk))
        .item("connection_id", AttributeValue::S(connection_id.to_string()))
        .item("user_id", AttributeValue::S(user_id.to_string()))
        .item("hospital_id", AttributeValue::S(hospital_id.to_string()))
        .item("connected_at", AttributeValue::S(now))
        .item("entity_type", AttributeValue::S("connection".to_string()))
        .send()
        .await?;

    tracing::info!(
        "Connection saved: {} (user: {}, hospital: {})",
        connection_id,
        user_id,
        hospital_id
    );
    Ok(())
}

/// Remove a WebSocket connection from DynamoDB
pub async fn remove_connection(
    client: &DynamoClient,
    table_name: &str,
    connection_id: &str,
) -> Result<(), Error> {
    let pk = format!("CONNECTION#{}", connection_id);

    client
        .delete_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk))
        .send()
        .await?;

    tracing::info!("Connection removed: {}", connection_id);
    Ok(())
}

/// All active connections of one hospital's members
pub async fn get_hospital_connections(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
) -> Result<Vec<Connection>, Error> {
    let mut connections = Vec::new();

    let result = client
        .scan()
        .table_name(table_name)
        .filter_expression("entity_type = :type AND hospital_id = :hospital")
        .expression_attribute_values(":type", AttributeValue::S("connection".to_string()))
        .expression_attribute_values(":hospital", AttributeValue::S(hospital_id.to_string()))
        .send()
        .await?;

    if let Some(items) = result.items {
        for item in items {
            if let (Some(conn_id), Some(user_id), Some(connected_at)) = (
                item.get("connection_id").and_then(|v| v.as_s().ok()),
                item.get("user_id").and_then(|v| v.as_s().ok()),
                item.get("connected_at").and_then(|v| v.as_s().ok()),
            ) {
                connections.push(Connection {
                    connection_id: conn_id.clone(),
                    user_id: user_id.clone(),
                    hospital_id: hospital_id.to_string(),
                    connected_at: connected_at.clone(),
                });
            }
        }
    }

    Ok(connections)
}
