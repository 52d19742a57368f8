use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{http::StatusCode, Body, Error, Response};

use crate::types::{UpdateUserRequest, User};

/// Fetch a user's email from their profile row.
pub async fn lookup_email(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
) -> Result<Option<String>, Error> {
    let pk = format!("USER#{}", user_id);

    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk))
        .send()
        .await?;

    Ok(result
        .item()
        .and_then(|item| item.get("email"))
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string()))
}

/// Get the current user: profile row plus hospital membership.
///
/// Every page load starts here; the membership (hospital id, role) scopes all
/// other reads and writes.
pub async fn get_current_user(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
) -> Result<Response<Body>, Error> {
    let pk = format!("USER#{}", user_id);

    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk.clone()))
        .send()
        .await?;

    let item = match result.item() {
        Some(item) => item,
        None => {
            return Ok(Response::builder()
                .status(StatusCode::NOT_FOUND)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(serde_json::json!({"error": "User not found"}).to_string().into())
                .map_err(Box::new)?);
        }
    };

    let name = item
        .get("name")
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .unwrap_or_default();
    let email = item
        .get("email")
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .unwrap_or_default();
    let created_at = item
        .get("created_at")
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .unwrap_or_default();

    // Update last_login on every get
    let now = chrono::Utc::now().to_rfc3339();
    let _ = client
        .update_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk))
        .update_expression("SET last_login = :login")
        .expression_attribute_values(":login", AttributeValue::S(now.clone()))
        .send()
        .await;

    let user = User {
        user_id: user_id.to_string(),
        name,
        email,
        created_at,
        last_login: Some(now),
    };

    let membership = crate::roster::get_membership(client, table_name, user_id).await?;

    let hospital_name = match &membership {
        Some(m) => lookup_hospital_name(client, table_name, &m.hospital_id).await?,
        None => None,
    };

    let body = serde_json::json!({
        "user": user,
        "membership": membership,
        "hospital_name": hospital_name,
    });

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&body)?.into())
        .map_err(Box::new)?)
}

/// Update the current user's display name
pub async fn update_user(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: UpdateUserRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            return Ok(Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(
                    serde_json::json!({"error": format!("Invalid request body: {}", e)})
                        .to_string()
                        .into(),
                )
                .map_err(Box::new)?);
        }
    };

    if let Some(name) = req.name {
        let pk = format!("USER#{}", user_id);
        client
            .update_item()
            .table_name(table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .update_expression("SET #name = :name")
            .expression_attribute_names("#name", "name")
            .expression_attribute_values(":name", AttributeValue::S(name))
            .send()
            .await?;
    }

    get_current_user(client, table_name, user_id).await
}

async fn lookup_hospital_name(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
) -> Result<Option<String>, Error> {
    let pk = format!("HOSPITAL#{}", hospital_id);

    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(pk))
        .send()
        .await?;

    Ok(result
        .item()
        .and_then(|item| item.get("name"))
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string()))
}
