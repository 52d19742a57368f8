use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::types::{AttributeValue, Delete, TransactWriteItem, Update};
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{http::StatusCode, Body, Error, Response};
use std::collections::HashMap;

use crate::types::{AddDoctorRequest, ChangeRoleRequest, Membership, Role, RosterEntry};

/// Resolve a user's hospital membership. Users belong to at most one hospital;
/// the first link row wins.
pub async fn get_membership(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
) -> Result<Option<Membership>, Error> {
    let pk = format!("USER#{}", user_id);

    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(":pk", AttributeValue::S(pk))
        .expression_attribute_values(":sk_prefix", AttributeValue::S("HOSPITAL#".to_string()))
        .send()
        .await?;

    for item in result.items() {
        let hospital_id = match item
            .get("SK")
            .and_then(|v| v.as_s().ok())
            .and_then(|sk| sk.strip_prefix("HOSPITAL#"))
        {
            Some(id) => id.to_string(),
            None => continue,
        };
        let role = item
            .get("role")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| Role::parse(s))
            .unwrap_or(Role::Doctor);
        let joined_at = item
            .get("joined_at")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();

        return Ok(Some(Membership {
            hospital_id,
            user_id: user_id.to_string(),
            role,
            joined_at,
        }));
    }

    Ok(None)
}

/// Membership of `user_id` in a specific hospital, or None.
pub async fn membership_in(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    user_id: &str,
) -> Result<Option<Membership>, Error> {
    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(format!("USER#{}", user_id)))
        .key("SK", AttributeValue::S(format!("HOSPITAL#{}", hospital_id)))
        .send()
        .await?;

    let item = match result.item() {
        Some(item) => item,
        None => return Ok(None),
    };

    let role = item
        .get("role")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| Role::parse(s))
        .unwrap_or(Role::Doctor);
    let joined_at = item
        .get("joined_at")
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .unwrap_or_default();

    Ok(Some(Membership {
        hospital_id: hospital_id.to_string(),
        user_id: user_id.to_string(),
        role,
        joined_at,
    }))
}

/// Load display names for every member of a hospital. Used by the calendar and
/// swap screens to label assignments.
pub async fn member_names(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
) -> Result<HashMap<String, String>, Error> {
    let entries = load_roster(client, table_name, hospital_id).await?;
    Ok(entries
        .into_iter()
        .map(|e| {
            let label = if e.name.is_empty() { e.email.clone() } else { e.name.clone() };
            (e.user_id, label)
        })
        .collect())
}

async fn load_roster(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
) -> Result<Vec<RosterEntry>, Error> {
    let pk = format!("HOSPITAL#{}", hospital_id);

    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(":pk", AttributeValue::S(pk))
        .expression_attribute_values(":sk_prefix", AttributeValue::S("MEMBER#".to_string()))
        .send()
        .await?;

    let mut memberships = Vec::new();
    for item in result.items() {
        if let Some(user_id) = item
            .get("SK")
            .and_then(|v| v.as_s().ok())
            .and_then(|sk| sk.strip_prefix("MEMBER#"))
        {
            let role = item
                .get("role")
                .and_then(|v| v.as_s().ok())
                .and_then(|s| Role::parse(s))
                .unwrap_or(Role::Doctor);
            let joined_at = item
                .get("joined_at")
                .and_then(|v| v.as_s().ok())
                .map(|s| s.to_string())
                .unwrap_or_default();
            memberships.push((user_id.to_string(), role, joined_at));
        }
    }

    if memberships.is_empty() {
        return Ok(Vec::new());
    }

    // Batch fetch member profiles (DynamoDB allows up to 100 items per batch)
    let mut profiles: HashMap<String, (String, String)> = HashMap::new();
    let user_ids: Vec<String> = memberships.iter().map(|(id, _, _)| id.clone()).collect();

    for chunk in user_ids.chunks(100) {
        let mut keys = Vec::new();
        for user_id in chunk {
            let pk = format!("USER#{}", user_id);
            let mut key = HashMap::new();
            key.insert("PK".to_string(), AttributeValue::S(pk.clone()));
            key.insert("SK".to_string(), AttributeValue::S(pk));
            keys.push(key);
        }

        let batch_result = client
            .batch_get_item()
            .request_items(
                table_name,
                aws_sdk_dynamodb::types::KeysAndAttributes::builder()
                    .set_keys(Some(keys))
                    .build()?,
            )
            .send()
            .await?;

        if let Some(responses) = batch_result.responses() {
            if let Some(items) = responses.get(table_name) {
                for item in items {
                    if let Some(user_id) = item
                        .get("PK")
                        .and_then(|v| v.as_s().ok())
                        .and_then(|pk| pk.strip_prefix("USER#"))
                    {
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
                        profiles.insert(user_id.to_string(), (name, email));
                    }
                }
            }
        }
    }

    let mut entries: Vec<RosterEntry> = memberships
        .into_iter()
        .map(|(user_id, role, joined_at)| {
            let (name, email) = profiles.get(&user_id).cloned().unwrap_or_default();
            RosterEntry {
                hospital_id: hospital_id.to_string(),
                user_id,
                role,
                joined_at,
                name,
                email,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        a.role
            .as_str()
            .cmp(b.role.as_str())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });

    Ok(entries)
}

/// List the hospital roster, ordered by role then name
pub async fn list_doctors(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
) -> Result<Response<Body>, Error> {
    let entries = load_roster(client, table_name, hospital_id).await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&entries)?.into())
        .map_err(Box::new)?)
}

/// Register a doctor: create (or re-link) the login, upsert the profile, and
/// write both membership link rows.
///
/// The role is forced to doctor; this form can never mint an admin.
pub async fn add_doctor(
    cognito_client: &CognitoClient,
    dynamo_client: &DynamoClient,
    table_name: &str,
    user_pool_id: &str,
    hospital_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: AddDoctorRequest = match serde_json::from_slice(body) {
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

    let email = req.email.trim().to_string();
    let full_name = req.full_name.trim().to_string();

    if email.is_empty() || full_name.is_empty() || req.password.is_empty() {
        return Ok(Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(
                serde_json::json!({"error": "Name, email and password are required"})
                    .to_string()
                    .into(),
            )
            .map_err(Box::new)?);
    }

    // Create the login; an existing one is re-linked instead of failing
    let user_id = match create_or_find_login(cognito_client, user_pool_id, &email, &req.password)
        .await
    {
        Ok(id) => id,
        Err(message) => {
            return Ok(Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(serde_json::json!({"error": message}).to_string().into())
                .map_err(Box::new)?);
        }
    };

    if membership_in(dynamo_client, table_name, hospital_id, &user_id)
        .await?
        .is_some()
    {
        return Ok(Response::builder()
            .status(StatusCode::CONFLICT)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(
                serde_json::json!({"error": "This doctor is already on the roster"})
                    .to_string()
                    .into(),
            )
            .map_err(Box::new)?);
    }

    let now = chrono::Utc::now().to_rfc3339();
    let user_pk = format!("USER#{}", user_id);
    let hospital_pk = format!("HOSPITAL#{}", hospital_id);

    // 1. Profile record (upsert; a previous registration may have written it)
    let mut profile_item = HashMap::new();
    profile_item.insert("PK".to_string(), AttributeValue::S(user_pk.clone()));
    profile_item.insert("SK".to_string(), AttributeValue::S(user_pk.clone()));
    profile_item.insert("name".to_string(), AttributeValue::S(full_name.clone()));
    profile_item.insert("email".to_string(), AttributeValue::S(email.clone()));
    profile_item.insert("created_at".to_string(), AttributeValue::S(now.clone()));

    // 2. USER -> HOSPITAL link
    let mut user_to_hospital = HashMap::new();
    user_to_hospital.insert("PK".to_string(), AttributeValue::S(user_pk.clone()));
    user_to_hospital.insert("SK".to_string(), AttributeValue::S(hospital_pk.clone()));
    user_to_hospital.insert("role".to_string(), AttributeValue::S(Role::Doctor.as_str().to_string()));
    user_to_hospital.insert("joined_at".to_string(), AttributeValue::S(now.clone()));

    // 3. HOSPITAL -> MEMBER link
    let mut hospital_to_user = HashMap::new();
    hospital_to_user.insert("PK".to_string(), AttributeValue::S(hospital_pk));
    hospital_to_user.insert("SK".to_string(), AttributeValue::S(format!("MEMBER#{}", user_id)));
    hospital_to_user.insert("role".to_string(), AttributeValue::S(Role::Doctor.as_str().to_string()));
    hospital_to_user.insert("joined_at".to_string(), AttributeValue::S(now.clone()));

    dynamo_client
        .batch_write_item()
        .request_items(
            table_name,
            vec![
                aws_sdk_dynamodb::types::WriteRequest::builder()
                    .put_request(
                        aws_sdk_dynamodb::types::PutRequest::builder()
                            .set_item(Some(profile_item))
                            .build()?,
                    )
                    .build(),
                aws_sdk_dynamodb::types::WriteRequest::builder()
                    .put_request(
                        aws_sdk_dynamodb::types::PutRequest::builder()
                            .set_item(Some(user_to_hospital))
                            .build()?,
                    )
                    .build(),
                aws_sdk_dynamodb::types::WriteRequest::builder()
                    .put_request(
                        aws_sdk_dynamodb::types::PutRequest::builder()
                            .set_item(Some(hospital_to_user))
                            .build()?,
                    )
                    .build(),
            ],
        )
        .send()
        .await?;

    tracing::info!("Doctor registered: {} in hospital {}", user_id, hospital_id);

    let entry = RosterEntry {
        hospital_id: hospital_id.to_string(),
        user_id,
        role: Role::Doctor,
        joined_at: now,
        name: full_name,
        email,
    };

    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&entry)?.into())
        .map_err(Box::new)?)
}

/// Change a member's role. Both link rows carry the role, so they move in one
/// transaction.
pub async fn change_role(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    user_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: ChangeRoleRequest = match serde_json::from_slice(body) {
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

    let role_attr = AttributeValue::S(req.role.as_str().to_string());

    let by_user = Update::builder()
        .table_name(table_name)
        .key("PK", AttributeValue::S(format!("USER#{}", user_id)))
        .key("SK", AttributeValue::S(format!("HOSPITAL#{}", hospital_id)))
        .update_expression("SET #role = :role")
        .expression_attribute_names("#role", "role")
        .expression_attribute_values(":role", role_attr.clone())
        .condition_expression("attribute_exists(PK)")
        .build()?;

    let by_hospital = Update::builder()
        .table_name(table_name)
        .key("PK", AttributeValue::S(format!("HOSPITAL#{}", hospital_id)))
        .key("SK", AttributeValue::S(format!("MEMBER#{}", user_id)))
        .update_expression("SET #role = :role")
        .expression_attribute_names("#role", "role")
        .expression_attribute_values(":role", role_attr)
        .condition_expression("attribute_exists(PK)")
        .build()?;

    let result = client
        .transact_write_items()
        .transact_items(TransactWriteItem::builder().update(by_user).build())
        .transact_items(TransactWriteItem::builder().update(by_hospital).build())
        .send()
        .await;

    if let Err(e) = result {
        let error_message = format!("{:?}", e);
        if error_message.contains("ConditionalCheckFailed")
            || error_message.contains("TransactionCanceled")
        {
            return Ok(Response::builder()
                .status(StatusCode::NOT_FOUND)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(
                    serde_json::json!({"error": "Membership not found"})
                        .to_string()
                        .into(),
                )
                .map_err(Box::new)?);
        }
        return Err(e.into());
    }

    tracing::info!(
        "Role changed: {} -> {} in hospital {}",
        user_id,
        req.role.as_str(),
        hospital_id
    );

    list_doctors(client, table_name, hospital_id).await
}

/// Remove a member. Deletes both link rows; the profile and login survive.
pub async fn remove_doctor(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    user_id: &str,
) -> Result<Response<Body>, Error> {
    let by_user = Delete::builder()
        .table_name(table_name)
        .key("PK", AttributeValue::S(format!("USER#{}", user_id)))
        .key("SK", AttributeValue::S(format!("HOSPITAL#{}", hospital_id)))
        .build()?;

    let by_hospital = Delete::builder()
        .table_name(table_name)
        .key("PK", AttributeValue::S(format!("HOSPITAL#{}", hospital_id)))
        .key("SK", AttributeValue::S(format!("MEMBER#{}", user_id)))
        .build()?;

    client
        .transact_write_items()
        .transact_items(TransactWriteItem::builder().delete(by_user).build())
        .transact_items(TransactWriteItem::builder().delete(by_hospital).build())
        .send()
        .await?;

    tracing::info!("Member removed: {} from hospital {}", user_id, hospital_id);

    Ok(Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .body(Body::Empty)
        .map_err(Box::new)?)
}

/// Create the Cognito login, or resolve the existing one for this email.
/// Returns the Cognito sub, which is the user id everywhere else.
async fn create_or_find_login(
    cognito_client: &CognitoClient,
    user_pool_id: &str,
    email: &str,
    password: &str,
) -> Result<String, String> {
    let create_result = cognito_client
        .admin_create_user()
        .user_pool_id(user_pool_id)
        .username(email)
        .message_action(aws_sdk_cognitoidentityprovider::types::MessageActionType::Suppress)
        .user_attributes(
            aws_sdk_cognitoidentityprovider::types::AttributeType::builder()
                .name("email")
                .value(email)
                .build()
                .map_err(|e| format!("Invalid email attribute: {}", e))?,
        )
        .user_attributes(
            aws_sdk_cognitoidentityprovider::types::AttributeType::builder()
                .name("email_verified")
                .value("true")
                .build()
                .map_err(|e| format!("Invalid email attribute: {}", e))?,
        )
        .send()
        .await;

    let sub = match create_result {
        Ok(output) => {
            // Make the password permanent so the doctor skips the forced-change flow
            if let Err(e) = cognito_client
                .admin_set_user_password()
                .user_pool_id(user_pool_id)
                .username(email)
                .password(password)
                .permanent(true)
                .send()
                .await
            {
                tracing::error!("Failed to set permanent password: {:?}", e);
                return Err("Login created but the password could not be set".to_string());
            }

            output
                .user()
                .map(|u| u.attributes())
                .unwrap_or_default()
                .iter()
                .find(|attr| attr.name() == "sub")
                .and_then(|attr| attr.value())
                .map(|s| s.to_string())
        }
        Err(e) => {
            let error_message = format!("{:?}", e);
            if error_message.contains("UsernameExistsException") {
                // Existing account: link it instead of failing
                tracing::info!("Login already exists for {}; re-linking", email);
                let existing = cognito_client
                    .admin_get_user()
                    .user_pool_id(user_pool_id)
                    .username(email)
                    .send()
                    .await
                    .map_err(|e| {
                        tracing::error!("admin_get_user failed: {:?}", e);
                        "This email already has an account that could not be looked up".to_string()
                    })?;

                existing
                    .user_attributes()
                    .iter()
                    .find(|attr| attr.name() == "sub")
                    .and_then(|attr| attr.value())
                    .map(|s| s.to_string())
            } else if error_message.contains("InvalidPasswordException") {
                return Err("Password must contain at least 8 characters with uppercase, lowercase, number, and special character".to_string());
            } else if error_message.contains("InvalidParameterException") {
                return Err("Invalid email or password format".to_string());
            } else {
                tracing::error!("Cognito admin_create_user error: {}", error_message);
                return Err("Could not create the doctor's login".to_string());
            }
        }
    };

    sub.ok_or_else(|| "Cognito did not return a user id".to_string())
}
