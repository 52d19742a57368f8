use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, TransactWriteItem, Update};
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::NaiveDate;
use lambda_http::{http::StatusCode, Body, Error, Response};
use std::collections::HashMap;

use crate::types::{ApproveSwapRequest, CreateSwapRequest, Period, SwapRequest, SwapStatus};

/// Query-string filters for the list endpoint.
#[derive(Debug, Default)]
pub struct ListSwapsParams {
    pub status: Option<SwapStatus>,
    /// Only the caller's own requests (doctor history screen).
    pub mine: bool,
    /// Pending requests the caller could volunteer for: open to anyone or
    /// targeted at the caller, excluding the caller's own.
    pub inbox: bool,
    /// created_at floor, RFC 3339 (the dashboard shows the last 30 days).
    pub since: Option<String>,
    pub limit: usize,
}

fn swap_sk(request_id: &str) -> String {
    format!("SWAP#{}", request_id)
}

fn swap_from_item(
    hospital_id: &str,
    item: &HashMap<String, AttributeValue>,
) -> Option<SwapRequest> {
    let request_id = item
        .get("SK")
        .and_then(|v| v.as_s().ok())
        .and_then(|sk| sk.strip_prefix("SWAP#"))?
        .to_string();
    let requester_user_id = item
        .get("requester_user_id")
        .and_then(|v| v.as_s().ok())?
        .to_string();
    let shift_date = item.get("shift_date").and_then(|v| v.as_s().ok())?.to_string();
    let shift_period = item
        .get("shift_period")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| Period::parse(s))?;
    let status = item
        .get("status")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| SwapStatus::parse(s))?;
    let target_user_id = item
        .get("target_user_id")
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string());
    let reason = item
        .get("reason")
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string());
    let created_at = item
        .get("created_at")
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .unwrap_or_default();
    let handled_at = item
        .get("handled_at")
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string());

    Some(SwapRequest {
        request_id,
        hospital_id: hospital_id.to_string(),
        requester_user_id,
        shift_date,
        shift_period,
        target_user_id,
        reason,
        status,
        created_at,
        handled_at,
    })
}

/// Whether `caller` may volunteer to take the shift of `request`.
fn interest_check(request: &SwapRequest, caller: &str) -> Result<(), &'static str> {
    if request.status.is_terminal() {
        return Err("This request has already been handled");
    }
    if request.requester_user_id == caller {
        return Err("You cannot volunteer for your own request");
    }
    match &request.target_user_id {
        Some(target) if target != caller => Err("This request is reserved for another doctor"),
        _ => Ok(()),
    }
}

/// Reject is an admin decision, or a decline by the doctor the request targets.
fn can_reject(request: &SwapRequest, caller: &str, caller_is_admin: bool) -> bool {
    caller_is_admin || request.target_user_id.as_deref() == Some(caller)
}

fn list_filter(request: &SwapRequest, caller: &str, params: &ListSwapsParams) -> bool {
    if let Some(status) = params.status {
        if request.status != status {
            return false;
        }
    }
    if let Some(since) = &params.since {
        // RFC 3339 timestamps compare lexicographically
        if request.created_at.as_str() < since.as_str() {
            return false;
        }
    }
    if params.mine && request.requester_user_id != caller {
        return false;
    }
    if params.inbox {
        if request.status != SwapStatus::Pending {
            return false;
        }
        if request.requester_user_id == caller {
            return false;
        }
        if let Some(target) = &request.target_user_id {
            if target != caller {
                return false;
            }
        }
    }
    true
}

fn bad_request(message: String) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}

fn conflict(message: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::CONFLICT)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"error": "Swap request not found"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

async fn load_swap(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    request_id: &str,
) -> Result<Option<SwapRequest>, Error> {
    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(format!("HOSPITAL#{}", hospital_id)))
        .key("SK", AttributeValue::S(swap_sk(request_id)))
        .send()
        .await?;

    Ok(result
        .item()
        .and_then(|item| swap_from_item(hospital_id, item)))
}

/// Request json decorated with display names for the list and detail screens.
fn with_names(request: &SwapRequest, names: &HashMap<String, String>) -> serde_json::Value {
    let mut value = serde_json::to_value(request).unwrap_or_default();
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "requester_name".to_string(),
            serde_json::json!(names.get(&request.requester_user_id)),
        );
        let target_name = request
            .target_user_id
            .as_ref()
            .and_then(|id| names.get(id));
        obj.insert("target_name".to_string(), serde_json::json!(target_name));
    }
    value
}

/// Create a swap request for one of the caller's own shifts
pub async fn create_swap(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    requester_user_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: CreateSwapRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };

    if NaiveDate::parse_from_str(&req.shift_date, "%Y-%m-%d").is_err() {
        return bad_request(format!("Invalid date: {}", req.shift_date));
    }
    if req.target_user_id.as_deref() == Some(requester_user_id) {
        return bad_request("You cannot target your own request at yourself".to_string());
    }
    if let Some(target) = &req.target_user_id {
        if crate::roster::membership_in(client, table_name, hospital_id, target)
            .await?
            .is_none()
        {
            return bad_request("The chosen doctor is not on this hospital's roster".to_string());
        }
    }

    // The source shift must be the requester's own assignment
    let shift_key = format!(
        "SHIFT#{}#{}#{}",
        req.shift_date,
        req.shift_period.as_str(),
        requester_user_id
    );
    let shift = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(format!("HOSPITAL#{}", hospital_id)))
        .key("SK", AttributeValue::S(shift_key))
        .send()
        .await?;
    if shift.item().is_none() {
        return bad_request("You can only request a swap for your own shift".to_string());
    }

    let request_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let mut put_request = client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(format!("HOSPITAL#{}", hospital_id)))
        .item("SK", AttributeValue::S(swap_sk(&request_id)))
        .item("request_id", AttributeValue::S(request_id.clone()))
        .item(
            "requester_user_id",
            AttributeValue::S(requester_user_id.to_string()),
        )
        .item("shift_date", AttributeValue::S(req.shift_date.clone()))
        .item(
            "shift_period",
            AttributeValue::S(req.shift_period.as_str().to_string()),
        )
        .item(
            "status",
            AttributeValue::S(SwapStatus::Pending.as_str().to_string()),
        )
        .item("created_at", AttributeValue::S(now.clone()));

    if let Some(target) = &req.target_user_id {
        put_request = put_request.item("target_user_id", AttributeValue::S(target.clone()));
    }
    if let Some(reason) = &req.reason {
        put_request = put_request.item("reason", AttributeValue::S(reason.clone()));
    }

    put_request.send().await?;

    tracing::info!(
        "Swap request created: {} by {} for {} {}",
        request_id,
        requester_user_id,
        req.shift_date,
        req.shift_period.as_str()
    );

    let request = SwapRequest {
        request_id,
        hospital_id: hospital_id.to_string(),
        requester_user_id: requester_user_id.to_string(),
        shift_date: req.shift_date,
        shift_period: req.shift_period,
        target_user_id: req.target_user_id,
        reason: req.reason,
        status: SwapStatus::Pending,
        created_at: now,
        handled_at: None,
    };

    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&request)?.into())
        .map_err(Box::new)?)
}

/// List swap requests, filtered and newest first
pub async fn list_swaps(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    caller_user_id: &str,
    params: &ListSwapsParams,
) -> Result<Response<Body>, Error> {
    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(
            ":pk",
            AttributeValue::S(format!("HOSPITAL#{}", hospital_id)),
        )
        .expression_attribute_values(":sk_prefix", AttributeValue::S("SWAP#".to_string()))
        .send()
        .await?;

    let mut requests: Vec<SwapRequest> = result
        .items()
        .iter()
        .filter_map(|item| swap_from_item(hospital_id, item))
        .filter(|r| list_filter(r, caller_user_id, params))
        .collect();

    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    if params.limit > 0 {
        requests.truncate(params.limit);
    }

    let names = crate::roster::member_names(client, table_name, hospital_id).await?;
    let body: Vec<serde_json::Value> = requests.iter().map(|r| with_names(r, &names)).collect();

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&body)?.into())
        .map_err(Box::new)?)
}

/// One request with display names
pub async fn get_swap(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    request_id: &str,
) -> Result<Response<Body>, Error> {
    let request = match load_swap(client, table_name, hospital_id, request_id).await? {
        Some(r) => r,
        None => return not_found(),
    };

    let names = crate::roster::member_names(client, table_name, hospital_id).await?;
    let body = with_names(&request, &names);

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&body)?.into())
        .map_err(Box::new)?)
}

/// Self-service accept: a doctor volunteers to take the shift. Registers
/// interest only; status stays pending and the schedule is untouched until an
/// admin approves.
pub async fn register_interest(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    request_id: &str,
    caller_user_id: &str,
) -> Result<Response<Body>, Error> {
    let request = match load_swap(client, table_name, hospital_id, request_id).await? {
        Some(r) => r,
        None => return not_found(),
    };

    if let Err(message) = interest_check(&request, caller_user_id) {
        return conflict(message);
    }

    // Conditional so a concurrent approval or a second volunteer loses cleanly
    let result = client
        .update_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(format!("HOSPITAL#{}", hospital_id)))
        .key("SK", AttributeValue::S(swap_sk(request_id)))
        .update_expression("SET target_user_id = :caller")
        .condition_expression(
            "#status = :pending AND (attribute_not_exists(target_user_id) OR target_user_id = :caller)",
        )
        .expression_attribute_names("#status", "status")
        .expression_attribute_values(
            ":pending",
            AttributeValue::S(SwapStatus::Pending.as_str().to_string()),
        )
        .expression_attribute_values(":caller", AttributeValue::S(caller_user_id.to_string()))
        .send()
        .await;

    if let Err(e) = result {
        let error_message = format!("{:?}", e);
        if error_message.contains("ConditionalCheckFailed") {
            return conflict("This request is no longer open");
        }
        return Err(e.into());
    }

    tracing::info!(
        "Interest registered: {} on request {}",
        caller_user_id,
        request_id
    );

    get_swap(client, table_name, hospital_id, request_id).await
}

/// Approve: the single authoritative transition. In one transaction the
/// request goes terminal, the shift row moves to the new doctor, and the new
/// doctor's availability announcements for that date are cleared.
pub async fn approve_swap(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    request_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: ApproveSwapRequest = if body.is_empty() {
        ApproveSwapRequest::default()
    } else {
        match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(e) => return bad_request(format!("Invalid request body: {}", e)),
        }
    };

    let request = match load_swap(client, table_name, hospital_id, request_id).await? {
        Some(r) => r,
        None => return not_found(),
    };

    if request.status.is_terminal() {
        return conflict("This request has already been handled");
    }

    let final_target = match req.target_user_id.or(request.target_user_id.clone()) {
        Some(t) => t,
        None => return bad_request("Select a doctor to take the shift".to_string()),
    };
    if final_target == request.requester_user_id {
        return bad_request("The shift already belongs to this doctor".to_string());
    }
    if crate::roster::membership_in(client, table_name, hospital_id, &final_target)
        .await?
        .is_none()
    {
        return bad_request("The chosen doctor is not on this hospital's roster".to_string());
    }

    let pk = format!("HOSPITAL#{}", hospital_id);
    let now = chrono::Utc::now().to_rfc3339();

    let mut items: Vec<TransactWriteItem> = Vec::new();

    // 1. Request row goes terminal, first writer wins
    let approve = Update::builder()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(swap_sk(request_id)))
        .update_expression(
            "SET #status = :approved, target_user_id = :target, handled_at = :now",
        )
        .condition_expression("#status = :pending")
        .expression_attribute_names("#status", "status")
        .expression_attribute_values(
            ":approved",
            AttributeValue::S(SwapStatus::Approved.as_str().to_string()),
        )
        .expression_attribute_values(
            ":pending",
            AttributeValue::S(SwapStatus::Pending.as_str().to_string()),
        )
        .expression_attribute_values(":target", AttributeValue::S(final_target.clone()))
        .expression_attribute_values(":now", AttributeValue::S(now.clone()))
        .build()?;
    items.push(TransactWriteItem::builder().update(approve).build());

    // 2. The source shift row must still exist, and moves away from the requester
    let old_shift_sk = format!(
        "SHIFT#{}#{}#{}",
        request.shift_date,
        request.shift_period.as_str(),
        request.requester_user_id
    );
    let remove_old = Delete::builder()
        .table_name(table_name)
        .key("PK", AttributeValue::S(pk.clone()))
        .key("SK", AttributeValue::S(old_shift_sk))
        .condition_expression("attribute_exists(PK)")
        .build()?;
    items.push(TransactWriteItem::builder().delete(remove_old).build());

    // 3. The new doctor must not already hold this slot
    let mut shift_item = HashMap::new();
    shift_item.insert("PK".to_string(), AttributeValue::S(pk.clone()));
    shift_item.insert(
        "SK".to_string(),
        AttributeValue::S(format!(
            "SHIFT#{}#{}#{}",
            request.shift_date,
            request.shift_period.as_str(),
            final_target
        )),
    );
    shift_item.insert("date".to_string(), AttributeValue::S(request.shift_date.clone()));
    shift_item.insert(
        "period".to_string(),
        AttributeValue::S(request.shift_period.as_str().to_string()),
    );
    shift_item.insert(
        "doctor_user_id".to_string(),
        AttributeValue::S(final_target.clone()),
    );
    shift_item.insert("created_at".to_string(), AttributeValue::S(now.clone()));

    let put_new = Put::builder()
        .table_name(table_name)
        .set_item(Some(shift_item))
        .condition_expression("attribute_not_exists(PK)")
        .build()?;
    items.push(TransactWriteItem::builder().put(put_new).build());

    // 4. The new doctor's availability announcements for the date are consumed
    let avail_keys = crate::availability::user_day_keys(
        client,
        table_name,
        hospital_id,
        &request.shift_date,
        &final_target,
    )
    .await?;
    for sk in avail_keys {
        let delete = Delete::builder()
            .table_name(table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(sk))
            .build()?;
        items.push(TransactWriteItem::builder().delete(delete).build());
    }

    let result = client
        .transact_write_items()
        .set_transact_items(Some(items))
        .send()
        .await;

    if let Err(e) = result {
        let error_message = format!("{:?}", e);
        tracing::warn!("Swap approval transaction failed: {}", error_message);
        if error_message.contains("ConditionalCheckFailed")
            || error_message.contains("TransactionCanceled")
        {
            return conflict(
                "Could not approve: the request was already handled, the source shift changed, or the doctor is already on duty for this period",
            );
        }
        return Err(e.into());
    }

    tracing::info!(
        "Swap approved: request {} shift {} {} -> {}",
        request_id,
        request.shift_date,
        request.requester_user_id,
        final_target
    );

    get_swap(client, table_name, hospital_id, request_id).await
}

/// Reject (admin) or decline (targeted doctor)
pub async fn reject_swap(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    request_id: &str,
    caller_user_id: &str,
    caller_is_admin: bool,
) -> Result<Response<Body>, Error> {
    let request = match load_swap(client, table_name, hospital_id, request_id).await? {
        Some(r) => r,
        None => return not_found(),
    };

    if !can_reject(&request, caller_user_id, caller_is_admin) {
        return Ok(Response::builder()
            .status(StatusCode::FORBIDDEN)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(
                serde_json::json!({"error": "Only an admin or the targeted doctor can reject"})
                    .to_string()
                    .into(),
            )
            .map_err(Box::new)?);
    }

    finalize(client, table_name, hospital_id, request_id, SwapStatus::Rejected).await
}

/// Cancel by the requester
pub async fn cancel_swap(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    request_id: &str,
    caller_user_id: &str,
) -> Result<Response<Body>, Error> {
    let request = match load_swap(client, table_name, hospital_id, request_id).await? {
        Some(r) => r,
        None => return not_found(),
    };

    if request.requester_user_id != caller_user_id {
        return Ok(Response::builder()
            .status(StatusCode::FORBIDDEN)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(
                serde_json::json!({"error": "Only the requester can cancel"})
                    .to_string()
                    .into(),
            )
            .map_err(Box::new)?);
    }

    finalize(client, table_name, hospital_id, request_id, SwapStatus::Cancelled).await
}

/// Terminal transition without schedule side effects, conditional on pending.
async fn finalize(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    request_id: &str,
    status: SwapStatus,
) -> Result<Response<Body>, Error> {
    let now = chrono::Utc::now().to_rfc3339();

    let result = client
        .update_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(format!("HOSPITAL#{}", hospital_id)))
        .key("SK", AttributeValue::S(swap_sk(request_id)))
        .update_expression("SET #status = :status, handled_at = :now")
        .condition_expression("#status = :pending")
        .expression_attribute_names("#status", "status")
        .expression_attribute_values(":status", AttributeValue::S(status.as_str().to_string()))
        .expression_attribute_values(
            ":pending",
            AttributeValue::S(SwapStatus::Pending.as_str().to_string()),
        )
        .expression_attribute_values(":now", AttributeValue::S(now))
        .send()
        .await;

    if let Err(e) = result {
        let error_message = format!("{:?}", e);
        if error_message.contains("ConditionalCheckFailed") {
            return conflict("This request has already been handled");
        }
        return Err(e.into());
    }

    tracing::info!("Swap {}: request {}", status.as_str(), request_id);

    get_swap(client, table_name, hospital_id, request_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: SwapStatus, target: Option<&str>) -> SwapRequest {
        SwapRequest {
            request_id: "r1".to_string(),
            hospital_id: "h1".to_string(),
            requester_user_id: "requester".to_string(),
            shift_date: "2026-03-14".to_string(),
            shift_period: Period::Night,
            target_user_id: target.map(|s| s.to_string()),
            reason: None,
            status,
            created_at: "2026-03-01T10:00:00+00:00".to_string(),
            handled_at: None,
        }
    }

    #[test]
    fn test_interest_allowed_on_open_pending_request() {
        assert!(interest_check(&request(SwapStatus::Pending, None), "doc-2").is_ok());
        assert!(interest_check(&request(SwapStatus::Pending, Some("doc-2")), "doc-2").is_ok());
    }

    #[test]
    fn test_interest_blocked_on_terminal_request() {
        // Once terminal, no further self-service accept of any kind
        for status in [SwapStatus::Approved, SwapStatus::Rejected, SwapStatus::Cancelled] {
            assert!(interest_check(&request(status, None), "doc-2").is_err());
            assert!(interest_check(&request(status, Some("doc-2")), "doc-2").is_err());
        }
    }

    #[test]
    fn test_interest_blocked_for_requester_and_other_targets() {
        assert!(interest_check(&request(SwapStatus::Pending, None), "requester").is_err());
        assert!(interest_check(&request(SwapStatus::Pending, Some("doc-3")), "doc-2").is_err());
    }

    #[test]
    fn test_reject_permissions() {
        let open = request(SwapStatus::Pending, None);
        assert!(can_reject(&open, "anyone", true));
        assert!(!can_reject(&open, "doc-2", false));

        let targeted = request(SwapStatus::Pending, Some("doc-2"));
        assert!(can_reject(&targeted, "doc-2", false));
        assert!(!can_reject(&targeted, "doc-3", false));
    }

    #[test]
    fn test_list_filter_inbox() {
        let params = ListSwapsParams {
            inbox: true,
            ..Default::default()
        };

        // Open pending request from someone else: in the inbox
        assert!(list_filter(&request(SwapStatus::Pending, None), "doc-2", &params));
        // Targeted at the caller: in the inbox
        assert!(list_filter(&request(SwapStatus::Pending, Some("doc-2")), "doc-2", &params));
        // Targeted elsewhere, own request, or terminal: not in the inbox
        assert!(!list_filter(&request(SwapStatus::Pending, Some("doc-3")), "doc-2", &params));
        assert!(!list_filter(&request(SwapStatus::Pending, None), "requester", &params));
        assert!(!list_filter(&request(SwapStatus::Approved, None), "doc-2", &params));
    }

    #[test]
    fn test_list_filter_mine_and_status() {
        let params = ListSwapsParams {
            mine: true,
            status: Some(SwapStatus::Pending),
            ..Default::default()
        };

        assert!(list_filter(&request(SwapStatus::Pending, None), "requester", &params));
        assert!(!list_filter(&request(SwapStatus::Pending, None), "doc-2", &params));
        assert!(!list_filter(&request(SwapStatus::Approved, None), "requester", &params));
    }

    #[test]
    fn test_list_filter_since() {
        let params = ListSwapsParams {
            since: Some("2026-03-10T00:00:00+00:00".to_string()),
            ..Default::default()
        };

        let mut old = request(SwapStatus::Pending, None);
        old.created_at = "2026-02-01T10:00:00+00:00".to_string();
        assert!(!list_filter(&old, "doc-2", &params));

        let mut fresh = request(SwapStatus::Pending, None);
        fresh.created_at = "2026-03-12T10:00:00+00:00".to_string();
        assert!(list_filter(&fresh, "doc-2", &params));
    }

    #[test]
    fn test_swap_from_item_round_trip() {
        let mut item = HashMap::new();
        item.insert("PK".to_string(), AttributeValue::S("HOSPITAL#h1".to_string()));
        item.insert("SK".to_string(), AttributeValue::S("SWAP#r1".to_string()));
        item.insert(
            "requester_user_id".to_string(),
            AttributeValue::S("requester".to_string()),
        );
        item.insert("shift_date".to_string(), AttributeValue::S("2026-03-14".to_string()));
        item.insert("shift_period".to_string(), AttributeValue::S("night".to_string()));
        item.insert("status".to_string(), AttributeValue::S("pending".to_string()));
        item.insert(
            "created_at".to_string(),
            AttributeValue::S("2026-03-01T10:00:00+00:00".to_string()),
        );

        let parsed = swap_from_item("h1", &item).unwrap();
        assert_eq!(parsed.request_id, "r1");
        assert_eq!(parsed.shift_period, Period::Night);
        assert_eq!(parsed.status, SwapStatus::Pending);
        assert_eq!(parsed.target_user_id, None);
        assert_eq!(parsed.handled_at, None);

        // Unknown status strings are not silently coerced
        item.insert("status".to_string(), AttributeValue::S("aprovado".to_string()));
        assert!(swap_from_item("h1", &item).is_none());
    }
}
