use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, TransactWriteItem};
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::NaiveDate;
use lambda_http::{http::StatusCode, Body, Error, Response};
use std::collections::HashMap;

use crate::types::{Availability, BulkAvailabilityRequest, Period, SetAvailabilityRequest};

fn avail_sk(date: &str, user_id: &str, period: Period) -> String {
    format!("AVAIL#{}#{}#{}", date, user_id, period.as_str())
}

fn avail_from_sk(hospital_id: &str, sk: &str) -> Option<Availability> {
    let rest = sk.strip_prefix("AVAIL#")?;
    let mut parts = rest.splitn(3, '#');
    let date = parts.next()?.to_string();
    let user_id = parts.next()?.to_string();
    let period = Period::parse(parts.next()?)?;
    Some(Availability {
        hospital_id: hospital_id.to_string(),
        user_id,
        date,
        period,
    })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Announcements are per-period subsets of morning/afternoon/night; a full-day
/// announcement does not exist.
fn validate_periods(periods: &[Period]) -> Result<(), String> {
    let mut seen = Vec::new();
    for p in periods {
        if !Period::ANNOUNCEABLE.contains(p) {
            return Err(format!("Period {} cannot be announced", p.as_str()));
        }
        if seen.contains(p) {
            return Err(format!("Period {} appears twice", p.as_str()));
        }
        seen.push(*p);
    }
    Ok(())
}

fn bad_request(message: String) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}

async fn query_avail_keys(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    sk_prefix: &str,
) -> Result<Vec<String>, Error> {
    let pk = format!("HOSPITAL#{}", hospital_id);

    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(":pk", AttributeValue::S(pk))
        .expression_attribute_values(":sk_prefix", AttributeValue::S(sk_prefix.to_string()))
        .send()
        .await?;

    let mut keys = Vec::new();
    for item in result.items() {
        if let Some(sk) = item.get("SK").and_then(|v| v.as_s().ok()) {
            keys.push(sk.to_string());
        }
    }
    Ok(keys)
}

/// Sort keys of one user's announcements for a date. The swap approval uses
/// this to clear the incoming doctor's announcements inside its transaction.
pub(crate) async fn user_day_keys(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    date: &str,
    user_id: &str,
) -> Result<Vec<String>, Error> {
    let keys = query_avail_keys(
        client,
        table_name,
        hospital_id,
        &format!("AVAIL#{}#", date),
    )
    .await?;

    Ok(keys
        .into_iter()
        .filter(|sk| {
            avail_from_sk(hospital_id, sk)
                .map(|a| a.user_id == user_id)
                .unwrap_or(false)
        })
        .collect())
}

/// Replace one user's announcement set for a date in a single transaction.
async fn replace_user_day(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    user_id: &str,
    date: &str,
    periods: &[Period],
) -> Result<(), Error> {
    let existing = user_day_keys(client, table_name, hospital_id, date, user_id).await?;

    let pk = format!("HOSPITAL#{}", hospital_id);
    let now = chrono::Utc::now().to_rfc3339();

    let new_keys: Vec<String> = periods.iter().map(|p| avail_sk(date, user_id, *p)).collect();

    let mut items: Vec<TransactWriteItem> = Vec::new();

    for sk in existing.iter().filter(|sk| !new_keys.contains(*sk)) {
        let delete = Delete::builder()
            .table_name(table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(sk.clone()))
            .build()?;
        items.push(TransactWriteItem::builder().delete(delete).build());
    }

    for period in periods {
        let mut item = HashMap::new();
        item.insert("PK".to_string(), AttributeValue::S(pk.clone()));
        item.insert(
            "SK".to_string(),
            AttributeValue::S(avail_sk(date, user_id, *period)),
        );
        item.insert("date".to_string(), AttributeValue::S(date.to_string()));
        item.insert("user_id".to_string(), AttributeValue::S(user_id.to_string()));
        item.insert(
            "period".to_string(),
            AttributeValue::S(period.as_str().to_string()),
        );
        item.insert("created_at".to_string(), AttributeValue::S(now.clone()));

        let put = Put::builder()
            .table_name(table_name)
            .set_item(Some(item))
            .build()?;
        items.push(TransactWriteItem::builder().put(put).build());
    }

    if items.is_empty() {
        return Ok(());
    }

    client
        .transact_write_items()
        .set_transact_items(Some(items))
        .send()
        .await?;

    Ok(())
}

/// Every announcement for a date (the editor's badge table)
pub async fn list_day(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    date: &str,
) -> Result<Response<Body>, Error> {
    if parse_date(date).is_none() {
        return bad_request(format!("Invalid date: {}", date));
    }

    let keys = query_avail_keys(
        client,
        table_name,
        hospital_id,
        &format!("AVAIL#{}#", date),
    )
    .await?;

    let entries: Vec<Availability> = keys
        .iter()
        .filter_map(|sk| avail_from_sk(hospital_id, sk))
        .collect();

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&entries)?.into())
        .map_err(Box::new)?)
}

/// The calling doctor's announcements for a month
pub async fn list_month_for_user(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    user_id: &str,
    month: &str,
) -> Result<Response<Body>, Error> {
    if month.len() != 7 || NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").is_err()
    {
        return bad_request(format!("Invalid month: {}", month));
    }

    let keys = query_avail_keys(
        client,
        table_name,
        hospital_id,
        &format!("AVAIL#{}-", month),
    )
    .await?;

    let entries: Vec<Availability> = keys
        .iter()
        .filter_map(|sk| avail_from_sk(hospital_id, sk))
        .filter(|a| a.user_id == user_id)
        .collect();

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&entries)?.into())
        .map_err(Box::new)?)
}

/// Replace the caller's announcement set for a date
pub async fn set_day(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    user_id: &str,
    date: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    if parse_date(date).is_none() {
        return bad_request(format!("Invalid date: {}", date));
    }

    let req: SetAvailabilityRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };

    if let Err(message) = validate_periods(&req.periods) {
        return bad_request(message);
    }

    replace_user_day(client, table_name, hospital_id, user_id, date, &req.periods).await?;

    tracing::info!(
        "Availability set: user {} date {} ({} periods)",
        user_id,
        date,
        req.periods.len()
    );

    let entries: Vec<Availability> = req
        .periods
        .iter()
        .map(|p| Availability {
            hospital_id: hospital_id.to_string(),
            user_id: user_id.to_string(),
            date: date.to_string(),
            period: *p,
        })
        .collect();

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&entries)?.into())
        .map_err(Box::new)?)
}

/// Apply one announcement set to many dates, one transaction per date
pub async fn set_bulk(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    user_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: BulkAvailabilityRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };

    if req.dates.is_empty() {
        return bad_request("No dates given".to_string());
    }
    if let Err(message) = validate_periods(&req.periods) {
        return bad_request(message);
    }
    for date in &req.dates {
        if parse_date(date).is_none() {
            return bad_request(format!("Invalid date: {}", date));
        }
    }

    for date in &req.dates {
        replace_user_day(client, table_name, hospital_id, user_id, date, &req.periods).await?;
    }

    tracing::info!(
        "Availability bulk applied: user {} over {} dates",
        user_id,
        req.dates.len()
    );

    let body = serde_json::json!({
        "dates": req.dates,
        "periods": req.periods,
    });

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&body)?.into())
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avail_sk_round_trip() {
        let sk = avail_sk("2026-03-14", "user-1", Period::Morning);
        assert_eq!(sk, "AVAIL#2026-03-14#user-1#morning");
        let parsed = avail_from_sk("h1", &sk).unwrap();
        assert_eq!(parsed.date, "2026-03-14");
        assert_eq!(parsed.user_id, "user-1");
        assert_eq!(parsed.period, Period::Morning);
    }

    #[test]
    fn test_validate_periods_rejects_full_day() {
        assert!(validate_periods(&[Period::FullDay]).is_err());
        assert!(validate_periods(&[Period::Morning, Period::FullDay]).is_err());
    }

    #[test]
    fn test_validate_periods_rejects_duplicates() {
        assert!(validate_periods(&[Period::Night, Period::Night]).is_err());
    }

    #[test]
    fn test_validate_periods_accepts_subsets() {
        assert!(validate_periods(&[]).is_ok());
        assert!(validate_periods(&[Period::Morning]).is_ok());
        assert!(
            validate_periods(&[Period::Morning, Period::Afternoon, Period::Night]).is_ok()
        );
    }
}
