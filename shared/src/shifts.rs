use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, TransactWriteItem};
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::{Datelike, NaiveDate};
use lambda_http::{http::StatusCode, Body, Error, Response};
use std::collections::{BTreeMap, HashMap};

use crate::types::{
    CopyDayRequest, CopyMonthRequest, Period, ReplaceDayRequest, Shift, ShiftAssignment,
};

fn shift_sk(date: &str, period: Period, doctor_user_id: &str) -> String {
    format!("SHIFT#{}#{}#{}", date, period.as_str(), doctor_user_id)
}

/// Parse a shift row back out of its sort key.
fn shift_from_sk(hospital_id: &str, sk: &str) -> Option<Shift> {
    let rest = sk.strip_prefix("SHIFT#")?;
    let mut parts = rest.splitn(3, '#');
    let date = parts.next()?.to_string();
    let period = Period::parse(parts.next()?)?;
    let doctor_user_id = parts.next()?.to_string();
    Some(Shift {
        hospital_id: hospital_id.to_string(),
        date,
        period,
        doctor_user_id,
        doctor_name: None,
    })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// "YYYY-MM" -> (year, month)
fn parse_month(s: &str) -> Option<(i32, u32)> {
    let (y, m) = s.split_once('-')?;
    if y.len() != 4 || m.len() != 2 {
        return None;
    }
    let year: i32 = y.parse().ok()?;
    let month: u32 = m.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((year, month))
}

/// Capacity and duplicate validation for one day's worth of assignments.
fn validate_day_assignments(shifts: &[ShiftAssignment]) -> Result<(), String> {
    let mut per_period: BTreeMap<Period, Vec<&str>> = BTreeMap::new();
    for a in shifts {
        if a.doctor_user_id.is_empty() {
            return Err("Assignment with empty doctor".to_string());
        }
        per_period
            .entry(a.period)
            .or_default()
            .push(&a.doctor_user_id);
    }

    for (period, doctors) in &per_period {
        if doctors.len() > period.capacity() {
            return Err(format!(
                "Period {} allows at most {} doctors",
                period.as_str(),
                period.capacity()
            ));
        }
        let mut seen = doctors.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != doctors.len() {
            return Err(format!(
                "The same doctor appears twice in period {}",
                period.as_str()
            ));
        }
    }

    Ok(())
}

/// Per-day, per-period assignment counts for the month calendar badges.
/// Every date that has at least one shift gets all four period keys.
fn period_counts(shifts: &[Shift]) -> BTreeMap<String, BTreeMap<&'static str, u32>> {
    let mut counts: BTreeMap<String, BTreeMap<&'static str, u32>> = BTreeMap::new();
    for shift in shifts {
        let day = counts.entry(shift.date.clone()).or_insert_with(|| {
            Period::ALL.iter().map(|p| (p.as_str(), 0)).collect()
        });
        *day.entry(shift.period.as_str()).or_insert(0) += 1;
    }
    counts
}

async fn query_shift_keys(
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

/// Destructive replace of one day's shift rows, in a single transaction:
/// everything not in the new plan is deleted, everything in the plan is put.
/// A failure leaves the day exactly as it was.
async fn replace_day_rows(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    date: &str,
    assignments: &[ShiftAssignment],
) -> Result<(), Error> {
    let existing = query_shift_keys(
        client,
        table_name,
        hospital_id,
        &format!("SHIFT#{}#", date),
    )
    .await?;

    let pk = format!("HOSPITAL#{}", hospital_id);
    let now = chrono::Utc::now().to_rfc3339();

    let new_keys: Vec<String> = assignments
        .iter()
        .map(|a| shift_sk(date, a.period, &a.doctor_user_id))
        .collect();

    let mut items: Vec<TransactWriteItem> = Vec::new();

    // A key cannot appear twice in one transaction, so rows that survive the
    // replace are only put (the put overwrites), never delete+put.
    for sk in existing.iter().filter(|sk| !new_keys.contains(*sk)) {
        let delete = Delete::builder()
            .table_name(table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(sk.clone()))
            .build()?;
        items.push(TransactWriteItem::builder().delete(delete).build());
    }

    for a in assignments {
        let mut item = HashMap::new();
        item.insert("PK".to_string(), AttributeValue::S(pk.clone()));
        item.insert(
            "SK".to_string(),
            AttributeValue::S(shift_sk(date, a.period, &a.doctor_user_id)),
        );
        item.insert("date".to_string(), AttributeValue::S(date.to_string()));
        item.insert(
            "period".to_string(),
            AttributeValue::S(a.period.as_str().to_string()),
        );
        item.insert(
            "doctor_user_id".to_string(),
            AttributeValue::S(a.doctor_user_id.clone()),
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

async fn load_shifts(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    sk_prefix: &str,
) -> Result<Vec<Shift>, Error> {
    let keys = query_shift_keys(client, table_name, hospital_id, sk_prefix).await?;
    let names = crate::roster::member_names(client, table_name, hospital_id).await?;

    let mut shifts: Vec<Shift> = keys
        .iter()
        .filter_map(|sk| shift_from_sk(hospital_id, sk))
        .map(|mut s| {
            s.doctor_name = names.get(&s.doctor_user_id).cloned();
            s
        })
        .collect();

    shifts.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.period.cmp(&b.period)));
    Ok(shifts)
}

fn bad_request(message: String) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}

/// One day's assignments
pub async fn get_day(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    date: &str,
) -> Result<Response<Body>, Error> {
    if parse_date(date).is_none() {
        return bad_request(format!("Invalid date: {}", date));
    }

    let shifts = load_shifts(
        client,
        table_name,
        hospital_id,
        &format!("SHIFT#{}#", date),
    )
    .await?;

    let body = serde_json::json!({
        "date": date,
        "shifts": shifts,
    });

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&body)?.into())
        .map_err(Box::new)?)
}

/// A month's assignments plus per-day, per-period counts
pub async fn list_month(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    month: &str,
) -> Result<Response<Body>, Error> {
    if parse_month(month).is_none() {
        return bad_request(format!("Invalid month: {}", month));
    }

    let shifts = load_shifts(
        client,
        table_name,
        hospital_id,
        &format!("SHIFT#{}-", month),
    )
    .await?;

    let counts = period_counts(&shifts);

    let body = serde_json::json!({
        "month": month,
        "shifts": shifts,
        "counts": counts,
    });

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(&body)?.into())
        .map_err(Box::new)?)
}

/// Save the day: destructive replace of every shift row for (hospital, date).
/// An empty selection leaves the day with zero rows.
pub async fn replace_day(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    date: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    if parse_date(date).is_none() {
        return bad_request(format!("Invalid date: {}", date));
    }

    let req: ReplaceDayRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };

    if let Err(message) = validate_day_assignments(&req.shifts) {
        return bad_request(message);
    }

    replace_day_rows(client, table_name, hospital_id, date, &req.shifts).await?;

    tracing::info!(
        "Day replaced: hospital {} date {} ({} shifts)",
        hospital_id,
        date,
        req.shifts.len()
    );

    get_day(client, table_name, hospital_id, date).await
}

/// Clear every shift row for the day
pub async fn clear_day(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    date: &str,
) -> Result<Response<Body>, Error> {
    if parse_date(date).is_none() {
        return bad_request(format!("Invalid date: {}", date));
    }

    replace_day_rows(client, table_name, hospital_id, date, &[]).await?;

    tracing::info!("Day cleared: hospital {} date {}", hospital_id, date);

    Ok(Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .body(Body::Empty)
        .map_err(Box::new)?)
}

/// Copy this day's assignments onto another date (destructive replace of the
/// target).
pub async fn copy_day(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    date: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    if parse_date(date).is_none() {
        return bad_request(format!("Invalid date: {}", date));
    }

    let req: CopyDayRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };

    if parse_date(&req.target_date).is_none() {
        return bad_request(format!("Invalid target date: {}", req.target_date));
    }
    if req.target_date == date {
        return bad_request("Target date is the same as the source".to_string());
    }

    let source = query_shift_keys(
        client,
        table_name,
        hospital_id,
        &format!("SHIFT#{}#", date),
    )
    .await?;

    let assignments: Vec<ShiftAssignment> = source
        .iter()
        .filter_map(|sk| shift_from_sk(hospital_id, sk))
        .map(|s| ShiftAssignment {
            period: s.period,
            doctor_user_id: s.doctor_user_id,
        })
        .collect();

    replace_day_rows(client, table_name, hospital_id, &req.target_date, &assignments).await?;

    tracing::info!(
        "Day copied: hospital {} {} -> {} ({} shifts)",
        hospital_id,
        date,
        req.target_date,
        assignments.len()
    );

    get_day(client, table_name, hospital_id, &req.target_date).await
}

/// Copy a month onto another month, remapping day-of-month 1:1.
///
/// Source days with no counterpart in the target month (the 31st into a 30-day
/// month) are dropped; target days with no source counterpart are cleared.
/// The whole operation is a destructive replace of the target month, one
/// transaction per target day.
pub async fn copy_month(
    client: &DynamoClient,
    table_name: &str,
    hospital_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: CopyMonthRequest = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };

    let (source_year, source_month) = match parse_month(&req.source_month) {
        Some(v) => v,
        None => return bad_request(format!("Invalid source month: {}", req.source_month)),
    };
    let (target_year, target_month) = match parse_month(&req.target_month) {
        Some(v) => v,
        None => return bad_request(format!("Invalid target month: {}", req.target_month)),
    };
    if req.source_month == req.target_month {
        return bad_request("Target month is the same as the source".to_string());
    }

    let source_keys = query_shift_keys(
        client,
        table_name,
        hospital_id,
        &format!("SHIFT#{}-", req.source_month),
    )
    .await?;

    // Group the source by day-of-month
    let mut by_day: BTreeMap<u32, Vec<ShiftAssignment>> = BTreeMap::new();
    for shift in source_keys.iter().filter_map(|sk| shift_from_sk(hospital_id, sk)) {
        let day = match parse_date(&shift.date) {
            Some(d) => d.day(),
            None => continue,
        };
        by_day.entry(day).or_default().push(ShiftAssignment {
            period: shift.period,
            doctor_user_id: shift.doctor_user_id,
        });
    }

    let mut copied_days = 0u32;
    let mut dropped_days: Vec<String> = Vec::new();

    for day in 1..=31u32 {
        match NaiveDate::from_ymd_opt(target_year, target_month, day) {
            Some(target_date) => {
                let assignments = by_day.get(&day).cloned().unwrap_or_default();
                let date_str = target_date.format("%Y-%m-%d").to_string();
                replace_day_rows(client, table_name, hospital_id, &date_str, &assignments)
                    .await?;
                if !assignments.is_empty() {
                    copied_days += 1;
                }
            }
            None => {
                // Day does not exist in the target month; source entries for it
                // are silently dropped
                if by_day.contains_key(&day) {
                    if let Some(source_date) =
                        NaiveDate::from_ymd_opt(source_year, source_month, day)
                    {
                        dropped_days.push(source_date.format("%Y-%m-%d").to_string());
                    }
                }
            }
        }
    }

    tracing::info!(
        "Month copied: hospital {} {} -> {} ({} days, {} dropped)",
        hospital_id,
        req.source_month,
        req.target_month,
        copied_days,
        dropped_days.len()
    );

    let body = serde_json::json!({
        "source_month": req.source_month,
        "target_month": req.target_month,
        "copied_days": copied_days,
        "dropped_days": dropped_days,
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

    fn assignment(period: Period, doctor: &str) -> ShiftAssignment {
        ShiftAssignment {
            period,
            doctor_user_id: doctor.to_string(),
        }
    }

    fn shift(date: &str, period: Period, doctor: &str) -> Shift {
        Shift {
            hospital_id: "h1".to_string(),
            date: date.to_string(),
            period,
            doctor_user_id: doctor.to_string(),
            doctor_name: None,
        }
    }

    #[test]
    fn test_shift_sk_round_trip() {
        let sk = shift_sk("2026-03-14", Period::Night, "doc-1");
        assert_eq!(sk, "SHIFT#2026-03-14#night#doc-1");
        let parsed = shift_from_sk("h1", &sk).unwrap();
        assert_eq!(parsed.date, "2026-03-14");
        assert_eq!(parsed.period, Period::Night);
        assert_eq!(parsed.doctor_user_id, "doc-1");
    }

    #[test]
    fn test_validate_rejects_over_capacity() {
        // 7th morning doctor is one too many
        let full: Vec<ShiftAssignment> = (0..7)
            .map(|i| assignment(Period::Morning, &format!("doc-{}", i)))
            .collect();
        assert!(validate_day_assignments(&full).is_err());
        assert!(validate_day_assignments(&full[..6]).is_ok());

        // Night caps at 3
        let night: Vec<ShiftAssignment> = (0..4)
            .map(|i| assignment(Period::Night, &format!("doc-{}", i)))
            .collect();
        assert!(validate_day_assignments(&night).is_err());
        assert!(validate_day_assignments(&night[..3]).is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_doctor_in_period() {
        let shifts = vec![
            assignment(Period::Morning, "doc-1"),
            assignment(Period::Morning, "doc-1"),
        ];
        assert!(validate_day_assignments(&shifts).is_err());

        // Same doctor in different periods is allowed
        let shifts = vec![
            assignment(Period::Morning, "doc-1"),
            assignment(Period::Afternoon, "doc-1"),
        ];
        assert!(validate_day_assignments(&shifts).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_doctor() {
        assert!(validate_day_assignments(&[assignment(Period::Morning, "")]).is_err());
        assert!(validate_day_assignments(&[]).is_ok());
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2026-01"), Some((2026, 1)));
        assert_eq!(parse_month("2026-12"), Some((2026, 12)));
        assert_eq!(parse_month("2026-13"), None);
        assert_eq!(parse_month("2026-1"), None);
        assert_eq!(parse_month("2026"), None);
        assert_eq!(parse_month("garbage"), None);
    }

    #[test]
    fn test_day_31_does_not_exist_in_shorter_months() {
        // January 31st has no counterpart in February; 1..=30 all do in April
        assert!(NaiveDate::from_ymd_opt(2026, 2, 31).is_none());
        assert!(NaiveDate::from_ymd_opt(2026, 4, 31).is_none());
        for day in 1..=30 {
            assert!(NaiveDate::from_ymd_opt(2026, 4, day).is_some());
        }
        // Leap year February keeps day 29
        assert!(NaiveDate::from_ymd_opt(2024, 2, 29).is_some());
        assert!(NaiveDate::from_ymd_opt(2026, 2, 29).is_none());
    }

    #[test]
    fn test_period_counts_match_rows() {
        let shifts = vec![
            shift("2026-01-05", Period::Morning, "doc-1"),
            shift("2026-01-05", Period::Morning, "doc-2"),
            shift("2026-01-05", Period::Night, "doc-3"),
            shift("2026-01-06", Period::FullDay, "doc-1"),
        ];

        let counts = period_counts(&shifts);

        let day5 = &counts["2026-01-05"];
        assert_eq!(day5["morning"], 2);
        assert_eq!(day5["night"], 1);
        assert_eq!(day5["afternoon"], 0);
        assert_eq!(day5["full_day"], 0);

        let day6 = &counts["2026-01-06"];
        assert_eq!(day6["full_day"], 1);
        assert_eq!(day6["morning"], 0);

        assert!(!counts.contains_key("2026-01-07"));

        // Total across the map equals the number of rows
        let total: u32 = counts.values().flat_map(|m| m.values()).sum();
        assert_eq!(total as usize, shifts.len());
    }
}
