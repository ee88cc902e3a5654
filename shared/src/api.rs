//! Reading the admin API's response envelope.
//!
//! Every endpoint answers `{ status, data, message?, pagination? }`, but
//! the pieces vary: lists come bare, wrapped in a paginator object, or
//! with page counters beside them, and a business refusal can arrive with
//! HTTP 200. This module folds those shapes into [`Listing`] and
//! [`AppError`].

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::capabilities::http::{HttpError, HttpResponse, HttpResult};
use crate::{AppError, ErrorKind};

pub const FORBIDDEN_FALLBACK: &str = "You are not allowed to perform this action.";
pub const VALIDATION_FALLBACK: &str = "Please check your input and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub current_page: Option<u32>,
    pub total_pages: u32,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

/// Number of pages needed for `count` rows, never less than one.
#[must_use]
pub fn total_pages_for(count: u64, per_page: u32) -> u32 {
    if per_page == 0 || count == 0 {
        return 1;
    }
    let pages = count.div_ceil(u64::from(per_page));
    u32::try_from(pages).unwrap_or(u32::MAX).max(1)
}

/// Turns a finished HTTP exchange into the decoded body, or the error the
/// user should see for `action`.
pub fn accept(result: HttpResult, action: &str) -> Result<Value, AppError> {
    let response = result.map_err(|e| from_http_error(&e, action))?;
    if !response.is_success() {
        return Err(error_from_response(&response, action));
    }

    let body = if response.body().iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        response.json::<Value>().map_err(|e| {
            AppError::new(ErrorKind::Deserialization, "The server sent an unreadable reply.")
                .with_internal(e.to_string())
                .with_action(action)
        })?
    };

    if is_rejection(&body) {
        let message = envelope_message(&body).unwrap_or_default();
        return Err(AppError::new(ErrorKind::Rejected, message)
            .with_context("http_status", response.status().to_string())
            .with_action(action));
    }

    Ok(body)
}

/// A `status` of `false`, `"error"` or `"failed"` means the server refused.
#[must_use]
pub fn is_rejection(body: &Value) -> bool {
    match body.get("status") {
        Some(Value::Bool(ok)) => !ok,
        Some(Value::String(s)) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("error") || s.eq_ignore_ascii_case("failed")
        }
        _ => false,
    }
}

fn envelope_message(body: &Value) -> Option<String> {
    ["message", "data"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[must_use]
pub fn from_http_error(err: &HttpError, action: &str) -> AppError {
    let kind = match err {
        HttpError::Timeout { .. } => ErrorKind::Timeout,
        HttpError::ConnectionError { .. } | HttpError::Cancelled { .. } => ErrorKind::Network,
        HttpError::InvalidResponse { .. } => ErrorKind::Deserialization,
        _ => ErrorKind::Internal,
    };
    let mut error = AppError::new(kind, err.to_string()).with_action(action);
    if let Some(id) = err.request_id() {
        error = error.with_context("request_id", id);
    }
    error
}

/// Maps a non-2xx response to an [`AppError`], keeping whatever the body
/// says for the verbatim kinds.
#[must_use]
pub fn error_from_response(response: &HttpResponse, action: &str) -> AppError {
    let status = response.status();
    let body: Value = response.json().unwrap_or(Value::Null);

    let message = match status {
        422 => body
            .get("errors")
            .and_then(join_field_errors)
            .or_else(|| envelope_message(&body))
            .unwrap_or_else(|| VALIDATION_FALLBACK.to_string()),
        403 => {
            let mut text = envelope_message_for_forbidden(&body)
                .unwrap_or_else(|| FORBIDDEN_FALLBACK.to_string());
            if let Some(name) = body
                .pointer("/opened_category/name")
                .and_then(Value::as_str)
            {
                text.push_str("\nCategory already opened: ");
                text.push_str(name);
            }
            text
        }
        _ => envelope_message(&body).unwrap_or_else(|| format!("HTTP error: {status}")),
    };

    AppError::from_http_status(status, message)
        .with_context("request_id", response.request_id())
        .with_action(action)
}

fn envelope_message_for_forbidden(body: &Value) -> Option<String> {
    ["data", "message"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Joins a Laravel-style `errors` map: each field's messages separated by
/// spaces, one field per line.
#[must_use]
pub fn join_field_errors(errors: &Value) -> Option<String> {
    let map = errors.as_object()?;
    let lines: Vec<String> = map
        .values()
        .filter_map(|messages| match messages {
            Value::Array(list) => {
                let parts: Vec<&str> = list.iter().filter_map(Value::as_str).collect();
                (!parts.is_empty()).then(|| parts.join(" "))
            }
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        })
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Decodes a list response in any of the shapes the API uses. Missing
/// paging metadata means a single page holding every returned record.
pub fn decode_list<T: DeserializeOwned>(body: &Value) -> Result<Listing<T>, AppError> {
    let data = body.get("data").unwrap_or(&Value::Null);

    let (raw, paginator) = match data {
        Value::Object(page) if page.get("data").is_some_and(Value::is_array) => {
            (page.get("data"), Some(page))
        }
        Value::Array(_) => (Some(data), None),
        Value::Null if body.is_array() => (Some(body), None),
        _ => (None, None),
    };
    let raw = raw.and_then(Value::as_array).ok_or_else(|| {
        AppError::new(ErrorKind::Deserialization, "The server sent an unexpected list.")
            .with_internal("response carries no record array")
    })?;

    let items = decode_items::<T>(raw)?;

    let returned = items.len() as u64;
    let meta = if let Some(page) = paginator {
        PageMeta {
            current_page: page.get("current_page").and_then(lenient_u32),
            total_pages: page.get("last_page").and_then(lenient_u32).unwrap_or(1),
            total_count: page.get("total").and_then(lenient_u64).unwrap_or(returned),
        }
    } else if let Some(pagination) = body.get("pagination").filter(|p| p.is_object()) {
        PageMeta {
            current_page: pagination.get("current_page").and_then(lenient_u32),
            total_pages: pagination
                .get("total_pages")
                .and_then(lenient_u32)
                .unwrap_or(1),
            total_count: pagination
                .get("total")
                .and_then(lenient_u64)
                .unwrap_or(returned),
        }
    } else if let Some(pages) = body.get("total_pages").and_then(lenient_u32) {
        PageMeta {
            current_page: body.get("current_page").and_then(lenient_u32),
            total_pages: pages,
            total_count: body
                .get("total_records")
                .and_then(lenient_u64)
                .unwrap_or(returned),
        }
    } else {
        debug!(returned, "list response has no paging metadata");
        PageMeta {
            current_page: None,
            total_pages: 1,
            total_count: returned,
        }
    };

    Ok(Listing {
        items,
        meta: PageMeta {
            total_pages: meta.total_pages.max(1),
            ..meta
        },
    })
}

fn decode_items<T: DeserializeOwned>(raw: &[Value]) -> Result<Vec<T>, AppError> {
    raw.iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<T>(item.clone()).map_err(|e| {
                AppError::new(ErrorKind::Deserialization, "The server sent an unexpected record.")
                    .with_internal(format!("record {index}: {e}"))
            })
        })
        .collect()
}

/// Decodes an unpaged record array found somewhere other than `data`,
/// such as a report's `data.all_results`.
pub fn decode_array<T: DeserializeOwned>(raw: Option<&Value>) -> Result<Listing<T>, AppError> {
    let raw = raw.and_then(Value::as_array).ok_or_else(|| {
        AppError::new(ErrorKind::Deserialization, "The server sent an unexpected list.")
            .with_internal("response carries no record array where one was expected")
    })?;
    let items = decode_items::<T>(raw)?;
    Ok(Listing {
        meta: PageMeta {
            current_page: None,
            total_pages: 1,
            total_count: items.len() as u64,
        },
        items,
    })
}

/// Decodes a detail response: the record sits in `data`, or is the body.
pub fn decode_record<T: DeserializeOwned>(body: &Value) -> Result<T, AppError> {
    let record = match body.get("data") {
        Some(data) if data.is_object() => data,
        _ => body,
    };
    serde_json::from_value(record.clone()).map_err(|e| {
        AppError::new(ErrorKind::Deserialization, "The server sent an unexpected record.")
            .with_internal(e.to_string())
    })
}

#[must_use]
pub fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[must_use]
pub fn lenient_u32(value: &Value) -> Option<u32> {
    lenient_u64(value).and_then(|n| u32::try_from(n).ok())
}

/// `deserialize_with` helpers for fields the API sends with loose types.
pub mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Any scalar as display text; `null` becomes the empty string.
    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(scalar_text(&Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(scalar_text(&Value::deserialize(d)?))
    }

    /// `true`/`false`, `1`/`0` and their string forms.
    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let value = Value::deserialize(d)?;
        match &value {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "active" => Ok(true),
                "0" | "false" | "no" | "inactive" | "" => Ok(false),
                other => Err(serde::de::Error::custom(format!("not a flag: {other}"))),
            },
            Value::Null => Ok(false),
            _ => Err(serde::de::Error::custom("not a flag")),
        }
    }

    /// A whole number or its string form; empty and `null` read as zero.
    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        match Value::deserialize(d)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(|| serde::de::Error::custom(format!("not an integer: {n}"))),
            Value::String(s) if s.trim().is_empty() => Ok(0),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("not an integer: {s}"))),
            Value::Null => Ok(0),
            _ => Err(serde::de::Error::custom("not an integer")),
        }
    }

    /// A number, a numeric string, or nothing.
    pub fn opt_amount<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Value::deserialize(d)? {
            Value::Number(n) => Ok(n.as_f64()),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("not an amount: {s}"))),
            Value::Null => Ok(None),
            _ => Err(serde::de::Error::custom("not an amount")),
        }
    }

    #[must_use]
    pub fn scalar_text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}
