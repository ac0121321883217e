//! Per-service payload rewriting.
//!
//! Applied to a proxied request after the target URL is built and before it
//! is handed to the transport.

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, Method, header};
use serde_json::{Map, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::config::PayloadRewrite;

/// Lifetime of a signed storage URL.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum AugmentError {
    #[error("audit-log body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("audit-log body must be a JSON object")]
    NotAnObject,
}

/// A request about to be forwarded.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Request-scoped values the rewrites draw from.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub client_ip: Option<String>,
    pub now: SystemTime,
}

/// Apply a service's rewrite in place.
pub fn apply(
    rewrite: PayloadRewrite,
    request: &mut ForwardRequest,
    caller: &CallerContext,
) -> Result<(), AugmentError> {
    match rewrite {
        PayloadRewrite::None => Ok(()),
        PayloadRewrite::ObjectStorage => {
            append_signed_url_expiry(&mut request.url, caller.now);
            Ok(())
        }
        PayloadRewrite::AuditLog => {
            request.body = augment_audit_log(&request.body, caller)?;
            request
                .headers
                .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
            request.headers.remove(header::CONTENT_LENGTH);
            Ok(())
        }
    }
}

/// Append `Expires=<now + 3600>` to signed-URL queries (`type=query_string`).
///
/// Returns whether the URL was changed.
pub fn append_signed_url_expiry(url: &mut Url, now: SystemTime) -> bool {
    let is_signed_url_query = url
        .query_pairs()
        .any(|(k, v)| k == "type" && v == "query_string");
    if !is_signed_url_query {
        return false;
    }

    let expires = unix_secs(now + SIGNED_URL_TTL);
    url.query_pairs_mut()
        .append_pair("Expires", &expires.to_string());
    true
}

/// Inject `ip`, `date` and `out_biz_id`, overwriting client-supplied values.
pub fn augment_audit_log(body: &[u8], caller: &CallerContext) -> Result<Bytes, AugmentError> {
    let mut record: Map<String, Value> = if body.iter().all(u8::is_ascii_whitespace) {
        Map::new()
    } else {
        match serde_json::from_slice(body)? {
            Value::Object(map) => map,
            _ => return Err(AugmentError::NotAnObject),
        }
    };

    let ip = caller.client_ip.clone().map(Value::String).unwrap_or(Value::Null);
    record.insert("ip".to_string(), ip);
    record.insert("date".to_string(), Value::from(unix_micros(caller.now)));
    record.insert(
        "out_biz_id".to_string(),
        Value::String(Uuid::new_v4().to_string()),
    );

    Ok(Bytes::from(serde_json::to_vec(&Value::Object(record))?))
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn unix_micros(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
