//! Request sanitization.
//!
//! Strips operator-like keys (`$gt`, `a.b`) from query strings and JSON bodies
//! and HTML-escapes angle brackets in string values, so neither a storage
//! query nor a rendered page downstream sees them raw.

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::uri::{PathAndQuery, Uri};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::debug;

use crate::errors::AppError;

/// Largest JSON body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

fn forbidden_key(key: &str) -> bool {
    key.starts_with('$') || key.contains('.') || key.contains("[$")
}

fn escape_markup(value: &str) -> Option<String> {
    if !value.contains(['<', '>']) {
        return None;
    }
    Some(value.replace('<', "&lt;").replace('>', "&gt;"))
}

/// Escapes markup in a path parameter extracted after routing.
pub fn clean_param(value: String) -> String {
    escape_markup(&value).unwrap_or(value)
}

/// Rewrites `value` in place. Returns whether anything changed.
pub fn sanitize_value(value: &mut Value) -> bool {
    match value {
        Value::Object(map) => {
            let before = map.len();
            map.retain(|key, _| !forbidden_key(key));
            let mut changed = map.len() != before;
            for nested in map.values_mut() {
                changed |= sanitize_value(nested);
            }
            changed
        }
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |changed, item| sanitize_value(item) || changed),
        Value::String(text) => match escape_markup(text) {
            Some(escaped) => {
                *text = escaped;
                true
            }
            None => false,
        },
        _ => false,
    }
}

/// Returns the cleaned query, or `None` when it was already clean.
pub fn sanitize_query(query: &str) -> Option<String> {
    let mut changed = false;
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if forbidden_key(&key) {
            changed = true;
            continue;
        }
        match escape_markup(&value) {
            Some(escaped) => {
                changed = true;
                serializer.append_pair(&key, &escaped);
            }
            None => {
                serializer.append_pair(&key, &value);
            }
        }
    }

    changed.then(|| serializer.finish())
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

fn too_large() -> Response {
    AppError::with_status(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response()
}

fn with_query(uri: &Uri, query: &str) -> Option<Uri> {
    let mut parts = uri.clone().into_parts();
    let path_and_query = if query.is_empty() {
        PathAndQuery::try_from(uri.path())
    } else {
        PathAndQuery::try_from(format!("{}?{}", uri.path(), query))
    };
    parts.path_and_query = Some(path_and_query.ok()?);
    Uri::from_parts(parts).ok()
}

/// Middleware rewriting the query string and JSON body before anything else
/// looks at them. Non-JSON bodies pass untouched.
pub async fn sanitize(request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    if let Some(cleaned) = parts.uri.query().and_then(sanitize_query) {
        debug!("Sanitized query string of {}", parts.uri.path());
        match with_query(&parts.uri, &cleaned) {
            Some(uri) => parts.uri = uri,
            None => {
                return AppError::with_status(StatusCode::BAD_REQUEST, "Malformed query string")
                    .into_response()
            }
        }
    }

    if !is_json(&parts.headers) {
        return next.run(Request::from_parts(parts, body)).await;
    }

    let declared_length = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared_length.is_some_and(|length| length > MAX_BODY_BYTES) {
        return too_large();
    }

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Failed to buffer request body: {}", e);
            return too_large();
        }
    };

    // Malformed JSON is left for the handler's extractor to reject.
    let mut body = Body::from(bytes.clone());
    if let Ok(mut value) = serde_json::from_slice::<Value>(&bytes) {
        if sanitize_value(&mut value) {
            debug!("Sanitized JSON body of {}", parts.uri.path());
            let rewritten = serde_json::to_vec(&value).unwrap_or_else(|_| bytes.to_vec());
            parts
                .headers
                .insert(CONTENT_LENGTH, HeaderValue::from(rewritten.len()));
            body = Body::from(rewritten);
        }
    }

    next.run(Request::from_parts(parts, body)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{middleware, Json, Router};
    use serde_json::json;
    use tower::ServiceExt;

    #[test]
    fn strips_operator_keys_recursively() {
        let mut value = json!({
            "email": "a@b.c",
            "$where": "sleep(1000)",
            "password": { "$gt": "" },
            "profile.admin": true,
            "tags": [{ "$ne": 1, "name": "ok" }]
        });
        assert!(sanitize_value(&mut value));
        assert_eq!(
            value,
            json!({ "email": "a@b.c", "password": {}, "tags": [{ "name": "ok" }] })
        );
    }

    #[test]
    fn escapes_markup_in_strings() {
        let mut value = json!({ "position": "<script>alert(1)</script>" });
        assert!(sanitize_value(&mut value));
        assert_eq!(
            value["position"],
            json!("&lt;script&gt;alert(1)&lt;/script&gt;")
        );
    }

    #[test]
    fn path_params_are_escaped() {
        assert_eq!(clean_param("<b>".to_string()), "&lt;b&gt;");
        assert_eq!(clean_param("6500aa".to_string()), "6500aa");
    }

    #[test]
    fn clean_input_is_reported_unchanged() {
        let mut value = json!({ "company": "ACME", "n": 3 });
        assert!(!sanitize_value(&mut value));
        assert_eq!(sanitize_query("status=pending&page=2"), None);
    }

    #[test]
    fn query_keys_and_values_are_cleaned() {
        assert_eq!(
            sanitize_query("status=pending&%24where=1&sort[%24ne]=x&search=%3Cb%3E").as_deref(),
            Some("status=pending&search=%26lt%3Bb%26gt%3B")
        );
    }

    fn echo_app() -> Router {
        Router::new()
            .route(
                "/echo",
                post(|request: Request| async move {
                    let query = request.uri().query().unwrap_or_default().to_string();
                    let bytes = to_bytes(request.into_body(), usize::MAX).await.unwrap();
                    Json(json!({
                        "query": query,
                        "body": String::from_utf8_lossy(&bytes),
                    }))
                }),
            )
            .layer(middleware::from_fn(sanitize))
    }

    async fn echo(request: Request) -> (StatusCode, Value) {
        let response = echo_app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn json_body_is_rewritten_before_the_handler() {
        let (status, echoed) = echo(
            axum::http::Request::post("/echo?%24gt=1&company=ACME")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"email":{"$gt":""},"company":"<i>"}"#))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(echoed["query"], json!("company=ACME"));
        let body: Value = serde_json::from_str(echoed["body"].as_str().unwrap()).unwrap();
        assert_eq!(body, json!({ "email": {}, "company": "&lt;i&gt;" }));
    }

    #[tokio::test]
    async fn other_bodies_pass_untouched() {
        let (_, echoed) = echo(
            axum::http::Request::post("/echo")
                .header(CONTENT_TYPE, "text/plain")
                .body(Body::from("{\"$gt\":\"<b>\"}"))
                .unwrap(),
        )
        .await;
        assert_eq!(echoed["body"], json!("{\"$gt\":\"<b>\"}"));
    }

    #[tokio::test]
    async fn oversized_json_is_rejected() {
        let payload = format!("\"{}\"", "a".repeat(MAX_BODY_BYTES));
        let (status, body) = echo(
            axum::http::Request::post("/echo")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, json!({ "msg": "Request body too large" }));
    }
}
