use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use ddig_core::{is_truthy, sanitize_value};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::compat::normalize_fields;
use crate::envelope::ApiError;

/// Recorded when the peer address is not available.
pub const UNKNOWN_IP: &str = "Unknown";

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// An inbound field map plus the submitter's address.
///
/// Accessors sanitize on read, so handlers never see raw input.
#[derive(Clone, Debug, Default)]
pub struct Submission {
    fields: Map<String, Value>,
    client_ip: Option<String>,
}

impl Submission {
    pub fn new(mut fields: Map<String, Value>) -> Self {
        normalize_fields(&mut fields);
        Self {
            fields,
            client_ip: None,
        }
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    pub fn client_ip(&self) -> &str {
        self.client_ip.as_deref().unwrap_or(UNKNOWN_IP)
    }

    pub fn action(&self) -> String {
        self.text("action")
    }

    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Sanitized value; empty when absent or not a string/number.
    pub fn text(&self, name: &str) -> String {
        sanitize_value(self.fields.get(name))
    }

    /// Sanitized value, `None` when absent or blank.
    pub fn optional(&self, name: &str) -> Option<String> {
        Some(self.text(name)).filter(|v| !v.is_empty())
    }

    pub fn flag(&self, name: &str) -> bool {
        is_truthy(self.fields.get(name))
    }

    /// First field of `required` that is absent or blank after sanitizing.
    pub fn first_missing(&self, required: &[&'static str]) -> Option<&'static str> {
        required.iter().copied().find(|name| self.text(name).is_empty())
    }
}

fn parse_form(bytes: &[u8]) -> Map<String, Value> {
    form_urlencoded::parse(bytes)
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect()
}

fn parse_json(bytes: &[u8]) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::BadRequest("Request body must be a JSON object".into())),
        Err(_) => Err(ApiError::BadRequest("Request body is not valid JSON".into())),
    }
}

impl<S> FromRequest<S> for Submission
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();

        // Query parameters sit underneath body fields.
        let mut fields = parts
            .uri
            .query()
            .map(|q| parse_form(q.as_bytes()))
            .unwrap_or_default();

        let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| ApiError::BadRequest("Request body is too large or unreadable".into()))?;

        if !bytes.is_empty() {
            let content_type = parts
                .headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_ascii_lowercase();

            let body_fields = if content_type.starts_with("application/x-www-form-urlencoded") {
                parse_form(&bytes)
            } else if content_type.contains("json") {
                parse_json(&bytes)?
            } else if content_type.is_empty() {
                parse_json(&bytes).unwrap_or_else(|_| parse_form(&bytes))
            } else {
                return Err(ApiError::BadRequest(format!(
                    "Unsupported content type: {content_type}"
                )));
            };
            fields.extend(body_fields);
        }

        let mut submission = Submission::new(fields);
        if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            submission = submission.with_client_ip(addr.ip().to_string());
        }
        Ok(submission)
    }
}
