//! HTTP utilities for vault REST API calls

use crate::error::{Result, VaultError};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Value sent in the `X-CFY-SRC` header
pub const SOURCE_HEADER: &str = "cfyvault";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Keys whose values must never reach the log
const SENSITIVE_KEYS: &[&str] = &["SecretText", "Password", "password", "SecretFilePassword"];

/// Copy of a JSON value with secret material masked at any depth
pub(crate) fn redact_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    if SENSITIVE_KEYS.contains(&k.as_str()) {
                        (k.clone(), Value::String("********".to_string()))
                    } else {
                        (k.clone(), redact_json(v))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_json).collect()),
        other => other.clone(),
    }
}

/// Loggable form of a response body
///
/// JSON bodies are redacted before truncation. Anything that is not JSON
/// is reduced to its length, since it cannot be masked key by key.
fn response_for_log(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => sanitize_for_log(&redact_json(&value).to_string()),
        Err(_) => format!("[{} bytes, not JSON]", body.len()),
    }
}

/// Connection options for [`VaultHttpClient`]
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// Accept invalid TLS certificates (on-prem deployments with self-signed certs)
    pub skip_cert_verify: bool,
    pub timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            token: None,
            skip_cert_verify: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// HTTP client wrapper for vault API calls
///
/// Keeps a cookie store so that session cookies issued by the tenant are
/// replayed on subsequent calls.
#[derive(Clone)]
pub struct VaultHttpClient {
    client: Client,
    token: Option<String>,
}

impl VaultHttpClient {
    /// Create a new HTTP client
    pub fn new(options: &HttpOptions) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("X-CENTRIFY-NATIVE-CLIENT", HeaderValue::from_static("Yes"));
        headers.insert("X-CFY-SRC", HeaderValue::from_static(SOURCE_HEADER));

        let client = Client::builder()
            .user_agent(concat!("cfyvault/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .cookie_store(true)
            .danger_accept_invalid_certs(options.skip_cert_verify)
            .timeout(options.timeout)
            .build()
            .map_err(VaultError::Client)?;

        Ok(Self {
            client,
            token: options.token.clone(),
        })
    }

    /// POST a JSON body and return the raw response body
    ///
    /// Anything other than `200 OK` is a transport failure; the envelope is
    /// left for the caller to decode.
    pub async fn post(&self, url: &str, method: &str, body: &Value) -> Result<String> {
        tracing::debug!("POST {}", url);

        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(body);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| {
            tracing::error!("POST to {} failed: {}", method, source);
            VaultError::Network {
                method: method.to_string(),
                source,
            }
        })?;

        let status = response.status();
        let response_body = response.text().await.map_err(|source| VaultError::Network {
            method: method.to_string(),
            source,
        })?;

        if status != StatusCode::OK {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, response_for_log(&response_body));
            return Err(VaultError::Status {
                method: method.to_string(),
                status: status.as_u16(),
            });
        }

        tracing::trace!("Response from {}: {}", method, response_for_log(&response_body));
        Ok(response_body)
    }
}
