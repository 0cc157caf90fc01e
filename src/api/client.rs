//! Vault Client
//!
//! Main client for interacting with the vault API, combining the tenant
//! address, the HTTP layer and envelope decoding.

use super::http::{redact_json, HttpOptions, VaultHttpClient};
use super::response::ApiResponse;
use crate::error::{Result, VaultError};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use url::Url;

/// Main vault client
///
/// Cheap to clone; clones share the connection pool and cookie store.
#[derive(Clone)]
pub struct VaultClient {
    pub http: VaultHttpClient,
    service: String,
}

impl VaultClient {
    /// Create a new client for a tenant URL such as `https://abc1234.my.centrify.net`
    ///
    /// Path and query components are dropped. A URL given without a scheme is
    /// assumed to be `https`.
    pub fn new(tenant_url: &str, options: &HttpOptions) -> Result<Self> {
        let service = normalize_service_url(tenant_url)?;
        let http = VaultHttpClient::new(options)?;

        tracing::debug!("Vault client bound to {}", service);
        Ok(Self { http, service })
    }

    /// Tenant base URL, without trailing slash
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Build the full URL of an API method path
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.service, method.trim_start_matches('/'))
    }

    /// POST to an API method and decode the response envelope without
    /// inspecting its success flag
    pub async fn call_envelope(&self, method: &str, args: &Value) -> Result<ApiResponse> {
        tracing::debug!("Calling {} with {}", method, redact_json(args));

        let body = self.http.post(&self.method_url(method), method, args).await?;
        serde_json::from_str(&body).map_err(|source| {
            tracing::error!("Failed to decode envelope from {}: {}", method, source);
            VaultError::MalformedEnvelope {
                method: method.to_string(),
                source,
            }
        })
    }

    /// POST to an API method and return its `Result` payload
    pub async fn call<T: DeserializeOwned>(&self, method: &str, args: &Value) -> Result<T> {
        self.call_envelope(method, args).await?.into_result(method)
    }

    /// Call a method whose `Result` is a mapping (a null result is an empty mapping)
    pub async fn call_map(&self, method: &str, args: &Value) -> Result<Map<String, Value>> {
        let result: Option<Map<String, Value>> = self.call(method, args).await?;
        Ok(result.unwrap_or_default())
    }

    /// Call a method whose `Result` is a string
    pub async fn call_string(&self, method: &str, args: &Value) -> Result<String> {
        self.call(method, args).await
    }

    /// Call a method whose `Result` is a boolean
    pub async fn call_bool(&self, method: &str, args: &Value) -> Result<bool> {
        self.call(method, args).await
    }
}

fn normalize_service_url(tenant_url: &str) -> Result<String> {
    let trimmed = tenant_url.trim();
    let parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{}", trimmed))
            .map_err(|source| VaultError::InvalidUrl {
                url: tenant_url.to_string(),
                source,
            })?,
        Err(source) => {
            return Err(VaultError::InvalidUrl {
                url: tenant_url.to_string(),
                source,
            })
        }
    };

    if parsed.host_str().is_none() {
        return Err(VaultError::InvalidUrl {
            url: tenant_url.to_string(),
            source: url::ParseError::EmptyHost,
        });
    }

    Ok(parsed.origin().ascii_serialization())
}
