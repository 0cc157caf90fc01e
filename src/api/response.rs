//! Response envelope
//!
//! Every vault API call answers with the same envelope:
//!
//! ```json
//! {
//!     "success": true,
//!     "Result": { ... },
//!     "Message": null,
//!     "MessageID": null,
//!     "Exception": null,
//!     "ErrorID": null,
//!     "ErrorCode": null,
//!     "IsSoftError": false,
//!     "InnerExceptions": null
//! }
//! ```
//!
//! `Result` is shape-dependent (string, boolean, mapping or list) so it is
//! kept as raw JSON until the caller asks for a concrete type.

use crate::error::{Result, VaultError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "Result", default)]
    pub result: Value,
    #[serde(rename = "Message", default)]
    pub message: Option<String>,
    #[serde(rename = "MessageID", default)]
    pub message_id: Option<String>,
    #[serde(rename = "Exception", default)]
    pub exception: Option<String>,
    #[serde(rename = "ErrorID", default)]
    pub error_id: Option<String>,
    #[serde(rename = "ErrorCode", default)]
    pub error_code: Option<String>,
    #[serde(rename = "IsSoftError", default)]
    pub is_soft_error: bool,
}

impl ApiResponse {
    /// Failure text as reported by the service: message followed by exception
    pub fn failure_text(&self) -> String {
        format!(
            "{} {}",
            self.message.as_deref().unwrap_or_default(),
            self.exception.as_deref().unwrap_or_default()
        )
    }

    /// Check the success flag and decode `Result` into `T`
    pub fn into_result<T: DeserializeOwned>(self, method: &str) -> Result<T> {
        if !self.success {
            let text = self.failure_text();
            tracing::error!("{} reported failure: {}", method, text);
            return Err(VaultError::Api(text));
        }

        serde_json::from_value(self.result).map_err(|e| VaultError::Result {
            method: method.to_string(),
            message: e.to_string(),
        })
    }
}
