//! Vault API transport
//!
//! This module provides the thin POST-and-decode layer every resource type
//! goes through.
//!
//! # Module Structure
//!
//! - [`client`] - Tenant-bound client that issues calls and decodes envelopes
//! - [`http`] - HTTP utilities (headers, cookie store, status handling)
//! - [`response`] - The standard response envelope
//!
//! # Example
//!
//! ```ignore
//! use cfyvault::api::{HttpOptions, VaultClient};
//!
//! async fn example() -> cfyvault::Result<()> {
//!     let client = VaultClient::new("https://abc1234.my.centrify.net", &HttpOptions::default())?;
//!     let secret = client
//!         .call_map("/ServerManage/GetSecret", &serde_json::json!({"ID": "xxxx"}))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod response;

pub use client::VaultClient;
pub use http::HttpOptions;
pub use response::ApiResponse;
