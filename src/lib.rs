//! Client-side data access for the Centrify/Delinea Platform vault
//!
//! Secrets, folders, systems, sets, users and roles are plain structs that
//! know how to create, read, update, delete and look themselves up by name
//! through [`platform::VaultResource`].

pub mod api;
pub mod config;
pub mod error;
pub mod platform;

pub use error::{ErrorKind, Result, VaultError};

/// Version injected at compile time via CFYVAULT_VERSION env var,
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("CFYVAULT_VERSION") {
    Some(v) => v,
    None => "dev",
};
