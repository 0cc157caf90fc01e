//! Vault resource types
//!
//! # Module Structure
//!
//! - [`mapper`] - Field descriptor tables and the wire / configuration codecs
//! - [`object`] - Shared base object and the lifecycle trait
//! - [`query`] - Query builder and single-row lookups
//! - [`path`] - Folder path resolution
//! - [`permission`] - Access-entry resolution and permission tables
//!
//! Resource types: [`Secret`], [`SecretFolder`], [`System`], [`ManualSet`],
//! [`User`], [`Role`], [`Connector`], [`GlobalWorkflow`].

pub mod connector;
pub mod folder;
pub mod mapper;
pub mod object;
pub mod path;
pub mod permission;
pub mod query;
pub mod role;
pub mod secret;
pub mod set;
pub mod system;
pub mod user;
pub mod workflow;

pub use connector::Connector;
pub use folder::SecretFolder;
pub use object::{VaultObject, VaultResource};
pub use permission::{Permission, PermissionCategory, PrincipalType};
pub use role::Role;
pub use secret::Secret;
pub use set::ManualSet;
pub use system::System;
pub use user::User;
pub use workflow::GlobalWorkflow;
