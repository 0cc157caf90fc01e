//! Permission Resolver
//!
//! Turns human-authored access entries (principal name, principal type,
//! canonical right names) into what the permission endpoints accept
//! (principal ID, platform-internal right names).
//!
//! The canonical-to-internal mapping depends on the resource category and is
//! loaded from embedded JSON on first access. Several categories translate
//! the same canonical right differently (`Grant` is sent as `Owner` for
//! accounts), so a table is always chosen per category.

use super::object::VaultResource;
use super::role::Role;
use super::user::User;
use crate::api::VaultClient;
use crate::error::{Result, VaultError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded permission tables (compiled into the binary)
const PERMISSION_FILE: &str = include_str!("../resources/permissions.json");

/// Canonical right names
pub mod right {
    pub const GRANT: &str = "Grant";
    pub const VIEW: &str = "View";
    pub const EDIT: &str = "Edit";
    pub const DELETE: &str = "Delete";
    pub const ADD: &str = "Add";
    pub const RUN: &str = "Run";
    pub const LOGIN: &str = "Login";
    pub const CHECKOUT: &str = "Checkout";
    pub const RETRIEVE: &str = "Retrieve";
    pub const MANAGE_SESSION: &str = "ManageSession";
    pub const AGENT_AUTH: &str = "AgentAuth";
    pub const OFFLINE_RESCUE: &str = "OfflineRescue";
    pub const ADD_ACCOUNT: &str = "AddAccount";
    pub const UNLOCK_ACCOUNT: &str = "UnlockAccount";
    pub const REQUEST_ZONE_ROLE: &str = "RequestZoneRole";
    pub const FILE_TRANSFER: &str = "FileTransfer";
    pub const UPDATE_PASSWORD: &str = "UpdatePassword";
    pub const WORKSPACE_LOGIN: &str = "WorkspaceLogin";
    pub const ROTATE_PASSWORD: &str = "RotatePassword";
    pub const RETRIEVE_SECRET: &str = "RetrieveSecret";
    pub const MANAGEMENT_ASSIGNMENT: &str = "ManagementAssignment";

    pub const ALL: &[&str] = &[
        GRANT,
        VIEW,
        EDIT,
        DELETE,
        ADD,
        RUN,
        LOGIN,
        CHECKOUT,
        RETRIEVE,
        MANAGE_SESSION,
        AGENT_AUTH,
        OFFLINE_RESCUE,
        ADD_ACCOUNT,
        UNLOCK_ACCOUNT,
        REQUEST_ZONE_ROLE,
        FILE_TRANSFER,
        UPDATE_PASSWORD,
        WORKSPACE_LOGIN,
        ROTATE_PASSWORD,
        RETRIEVE_SECRET,
        MANAGEMENT_ASSIGNMENT,
    ];
}

/// Canonical right name to internal right name
pub type PermissionTable = HashMap<String, String>;

/// Resource category selecting a permission table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionCategory {
    Generic,
    Set,
    /// Windows and Unix systems
    WinNix,
    /// Systems of any other class
    System,
    Database,
    Domain,
    Account,
    DbAccount,
    DomainAccount,
    CloudAccount,
    MultiplexAccount,
    Secret,
    SshKey,
    Service,
    Application,
    Folder,
}

impl PermissionCategory {
    pub const ALL: &'static [PermissionCategory] = &[
        Self::Generic,
        Self::Set,
        Self::WinNix,
        Self::System,
        Self::Database,
        Self::Domain,
        Self::Account,
        Self::DbAccount,
        Self::DomainAccount,
        Self::CloudAccount,
        Self::MultiplexAccount,
        Self::Secret,
        Self::SshKey,
        Self::Service,
        Self::Application,
        Self::Folder,
    ];

    /// Key of this category in the embedded tables
    pub fn key(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Set => "set",
            Self::WinNix => "winnix",
            Self::System => "system",
            Self::Database => "database",
            Self::Domain => "domain",
            Self::Account => "account",
            Self::DbAccount => "db_account",
            Self::DomainAccount => "domain_account",
            Self::CloudAccount => "cloud_account",
            Self::MultiplexAccount => "multiplex_account",
            Self::Secret => "secret",
            Self::SshKey => "ssh_key",
            Self::Service => "service",
            Self::Application => "application",
            Self::Folder => "folder",
        }
    }

    /// Valid permissions of this category
    pub fn table(self) -> &'static PermissionTable {
        valid_permissions(self)
    }
}

/// Root structure of resources/permissions.json
#[derive(Debug, Clone, Deserialize)]
struct PermissionConfig {
    categories: HashMap<String, PermissionTable>,
}

/// Global tables loaded from JSON
static REGISTRY: OnceLock<PermissionConfig> = OnceLock::new();

fn get_registry() -> &'static PermissionConfig {
    REGISTRY.get_or_init(|| {
        serde_json::from_str(PERMISSION_FILE)
            .unwrap_or_else(|e| panic!("Failed to parse embedded permission JSON: {}", e))
    })
}

/// Get the valid-permissions table of a category
pub fn valid_permissions(category: PermissionCategory) -> &'static PermissionTable {
    get_registry()
        .categories
        .get(category.key())
        .unwrap_or_else(|| panic!("No embedded permission table for '{}'", category.key()))
}

/// Principal kinds an access entry may name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalType {
    User,
    Role,
}

impl PrincipalType {
    /// Parse a principal type, ignoring case
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "role" => Ok(Self::Role),
            _ => {
                tracing::error!("Invalid PrincipalType {}", s);
                Err(VaultError::InvalidPrincipalType(s.to_string()))
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Role => "Role",
        }
    }
}

/// One access-control entry
///
/// Rights may be given either as a comma-joined string in `rights` or as a
/// list in `right_list`; the string wins when both are set. After
/// [`resolve_permissions`] `rights` holds internal names only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Permission {
    #[serde(rename = "PrincipalId")]
    pub principal_id: String,
    #[serde(rename = "Principal")]
    pub principal_name: String,
    #[serde(rename = "PType")]
    pub principal_type: String,
    #[serde(rename = "Rights")]
    pub rights: String,
    #[serde(skip)]
    pub right_list: Vec<String>,
}

impl Permission {
    pub fn new(principal_name: &str, principal_type: &str) -> Self {
        Self {
            principal_name: principal_name.to_string(),
            principal_type: principal_type.to_string(),
            ..Default::default()
        }
    }

    /// Rights as a list of canonical names
    pub fn with_rights(mut self, rights: &[&str]) -> Self {
        self.right_list = rights.iter().map(|r| r.to_string()).collect();
        self
    }

    /// Rights as a comma-joined string of canonical names
    pub fn with_rights_str(mut self, rights: &str) -> Self {
        self.rights = rights.to_string();
        self
    }

    /// Rights to convert: the comma-joined string if set, else the list
    fn raw_rights(&self) -> Vec<String> {
        if !self.rights.is_empty() {
            self.rights.split(',').map(|r| r.trim().to_string()).collect()
        } else {
            self.right_list.clone()
        }
    }
}

/// Identifier of a user (by login name) or a role (by name)
pub async fn principal_id(
    client: &VaultClient,
    principal_type: PrincipalType,
    name: &str,
) -> Result<String> {
    match principal_type {
        PrincipalType::User => {
            let mut user = User::new(client);
            user.base.name = name.to_string();
            user.get_id_by_name().await
        }
        PrincipalType::Role => {
            let mut role = Role::new(client);
            role.base.name = name.to_string();
            role.get_id_by_name().await
        }
    }
}

/// Convert canonical right names to internal names, keeping input order
pub fn convert_to_valid_list<S: AsRef<str>>(
    input: &[S],
    table: &PermissionTable,
) -> Result<Vec<String>> {
    input
        .iter()
        .map(|right| {
            let right = right.as_ref();
            match table.get(right) {
                Some(internal) if !internal.is_empty() => Ok(internal.clone()),
                _ => {
                    tracing::error!("Invalid right {}", right);
                    Err(VaultError::InvalidRight(right.to_string()))
                }
            }
        })
        .collect()
}

/// Resolve principal IDs and internal rights for a batch of entries
///
/// Entries are processed in order and the first failure aborts the batch.
/// `perms` is only written once every entry has resolved, so a failed batch
/// leaves the caller's entries untouched.
pub async fn resolve_permissions(
    client: &VaultClient,
    perms: &mut [Permission],
    table: &PermissionTable,
) -> Result<()> {
    let mut resolved = Vec::with_capacity(perms.len());

    for perm in perms.iter() {
        let principal_type = PrincipalType::parse(&perm.principal_type)?;
        let principal_id = principal_id(client, principal_type, &perm.principal_name).await?;

        let rights = convert_to_valid_list(&perm.raw_rights(), table)?;

        resolved.push(Permission {
            principal_id,
            principal_name: perm.principal_name.clone(),
            principal_type: principal_type.as_str().to_string(),
            rights: rights.join(","),
            right_list: perm.right_list.clone(),
        });
    }

    tracing::debug!("Resolved permissions: {:?}", resolved);
    perms.clone_from_slice(&resolved);
    Ok(())
}
