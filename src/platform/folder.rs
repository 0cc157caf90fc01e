//! Secret folders
//!
//! Folders live in the `Sets` table as `Phantom` objects and are addressed by
//! backslash-separated paths, see [`super::path`].

use super::mapper::{decode_value, encode_value, unknown_field, Field, FieldMap};
use super::object::{ApiPaths, VaultObject, VaultResource};
use super::path::{resolve_lazily, split_parent};
use super::permission::PermissionCategory;
use super::query::Query;
use crate::api::VaultClient;
use crate::error::Result;
use serde_json::Value;

const FOLDER_API: ApiPaths = ApiPaths {
    create: Some("/ServerManage/AddSecretsFolder"),
    read: Some("/ServerManage/GetSecretsFolder"),
    update: Some("/ServerManage/UpdateSecretsFolder"),
    delete: Some("/ServerManage/DeleteSecretsFolder"),
    permissions: Some("/ServerManage/SetSecretsFolderPermissions"),
};

/// Object type of folder rows in the `Sets` table
pub const FOLDER_OBJECT_TYPE: &str = "Phantom";

#[derive(Debug, Clone)]
pub struct SecretFolder {
    pub base: VaultObject,
    /// Path of the parent folder, empty for a top-level folder
    pub parent_path: String,
    pub parent_id: String,
    /// Destination path when moving the folder
    pub new_parent_path: String,
}

static SECRET_FOLDER_FIELDS: &[Field] = &[
    Field::flatten("base"),
    Field::scalar("parent_path")
        .wire_omit_empty("ParentPath")
        .config_omit_empty("parent_path"),
    Field::scalar("parent_id")
        .wire_omit_empty("Parent")
        .config_omit_empty("parent_id"),
    Field::scalar("new_parent_path"),
];

impl SecretFolder {
    pub fn new(client: &VaultClient) -> Self {
        Self {
            base: VaultObject::new(client, PermissionCategory::Folder, "", FOLDER_API),
            parent_path: String::new(),
            parent_id: String::new(),
            new_parent_path: String::new(),
        }
    }

    /// Folder addressed by its full path
    pub fn with_path(client: &VaultClient, path: &str) -> Self {
        let mut folder = Self::new(client);
        let (parent, name) = split_parent(path);
        folder.base.name = name.to_string();
        folder.parent_path = parent.unwrap_or_default().to_string();
        folder
    }

    /// Identifying query of a folder name, constrained to a parent when known
    pub fn lookup(name: &str, parent_id: &str) -> Query {
        Query::select(Self::TABLE)
            .eq("ObjectType", FOLDER_OBJECT_TYPE)
            .eq("Name", name)
            .eq_if_set("Parent", parent_id)
    }
}

impl FieldMap for SecretFolder {
    fn fields(&self) -> &'static [Field] {
        SECRET_FOLDER_FIELDS
    }

    fn get(&self, name: &str) -> Value {
        match name {
            "parent_path" => encode_value(&self.parent_path),
            "parent_id" => encode_value(&self.parent_id),
            "new_parent_path" => encode_value(&self.new_parent_path),
            _ => Value::Null,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "parent_path" => self.parent_path = decode_value(name, value)?,
            "parent_id" => self.parent_id = decode_value(name, value)?,
            "new_parent_path" => self.new_parent_path = decode_value(name, value)?,
            _ => return Err(unknown_field(name)),
        }
        Ok(())
    }

    fn nested(&self, name: &str) -> Option<&dyn FieldMap> {
        match name {
            "base" => Some(&self.base),
            _ => None,
        }
    }

    fn nested_mut(&mut self, name: &str) -> Option<&mut dyn FieldMap> {
        match name {
            "base" => Some(&mut self.base),
            _ => None,
        }
    }
}

impl VaultResource for SecretFolder {
    const KIND: &'static str = "secret folder";
    const TABLE: &'static str = "Sets";

    fn base(&self) -> &VaultObject {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VaultObject {
        &mut self.base
    }

    fn lookup_query(&self) -> Query {
        Self::lookup(&self.base.name, &self.parent_id)
    }

    async fn prepare_lookup(&mut self) -> Result<()> {
        resolve_lazily(&self.base.client, &mut self.parent_id, &mut self.parent_path, "").await
    }

    async fn resolve_dependencies(&mut self) -> Result<()> {
        resolve_lazily(
            &self.base.client,
            &mut self.parent_id,
            &mut self.parent_path,
            &self.new_parent_path,
        )
        .await
    }
}
