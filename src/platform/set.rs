//! Manual sets
//!
//! A manual set groups objects of one member table (`ObjectType`), such as
//! secrets (`DataVault`) or systems (`Server`). Membership is managed
//! explicitly with [`ManualSet::add_members`].

use super::mapper::{decode_value, encode_value, unknown_field, Field, FieldMap};
use super::object::{require, ApiPaths, VaultObject, VaultResource};
use super::permission::PermissionCategory;
use super::query::Query;
use crate::api::VaultClient;
use crate::error::Result;
use serde_json::{json, Value};

const SET_API: ApiPaths = ApiPaths {
    create: Some("/Collection/CreateManualCollection"),
    read: Some("/Collection/GetCollection"),
    update: Some("/Collection/UpdateCollection"),
    delete: Some("/Collection/DeleteCollection"),
    permissions: Some("/Collection/SetCollectionPermissions"),
};

const MEMBERS_API: &str = "/Collection/UpdateMembersCollection";

/// Collection type of manual sets in the `Sets` table
pub const MANUAL_COLLECTION: &str = "ManualBucket";

#[derive(Debug, Clone)]
pub struct ManualSet {
    pub base: VaultObject,
    /// Member table, e.g. `DataVault` or `Server`
    pub object_type: String,
    pub sub_object_type: String,
}

static MANUAL_SET_FIELDS: &[Field] = &[
    Field::flatten("base"),
    Field::scalar("object_type")
        .wire_omit_empty("ObjectType")
        .config_omit_empty("type"),
    Field::scalar("sub_object_type")
        .wire_omit_empty("SubObjectType")
        .config_omit_empty("subtype"),
    Field::scalar("collection_type").wire("CollectionType"),
];

impl ManualSet {
    pub fn new(client: &VaultClient) -> Self {
        Self {
            base: VaultObject::new(client, PermissionCategory::Set, "", SET_API),
            object_type: String::new(),
            sub_object_type: String::new(),
        }
    }

    /// Add rows of the set's member table by key
    pub async fn add_members(&self, keys: &[&str]) -> Result<()> {
        let id = self.require_id()?;
        require(Self::KIND, "type", &self.object_type)?;

        let add: Vec<Value> = keys
            .iter()
            .map(|key| {
                json!({
                    "MemberType": "Row",
                    "Table": self.object_type,
                    "Key": key,
                })
            })
            .collect();

        let args = json!({ "id": id, "add": add });
        let _: Value = self.base.client.call(MEMBERS_API, &args).await?;
        tracing::info!("Added {} member(s) to set {}", keys.len(), self.base.name);
        Ok(())
    }
}

impl FieldMap for ManualSet {
    fn fields(&self) -> &'static [Field] {
        MANUAL_SET_FIELDS
    }

    fn get(&self, name: &str) -> Value {
        match name {
            "object_type" => encode_value(&self.object_type),
            "sub_object_type" => encode_value(&self.sub_object_type),
            "collection_type" => encode_value(&MANUAL_COLLECTION),
            _ => Value::Null,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "object_type" => self.object_type = decode_value(name, value)?,
            "sub_object_type" => self.sub_object_type = decode_value(name, value)?,
            // Fixed for manual sets
            "collection_type" => {}
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

impl VaultResource for ManualSet {
    const KIND: &'static str = "set";
    const TABLE: &'static str = "Sets";

    fn base(&self) -> &VaultObject {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VaultObject {
        &mut self.base
    }

    fn lookup_query(&self) -> Query {
        Query::select(Self::TABLE)
            .eq("CollectionType", MANUAL_COLLECTION)
            .eq("Name", &self.base.name)
            .eq_if_set("ObjectType", &self.object_type)
    }

    fn check_create(&self) -> Result<()> {
        require(Self::KIND, "name", &self.base.name)?;
        require(Self::KIND, "type", &self.object_type)
    }
}
