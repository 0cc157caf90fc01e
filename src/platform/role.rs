//! Roles

use super::mapper::{Field, FieldMap};
use super::object::{ApiPaths, VaultObject, VaultResource};
use super::permission::PermissionCategory;
use super::query::Query;
use crate::api::VaultClient;
use serde_json::{json, Value};

const ROLE_API: ApiPaths = ApiPaths {
    create: Some("/SaasManage/StoreRole"),
    read: Some("/SaasManage/GetRole"),
    update: Some("/SaasManage/UpdateRole"),
    delete: Some("/SaasManage/DeleteRole"),
    permissions: None,
};

#[derive(Debug, Clone)]
pub struct Role {
    pub base: VaultObject,
}

static ROLE_FIELDS: &[Field] = &[Field::flatten("base")];

impl Role {
    pub fn new(client: &VaultClient) -> Self {
        Self {
            base: VaultObject::new(client, PermissionCategory::Generic, "", ROLE_API),
        }
    }
}

impl FieldMap for Role {
    fn fields(&self) -> &'static [Field] {
        ROLE_FIELDS
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

impl VaultResource for Role {
    const KIND: &'static str = "role";
    const TABLE: &'static str = "Role";

    fn base(&self) -> &VaultObject {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VaultObject {
        &mut self.base
    }

    fn lookup_query(&self) -> Query {
        Query::select(Self::TABLE).eq("Name", &self.base.name)
    }

    // Role endpoints address the role by its ID under `name`
    fn id_args(&self, id: &str) -> Value {
        json!({ "name": id })
    }
}
