//! Generic Resource Object
//!
//! Every resource type embeds a [`VaultObject`] (identifier, name,
//! description, permission state and the API endpoints of its kind) and
//! implements [`VaultResource`]. The trait's provided methods are the shared
//! lifecycle:
//!
//! ```text
//! Unbound ──create / get_id_by_name──▶ Identified ──read──▶ Loaded
//! ```
//!
//! Resource types only describe what differs: their table, their identifying
//! predicates, mandatory fields, dependent-identifier resolution and any
//! supplementary reads.

use super::mapper::{
    decode_value, encode_value, from_map, to_wire_map, unknown_field, Field, FieldMap,
};
use super::permission::{self, Permission, PermissionCategory, PermissionTable};
use super::query::{query_single, Query, QUERY_API};
use super::set::ManualSet;
use crate::api::VaultClient;
use crate::error::{Result, VaultError};
use serde_json::{json, Map, Value};
use std::fmt;

/// API method paths of a resource kind; `None` marks an unsupported operation
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiPaths {
    pub create: Option<&'static str>,
    pub read: Option<&'static str>,
    pub update: Option<&'static str>,
    pub delete: Option<&'static str>,
    pub permissions: Option<&'static str>,
}

/// State shared by every resource type
#[derive(Clone)]
pub struct VaultObject {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Resolved access entries, see [`VaultResource::resolve_permissions`]
    pub permissions: Vec<Permission>,
    /// Selects the valid-permissions table
    pub category: PermissionCategory,
    /// Member table name used for set membership, empty when the kind
    /// cannot be a set member
    pub set_type: &'static str,
    pub(crate) api: ApiPaths,
    pub(crate) client: VaultClient,
}

static VAULT_OBJECT_FIELDS: &[Field] = &[
    Field::scalar("id").wire_omit_empty("ID"),
    Field::scalar("name")
        .wire_omit_empty("Name")
        .config_omit_empty("name"),
    Field::scalar("description")
        .wire_omit_empty("Description")
        .config_omit_empty("description"),
];

impl VaultObject {
    pub fn new(
        client: &VaultClient,
        category: PermissionCategory,
        set_type: &'static str,
        api: ApiPaths,
    ) -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            permissions: Vec::new(),
            category,
            set_type,
            api,
            client: client.clone(),
        }
    }

    pub fn client(&self) -> &VaultClient {
        &self.client
    }

    pub fn valid_permissions(&self) -> &'static PermissionTable {
        self.category.table()
    }
}

impl fmt::Debug for VaultObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("permissions", &self.permissions)
            .field("category", &self.category)
            .field("service", &self.client.service())
            .finish()
    }
}

impl FieldMap for VaultObject {
    fn fields(&self) -> &'static [Field] {
        VAULT_OBJECT_FIELDS
    }

    fn get(&self, name: &str) -> Value {
        match name {
            "id" => encode_value(&self.id),
            "name" => encode_value(&self.name),
            "description" => encode_value(&self.description),
            _ => Value::Null,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "id" => self.id = decode_value(name, value)?,
            "name" => self.name = decode_value(name, value)?,
            "description" => self.description = decode_value(name, value)?,
            _ => return Err(unknown_field(name)),
        }
        Ok(())
    }
}

/// Fail with a precondition error when a mandatory attribute is empty
pub(crate) fn require(kind: &'static str, attribute: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        tracing::error!("Missing required attribute {} for {}", attribute, kind);
        return Err(VaultError::MissingAttribute { kind, attribute });
    }
    Ok(())
}

fn unsupported(kind: &'static str, operation: &'static str) -> VaultError {
    VaultError::Unsupported { kind, operation }
}

/// Identifier returned by a create call: either the bare string or a mapping
/// carrying `ID` / `_RowKey`
fn extract_id(method: &str, result: &Value) -> Result<String> {
    let id = match result {
        Value::String(id) => Some(id.as_str()),
        Value::Object(map) => map
            .get("ID")
            .or_else(|| map.get("_RowKey"))
            .and_then(Value::as_str),
        _ => None,
    };

    match id {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(VaultError::Result {
            method: method.to_string(),
            message: "no identifier in result".to_string(),
        }),
    }
}

/// Shared lifecycle of every resource type
#[allow(async_fn_in_trait)]
pub trait VaultResource: FieldMap + Sized {
    /// Human-readable kind used in messages
    const KIND: &'static str;
    /// Query table holding rows of this kind
    const TABLE: &'static str;

    fn base(&self) -> &VaultObject;
    fn base_mut(&mut self) -> &mut VaultObject;

    /// Equality predicates identifying this object by name
    fn lookup_query(&self) -> Query;

    /// Precondition of name-based lookups
    fn check_lookup(&self) -> Result<()> {
        require(Self::KIND, "name", &self.base().name)
    }

    /// Resolve whatever the identifying query depends on
    async fn prepare_lookup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Mandatory fields for create
    fn check_create(&self) -> Result<()> {
        Ok(())
    }

    /// Resolve identifiers this object depends on (folder IDs and the like)
    async fn resolve_dependencies(&mut self) -> Result<()> {
        Ok(())
    }

    /// Extra calls merged into the object after the main read
    async fn read_supplementary(&mut self) -> Result<()> {
        Ok(())
    }

    /// Arguments addressing this object by identifier in read and delete calls
    fn id_args(&self, id: &str) -> Value {
        json!({ "ID": id })
    }

    /// Arguments of the delete call; kinds that cannot be removed send a
    /// disabling payload here instead
    fn delete_args(&self, id: &str) -> Value {
        self.id_args(id)
    }

    fn create_args(&self) -> Map<String, Value> {
        to_wire_map(self)
    }

    fn update_args(&self) -> Map<String, Value> {
        to_wire_map(self)
    }

    fn id(&self) -> &str {
        &self.base().id
    }

    /// The identifier, or a precondition failure when unset
    fn require_id(&self) -> Result<String> {
        let id = &self.base().id;
        if id.is_empty() {
            tracing::error!("Missing ID for {}", Self::KIND);
            return Err(VaultError::MissingId(Self::KIND));
        }
        Ok(id.clone())
    }

    fn valid_permissions(&self) -> &'static PermissionTable {
        self.base().valid_permissions()
    }

    /// Create the object and bind the returned identifier
    async fn create(&mut self) -> Result<String> {
        let api = self
            .base()
            .api
            .create
            .ok_or_else(|| unsupported(Self::KIND, "create"))?;
        self.check_create()?;
        self.resolve_dependencies().await?;

        let args = Value::Object(self.create_args());
        let result: Value = self.base().client.call(api, &args).await?;
        let id = extract_id(api, &result)?;

        tracing::info!("Created {} {}", Self::KIND, id);
        self.base_mut().id = id.clone();
        Ok(id)
    }

    /// Fetch all attributes by identifier
    ///
    /// Kinds without a read endpoint are read from their query table.
    async fn read(&mut self) -> Result<()> {
        let id = self.require_id()?;

        let row = match self.base().api.read {
            Some(api) => self.base().client.call_map(api, &self.id_args(&id)).await?,
            None => {
                let query = Query::select(Self::TABLE).eq("ID", &id);
                query_single(&self.base().client, &query).await?
            }
        };
        tracing::debug!("Read {} {}", Self::KIND, id);

        from_map(&row, self)?;
        self.read_supplementary().await
    }

    /// Push the current attributes to the service
    async fn update(&mut self) -> Result<Value> {
        self.require_id()?;
        let api = self
            .base()
            .api
            .update
            .ok_or_else(|| unsupported(Self::KIND, "update"))?;
        self.resolve_dependencies().await?;

        let args = Value::Object(self.update_args());
        let result = self.base().client.call(api, &args).await?;
        tracing::info!("Updated {} {}", Self::KIND, self.base().id);
        Ok(result)
    }

    async fn delete(&mut self) -> Result<Value> {
        let id = self.require_id()?;
        let api = self
            .base()
            .api
            .delete
            .ok_or_else(|| unsupported(Self::KIND, "delete"))?;

        let result = self.base().client.call(api, &self.delete_args(&id)).await?;
        tracing::info!("Deleted {} {}", Self::KIND, id);
        Ok(result)
    }

    /// Run the identifying query; exactly one row is required
    async fn query(&self) -> Result<Map<String, Value>> {
        query_single(&self.base().client, &self.lookup_query()).await
    }

    /// Look the object up by name and bind its identifier
    async fn get_id_by_name(&mut self) -> Result<String> {
        self.check_lookup()?;
        self.prepare_lookup().await?;

        let row = self.query().await.map_err(|e| {
            tracing::error!("Failed to find ID of {} '{}': {}", Self::KIND, self.base().name, e);
            e
        })?;
        let id = row
            .get("ID")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| VaultError::Result {
                method: QUERY_API.to_string(),
                message: format!("{} row without ID", Self::KIND),
            })?
            .to_string();

        self.base_mut().id = id.clone();
        Ok(id)
    }

    /// Look the object up by name, then read it
    async fn get_by_name(&mut self) -> Result<()> {
        self.get_id_by_name().await?;
        self.read().await
    }

    /// Look the object up by name, then delete it
    async fn delete_by_name(&mut self) -> Result<Value> {
        self.get_id_by_name().await?;
        self.delete().await
    }

    /// Resolve access entries against this object's permission table and
    /// keep them for [`set_permissions`](Self::set_permissions)
    async fn resolve_permissions(&mut self, mut perms: Vec<Permission>) -> Result<()> {
        let table = self.valid_permissions();
        permission::resolve_permissions(&self.base().client, &mut perms, table).await?;
        self.base_mut().permissions = perms;
        Ok(())
    }

    /// Grant (or with `remove`, revoke) the resolved permissions
    async fn set_permissions(&self, remove: bool) -> Result<()> {
        let id = self.require_id()?;
        let api = self
            .base()
            .api
            .permissions
            .ok_or_else(|| unsupported(Self::KIND, "permissions"))?;

        let mut grants = Vec::with_capacity(self.base().permissions.len());
        for perm in &self.base().permissions {
            require("permission", "principal ID", &perm.principal_id)?;
            let mut grant = encode_value(perm);
            if remove {
                grant["Rights"] = Value::String("None".to_string());
            }
            grants.push(grant);
        }

        let args = json!({
            "ID": id,
            "PVID": id,
            "RowKey": id,
            "Grants": grants,
        });
        let _: Value = self.base().client.call(api, &args).await?;
        tracing::info!("Set {} permission entries on {} {}", grants.len(), Self::KIND, id);
        Ok(())
    }

    /// Add this object to manual sets, looked up by name
    async fn add_to_sets_by_name(&self, names: &[&str]) -> Result<()> {
        let id = self.require_id()?;
        let set_type = self.base().set_type;
        if set_type.is_empty() {
            return Err(unsupported(Self::KIND, "set membership"));
        }

        for name in names {
            let mut set = ManualSet::new(&self.base().client);
            set.base.name = name.to_string();
            set.object_type = set_type.to_string();
            set.get_id_by_name().await?;
            set.add_members(&[id.as_str()]).await?;
        }

        Ok(())
    }
}
