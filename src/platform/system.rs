//! Systems (servers and other managed resources)

use super::mapper::{decode_value, encode_value, unknown_field, Field, FieldMap};
use super::object::{require, ApiPaths, VaultObject, VaultResource};
use super::permission::{PermissionCategory, PermissionTable};
use super::query::Query;
use crate::api::VaultClient;
use crate::error::Result;
use serde_json::Value;

const SYSTEM_API: ApiPaths = ApiPaths {
    create: Some("/ServerManage/AddResource"),
    read: Some("/ServerManage/GetResource"),
    update: Some("/ServerManage/UpdateResource"),
    delete: Some("/ServerManage/DeleteResource"),
    permissions: Some("/ServerManage/SetResourcePermissions"),
};

/// Member table of systems in manual sets
pub const SYSTEM_SET_TYPE: &str = "Server";

#[derive(Debug, Clone)]
pub struct System {
    pub base: VaultObject,
    pub fqdn: String,
    /// `Windows`, `Unix`, `CiscoIOS`, ...
    pub computer_class: String,
    /// `Rdp` or `Ssh`
    pub session_type: String,
    pub port: u16,
    pub timezone: String,
    /// Comma-joined connector IDs
    pub connector_list: String,
}

static SYSTEM_FIELDS: &[Field] = &[
    Field::flatten("base"),
    Field::scalar("fqdn")
        .wire_omit_empty("FQDN")
        .config_omit_empty("fqdn"),
    Field::scalar("computer_class")
        .wire_omit_empty("ComputerClass")
        .config_omit_empty("computer_class"),
    Field::scalar("session_type")
        .wire_omit_empty("SessionType")
        .config_omit_empty("session_type"),
    Field::scalar("port")
        .wire_omit_empty("Port")
        .config_omit_empty("port"),
    Field::scalar("timezone")
        .wire_omit_empty("TimeZoneID")
        .config_omit_empty("system_timezone"),
    Field::scalar("connector_list")
        .wire_omit_empty("ProxyCollectionList")
        .config_omit_empty("connector_list"),
];

/// Permission category of a computer class
pub fn category_for(computer_class: &str) -> PermissionCategory {
    match computer_class {
        "Windows" | "Unix" => PermissionCategory::WinNix,
        _ => PermissionCategory::System,
    }
}

impl System {
    pub fn new(client: &VaultClient) -> Self {
        Self {
            base: VaultObject::new(client, PermissionCategory::System, SYSTEM_SET_TYPE, SYSTEM_API),
            fqdn: String::new(),
            computer_class: String::new(),
            session_type: String::new(),
            port: 0,
            timezone: String::new(),
            connector_list: String::new(),
        }
    }

    /// Pick the permission table matching the computer class
    pub fn resolve_valid_permissions(&mut self) -> &'static PermissionTable {
        self.base.category = category_for(&self.computer_class);
        self.base.category.table()
    }
}

impl FieldMap for System {
    fn fields(&self) -> &'static [Field] {
        SYSTEM_FIELDS
    }

    fn get(&self, name: &str) -> Value {
        match name {
            "fqdn" => encode_value(&self.fqdn),
            "computer_class" => encode_value(&self.computer_class),
            "session_type" => encode_value(&self.session_type),
            "port" => encode_value(&self.port),
            "timezone" => encode_value(&self.timezone),
            "connector_list" => encode_value(&self.connector_list),
            _ => Value::Null,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "fqdn" => self.fqdn = decode_value(name, value)?,
            "computer_class" => self.computer_class = decode_value(name, value)?,
            "session_type" => self.session_type = decode_value(name, value)?,
            "port" => self.port = decode_value(name, value)?,
            "timezone" => self.timezone = decode_value(name, value)?,
            "connector_list" => self.connector_list = decode_value(name, value)?,
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

impl VaultResource for System {
    const KIND: &'static str = "system";
    const TABLE: &'static str = "Server";

    fn base(&self) -> &VaultObject {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VaultObject {
        &mut self.base
    }

    fn lookup_query(&self) -> Query {
        Query::select(Self::TABLE)
            .eq("Name", &self.base.name)
            .eq_if_set("FQDN", &self.fqdn)
            .eq_if_set("ComputerClass", &self.computer_class)
    }

    fn check_create(&self) -> Result<()> {
        require(Self::KIND, "name", &self.base.name)?;
        require(Self::KIND, "fqdn", &self.fqdn)?;
        require(Self::KIND, "computer_class", &self.computer_class)
    }

    fn valid_permissions(&self) -> &'static PermissionTable {
        category_for(&self.computer_class).table()
    }
}
