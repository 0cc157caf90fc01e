//! Connectors
//!
//! Connectors are registered by the connector software itself, so they can
//! only be looked up and read; reads go through the `Proxy` query table.

use super::mapper::{decode_value, encode_value, unknown_field, Field, FieldMap};
use super::object::{ApiPaths, VaultObject, VaultResource};
use super::permission::PermissionCategory;
use super::query::Query;
use crate::api::VaultClient;
use crate::error::{Result, VaultError};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct Connector {
    pub base: VaultObject,
    pub machine_name: String,
    pub ssh_service: String,
    pub rdp_service: String,
    pub ad_proxy: String,
    pub app_gateway: String,
    pub http_api_service: String,
    pub ldap_proxy: String,
    pub radius_service: String,
    pub radius_external_service: String,
    pub online: bool,
    pub version: String,
    pub vpc_identifier: String,
    pub vm_identifier: String,
    /// Lookup filter on `Online`: `Active` or any other non-empty status
    pub status: String,
}

static CONNECTOR_FIELDS: &[Field] = &[
    Field::flatten("base"),
    Field::scalar("machine_name")
        .wire_omit_empty("MachineName")
        .config_omit_empty("machine_name"),
    Field::scalar("ssh_service")
        .wire_omit_empty("SSHService")
        .config_omit_empty("ssh_service"),
    Field::scalar("rdp_service")
        .wire_omit_empty("RDPService")
        .config_omit_empty("rdp_service"),
    Field::scalar("ad_proxy")
        .wire_omit_empty("ADProxy")
        .config_omit_empty("ad_proxy"),
    Field::scalar("app_gateway")
        .wire_omit_empty("AppGateway")
        .config_omit_empty("app_gateway"),
    Field::scalar("http_api_service")
        .wire_omit_empty("HttpAPIService")
        .config_omit_empty("http_api_service"),
    Field::scalar("ldap_proxy")
        .wire_omit_empty("LDAPProxy")
        .config_omit_empty("ldap_proxy"),
    Field::scalar("radius_service")
        .wire_omit_empty("RadiusService")
        .config_omit_empty("radius_service"),
    Field::scalar("radius_external_service")
        .wire_omit_empty("RadiusExternalService")
        .config_omit_empty("radius_external_service"),
    Field::scalar("online")
        .wire_omit_empty("Online")
        .config_omit_empty("online"),
    Field::scalar("version")
        .wire_omit_empty("Version")
        .config_omit_empty("version"),
    Field::scalar("vpc_identifier")
        .wire_omit_empty("VpcIdentifier")
        .config_omit_empty("vpc_identifier"),
    Field::scalar("vm_identifier")
        .wire_omit_empty("VmIdentifier")
        .config_omit_empty("vm_identifier"),
    Field::scalar("status"),
];

impl Connector {
    pub fn new(client: &VaultClient) -> Self {
        Self {
            base: VaultObject::new(
                client,
                PermissionCategory::Generic,
                "",
                ApiPaths::default(),
            ),
            machine_name: String::new(),
            ssh_service: String::new(),
            rdp_service: String::new(),
            ad_proxy: String::new(),
            app_gateway: String::new(),
            http_api_service: String::new(),
            ldap_proxy: String::new(),
            radius_service: String::new(),
            radius_external_service: String::new(),
            online: false,
            version: String::new(),
            vpc_identifier: String::new(),
            vm_identifier: String::new(),
            status: String::new(),
        }
    }
}

impl FieldMap for Connector {
    fn fields(&self) -> &'static [Field] {
        CONNECTOR_FIELDS
    }

    fn get(&self, name: &str) -> Value {
        match name {
            "machine_name" => encode_value(&self.machine_name),
            "ssh_service" => encode_value(&self.ssh_service),
            "rdp_service" => encode_value(&self.rdp_service),
            "ad_proxy" => encode_value(&self.ad_proxy),
            "app_gateway" => encode_value(&self.app_gateway),
            "http_api_service" => encode_value(&self.http_api_service),
            "ldap_proxy" => encode_value(&self.ldap_proxy),
            "radius_service" => encode_value(&self.radius_service),
            "radius_external_service" => encode_value(&self.radius_external_service),
            "online" => encode_value(&self.online),
            "version" => encode_value(&self.version),
            "vpc_identifier" => encode_value(&self.vpc_identifier),
            "vm_identifier" => encode_value(&self.vm_identifier),
            "status" => encode_value(&self.status),
            _ => Value::Null,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "machine_name" => self.machine_name = decode_value(name, value)?,
            "ssh_service" => self.ssh_service = decode_value(name, value)?,
            "rdp_service" => self.rdp_service = decode_value(name, value)?,
            "ad_proxy" => self.ad_proxy = decode_value(name, value)?,
            "app_gateway" => self.app_gateway = decode_value(name, value)?,
            "http_api_service" => self.http_api_service = decode_value(name, value)?,
            "ldap_proxy" => self.ldap_proxy = decode_value(name, value)?,
            "radius_service" => self.radius_service = decode_value(name, value)?,
            "radius_external_service" => self.radius_external_service = decode_value(name, value)?,
            "online" => self.online = decode_value(name, value)?,
            "version" => self.version = decode_value(name, value)?,
            "vpc_identifier" => self.vpc_identifier = decode_value(name, value)?,
            "vm_identifier" => self.vm_identifier = decode_value(name, value)?,
            "status" => self.status = decode_value(name, value)?,
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

impl VaultResource for Connector {
    const KIND: &'static str = "connector";
    const TABLE: &'static str = "Proxy";

    fn base(&self) -> &VaultObject {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VaultObject {
        &mut self.base
    }

    fn lookup_query(&self) -> Query {
        let mut query = Query::select(Self::TABLE).eq_if_set("Name", &self.base.name);
        if !self.status.is_empty() {
            query = query.is("Online", self.status == "Active");
        }
        query
            .eq_if_set("Version", &self.version)
            .eq_if_set("VpcIdentifier", &self.vpc_identifier)
            .eq_if_set("VmIdentifier", &self.vm_identifier)
    }

    /// Any one identifying attribute is enough
    fn check_lookup(&self) -> Result<()> {
        let identified = [
            &self.base.name,
            &self.status,
            &self.version,
            &self.vpc_identifier,
            &self.vm_identifier,
        ]
        .iter()
        .any(|value| !value.is_empty());

        if identified {
            Ok(())
        } else {
            Err(VaultError::MissingAttribute {
                kind: Self::KIND,
                attribute: "name",
            })
        }
    }
}
