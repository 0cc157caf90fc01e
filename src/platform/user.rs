//! Directory users
//!
//! Users are looked up by login name (`Username`), which is what access
//! entries name when granting rights to a user.

use super::mapper::{decode_value, encode_value, unknown_field, Field, FieldMap};
use super::object::{require, ApiPaths, VaultObject, VaultResource};
use super::permission::PermissionCategory;
use super::query::Query;
use crate::api::VaultClient;
use crate::error::Result;
use serde_json::Value;

const USER_API: ApiPaths = ApiPaths {
    create: Some("/CDirectoryService/CreateUser"),
    read: Some("/CDirectoryService/GetUser"),
    update: Some("/CDirectoryService/ChangeUser"),
    delete: Some("/UserMgmt/RemoveUser"),
    permissions: None,
};

#[derive(Debug, Clone)]
pub struct User {
    /// `base.name` is the login name, e.g. `admin@example.com`
    pub base: VaultObject,
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub password_never_expire: bool,
    pub force_password_change_next: bool,
    pub send_email_invite: bool,
    pub office_number: String,
    pub mobile_number: String,
    pub reports_to: String,
}

static USER_FIELDS: &[Field] = &[
    Field::flatten("base"),
    Field::scalar("display_name")
        .wire_omit_empty("DisplayName")
        .config_omit_empty("display_name"),
    Field::scalar("email")
        .wire_omit_empty("Mail")
        .config_omit_empty("email"),
    Field::scalar("password").wire_omit_empty("Password"),
    Field::scalar("password_never_expire")
        .wire_omit_empty("PasswordNeverExpire")
        .config_omit_empty("password_never_expire"),
    Field::scalar("force_password_change_next")
        .wire_omit_empty("ForcePasswordChangeNext")
        .config_omit_empty("force_password_change_next"),
    Field::scalar("send_email_invite")
        .wire_omit_empty("SendEmailInvite")
        .config_omit_empty("send_email_invite"),
    Field::scalar("office_number")
        .wire_omit_empty("OfficeNumber")
        .config_omit_empty("office_number"),
    Field::scalar("mobile_number")
        .wire_omit_empty("MobileNumber")
        .config_omit_empty("mobile_number"),
    Field::scalar("reports_to")
        .wire_omit_empty("ReportsTo")
        .config_omit_empty("manager_username"),
];

impl User {
    pub fn new(client: &VaultClient) -> Self {
        Self {
            base: VaultObject::new(client, PermissionCategory::Generic, "", USER_API),
            display_name: String::new(),
            email: String::new(),
            password: String::new(),
            password_never_expire: false,
            force_password_change_next: false,
            send_email_invite: false,
            office_number: String::new(),
            mobile_number: String::new(),
            reports_to: String::new(),
        }
    }
}

impl FieldMap for User {
    fn fields(&self) -> &'static [Field] {
        USER_FIELDS
    }

    fn get(&self, name: &str) -> Value {
        match name {
            "display_name" => encode_value(&self.display_name),
            "email" => encode_value(&self.email),
            "password" => encode_value(&self.password),
            "password_never_expire" => encode_value(&self.password_never_expire),
            "force_password_change_next" => encode_value(&self.force_password_change_next),
            "send_email_invite" => encode_value(&self.send_email_invite),
            "office_number" => encode_value(&self.office_number),
            "mobile_number" => encode_value(&self.mobile_number),
            "reports_to" => encode_value(&self.reports_to),
            _ => Value::Null,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "display_name" => self.display_name = decode_value(name, value)?,
            "email" => self.email = decode_value(name, value)?,
            "password" => self.password = decode_value(name, value)?,
            "password_never_expire" => self.password_never_expire = decode_value(name, value)?,
            "force_password_change_next" => {
                self.force_password_change_next = decode_value(name, value)?
            }
            "send_email_invite" => self.send_email_invite = decode_value(name, value)?,
            "office_number" => self.office_number = decode_value(name, value)?,
            "mobile_number" => self.mobile_number = decode_value(name, value)?,
            "reports_to" => self.reports_to = decode_value(name, value)?,
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

impl VaultResource for User {
    const KIND: &'static str = "user";
    const TABLE: &'static str = "User";

    fn base(&self) -> &VaultObject {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VaultObject {
        &mut self.base
    }

    fn lookup_query(&self) -> Query {
        Query::select(Self::TABLE).eq("Username", &self.base.name)
    }

    fn check_create(&self) -> Result<()> {
        require(Self::KIND, "name", &self.base.name)?;
        require(Self::KIND, "email", &self.email)
    }
}
