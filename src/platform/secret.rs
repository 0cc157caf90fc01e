//! Vault secrets
//!
//! A secret is identified by its name together with the path of its folder.
//! Creating or updating a secret under a path resolves the folder identifier
//! first, see [`super::path`].

use super::mapper::{
    decode_value, encode_value, from_map, to_wire_map, unknown_field, Field, FieldMap,
};
use super::object::{require, ApiPaths, VaultObject, VaultResource};
use super::path::resolve_lazily;
use super::permission::PermissionCategory;
use super::query::Query;
use crate::api::VaultClient;
use crate::error::{Result, VaultError};
use serde_json::{json, Map, Value};

const SECRET_API: ApiPaths = ApiPaths {
    create: Some("/ServerManage/AddSecret"),
    read: Some("/ServerManage/GetSecret"),
    update: Some("/ServerManage/UpdateSecret"),
    delete: Some("/ServerManage/DeleteSecret"),
    permissions: Some("/ServerManage/SetSecretPermissions"),
};

const RETRIEVE_SECRET_API: &str = "/ServerManage/RetrieveSecretContents";
const MOVE_SECRET_API: &str = "/ServerManage/MoveSecret";
const CHALLENGE_API: &str = "/ServerManage/GetSecretRightsAndChallenges";

/// Member table of secrets in manual sets
pub const SECRET_SET_TYPE: &str = "DataVault";

/// Secret content kinds
pub mod secret_type {
    pub const TEXT: &str = "Text";
    pub const FILE: &str = "File";
}

/// One predicate of a challenge rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleCondition {
    pub prop: String,
    pub op: String,
    pub val: String,
}

static RULE_CONDITION_FIELDS: &[Field] = &[
    Field::scalar("prop")
        .wire_omit_empty("Prop")
        .config_omit_empty("filter"),
    Field::scalar("op")
        .wire_omit_empty("Op")
        .config_omit_empty("condition"),
    Field::scalar("val")
        .wire_omit_empty("Val")
        .config_omit_empty("value"),
];

impl FieldMap for RuleCondition {
    fn fields(&self) -> &'static [Field] {
        RULE_CONDITION_FIELDS
    }

    fn get(&self, name: &str) -> Value {
        match name {
            "prop" => encode_value(&self.prop),
            "op" => encode_value(&self.op),
            "val" => encode_value(&self.val),
            _ => Value::Null,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "prop" => self.prop = decode_value(name, value)?,
            "op" => self.op = decode_value(name, value)?,
            "val" => self.val = decode_value(name, value)?,
            _ => return Err(unknown_field(name)),
        }
        Ok(())
    }
}

/// Challenge profile applied when all conditions match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChallengeRule {
    pub conditions: Vec<RuleCondition>,
    pub profile_id: String,
}

static CHALLENGE_RULE_FIELDS: &[Field] = &[
    Field::nested_list("conditions")
        .wire_omit_empty("Conditions")
        .config_omit_empty("filter"),
    Field::scalar("profile_id")
        .wire_omit_empty("ProfileId")
        .config_omit_empty("challenge_profile_id"),
];

impl FieldMap for ChallengeRule {
    fn fields(&self) -> &'static [Field] {
        CHALLENGE_RULE_FIELDS
    }

    fn get(&self, name: &str) -> Value {
        match name {
            "profile_id" => encode_value(&self.profile_id),
            _ => Value::Null,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "profile_id" => self.profile_id = decode_value(name, value)?,
            _ => return Err(unknown_field(name)),
        }
        Ok(())
    }

    fn nested_list(&self, name: &str) -> Vec<&dyn FieldMap> {
        match name {
            "conditions" => self.conditions.iter().map(|c| c as &dyn FieldMap).collect(),
            _ => Vec::new(),
        }
    }

    fn nested_list_mut(&mut self, name: &str, len: usize) -> Vec<&mut dyn FieldMap> {
        match name {
            "conditions" => {
                self.conditions = vec![RuleCondition::default(); len];
                self.conditions
                    .iter_mut()
                    .map(|c| c as &mut dyn FieldMap)
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Ordered challenge rules of a secret
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChallengeRules {
    pub enabled: bool,
    pub unique_key: String,
    pub rule_type: String,
    pub rules: Vec<ChallengeRule>,
}

static CHALLENGE_RULES_FIELDS: &[Field] = &[
    Field::scalar("enabled")
        .wire("Enabled")
        .config_omit_empty("enabled"),
    Field::scalar("unique_key")
        .wire_omit_empty("_UniqueKey")
        .config_omit_empty("unique_key"),
    Field::scalar("rule_type").wire_omit_empty("_Type"),
    Field::nested_list("rules")
        .wire_omit_empty("_Value")
        .config_omit_empty("rule"),
];

impl FieldMap for ChallengeRules {
    fn fields(&self) -> &'static [Field] {
        CHALLENGE_RULES_FIELDS
    }

    fn get(&self, name: &str) -> Value {
        match name {
            "enabled" => encode_value(&self.enabled),
            "unique_key" => encode_value(&self.unique_key),
            "rule_type" => encode_value(&self.rule_type),
            _ => Value::Null,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "enabled" => self.enabled = decode_value(name, value)?,
            "unique_key" => self.unique_key = decode_value(name, value)?,
            "rule_type" => self.rule_type = decode_value(name, value)?,
            _ => return Err(unknown_field(name)),
        }
        Ok(())
    }

    fn nested_list(&self, name: &str) -> Vec<&dyn FieldMap> {
        match name {
            "rules" => self.rules.iter().map(|r| r as &dyn FieldMap).collect(),
            _ => Vec::new(),
        }
    }

    fn nested_list_mut(&mut self, name: &str, len: usize) -> Vec<&mut dyn FieldMap> {
        match name {
            "rules" => {
                self.rules = vec![ChallengeRule::default(); len];
                self.rules.iter_mut().map(|r| r as &mut dyn FieldMap).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// A single generic secret
#[derive(Debug, Clone)]
pub struct Secret {
    pub base: VaultObject,
    pub secret_name: String,
    pub secret_text: String,
    /// `Text` or `File`
    pub secret_type: String,
    pub folder_id: String,
    /// Path of the containing folder, empty for the root
    pub parent_path: String,
    /// Default challenge profile, used when no rule matches
    pub default_profile_id: String,
    pub challenge_rules: Option<ChallengeRules>,
    /// Names of manual sets the secret belongs to
    pub sets: Vec<String>,
    /// Destination path; forces the folder identifier to be recomputed
    pub new_parent_path: String,
}

static SECRET_FIELDS: &[Field] = &[
    Field::flatten("base"),
    Field::scalar("secret_name")
        .wire_omit_empty("SecretName")
        .config_omit_empty("secret_name"),
    Field::scalar("secret_text")
        .wire_omit_empty("SecretText")
        .config_omit_empty("secret_text"),
    Field::scalar("secret_type")
        .wire_omit_empty("Type")
        .config_omit_empty("type"),
    Field::scalar("folder_id")
        .wire_omit_empty("FolderId")
        .config_omit_empty("folder_id"),
    Field::scalar("parent_path")
        .wire_omit_empty("ParentPath")
        .config_omit_empty("parent_path"),
    Field::scalar("default_profile_id")
        .wire("DataVaultDefaultProfile")
        .config("default_profile_id"),
    Field::nested("challenge_rules")
        .wire_omit_empty("DataVaultRules")
        .config_omit_empty("challenge_rule"),
    Field::scalar("sets")
        .wire_omit_empty("Sets")
        .config_omit_empty("sets"),
    Field::scalar("new_parent_path"),
];

impl Secret {
    pub fn new(client: &VaultClient) -> Self {
        Self {
            base: VaultObject::new(client, PermissionCategory::Secret, SECRET_SET_TYPE, SECRET_API),
            secret_name: String::new(),
            secret_text: String::new(),
            secret_type: String::new(),
            folder_id: String::new(),
            parent_path: String::new(),
            default_profile_id: String::new(),
            challenge_rules: None,
            sets: Vec::new(),
            new_parent_path: String::new(),
        }
    }

    /// Retrieve the secret's content
    ///
    /// Without an identifier the secret is first looked up by name and folder
    /// path, which also binds its folder identifier.
    pub async fn checkout_secret(&mut self) -> Result<String> {
        if self.base.id.is_empty() {
            self.check_lookup()?;
            let row = self.query().await?;
            if let Some(id) = row.get("ID").and_then(Value::as_str) {
                self.base.id = id.to_string();
            }
            if let Some(folder_id) = row.get("FolderId").and_then(Value::as_str) {
                self.folder_id = folder_id.to_string();
            }
        }
        let id = self.require_id()?;

        let args = json!({
            "ID": id,
            "Description": "Checkout by cfyvault",
        });
        let result = self.base.client.call_map(RETRIEVE_SECRET_API, &args).await?;

        match result.get("SecretText").and_then(Value::as_str) {
            Some(text) => {
                tracing::info!("Retrieved content of secret {}", id);
                Ok(text.to_string())
            }
            None => Err(VaultError::Result {
                method: RETRIEVE_SECRET_API.to_string(),
                message: format!("no content returned for secret '{}'", self.secret_name),
            }),
        }
    }

    /// Move the secret into the folder named by `new_parent_path`
    /// (or `folder_id` when already known); an empty target is the root
    pub async fn move_secret(&mut self) -> Result<bool> {
        let id = self.require_id()?;
        self.resolve_dependencies().await?;

        let args = json!({
            "ID": id,
            "targetFolderId": self.folder_id,
        });
        let moved = self.base.client.call_bool(MOVE_SECRET_API, &args).await?;
        tracing::info!("Moved secret {} to folder '{}'", id, self.parent_path);
        Ok(moved)
    }

    fn merge_challenges(&mut self, result: &Map<String, Value>) -> Result<()> {
        if let Some(profile) = result.get("DataVaultDefaultProfile").and_then(Value::as_str) {
            self.default_profile_id = profile.to_string();
        }

        let Some(Value::Object(challenges)) = result.get("Challenges") else {
            return Ok(());
        };
        if let Some(profile) = challenges
            .get("DataVaultDefaultProfile")
            .and_then(Value::as_str)
        {
            self.default_profile_id = profile.to_string();
        }
        if let Some(Value::Object(rules)) = challenges.get("DataVaultRules") {
            let mut challenge_rules = ChallengeRules::default();
            from_map(rules, &mut challenge_rules)?;
            self.challenge_rules = Some(challenge_rules);
        }

        Ok(())
    }
}

impl FieldMap for Secret {
    fn fields(&self) -> &'static [Field] {
        SECRET_FIELDS
    }

    fn get(&self, name: &str) -> Value {
        match name {
            "secret_name" => encode_value(&self.secret_name),
            "secret_text" => encode_value(&self.secret_text),
            "secret_type" => encode_value(&self.secret_type),
            "folder_id" => encode_value(&self.folder_id),
            "parent_path" => encode_value(&self.parent_path),
            "default_profile_id" => encode_value(&self.default_profile_id),
            "sets" => encode_value(&self.sets),
            "new_parent_path" => encode_value(&self.new_parent_path),
            _ => Value::Null,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "secret_name" => self.secret_name = decode_value(name, value)?,
            "secret_text" => self.secret_text = decode_value(name, value)?,
            "secret_type" => self.secret_type = decode_value(name, value)?,
            "folder_id" => self.folder_id = decode_value(name, value)?,
            "parent_path" => self.parent_path = decode_value(name, value)?,
            "default_profile_id" => self.default_profile_id = decode_value(name, value)?,
            "sets" => self.sets = decode_value(name, value)?,
            "new_parent_path" => self.new_parent_path = decode_value(name, value)?,
            _ => return Err(unknown_field(name)),
        }
        Ok(())
    }

    fn nested(&self, name: &str) -> Option<&dyn FieldMap> {
        match name {
            "base" => Some(&self.base),
            "challenge_rules" => self.challenge_rules.as_ref().map(|r| r as &dyn FieldMap),
            _ => None,
        }
    }

    fn nested_mut(&mut self, name: &str) -> Option<&mut dyn FieldMap> {
        match name {
            "base" => Some(&mut self.base),
            "challenge_rules" => {
                Some(self.challenge_rules.get_or_insert_with(ChallengeRules::default))
            }
            _ => None,
        }
    }
}

impl VaultResource for Secret {
    const KIND: &'static str = "secret";
    const TABLE: &'static str = "DataVault";

    fn base(&self) -> &VaultObject {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VaultObject {
        &mut self.base
    }

    /// `ParentPath` is always constrained; the root is the empty path
    fn lookup_query(&self) -> Query {
        Query::select(Self::TABLE)
            .eq_if_set("SecretName", &self.secret_name)
            .eq("ParentPath", &self.parent_path)
    }

    fn check_lookup(&self) -> Result<()> {
        require(Self::KIND, "secret_name", &self.secret_name)
    }

    fn check_create(&self) -> Result<()> {
        require(Self::KIND, "secret_name", &self.secret_name)?;
        require(Self::KIND, "type", &self.secret_type)?;
        if self.secret_type == secret_type::TEXT {
            require(Self::KIND, "secret_text", &self.secret_text)?;
        }
        Ok(())
    }

    async fn resolve_dependencies(&mut self) -> Result<()> {
        resolve_lazily(
            &self.base.client,
            &mut self.folder_id,
            &mut self.parent_path,
            &self.new_parent_path,
        )
        .await
    }

    async fn read_supplementary(&mut self) -> Result<()> {
        let args = json!({ "ID": self.base.id });
        let result = self.base.client.call_map(CHALLENGE_API, &args).await?;
        self.merge_challenges(&result)
    }

    fn create_args(&self) -> Map<String, Value> {
        let mut args = to_wire_map(self);
        args.insert("updateChallenges".to_string(), Value::Bool(false));
        args
    }

    fn update_args(&self) -> Map<String, Value> {
        let mut args = to_wire_map(self);
        args.insert("updateChallenges".to_string(), Value::Bool(true));
        args
    }
}
