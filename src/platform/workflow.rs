//! Global request workflows
//!
//! A tenant has one global workflow per workflow type (account checkout,
//! agent authentication, secrets, privilege elevation). A workflow is never
//! created or looked up by name: it is addressed by its type, and deleting it
//! only switches it off.

use super::mapper::{decode_value, encode_value, unknown_field, Field, FieldMap};
use super::object::{ApiPaths, VaultObject, VaultResource};
use super::permission::{principal_id, PermissionCategory, PrincipalType};
use super::query::Query;
use crate::api::VaultClient;
use crate::error::{Result, VaultError};
use serde_json::{json, Value};

const WORKFLOW_API: ApiPaths = ApiPaths {
    create: None,
    read: Some("/ServerManage/GetGlobalWorkflow"),
    update: Some("/ServerManage/UpdateGlobalWorkflow"),
    delete: Some("/ServerManage/UpdateGlobalWorkflow"),
    permissions: None,
};

/// Workflow types a tenant carries
pub mod workflow_type {
    pub const ACCOUNT: &str = "wf";
    pub const AGENT_AUTH: &str = "agentAuthWorkflow";
    pub const SECRETS: &str = "secretsWorkflow";
    pub const PRIVILEGE_ELEVATION: &str = "privilegeElevationWorkflow";

    pub const ALL: [&str; 4] = [ACCOUNT, AGENT_AUTH, SECRETS, PRIVILEGE_ELEVATION];
}

/// Approver kinds; `Manager` is the requester's manager and has no principal
pub mod approver_type {
    pub const MANAGER: &str = "Manager";
    pub const USER: &str = "User";
    pub const ROLE: &str = "Role";
}

/// Fallback approver used when the requester has no manager
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupApprover {
    pub guid: String,
    pub name: String,
    pub approver_type: String,
    pub directory_service: String,
    pub directory_name: String,
}

static BACKUP_APPROVER_FIELDS: &[Field] = &[
    Field::scalar("guid").wire_omit_empty("Guid"),
    Field::scalar("name")
        .wire_omit_empty("Name")
        .config_omit_empty("name"),
    Field::scalar("approver_type")
        .wire_omit_empty("Type")
        .config_omit_empty("type"),
    Field::scalar("directory_service")
        .wire_omit_empty("DirectoryService")
        .config_omit_empty("directory_service"),
    Field::scalar("directory_name")
        .wire_omit_empty("DirectoryName")
        .config_omit_empty("directory_name"),
];

impl FieldMap for BackupApprover {
    fn fields(&self) -> &'static [Field] {
        BACKUP_APPROVER_FIELDS
    }

    fn get(&self, name: &str) -> Value {
        match name {
            "guid" => encode_value(&self.guid),
            "name" => encode_value(&self.name),
            "approver_type" => encode_value(&self.approver_type),
            "directory_service" => encode_value(&self.directory_service),
            "directory_name" => encode_value(&self.directory_name),
            _ => Value::Null,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "guid" => self.guid = decode_value(name, value)?,
            "name" => self.name = decode_value(name, value)?,
            "approver_type" => self.approver_type = decode_value(name, value)?,
            "directory_service" => self.directory_service = decode_value(name, value)?,
            "directory_name" => self.directory_name = decode_value(name, value)?,
            _ => return Err(unknown_field(name)),
        }
        Ok(())
    }
}

/// One approval step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowApprover {
    pub guid: String,
    pub name: String,
    pub approver_type: String,
    pub directory_service: String,
    pub directory_name: String,
    /// Let the requester pick among the approvers
    pub options_selector: bool,
    /// What a `Manager` step does without a manager, e.g. `useBackup`
    pub no_manager_action: String,
    pub backup_approver: Option<BackupApprover>,
}

static WORKFLOW_APPROVER_FIELDS: &[Field] = &[
    Field::scalar("guid").wire_omit_empty("Guid"),
    Field::scalar("name")
        .wire_omit_empty("Name")
        .config_omit_empty("name"),
    Field::scalar("approver_type")
        .wire_omit_empty("Type")
        .config_omit_empty("type"),
    Field::scalar("directory_service")
        .wire_omit_empty("DirectoryService")
        .config_omit_empty("directory_service"),
    Field::scalar("directory_name")
        .wire_omit_empty("DirectoryName")
        .config_omit_empty("directory_name"),
    Field::scalar("options_selector")
        .wire_omit_empty("OptionsSelector")
        .config_omit_empty("options_selector"),
    Field::scalar("no_manager_action")
        .wire_omit_empty("NoManagerAction")
        .config_omit_empty("no_manager_action"),
    Field::nested("backup_approver")
        .wire_omit_empty("BackupApprover")
        .config_omit_empty("backup_approver"),
];

impl WorkflowApprover {
    /// An approver step naming a user or a role
    pub fn principal(name: &str, approver_type: &str) -> Self {
        Self {
            name: name.to_string(),
            approver_type: approver_type.to_string(),
            ..Default::default()
        }
    }

    /// The requester's manager, falling back to `backup`
    pub fn manager(backup: Option<BackupApprover>) -> Self {
        Self {
            approver_type: approver_type::MANAGER.to_string(),
            options_selector: true,
            no_manager_action: if backup.is_some() {
                "useBackup".to_string()
            } else {
                String::new()
            },
            backup_approver: backup,
            ..Default::default()
        }
    }
}

impl FieldMap for WorkflowApprover {
    fn fields(&self) -> &'static [Field] {
        WORKFLOW_APPROVER_FIELDS
    }

    fn get(&self, name: &str) -> Value {
        match name {
            "guid" => encode_value(&self.guid),
            "name" => encode_value(&self.name),
            "approver_type" => encode_value(&self.approver_type),
            "directory_service" => encode_value(&self.directory_service),
            "directory_name" => encode_value(&self.directory_name),
            "options_selector" => encode_value(&self.options_selector),
            "no_manager_action" => encode_value(&self.no_manager_action),
            _ => Value::Null,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "guid" => self.guid = decode_value(name, value)?,
            "name" => self.name = decode_value(name, value)?,
            "approver_type" => self.approver_type = decode_value(name, value)?,
            "directory_service" => self.directory_service = decode_value(name, value)?,
            "directory_name" => self.directory_name = decode_value(name, value)?,
            "options_selector" => self.options_selector = decode_value(name, value)?,
            "no_manager_action" => self.no_manager_action = decode_value(name, value)?,
            _ => return Err(unknown_field(name)),
        }
        Ok(())
    }

    fn nested(&self, name: &str) -> Option<&dyn FieldMap> {
        match name {
            "backup_approver" => self.backup_approver.as_ref().map(|b| b as &dyn FieldMap),
            _ => None,
        }
    }

    fn nested_mut(&mut self, name: &str) -> Option<&mut dyn FieldMap> {
        match name {
            "backup_approver" => {
                Some(self.backup_approver.get_or_insert_with(BackupApprover::default))
            }
            _ => None,
        }
    }
}

/// Switch and approver chain of a workflow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub enabled: bool,
    pub approvers: Vec<WorkflowApprover>,
}

static WORKFLOW_SETTINGS_FIELDS: &[Field] = &[
    Field::scalar("enabled")
        .wire("WorkflowEnabled")
        .config("enabled"),
    Field::nested_list("approvers")
        .wire_omit_empty("WorkflowApprover")
        .config_omit_empty("approver"),
];

impl FieldMap for WorkflowSettings {
    fn fields(&self) -> &'static [Field] {
        WORKFLOW_SETTINGS_FIELDS
    }

    fn get(&self, name: &str) -> Value {
        match name {
            "enabled" => encode_value(&self.enabled),
            _ => Value::Null,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "enabled" => self.enabled = decode_value(name, value)?,
            _ => return Err(unknown_field(name)),
        }
        Ok(())
    }

    fn nested_list(&self, name: &str) -> Vec<&dyn FieldMap> {
        match name {
            "approvers" => self.approvers.iter().map(|a| a as &dyn FieldMap).collect(),
            _ => Vec::new(),
        }
    }

    fn nested_list_mut(&mut self, name: &str, len: usize) -> Vec<&mut dyn FieldMap> {
        match name {
            "approvers" => {
                self.approvers = vec![WorkflowApprover::default(); len];
                self.approvers
                    .iter_mut()
                    .map(|a| a as &mut dyn FieldMap)
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GlobalWorkflow {
    pub base: VaultObject,
    pub workflow_type: String,
    pub settings: WorkflowSettings,
}

static GLOBAL_WORKFLOW_FIELDS: &[Field] = &[
    Field::scalar("workflow_type").wire("Type").config("type"),
    Field::nested("settings").wire("Settings").config("settings"),
];

impl GlobalWorkflow {
    pub fn new(client: &VaultClient, workflow_type: &str) -> Self {
        Self {
            base: VaultObject::new(client, PermissionCategory::Generic, "", WORKFLOW_API),
            workflow_type: workflow_type.to_string(),
            settings: WorkflowSettings::default(),
        }
    }
}

/// Fill in the principal identifier of a user or role approver
async fn resolve_guid(
    client: &VaultClient,
    guid: &mut String,
    name: &str,
    kind: &str,
) -> Result<()> {
    if !guid.is_empty() || kind.eq_ignore_ascii_case(approver_type::MANAGER) {
        return Ok(());
    }
    let principal_type = PrincipalType::parse(kind)?;
    *guid = principal_id(client, principal_type, name).await?;
    Ok(())
}

impl FieldMap for GlobalWorkflow {
    fn fields(&self) -> &'static [Field] {
        GLOBAL_WORKFLOW_FIELDS
    }

    fn get(&self, name: &str) -> Value {
        match name {
            "workflow_type" => encode_value(&self.workflow_type),
            _ => Value::Null,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "workflow_type" => self.workflow_type = decode_value(name, value)?,
            _ => return Err(unknown_field(name)),
        }
        Ok(())
    }

    fn nested(&self, name: &str) -> Option<&dyn FieldMap> {
        match name {
            "settings" => Some(&self.settings),
            _ => None,
        }
    }

    fn nested_mut(&mut self, name: &str) -> Option<&mut dyn FieldMap> {
        match name {
            "settings" => Some(&mut self.settings),
            _ => None,
        }
    }
}

impl VaultResource for GlobalWorkflow {
    const KIND: &'static str = "global workflow";
    const TABLE: &'static str = "GlobalWorkflow";

    fn base(&self) -> &VaultObject {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VaultObject {
        &mut self.base
    }

    fn lookup_query(&self) -> Query {
        Query::select(Self::TABLE).eq("Type", &self.workflow_type)
    }

    // Addressed by type only
    fn check_lookup(&self) -> Result<()> {
        Err(VaultError::Unsupported {
            kind: Self::KIND,
            operation: "lookup by name",
        })
    }

    fn require_id(&self) -> Result<String> {
        if self.workflow_type.is_empty() {
            tracing::error!("Missing workflow type for {}", Self::KIND);
            return Err(VaultError::MissingId(Self::KIND));
        }
        Ok(self.workflow_type.clone())
    }

    fn id_args(&self, id: &str) -> Value {
        json!({ "Type": id })
    }

    fn delete_args(&self, id: &str) -> Value {
        let mut disabled = self.clone();
        disabled.workflow_type = id.to_string();
        disabled.settings.enabled = false;
        Value::Object(disabled.update_args())
    }

    async fn resolve_dependencies(&mut self) -> Result<()> {
        let client = self.base.client.clone();
        for approver in &mut self.settings.approvers {
            resolve_guid(&client, &mut approver.guid, &approver.name, &approver.approver_type)
                .await?;
            if let Some(backup) = approver.backup_approver.as_mut() {
                resolve_guid(&client, &mut backup.guid, &backup.name, &backup.approver_type)
                    .await?;
            }
        }
        Ok(())
    }
}
