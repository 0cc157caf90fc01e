use anyhow::{bail, Context, Result};
use cfyvault::api::VaultClient;
use cfyvault::config::Config;
use cfyvault::platform::mapper::{from_config_map, to_config_map};
use cfyvault::platform::path::resolve_folder_id;
use cfyvault::platform::secret::secret_type;
use cfyvault::platform::workflow::{approver_type, workflow_type, WorkflowApprover};
use cfyvault::platform::{GlobalWorkflow, Permission, Secret, SecretFolder, VaultResource};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command-line client for the Centrify/Delinea Platform vault
#[derive(Parser, Debug)]
#[command(name = "cfyvault", version = cfyvault::VERSION, about, long_about = None)]
struct Args {
    /// Tenant URL (overrides CFYVAULT_URL and the config file)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Bearer token (overrides CFYVAULT_TOKEN and the config file)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long, global = true)]
    insecure: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage secrets
    #[command(subcommand)]
    Secret(SecretCommand),

    /// Manage secret folders
    #[command(subcommand)]
    Folder(FolderCommand),

    /// Manage global request workflows
    #[command(subcommand)]
    Workflow(WorkflowCommand),

    /// Print a secret's configuration as YAML
    Export {
        #[command(flatten)]
        target: SecretTarget,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create a secret from a YAML configuration file
    Import {
        file: PathBuf,
    },

    /// Save the tenant URL to the config file
    Configure {
        #[arg(long)]
        tenant_url: String,
    },
}

/// A secret addressed by name and folder path
#[derive(ClapArgs, Debug, Clone)]
struct SecretTarget {
    /// Secret name
    #[arg(long)]
    name: String,

    /// Folder path, e.g. 'folder1\folder2' (empty for the root)
    #[arg(long, default_value = "")]
    path: String,
}

#[derive(Subcommand, Debug)]
enum SecretCommand {
    /// Create a text secret
    Create {
        #[command(flatten)]
        target: SecretTarget,

        /// Secret content
        #[arg(long)]
        text: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Add the secret to this manual set (repeatable)
        #[arg(long = "set")]
        sets: Vec<String>,
    },

    /// Print a secret's attributes as JSON
    Get {
        #[command(flatten)]
        target: SecretTarget,
    },

    /// Print a secret's content
    Checkout {
        #[command(flatten)]
        target: SecretTarget,
    },

    /// Move a secret to another folder
    Move {
        #[command(flatten)]
        target: SecretTarget,

        /// Destination folder path (empty for the root)
        #[arg(long)]
        to: String,
    },

    /// Delete a secret
    Delete {
        #[command(flatten)]
        target: SecretTarget,
    },

    /// Grant (or revoke) rights on a secret
    Grant {
        #[command(flatten)]
        target: SecretTarget,

        /// User login name or role name
        #[arg(long)]
        principal: String,

        /// `User` or `Role`
        #[arg(long = "type", default_value = "User")]
        principal_type: String,

        /// Comma-separated rights, e.g. 'View,RetrieveSecret'
        #[arg(long)]
        rights: String,

        /// Revoke instead of grant
        #[arg(long)]
        remove: bool,
    },
}

#[derive(Subcommand, Debug)]
enum FolderCommand {
    /// Print the identifier of a folder path
    Id { path: String },

    /// Create a folder; its parent must exist
    Create {
        path: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Delete a folder
    Delete { path: String },
}

#[derive(Subcommand, Debug)]
enum WorkflowCommand {
    /// Print a workflow's settings as YAML
    Get {
        #[arg(value_parser = workflow_type::ALL)]
        workflow_type: String,
    },

    /// Enable a workflow with the given approver chain
    Enable {
        #[arg(value_parser = workflow_type::ALL)]
        workflow_type: String,

        /// Approver role name (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,

        /// Approver user login name (repeatable)
        #[arg(long = "user")]
        users: Vec<String>,
    },

    /// Switch a workflow off
    Disable {
        #[arg(value_parser = workflow_type::ALL)]
        workflow_type: String,
    },
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("cfyvault started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("cfyvault").join("cfyvault.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".cfyvault").join("cfyvault.log");
    }
    PathBuf::from("cfyvault.log")
}

fn connect(args: &Args, config: &Config) -> Result<VaultClient> {
    let url = config.effective_tenant_url(args.url.as_deref())?;
    let token = config.effective_token(args.token.as_deref());
    if token.is_none() {
        tracing::warn!("No bearer token configured, calls rely on session cookies");
    }

    let options = config.http_options(token, args.insecure);
    VaultClient::new(&url, &options).with_context(|| format!("Failed to create client for {}", url))
}

fn secret_for(client: &VaultClient, target: &SecretTarget) -> Secret {
    let mut secret = Secret::new(client);
    secret.secret_name = target.name.clone();
    secret.parent_path = target.path.clone();
    secret
}

async fn run_secret(client: &VaultClient, command: SecretCommand) -> Result<()> {
    match command {
        SecretCommand::Create {
            target,
            text,
            description,
            sets,
        } => {
            let mut secret = secret_for(client, &target);
            secret.secret_text = text;
            secret.secret_type = secret_type::TEXT.to_string();
            secret.base.description = description;

            let id = secret.create().await.context("Failed to create secret")?;
            if !sets.is_empty() {
                let names: Vec<&str> = sets.iter().map(String::as_str).collect();
                secret.add_to_sets_by_name(&names).await?;
            }
            println!("{}", id);
        }
        SecretCommand::Get { target } => {
            let mut secret = secret_for(client, &target);
            secret.get_by_name().await?;

            let mut view = to_config_map(&secret);
            view.insert("id".to_string(), Value::String(secret.base.id.clone()));
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        SecretCommand::Checkout { target } => {
            let mut secret = secret_for(client, &target);
            println!("{}", secret.checkout_secret().await?);
        }
        SecretCommand::Move { target, to } => {
            let mut secret = secret_for(client, &target);
            secret.get_id_by_name().await?;
            if to.is_empty() {
                // Root: no folder to resolve
                secret.folder_id.clear();
                secret.parent_path.clear();
            } else {
                secret.new_parent_path = to;
            }
            if !secret.move_secret().await? {
                bail!("Service refused to move secret '{}'", target.name);
            }
        }
        SecretCommand::Delete { target } => {
            let mut secret = secret_for(client, &target);
            secret.delete_by_name().await?;
        }
        SecretCommand::Grant {
            target,
            principal,
            principal_type,
            rights,
            remove,
        } => {
            let mut secret = secret_for(client, &target);
            secret.get_id_by_name().await?;

            let perm = Permission::new(&principal, &principal_type).with_rights_str(&rights);
            secret.resolve_permissions(vec![perm]).await?;
            secret.set_permissions(remove).await?;
        }
    }

    Ok(())
}

async fn run_folder(client: &VaultClient, command: FolderCommand) -> Result<()> {
    match command {
        FolderCommand::Id { path } => match resolve_folder_id(client, &path).await? {
            Some(id) => println!("{}", id),
            None => bail!("Empty folder path"),
        },
        FolderCommand::Create { path, description } => {
            let mut folder = SecretFolder::with_path(client, &path);
            folder.base.description = description;
            println!("{}", folder.create().await?);
        }
        FolderCommand::Delete { path } => {
            let mut folder = SecretFolder::with_path(client, &path);
            folder.delete_by_name().await?;
        }
    }

    Ok(())
}

async fn run_workflow(client: &VaultClient, command: WorkflowCommand) -> Result<()> {
    match command {
        WorkflowCommand::Get { workflow_type } => {
            let mut workflow = GlobalWorkflow::new(client, &workflow_type);
            workflow.read().await?;
            print!("{}", serde_yaml::to_string(&to_config_map(&workflow))?);
        }
        WorkflowCommand::Enable {
            workflow_type,
            roles,
            users,
        } => {
            if roles.is_empty() && users.is_empty() {
                bail!("At least one --role or --user approver is required");
            }
            let mut workflow = GlobalWorkflow::new(client, &workflow_type);
            workflow.settings.enabled = true;
            let roles = roles
                .iter()
                .map(|name| WorkflowApprover::principal(name, approver_type::ROLE));
            let users = users
                .iter()
                .map(|name| WorkflowApprover::principal(name, approver_type::USER));
            workflow.settings.approvers = roles.chain(users).collect();
            workflow.update().await.context("Failed to update workflow")?;
        }
        WorkflowCommand::Disable { workflow_type } => {
            let mut workflow = GlobalWorkflow::new(client, &workflow_type);
            workflow.read().await?;
            workflow.delete().await.context("Failed to disable workflow")?;
        }
    }

    Ok(())
}

async fn export(
    client: &VaultClient,
    target: &SecretTarget,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut secret = secret_for(client, target);
    secret.get_by_name().await?;

    let yaml = serde_yaml::to_string(&to_config_map(&secret))?;
    match output {
        Some(path) => std::fs::write(&path, yaml)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", yaml),
    }
    Ok(())
}

async fn import(client: &VaultClient, file: &PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let document: Value = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    let Value::Object(map) = document else {
        bail!("{} is not a mapping", file.display());
    };

    let mut secret = Secret::new(client);
    from_config_map(&map, &mut secret)?;

    let id = secret.create().await.context("Failed to create secret")?;
    if !secret.sets.is_empty() {
        let names: Vec<&str> = secret.sets.iter().map(String::as_str).collect();
        secret.add_to_sets_by_name(&names).await?;
    }
    println!("{}", id);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let mut config = Config::load()?;

    if let Command::Configure { tenant_url } = &args.command {
        return config.set_tenant_url(tenant_url);
    }

    let client = connect(&args, &config)?;

    let result = match args.command {
        Command::Secret(command) => run_secret(&client, command).await,
        Command::Folder(command) => run_folder(&client, command).await,
        Command::Workflow(command) => run_workflow(&client, command).await,
        Command::Export { target, output } => export(&client, &target, output).await,
        Command::Import { file } => import(&client, &file).await,
        Command::Configure { .. } => Ok(()),
    };

    if let Err(err) = &result {
        tracing::error!("Command failed: {:?}", err);
    }
    result
}
