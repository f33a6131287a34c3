use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;

use carina_core::provider::{Provider, ResourceType};
use carina_core::resource::{Resource, State, Value};
use carina_core::schema::{AttributeSchema, ResourceSchema};
use carina_core::timeouts::TimeoutOverrides;
use carina_provider_azurerm::resources;
use carina_provider_azurerm::{AzurermProvider, ProviderConfig};

#[derive(Parser)]
#[command(name = "carina-azurerm")]
#[command(about = "Manage Azure resources declaratively", long_about = None)]
struct Cli {
    /// Provider configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log progress of requests and polling
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the resource described in a file, or update it in place
    Apply {
        /// Path to resource file (JSON)
        file: PathBuf,
    },
    /// Show the current state of a resource
    Show {
        resource_type: String,
        id: String,
    },
    /// Delete a resource and wait until it is gone
    Destroy {
        resource_type: String,
        id: String,

        /// Override the delete timeout (seconds)
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Import an existing resource by ID
    Import {
        resource_type: String,
        id: String,
    },
    /// Show resource type schemas
    Schema {
        /// Only show this resource type
        resource_type: Option<String>,
    },
}

/// Resource file contents
#[derive(Debug, Deserialize)]
struct ResourceFile {
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    timeouts: TimeoutsFile,
}

/// Timeouts in seconds
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimeoutsFile {
    create: Option<u64>,
    read: Option<u64>,
    update: Option<u64>,
    delete: Option<u64>,
}

impl From<TimeoutsFile> for TimeoutOverrides {
    fn from(file: TimeoutsFile) -> Self {
        Self {
            create: file.create.map(Duration::from_secs),
            read: file.read.map(Duration::from_secs),
            update: file.update.map(Duration::from_secs),
            delete: file.delete.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = match cli.command {
        Commands::Schema { resource_type } => run_schema(resource_type.as_deref()),
        command => match load_provider(cli.config.as_deref()) {
            Ok(provider) => run_command(&provider, command).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run_command(provider: &AzurermProvider, command: Commands) -> Result<(), String> {
    match command {
        Commands::Apply { file } => run_apply(provider, &file).await,
        Commands::Show { resource_type, id } => run_show(provider, &resource_type, &id).await,
        Commands::Destroy {
            resource_type,
            id,
            timeout,
        } => run_destroy(provider, &resource_type, &id, timeout).await,
        Commands::Import { resource_type, id } => run_import(provider, &resource_type, &id).await,
        Commands::Schema { resource_type } => run_schema(resource_type.as_deref()),
    }
}

fn load_provider(config: Option<&Path>) -> Result<AzurermProvider, String> {
    let config = match config {
        Some(path) => ProviderConfig::from_file(path).map_err(|e| e.to_string())?,
        None => ProviderConfig::default(),
    }
    .with_env_overrides();

    log::info!(
        "Using subscription {} at {}",
        config.subscription_id,
        config.endpoint
    );
    AzurermProvider::new(config).map_err(|e| e.to_string())
}

fn find_type(name: &str) -> Result<Box<dyn ResourceType>, String> {
    resources::find(name).ok_or_else(|| {
        let known: Vec<_> = resources::resource_types()
            .iter()
            .map(|t| t.name())
            .collect();
        format!(
            "Unknown resource type '{}', expected one of: {}",
            name,
            known.join(", ")
        )
    })
}

fn load_resource(path: &Path) -> Result<Resource, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    parse_resource(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

fn parse_resource(content: &str) -> Result<Resource, String> {
    let file: ResourceFile = serde_json::from_str(content).map_err(|e| e.to_string())?;

    let mut attributes = HashMap::new();
    for (key, value) in &file.attributes {
        let value = Value::from_json(value).map_err(|e| format!("attribute `{}`: {}", key, e))?;
        if let Some(value) = value {
            attributes.insert(key.clone(), value);
        }
    }

    let mut resource = Resource::new(file.resource_type).with_timeouts(file.timeouts.into());
    resource.attributes = attributes;
    Ok(resource)
}

async fn run_apply(provider: &AzurermProvider, file: &Path) -> Result<(), String> {
    let resource = load_resource(file)?;
    let definition = find_type(&resource.resource_type)?;
    let schema = definition.schema();

    if let Err(errors) = schema.validate(&resource.attributes) {
        let messages: Vec<_> = errors.iter().map(|e| format!("  {}", e)).collect();
        return Err(format!("Validation failed:\n{}", messages.join("\n")));
    }

    let attrs = resource.attrs();
    let (Some(resource_group), Some(name)) = (
        attrs.get_string("resource_group_name"),
        attrs.get_string("name"),
    ) else {
        return Err("`name` and `resource_group_name` must be set".to_string());
    };
    let id = definition
        .id_format()
        .build(provider.subscription_id(), resource_group, &[name])
        .to_string();

    let current = provider
        .read(&resource.resource_type, &id)
        .await
        .map_err(|e| e.to_string())?;

    let state = if current.exists {
        println!("{} {} {}", "~".yellow().bold(), resource.resource_type.cyan().bold(), id);
        provider
            .update(&id, &current, &resource)
            .await
            .map_err(|e| e.to_string())?
    } else {
        println!("{} {} {}", "+".green().bold(), resource.resource_type.cyan().bold(), id);
        provider.create(&resource).await.map_err(|e| e.to_string())?
    };

    print_state(&schema, &state);
    println!("{}", "Apply complete!".green().bold());
    Ok(())
}

async fn run_show(provider: &AzurermProvider, resource_type: &str, id: &str) -> Result<(), String> {
    let definition = find_type(resource_type)?;
    let state = provider
        .read(resource_type, id)
        .await
        .map_err(|e| e.to_string())?;

    if !state.exists {
        println!("{} {} does not exist", resource_type.cyan().bold(), id);
        return Ok(());
    }
    print_state(&definition.schema(), &state);
    Ok(())
}

async fn run_destroy(
    provider: &AzurermProvider,
    resource_type: &str,
    id: &str,
    timeout: Option<u64>,
) -> Result<(), String> {
    find_type(resource_type)?;
    println!("{} {} {}", "-".red().bold(), resource_type.cyan().bold(), id);
    provider
        .delete(resource_type, id, timeout.map(Duration::from_secs))
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", "Destroy complete!".green().bold());
    Ok(())
}

async fn run_import(
    provider: &AzurermProvider,
    resource_type: &str,
    id: &str,
) -> Result<(), String> {
    let definition = find_type(resource_type)?;
    let state = provider
        .import(resource_type, id)
        .await
        .map_err(|e| e.to_string())?;

    print_state(&definition.schema(), &state);
    println!("{}", "Import successful!".green().bold());
    Ok(())
}

fn run_schema(resource_type: Option<&str>) -> Result<(), String> {
    let types = match resource_type {
        Some(name) => vec![find_type(name)?],
        None => resources::resource_types(),
    };

    for definition in types {
        let schema = definition.schema();
        let timeouts = definition.timeouts();
        println!("{}", definition.name().cyan().bold());
        if let Some(description) = &schema.description {
            println!("  {}", description);
        }
        println!(
            "  timeouts: create={}m read={}m update={}m delete={}m",
            timeouts.create.as_secs() / 60,
            timeouts.read.as_secs() / 60,
            timeouts.update.as_secs() / 60,
            timeouts.delete.as_secs() / 60
        );

        let mut attributes: Vec<_> = schema.attributes.values().collect();
        attributes.sort_by(|a, b| a.name.cmp(&b.name));
        for attribute in attributes {
            println!(
                "    {}: {}{}",
                attribute.name.bold(),
                attribute.attr_type,
                describe_flags(attribute).dimmed()
            );
        }
        println!();
    }
    Ok(())
}

fn describe_flags(attribute: &AttributeSchema) -> String {
    let mut flags = Vec::new();
    if attribute.required {
        flags.push("required");
    } else if attribute.optional {
        flags.push("optional");
    }
    if attribute.computed {
        flags.push("computed");
    }
    if attribute.force_new {
        flags.push("force new");
    }
    if attribute.sensitive {
        flags.push("sensitive");
    }
    if flags.is_empty() {
        String::new()
    } else {
        format!(" ({})", flags.join(", "))
    }
}

fn print_state(schema: &ResourceSchema, state: &State) {
    if let Some(id) = &state.id {
        println!("  {}: {}", "id".bold(), id.white().bold());
    }

    let mut keys: Vec<_> = state.attributes.keys().collect();
    keys.sort_by(|a, b| match (a.as_str(), b.as_str()) {
        ("name", _) => std::cmp::Ordering::Less,
        (_, "name") => std::cmp::Ordering::Greater,
        _ => a.cmp(b),
    });
    for key in keys {
        println!(
            "    {}: {}",
            key,
            display_attribute(schema, key, &state.attributes[key])
        );
    }
}

fn display_attribute(schema: &ResourceSchema, key: &str, value: &Value) -> String {
    if schema.is_sensitive(key) {
        "(sensitive value)".dimmed().to_string()
    } else {
        format_value(value).green().to_string()
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let strs: Vec<_> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
    }
}
