//! Load-balancer pool member control
//!
//! Single-binary CLI that drives one pool member through its lifecycle:
//! 1. Loads the desired member from a TOML config
//! 2. Runs create, read, update, delete or import against the cloud API
//! 3. Prints the resulting member state as JSON on stdout
//!
//! Logs are JSON on stderr so stdout stays machine readable.

mod config;

use anyhow::{Context, Result, bail};
use cloud_api::{HttpCloudApi, Scope};
use lbmember::{DesiredMember, MemberResource, MemberState, ReadOutcome, parse_import_id};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, client_scope};

const USAGE: &str =
    "usage: lbmember-ctl [--config PATH] <create | read ID | update ID | delete ID | import COMPOSITE_ID>";

/// Lifecycle operation requested on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Create,
    Read(String),
    Update(String),
    Delete(String),
    Import(String),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Create => "create",
            Command::Read(_) => "read",
            Command::Update(_) => "update",
            Command::Delete(_) => "delete",
            Command::Import(_) => "import",
        }
    }
}

/// Parsed CLI: optional `--config PATH` plus one command.
#[derive(Debug, PartialEq, Eq)]
struct Cli {
    config_path: Option<String>,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<Cli> {
    let mut config_path = None;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let Some(path) = iter.next() else {
                bail!("--config requires a path\n{USAGE}");
            };
            config_path = Some(path.clone());
        } else {
            positional.push(arg.as_str());
        }
    }

    let command = match positional.as_slice() {
        ["create"] => Command::Create,
        ["read", id] => Command::Read(id.to_string()),
        ["update", id] => Command::Update(id.to_string()),
        ["delete", id] => Command::Delete(id.to_string()),
        ["import", id] => Command::Import(id.to_string()),
        _ => bail!("{USAGE}"),
    };

    Ok(Cli {
        config_path,
        command,
    })
}

/// What a command needs from the configuration, validated before any remote call.
#[derive(Debug)]
struct Target {
    scope: Scope,
    pool_id: String,
    /// Set for create and update only.
    desired: Option<DesiredMember>,
}

impl Target {
    fn desired(&self) -> Result<&DesiredMember> {
        self.desired
            .as_ref()
            .context("command requires a desired member configuration")
    }
}

/// Validate only the parts of the configuration `command` uses.
///
/// Import takes its coordinates from the composite ID, read and delete need
/// the member's location, create and update need the full member.
fn resolve_target(command: &Command, config: &Config) -> Result<Target> {
    match command {
        Command::Import(id) => {
            let id = parse_import_id(id)?;
            Ok(Target {
                scope: Scope {
                    project_id: id.project_id,
                    region_id: id.region_id,
                },
                pool_id: id.pool_id,
                desired: None,
            })
        }
        Command::Read(_) | Command::Delete(_) => {
            let location = config
                .member()?
                .locate()
                .context("invalid member location")?;
            Ok(Target {
                scope: client_scope(&location).context("invalid member scope")?,
                pool_id: location.pool_id,
                desired: None,
            })
        }
        Command::Create | Command::Update(_) => {
            let desired = config
                .member()?
                .clone()
                .validate()
                .context("invalid member configuration")?;
            Ok(Target {
                scope: client_scope(&desired.location()).context("invalid member scope")?,
                pool_id: desired.pool_id.clone(),
                desired: Some(desired),
            })
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    let config_path = Config::resolve_path(cli.config_path.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let target = resolve_target(&cli.command, &config)?;
    let scope = target.scope;

    let Some(api_token) = config.api.api_token.clone() else {
        bail!("no API token configured; set LBMEMBER_API_TOKEN or api_token_file");
    };

    info!(
        base_url = %config.api.base_url,
        project_id = scope.project_id,
        region_id = scope.region_id,
        pool_id = %target.pool_id,
        command = cli.command.name(),
        "configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.api.request_timeout_secs))
        .build()
        .context("failed to build HTTP client")?;
    let api = HttpCloudApi::new(client, config.api.base_url.clone(), scope, api_token);
    let resource = MemberResource::new(&api, config.lifecycle_timeouts())
        .with_poll_interval(config.poll_interval());

    let tracked = |id: String| MemberState {
        id: Some(id),
        pool_id: target.pool_id.clone(),
        ..MemberState::default()
    };

    let state = match cli.command {
        Command::Create => resource.create(target.desired()?).await?,
        Command::Read(id) => {
            let mut state = tracked(id);
            if resource.read(&mut state).await? == ReadOutcome::Gone {
                warn!(pool_id = %state.pool_id, "member no longer exists");
            }
            state
        }
        Command::Update(id) => {
            let mut state = tracked(id);
            resource.update(&mut state, target.desired()?).await?;
            state
        }
        Command::Delete(id) => {
            let mut state = tracked(id);
            resource.delete(&mut state).await?;
            state
        }
        Command::Import(id) => {
            let mut state = resource.import(&id)?;
            if resource.read(&mut state).await? == ReadOutcome::Gone {
                bail!("cannot import {id}: member does not exist");
            }
            state
        }
    };

    let output = serde_json::to_string_pretty(&state).context("failed to encode member state")?;
    println!("{output}");
    Ok(())
}
