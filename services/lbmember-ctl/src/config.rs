//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The API token is loaded from LBMEMBER_API_TOKEN or api_token_file, never
//! stored in the TOML directly to avoid leaking secrets.

use cloud_api::Scope;
use common::Secret;
use lbmember::{MemberConfig, MemberLocation, ScopeRef, Timeouts};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Required by every command except import.
    #[serde(default)]
    pub member: Option<MemberConfig>,
}

/// Upper bound for any operation timeout (one week).
pub const MAX_OPERATION_MINUTES: u64 = 7 * 24 * 60;

/// Control-plane connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Path to a file containing the API token (alternative to LBMEMBER_API_TOKEN)
    #[serde(default)]
    pub api_token_file: Option<PathBuf>,
    #[serde(skip)]
    pub api_token: Option<Secret<String>>,
}

/// Wait budgets for lifecycle operations
#[derive(Debug, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_operation_minutes")]
    pub create_minutes: u64,
    #[serde(default = "default_operation_minutes")]
    pub update_minutes: u64,
    #[serde(default = "default_operation_minutes")]
    pub delete_minutes: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            create_minutes: default_operation_minutes(),
            update_minutes: default_operation_minutes(),
            delete_minutes: default_operation_minutes(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

fn default_operation_minutes() -> u64 {
    lbmember::LB_MEMBER_TIMEOUT_MINUTES
}

fn default_poll_interval() -> u64 {
    1
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// API token resolution order:
    /// 1. LBMEMBER_API_TOKEN env var
    /// 2. api_token_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if !config.api.base_url.starts_with("http://")
            && !config.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.api.base_url
            )));
        }

        if config.api.request_timeout_secs == 0 {
            return Err(common::Error::Config(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        let t = &config.timeouts;
        for (name, minutes) in [
            ("create_minutes", t.create_minutes),
            ("update_minutes", t.update_minutes),
            ("delete_minutes", t.delete_minutes),
        ] {
            if !(1..=MAX_OPERATION_MINUTES).contains(&minutes) {
                return Err(common::Error::Config(format!(
                    "{name} must be between 1 and {MAX_OPERATION_MINUTES}, got: {minutes}"
                )));
            }
        }
        if t.poll_interval_secs == 0 {
            return Err(common::Error::Config(
                "poll_interval_secs must be greater than 0".into(),
            ));
        }

        // Env var takes precedence over file
        if let Ok(token) = std::env::var("LBMEMBER_API_TOKEN") {
            config.api.api_token = Some(Secret::new(token));
        } else if let Some(ref token_file) = config.api.api_token_file {
            let token = std::fs::read_to_string(token_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read api_token_file {}: {e}",
                    token_file.display()
                ))
            })?;
            let token = token.trim().to_owned();
            if !token.is_empty() {
                config.api.api_token = Some(Secret::new(token));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("lbmember.toml")
    }

    /// The `[member]` section, for commands that address a configured member.
    pub fn member(&self) -> common::Result<&MemberConfig> {
        self.member
            .as_ref()
            .ok_or_else(|| common::Error::Config("[member] section is required".into()))
    }

    /// Minutes are bounded by `load`; saturating keeps hand-built configs safe.
    pub fn lifecycle_timeouts(&self) -> Timeouts {
        let minutes = |m: u64| Duration::from_secs(m.saturating_mul(60));
        Timeouts {
            create: minutes(self.timeouts.create_minutes),
            update: minutes(self.timeouts.update_minutes),
            delete: minutes(self.timeouts.delete_minutes),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.timeouts.poll_interval_secs)
    }
}

/// Numeric project/region the API client is bound to.
///
/// Names pass member validation but are never resolved here.
pub fn client_scope(location: &MemberLocation) -> common::Result<Scope> {
    Ok(Scope {
        project_id: numeric_id("project", &location.project)?,
        region_id: numeric_id("region", &location.region)?,
    })
}

fn numeric_id(kind: &str, scope: &ScopeRef) -> common::Result<u64> {
    scope.id().ok_or_else(|| {
        common::Error::Config(format!(
            "{kind}_id is required; resolving {kind}_name is not supported"
        ))
    })
}
