//! Environment resolution: where an app lives on disk for prod
//! versus a named environment.

use std::fmt;
use std::path::PathBuf;

use crate::error::{DeployError, DeployResult};
use crate::manifest::AppEntry;
use crate::settings::Settings;

pub const SNIPPET_NAME: &str = "Caddyfile.snippet";

/// Deployment environment. Prod has no suffix anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Prod,
    Named(String),
}

impl Environment {
    /// Validate the `--env` / `--teardown` combination.
    ///
    /// Runs before anything touches the filesystem.
    pub fn from_flags(env: Option<&str>, teardown: bool) -> DeployResult<Self> {
        let environment = match env {
            None | Some("") => Self::Prod,
            Some("prod") => return Err(DeployError::ReservedEnvironment),
            Some(name) if is_valid_env_name(name) => Self::Named(name.to_string()),
            Some(name) => return Err(DeployError::InvalidEnvironment(name.to_string())),
        };

        if teardown && environment.is_prod() {
            return Err(DeployError::TeardownRequiresEnv);
        }
        Ok(environment)
    }

    #[must_use]
    pub const fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Prod => None,
            Self::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or("prod"))
    }
}

/// `^[a-z][a-z0-9-]*$`
#[must_use]
pub fn is_valid_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Effective locations of one app for one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub entry: AppEntry,
    pub env: Environment,
    pub branch: Option<String>,
    pub effective_dir_name: String,
    pub clone_dir: PathBuf,
    pub config_dir: PathBuf,
    pub snippet_dest: PathBuf,
    /// Snippet file name looked up inside the clone.
    pub snippet_source: String,
}

impl DeploymentTarget {
    #[must_use]
    pub fn clone_url(&self, settings: &Settings) -> String {
        settings.clone_url(&self.entry.repo)
    }
}

/// Compute the target paths for `entry`. Pure.
#[must_use]
pub fn resolve(
    entry: &AppEntry,
    env: &Environment,
    branch: Option<&str>,
    settings: &Settings,
) -> DeploymentTarget {
    let (effective_dir_name, snippet_source) = match env {
        Environment::Prod => (entry.dir_name.clone(), SNIPPET_NAME.to_string()),
        Environment::Named(name) => (
            format!("{}-{name}", entry.dir_name),
            format!("{SNIPPET_NAME}.{name}"),
        ),
    };

    DeploymentTarget {
        entry: entry.clone(),
        env: env.clone(),
        branch: branch.map(ToString::to_string),
        clone_dir: settings.apps_root.join(&effective_dir_name),
        config_dir: settings.configs_dir().join(&effective_dir_name),
        snippet_dest: settings
            .proxy_dir
            .join(format!("{effective_dir_name}.caddy")),
        snippet_source,
        effective_dir_name,
    }
}
