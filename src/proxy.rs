//! Reverse proxy snippets and reload.
//!
//! Each app may ship a Caddyfile snippet. Snippets are copied into
//! the shared `conf.d` directory, which the main Caddyfile imports.
//! After a run that changed any snippet the configuration is
//! validated and only then reloaded, so one app's broken snippet
//! cannot take routing down for every other app.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cmd;
use crate::error::DeployResult;
use crate::settings::Settings;

/// The proxy server, seen as validate + reload.
pub trait ReverseProxy {
    fn validate(&self) -> DeployResult<()>;

    fn reload(&self) -> DeployResult<()>;
}

/// Caddy driven through configurable command lines.
#[derive(Debug, Clone)]
pub struct CaddyServer {
    workdir: PathBuf,
    validate: Vec<String>,
    reload: Vec<String>,
}

impl CaddyServer {
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            workdir: settings.apps_root.clone(),
            validate: settings.proxy_validate.clone(),
            reload: settings.proxy_reload.clone(),
        }
    }
}

impl ReverseProxy for CaddyServer {
    fn validate(&self) -> DeployResult<()> {
        cmd::run_argv(&self.workdir, &self.validate)
    }

    fn reload(&self) -> DeployResult<()> {
        cmd::run_argv(&self.workdir, &self.reload)
    }
}

/// Result of syncing one snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetSync {
    /// The app ships no snippet for this environment.
    Missing,
    Unchanged,
    Updated,
}

/// Copy `source` to `dest` when their bytes differ.
pub fn sync_snippet(source: &Path, dest: &Path) -> DeployResult<SnippetSync> {
    if !source.is_file() {
        return Ok(SnippetSync::Missing);
    }

    let content = fs::read(source)?;
    if fs::read(dest).is_ok_and(|current| current == content) {
        return Ok(SnippetSync::Unchanged);
    }

    if let Err(reason) = lint(&String::from_utf8_lossy(&content)) {
        tracing::warn!(
            "{} does not parse as a Caddyfile ({reason}), proxy validation will likely fail",
            source.display()
        );
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, &content)?;
    Ok(SnippetSync::Updated)
}

/// Delete a deployed snippet. Returns whether one existed.
pub fn remove_snippet(dest: &Path) -> DeployResult<bool> {
    if dest.is_file() {
        fs::remove_file(dest)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Parse a snippet locally. Catches syntax errors early; the
/// proxy's own validation stays authoritative.
pub fn lint(content: &str) -> Result<(), String> {
    let tokens = caddyfile_rs::tokenize(content).map_err(|e| format!("{e:?}"))?;
    caddyfile_rs::parse(&tokens).map_err(|e| format!("{e:?}"))?;
    Ok(())
}

/// What happened to the proxy at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyOutcome {
    /// No snippet changed, nothing to do.
    Untouched,
    Reloaded,
    /// Config rejected; the running proxy keeps its old config.
    ValidationFailed(String),
    ReloadFailed(String),
}

impl ProxyOutcome {
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self, Self::ValidationFailed(_) | Self::ReloadFailed(_))
    }
}

/// Validate and, only if valid, reload.
pub fn apply(proxy: &dyn ReverseProxy, changed: bool) -> ProxyOutcome {
    if !changed {
        tracing::debug!("no proxy snippet changed, skipping reload");
        return ProxyOutcome::Untouched;
    }

    tracing::info!("validating proxy configuration...");
    if let Err(e) = proxy.validate() {
        tracing::warn!("proxy configuration invalid, NOT reloading: {e}");
        return ProxyOutcome::ValidationFailed(e.to_string());
    }

    tracing::info!("reloading proxy...");
    match proxy.reload() {
        Ok(()) => ProxyOutcome::Reloaded,
        Err(e) => {
            tracing::warn!("proxy reload failed: {e}");
            ProxyOutcome::ReloadFailed(e.to_string())
        }
    }
}
