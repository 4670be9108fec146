//! Per-app deployment and teardown.
//!
//! Deploy runs, for one target:
//!
//! 1. clone or pull
//! 2. seed + inject configs (stop here if anything was seeded)
//! 3. resolve the compose file
//! 4. write the container name override (named environments)
//! 5. `up -d --build` (unless pull-only)
//! 6. sync the proxy snippet (unless disabled)
//!
//! Every step is safe to repeat, so an app left half deployed by a
//! failure resumes cleanly on the next run.

use std::fs;
use std::path::{Path, PathBuf};

use crate::compose;
use crate::configs;
use crate::error::{AppError, DeployError};
use crate::proxy::{self, SnippetSync};
use crate::report::Warning;
use crate::runtime::ContainerRuntime;
use crate::settings::Settings;
use crate::target::DeploymentTarget;
use crate::vcs::Vcs;

/// Switches that shape a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Update code and configs, never start containers.
    pub pull_only: bool,
    /// Manage proxy snippets.
    pub proxy: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            pull_only: false,
            proxy: true,
        }
    }
}

/// Successful end of one app.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AppRun {
    pub warning: Option<Warning>,
    pub proxy_changed: bool,
}

pub struct Engine<'a> {
    settings: &'a Settings,
    vcs: &'a dyn Vcs,
    runtime: &'a dyn ContainerRuntime,
    options: Options,
}

impl<'a> Engine<'a> {
    #[must_use]
    pub fn new(
        settings: &'a Settings,
        vcs: &'a dyn Vcs,
        runtime: &'a dyn ContainerRuntime,
        options: Options,
    ) -> Self {
        Self {
            settings,
            vcs,
            runtime,
            options,
        }
    }

    /// Deploy one target.
    pub fn deploy(&self, target: &DeploymentTarget) -> Result<AppRun, AppError> {
        tracing::info!(
            "deploying {} ({}) env={} branch={}",
            target.effective_dir_name,
            target.entry.repo,
            target.env,
            target.branch.as_deref().unwrap_or("-")
        );

        self.sync(target).map_err(AppError::Sync)?;

        if let Some(warning) = Self::reconcile_configs(target).map_err(AppError::Config)? {
            return Ok(AppRun {
                warning: Some(warning),
                proxy_changed: false,
            });
        }

        let mut run = AppRun::default();

        match compose::resolve(&target.clone_dir, target.entry.compose_file.as_deref())
            .map_err(AppError::Compose)?
        {
            Some(compose_file) => self.start(target, &compose_file)?,
            None => {
                tracing::warn!(
                    "no compose file in {} (tried {})",
                    target.clone_dir.display(),
                    compose::CANDIDATES.join(", ")
                );
                run.warning = Some(Warning::NoComposeFile);
            }
        }

        if self.options.proxy {
            run.proxy_changed = Self::sync_snippet(target).map_err(AppError::Proxy)?;
        }

        Ok(run)
    }

    /// Tear a named environment down: stop containers (best
    /// effort), delete the clone and the snippet. The config
    /// directory is kept.
    pub fn teardown(&self, target: &DeploymentTarget) -> Result<AppRun, AppError> {
        debug_assert!(!target.env.is_prod(), "prod is never torn down");
        tracing::info!("tearing down {}", target.effective_dir_name);

        let mut run = AppRun::default();

        if target.clone_dir.exists() {
            if let Err(e) = self.stop(target) {
                tracing::warn!("could not stop {}: {e}", target.effective_dir_name);
                run.warning = Some(Warning::StopFailed(e.to_string()));
            }
            fs::remove_dir_all(&target.clone_dir)
                .map_err(|e| AppError::Teardown(e.into()))?;
            tracing::info!("removed {}", target.clone_dir.display());
        } else {
            tracing::info!("{} not present, nothing to remove", target.clone_dir.display());
        }

        if self.options.proxy {
            run.proxy_changed =
                proxy::remove_snippet(&target.snippet_dest).map_err(AppError::Teardown)?;
            if run.proxy_changed {
                tracing::info!("removed {}", target.snippet_dest.display());
            }
        }

        if target.config_dir.exists() {
            tracing::warn!(
                "config kept at {}, remove it manually if no longer needed",
                target.config_dir.display()
            );
        }

        Ok(run)
    }

    fn sync(&self, target: &DeploymentTarget) -> Result<(), DeployError> {
        let dir = &target.clone_dir;
        let branch = target.branch.as_deref();

        if dir.exists() {
            if !self.vcs.is_repository(dir) {
                return Err(DeployError::NotARepository(dir.clone()));
            }
            tracing::info!("updating {}", dir.display());
            self.vcs.update(dir, branch)
        } else {
            let url = target.clone_url(self.settings);
            tracing::info!("cloning {url} into {}", dir.display());
            self.vcs.clone_repo(&url, dir, branch)
        }
    }

    fn reconcile_configs(target: &DeploymentTarget) -> Result<Option<Warning>, DeployError> {
        let seeded = configs::seed(&target.clone_dir, &target.config_dir)?;
        configs::inject(&target.config_dir, &target.clone_dir)?;

        if seeded.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Warning::NeedsConfig {
                config_dir: target.config_dir.clone(),
                seeded,
            }))
        }
    }

    fn start(&self, target: &DeploymentTarget, compose_file: &Path) -> Result<(), AppError> {
        if let Some(env) = target.env.name() {
            compose::generate_override(compose_file, env).map_err(AppError::Override)?;
        }

        if self.options.pull_only {
            tracing::info!("pull-only: containers not started");
            return Ok(());
        }

        let files = compose::compose_files(compose_file, !target.env.is_prod());
        tracing::info!(
            "starting containers ({})",
            display_names(&files)
        );
        self.runtime
            .up(project_dir(compose_file), &files)
            .map_err(AppError::Containers)
    }

    fn stop(&self, target: &DeploymentTarget) -> Result<(), DeployError> {
        let Some(compose_file) =
            compose::resolve(&target.clone_dir, target.entry.compose_file.as_deref())?
        else {
            tracing::debug!("no compose file, nothing to stop");
            return Ok(());
        };

        let files = compose::compose_files(&compose_file, true);
        tracing::info!("stopping containers ({})", display_names(&files));
        self.runtime.down(project_dir(&compose_file), &files)
    }

    fn sync_snippet(target: &DeploymentTarget) -> Result<bool, DeployError> {
        let source = target.clone_dir.join(&target.snippet_source);

        match proxy::sync_snippet(&source, &target.snippet_dest)? {
            SnippetSync::Updated => {
                tracing::info!(
                    "proxy snippet updated: {}",
                    target.snippet_dest.display()
                );
                Ok(true)
            }
            SnippetSync::Unchanged => {
                tracing::debug!("proxy snippet unchanged");
                Ok(false)
            }
            SnippetSync::Missing => {
                tracing::info!(
                    "no {} in repository, deployed without routing",
                    target.snippet_source
                );
                Ok(false)
            }
        }
    }
}

fn project_dir(compose_file: &Path) -> &Path {
    compose_file.parent().unwrap_or_else(|| Path::new("."))
}

fn display_names(files: &[PathBuf]) -> String {
    files
        .iter()
        .filter_map(|f| f.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" + ")
}
