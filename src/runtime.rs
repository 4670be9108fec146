use std::path::{Path, PathBuf};

use crate::cmd;
use crate::error::{DeployError, DeployResult};

/// Container orchestrator driven through compose files.
pub trait ContainerRuntime {
    /// Fail unless the daemon answers.
    fn check(&self) -> DeployResult<()>;

    /// Start the stack detached, rebuilding images.
    fn up(&self, project_dir: &Path, files: &[PathBuf]) -> DeployResult<()>;

    /// Stop and remove the stack's containers.
    fn down(&self, project_dir: &Path, files: &[PathBuf]) -> DeployResult<()>;
}

/// `docker compose` (the v2 plugin).
#[derive(Debug, Clone, Copy, Default)]
pub struct DockerCompose;

impl DockerCompose {
    fn compose(project_dir: &Path, files: &[PathBuf], action: &[&str]) -> DeployResult<()> {
        let files: Vec<String> = files
            .iter()
            .map(|f| f.to_string_lossy().into_owned())
            .collect();

        let mut args = vec!["compose"];
        for file in &files {
            args.extend(["-f", file.as_str()]);
        }
        args.extend(action);

        cmd::run_in(project_dir, "docker", &args)
    }
}

impl ContainerRuntime for DockerCompose {
    fn check(&self) -> DeployResult<()> {
        cmd::run("docker", &["info", "--format", "{{.ServerVersion}}"])
            .map(|version| tracing::debug!("docker daemon {version}"))
            .map_err(|e| DeployError::RuntimeUnavailable(e.to_string()))
    }

    fn up(&self, project_dir: &Path, files: &[PathBuf]) -> DeployResult<()> {
        Self::compose(project_dir, files, &["up", "-d", "--build"])
    }

    fn down(&self, project_dir: &Path, files: &[PathBuf]) -> DeployResult<()> {
        Self::compose(project_dir, files, &["down"])
    }
}
