use std::path::PathBuf;
use std::process::ExitStatus;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("command failed: {command}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("manifest not found: {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("apps root directory missing: {}", .0.display())]
    AppsRootMissing(PathBuf),

    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error(
        "invalid environment name '{0}': must match ^[a-z][a-z0-9-]*$"
    )]
    InvalidEnvironment(String),

    #[error("'prod' is not a valid --env value, omit --env to deploy prod")]
    ReservedEnvironment,

    #[error("--teardown requires --env, prod is never torn down")]
    TeardownRequiresEnv,

    #[error("app '{0}' not found in manifest")]
    AppNotFound(String),

    #[error("'{app}' with --env {env} would use '{taken}', which is another manifest entry")]
    EnvCollision {
        app: String,
        env: String,
        taken: String,
    },

    #[error(
        "another deployment is running (lock {} held by {holder}); remove the file if no deployment is running",
        path.display()
    )]
    Locked { path: PathBuf, holder: String },

    #[error("compose file not found: {}", .0.display())]
    ComposeNotFound(PathBuf),

    #[error("cannot parse compose file {}: {reason}", path.display())]
    ComposeParse { path: PathBuf, reason: String },

    #[error("{} exists but is not a git repository", .0.display())]
    NotARepository(PathBuf),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failure of one app, tagged with the step that failed. Never
/// aborts the run: the pipeline records it and moves on.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("git sync failed: {0}")]
    Sync(#[source] DeployError),

    #[error("config reconciliation failed: {0}")]
    Config(#[source] DeployError),

    #[error("compose file: {0}")]
    Compose(#[source] DeployError),

    #[error("override generation failed: {0}")]
    Override(#[source] DeployError),

    #[error("container start failed: {0}")]
    Containers(#[source] DeployError),

    #[error("proxy snippet sync failed: {0}")]
    Proxy(#[source] DeployError),

    #[error("teardown failed: {0}")]
    Teardown(#[source] DeployError),
}

impl AppError {
    /// Short step label used in summaries.
    #[must_use]
    pub const fn step(&self) -> &'static str {
        match self {
            Self::Sync(_) => "sync",
            Self::Config(_) => "config",
            Self::Compose(_) => "compose",
            Self::Override(_) => "override",
            Self::Containers(_) => "containers",
            Self::Proxy(_) => "proxy",
            Self::Teardown(_) => "teardown",
        }
    }
}
