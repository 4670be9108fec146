use std::path::{Path, PathBuf};

/// Host layout and collaborator commands for a run.
///
/// Every path derives from `apps_root` unless overridden:
///
/// ```text
/// <apps_root>/<name>/                 clones
/// <apps_root>/configs/<name>/         persisted configs
/// <apps_root>/caddy/conf.d/<name>.caddy
/// <apps_root>/logs/deploy-<ts>.log
/// <apps_root>/apps.conf               manifest
/// ```
///
/// # Example
///
/// ```
/// use deploy_apps::Settings;
///
/// let settings = Settings::new("/srv/apps").git_host("git.example.com");
///
/// assert_eq!(settings.configs_dir().to_str(), Some("/srv/apps/configs"));
/// assert_eq!(settings.git_host, "git.example.com");
/// ```
#[derive(Debug, Clone)]
pub struct Settings {
    pub apps_root: PathBuf,
    pub manifest: PathBuf,
    pub proxy_dir: PathBuf,
    pub log_dir: PathBuf,
    pub git_host: String,
    pub proxy_validate: Vec<String>,
    pub proxy_reload: Vec<String>,
}

impl Settings {
    pub const DEFAULT_APPS_ROOT: &'static str = "/opt/apps";

    #[must_use]
    pub fn new(apps_root: impl AsRef<Path>) -> Self {
        let root = apps_root.as_ref().to_path_buf();
        Self {
            manifest: root.join("apps.conf"),
            proxy_dir: root.join("caddy").join("conf.d"),
            log_dir: root.join("logs"),
            apps_root: root,
            git_host: "github.com".to_string(),
            proxy_validate: argv(&[
                "caddy",
                "validate",
                "--config",
                "/etc/caddy/Caddyfile",
                "--adapter",
                "caddyfile",
            ]),
            proxy_reload: argv(&["systemctl", "reload", "caddy"]),
        }
    }

    #[must_use]
    pub fn manifest(mut self, path: impl AsRef<Path>) -> Self {
        self.manifest = path.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn proxy_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.proxy_dir = path.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn log_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.log_dir = path.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn git_host(mut self, host: &str) -> Self {
        self.git_host = host.to_string();
        self
    }

    #[must_use]
    pub fn proxy_validate(mut self, command: &[&str]) -> Self {
        self.proxy_validate = argv(command);
        self
    }

    #[must_use]
    pub fn proxy_reload(mut self, command: &[&str]) -> Self {
        self.proxy_reload = argv(command);
        self
    }

    /// Root of the persisted per-target config directories.
    #[must_use]
    pub fn configs_dir(&self) -> PathBuf {
        self.apps_root.join("configs")
    }

    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.apps_root.join(".deploy-apps.lock")
    }

    /// SSH clone URL for an `owner/name` reference.
    #[must_use]
    pub fn clone_url(&self, repo: &str) -> String {
        format!("git@{}:{repo}.git", self.git_host)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(Self::DEFAULT_APPS_ROOT)
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| (*p).to_string()).collect()
}
