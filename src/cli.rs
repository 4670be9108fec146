use std::path::PathBuf;

use clap::Parser;

use crate::engine::Options;
use crate::pipeline::Request;
use crate::settings::Settings;

/// Deploy the apps listed in the manifest: clone or pull, seed and
/// inject configs, `docker compose up`, and sync Caddy snippets.
#[derive(Debug, Parser)]
#[command(name = "deploy-apps", version)]
pub struct Cli {
    /// Only deploy the app with this directory name
    #[arg(long, value_name = "DIR_NAME")]
    pub app: Option<String>,

    /// Update code and configs without starting containers
    #[arg(long)]
    pub pull_only: bool,

    /// Leave Caddy snippets and the proxy alone
    #[arg(long)]
    pub no_caddy: bool,

    /// Deploy into an isolated named environment (e.g. dev, staging)
    #[arg(long, value_name = "NAME")]
    pub env: Option<String>,

    /// Git branch or ref to deploy
    #[arg(long, value_name = "REF")]
    pub branch: Option<String>,

    /// Remove the environment's containers, clone and snippet
    /// (requires --env; configs are kept)
    #[arg(long)]
    pub teardown: bool,

    /// Root directory holding clones, configs, proxy snippets and logs
    #[arg(long, env = "DEPLOY_APPS_ROOT", default_value = Settings::DEFAULT_APPS_ROOT)]
    pub apps_root: PathBuf,

    /// Manifest file [default: <apps-root>/apps.conf]
    #[arg(long, env = "DEPLOY_APPS_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Directory the proxy imports snippets from
    /// [default: <apps-root>/caddy/conf.d]
    #[arg(long, env = "DEPLOY_APPS_PROXY_DIR")]
    pub proxy_dir: Option<PathBuf>,

    /// Host used to build `git@<host>:<owner>/<repo>.git` URLs
    #[arg(long, env = "DEPLOY_APPS_GIT_HOST")]
    pub git_host: Option<String>,

    /// Debug output on the console
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Exit status for a command line clap rejected: 0 when the user
    /// asked for help or the version, 1 for every usage error.
    #[must_use]
    pub fn usage_exit_code(err: &clap::Error) -> u8 {
        u8::from(err.use_stderr())
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::new(&self.apps_root);
        if let Some(manifest) = &self.manifest {
            settings = settings.manifest(manifest);
        }
        if let Some(dir) = &self.proxy_dir {
            settings = settings.proxy_dir(dir);
        }
        if let Some(host) = &self.git_host {
            settings = settings.git_host(host);
        }
        settings
    }

    #[must_use]
    pub fn request(&self) -> Request {
        Request {
            app: self.app.clone(),
            env: self.env.clone(),
            branch: self.branch.clone(),
            teardown: self.teardown,
            options: Options {
                pull_only: self.pull_only,
                proxy: !self.no_caddy,
            },
        }
    }
}
