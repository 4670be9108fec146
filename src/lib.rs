//! Deploy Docker Compose applications onto a single VPS from a
//! manifest.
//!
//! `deploy-apps` reads a manifest of repositories, clones or pulls
//! each one under `/opt/apps`, reconciles its configuration files
//! with a persistent config store, starts it with `docker compose`,
//! and publishes its Caddy snippet to a shared reverse proxy.
//!
//! # Manifest
//!
//! ```text
//! # owner/repo      directory   [compose file]
//! acme/widget       widget      docker-compose.prod.yml
//! acme/api          api
//! ```
//!
//! # Environments
//!
//! Without `--env` an app deploys as prod into `/opt/apps/<dir>`.
//! With `--env dev` it deploys into `/opt/apps/<dir>-dev`, with its
//! own config directory, its own snippet (`Caddyfile.snippet.dev`)
//! and a generated compose override that renames every container
//! (`shop-prod` becomes `shop-dev`, `shop-db` becomes
//! `shop-db-dev`), so prod and any number of named environments can
//! run side by side behind one proxy.
//!
//! `--teardown --env dev` removes the environment again. Its config
//! directory is kept.
//!
//! # Configs and secrets
//!
//! On first deploy every `*.example` / `*.template` file in the
//! repository is copied once into `/opt/apps/configs/<dir>/` under
//! its real name, and the deploy stops so the operator can fill in
//! real values. On every deploy the files in that directory are
//! copied over the clone before the build.
//!
//! # Library use
//!
//! ```rust,no_run
//! use deploy_apps::{Pipeline, Request, Settings};
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::new("/opt/apps");
//!     let request = Request {
//!         app: Some("widget".into()),
//!         env: Some("dev".into()),
//!         ..Request::default()
//!     };
//!
//!     let report = Pipeline::new(settings).run(&request)?;
//!     std::process::exit(report.exit_code());
//! }
//! ```
//!
//! The collaborators (`git`, `docker compose`, Caddy) sit behind
//! the [`Vcs`](vcs::Vcs), [`ContainerRuntime`](runtime::ContainerRuntime)
//! and [`ReverseProxy`](proxy::ReverseProxy) traits and can be
//! swapped through [`Pipeline::vcs`], [`Pipeline::runtime`] and
//! [`Pipeline::proxy`].

// Allow noisy pedantic lints that don't add value for a
// deployment tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cli;
pub mod cmd;
pub mod compose;
pub mod configs;
pub mod engine;
pub mod error;
pub mod lock;
pub mod logging;
pub mod manifest;
pub mod pipeline;
pub mod proxy;
pub mod report;
pub mod runtime;
pub mod settings;
pub mod target;
pub mod vcs;

pub use engine::{Engine, Options};
pub use error::{AppError, DeployError, DeployResult};
pub use manifest::AppEntry;
pub use pipeline::{Pipeline, Request};
pub use report::{Outcome, RunReport};
pub use settings::Settings;
pub use target::{DeploymentTarget, Environment};
