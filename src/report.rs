use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::AppError;
use crate::proxy::ProxyOutcome;

/// Why an app finished without failing but needs an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Config files were seeded from examples; edit them, then
    /// deploy again.
    NeedsConfig { config_dir: PathBuf, seeded: Vec<PathBuf> },
    /// No compose file was found, containers were not started.
    NoComposeFile,
    /// Containers could not be stopped before removal.
    StopFailed(String),
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NeedsConfig { config_dir, seeded } => write!(
                f,
                "{} config file(s) seeded into {}, edit and redeploy",
                seeded.len(),
                config_dir.display()
            ),
            Self::NoComposeFile => f.write_str("no compose file found, containers not started"),
            Self::StopFailed(reason) => write!(f, "containers not stopped: {reason}"),
        }
    }
}

/// Final state of one app.
#[derive(Debug)]
pub enum Outcome {
    Succeeded,
    Warned(Warning),
    Failed(AppError),
}

#[derive(Debug)]
pub struct AppReport {
    pub name: String,
    pub outcome: Outcome,
}

/// Aggregate of one invocation.
#[derive(Debug)]
pub struct RunReport {
    pub apps: Vec<AppReport>,
    pub proxy_changed: bool,
    pub proxy: ProxyOutcome,
    pub log_path: Option<PathBuf>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self {
            apps: Vec::new(),
            proxy_changed: false,
            proxy: ProxyOutcome::Untouched,
            log_path: None,
        }
    }
}

impl RunReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &str, outcome: Outcome) {
        match &outcome {
            Outcome::Succeeded => tracing::info!("{name}: done"),
            Outcome::Warned(w) => tracing::warn!("{name}: {w}"),
            Outcome::Failed(e) => tracing::error!("{name}: {e}"),
        }
        self.apps.push(AppReport {
            name: name.to_string(),
            outcome,
        });
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.apps.len()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Succeeded))
    }

    #[must_use]
    pub fn warned(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Warned(_)))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    /// Process exit status: non-zero iff an app failed.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.failed() > 0)
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.apps.iter().filter(|a| pred(&a.outcome)).count()
    }

    /// Log the human readable summary and one JSON record.
    pub fn log_summary(&self) {
        tracing::info!("==== summary ====");
        tracing::info!(
            "total: {}  succeeded: {}  warnings: {}  failed: {}",
            self.total(),
            self.succeeded(),
            self.warned(),
            self.failed()
        );
        for app in &self.apps {
            match &app.outcome {
                Outcome::Succeeded => {}
                Outcome::Warned(w) => tracing::warn!("  {}: {w}", app.name),
                Outcome::Failed(e) => tracing::error!("  {} [{}]: {e}", app.name, e.step()),
            }
        }
        if self.proxy.is_warning() {
            tracing::warn!("proxy not reloaded: {:?}", self.proxy);
        }
        if let Some(path) = &self.log_path {
            tracing::info!("log: {}", path.display());
        }

        match serde_json::to_string(&self.summary()) {
            Ok(json) => tracing::info!(target: "deploy_apps::summary", "{json}"),
            Err(e) => tracing::debug!("summary not serializable: {e}"),
        }
    }

    /// Machine-readable view of the run.
    #[must_use]
    pub fn summary(&self) -> Summary<'_> {
        Summary {
            total: self.total(),
            succeeded: self.succeeded(),
            warned: self.warned(),
            failed: self.failed(),
            proxy_changed: self.proxy_changed,
            proxy: match &self.proxy {
                ProxyOutcome::Untouched => "untouched",
                ProxyOutcome::Reloaded => "reloaded",
                ProxyOutcome::ValidationFailed(_) => "validation_failed",
                ProxyOutcome::ReloadFailed(_) => "reload_failed",
            },
            log: self.log_path.as_deref(),
            apps: self
                .apps
                .iter()
                .map(|a| AppSummary {
                    name: &a.name,
                    status: match &a.outcome {
                        Outcome::Succeeded => "succeeded",
                        Outcome::Warned(_) => "warned",
                        Outcome::Failed(_) => "failed",
                    },
                    step: match &a.outcome {
                        Outcome::Failed(e) => Some(e.step()),
                        _ => None,
                    },
                    detail: match &a.outcome {
                        Outcome::Succeeded => None,
                        Outcome::Warned(w) => Some(w.to_string()),
                        Outcome::Failed(e) => Some(e.to_string()),
                    },
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub total: usize,
    pub succeeded: usize,
    pub warned: usize,
    pub failed: usize,
    pub proxy_changed: bool,
    pub proxy: &'static str,
    pub log: Option<&'a Path>,
    pub apps: Vec<AppSummary<'a>>,
}

#[derive(Debug, Serialize)]
pub struct AppSummary<'a> {
    pub name: &'a str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployError;

    #[test]
    fn counts_and_exit_code() {
        let mut report = RunReport::new();
        report.record("a", Outcome::Succeeded);
        report.record("b", Outcome::Warned(Warning::NoComposeFile));

        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.warned(), 1);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.exit_code(), 0);

        report.record(
            "c",
            Outcome::Failed(AppError::Sync(DeployError::Other("offline".into()))),
        );

        assert_eq!(report.failed(), 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn empty_run_succeeds() {
        assert_eq!(RunReport::new().exit_code(), 0);
    }

    #[test]
    fn summary_serializes() {
        let mut report = RunReport::new();
        report.record(
            "api",
            Outcome::Failed(AppError::Containers(DeployError::Other("build".into()))),
        );
        report.proxy_changed = true;
        report.proxy = ProxyOutcome::Reloaded;

        let json = serde_json::to_value(report.summary()).unwrap();

        assert_eq!(json["failed"], 1);
        assert_eq!(json["proxy"], "reloaded");
        assert_eq!(json["proxy_changed"], true);
        assert_eq!(json["apps"][0]["name"], "api");
        assert_eq!(json["apps"][0]["step"], "containers");
    }

    #[test]
    fn warning_display() {
        let w = Warning::NeedsConfig {
            config_dir: PathBuf::from("/opt/apps/configs/widget-dev"),
            seeded: vec![PathBuf::from(".env")],
        };

        assert_eq!(
            w.to_string(),
            "1 config file(s) seeded into /opt/apps/configs/widget-dev, edit and redeploy"
        );
    }
}
