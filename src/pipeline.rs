use crate::engine::{AppRun, Engine, Options};
use crate::error::{AppError, DeployError, DeployResult};
use crate::lock::RunLock;
use crate::logging::Transcript;
use crate::manifest::{self, AppEntry};
use crate::proxy::{self, CaddyServer, ReverseProxy};
use crate::report::{Outcome, RunReport};
use crate::runtime::{ContainerRuntime, DockerCompose};
use crate::settings::Settings;
use crate::target::{self, Environment};
use crate::vcs::{Git, Vcs};

/// What the operator asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Only this manifest directory.
    pub app: Option<String>,
    pub env: Option<String>,
    pub branch: Option<String>,
    pub teardown: bool,
    pub options: Options,
}

/// One invocation: validation, preconditions, every selected app
/// in manifest order, then the proxy reload.
pub struct Pipeline {
    settings: Settings,
    vcs: Box<dyn Vcs>,
    runtime: Box<dyn ContainerRuntime>,
    proxy: Box<dyn ReverseProxy>,
    transcript: Transcript,
}

impl Pipeline {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            proxy: Box::new(CaddyServer::new(&settings)),
            settings,
            vcs: Box::new(Git),
            runtime: Box::new(DockerCompose),
            transcript: Transcript::default(),
        }
    }

    #[must_use]
    pub fn vcs(mut self, vcs: impl Vcs + 'static) -> Self {
        self.vcs = Box::new(vcs);
        self
    }

    #[must_use]
    pub fn runtime(mut self, runtime: impl ContainerRuntime + 'static) -> Self {
        self.runtime = Box::new(runtime);
        self
    }

    #[must_use]
    pub fn proxy(mut self, proxy: impl ReverseProxy + 'static) -> Self {
        self.proxy = Box::new(proxy);
        self
    }

    #[must_use]
    pub fn transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = transcript;
        self
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the request.
    ///
    /// # Errors
    ///
    /// Only run-aborting conditions are errors: bad flags, missing
    /// manifest or apps root, unknown `--app`, a named environment
    /// that lands on another app's directory, unreachable container
    /// runtime, or a concurrent run. All of them are
    /// detected before anything on disk changes. Per-app failures
    /// are in the returned report.
    pub fn run(&self, request: &Request) -> DeployResult<RunReport> {
        let env = Environment::from_flags(request.env.as_deref(), request.teardown)?;
        let apps = self.select(request, &env)?;

        let mut report = RunReport::new();
        if apps.is_empty() {
            tracing::warn!(
                "manifest {} lists no apps",
                self.settings.manifest.display()
            );
            return Ok(report);
        }

        self.runtime.check()?;
        let _lock = RunLock::acquire(&self.settings.lock_path())?;

        match self.transcript.open(&self.settings.log_dir) {
            Ok(path) => report.log_path = Some(path),
            Err(e) => tracing::warn!("no transcript for this run: {e}"),
        }

        let engine = Engine::new(
            &self.settings,
            self.vcs.as_ref(),
            self.runtime.as_ref(),
            request.options,
        );

        for entry in &apps {
            let target = target::resolve(entry, &env, request.branch.as_deref(), &self.settings);
            let result = if request.teardown {
                engine.teardown(&target)
            } else {
                engine.deploy(&target)
            };
            report.proxy_changed |= result.as_ref().is_ok_and(|run| run.proxy_changed);
            report.record(&target.effective_dir_name, outcome(result));
        }

        if request.options.proxy {
            report.proxy = proxy::apply(self.proxy.as_ref(), report.proxy_changed);
        }

        report.log_summary();
        Ok(report)
    }

    fn select(&self, request: &Request, env: &Environment) -> DeployResult<Vec<AppEntry>> {
        if !self.settings.apps_root.is_dir() {
            return Err(DeployError::AppsRootMissing(
                self.settings.apps_root.clone(),
            ));
        }

        let all = manifest::open(&self.settings.manifest)?.collect::<DeployResult<Vec<_>>>()?;
        let apps: Vec<AppEntry> = match &request.app {
            Some(wanted) => all
                .iter()
                .filter(|entry| &entry.dir_name == wanted)
                .cloned()
                .collect(),
            None => all.clone(),
        };

        if let Some(wanted) = &request.app {
            if apps.is_empty() {
                return Err(DeployError::AppNotFound(wanted.clone()));
            }
        }

        if let Environment::Named(name) = env {
            for entry in &apps {
                let taken = target::resolve(entry, env, None, &self.settings).effective_dir_name;
                if all.iter().any(|other| other.dir_name == taken) {
                    return Err(DeployError::EnvCollision {
                        app: entry.dir_name.clone(),
                        env: name.clone(),
                        taken,
                    });
                }
            }
        }
        Ok(apps)
    }
}

fn outcome(result: Result<AppRun, AppError>) -> Outcome {
    match result {
        Ok(AppRun {
            warning: Some(w),
            ..
        }) => Outcome::Warned(w),
        Ok(_) => Outcome::Succeeded,
        Err(e) => Outcome::Failed(e),
    }
}
