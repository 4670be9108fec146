#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use deploy_apps::error::{DeployError, DeployResult};
use deploy_apps::proxy::ReverseProxy;
use deploy_apps::runtime::ContainerRuntime;
use deploy_apps::vcs::Vcs;
use deploy_apps::{Pipeline, Settings};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Shared, ordered record of collaborator calls.
#[derive(Clone, Default)]
pub struct Calls(Rc<RefCell<Vec<String>>>);

impl Calls {
    pub fn push(&self, call: String) {
        self.0.borrow_mut().push(call);
    }

    pub fn all(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// "Clones" by copying a fixture directory.
pub struct FakeGit {
    pub calls: Calls,
    pub upstream: HashMap<String, PathBuf>,
}

impl Vcs for FakeGit {
    fn clone_repo(&self, url: &str, dir: &Path, branch: Option<&str>) -> DeployResult<()> {
        self.calls.push(format!(
            "clone {url} {} {}",
            dir.display(),
            branch.unwrap_or("-")
        ));
        let source = self
            .upstream
            .get(url)
            .ok_or_else(|| DeployError::Other(format!("repository not found: {url}")))?;
        copy_tree(source, dir);
        fs::create_dir_all(dir.join(".git"))?;
        Ok(())
    }

    fn update(&self, dir: &Path, branch: Option<&str>) -> DeployResult<()> {
        self.calls
            .push(format!("pull {} {}", dir.display(), branch.unwrap_or("-")));
        Ok(())
    }
}

pub struct FakeCompose {
    pub calls: Calls,
    pub reachable: bool,
    pub fail_up: bool,
    pub fail_down: bool,
}

impl FakeCompose {
    fn describe(files: &[PathBuf]) -> String {
        files
            .iter()
            .map(|f| f.display().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ContainerRuntime for FakeCompose {
    fn check(&self) -> DeployResult<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(DeployError::RuntimeUnavailable("daemon down".into()))
        }
    }

    fn up(&self, _project_dir: &Path, files: &[PathBuf]) -> DeployResult<()> {
        self.calls.push(format!("up {}", Self::describe(files)));
        if self.fail_up {
            Err(DeployError::Other("build failed".into()))
        } else {
            Ok(())
        }
    }

    fn down(&self, _project_dir: &Path, files: &[PathBuf]) -> DeployResult<()> {
        self.calls.push(format!("down {}", Self::describe(files)));
        if self.fail_down {
            Err(DeployError::Other("no such project".into()))
        } else {
            Ok(())
        }
    }
}

pub struct FakeCaddy {
    pub calls: Calls,
    pub valid: bool,
}

impl ReverseProxy for FakeCaddy {
    fn validate(&self) -> DeployResult<()> {
        self.calls.push("validate".into());
        if self.valid {
            Ok(())
        } else {
            Err(DeployError::Other("caddy: syntax error".into()))
        }
    }

    fn reload(&self) -> DeployResult<()> {
        self.calls.push("reload".into());
        Ok(())
    }
}

/// A throwaway host: an apps root with a manifest plus upstream
/// repositories the fake git clones from.
pub struct Host {
    pub root: TempDir,
    pub upstream_root: TempDir,
    pub upstream: HashMap<String, PathBuf>,
    pub calls: Calls,
    pub reachable: bool,
    pub fail_up: bool,
    pub fail_down: bool,
    pub proxy_valid: bool,
}

impl Host {
    pub fn new(manifest: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("apps.conf"), manifest).unwrap();
        Self {
            root,
            upstream_root: tempfile::tempdir().unwrap(),
            upstream: HashMap::new(),
            calls: Calls::default(),
            reachable: true,
            fail_up: false,
            fail_down: false,
            proxy_valid: true,
        }
    }

    /// Register upstream repository `owner/name` with `files`.
    pub fn repo(&mut self, repo: &str, files: &[(&str, &str)]) -> &mut Self {
        let dir = self.upstream_root.path().join(repo.replace('/', "__"));
        for (rel, content) in files {
            write(&dir.join(rel), content);
        }
        self.upstream
            .insert(format!("git@github.com:{repo}.git"), dir);
        self
    }

    pub fn apps(&self) -> &Path {
        self.root.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    pub fn settings(&self) -> Settings {
        Settings::new(self.root.path())
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.settings())
            .vcs(FakeGit {
                calls: self.calls.clone(),
                upstream: self.upstream.clone(),
            })
            .runtime(FakeCompose {
                calls: self.calls.clone(),
                reachable: self.reachable,
                fail_up: self.fail_up,
                fail_down: self.fail_down,
            })
            .proxy(FakeCaddy {
                calls: self.calls.clone(),
                valid: self.proxy_valid,
            })
    }

    /// Every file and directory under the apps root, relative.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        WalkDir::new(self.root.path())
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .map(|e| {
                e.unwrap()
                    .path()
                    .strip_prefix(self.root.path())
                    .unwrap()
                    .to_path_buf()
            })
            .collect()
    }
}

pub fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

pub fn copy_tree(from: &Path, to: &Path) {
    for entry in WalkDir::new(from) {
        let entry = entry.unwrap();
        let dest = to.join(entry.path().strip_prefix(from).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).unwrap();
        } else {
            fs::copy(entry.path(), &dest).unwrap();
        }
    }
}

pub const WIDGET_COMPOSE: &str = "\
services:
  web:
    build: .
    container_name: widget-prod
  db:
    image: postgres:16
    container_name: widget-db
";

pub const WIDGET_SNIPPET: &str = "widget.example.com {\n\treverse_proxy widget-prod:3000\n}\n";

pub const WIDGET_DEV_SNIPPET: &str = "dev.widget.example.com {\n\treverse_proxy widget-dev:3000\n}\n";
