use std::path::Path;

use crate::cmd;
use crate::error::DeployResult;

/// Version control operations the engine needs.
pub trait Vcs {
    /// Whether `dir` holds a checked-out repository.
    fn is_repository(&self, dir: &Path) -> bool {
        dir.join(".git").exists()
    }

    /// Clone `url` into `dir`, optionally at `branch`.
    fn clone_repo(&self, url: &str, dir: &Path, branch: Option<&str>) -> DeployResult<()>;

    /// Bring an existing clone up to date. With a branch: fetch,
    /// check it out, fast-forward it. Without: fast-forward the
    /// current branch.
    ///
    /// Local edits to tracked files are discarded first. Injected
    /// configs overwrite tracked files and are re-applied after the
    /// update, so they must never block a fast-forward.
    fn update(&self, dir: &Path, branch: Option<&str>) -> DeployResult<()>;
}

/// The `git` command line client.
#[derive(Debug, Clone, Copy, Default)]
pub struct Git;

impl Vcs for Git {
    fn clone_repo(&self, url: &str, dir: &Path, branch: Option<&str>) -> DeployResult<()> {
        let dest = dir.to_string_lossy();
        let parent = dir.parent().unwrap_or_else(|| Path::new("."));

        let mut args = vec!["clone"];
        if let Some(branch) = branch {
            args.extend(["--branch", branch]);
        }
        args.extend([url, &*dest]);

        cmd::run_in(parent, "git", &args)
    }

    fn update(&self, dir: &Path, branch: Option<&str>) -> DeployResult<()> {
        cmd::run_in(dir, "git", &["reset", "--hard", "--quiet", "HEAD"])?;
        match branch {
            Some(branch) => {
                cmd::run_in(dir, "git", &["fetch", "origin"])?;
                cmd::run_in(dir, "git", &["checkout", branch])?;
                cmd::run_in(dir, "git", &["pull", "--ff-only", "origin", branch])
            }
            None => cmd::run_in(dir, "git", &["pull", "--ff-only"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::configs;

    fn commit(dir: &Path, message: &str) {
        cmd::run_in(dir, "git", &["add", "--all"]).unwrap();
        cmd::run_in(
            dir,
            "git",
            &[
                "-c",
                "user.name=deploy-apps",
                "-c",
                "user.email=deploy-apps@localhost",
                "-c",
                "commit.gpgsign=false",
                "commit",
                "--quiet",
                "-m",
                message,
            ],
        )
        .unwrap();
    }

    #[test]
    fn injected_tracked_file_does_not_block_later_updates() {
        let root = tempfile::tempdir().unwrap();
        let upstream = root.path().join("upstream");
        let clone = root.path().join("clone");
        let store = root.path().join("configs");

        fs::create_dir_all(&upstream).unwrap();
        cmd::run_in(&upstream, "git", &["init", "--quiet"]).unwrap();
        fs::write(upstream.join("settings.toml"), "mode = \"example\"\n").unwrap();
        commit(&upstream, "initial");

        let url = upstream.to_string_lossy();
        Git.clone_repo(&url, &clone, None).unwrap();
        assert!(Git.is_repository(&clone));

        fs::create_dir_all(&store).unwrap();
        fs::write(store.join("settings.toml"), "mode = \"live\"\n").unwrap();
        assert_eq!(configs::inject(&store, &clone).unwrap(), 1);
        Git.update(&clone, None).unwrap();

        fs::write(upstream.join("settings.toml"), "mode = \"example\"\nport = 8080\n").unwrap();
        commit(&upstream, "add port");
        configs::inject(&store, &clone).unwrap();

        Git.update(&clone, None).unwrap();
        assert_eq!(
            fs::read_to_string(clone.join("settings.toml")).unwrap(),
            "mode = \"example\"\nport = 8080\n"
        );

        assert_eq!(configs::inject(&store, &clone).unwrap(), 1);
        Git.update(&clone, None).unwrap();
    }
}
