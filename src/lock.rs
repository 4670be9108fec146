use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{DeployError, DeployResult};

/// Exclusive run lock, released on drop.
///
/// Two deployments on the same host would race on the proxy
/// directory and the compose projects, so the second one refuses
/// to start. A lock whose recorded holder is no longer running is
/// taken over.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: &Path) -> DeployResult<Self> {
        match Self::create(path) {
            Err(DeployError::Locked { holder, .. }) if is_stale(&holder) => {
                tracing::warn!(
                    "taking over lock {} left by {holder}, which is no longer running",
                    path.display()
                );
                fs::remove_file(path)?;
                Self::create(path)
            }
            other => other,
        }
    }

    fn create(path: &Path) -> DeployResult<Self> {
        match File::options().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                Ok(Self {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(path)
                    .map(|pid| format!("pid {}", pid.trim()))
                    .unwrap_or_else(|_| "unknown process".to_string());
                Err(DeployError::Locked {
                    path: path.to_path_buf(),
                    holder,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Whether `holder` names a PID that no longer exists. Anything
/// unparseable is treated as live.
fn is_stale(holder: &str) -> bool {
    holder
        .strip_prefix("pid ")
        .and_then(|pid| pid.parse::<i32>().ok())
        .is_some_and(|pid| pid > 0 && !is_running(pid))
}

#[cfg(unix)]
fn is_running(pid: i32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal;
    use nix::unistd::Pid;

    !matches!(signal::kill(Pid::from_raw(pid), None), Err(Errno::ESRCH))
}

#[cfg(not(unix))]
const fn is_running(_pid: i32) -> bool {
    true
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("could not remove lock {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_released() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".deploy-apps.lock");

        let lock = RunLock::acquire(&path).unwrap();
        let err = RunLock::acquire(&path).unwrap_err();
        assert!(matches!(err, DeployError::Locked { .. }));
        assert!(err.to_string().contains(&format!("pid {}", std::process::id())));

        drop(lock);
        assert!(!path.exists());
        assert!(RunLock::acquire(&path).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn lock_of_a_dead_process_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".deploy-apps.lock");
        fs::write(&path, "2147483647\n").unwrap();

        let lock = RunLock::acquire(&path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap().trim(),
            std::process::id().to_string()
        );
        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn unreadable_holder_keeps_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".deploy-apps.lock");
        fs::write(&path, "not-a-pid\n").unwrap();

        let err = RunLock::acquire(&path).unwrap_err();

        assert!(matches!(err, DeployError::Locked { .. }));
        assert!(err.to_string().contains("remove the file"));
        assert!(path.exists());
    }
}
