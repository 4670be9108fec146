//! Config reconciliation between a clone and its persistent
//! config directory.
//!
//! Seeding copies `*.example` / `*.template` files from the clone
//! into the config directory the first time they are seen, under
//! their real names. Injection copies the config directory back
//! over the clone before every build. Seeding only ever adds files.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{DeployError, DeployResult};

/// How deep below the clone root seeding looks for examples.
pub const SEED_MAX_DEPTH: usize = 3;

const MARKERS: [&str; 2] = [".example", ".template"];

/// Real file name for an example/template file, or `None` when
/// the name carries no marker.
///
/// ```
/// use deploy_apps::configs::seed_name;
///
/// assert_eq!(seed_name(".env.example").as_deref(), Some(".env"));
/// assert_eq!(seed_name("config.template.yml").as_deref(), Some("config.yml"));
/// assert_eq!(seed_name("README.md"), None);
/// ```
#[must_use]
pub fn seed_name(file_name: &str) -> Option<String> {
    for marker in MARKERS {
        for (idx, _) in file_name.match_indices(marker) {
            let rest = &file_name[idx + marker.len()..];
            if rest.is_empty() || rest.starts_with('.') {
                let stripped = format!("{}{rest}", &file_name[..idx]);
                if stripped.is_empty() {
                    return None;
                }
                return Some(stripped);
            }
        }
    }
    None
}

/// Seed `config_dir` from example files in `clone_dir`.
///
/// Returns the paths (relative to `config_dir`) that were created.
/// Existing destination files are never touched.
pub fn seed(clone_dir: &Path, config_dir: &Path) -> DeployResult<Vec<PathBuf>> {
    let mut seeded = Vec::new();

    let walker = WalkDir::new(clone_dir)
        .min_depth(1)
        .max_depth(SEED_MAX_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker {
        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(target_name) = entry.file_name().to_str().and_then(seed_name) else {
            continue;
        };

        let rel = entry
            .path()
            .strip_prefix(clone_dir)
            .map_err(|e| DeployError::Other(e.to_string()))?
            .with_file_name(&target_name);
        let dest = config_dir.join(&rel);
        if dest.exists() {
            tracing::debug!("config {} already present", rel.display());
            continue;
        }

        if let Some(parent) = dest.parent() {
            create_private_dir(parent)?;
        }
        fs::copy(entry.path(), &dest)?;
        restrict(&dest, 0o600)?;
        tracing::warn!(
            "seeded {} from {}, edit it before the next deploy",
            dest.display(),
            entry.path().display()
        );
        seeded.push(rel);
    }

    Ok(seeded)
}

/// Copy every file under `config_dir` into `clone_dir` at the same
/// relative path, replacing what the repository shipped.
///
/// Files whose content already matches are left alone. Returns the
/// number of files written.
pub fn inject(config_dir: &Path, clone_dir: &Path) -> DeployResult<usize> {
    if !config_dir.is_dir() {
        return Ok(0);
    }

    let mut written = 0;
    for entry in WalkDir::new(config_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(config_dir)
            .map_err(|e| DeployError::Other(e.to_string()))?;
        let dest = clone_dir.join(rel);

        let content = fs::read(entry.path())?;
        if fs::read(&dest).is_ok_and(|current| current == content) {
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, &content)?;
        tracing::info!("injected {}", rel.display());
        written += 1;
    }

    Ok(written)
}

fn walk_error(e: walkdir::Error) -> DeployError {
    DeployError::Io(e.into())
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> DeployResult<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(path)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> DeployResult<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

#[cfg(unix)]
fn restrict(path: &Path, mode: u32) -> DeployResult<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
const fn restrict(_path: &Path, _mode: u32) -> DeployResult<()> {
    Ok(())
}
