use std::fs;
use std::path::{Path, PathBuf};

use docker_compose_types::{Compose, Service, Services};
use indexmap::IndexMap;
use serde_yaml::Value;

use crate::error::{DeployError, DeployResult};

/// Compose file names probed, in priority order, when the manifest
/// does not name one.
pub const CANDIDATES: [&str; 3] = [
    "docker-compose.yml",
    "compose.yml",
    "docker-compose.prod.yml",
];

/// Generated per-environment container name override.
pub const OVERRIDE_FILE: &str = ".compose.env-override.yml";

/// Locate the compose file for a clone.
///
/// An explicit name must exist. Without one, the first existing
/// [`CANDIDATES`] entry wins and `Ok(None)` means none was found.
pub fn resolve(clone_dir: &Path, explicit: Option<&str>) -> DeployResult<Option<PathBuf>> {
    if let Some(name) = explicit {
        let path = clone_dir.join(name);
        return if path.is_file() {
            Ok(Some(path))
        } else {
            Err(DeployError::ComposeNotFound(path))
        };
    }

    Ok(CANDIDATES
        .iter()
        .map(|name| clone_dir.join(name))
        .find(|path| path.is_file()))
}

/// Container name for `env`: a `-prod` suffix is replaced, any
/// other name gets the suffix appended.
///
/// ```
/// use deploy_apps::compose::override_name;
///
/// assert_eq!(override_name("shop-prod", "dev"), "shop-dev");
/// assert_eq!(override_name("shop-db", "dev"), "shop-db-dev");
/// ```
#[must_use]
pub fn override_name(name: &str, env: &str) -> String {
    let base = name.strip_suffix("-prod").unwrap_or(name);
    format!("{base}-{env}")
}

/// Service name to `container_name` for every service that sets
/// one, in file order.
///
/// The file is parsed as YAML, so indentation width, anchors and
/// `<<` merge keys are all honoured. Multi-document files are not
/// supported.
pub fn container_names(content: &str, path: &Path) -> DeployResult<IndexMap<String, String>> {
    let parse_error = |reason: String| DeployError::ComposeParse {
        path: path.to_path_buf(),
        reason,
    };

    let mut doc: Value = serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
    doc.apply_merge().map_err(|e| parse_error(e.to_string()))?;

    let mut names = IndexMap::new();
    let Some(services) = doc.get("services") else {
        return Ok(names);
    };
    let services = services
        .as_mapping()
        .ok_or_else(|| parse_error("'services' is not a mapping".into()))?;

    for (service, definition) in services {
        let (Some(service), Some(container)) = (
            service.as_str(),
            definition.get("container_name").and_then(Value::as_str),
        ) else {
            continue;
        };
        names.insert(service.to_string(), container.to_string());
    }

    Ok(names)
}

/// Render the override document remapping each container name.
pub fn render_override(names: &IndexMap<String, String>, env: &str) -> DeployResult<String> {
    let services: IndexMap<String, Option<Service>> = names
        .iter()
        .map(|(service, container)| {
            let overridden = Service {
                container_name: Some(override_name(container, env)),
                ..Default::default()
            };
            (service.clone(), Some(overridden))
        })
        .collect();

    let compose = Compose {
        services: Services(services),
        ..Default::default()
    };

    Ok(serde_yaml::to_string(&compose)?)
}

/// Write the override next to `compose_file` for `env`.
///
/// Returns the override path, or `None` when the compose file sets
/// no container names (a stale override is then removed). The file
/// is only rewritten when its content changes.
pub fn generate_override(compose_file: &Path, env: &str) -> DeployResult<Option<PathBuf>> {
    let content = fs::read_to_string(compose_file)?;
    let names = container_names(&content, compose_file)?;
    let dest = override_path(compose_file);

    if names.is_empty() {
        if dest.exists() {
            fs::remove_file(&dest)?;
        }
        tracing::debug!(
            "{} sets no container names, no override needed",
            compose_file.display()
        );
        return Ok(None);
    }

    let rendered = render_override(&names, env)?;
    if fs::read_to_string(&dest).is_ok_and(|current| current == rendered) {
        tracing::debug!("override unchanged: {}", dest.display());
    } else {
        fs::write(&dest, &rendered)?;
        for (service, container) in &names {
            tracing::info!(
                "container {container} -> {} ({service})",
                override_name(container, env)
            );
        }
    }

    Ok(Some(dest))
}

/// Override location for a compose file.
#[must_use]
pub fn override_path(compose_file: &Path) -> PathBuf {
    compose_file.with_file_name(OVERRIDE_FILE)
}

/// Files handed to `docker compose -f`: the base file, plus the
/// override when one exists and the environment is not prod.
#[must_use]
pub fn compose_files(compose_file: &Path, named_env: bool) -> Vec<PathBuf> {
    let mut files = vec![compose_file.to_path_buf()];
    let overlay = override_path(compose_file);
    if named_env && overlay.is_file() {
        files.push(overlay);
    }
    files
}
