use std::path::PathBuf;

use deploy_apps::error::{AppError, DeployError};

#[test]
fn display_command_not_found() {
    let err = DeployError::CommandNotFound("docker".into());
    assert_eq!(err.to_string(), "command not found: docker");
}

#[test]
fn display_manifest_not_found() {
    let err = DeployError::ManifestNotFound(PathBuf::from("/opt/apps/apps.conf"));
    assert_eq!(err.to_string(), "manifest not found: /opt/apps/apps.conf");
}

#[test]
fn display_reserved_environment() {
    let err = DeployError::ReservedEnvironment;
    assert!(err.to_string().contains("'prod'"));
}

#[test]
fn display_invalid_environment() {
    let err = DeployError::InvalidEnvironment("Dev".into());
    assert_eq!(
        err.to_string(),
        "invalid environment name 'Dev': must match ^[a-z][a-z0-9-]*$"
    );
}

#[test]
fn display_app_not_found() {
    let err = DeployError::AppNotFound("ghost".into());
    assert_eq!(err.to_string(), "app 'ghost' not found in manifest");
}

#[test]
fn display_compose_not_found() {
    let err = DeployError::ComposeNotFound(PathBuf::from("/opt/apps/api/stack.yml"));
    assert_eq!(
        err.to_string(),
        "compose file not found: /opt/apps/api/stack.yml"
    );
}

#[test]
fn display_other() {
    let err = DeployError::Other("custom error".into());
    assert_eq!(err.to_string(), "custom error");
}

#[test]
fn from_io_error() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err: DeployError = io_err.into();
    assert!(matches!(err, DeployError::Io(_)));
}

#[test]
fn from_yaml_error() {
    let yaml_err = serde_yaml::from_str::<Vec<u64>>("{").unwrap_err();
    let err: DeployError = yaml_err.into();
    assert!(matches!(err, DeployError::Yaml(_)));
}

#[test]
fn app_error_names_its_step() {
    let err = AppError::Sync(DeployError::Other("offline".into()));

    assert_eq!(err.step(), "sync");
    assert_eq!(err.to_string(), "git sync failed: offline");
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn app_error_steps_are_distinct() {
    let other = || DeployError::Other(String::new());
    let steps = [
        AppError::Sync(other()).step(),
        AppError::Config(other()).step(),
        AppError::Compose(other()).step(),
        AppError::Override(other()).step(),
        AppError::Containers(other()).step(),
        AppError::Proxy(other()).step(),
        AppError::Teardown(other()).step(),
    ];

    let mut unique = steps.to_vec();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), steps.len());
}
