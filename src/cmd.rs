use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use crate::error::{DeployError, DeployResult};

/// Run a command and capture its stdout. Fails if the command
/// returns a non-zero exit code.
pub fn run(program: &str, args: &[&str]) -> DeployResult<String> {
    let output = command(None, program, args)
        .output()
        .map_err(|e| spawn_error(program, e))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        relay(output.stderr.as_slice());
        Err(DeployError::CommandFailed {
            command: format_command(program, args),
            status: output.status,
        })
    }
}

/// Run a command inside `dir`, relaying each line it prints to the
/// log as it arrives so it lands in both the console and the
/// transcript while the command is still running.
pub fn run_in(dir: &Path, program: &str, args: &[&str]) -> DeployResult<()> {
    tracing::debug!(
        dir = %dir.display(),
        "$ {}",
        format_command(program, args)
    );
    let mut child = command(Some(dir), program, args)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    thread::scope(|scope| {
        if let Some(stderr) = stderr {
            scope.spawn(move || relay(stderr));
        }
        if let Some(stdout) = stdout {
            relay(stdout);
        }
    });
    let status = child.wait()?;

    if status.success() {
        Ok(())
    } else {
        Err(DeployError::CommandFailed {
            command: format_command(program, args),
            status,
        })
    }
}

/// Run an argv vector (`program` first) inside `dir`.
pub fn run_argv(dir: &Path, argv: &[String]) -> DeployResult<()> {
    let (program, rest) = argv
        .split_first()
        .ok_or_else(|| DeployError::Other("empty command line".into()))?;
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    run_in(dir, program, &args)
}

/// Non-blank lines of `stream`, decoded lossily. Stops at the first
/// read error.
fn lines(stream: impl Read) -> impl Iterator<Item = String> {
    BufReader::new(stream)
        .split(b'\n')
        .map_while(Result::ok)
        .map(|line| String::from_utf8_lossy(&line).trim_end().to_string())
        .filter(|line| !line.trim().is_empty())
}

fn relay(stream: impl Read) {
    for line in lines(stream) {
        tracing::info!(target: "deploy_apps::cmd", "  {line}");
    }
}

fn command(dir: Option<&Path>, program: &str, args: &[&str]) -> Command {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    command
}

fn spawn_error(program: &str, e: std::io::Error) -> DeployError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DeployError::CommandNotFound(program.to_string())
    } else {
        DeployError::Io(e)
    }
}

fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| (*a).to_string()));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_joins_arguments() {
        assert_eq!(
            format_command("git", &["pull", "--ff-only"]),
            "git pull --ff-only"
        );
    }

    #[test]
    fn missing_program_is_command_not_found() {
        let err = run("deploy-apps-no-such-binary", &[]).unwrap_err();
        assert!(matches!(err, DeployError::CommandNotFound(p) if p == "deploy-apps-no-such-binary"));
    }

    #[test]
    fn lines_skip_blanks_and_survive_bad_utf8() {
        let input: &[u8] = b"building web\r\n\n   \n\xffstep 2/5\ndone";

        let got: Vec<String> = lines(input).collect();

        assert_eq!(got, vec!["building web", "\u{fffd}step 2/5", "done"]);
    }

    #[test]
    fn run_in_drains_both_streams_of_a_chatty_command() {
        let dir = tempfile::tempdir().unwrap();

        run_in(
            dir.path(),
            "sh",
            &["-c", "yes err | head -n 50000 >&2; yes out | head -n 50000"],
        )
        .unwrap();
    }

    #[test]
    fn run_in_reports_the_failing_command() {
        let dir = tempfile::tempdir().unwrap();

        let err = run_in(dir.path(), "sh", &["-c", "echo partial; exit 3"]).unwrap_err();

        assert!(matches!(
            &err,
            DeployError::CommandFailed { command, status }
                if command == "sh -c echo partial; exit 3" && status.code() == Some(3)
        ));
    }

    #[test]
    fn empty_argv_is_rejected() {
        let err = run_argv(Path::new("."), &[]).unwrap_err();
        assert!(matches!(err, DeployError::Other(_)));
    }
}
