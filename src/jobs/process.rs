use std::ffi::{OsStr, OsString};
use std::process::Output;

use tokio::process::Command;

use crate::error::{AppError, AppResult};

/// Split a configured command line such as `crontab -l` into program and args
pub fn split_command_line(line: &str) -> AppResult<(String, Vec<String>)> {
    let mut parts = line.split_whitespace().map(str::to_string);
    let program = parts
        .next()
        .ok_or_else(|| AppError::validation("command", "Command line must not be empty"))?;
    Ok((program, parts.collect()))
}

/// Run a command to completion and return its output.
///
/// No timeout is applied. A launch failure or a non-zero exit becomes
/// [`AppError::SubprocessFailure`] carrying the exit status when there is one.
pub async fn run<I, S>(program: &str, args: I) -> AppResult<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args);
    let rendered = format!("{:?}", command.as_std());
    tracing::info!(command = %rendered, "Launching subprocess");

    let output = command
        .output()
        .await
        .map_err(|e| AppError::SubprocessFailure {
            command: rendered.clone(),
            status: None,
            stderr: e.to_string(),
        })?;

    if output.status.success() {
        return Ok(output);
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    tracing::warn!(command = %rendered, status = ?output.status.code(), "Subprocess failed");
    Err(AppError::SubprocessFailure {
        command: rendered,
        status: output.status.code(),
        stderr,
    })
}

/// Run a configured command line with extra trailing arguments
pub async fn run_line<I, S>(line: &str, extra: I) -> AppResult<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let (program, args) = split_command_line(line)?;
    let args = args
        .into_iter()
        .map(OsString::from)
        .chain(extra.into_iter().map(|arg| arg.as_ref().to_os_string()));
    run(&program, args).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command_line() {
        let (program, args) = split_command_line("crontab  -l").unwrap();
        assert_eq!(program, "crontab");
        assert_eq!(args, vec!["-l".to_string()]);

        assert!(split_command_line("   ").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_carries_exit_status() {
        let err = run("bash", ["-c", "echo oops >&2; exit 3"]).await.unwrap_err();
        match err {
            AppError::SubprocessFailure { status, stderr, .. } => {
                assert_eq!(status, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_line_appends_arguments() {
        let output = run_line("echo first", ["second"]).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), "first second\n");
    }

    #[tokio::test]
    async fn test_missing_program_has_no_status() {
        let err = run("cronsync-no-such-program", Vec::<String>::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SubprocessFailure { status: None, .. }));
    }
}
