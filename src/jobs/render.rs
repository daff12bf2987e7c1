//! Text templates for spool entries and run-now scripts.
//!
//! Both wrap the command in the same three-descriptor swap: stderr is
//! moved to descriptor 1 and teed into the stderr capture, while the
//! original stdout travels on descriptor 3 and is teed into the stdout
//! capture. The groupings must stay exactly as written or the streams end
//! up in the wrong capture files of existing deployments.

use std::path::Path;

use crate::jobs::models::Job;
use crate::jobs::paths::{JobPaths, RunPaths};

const TERMINATOR: char = ';';

/// Append a statement terminator unless the command already ends in one
pub fn terminated(command: &str) -> String {
    if command.ends_with(TERMINATOR) {
        command.to_string()
    } else {
        format!("{}{}", command, TERMINATOR)
    }
}

fn mailer_invocation(mailer: &str, job_id: &str, stdout: &Path, stderr: &Path) -> String {
    format!(
        "{} {} {} {}",
        mailer,
        job_id,
        stdout.display(),
        stderr.display()
    )
}

/// One job's spool entry, from the leading blank line to the final newline
pub fn spool_entry(job: &Job, paths: &JobPaths, mailer: &str) -> String {
    let stdout = paths.stdout.display();
    let stderr = paths.stderr.display();

    let mut entry = format!(
        "\n#id: {} | {}\n{} (( {} ) 2>&1 1>&3 | tee {}) 3>&1 | tee {}",
        job.id,
        job.name,
        job.schedule,
        terminated(&job.command),
        stderr,
        stdout
    );

    if job.logging {
        entry.push_str(&format!(
            "; if test -f {}; then date >> {}; cat {} >> {}; fi",
            stderr,
            paths.log.display(),
            stderr,
            paths.log.display()
        ));
    }

    if let Some(hook) = &job.hook {
        entry.push_str(&format!("; if test -f {}; then {} < {}; fi", stdout, hook, stdout));
    }

    if job.is_mailing_enabled() {
        entry.push_str("; ");
        entry.push_str(&mailer_invocation(mailer, &job.id, &paths.stdout, &paths.stderr));
    }

    entry.push('\n');
    entry
}

/// The whole spool document. Stopped jobs are left out; order is kept.
pub fn spool<'a, I, F>(env: &str, jobs: I, paths_for: F, mailer: &str) -> String
where
    I: IntoIterator<Item = &'a Job>,
    F: Fn(&str) -> JobPaths,
{
    let mut spool = String::new();
    if !env.is_empty() {
        spool.push_str(env);
        spool.push('\n');
    }

    for job in jobs.into_iter().filter(|job| !job.stopped) {
        spool.push_str(&spool_entry(job, &paths_for(&job.id), mailer));
    }
    spool
}

/// Standalone script for a run-now invocation.
///
/// `pipefail` makes the pipeline report the command's own status, which the
/// script exits with after the optional mailer call.
pub fn run_script(env: &str, job: &Job, paths: &RunPaths, mailer: &str) -> String {
    let mut script = String::new();
    if !env.is_empty() {
        script.push_str(env);
        script.push_str("\n\n");
    }

    script.push_str(&format!("#id: {} | {}\n", job.id, job.name));
    script.push_str("set -o pipefail\n");
    script.push_str(&format!(
        " ( ( {} ) 2>&1 1>&3 | tee {}) 3>&1 1>&2 | tee {}\n",
        job.command,
        paths.stderr.display(),
        paths.stdout.display()
    ));
    script.push_str("rt=$?\n");
    script.push('\n');

    if job.is_mailing_enabled() {
        script.push_str(&mailer_invocation(mailer, &job.id, &paths.stdout, &paths.stderr));
        script.push('\n');
    }

    script.push_str("exit $rt\n");
    script
}
