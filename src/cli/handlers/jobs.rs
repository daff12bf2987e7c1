//! Job command handlers: list, add, edit, stop, start, remove, log

use std::fmt::Write as _;

use crate::cli::parser::{EditArgs, JobArgs};
use crate::error::{AppError, AppResult};
use crate::jobs::{Job, JobDraft, JobListing};
use crate::services::JobService;

pub struct JobCommandHandler {
    jobs: JobService,
}

impl JobCommandHandler {
    pub fn new(jobs: JobService) -> Self {
        Self { jobs }
    }

    pub async fn list(&self, json: bool) -> AppResult<()> {
        let listings = self.jobs.list_jobs().await?;
        if json {
            let rendered = serde_json::to_string_pretty(&listings)
                .map_err(|e| AppError::Internal { source: e.into() })?;
            println!("{}", rendered);
        } else {
            print!("{}", format_listing(&listings));
        }
        Ok(())
    }

    pub async fn add(&self, args: JobArgs) -> AppResult<()> {
        let job = self.jobs.create_job(draft_from_args(args)).await?;
        println!("{}", job.id);
        Ok(())
    }

    pub async fn edit(&self, id: &str, changes: EditArgs) -> AppResult<()> {
        let current = self.jobs.get_job(id).await?;
        let job = self
            .jobs
            .update_job(id, apply_changes(&current, changes))
            .await?;
        println!("Updated {}", job.id);
        Ok(())
    }

    pub async fn stop(&self, id: &str) -> AppResult<()> {
        let job = self.jobs.stop_job(id).await?;
        println!("Stopped {} ({})", job.id, job.name);
        Ok(())
    }

    pub async fn start(&self, id: &str) -> AppResult<()> {
        let job = self.jobs.start_job(id).await?;
        println!("Started {} ({})", job.id, job.name);
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> AppResult<()> {
        self.jobs.remove_job(id).await?;
        println!("Removed {}", id);
        Ok(())
    }

    pub async fn log(&self, id: &str) -> AppResult<()> {
        print!("{}", self.jobs.job_log(id).await?);
        Ok(())
    }
}

fn draft_from_args(args: JobArgs) -> JobDraft {
    JobDraft {
        name: args.name,
        command: args.command,
        schedule: args.schedule,
        logging: args.logging,
        hook: args.hook,
        mailing: args.mailing.unwrap_or_default(),
    }
}

fn apply_changes(current: &Job, changes: EditArgs) -> JobDraft {
    let mut draft = current.to_draft();
    if let Some(name) = changes.name {
        draft.name = name;
    }
    if let Some(command) = changes.command {
        draft.command = command;
    }
    if let Some(schedule) = changes.schedule {
        draft.schedule = schedule;
    }
    if let Some(logging) = changes.logging {
        draft.logging = logging;
    }
    if let Some(hook) = changes.hook {
        draft.hook = Some(hook);
    }
    if let Some(mailing) = changes.mailing {
        draft.mailing = mailing;
    }
    draft
}

pub(crate) fn format_jobs<'a>(jobs: impl IntoIterator<Item = (&'a Job, Option<&'a str>)>) -> String {
    let mut out = String::new();
    for (job, next) in jobs {
        let state = if job.stopped { "stopped" } else { "active" };
        let _ = write!(out, "{}  {:<7}  {}", job.id, state, job.schedule);
        if let Some(next) = next {
            let _ = write!(out, "  (next: {})", next);
        }
        let _ = writeln!(out, "  {}", job.name);
        let _ = writeln!(out, "    {}", job.command);
    }
    out
}

fn format_listing(listings: &[JobListing]) -> String {
    if listings.is_empty() {
        return "No jobs\n".to_string();
    }
    format_jobs(
        listings
            .iter()
            .map(|listing| (&listing.job, Some(listing.next.as_str()))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job() -> Job {
        serde_json::from_value(json!({
            "name": "nightly",
            "command": "backup.sh",
            "schedule": "0 2 * * *",
            "logging": true,
            "hook": "logger",
            "mailing": {"to": "ops"},
            "_id": "abc"
        }))
        .unwrap()
    }

    #[test]
    fn test_apply_changes_keeps_omitted_fields() {
        let draft = apply_changes(
            &job(),
            EditArgs {
                schedule: Some("@hourly".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(draft.schedule, "@hourly");
        assert_eq!(draft.command, "backup.sh");
        assert!(draft.logging);
        assert_eq!(draft.hook.as_deref(), Some("logger"));
        assert_eq!(draft.mailing["to"], "ops");
    }

    #[test]
    fn test_apply_changes_can_clear_hook_and_mailing() {
        let draft = apply_changes(
            &job(),
            EditArgs {
                hook: Some(String::new()),
                mailing: Some(Default::default()),
                ..Default::default()
            },
        );
        assert_eq!(draft.normalized_hook(), None);
        assert!(draft.mailing.is_empty());
    }

    #[test]
    fn test_format_listing() {
        let listing = JobListing {
            job: job(),
            next: "Tue Oct 20 2026 02:00:00 GMT+0200".to_string(),
        };
        let out = format_listing(&[listing]);
        assert!(out.starts_with("abc  active   0 2 * * *  (next: Tue Oct 20 2026"));
        assert!(out.ends_with("    backup.sh\n"));
        assert_eq!(format_listing(&[]), "No jobs\n");
    }
}
