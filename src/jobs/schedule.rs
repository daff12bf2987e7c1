//! Schedule validation and next-fire computation.
//!
//! Schedules are standard five-field crontab expressions or one of the
//! `@` shorthands understood by cron daemons. The `cron` crate expects a
//! leading seconds field and numbers weekdays from 1 (Sunday), so
//! expressions are translated before parsing.

use std::str::FromStr;

use chrono::Local;

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::models::DISPLAY_TIME_FORMAT;

pub const REBOOT: &str = "@reboot";

/// Shown instead of a time for jobs that only run at boot
pub const NEXT_REBOOT: &str = "Next Reboot";

const SHORTHANDS: &[(&str, &str)] = &[
    ("@yearly", "@yearly"),
    ("@annually", "@yearly"),
    ("@monthly", "@monthly"),
    ("@weekly", "@weekly"),
    ("@daily", "@daily"),
    ("@midnight", "@daily"),
    ("@hourly", "@hourly"),
];

const WEEKDAYS: [&str; 8] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

#[derive(Debug, Clone)]
pub enum JobSchedule {
    Reboot,
    Cron(Box<cron::Schedule>),
}

impl FromStr for JobSchedule {
    type Err = JobError;

    fn from_str(expr: &str) -> JobResult<Self> {
        let expr = expr.trim();
        if expr == REBOOT {
            return Ok(JobSchedule::Reboot);
        }

        let translated = to_seconds_form(expr)
            .ok_or_else(|| JobError::InvalidSchedule(expr.to_string()))?;
        cron::Schedule::from_str(&translated)
            .map(|schedule| JobSchedule::Cron(Box::new(schedule)))
            .map_err(|e| JobError::InvalidSchedule(format!("{}: {}", expr, e)))
    }
}

impl JobSchedule {
    /// Next fire time in display form, or [`NEXT_REBOOT`]
    pub fn next_display(&self) -> Option<String> {
        match self {
            JobSchedule::Reboot => Some(NEXT_REBOOT.to_string()),
            JobSchedule::Cron(schedule) => schedule
                .upcoming(Local)
                .next()
                .map(|next| next.format(DISPLAY_TIME_FORMAT).to_string()),
        }
    }
}

pub fn validate(expr: &str) -> JobResult<()> {
    expr.parse::<JobSchedule>().map(|_| ())
}

/// Derived `next` value for a stored schedule; unparsable schedules are
/// reported rather than failing the whole listing.
pub fn next_run(expr: &str) -> String {
    match expr.parse::<JobSchedule>() {
        Ok(schedule) => schedule
            .next_display()
            .unwrap_or_else(|| "Never".to_string()),
        Err(_) => "Invalid schedule".to_string(),
    }
}

fn to_seconds_form(expr: &str) -> Option<String> {
    if expr.starts_with('@') {
        return SHORTHANDS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(expr))
            .map(|(_, canonical)| canonical.to_string());
    }

    let fields: Vec<&str> = expr.split_whitespace().collect();
    let [minute, hour, day_of_month, month, day_of_week] = fields.as_slice() else {
        return None;
    };
    Some(format!(
        "0 {} {} {} {} {}",
        minute,
        hour,
        day_of_month,
        month,
        translate_weekdays(day_of_week)
    ))
}

/// Rewrite numeric weekdays (0-7, both 0 and 7 meaning Sunday) as names.
fn translate_weekdays(field: &str) -> String {
    field
        .split(',')
        .map(|item| {
            let (base, step) = match item.split_once('/') {
                Some((base, step)) => (base, Some(step)),
                None => (item, None),
            };
            let base = match base.split_once('-') {
                // From the first Sunday to the second: every day of the week
                Some(("0", "7")) => "SUN-SAT".to_string(),
                Some(("7", "7")) => "SUN".to_string(),
                // A range ending on the second Sunday spells out its last day
                Some((start, "7")) if step.is_none() => {
                    format!("{}-SAT,SUN", weekday_name(start))
                }
                Some((start, end)) => format!("{}-{}", weekday_name(start), weekday_name(end)),
                None => weekday_name(base),
            };
            match step {
                Some(step) => format!("{}/{}", base, step),
                None => base,
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn weekday_name(atom: &str) -> String {
    atom.parse::<usize>()
        .ok()
        .and_then(|n| WEEKDAYS.get(n))
        .map(|name| name.to_string())
        .unwrap_or_else(|| atom.to_uppercase())
}
