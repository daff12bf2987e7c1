//! Parsing of an externally edited scheduler listing.

use std::sync::LazyLock;

use regex::Regex;

use crate::jobs::schedule;

/// `@identifier` or exactly five whitespace separated fields, then the command
static SCHEDULE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((@[a-zA-Z]+\s+)|(([^\s]+)\s+([^\s]+)\s+([^\s]+)\s+([^\s]+)\s+([^\s]+)\s+))")
        .expect("schedule prefix pattern is valid")
});

static TABS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t+").expect("tab pattern is valid"));

/// One usable line of a scheduler listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportLine {
    pub schedule: String,
    pub command: String,
}

/// Split a listing line into schedule and command.
///
/// Comments, blank lines, environment assignments and lines whose schedule
/// does not validate yield `None`.
pub fn parse_line(line: &str) -> Option<ImportLine> {
    let line = TABS.replace_all(line, " ");
    let prefix = SCHEDULE_PREFIX.find(&line)?;

    let schedule = prefix.as_str().trim();
    let command = line[prefix.end()..].trim();
    if schedule.is_empty() || command.is_empty() {
        return None;
    }
    if let Err(e) = schedule::validate(schedule) {
        tracing::debug!(line = %line, error = %e, "Skipping unparsable scheduler line");
        return None;
    }

    Some(ImportLine {
        schedule: schedule.to_string(),
        command: command.to_string(),
    })
}

/// Generated name for the job created from line `index` of a batch
pub fn generated_name(batch_started_ms: i64, index: usize) -> String {
    format!("{}_{}", batch_started_ms, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_field_line() {
        let parsed = parse_line("0 5 * * * echo hi there").unwrap();
        assert_eq!(parsed.schedule, "0 5 * * *");
        assert_eq!(parsed.command, "echo hi there");
    }

    #[test]
    fn test_special_schedule_and_tabs() {
        let parsed = parse_line("@reboot\t\t/usr/bin/true").unwrap();
        assert_eq!(parsed.schedule, "@reboot");
        assert_eq!(parsed.command, "/usr/bin/true");
    }

    #[test]
    fn test_lines_that_yield_nothing() {
        for line in [
            "",
            "not a valid line",
            "# a comment with enough words here",
            "#id: abc | name",
            "MAILTO=root",
            "0 5 * * *",
            "@sometimes run-it",
        ] {
            assert_eq!(parse_line(line), None, "{line:?} should be skipped");
        }
    }

    #[test]
    fn test_generated_name() {
        assert_eq!(generated_name(1760863680000, 2), "1760863680000_2");
    }
}
