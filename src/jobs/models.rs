use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Time format shared by job timestamps, `next` and backup names,
/// e.g. `Mon Oct 19 2026 10:48:00 GMT+0200`.
pub const DISPLAY_TIME_FORMAT: &str = "%a %b %d %Y %H:%M:%S GMT%z";

/// Mailer settings attached to a job. Only emptiness matters to the engine;
/// the content is handed through to the external mailer untouched.
pub type Mailing = Map<String, Value>;

// ============================================================================
// Job record
// ============================================================================

/// One schedulable unit as persisted in the job store.
///
/// The serialized shape is the store's document shape: one JSON object per
/// line, keyed by `_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub command: String,
    pub schedule: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub stopped: bool,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub logging: bool,
    #[serde(default, deserialize_with = "object_or_empty")]
    pub mailing: Mailing,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty_string"
    )]
    pub hook: Option<String>,
    #[serde(default)]
    pub created: i64,
    #[serde(rename = "_id")]
    pub id: String,
}

impl Job {
    pub fn is_mailing_enabled(&self) -> bool {
        !self.mailing.is_empty()
    }

    /// Editable fields of this job, e.g. to resubmit it with one field changed
    pub fn to_draft(&self) -> JobDraft {
        JobDraft {
            name: self.name.clone(),
            command: self.command.clone(),
            schedule: self.schedule.clone(),
            logging: self.logging,
            hook: self.hook.clone(),
            mailing: self.mailing.clone(),
        }
    }
}

/// The user-editable part of a job, used for both creation and edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDraft {
    pub name: String,
    pub command: String,
    pub schedule: String,
    #[serde(default)]
    pub logging: bool,
    #[serde(default)]
    pub hook: Option<String>,
    #[serde(default)]
    pub mailing: Mailing,
}

impl JobDraft {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        schedule: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            schedule: schedule.into(),
            ..Default::default()
        }
    }

    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = schedule.into();
        self
    }

    /// Blank hooks are dropped so they never render an empty pipe target.
    pub(crate) fn normalized_hook(&self) -> Option<String> {
        self.hook
            .as_ref()
            .filter(|hook| !hook.trim().is_empty())
            .cloned()
    }
}

/// A job plus its derived next fire time, as shown to users
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobListing {
    #[serde(flatten)]
    pub job: Job,
    pub next: String,
}

// ============================================================================
// Lenient field readers for documents written by older front ends
// ============================================================================

/// Accepts `true`/`false`, the strings `"true"`/`"false"` and `null`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Ok(b),
        Some(Value::String(s)) => Ok(s.eq_ignore_ascii_case("true")),
        Some(Value::Number(n)) => Ok(n.as_i64().is_some_and(|n| n != 0)),
        _ => Ok(false),
    }
}

/// Anything that is not a JSON object becomes the empty mailing.
fn object_or_empty<'de, D>(deserializer: D) -> Result<Mailing, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}
