//! CLI argument validation functions
//!
//! Custom value parsers for arguments clap cannot check on its own.

use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use crate::jobs::{JobError, Mailing};

/// Validate that a file path is accessible (exists and is readable)
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!(
            "Cannot read configuration file '{}': {}",
            path_str, e
        )),
    }
}

/// Validate the watch interval is a positive number of seconds
pub fn validate_interval(secs_str: &str) -> Result<u64, String> {
    let secs: u64 = secs_str.parse().map_err(|_| {
        format!(
            "Interval must be a positive number of seconds, got: '{}'",
            secs_str
        )
    })?;

    if secs == 0 {
        return Err("Interval must be at least 1 second".to_string());
    }

    Ok(secs)
}

/// Parse mailer settings; anything but a JSON object is rejected
pub fn parse_mailing(json: &str) -> Result<Mailing, String> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(JobError::InvalidMailing(format!("got {}", other)).to_string()),
        Err(e) => Err(JobError::InvalidMailing(e.to_string()).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_interval() {
        assert_eq!(validate_interval("5"), Ok(5));
        assert!(validate_interval("0").is_err());
        assert!(validate_interval("-1").is_err());
        assert!(validate_interval("soon").is_err());
    }

    #[test]
    fn test_validate_config_file_path() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        assert_eq!(validate_config_file_path(path), Ok(PathBuf::from(path)));

        let dir = tempfile::tempdir().unwrap();
        assert!(validate_config_file_path(dir.path().to_str().unwrap()).is_err());
        assert!(validate_config_file_path("/definitely/not/here.toml").is_err());
    }

    #[test]
    fn test_parse_mailing() {
        assert!(parse_mailing("{}").unwrap().is_empty());
        assert_eq!(parse_mailing(r#"{"to":"a@b"}"#).unwrap()["to"], "a@b");
        assert!(parse_mailing("null").is_err());
        assert!(parse_mailing("{oops").is_err());
    }
}
