// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{RawConfigFile, SchedulerConfig};
use crate::errors::{Result, SemisyncError};

impl TryFrom<RawConfigFile> for SchedulerConfig {
    type Error = SemisyncError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let deadline = raw
            .scheduler
            .deadline
            .as_deref()
            .map(parse_duration)
            .transpose()
            .map_err(|e| SemisyncError::ConfigError(format!("[scheduler].deadline: {e}")))?;

        Ok(SchedulerConfig {
            deadline,
            channel_capacity: raw.scheduler.channel_capacity,
            merge: raw.merge,
        })
    }
}

/// Check a raw config without converting it.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_raw_config(cfg)
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scheduler.channel_capacity == 0 {
        return Err(SemisyncError::ConfigError(
            "[scheduler].channel_capacity must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(deadline) = cfg.scheduler.deadline.as_deref() {
        let parsed = parse_duration(deadline)
            .map_err(|e| SemisyncError::ConfigError(format!("[scheduler].deadline: {e}")))?;
        if parsed.is_zero() {
            return Err(SemisyncError::ConfigError(
                "[scheduler].deadline must be greater than zero".to_string(),
            ));
        }
    }

    for field in cfg.merge.fields.keys() {
        if field.trim().is_empty() {
            return Err(SemisyncError::ConfigError(
                "[merge.fields] contains an empty field name".to_string(),
            ));
        }
    }

    Ok(())
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => scaled_secs(value, 60),
        "h" => scaled_secs(value, 60 * 60),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}

fn scaled_secs(value: u64, factor: u64) -> std::result::Result<Duration, String> {
    value
        .checked_mul(factor)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration too large: {value} x {factor}s"))
}
