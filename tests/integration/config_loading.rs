// tests/integration/config_loading.rs

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use semisync::config::{load_and_validate, parse_duration, parse_str, validate_config};
use semisync::errors::SemisyncError;
use semisync::{MergeMode, SchedulerConfig, UndeclaredFieldPolicy};

#[test]
fn full_config_file_is_loaded_and_validated() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[scheduler]
deadline = "30s"
channel_capacity = 8

[merge]
undeclared = "reject"

[merge.fields]
sum = "add"
text = "overwrite"
"#
    )
    .unwrap();

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.deadline, Some(Duration::from_secs(30)));
    assert_eq!(cfg.channel_capacity, 8);
    assert_eq!(cfg.merge.undeclared, UndeclaredFieldPolicy::Reject);
    assert_eq!(cfg.merge.fields.get("sum"), Some(&MergeMode::Add));
    assert_eq!(cfg.merge.fields.get("text"), Some(&MergeMode::Overwrite));
}

#[test]
fn empty_config_uses_defaults() {
    let raw = parse_str("").unwrap();
    let cfg = SchedulerConfig::try_from(raw).unwrap();

    assert_eq!(cfg, SchedulerConfig::default());
    assert_eq!(cfg.deadline, None);
    assert_eq!(cfg.channel_capacity, 64);
    assert_eq!(cfg.merge.undeclared, UndeclaredFieldPolicy::Overwrite);
}

#[test]
fn zero_channel_capacity_is_rejected() {
    let raw = parse_str("[scheduler]\nchannel_capacity = 0\n").unwrap();

    match validate_config(&raw) {
        Err(SemisyncError::ConfigError(msg)) => assert!(msg.contains("channel_capacity")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn bad_or_zero_deadline_is_rejected() {
    for deadline in ["soon", "10", "5d", "0s"] {
        let raw = parse_str(&format!("[scheduler]\ndeadline = \"{deadline}\"\n")).unwrap();
        match SchedulerConfig::try_from(raw) {
            Err(SemisyncError::ConfigError(msg)) => {
                assert!(msg.contains("deadline"), "{deadline}: {msg}")
            }
            other => panic!("{deadline}: expected ConfigError, got {other:?}"),
        }
    }
}

#[test]
fn unknown_merge_mode_is_a_toml_error() {
    let result = parse_str("[merge.fields]\nsum = \"multiply\"\n");
    assert!(matches!(result, Err(SemisyncError::TomlError(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("Semisync.toml"));
    assert!(matches!(result, Err(SemisyncError::IoError(_))));
}

#[test]
fn durations_accept_each_unit() {
    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration("3s"), Ok(Duration::from_secs(3)));
    assert_eq!(parse_duration(" 2 m "), Ok(Duration::from_secs(120)));
    assert_eq!(parse_duration("1H"), Ok(Duration::from_secs(3600)));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("ms").is_err());
    assert!(parse_duration("12").is_err());
}

#[test]
fn oversized_durations_are_rejected_not_wrapped() {
    let err = parse_duration("6000000000000000h").unwrap_err();
    assert!(err.contains("too large"), "{err}");
    assert!(parse_duration("18446744073709551615m").is_err());
    assert_eq!(
        parse_duration("18446744073709551615s"),
        Ok(Duration::from_secs(u64::MAX))
    );

    let raw = parse_str("[scheduler]\ndeadline = \"6000000000000000h\"\n").unwrap();
    match SchedulerConfig::try_from(raw) {
        Err(SemisyncError::ConfigError(msg)) => assert!(msg.contains("deadline"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn builder_methods_match_loaded_config() {
    let raw = parse_str(
        r#"
[scheduler]
deadline = "2s"

[merge.fields]
sum = "add"
"#,
    )
    .unwrap();
    let loaded = SchedulerConfig::try_from(raw).unwrap();

    let built = SchedulerConfig::default()
        .with_deadline(Duration::from_secs(2))
        .with_field_policy("sum", MergeMode::Add);

    assert_eq!(loaded, built);
}
