// tests/integration/logging.rs

use semisync::cli::LogLevel;
use semisync::logging::filter_directive;

#[test]
fn cli_level_overrides_the_environment() {
    assert_eq!(filter_directive(Some(LogLevel::Warn), Some("trace")), "warn");
}

#[test]
fn environment_directive_is_used_verbatim() {
    assert_eq!(
        filter_directive(None, Some(" semisync::engine=trace,info ")),
        "semisync::engine=trace,info"
    );
}

#[test]
fn missing_or_blank_environment_falls_back_to_info() {
    assert_eq!(filter_directive(None, None), "info");
    assert_eq!(filter_directive(None, Some("   ")), "info");
}
