// tests/integration/main.rs

mod config_loading;
mod logging;
mod scheduling;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn no_args() -> Vec<serde_json::Value> {
    Vec::new()
}
