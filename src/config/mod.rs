// src/config/mod.rs

//! Scheduler configuration.
//!
//! - [`model`] defines the TOML-backed data model.
//! - [`loader`] reads a config file from disk.
//! - [`validate`] turns a raw file into a [`SchedulerConfig`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_str};
pub use model::{RawConfigFile, SchedulerConfig, SchedulerSection};
pub use validate::{parse_duration, validate_config};
