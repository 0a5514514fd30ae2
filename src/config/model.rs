// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::state::MergePolicy;
use crate::types::{MergeMode, UndeclaredFieldPolicy};

/// Configuration file as read from TOML, before validation.
///
/// ```toml
/// [scheduler]
/// deadline = "30s"
/// channel_capacity = 64
///
/// [merge]
/// undeclared = "overwrite"
///
/// [merge.fields]
/// sum = "add"
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub merge: MergePolicy,
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Duration string (`"250ms"`, `"3s"`, `"1m"`, `"2h"`) bounding a whole
    /// run. Absent means a run may take as long as its workers do.
    #[serde(default)]
    pub deadline: Option<String>,

    /// Capacity of the completion channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

pub(crate) fn default_channel_capacity() -> usize {
    64
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            deadline: None,
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Validated scheduler configuration.
///
/// Constructed from a [`RawConfigFile`] via `TryFrom`, or programmatically
/// from [`SchedulerConfig::default`] and the `with_*` methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub deadline: Option<Duration>,
    pub channel_capacity: usize,
    pub merge: MergePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            deadline: None,
            channel_capacity: default_channel_capacity(),
            merge: MergePolicy::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_field_policy(mut self, field: impl Into<String>, mode: MergeMode) -> Self {
        self.merge = self.merge.with_field(field, mode);
        self
    }

    pub fn with_undeclared_fields(mut self, undeclared: UndeclaredFieldPolicy) -> Self {
        self.merge = self.merge.with_undeclared(undeclared);
        self
    }
}
