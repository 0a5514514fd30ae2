// src/state/merge.rs

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Number};
use thiserror::Error;
use tracing::trace;

use crate::types::{MergeMode, UndeclaredFieldPolicy, Value};

/// Field updates emitted by one invocation.
pub type StateDelta = Map<String, Value>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("field '{field}' is additive but {master} + {delta} is not defined")]
    NotAddable {
        field: String,
        master: &'static str,
        delta: &'static str,
    },

    #[error("field '{field}' has no declared merge mode")]
    UndeclaredField { field: String },
}

/// Per-field merge declarations.
///
/// ```toml
/// [merge]
/// undeclared = "overwrite"
///
/// [merge.fields]
/// sum = "add"
/// text = "overwrite"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MergePolicy {
    #[serde(default)]
    pub undeclared: UndeclaredFieldPolicy,

    #[serde(default)]
    pub fields: BTreeMap<String, MergeMode>,
}

impl MergePolicy {
    /// Declare `field` with the given mode, replacing any prior declaration.
    pub fn with_field(mut self, field: impl Into<String>, mode: MergeMode) -> Self {
        self.fields.insert(field.into(), mode);
        self
    }

    pub fn with_undeclared(mut self, undeclared: UndeclaredFieldPolicy) -> Self {
        self.undeclared = undeclared;
        self
    }

    /// Effective mode for a field, or an error if undeclared fields are rejected.
    pub fn mode_for(&self, field: &str) -> Result<MergeMode, MergeError> {
        if let Some(mode) = self.fields.get(field) {
            return Ok(*mode);
        }
        match self.undeclared {
            UndeclaredFieldPolicy::Overwrite => Ok(MergeMode::Overwrite),
            UndeclaredFieldPolicy::Add => Ok(MergeMode::Add),
            UndeclaredFieldPolicy::Reject => Err(MergeError::UndeclaredField {
                field: field.to_string(),
            }),
        }
    }
}

/// The master state owned by the scheduler caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedState {
    fields: Map<String, Value>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fold `delta` into this state.
    ///
    /// The merge is all-or-nothing: every field is checked before any field
    /// is written, so a failed merge leaves the state untouched.
    pub fn merge(&mut self, delta: &StateDelta, policy: &MergePolicy) -> Result<(), MergeError> {
        let mut updates = Vec::with_capacity(delta.len());

        for (field, incoming) in delta {
            let merged = match (policy.mode_for(field)?, self.fields.get(field)) {
                (MergeMode::Overwrite, _) | (MergeMode::Add, None) => incoming.clone(),
                (MergeMode::Add, Some(current)) => {
                    add_values(current, incoming).ok_or_else(|| MergeError::NotAddable {
                        field: field.clone(),
                        master: value_kind(current),
                        delta: value_kind(incoming),
                    })?
                }
            };
            updates.push((field.clone(), merged));
        }

        for (field, value) in updates {
            trace!(field = %field, value = %value, "merged shared-state field");
            self.fields.insert(field, value);
        }

        Ok(())
    }
}

impl From<Map<String, Value>> for SharedState {
    fn from(fields: Map<String, Value>) -> Self {
        Self::from_map(fields)
    }
}

/// `current + incoming` for the value kinds that define addition.
fn add_values(current: &Value, incoming: &Value) -> Option<Value> {
    match (current, incoming) {
        (Value::Number(a), Value::Number(b)) => add_numbers(a, b).map(Value::Number),
        (Value::String(a), Value::String(b)) => Some(Value::String(format!("{a}{b}"))),
        (Value::Array(a), Value::Array(b)) => {
            Some(Value::Array(a.iter().chain(b.iter()).cloned().collect()))
        }
        _ => None,
    }
}

fn add_numbers(a: &Number, b: &Number) -> Option<Number> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return Some(Number::from(sum));
        }
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        if let Some(sum) = x.checked_add(y) {
            return Some(Number::from(sum));
        }
    }
    Number::from_f64(a.as_f64()? + b.as_f64()?)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
