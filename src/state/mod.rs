// src/state/mod.rs

//! Shared state reconciled after each completion.
//!
//! Workers never mutate the master state. They receive a read-only snapshot
//! at launch and may return a [`StateDelta`]; the engine folds each delta into
//! the master [`SharedState`] on its single control thread using the declared
//! [`MergePolicy`].

pub mod merge;

pub use merge::{MergeError, MergePolicy, SharedState, StateDelta};
