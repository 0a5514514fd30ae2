#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use semisync::registry::{TaskWork, WorkerInput};
use semisync::{from_async, TaskError, TaskOutput};

use crate::recorder::Gate;

/// Returns its first argument (or `null`) as the result.
pub fn echo() -> Arc<dyn TaskWork> {
    from_async(|input: WorkerInput| async move {
        Ok::<_, TaskError>(TaskOutput::new(first_arg(&input)))
    })
}

/// Sleeps for `delay`, then returns its first argument.
pub fn delayed_echo(delay: Duration) -> Arc<dyn TaskWork> {
    from_async(move |input: WorkerInput| async move {
        tokio::time::sleep(delay).await;
        Ok::<_, TaskError>(TaskOutput::new(first_arg(&input)))
    })
}

/// Sleeps for as many milliseconds as its second argument, then returns its
/// first argument.
pub fn sleep_then_echo() -> Arc<dyn TaskWork> {
    from_async(|input: WorkerInput| async move {
        let ms = input.arg(1).and_then(Value::as_u64).unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok::<_, TaskError>(TaskOutput::new(first_arg(&input)))
    })
}

/// Waits until `gate` opens when its first argument equals `hold`; every
/// other invocation returns immediately. Returns its first argument.
pub fn held_echo(gate: Gate, hold: Value) -> Arc<dyn TaskWork> {
    from_async(move |input: WorkerInput| {
        let gate = gate.clone();
        let hold = hold.clone();
        async move {
            let value = first_arg(&input);
            if value == hold {
                gate.wait().await;
            }
            Ok::<_, TaskError>(TaskOutput::new(value))
        }
    })
}

/// Returns its first argument and emits it as `field` in the state delta.
pub fn emit_field(field: &str) -> Arc<dyn TaskWork> {
    let field = field.to_string();
    from_async(move |input: WorkerInput| {
        let field = field.clone();
        async move {
            let value = first_arg(&input);
            Ok::<_, TaskError>(TaskOutput::new(value.clone()).with_field(field, value))
        }
    })
}

/// Returns the value of `field` in the snapshot it was launched with.
pub fn read_field(field: &str) -> Arc<dyn TaskWork> {
    let field = field.to_string();
    from_async(move |input: WorkerInput| {
        let seen = input.shared.get(&field).cloned().unwrap_or(Value::Null);
        async move { Ok::<_, TaskError>(TaskOutput::new(seen)) }
    })
}

/// Always fails with `message`.
pub fn failing(message: &str) -> Arc<dyn TaskWork> {
    let message = message.to_string();
    from_async(move |_input: WorkerInput| {
        let message = message.clone();
        async move { Err::<TaskOutput, _>(TaskError::new(message)) }
    })
}

/// Panics with `message` when polled.
pub fn panicking(message: &str) -> Arc<dyn TaskWork> {
    let message = message.to_string();
    from_async(move |_input: WorkerInput| {
        let message = message.clone();
        async move {
            if !message.is_empty() {
                panic!("{message}");
            }
            Ok::<_, TaskError>(TaskOutput::new(json!(null)))
        }
    })
}

/// Never completes.
pub fn hang() -> Arc<dyn TaskWork> {
    from_async(|_input: WorkerInput| async move {
        std::future::pending::<()>().await;
        Ok::<_, TaskError>(TaskOutput::new(json!(null)))
    })
}

fn first_arg(input: &WorkerInput) -> Value {
    input.arg(0).cloned().unwrap_or(Value::Null)
}
