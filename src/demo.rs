// src/demo.rs

//! The revenue / expenses / profit workload run by the `semisync` binary.
//!
//! `revenue` and `expenses` simulate slow API calls and run concurrently;
//! `profit` waits for both and reads their figures from the shared state.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tracing::debug;

use crate::config::SchedulerConfig;
use crate::errors::Result;
use crate::registry::{Completion, TaskError, TaskOutput, TaskSpec, WorkerInput, blocking};
use crate::scheduler::Scheduler;
use crate::types::{MergeMode, TaskId, Value};

pub const REVENUE: &str = "revenue";
pub const EXPENSES: &str = "expenses";
pub const PROFIT: &str = "profit";

#[derive(Debug, Clone)]
pub struct DemoOptions {
    /// Upper bound of each simulated API latency.
    pub max_delay: Duration,
    /// Seed for figures and latencies; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            max_delay: Duration::from_secs(1),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoTasks {
    pub revenue: TaskId,
    pub expenses: TaskId,
    pub profit: TaskId,
}

/// Declare the demo's shared-state fields as overwrite-only, unless the
/// config already declares them.
pub fn declare_fields(mut config: SchedulerConfig) -> SchedulerConfig {
    for field in [REVENUE, EXPENSES, PROFIT] {
        config
            .merge
            .fields
            .entry(field.to_string())
            .or_insert(MergeMode::Overwrite);
    }
    config
}

/// Register and enqueue the demo workload.
///
/// Each completed figure is formatted as `"Revenue: $123"` and handed to
/// `report`.
pub fn register<R>(scheduler: &Scheduler, options: &DemoOptions, report: R) -> Result<DemoTasks>
where
    R: Fn(String) + Send + Sync + 'static,
{
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let max_delay_ms = u64::try_from(options.max_delay.as_millis()).unwrap_or(u64::MAX);

    let report = Arc::new(report);
    let output = move |c: &Completion<'_>| {
        if let Some(line) = format_figure(c.result) {
            report(line);
        }
    };

    let revenue = scheduler.register(
        TaskSpec::new(
            REVENUE,
            blocking(|input| simulated_fetch(input, "Revenue", REVENUE)),
        )
        .on_complete(output.clone()),
    )?;
    let expenses = scheduler.register(
        TaskSpec::new(
            EXPENSES,
            blocking(|input| simulated_fetch(input, "Expenses", EXPENSES)),
        )
        .on_complete(output.clone()),
    )?;
    let profit = scheduler.register(
        TaskSpec::new(PROFIT, blocking(compute_profit))
            .after_all([REVENUE, EXPENSES])
            .on_complete(output),
    )?;

    let revenue_amount: i64 = rng.gen_range(1..=1000);
    let expenses_amount: i64 = rng.gen_range(1..=500);

    scheduler.enqueue(
        revenue,
        [json!(rng.gen_range(0..=max_delay_ms)), json!(revenue_amount)],
    )?;
    scheduler.enqueue(
        expenses,
        [json!(rng.gen_range(0..=max_delay_ms)), json!(expenses_amount)],
    )?;
    scheduler.enqueue(profit, Vec::<Value>::new())?;

    Ok(DemoTasks {
        revenue,
        expenses,
        profit,
    })
}

/// `["Revenue", 123]` -> `"Revenue: $123"`.
pub fn format_figure(result: &Value) -> Option<String> {
    let label = result.get(0)?.as_str()?;
    let amount = result.get(1)?;
    Some(format!("{label}: ${amount}"))
}

/// Args: `[delay_ms, amount]`.
fn simulated_fetch(
    input: WorkerInput,
    label: &str,
    field: &str,
) -> std::result::Result<TaskOutput, TaskError> {
    let delay_ms = input.arg(0).and_then(|v| v.as_u64()).unwrap_or(0);
    let amount = input.arg_i64(1)?;

    debug!(task = %input.task_name, delay_ms, "simulating API call");
    thread::sleep(Duration::from_millis(delay_ms));

    Ok(TaskOutput::new(json!([label, amount])).with_field(field, amount))
}

fn compute_profit(input: WorkerInput) -> std::result::Result<TaskOutput, TaskError> {
    let figure = |field: &str| {
        input
            .shared
            .get(field)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| TaskError::new(format!("shared state has no integer '{field}'")))
    };
    let profit = figure(REVENUE)? - figure(EXPENSES)?;

    Ok(TaskOutput::new(json!(["Profit", profit])).with_field(PROFIT, profit))
}
