use crate::app::JobKey;
use crate::services::cli_runner::{run_plan, ConnectionContext, Executor, Invocation};
use serde_json::Value as JsonValue;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

/// Run `steps` sequentially off the UI thread and report one `LoadMsg`.
pub fn spawn_job(
    exec: Arc<dyn Executor>,
    ctx: ConnectionContext,
    key: JobKey,
    steps: Vec<Invocation>,
    tx: Sender<crate::ui::LoadMsg>,
) {
    thread::spawn(move || {
        let outcome = run_job(exec.as_ref(), &ctx, &steps);
        if let Err(e) = &outcome {
            tracing::debug!(?key, error = %e, "job failed");
        }
        let _ = tx.send(crate::ui::LoadMsg { key, outcome });
    });
}

pub(crate) fn run_job(
    exec: &dyn Executor,
    ctx: &ConnectionContext,
    steps: &[Invocation],
) -> Result<Vec<JsonValue>, String> {
    run_plan(exec, ctx, steps).map_err(|e| e.desc())
}

/// `items` array of a list endpoint; a bare array is accepted too.
pub fn items_of(v: &JsonValue) -> Vec<JsonValue> {
    v.get("items")
        .or(Some(v))
        .and_then(|x| x.as_array())
        .cloned()
        .unwrap_or_default()
}

/// First string of `attrs.<name>` (or a plain string at `<name>`).
pub fn first_attr(v: &JsonValue, name: &str) -> Option<String> {
    let attrs = v.get("attrs").unwrap_or(v);
    match attrs.get(name)? {
        JsonValue::Array(items) => items.first().and_then(|s| s.as_str()).map(str::to_string),
        JsonValue::String(s) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod loader_tests;
