use super::*;
use crate::model::ConsoleConfig;
use crate::services::cli_runner::testing::StubExecutor;
use serde_json::json;
use std::sync::mpsc;
use std::time::Duration;

#[test]
fn items_accepts_envelope_or_array() {
    assert_eq!(items_of(&json!({"type": "list", "items": ["a", "b"]})).len(), 2);
    assert_eq!(items_of(&json!(["a"])).len(), 1);
    assert!(items_of(&json!({"attrs": {}})).is_empty());
    assert!(items_of(&JsonValue::Null).is_empty());
}

#[test]
fn first_attr_reads_arrays_and_strings() {
    let v = json!({"attrs": {"cn": ["map1", "x"], "desc": "plain"}});
    assert_eq!(first_attr(&v, "cn").as_deref(), Some("map1"));
    assert_eq!(first_attr(&v, "desc").as_deref(), Some("plain"));
    assert_eq!(first_attr(&v, "nope"), None);
}

#[test]
fn spawned_job_reports_outputs_in_order() {
    let stub = Arc::new(StubExecutor::default());
    stub.reply_ok(json!({"attrs": {"a": ["1"]}}))
        .reply_ok(json!({"items": []}));
    let ctx = ConnectionContext::from_config(&ConsoleConfig::default());
    let (tx, rx) = mpsc::channel();
    spawn_job(
        stub.clone(),
        ctx,
        JobKey::Reindex("dc=example,dc=com".into()),
        vec![Invocation::dsconf(["x"]), Invocation::dsconf(["y"])],
        tx,
    );
    let msg = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(matches!(msg.key, JobKey::Reindex(ref s) if s == "dc=example,dc=com"));
    let outputs = msg.outcome.unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(stub.call_count(), 2);
}

#[test]
fn failed_job_carries_desc() {
    let stub = StubExecutor::default();
    stub.reply_err("Insufficient access");
    let ctx = ConnectionContext::from_config(&ConsoleConfig::default());
    let out = run_job(&stub, &ctx, &[Invocation::dsconf(["config", "get"])]);
    assert_eq!(out.unwrap_err(), "Insufficient access");
}
