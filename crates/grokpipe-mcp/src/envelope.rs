use grokpipe_core::{render, NormalizedResult};

pub(crate) const SCHEMA_VERSION: u64 = 1;

pub(crate) fn add_envelope_fields(payload: &mut serde_json::Value, kind: &str, elapsed_ms: u128) {
    payload["schema_version"] = serde_json::json!(SCHEMA_VERSION);
    payload["kind"] = serde_json::json!(kind);
    payload["elapsed_ms"] = serde_json::json!(elapsed_ms);
    // `error` is always present (null on success) so clients need no missing-vs-null branching.
    if payload.get("error").is_none() {
        payload["error"] = serde_json::Value::Null;
    }
}

/// JSON form of one operation's outcome (`--output json`).
pub(crate) fn result_payload(
    kind: &str,
    result: &NormalizedResult,
    elapsed_ms: u128,
) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "ok": !result.is_error(),
        "response_id": result.id,
        "status": result.status,
        "text": result.text,
        "sources": result.sources,
        "usage": result.usage,
        "error": result.error,
        "rendered": render(result),
    });
    add_envelope_fields(&mut payload, kind, elapsed_ms);
    payload
}
