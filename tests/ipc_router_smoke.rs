mod test_support;

use serde_json::json;
use std::io::{BufRead, Write};
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn health_reports_version_and_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(
        health.get("version").and_then(|v| v.as_str()),
        Some(env!("CARGO_PKG_VERSION"))
    );
    assert!(health.get("workspacePath").map(|v| v.is_null()).unwrap_or(false));

    let workspace = temp_dir("transcriptd-smoke");
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(
        selected.get("workspacePath").and_then(|v| v.as_str()),
        Some(workspace.to_string_lossy().as_ref())
    );

    let health = request_ok(&mut stdin, &mut reader, "3", "health", json!({}));
    assert_eq!(
        health.get("workspacePath").and_then(|v| v.as_str()),
        Some(workspace.to_string_lossy().as_ref())
    );
}

#[test]
fn unknown_method_answers_not_implemented() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "transcript.delete",
        json!({}),
    );
    assert_eq!(code, "not_implemented");
}

#[test]
fn malformed_input_yields_one_parseable_error_line() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    // A bare string deserializes to a serde error whose message quotes the
    // input; the reply must still be a single valid JSON line.
    writeln!(stdin, "\"health\"").expect("write");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read");
    let reply: serde_json::Value = serde_json::from_str(line.trim()).expect("parseable reply");
    assert_eq!(reply.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        reply.pointer("/error/code").and_then(|v| v.as_str()),
        Some("bad_json")
    );

    // The loop keeps serving after the bad line.
    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("version").is_some());
}

#[test]
fn records_require_a_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "school.create",
        json!({ "name": "No Workspace High" }),
    );
    assert_eq!(code, "no_workspace");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "transcript.entries",
        json!({ "schoolId": 1, "studentId": "s" }),
    );
    assert_eq!(code, "no_workspace");
}
