use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::{EngineError, SqliteStore, TranscriptStore};
use crate::transcript::{build_transcript, group_by_session_class};
use rusqlite::Connection;
use serde_json::json;

fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

fn required_i64(req: &Request, key: &str) -> Result<i64, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

fn engine_err(req: &Request, e: EngineError) -> serde_json::Value {
    err(&req.id, &e.code, e.message, e.details)
}

fn handle_entries(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let school_id = match required_i64(req, "schoolId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = SqliteStore::new(conn);
    match build_transcript(&store, school_id, &student_id) {
        Ok(entries) => ok(&req.id, json!({ "entries": entries })),
        Err(e) => engine_err(req, e),
    }
}

fn handle_annual(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let school_id = match required_i64(req, "schoolId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = SqliteStore::new(conn);
    match build_transcript(&store, school_id, &student_id) {
        Ok(entries) => ok(
            &req.id,
            json!({ "groups": group_by_session_class(&entries) }),
        ),
        Err(e) => engine_err(req, e),
    }
}

/// Everything an external renderer needs for the printable sheet: school
/// branding and student identity pass through untouched alongside the
/// computed entries and annual groups.
fn handle_full(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let school_id = match required_i64(req, "schoolId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = SqliteStore::new(conn);

    let school = match store.school_by_id(school_id) {
        Ok(Some(s)) => s,
        Ok(None) => return err(&req.id, "not_found", "school not found", None),
        Err(e) => return engine_err(req, e),
    };
    let student = match store.student_by_id(school_id, &student_id) {
        Ok(Some(s)) => s,
        Ok(None) => return err(&req.id, "not_found", "student not found", None),
        Err(e) => return engine_err(req, e),
    };
    let entries = match build_transcript(&store, school_id, &student_id) {
        Ok(entries) => entries,
        Err(e) => return engine_err(req, e),
    };
    let groups = group_by_session_class(&entries);

    ok(
        &req.id,
        json!({
            "school": {
                "id": school.id,
                "name": school.name,
                "address": school.address,
                "motto": school.motto,
            },
            "student": {
                "id": student.id,
                "firstName": student.first_name,
                "lastName": student.last_name,
                "admissionNo": student.admission_no,
            },
            "entries": entries,
            "groups": groups,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "transcript.entries" => Some(handle_entries(state, req)),
        "transcript.annual" => Some(handle_annual(state, req)),
        "transcript.full" => Some(handle_full(state, req)),
        _ => None,
    }
}
