mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, seed_school_session, spawn_sidecar, temp_dir};

#[test]
fn record_methods_reject_bad_params_at_the_boundary() {
    let workspace = temp_dir("transcriptd-validation");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let (school_id, session_id) = seed_school_session(&mut stdin, &mut reader, "2023/2024");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "school.create",
        json!({ "motto": "No name given" }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "session.create",
        json!({
            "schoolId": school_id,
            "sessionName": "Broken",
            "academicYear": "2025/2026",
            "status": "archived"
        }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "class.create",
        json!({ "sessionId": session_id, "level": "tertiary", "name": "Year 1" }),
    );
    assert_eq!(code, "bad_params");

    let term = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "term.create",
        json!({ "sessionId": session_id, "name": "First Term" }),
    );
    let term_id = term.get("termId").and_then(|v| v.as_i64()).expect("termId");
    let class = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "class.create",
        json!({ "sessionId": session_id, "level": "primary", "name": "Primary 2" }),
    );
    let class_id = class.get("classId").and_then(|v| v.as_i64()).expect("classId");
    let subject = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "subject.create",
        json!({ "schoolId": school_id, "name": "Mathematics" }),
    );
    let subject_id = subject
        .get("subjectId")
        .and_then(|v| v.as_i64())
        .expect("subjectId");
    let ts = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "termSubject.create",
        json!({ "classId": class_id, "termId": term_id, "subjectId": subject_id }),
    );
    let ts_id = ts
        .get("termSubjectId")
        .and_then(|v| v.as_i64())
        .expect("termSubjectId");
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "student.create",
        json!({ "schoolId": school_id, "firstName": "Kemi", "lastName": "Ade" }),
    );
    let student_id = student
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();

    // Raw scores are bounded once here; the engine never re-checks them.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "10",
        "result.upsert",
        json!({
            "termSubjectId": ts_id,
            "studentId": student_id,
            "ca": 120.0,
            "exam": 10.0
        }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "11",
        "result.upsert",
        json!({
            "termSubjectId": ts_id,
            "studentId": student_id,
            "ca": 20.0,
            "exam": -1.0
        }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "12",
        "result.upsert",
        json!({ "termSubjectId": ts_id, "studentId": student_id, "ca": 20.0 }),
    );
    assert_eq!(code, "bad_params");

    // In-range upsert succeeds, and upserting again replaces the scores.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "result.upsert",
        json!({
            "termSubjectId": ts_id,
            "studentId": student_id,
            "ca": 20.0,
            "exam": 30.0
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "result.upsert",
        json!({
            "termSubjectId": ts_id,
            "studentId": student_id,
            "ca": 35.0,
            "exam": 45.0
        }),
    );
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "transcript.entries",
        json!({ "schoolId": school_id, "studentId": student_id }),
    );
    let entries = result.get("entries").and_then(|v| v.as_array()).expect("entries");
    assert_eq!(entries.len(), 1);
    let row = &entries[0].get("rows").and_then(|v| v.as_array()).expect("rows")[0];
    assert_eq!(row.get("total").and_then(|v| v.as_f64()), Some(80.0));
    assert_eq!(row.get("grade").and_then(|v| v.as_str()), Some("A"));
}
