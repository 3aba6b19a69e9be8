use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

fn required_i64(req: &Request, key: &str) -> Result<i64, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn optional_i64(req: &Request, key: &str) -> Option<i64> {
    req.params.get(key).and_then(|v| v.as_i64())
}

/// Raw scores are bounded once here, at the record boundary; the engine
/// accepts whatever the store hands it.
fn required_score(req: &Request, key: &str) -> Result<f64, serde_json::Value> {
    let Some(v) = req.params.get(key).and_then(|v| v.as_f64()) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    if !(0.0..=100.0).contains(&v) {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must be between 0 and 100", key),
            None,
        ));
    }
    Ok(v)
}

fn db_err(req: &Request, e: rusqlite::Error) -> serde_json::Value {
    err(&req.id, "db_query_failed", e.to_string(), None)
}

fn handle_school_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let res = conn.execute(
        "INSERT INTO schools(name, address, motto, created_at) VALUES (?, ?, ?, ?)",
        (
            name,
            optional_str(req, "address"),
            optional_str(req, "motto"),
            db::now(),
        ),
    );
    match res {
        Ok(_) => ok(&req.id, json!({ "schoolId": conn.last_insert_rowid() })),
        Err(e) => db_err(req, e),
    }
}

fn handle_session_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let school_id = match required_i64(req, "schoolId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let session_name = match required_str(req, "sessionName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let academic_year = match required_str(req, "academicYear") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let status = optional_str(req, "status").unwrap_or_else(|| "pending".to_string());
    if !matches!(status.as_str(), "pending" | "current" | "completed") {
        return err(
            &req.id,
            "bad_params",
            "status must be pending, current or completed",
            None,
        );
    }
    let res = conn.execute(
        "INSERT INTO academic_sessions(school_id, session_name, academic_year, status, created_at)
         VALUES (?, ?, ?, ?, ?)",
        (school_id, session_name, academic_year, status, db::now()),
    );
    match res {
        Ok(_) => ok(&req.id, json!({ "sessionId": conn.last_insert_rowid() })),
        Err(e) => db_err(req, e),
    }
}

fn handle_term_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let session_id = match required_i64(req, "sessionId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let is_current = req
        .params
        .get("isCurrent")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let res = conn.execute(
        "INSERT INTO terms(academic_session_id, name, is_current, created_at)
         VALUES (?, ?, ?, ?)",
        (session_id, name, is_current as i64, db::now()),
    );
    match res {
        Ok(_) => ok(&req.id, json!({ "termId": conn.last_insert_rowid() })),
        Err(e) => db_err(req, e),
    }
}

fn handle_class_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let session_id = match required_i64(req, "sessionId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let level = match required_str(req, "level") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if !matches!(level.as_str(), "nursery" | "primary" | "secondary") {
        return err(
            &req.id,
            "bad_params",
            "level must be nursery, primary or secondary",
            None,
        );
    }
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let res = conn.execute(
        "INSERT INTO school_classes(academic_session_id, level, name, created_at)
         VALUES (?, ?, ?, ?)",
        (session_id, level, name, db::now()),
    );
    match res {
        Ok(_) => ok(&req.id, json!({ "classId": conn.last_insert_rowid() })),
        Err(e) => db_err(req, e),
    }
}

fn handle_subject_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let school_id = match required_i64(req, "schoolId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let res = conn.execute(
        "INSERT INTO subjects(school_id, name, code) VALUES (?, ?, ?)",
        (school_id, name, optional_str(req, "code")),
    );
    match res {
        Ok(_) => ok(&req.id, json!({ "subjectId": conn.last_insert_rowid() })),
        Err(e) => db_err(req, e),
    }
}

fn handle_term_subject_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_i64(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let term_id = match required_i64(req, "termId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject_id = match required_i64(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let res = conn.execute(
        "INSERT INTO term_subjects(class_id, term_id, subject_id, teacher_name)
         VALUES (?, ?, ?, ?)",
        (class_id, term_id, subject_id, optional_str(req, "teacherName")),
    );
    match res {
        Ok(_) => ok(&req.id, json!({ "termSubjectId": conn.last_insert_rowid() })),
        Err(e) => db_err(req, e),
    }
}

fn handle_student_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let school_id = match required_i64(req, "schoolId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let first_name = match required_str(req, "firstName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let last_name = match required_str(req, "lastName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = Uuid::new_v4().to_string();
    let res = conn.execute(
        "INSERT INTO students(id, school_id, first_name, last_name, admission_no, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        (
            &student_id,
            school_id,
            first_name,
            last_name,
            optional_str(req, "admissionNo"),
            db::now(),
        ),
    );
    match res {
        Ok(_) => ok(&req.id, json!({ "studentId": student_id })),
        Err(e) => db_err(req, e),
    }
}

fn handle_result_upsert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let term_subject_id = match required_i64(req, "termSubjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let ca = match required_score(req, "ca") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let exam = match required_score(req, "exam") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let res = conn.execute(
        "INSERT INTO results(term_subject_id, student_id, ca, exam, updated_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(term_subject_id, student_id)
         DO UPDATE SET ca = excluded.ca, exam = excluded.exam, updated_at = excluded.updated_at",
        (term_subject_id, &student_id, ca, exam, db::now()),
    );
    match res {
        Ok(_) => ok(&req.id, json!({ "termSubjectId": term_subject_id, "studentId": student_id })),
        Err(e) => db_err(req, e),
    }
}

fn handle_membership_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_i64(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let res = conn.execute(
        "INSERT INTO class_students(class_id, student_id, created_at)
         VALUES (?, ?, ?)
         ON CONFLICT(class_id, student_id) DO NOTHING",
        (class_id, &student_id, db::now()),
    );
    match res {
        Ok(_) => ok(&req.id, json!({ "classId": class_id, "studentId": student_id })),
        Err(e) => db_err(req, e),
    }
}

fn handle_enrollment_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_id = match required_i64(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let term_id = match required_i64(req, "termId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let res = conn.execute(
        "INSERT INTO enrollments(student_id, class_id, term_id, created_at)
         VALUES (?, ?, ?, ?)",
        (&student_id, class_id, term_id, db::now()),
    );
    match res {
        Ok(_) => ok(&req.id, json!({ "enrollmentId": conn.last_insert_rowid() })),
        Err(e) => db_err(req, e),
    }
}

fn handle_remarks_upsert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let term_id = match required_i64(req, "termId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let res = conn.execute(
        "INSERT INTO term_remarks(term_id, student_id, teacher_comment, principal_comment,
                                  days_present, days_open)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(term_id, student_id)
         DO UPDATE SET teacher_comment = excluded.teacher_comment,
                       principal_comment = excluded.principal_comment,
                       days_present = excluded.days_present,
                       days_open = excluded.days_open",
        (
            term_id,
            &student_id,
            optional_str(req, "teacherComment"),
            optional_str(req, "principalComment"),
            optional_i64(req, "daysPresent"),
            optional_i64(req, "daysOpen"),
        ),
    );
    match res {
        Ok(_) => ok(&req.id, json!({ "termId": term_id, "studentId": student_id })),
        Err(e) => db_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "school.create" => Some(handle_school_create(state, req)),
        "session.create" => Some(handle_session_create(state, req)),
        "term.create" => Some(handle_term_create(state, req)),
        "class.create" => Some(handle_class_create(state, req)),
        "subject.create" => Some(handle_subject_create(state, req)),
        "termSubject.create" => Some(handle_term_subject_create(state, req)),
        "student.create" => Some(handle_student_create(state, req)),
        "result.upsert" => Some(handle_result_upsert(state, req)),
        "membership.set" => Some(handle_membership_set(state, req)),
        "enrollment.create" => Some(handle_enrollment_create(state, req)),
        "remarks.upsert" => Some(handle_remarks_upsert(state, req)),
        _ => None,
    }
}
