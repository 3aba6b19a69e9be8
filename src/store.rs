use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct EngineError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl EngineError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn db(e: rusqlite::Error) -> Self {
        Self::new("db_query_failed", e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct SchoolRow {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub motto: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StudentRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub admission_no: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: i64,
    pub session_name: String,
    pub academic_year: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct TermRow {
    pub id: i64,
    pub name: String,
    pub is_current: bool,
}

#[derive(Debug, Clone)]
pub struct SessionWithTerms {
    pub session: SessionRow,
    pub terms: Vec<TermRow>,
}

#[derive(Debug, Clone)]
pub struct ClassRow {
    pub id: i64,
    pub level: String,
    pub name: String,
}

/// One subject assignment in one class+term, with its subject metadata
/// already joined in.
#[derive(Debug, Clone)]
pub struct TermSubjectRow {
    pub id: i64,
    pub subject_name: String,
    pub subject_code: String,
    pub teacher_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResultRow {
    pub term_subject_id: i64,
    pub student_id: String,
    pub ca: f64,
    pub exam: f64,
}

impl ResultRow {
    pub fn total(&self) -> f64 {
        self.ca + self.exam
    }
}

/// Opaque behaviour/attendance context for one (term, student). The engine
/// passes it through to the renderer untouched, apart from synthesizing a
/// default teacher comment when none exists.
#[derive(Debug, Clone, Default)]
pub struct TermContextRow {
    pub teacher_comment: Option<String>,
    pub principal_comment: Option<String>,
    pub days_present: Option<i64>,
    pub days_open: Option<i64>,
}

/// Read accessors the aggregation engine consumes. The engine never issues
/// its own queries; handing it a trait keeps the pipeline unit-testable with
/// in-memory fixtures.
pub trait TranscriptStore {
    fn school_by_id(&self, school_id: i64) -> Result<Option<SchoolRow>, EngineError>;

    fn student_by_id(
        &self,
        school_id: i64,
        student_id: &str,
    ) -> Result<Option<StudentRow>, EngineError>;

    /// All sessions for the school with their terms, both ordered by id.
    fn sessions_with_terms(&self, school_id: i64) -> Result<Vec<SessionWithTerms>, EngineError>;

    fn class_by_id(&self, school_id: i64, class_id: i64)
        -> Result<Option<ClassRow>, EngineError>;

    /// Subject assignments for one class+term, with subject name/code joined.
    fn term_subjects(
        &self,
        school_id: i64,
        class_id: i64,
        term_id: i64,
    ) -> Result<Vec<TermSubjectRow>, EngineError>;

    /// Every Result attached to any of the given assignments, across the
    /// whole student population.
    fn results_for_term_subjects(
        &self,
        school_id: i64,
        term_subject_ids: &[i64],
    ) -> Result<Vec<ResultRow>, EngineError>;

    /// Resolution tier 1: the class of the student's most recent Result in
    /// this term.
    fn latest_result_class(
        &self,
        school_id: i64,
        term_id: i64,
        student_id: &str,
    ) -> Result<Option<i64>, EngineError>;

    /// Resolution tier 2: the student's most recent class-membership row
    /// within the session.
    fn latest_membership_class(
        &self,
        school_id: i64,
        session_id: i64,
        student_id: &str,
    ) -> Result<Option<i64>, EngineError>;

    /// Resolution tier 3: the student's most recent enrollment scoped to this
    /// exact term.
    fn latest_term_enrollment_class(
        &self,
        school_id: i64,
        term_id: i64,
        student_id: &str,
    ) -> Result<Option<i64>, EngineError>;

    /// Resolution tier 4: the student's most recent enrollment in any term of
    /// the session.
    fn latest_session_enrollment_class(
        &self,
        school_id: i64,
        session_id: i64,
        student_id: &str,
    ) -> Result<Option<i64>, EngineError>;

    fn term_context(
        &self,
        term_id: i64,
        student_id: &str,
    ) -> Result<Option<TermContextRow>, EngineError>;
}

/// `TranscriptStore` over the workspace SQLite database. Every query filters
/// by school id; the caller is trusted to have authorized the school.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl TranscriptStore for SqliteStore<'_> {
    fn school_by_id(&self, school_id: i64) -> Result<Option<SchoolRow>, EngineError> {
        self.conn
            .query_row(
                "SELECT id, name, address, motto FROM schools WHERE id = ?",
                [school_id],
                |r| {
                    Ok(SchoolRow {
                        id: r.get(0)?,
                        name: r.get(1)?,
                        address: r.get(2)?,
                        motto: r.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(EngineError::db)
    }

    fn student_by_id(
        &self,
        school_id: i64,
        student_id: &str,
    ) -> Result<Option<StudentRow>, EngineError> {
        self.conn
            .query_row(
                "SELECT id, first_name, last_name, admission_no
                 FROM students
                 WHERE id = ? AND school_id = ?",
                (student_id, school_id),
                |r| {
                    Ok(StudentRow {
                        id: r.get(0)?,
                        first_name: r.get(1)?,
                        last_name: r.get(2)?,
                        admission_no: r.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(EngineError::db)
    }

    fn sessions_with_terms(&self, school_id: i64) -> Result<Vec<SessionWithTerms>, EngineError> {
        let mut sessions_stmt = self
            .conn
            .prepare(
                "SELECT id, session_name, academic_year, status
                 FROM academic_sessions
                 WHERE school_id = ?
                 ORDER BY id",
            )
            .map_err(EngineError::db)?;
        let sessions: Vec<SessionRow> = sessions_stmt
            .query_map([school_id], |r| {
                Ok(SessionRow {
                    id: r.get(0)?,
                    session_name: r.get(1)?,
                    academic_year: r.get(2)?,
                    status: r.get(3)?,
                })
            })
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(EngineError::db)?;

        let mut terms_stmt = self
            .conn
            .prepare(
                "SELECT id, name, is_current
                 FROM terms
                 WHERE academic_session_id = ?
                 ORDER BY id",
            )
            .map_err(EngineError::db)?;

        let mut out = Vec::with_capacity(sessions.len());
        for session in sessions {
            let terms: Vec<TermRow> = terms_stmt
                .query_map([session.id], |r| {
                    Ok(TermRow {
                        id: r.get(0)?,
                        name: r.get(1)?,
                        is_current: r.get::<_, i64>(2)? != 0,
                    })
                })
                .and_then(|it| it.collect::<Result<Vec<_>, _>>())
                .map_err(EngineError::db)?;
            out.push(SessionWithTerms { session, terms });
        }
        Ok(out)
    }

    fn class_by_id(
        &self,
        school_id: i64,
        class_id: i64,
    ) -> Result<Option<ClassRow>, EngineError> {
        self.conn
            .query_row(
                "SELECT c.id, c.level, c.name
                 FROM school_classes c
                 JOIN academic_sessions s ON s.id = c.academic_session_id
                 WHERE c.id = ? AND s.school_id = ?",
                (class_id, school_id),
                |r| {
                    Ok(ClassRow {
                        id: r.get(0)?,
                        level: r.get(1)?,
                        name: r.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(EngineError::db)
    }

    fn term_subjects(
        &self,
        school_id: i64,
        class_id: i64,
        term_id: i64,
    ) -> Result<Vec<TermSubjectRow>, EngineError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT ts.id, sub.name, COALESCE(sub.code, ''), ts.teacher_name
                 FROM term_subjects ts
                 JOIN subjects sub ON sub.id = ts.subject_id
                 WHERE ts.class_id = ? AND ts.term_id = ? AND sub.school_id = ?
                 ORDER BY ts.id",
            )
            .map_err(EngineError::db)?;
        stmt.query_map((class_id, term_id, school_id), |r| {
            Ok(TermSubjectRow {
                id: r.get(0)?,
                subject_name: r.get(1)?,
                subject_code: r.get(2)?,
                teacher_name: r.get(3)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(EngineError::db)
    }

    fn results_for_term_subjects(
        &self,
        school_id: i64,
        term_subject_ids: &[i64],
    ) -> Result<Vec<ResultRow>, EngineError> {
        if term_subject_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = std::iter::repeat("?")
            .take(term_subject_ids.len())
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!(
            "SELECT r.term_subject_id, r.student_id, r.ca, r.exam
             FROM results r
             JOIN term_subjects ts ON ts.id = r.term_subject_id
             JOIN school_classes c ON c.id = ts.class_id
             JOIN academic_sessions s ON s.id = c.academic_session_id
             WHERE s.school_id = ? AND r.term_subject_id IN ({})
             ORDER BY r.term_subject_id, r.student_id",
            placeholders
        );
        let mut bind_values: Vec<Value> = Vec::with_capacity(term_subject_ids.len() + 1);
        bind_values.push(Value::Integer(school_id));
        bind_values.extend(term_subject_ids.iter().map(|id| Value::Integer(*id)));
        let mut stmt = self.conn.prepare(&sql).map_err(EngineError::db)?;
        stmt.query_map(params_from_iter(bind_values), |r| {
            Ok(ResultRow {
                term_subject_id: r.get(0)?,
                student_id: r.get(1)?,
                ca: r.get(2)?,
                exam: r.get(3)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(EngineError::db)
    }

    fn latest_result_class(
        &self,
        school_id: i64,
        term_id: i64,
        student_id: &str,
    ) -> Result<Option<i64>, EngineError> {
        self.conn
            .query_row(
                "SELECT ts.class_id
                 FROM results r
                 JOIN term_subjects ts ON ts.id = r.term_subject_id
                 JOIN school_classes c ON c.id = ts.class_id
                 JOIN academic_sessions s ON s.id = c.academic_session_id
                 WHERE r.student_id = ? AND ts.term_id = ? AND s.school_id = ?
                 ORDER BY r.rowid DESC
                 LIMIT 1",
                (student_id, term_id, school_id),
                |r| r.get(0),
            )
            .optional()
            .map_err(EngineError::db)
    }

    fn latest_membership_class(
        &self,
        school_id: i64,
        session_id: i64,
        student_id: &str,
    ) -> Result<Option<i64>, EngineError> {
        self.conn
            .query_row(
                "SELECT cs.class_id
                 FROM class_students cs
                 JOIN school_classes c ON c.id = cs.class_id
                 JOIN academic_sessions s ON s.id = c.academic_session_id
                 WHERE cs.student_id = ? AND c.academic_session_id = ? AND s.school_id = ?
                 ORDER BY cs.rowid DESC
                 LIMIT 1",
                (student_id, session_id, school_id),
                |r| r.get(0),
            )
            .optional()
            .map_err(EngineError::db)
    }

    fn latest_term_enrollment_class(
        &self,
        school_id: i64,
        term_id: i64,
        student_id: &str,
    ) -> Result<Option<i64>, EngineError> {
        self.conn
            .query_row(
                "SELECT e.class_id
                 FROM enrollments e
                 JOIN school_classes c ON c.id = e.class_id
                 JOIN academic_sessions s ON s.id = c.academic_session_id
                 WHERE e.student_id = ? AND e.term_id = ? AND s.school_id = ?
                 ORDER BY e.id DESC
                 LIMIT 1",
                (student_id, term_id, school_id),
                |r| r.get(0),
            )
            .optional()
            .map_err(EngineError::db)
    }

    fn latest_session_enrollment_class(
        &self,
        school_id: i64,
        session_id: i64,
        student_id: &str,
    ) -> Result<Option<i64>, EngineError> {
        self.conn
            .query_row(
                "SELECT e.class_id
                 FROM enrollments e
                 JOIN terms t ON t.id = e.term_id
                 JOIN academic_sessions s ON s.id = t.academic_session_id
                 WHERE e.student_id = ? AND t.academic_session_id = ? AND s.school_id = ?
                 ORDER BY e.id DESC
                 LIMIT 1",
                (student_id, session_id, school_id),
                |r| r.get(0),
            )
            .optional()
            .map_err(EngineError::db)
    }

    fn term_context(
        &self,
        term_id: i64,
        student_id: &str,
    ) -> Result<Option<TermContextRow>, EngineError> {
        self.conn
            .query_row(
                "SELECT teacher_comment, principal_comment, days_present, days_open
                 FROM term_remarks
                 WHERE term_id = ? AND student_id = ?",
                (term_id, student_id),
                |r| {
                    Ok(TermContextRow {
                        teacher_comment: r.get(0)?,
                        principal_comment: r.get(1)?,
                        days_present: r.get(2)?,
                        days_open: r.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(EngineError::db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    /// One school with a full chain down to one result row. Returns the
    /// term_subject id.
    fn seed_school(conn: &Connection, school_id: i64, student_id: &str, total: f64) -> i64 {
        conn.execute(
            "INSERT INTO schools(id, name) VALUES (?, ?)",
            (school_id, format!("School {}", school_id)),
        )
        .expect("school");
        conn.execute(
            "INSERT INTO academic_sessions(school_id, session_name, academic_year, status)
             VALUES (?, '2023/2024 Session', '2023/2024', 'completed')",
            [school_id],
        )
        .expect("session");
        let session_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO terms(academic_session_id, name) VALUES (?, 'First Term')",
            [session_id],
        )
        .expect("term");
        let term_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO school_classes(academic_session_id, level, name)
             VALUES (?, 'primary', 'Primary 3')",
            [session_id],
        )
        .expect("class");
        let class_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO subjects(school_id, name, code) VALUES (?, 'Mathematics', 'MTH')",
            [school_id],
        )
        .expect("subject");
        let subject_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO term_subjects(class_id, term_id, subject_id) VALUES (?, ?, ?)",
            (class_id, term_id, subject_id),
        )
        .expect("term_subject");
        let term_subject_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO students(id, school_id, first_name, last_name)
             VALUES (?, ?, 'Ada', 'Obi')",
            (student_id, school_id),
        )
        .expect("student");
        conn.execute(
            "INSERT INTO results(term_subject_id, student_id, ca, exam) VALUES (?, ?, 0, ?)",
            (term_subject_id, student_id, total),
        )
        .expect("result");
        term_subject_id
    }

    #[test]
    fn results_query_never_crosses_the_school_boundary() {
        let conn = Connection::open_in_memory().expect("open");
        db::init_schema(&conn).expect("schema");
        let own_ts = seed_school(&conn, 1, "own-student", 80.0);
        let foreign_ts = seed_school(&conn, 2, "foreign-student", 95.0);

        let store = SqliteStore::new(&conn);

        // A caller smuggling the other school's assignment id gets nothing
        // back for it.
        let rows = store
            .results_for_term_subjects(1, &[own_ts, foreign_ts])
            .expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].term_subject_id, own_ts);
        assert_eq!(rows[0].student_id, "own-student");
        assert_eq!(rows[0].total(), 80.0);

        let rows = store
            .results_for_term_subjects(2, &[own_ts, foreign_ts])
            .expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].term_subject_id, foreign_ts);
    }
}
