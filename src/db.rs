use rusqlite::Connection;
use std::path::Path;

pub fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("transcript.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schools(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            address TEXT,
            motto TEXT,
            created_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS academic_sessions(
            id INTEGER PRIMARY KEY,
            school_id INTEGER NOT NULL,
            session_name TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK(status IN ('pending','current','completed')),
            created_at TEXT,
            FOREIGN KEY(school_id) REFERENCES schools(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_school ON academic_sessions(school_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS terms(
            id INTEGER PRIMARY KEY,
            academic_session_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            is_current INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            FOREIGN KEY(academic_session_id) REFERENCES academic_sessions(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_terms_session ON terms(academic_session_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS school_classes(
            id INTEGER PRIMARY KEY,
            academic_session_id INTEGER NOT NULL,
            level TEXT NOT NULL CHECK(level IN ('nursery','primary','secondary')),
            name TEXT NOT NULL,
            created_at TEXT,
            FOREIGN KEY(academic_session_id) REFERENCES academic_sessions(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_classes_session ON school_classes(academic_session_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id INTEGER PRIMARY KEY,
            school_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            code TEXT,
            FOREIGN KEY(school_id) REFERENCES schools(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subjects_school ON subjects(school_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS term_subjects(
            id INTEGER PRIMARY KEY,
            class_id INTEGER NOT NULL,
            term_id INTEGER NOT NULL,
            subject_id INTEGER NOT NULL,
            teacher_name TEXT,
            FOREIGN KEY(class_id) REFERENCES school_classes(id),
            FOREIGN KEY(term_id) REFERENCES terms(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_term_subjects_class_term
         ON term_subjects(class_id, term_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            school_id INTEGER NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            admission_no TEXT,
            created_at TEXT,
            FOREIGN KEY(school_id) REFERENCES schools(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_school ON students(school_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS results(
            term_subject_id INTEGER NOT NULL,
            student_id TEXT NOT NULL,
            ca REAL NOT NULL DEFAULT 0,
            exam REAL NOT NULL DEFAULT 0,
            updated_at TEXT,
            PRIMARY KEY(term_subject_id, student_id),
            FOREIGN KEY(term_subject_id) REFERENCES term_subjects(id),
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_results_student ON results(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS class_students(
            class_id INTEGER NOT NULL,
            student_id TEXT NOT NULL,
            created_at TEXT,
            PRIMARY KEY(class_id, student_id),
            FOREIGN KEY(class_id) REFERENCES school_classes(id),
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_class_students_student ON class_students(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments(
            id INTEGER PRIMARY KEY,
            student_id TEXT NOT NULL,
            class_id INTEGER NOT NULL,
            term_id INTEGER NOT NULL,
            created_at TEXT,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(class_id) REFERENCES school_classes(id),
            FOREIGN KEY(term_id) REFERENCES terms(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_student_term
         ON enrollments(student_id, term_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS term_remarks(
            term_id INTEGER NOT NULL,
            student_id TEXT NOT NULL,
            teacher_comment TEXT,
            principal_comment TEXT,
            days_present INTEGER,
            days_open INTEGER,
            PRIMARY KEY(term_id, student_id),
            FOREIGN KEY(term_id) REFERENCES terms(id),
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;

    Ok(())
}
