use crate::store::{EngineError, TranscriptStore};

/// Resolves the class a student belonged to in one (session, term).
///
/// Historical data is often partial — some terms carry only grade records,
/// others only enrollment rows — so resolution tries four tiers in strict
/// priority order and takes the first hit:
///
/// 1. the class of the student's most recent Result in the term;
/// 2. the student's most recent class-membership row within the session;
/// 3. the student's most recent enrollment scoped to this exact term;
/// 4. the student's most recent enrollment in any term of the session.
///
/// All four coming up empty is not an error: the student did not exist in
/// that term and the caller skips it.
pub fn resolve_class_id(
    store: &dyn TranscriptStore,
    school_id: i64,
    session_id: i64,
    term_id: i64,
    student_id: &str,
) -> Result<Option<i64>, EngineError> {
    if let Some(class_id) = store.latest_result_class(school_id, term_id, student_id)? {
        return Ok(Some(class_id));
    }
    if let Some(class_id) = store.latest_membership_class(school_id, session_id, student_id)? {
        return Ok(Some(class_id));
    }
    if let Some(class_id) = store.latest_term_enrollment_class(school_id, term_id, student_id)? {
        return Ok(Some(class_id));
    }
    if let Some(class_id) =
        store.latest_session_enrollment_class(school_id, session_id, student_id)?
    {
        return Ok(Some(class_id));
    }
    Ok(None)
}
