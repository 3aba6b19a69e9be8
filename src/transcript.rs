use crate::grading::{
    default_comment_for_grade, grade_from_total, ordinal_label, remark_from_total,
    round_off_2_decimals,
};
use crate::ordering::{class_sort_key, session_sort_rank, term_sort_rank};
use crate::resolve::resolve_class_id;
use crate::stats::compute_population_stats;
use crate::store::{
    ClassRow, EngineError, ResultRow, SessionRow, TermContextRow, TermRow, TranscriptStore,
};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRef {
    pub id: i64,
    pub name: String,
    pub academic_year: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermRef {
    pub id: i64,
    pub name: String,
    pub is_current: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRef {
    pub id: i64,
    pub name: String,
    pub level: String,
}

/// One subject line of a term report. Ungraded rows (no Result for the
/// student) keep zeroed scores and "-" placeholders but still carry the
/// population statistics of the assignment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRow {
    pub term_subject_id: i64,
    pub subject_name: String,
    pub subject_code: String,
    pub teacher_name: Option<String>,
    pub has_result: bool,
    pub ca: f64,
    pub exam: f64,
    pub total: f64,
    pub grade: String,
    pub remark: String,
    pub min_score: f64,
    pub max_score: f64,
    pub class_average: f64,
    pub rank: Option<i64>,
    pub rank_label: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub subjects_count: usize,
    pub total_score: f64,
    pub average_score: f64,
    pub overall_grade: String,
}

/// Behaviour/attendance context passed through to the renderer. The only
/// computed piece is the defaulted teacher comment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermContext {
    pub teacher_comment: String,
    pub principal_comment: Option<String>,
    pub days_present: Option<i64>,
    pub days_open: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub session: SessionRef,
    pub term: TermRef,
    pub class: ClassRef,
    pub rows: Vec<SubjectRow>,
    pub summary: EntrySummary,
    pub is_graded: bool,
    pub context: TermContext,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualRow {
    pub subject_name: String,
    pub subject_code: String,
    pub first_total: Option<f64>,
    pub second_total: Option<f64>,
    pub third_total: Option<f64>,
    pub annual_average: Option<f64>,
    pub annual_grade: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualGroup {
    pub session: SessionRef,
    pub class: ClassRef,
    pub rows: Vec<AnnualRow>,
}

/// Builds the per-subject score rows for one student in one class+term.
/// Every assignment of the class+term yields a row; the student's Result is
/// left-joined and statistics come from the full result population of each
/// assignment. Rows come back sorted by subject name, case-insensitively.
pub fn build_subject_rows(
    store: &dyn TranscriptStore,
    school_id: i64,
    class_id: i64,
    term_id: i64,
    student_id: &str,
) -> Result<Vec<SubjectRow>, EngineError> {
    let assignments = store.term_subjects(school_id, class_id, term_id)?;
    let assignment_ids: Vec<i64> = assignments.iter().map(|a| a.id).collect();
    let results = store.results_for_term_subjects(school_id, &assignment_ids)?;
    let stats = compute_population_stats(&results);

    let mut own_results: HashMap<i64, &ResultRow> = HashMap::new();
    for r in &results {
        if r.student_id == student_id {
            own_results.insert(r.term_subject_id, r);
        }
    }

    let mut rows: Vec<SubjectRow> = Vec::with_capacity(assignments.len());
    for a in &assignments {
        let subject_stats = stats.get(&a.id);
        let (min_score, max_score, class_average) = subject_stats
            .map(|s| (s.min_score, s.max_score, s.average))
            .unwrap_or((0.0, 0.0, 0.0));

        let row = match own_results.get(&a.id) {
            Some(r) => {
                let total = r.total();
                let rank = subject_stats.and_then(|s| s.ranks.get(student_id).copied());
                SubjectRow {
                    term_subject_id: a.id,
                    subject_name: a.subject_name.clone(),
                    subject_code: a.subject_code.clone(),
                    teacher_name: a.teacher_name.clone(),
                    has_result: true,
                    ca: r.ca,
                    exam: r.exam,
                    total,
                    grade: grade_from_total(total).to_string(),
                    remark: remark_from_total(total).to_string(),
                    min_score,
                    max_score,
                    class_average,
                    rank,
                    rank_label: rank.map(ordinal_label).unwrap_or_else(|| "-".to_string()),
                }
            }
            None => SubjectRow {
                term_subject_id: a.id,
                subject_name: a.subject_name.clone(),
                subject_code: a.subject_code.clone(),
                teacher_name: a.teacher_name.clone(),
                has_result: false,
                ca: 0.0,
                exam: 0.0,
                total: 0.0,
                grade: "-".to_string(),
                remark: "-".to_string(),
                min_score,
                max_score,
                class_average,
                rank: None,
                rank_label: "-".to_string(),
            },
        };
        rows.push(row);
    }

    rows.sort_by(|a, b| {
        a.subject_name
            .to_lowercase()
            .cmp(&b.subject_name.to_lowercase())
            .then_with(|| a.term_subject_id.cmp(&b.term_subject_id))
    });
    Ok(rows)
}

/// Combines subject rows and behaviour context into one per-(session, term)
/// record with summary totals. Only graded rows count toward the summary; a
/// fully ungraded entry degenerates to zeroes and is filtered out downstream.
pub fn assemble_entry(
    session: &SessionRow,
    term: &TermRow,
    class: &ClassRow,
    rows: Vec<SubjectRow>,
    context: Option<TermContextRow>,
) -> TranscriptEntry {
    let subjects_count = rows.iter().filter(|r| r.has_result).count();
    let total_score: f64 = rows.iter().filter(|r| r.has_result).map(|r| r.total).sum();
    let average_score = round_off_2_decimals(total_score / (subjects_count.max(1) as f64));
    let overall_grade = grade_from_total(average_score.round()).to_string();

    let raw = context.unwrap_or_default();
    let teacher_comment = raw
        .teacher_comment
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| default_comment_for_grade(&overall_grade).to_string());

    TranscriptEntry {
        session: SessionRef {
            id: session.id,
            name: session.session_name.clone(),
            academic_year: session.academic_year.clone(),
            status: session.status.clone(),
        },
        term: TermRef {
            id: term.id,
            name: term.name.clone(),
            is_current: term.is_current,
        },
        class: ClassRef {
            id: class.id,
            name: class.name.clone(),
            level: class.level.clone(),
        },
        rows,
        summary: EntrySummary {
            subjects_count,
            total_score,
            average_score,
            overall_grade,
        },
        is_graded: subjects_count > 0,
        context: TermContext {
            teacher_comment,
            principal_comment: raw.principal_comment,
            days_present: raw.days_present,
            days_open: raw.days_open,
        },
    }
}

fn entry_sort_key(e: &TranscriptEntry) -> (i64, i64, i64, i64, String) {
    let class_key = class_sort_key(&e.class.name, &e.class.level);
    (
        class_key.bucket,
        class_key.number,
        term_sort_rank(&e.term.name),
        session_sort_rank(&e.session.academic_year, e.session.id),
        e.class.name.to_lowercase(),
    )
}

fn group_sort_key(g: &AnnualGroup) -> (i64, i64, i64, String) {
    let class_key = class_sort_key(&g.class.name, &g.class.level);
    (
        class_key.bucket,
        class_key.number,
        session_sort_rank(&g.session.academic_year, g.session.id),
        g.class.name.to_lowercase(),
    )
}

/// Builds the full chronological transcript for one student: walks every
/// session/term of the school, resolves the student's class per term, builds
/// rows, and keeps only graded entries. Re-running on the same data produces
/// identical output, order included.
pub fn build_transcript(
    store: &dyn TranscriptStore,
    school_id: i64,
    student_id: &str,
) -> Result<Vec<TranscriptEntry>, EngineError> {
    let mut entries = Vec::new();
    for session_terms in store.sessions_with_terms(school_id)? {
        let session = &session_terms.session;
        for term in &session_terms.terms {
            let Some(class_id) =
                resolve_class_id(store, school_id, session.id, term.id, student_id)?
            else {
                continue;
            };
            let Some(class) = store.class_by_id(school_id, class_id)? else {
                continue;
            };
            let rows = build_subject_rows(store, school_id, class_id, term.id, student_id)?;
            let context = store.term_context(term.id, student_id)?;
            entries.push(assemble_entry(session, term, &class, rows, context));
        }
    }
    entries.retain(|e| e.is_graded);
    entries.sort_by_key(entry_sort_key);
    Ok(entries)
}

struct AnnualBucket {
    session: SessionRef,
    class: ClassRef,
    subject_order: Vec<(String, String)>,
    subjects: HashMap<(String, String), AnnualRow>,
}

/// Rolls term entries into annual per-subject summaries keyed by
/// (session, class). Term names that map to no slot (rank 9) are dropped;
/// subjects merge across terms by lowercased name+code.
pub fn group_by_session_class(entries: &[TranscriptEntry]) -> Vec<AnnualGroup> {
    let mut bucket_order: Vec<(i64, i64)> = Vec::new();
    let mut buckets: HashMap<(i64, i64), AnnualBucket> = HashMap::new();

    for entry in entries {
        if !entry.is_graded {
            continue;
        }
        let slot = term_sort_rank(&entry.term.name);
        if !(1..=3).contains(&slot) {
            continue;
        }

        let key = (entry.session.id, entry.class.id);
        let bucket = buckets.entry(key).or_insert_with(|| {
            bucket_order.push(key);
            AnnualBucket {
                session: entry.session.clone(),
                class: entry.class.clone(),
                subject_order: Vec::new(),
                subjects: HashMap::new(),
            }
        });

        let AnnualBucket {
            subjects,
            subject_order,
            ..
        } = bucket;
        for row in &entry.rows {
            if !row.has_result {
                continue;
            }
            let subject_key = (
                row.subject_name.to_lowercase(),
                row.subject_code.to_lowercase(),
            );
            let annual = subjects
                .entry(subject_key.clone())
                .or_insert_with(|| {
                    subject_order.push(subject_key);
                    AnnualRow {
                        subject_name: row.subject_name.clone(),
                        subject_code: row.subject_code.clone(),
                        first_total: None,
                        second_total: None,
                        third_total: None,
                        annual_average: None,
                        annual_grade: "-".to_string(),
                    }
                });
            match slot {
                1 => annual.first_total = Some(row.total),
                2 => annual.second_total = Some(row.total),
                _ => annual.third_total = Some(row.total),
            }
        }
    }

    let mut groups: Vec<AnnualGroup> = Vec::with_capacity(bucket_order.len());
    for key in bucket_order {
        let Some(mut bucket) = buckets.remove(&key) else {
            continue;
        };
        let mut rows: Vec<AnnualRow> = Vec::with_capacity(bucket.subject_order.len());
        for subject_key in &bucket.subject_order {
            let Some(mut row) = bucket.subjects.remove(subject_key) else {
                continue;
            };
            let slots: Vec<f64> = [row.first_total, row.second_total, row.third_total]
                .into_iter()
                .flatten()
                .collect();
            if !slots.is_empty() {
                let average =
                    round_off_2_decimals(slots.iter().sum::<f64>() / (slots.len() as f64));
                row.annual_average = Some(average);
                row.annual_grade = grade_from_total(average.round()).to_string();
            }
            rows.push(row);
        }
        rows.sort_by(|a, b| {
            a.subject_name
                .to_lowercase()
                .cmp(&b.subject_name.to_lowercase())
                .then_with(|| a.subject_code.to_lowercase().cmp(&b.subject_code.to_lowercase()))
        });
        groups.push(AnnualGroup {
            session: bucket.session,
            class: bucket.class,
            rows,
        });
    }

    groups.sort_by_key(group_sort_key);
    groups
}

/// Convenience for the annual sheet: full pipeline, then the rollup.
pub fn build_annual_groups(
    store: &dyn TranscriptStore,
    school_id: i64,
    student_id: &str,
) -> Result<Vec<AnnualGroup>, EngineError> {
    let entries = build_transcript(store, school_id, student_id)?;
    Ok(group_by_session_class(&entries))
}
