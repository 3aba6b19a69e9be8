use crate::grading::round_off_2_decimals;
use crate::store::ResultRow;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Population statistics for one term-subject, computed over every student
/// with a Result for it.
#[derive(Debug, Clone, Default)]
pub struct SubjectStats {
    pub min_score: f64,
    pub max_score: f64,
    pub average: f64,
    /// Competition ranks keyed by student id; absent for students with no
    /// Result (callers check `has_result` before looking up).
    pub ranks: HashMap<String, i64>,
}

/// Groups results by term-subject and computes min/max/average plus
/// competition ranking with gaps: equal totals share a rank, and the next
/// distinct total takes its 1-based position in the sorted order, so totals
/// [90, 90, 80] rank [1, 1, 3].
pub fn compute_population_stats(results: &[ResultRow]) -> HashMap<i64, SubjectStats> {
    let mut grouped: HashMap<i64, Vec<(&str, f64)>> = HashMap::new();
    for r in results {
        grouped
            .entry(r.term_subject_id)
            .or_default()
            .push((r.student_id.as_str(), r.total()));
    }

    let mut out = HashMap::with_capacity(grouped.len());
    for (term_subject_id, mut totals) in grouped {
        // Descending by total; student id breaks ties so reruns are stable.
        totals.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });

        let mut min_score = f64::MAX;
        let mut max_score = f64::MIN;
        let mut sum = 0.0;
        for (_, total) in &totals {
            min_score = min_score.min(*total);
            max_score = max_score.max(*total);
            sum += *total;
        }

        let mut ranks = HashMap::with_capacity(totals.len());
        let mut prev_total = f64::NAN;
        let mut prev_rank = 0_i64;
        for (i, (student_id, total)) in totals.iter().enumerate() {
            let rank = if i > 0 && *total == prev_total {
                prev_rank
            } else {
                (i as i64) + 1
            };
            ranks.insert((*student_id).to_string(), rank);
            prev_total = *total;
            prev_rank = rank;
        }

        out.insert(
            term_subject_id,
            SubjectStats {
                min_score,
                max_score,
                average: round_off_2_decimals(sum / (totals.len() as f64)),
                ranks,
            },
        );
    }
    out
}
