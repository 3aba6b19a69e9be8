/// Sort keys for chronological transcript ordering. Class and term names are
/// free text entered by schools over many years, so classification works on
/// recognizable tokens with an explicit worst-case bucket instead of failing.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClassSortKey {
    pub bucket: i64,
    pub number: i64,
}

const BUCKET_NURSERY: i64 = 100;
const BUCKET_PRIMARY: i64 = 200;
const BUCKET_JUNIOR: i64 = 300;
const BUCKET_SECONDARY_UNSPLIT: i64 = 350;
const BUCKET_SENIOR: i64 = 400;
const BUCKET_UNKNOWN: i64 = 900;

/// Missing numeric suffix sorts last within its bucket.
const NUMBER_UNKNOWN: i64 = 99;

/// Classifies a class name ("Primary 3", "JSS 1", "Pry2B", ...) into a
/// school-progression bucket plus the numeric suffix within it. The `level`
/// column refines otherwise-unrecognized names; anything still unrecognized
/// lands in the trailing bucket rather than erroring.
pub fn class_sort_key(name: &str, level: &str) -> ClassSortKey {
    let lower = name.to_lowercase();

    let mut bucket = None;
    for token in lower.split(|c: char| !c.is_ascii_alphanumeric()) {
        let alpha: String = token
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        let b = match alpha.as_str() {
            "nursery" | "creche" | "kg" => BUCKET_NURSERY,
            "primary" | "pry" | "pri" => BUCKET_PRIMARY,
            "jss" | "js" | "junior" => BUCKET_JUNIOR,
            "sss" | "ss" | "senior" => BUCKET_SENIOR,
            _ => continue,
        };
        bucket = Some(b);
        break;
    }

    let bucket = bucket.unwrap_or(match level.to_lowercase().as_str() {
        "primary" => BUCKET_PRIMARY,
        "secondary" => BUCKET_SECONDARY_UNSPLIT,
        _ => BUCKET_UNKNOWN,
    });

    ClassSortKey {
        bucket,
        number: first_digit_run(&lower)
            .and_then(|run| run.parse::<i64>().ok())
            .unwrap_or(NUMBER_UNKNOWN),
    }
}

/// First/Second/Third term position; unrecognized names rank 9 and are
/// excluded from annual slot mapping.
pub fn term_sort_rank(name: &str) -> i64 {
    let lower = name.to_lowercase();
    if lower.contains("first") || lower.contains("1st") {
        1
    } else if lower.contains("second") || lower.contains("2nd") {
        2
    } else if lower.contains("third") || lower.contains("3rd") {
        3
    } else {
        9
    }
}

/// Orders sessions by the first 4-digit year embedded in the academic-year
/// text ("2024/2025" -> 2024). Sessions without a parseable year fall back to
/// their numeric id, which is monotonic with creation.
pub fn session_sort_rank(academic_year: &str, fallback_id: i64) -> i64 {
    let mut run = String::new();
    for c in academic_year.chars() {
        if c.is_ascii_digit() {
            run.push(c);
            if run.len() == 4 {
                return run.parse::<i64>().unwrap_or(fallback_id);
            }
        } else {
            run.clear();
        }
    }
    fallback_id
}

fn first_digit_run(s: &str) -> Option<String> {
    let mut run = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            run.push(c);
        } else if !run.is_empty() {
            break;
        }
    }
    if run.is_empty() {
        None
    } else {
        Some(run)
    }
}
