/// Two-decimal rounding used everywhere an average is reported:
/// `Round(100*x) / 100`
pub fn round_off_2_decimals(x: f64) -> f64 {
    ((100.0 * x).round()) / 100.0
}

/// Letter grade for a term-subject total. Band floors are 70/60/50/40/30;
/// out-of-range totals fall into the outer bands (callers bound raw scores).
pub fn grade_from_total(total: f64) -> &'static str {
    if total >= 70.0 {
        "A"
    } else if total >= 60.0 {
        "B"
    } else if total >= 50.0 {
        "C"
    } else if total >= 40.0 {
        "D"
    } else if total >= 30.0 {
        "E"
    } else {
        "F"
    }
}

/// Qualitative remark over the same bands; the F band folds into
/// NEEDS IMPROVEMENT.
pub fn remark_from_total(total: f64) -> &'static str {
    if total >= 70.0 {
        "EXCELLENT"
    } else if total >= 60.0 {
        "VERY GOOD"
    } else if total >= 50.0 {
        "GOOD"
    } else if total >= 40.0 {
        "FAIR"
    } else {
        "NEEDS IMPROVEMENT"
    }
}

/// Fallback teacher comment when no explicit remark row exists for the term.
/// One fixed string per grade band; E and F share one, as in the remark table.
pub fn default_comment_for_grade(grade: &str) -> &'static str {
    match grade {
        "A" => "An excellent performance. Keep it up.",
        "B" => "A very good performance. Keep working hard.",
        "C" => "A good performance. There is still room for improvement.",
        "D" => "A fair performance. More effort is required.",
        _ => "A weak performance. Serious improvement is needed.",
    }
}

/// English ordinal label for a 1-based rank: 1st, 2nd, 3rd, 4th, ...
/// 11 through 13 always take "th".
pub fn ordinal_label(rank: i64) -> String {
    let suffix = match rank % 100 {
        11..=13 => "th",
        _ => match rank % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    };
    format!("{}{}", rank, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_bands_partition_at_exact_boundaries() {
        assert_eq!(grade_from_total(100.0), "A");
        assert_eq!(grade_from_total(70.0), "A");
        assert_eq!(grade_from_total(69.0), "B");
        assert_eq!(grade_from_total(60.0), "B");
        assert_eq!(grade_from_total(59.0), "C");
        assert_eq!(grade_from_total(50.0), "C");
        assert_eq!(grade_from_total(49.0), "D");
        assert_eq!(grade_from_total(40.0), "D");
        assert_eq!(grade_from_total(39.0), "E");
        assert_eq!(grade_from_total(30.0), "E");
        assert_eq!(grade_from_total(29.0), "F");
        assert_eq!(grade_from_total(0.0), "F");
    }

    #[test]
    fn grade_accepts_out_of_range_totals() {
        assert_eq!(grade_from_total(-5.0), "F");
        assert_eq!(grade_from_total(240.0), "A");
    }

    #[test]
    fn every_total_gets_exactly_one_grade() {
        for t in -20..=120 {
            let g = grade_from_total(t as f64);
            assert!(matches!(g, "A" | "B" | "C" | "D" | "E" | "F"), "{t} -> {g}");
        }
    }

    #[test]
    fn remark_folds_f_into_needs_improvement() {
        assert_eq!(remark_from_total(75.0), "EXCELLENT");
        assert_eq!(remark_from_total(65.0), "VERY GOOD");
        assert_eq!(remark_from_total(55.0), "GOOD");
        assert_eq!(remark_from_total(45.0), "FAIR");
        assert_eq!(remark_from_total(35.0), "NEEDS IMPROVEMENT");
        assert_eq!(remark_from_total(10.0), "NEEDS IMPROVEMENT");
    }

    #[test]
    fn ordinal_labels_cover_teens() {
        assert_eq!(ordinal_label(1), "1st");
        assert_eq!(ordinal_label(2), "2nd");
        assert_eq!(ordinal_label(3), "3rd");
        assert_eq!(ordinal_label(4), "4th");
        assert_eq!(ordinal_label(11), "11th");
        assert_eq!(ordinal_label(12), "12th");
        assert_eq!(ordinal_label(13), "13th");
        assert_eq!(ordinal_label(21), "21st");
        assert_eq!(ordinal_label(22), "22nd");
        assert_eq!(ordinal_label(23), "23rd");
        assert_eq!(ordinal_label(111), "111th");
        assert_eq!(ordinal_label(101), "101st");
    }

    #[test]
    fn round_off_keeps_two_decimals() {
        assert_eq!(round_off_2_decimals(73.333333), 73.33);
        assert_eq!(round_off_2_decimals(73.336), 73.34);
        assert_eq!(round_off_2_decimals(80.0), 80.0);
        // Halfway-looking decimals follow their nearest f64 value: 73.335
        // stores as slightly below the midpoint and rounds down.
        assert_eq!(round_off_2_decimals(73.335), 73.33);
    }
}
