use std::collections::HashMap;

use crate::models::{AssessmentResult, CategoryCount, KpiSnapshot, Scope};
use crate::normalize::normalize;

pub fn summarize(records: &[AssessmentResult], reference_year: i32, scope: Scope) -> KpiSnapshot {
    let per_category_counts = count_by_category(records, scope);

    let (average_current_period, growth_percent) = match scope {
        Scope::All => (0.0, 0.0),
        Scope::SingleEntity => {
            let current = average_for_year(records, reference_year);
            let previous = reference_year
                .checked_sub(1)
                .and_then(|previous_year| average_for_year(records, previous_year));
            (current.unwrap_or(0.0), growth_percent(current, previous))
        }
    };

    KpiSnapshot {
        total_records: records.len(),
        distinct_categories: per_category_counts.len(),
        per_category_counts,
        average_current_period,
        growth_percent,
    }
}

/// Counts per category, largest first; equal counts keep first-seen order.
pub fn count_by_category(records: &[AssessmentResult], scope: Scope) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for record in records {
        let label = match scope {
            Scope::All => &record.assessment_name,
            Scope::SingleEntity => &record.subject,
        };
        let slot = *slots.entry(normalize(label)).or_insert_with(|| {
            counts.push(CategoryCount {
                category: label.trim().to_string(),
                count: 0,
            });
            counts.len() - 1
        });
        counts[slot].count += 1;
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

pub fn average_for_year(records: &[AssessmentResult], year: i32) -> Option<f64> {
    let (total, count) = records
        .iter()
        .filter(|record| record.year_or_default() == year)
        .fold((0.0, 0usize), |(total, count), record| {
            (total + record.value_or_default(), count + 1)
        });

    if count == 0 {
        None
    } else {
        Some(total / count as f64)
    }
}

/// Year-over-year change. A missing or zero previous average yields 0 rather
/// than an infinite or undefined percentage.
pub fn growth_percent(current: Option<f64>, previous: Option<f64>) -> f64 {
    match previous {
        Some(previous) if previous != 0.0 => {
            let growth = (current.unwrap_or(0.0) - previous) / previous * 100.0;
            if growth.is_finite() {
                growth
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}
