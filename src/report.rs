use std::fmt::Write;

use crate::aggregate;
use crate::geometry;
use crate::models::{AssessmentResult, School, Scope};
use crate::series::SeriesBuilder;

const RECENT_SCHOOLS: usize = 5;

pub fn build_report(
    school: Option<&School>,
    reference_year: i32,
    records: &[AssessmentResult],
    schools: &[School],
) -> String {
    let scope = if school.is_some() {
        Scope::SingleEntity
    } else {
        Scope::All
    };
    let snapshot = aggregate::summarize(records, reference_year, scope);
    let groups = SeriesBuilder::default().build(records);

    let mut output = String::new();
    let _ = writeln!(output, "# Assessment Results Report");
    match school {
        Some(school) => {
            let _ = writeln!(output, "Generated for {} (INEP {})", school.name, school.inep_code);
        }
        None => {
            let _ = writeln!(output, "Generated for all schools");
        }
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    if school.is_none() && !schools.is_empty() {
        let _ = writeln!(output, "- Registered schools: {}", schools.len());
    }
    let _ = writeln!(output, "- Results recorded: {}", snapshot.total_records);
    let category_label = match scope {
        Scope::All => "Assessments",
        Scope::SingleEntity => "Subjects",
    };
    let _ = writeln!(output, "- {}: {}", category_label, snapshot.distinct_categories);
    if scope == Scope::SingleEntity {
        let _ = writeln!(
            output,
            "- Average in {}: {:.2}",
            reference_year, snapshot.average_current_period
        );
        match reference_year.checked_sub(1) {
            Some(previous_year) => {
                let _ = writeln!(
                    output,
                    "- Growth since {}: {:+.1}%",
                    previous_year, snapshot.growth_percent
                );
            }
            None => {
                let _ = writeln!(output, "- Growth: no previous year");
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## {} Mix", category_label.trim_end_matches('s'));
    if snapshot.per_category_counts.is_empty() {
        let _ = writeln!(output, "No results recorded.");
    } else {
        for entry in &snapshot.per_category_counts {
            let _ = writeln!(output, "- {}: {} results", entry.category, entry.count);
        }
    }

    if school.is_none() {
        let mut recent: Vec<&School> = schools.iter().filter(|s| s.created_at.is_some()).collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let _ = writeln!(output);
        let _ = writeln!(output, "## Recently Added Schools");
        if recent.is_empty() {
            let _ = writeln!(output, "No schools registered.");
        } else {
            for school in recent.iter().take(RECENT_SCHOOLS) {
                if let Some(created_at) = school.created_at {
                    let _ = writeln!(
                        output,
                        "- {} (added {})",
                        school.name,
                        created_at.format("%Y-%m-%d")
                    );
                }
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Charts");
    if groups.is_empty() {
        let _ = writeln!(output, "No data available to build charts.");
    }
    for group in &groups {
        let chart = geometry::map_group(group);
        let _ = writeln!(output);
        let _ = writeln!(output, "### {}", group.display_title);
        let _ = writeln!(
            output,
            "Scale 0-{} (divisor {})",
            group.max_scale, group.divisor
        );
        for (point, bar) in group.points.iter().zip(&chart.bars) {
            let _ = writeln!(
                output,
                "- {}: {} (raw {}, bar {:.0}%)",
                point.year, bar.label, point.raw_value, bar.height
            );
        }
    }

    let mut listing: Vec<&AssessmentResult> = records.iter().collect();
    listing.sort_by_key(|record| record.year_or_default());
    let _ = writeln!(output);
    let _ = writeln!(output, "## All Results");
    if listing.is_empty() {
        let _ = writeln!(output, "No results recorded.");
    } else {
        for record in listing {
            let value = record
                .value
                .map(|value| format!("{value:.2}"))
                .unwrap_or_else(|| "N/A".to_string());
            let year = record
                .year
                .map(|year| year.to_string())
                .unwrap_or_else(|| "?".to_string());
            let _ = writeln!(
                output,
                "- {} - {} ({} - {}): {}",
                record.subject, record.assessment_name, year, record.grade_label, value
            );
        }
    }

    output
}
