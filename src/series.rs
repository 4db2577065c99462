use std::collections::HashMap;

use crate::models::{AssessmentResult, ResultGroup, ScaledPoint};
use crate::normalize::{build_key_with, CanonicalKey, KeyPolicy};
use crate::scale::{ScaleHint, ScaleResolver};

pub struct SeriesBuilder {
    policy: KeyPolicy,
    resolver: ScaleResolver,
}

impl SeriesBuilder {
    pub fn new(policy: KeyPolicy, resolver: ScaleResolver) -> Self {
        Self { policy, resolver }
    }

    pub fn key_for(&self, record: &AssessmentResult) -> CanonicalKey {
        build_key_with(
            Some(&record.assessment_name),
            Some(&record.grade_label),
            Some(&record.subject),
            self.policy,
        )
    }

    /// Groups are emitted in the order their key is first seen; points within
    /// a group are sorted by year, keeping input order for equal years.
    pub fn build(&self, records: &[AssessmentResult]) -> Vec<ResultGroup> {
        let mut order: Vec<(CanonicalKey, Vec<&AssessmentResult>)> = Vec::new();
        let mut slots: HashMap<CanonicalKey, usize> = HashMap::new();

        for record in records {
            let key = self.key_for(record);
            let slot = *slots.entry(key.clone()).or_insert_with(|| {
                order.push((key, Vec::new()));
                order.len() - 1
            });
            order[slot].1.push(record);
        }

        order
            .into_iter()
            .map(|(key, mut members)| {
                let first_seen = members[0];
                members.sort_by_key(|record| record.year_or_default());
                self.build_group(key, first_seen, &members)
            })
            .collect()
    }

    /// Title and scale hint come from `first`, the first record seen for the key.
    fn build_group(
        &self,
        key: CanonicalKey,
        first: &AssessmentResult,
        members: &[&AssessmentResult],
    ) -> ResultGroup {
        let display_title = display_title(first);
        let hint = ScaleHint {
            title: &display_title,
            assessment_name: &first.assessment_name,
            grade_label: &first.grade_label,
        };
        let raw_values: Vec<f64> = members.iter().map(|r| r.value_or_default()).collect();
        let resolution = self.resolver.resolve(&hint, &raw_values);

        let points = members
            .iter()
            .zip(&raw_values)
            .map(|(record, raw_value)| ScaledPoint {
                year: record.year_or_default(),
                raw_value: *raw_value,
                scaled_value: resolution.scale(*raw_value),
                max_scale: resolution.max_scale,
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            key = %key,
            points = points.len(),
            max_scale = resolution.max_scale,
            divisor = resolution.divisor,
            "built result group"
        );

        ResultGroup {
            key,
            display_title,
            max_scale: resolution.max_scale,
            divisor: resolution.divisor,
            points,
        }
    }
}

impl Default for SeriesBuilder {
    fn default() -> Self {
        Self::new(KeyPolicy::default(), ScaleResolver::default())
    }
}

pub fn build(records: &[AssessmentResult]) -> Vec<ResultGroup> {
    SeriesBuilder::default().build(records)
}

fn display_title(record: &AssessmentResult) -> String {
    [
        record.assessment_name.trim(),
        record.grade_label.trim(),
        record.subject.trim(),
    ]
    .join(" - ")
}
