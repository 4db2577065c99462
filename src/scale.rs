use crate::normalize::normalize;

pub const INDEX_MAX_SCALE: f64 = 10.0;
pub const DIVISOR_LIMIT: f64 = 1e9;

/// Labels describing the group being scaled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaleHint<'a> {
    pub title: &'a str,
    pub assessment_name: &'a str,
    pub grade_label: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleResolution {
    pub max_scale: f64,
    pub divisor: f64,
    /// The divisor search hit [`DIVISOR_LIMIT`] before the values fit.
    pub overflowed: bool,
}

impl ScaleResolution {
    pub const DEFAULT: ScaleResolution = ScaleResolution {
        max_scale: INDEX_MAX_SCALE,
        divisor: 1.0,
        overflowed: false,
    };

    pub fn scale(&self, raw_value: f64) -> f64 {
        let scaled = raw_value / self.divisor;
        if scaled.is_nan() {
            return 0.0;
        }
        scaled.clamp(0.0, self.max_scale.max(0.0))
    }
}

/// One assessment family's rule for picking an axis maximum and divisor.
pub trait ScaleFamily: Send + Sync {
    fn name(&self) -> &'static str;
    fn matches(&self, hint: &ScaleHint<'_>) -> bool;
    fn resolve(&self, hint: &ScaleHint<'_>, raw_values: &[f64]) -> ScaleResolution;
}

/// Composite indices (IDEB, IDEPE) nominally bounded by 10, stored at
/// whatever power of ten the person entering them used.
pub struct IndexFamily {
    markers: Vec<String>,
}

impl IndexFamily {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|marker| normalize(marker.as_ref()))
                .filter(|marker| !marker.is_empty())
                .collect(),
        }
    }
}

impl Default for IndexFamily {
    fn default() -> Self {
        Self::new(["ideb", "idepe"])
    }
}

impl ScaleFamily for IndexFamily {
    fn name(&self) -> &'static str {
        "index"
    }

    fn matches(&self, hint: &ScaleHint<'_>) -> bool {
        let title = normalize(hint.title);
        let assessment = normalize(hint.assessment_name);
        self.markers
            .iter()
            .any(|marker| title.contains(marker.as_str()) || assessment.contains(marker.as_str()))
    }

    fn resolve(&self, _hint: &ScaleHint<'_>, raw_values: &[f64]) -> ScaleResolution {
        let max = raw_values
            .iter()
            .map(|value| value.abs())
            .filter(|value| !value.is_nan())
            .fold(0.0_f64, f64::max);

        let mut divisor = 1.0_f64;
        let mut overflowed = false;
        while max / divisor > INDEX_MAX_SCALE {
            if divisor > DIVISOR_LIMIT {
                overflowed = true;
                break;
            }
            divisor *= 10.0;
        }

        ScaleResolution {
            max_scale: INDEX_MAX_SCALE,
            divisor,
            overflowed,
        }
    }
}

/// Plain test scores; the grade label hints at the score range.
#[derive(Default)]
pub struct RawScoreFamily;

impl ScaleFamily for RawScoreFamily {
    fn name(&self) -> &'static str {
        "raw-score"
    }

    fn matches(&self, _hint: &ScaleHint<'_>) -> bool {
        true
    }

    fn resolve(&self, hint: &ScaleHint<'_>, _raw_values: &[f64]) -> ScaleResolution {
        let grade = hint.grade_label;
        let max_scale = if grade.contains('2') {
            1000.0
        } else if grade.contains('5') || grade.contains('9') {
            500.0
        } else {
            INDEX_MAX_SCALE
        };

        ScaleResolution {
            max_scale,
            divisor: 1.0,
            overflowed: false,
        }
    }
}

/// Tries each family in order; the first match decides.
pub struct ScaleResolver {
    families: Vec<Box<dyn ScaleFamily>>,
}

impl ScaleResolver {
    pub fn new(families: Vec<Box<dyn ScaleFamily>>) -> Self {
        Self { families }
    }

    pub fn resolve(&self, hint: &ScaleHint<'_>, raw_values: &[f64]) -> ScaleResolution {
        if raw_values.is_empty() {
            return ScaleResolution::DEFAULT;
        }

        let Some(family) = self.families.iter().find(|family| family.matches(hint)) else {
            return ScaleResolution::DEFAULT;
        };

        let resolution = family.resolve(hint, raw_values);
        if resolution.overflowed {
            tracing::warn!(
                family = family.name(),
                title = hint.title,
                divisor = resolution.divisor,
                "divisor search exceeded its bound; values will be clamped"
            );
        }
        resolution
    }
}

impl Default for ScaleResolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(IndexFamily::default()),
            Box::new(RawScoreFamily),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_hint() -> ScaleHint<'static> {
        ScaleHint {
            title: "IDEB - 5º Ano - Português",
            assessment_name: "IDEB",
            grade_label: "5º Ano",
        }
    }

    fn raw_hint(grade_label: &'static str) -> ScaleHint<'static> {
        ScaleHint {
            title: "SAEB",
            assessment_name: "SAEB",
            grade_label,
        }
    }

    #[test]
    fn divisor_search_converges_on_mixed_magnitudes() {
        let resolver = ScaleResolver::default();
        let values = [580.0, 75.0, 92.0];
        let resolution = resolver.resolve(&index_hint(), &values);
        assert_eq!(resolution.max_scale, 10.0);
        assert_eq!(resolution.divisor, 100.0);
        assert!(!resolution.overflowed);

        let scaled: Vec<f64> = values.iter().map(|v| resolution.scale(*v)).collect();
        for (actual, expected) in scaled.iter().zip([5.8, 0.75, 0.92]) {
            assert!((actual - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn in_range_index_values_keep_divisor_one() {
        let resolution = ScaleResolver::default().resolve(&index_hint(), &[6.1, 6.8]);
        assert_eq!(resolution.divisor, 1.0);
        assert_eq!(resolution.max_scale, 10.0);
    }

    #[test]
    fn index_markers_match_case_and_accent_insensitively() {
        let family = IndexFamily::default();
        let hint = ScaleHint {
            title: "Resultado Idepe",
            assessment_name: "",
            grade_label: "",
        };
        assert!(family.matches(&hint));
        assert!(!family.matches(&raw_hint("5º Ano")));
    }

    #[test]
    fn raw_scores_pick_max_from_grade_digits() {
        let resolver = ScaleResolver::default();
        assert_eq!(resolver.resolve(&raw_hint("2º Ano"), &[700.0]).max_scale, 1000.0);
        assert_eq!(resolver.resolve(&raw_hint("5º Ano"), &[210.0]).max_scale, 500.0);
        assert_eq!(resolver.resolve(&raw_hint("9º Ano"), &[260.0]).max_scale, 500.0);
        assert_eq!(resolver.resolve(&raw_hint("3ª Série"), &[7.0]).max_scale, 10.0);
        assert_eq!(resolver.resolve(&raw_hint("5º Ano"), &[210.0]).divisor, 1.0);
    }

    #[test]
    fn empty_group_uses_defaults() {
        let resolution = ScaleResolver::default().resolve(&index_hint(), &[]);
        assert_eq!(resolution, ScaleResolution::DEFAULT);
    }

    #[test]
    fn pathological_magnitudes_stop_at_the_bound() {
        let resolution = ScaleResolver::default().resolve(&index_hint(), &[f64::INFINITY]);
        assert!(resolution.overflowed);
        assert!(resolution.divisor > DIVISOR_LIMIT);
        assert_eq!(resolution.scale(f64::INFINITY), 10.0);
    }

    #[test]
    fn scaled_values_are_clamped_to_axis() {
        let resolution = ScaleResolution {
            max_scale: 500.0,
            divisor: 1.0,
            overflowed: false,
        };
        assert_eq!(resolution.scale(-3.0), 0.0);
        assert_eq!(resolution.scale(612.0), 500.0);
        assert_eq!(resolution.scale(f64::NAN), 0.0);
    }

    #[test]
    fn custom_families_take_precedence_in_order() {
        struct Percent;
        impl ScaleFamily for Percent {
            fn name(&self) -> &'static str {
                "percent"
            }
            fn matches(&self, hint: &ScaleHint<'_>) -> bool {
                hint.assessment_name.contains('%')
            }
            fn resolve(&self, _hint: &ScaleHint<'_>, _raw: &[f64]) -> ScaleResolution {
                ScaleResolution {
                    max_scale: 100.0,
                    divisor: 1.0,
                    overflowed: false,
                }
            }
        }

        let resolver = ScaleResolver::new(vec![Box::new(Percent), Box::new(RawScoreFamily)]);
        let hint = ScaleHint {
            title: "Aprovação",
            assessment_name: "Aprovação %",
            grade_label: "5º Ano",
        };
        assert_eq!(resolver.resolve(&hint, &[88.0]).max_scale, 100.0);
    }
}
