use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::normalize::CanonicalKey;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub id: Uuid,
    pub school_id: Uuid,
    pub assessment_name: String,
    pub subject: String,
    pub grade_label: String,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "lenient_value")]
    pub value: Option<f64>,
}

impl AssessmentResult {
    /// Missing years sort and aggregate as year 0.
    pub fn year_or_default(&self) -> i32 {
        self.year.unwrap_or(0)
    }

    pub fn value_or_default(&self) -> f64 {
        self.value.filter(|value| value.is_finite()).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub inep_code: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields supplied by an editor when recording a new result.
#[derive(Debug, Clone, Default)]
pub struct NewResult {
    pub school_id: Uuid,
    pub assessment_name: String,
    pub subject: String,
    pub grade_label: String,
    pub year: Option<i32>,
    pub value: Option<f64>,
}

/// Precomputed permission handed in by the identity layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capability {
    pub can_edit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledPoint {
    pub year: i32,
    pub raw_value: f64,
    pub scaled_value: f64,
    pub max_scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultGroup {
    pub key: CanonicalKey,
    pub display_title: String,
    pub max_scale: f64,
    pub divisor: f64,
    pub points: Vec<ScaledPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct KpiSnapshot {
    pub total_records: usize,
    pub distinct_categories: usize,
    pub per_category_counts: Vec<CategoryCount>,
    pub average_current_period: f64,
    pub growth_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every school; categories are assessment names.
    All,
    /// One school's records; categories are subjects.
    SingleEntity,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Number(f64),
    Text(String),
}

fn parse_loose(loose: Option<Loose>) -> Option<f64> {
    let number = match loose? {
        Loose::Number(number) => Some(number),
        Loose::Text(text) => text.trim().replace(',', ".").parse::<f64>().ok(),
    };
    number.filter(|number| number.is_finite())
}

fn lenient_value<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(parse_loose(Option::<Loose>::deserialize(deserializer).unwrap_or(None)))
}

fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(parse_loose(Option::<Loose>::deserialize(deserializer).unwrap_or(None))
        .filter(|year| year.fract() == 0.0 && year.abs() <= i32::MAX as f64)
        .map(|year| year as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AssessmentResult {
        serde_json::from_str(json).expect("record should parse")
    }

    const BASE: &str = r#""id":"3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2",
        "school_id":"0c22f1f1-9184-4fd4-9b21-28c68a6a89dc",
        "assessment_name":"IDEB","subject":"Português","grade_label":"5º Ano""#;

    #[test]
    fn numeric_fields_parse_from_numbers_and_text() {
        let numeric = parse(&format!("{{{BASE},\"year\":2023,\"value\":6.8}}"));
        assert_eq!(numeric.year, Some(2023));
        assert_eq!(numeric.value, Some(6.8));

        let textual = parse(&format!("{{{BASE},\"year\":\"2022\",\"value\":\"6,1\"}}"));
        assert_eq!(textual.year, Some(2022));
        assert_eq!(textual.value, Some(6.1));
    }

    #[test]
    fn malformed_numeric_fields_default_to_zero() {
        let record = parse(&format!("{{{BASE},\"year\":null,\"value\":\"n/a\"}}"));
        assert_eq!(record.year, None);
        assert_eq!(record.value, None);
        assert_eq!(record.year_or_default(), 0);
        assert_eq!(record.value_or_default(), 0.0);

        let missing = parse(&format!("{{{BASE}}}"));
        assert_eq!(missing.year_or_default(), 0);
        assert_eq!(missing.value_or_default(), 0.0);
    }
}
