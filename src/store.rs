use std::io::Read;
use std::path::Path;

use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{AssessmentResult, NewResult, School};

/// Read and write surface of the backend holding schools and results.
pub trait RecordStore {
    fn list_results(&self, school_id: Uuid) -> Result<Vec<AssessmentResult>, StoreError>;
    fn create_result(&mut self, fields: NewResult) -> Result<AssessmentResult, StoreError>;
    fn delete_result(&mut self, id: Uuid) -> Result<(), StoreError>;
    fn list_schools(&self) -> Result<Vec<School>, StoreError>;
}

/// A snapshot of the backend held in memory, typically loaded from CSV exports.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    schools: Vec<School>,
    results: Vec<AssessmentResult>,
}

impl MemoryStore {
    pub fn new(schools: Vec<School>, results: Vec<AssessmentResult>) -> Self {
        Self { schools, results }
    }

    pub fn load(results_csv: &Path, schools_csv: Option<&Path>) -> Result<Self, StoreError> {
        let results = read_results(csv::Reader::from_path(results_csv)?)?;
        let schools = match schools_csv {
            Some(path) => read_schools(csv::Reader::from_path(path)?)?,
            None => Vec::new(),
        };
        tracing::info!(
            results = results.len(),
            schools = schools.len(),
            "loaded record snapshot"
        );
        Ok(Self::new(schools, results))
    }

    pub fn all_results(&self) -> &[AssessmentResult] {
        &self.results
    }
}

impl RecordStore for MemoryStore {
    fn list_results(&self, school_id: Uuid) -> Result<Vec<AssessmentResult>, StoreError> {
        let mut rows: Vec<AssessmentResult> = self
            .results
            .iter()
            .filter(|result| result.school_id == school_id)
            .cloned()
            .collect();
        rows.sort_by_key(|result| result.year_or_default());
        Ok(rows)
    }

    fn create_result(&mut self, fields: NewResult) -> Result<AssessmentResult, StoreError> {
        validate(&fields)?;
        if !self.schools.is_empty() && !self.schools.iter().any(|s| s.id == fields.school_id) {
            return Err(StoreError::NotFound {
                entity: "school",
                id: fields.school_id,
            });
        }

        let created = AssessmentResult {
            id: Uuid::new_v4(),
            school_id: fields.school_id,
            assessment_name: fields.assessment_name.trim().to_string(),
            subject: fields.subject.trim().to_string(),
            grade_label: fields.grade_label.trim().to_string(),
            year: fields.year,
            value: fields.value,
        };
        self.results.push(created.clone());
        Ok(created)
    }

    fn delete_result(&mut self, id: Uuid) -> Result<(), StoreError> {
        let before = self.results.len();
        self.results.retain(|result| result.id != id);
        if self.results.len() == before {
            return Err(StoreError::NotFound {
                entity: "result",
                id,
            });
        }
        Ok(())
    }

    fn list_schools(&self) -> Result<Vec<School>, StoreError> {
        let mut schools = self.schools.clone();
        schools.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(schools)
    }
}

/// Every field of a new result must be filled in.
pub fn validate(fields: &NewResult) -> Result<(), StoreError> {
    let missing: Vec<&str> = [
        ("assessment_name", fields.assessment_name.trim().is_empty()),
        ("subject", fields.subject.trim().is_empty()),
        ("grade_label", fields.grade_label.trim().is_empty()),
        ("year", fields.year.is_none()),
        ("value", !fields.value.is_some_and(f64::is_finite)),
    ]
    .into_iter()
    .filter_map(|(name, is_missing)| is_missing.then_some(name))
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Validation(format!(
            "fill in every field (missing: {})",
            missing.join(", ")
        )))
    }
}

pub fn read_results<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<AssessmentResult>, StoreError> {
    let mut results = Vec::new();
    for row in reader.deserialize::<AssessmentResult>() {
        results.push(row?);
    }
    Ok(results)
}

pub fn read_schools<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<School>, StoreError> {
    let mut schools = Vec::new();
    for row in reader.deserialize::<School>() {
        schools.push(row?);
    }
    Ok(schools)
}
