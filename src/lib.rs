pub mod aggregate;
pub mod error;
pub mod geometry;
pub mod models;
pub mod normalize;
pub mod refresh;
pub mod report;
pub mod scale;
pub mod series;
pub mod store;

pub use error::StoreError;
pub use models::{AssessmentResult, KpiSnapshot, ResultGroup, ScaledPoint, Scope};
pub use series::SeriesBuilder;
