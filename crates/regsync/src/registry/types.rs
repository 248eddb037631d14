//! Wire types for the course registry API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One partner (platform or rightholder) row from the partner registries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    pub global_id: String,
    pub title: Option<String>,
    pub short_title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partner registry listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerList {
    pub rows: Vec<Partner>,
}

/// Indexes partner rows by their `global_id`.
pub fn partners_by_id(list: PartnerList) -> HashMap<String, Partner> {
    list.rows
        .into_iter()
        .map(|partner| (partner.global_id.clone(), partner))
        .collect()
}

/// One course row from the registry course listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSummary {
    pub global_id: String,
    pub title: String,
    pub institution_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Registry course listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseList {
    pub results: Vec<CourseSummary>,
}

/// Full detail record of one registry course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDetail {
    pub global_id: String,
    pub title: Option<String>,
    /// The course's location on the hosting platform; together with the
    /// title, the correlation key back to the platform course.
    pub external_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Filters for the registry course listing. The partner filter defaults to
/// this platform's configured id when unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseFilter {
    pub language: Option<String>,
    pub institution_id: Option<String>,
    pub partner_id: Option<String>,
    pub direction_id: Option<String>,
    pub activity_id: Option<String>,
}

/// Registration of one listener on a course.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipationRegistration {
    pub course_id: String,
    pub session_id: String,
    pub user_id: String,
    /// Enrollment moment, RFC 3339 with whole-second precision.
    pub enroll_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_end: Option<String>,
}

/// Cancellation of one listener's registration.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipationCancellation {
    pub course_id: String,
    pub session_id: String,
    pub user_id: String,
}

/// A graded checkpoint (subsection) result.
#[derive(Debug, Clone, Serialize)]
pub struct CheckpointResult {
    pub course_id: String,
    pub session_id: String,
    pub user_id: String,
    pub date: String,
    /// Percentage rating, rounded to two decimals.
    pub rating: f64,
    pub checkpoint_name: String,
    pub checkpoint_id: String,
}

/// Overall course progress.
#[derive(Debug, Clone, Serialize)]
pub struct CourseProgress {
    pub course_id: String,
    pub session_id: String,
    pub user_id: String,
    /// Percentage progress, rounded to two decimals.
    pub progress: f64,
}
