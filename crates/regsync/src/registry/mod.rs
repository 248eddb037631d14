//! The external course registry boundary.
//!
//! [`RegistryApi`] is the full registry surface; [`client::RegistryClient`]
//! implements it over HTTP, and tests drive the pipeline with fakes.
//! [`resolve_course`] correlates a platform course with its registry record.

pub mod cache;
pub mod client;
pub mod types;

pub use cache::ResolveCache;
pub use client::RegistryClient;
pub use types::{
    partners_by_id, CheckpointResult, CourseDetail, CourseFilter, CourseList, CourseProgress,
    CourseSummary, ParticipationCancellation, ParticipationRegistration, Partner, PartnerList,
};

use crate::course::about_url;
use crate::platform::PlatformApi;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Everything the registry can do for this platform. One method per
/// registry capability; `None` means "unavailable" (timeout or undecodable
/// response), never an error.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Connectivity check; returns the response status as a string.
    async fn connection_check(&self) -> String;

    /// All registered platforms.
    async fn platforms(&self) -> Option<PartnerList>;

    /// All registered rightholders.
    async fn rightholders(&self) -> Option<PartnerList>;

    /// Course listing, filtered; the partner filter defaults to this
    /// platform.
    async fn courses(&self, filter: &CourseFilter) -> Option<CourseList>;

    /// One course's full detail record.
    async fn course(&self, global_id: &str) -> Option<CourseDetail>;

    /// Publishes a new course record.
    async fn create_course(&self, course: Value) -> Option<Value>;

    /// Updates an existing course record.
    async fn update_course(&self, course: Value, global_id: &str) -> Option<Value>;

    /// Registers a listener on a course.
    async fn register_participation(
        &self,
        registration: &ParticipationRegistration,
    ) -> Option<Value>;

    /// Cancels a listener's registration.
    async fn cancel_participation(&self, cancellation: &ParticipationCancellation)
        -> Option<Value>;

    /// Publishes one graded checkpoint result.
    async fn publish_checkpoint_result(&self, result: &CheckpointResult) -> Option<Value>;

    /// Publishes overall course progress.
    async fn publish_course_progress(&self, progress: &CourseProgress) -> Option<Value>;
}

/// Resolves the registry record for a platform course.
///
/// The correlation key is exact equality of `title` (against the catalog
/// display name) confirmed by exact equality of `external_url` (against the
/// course's about-page URL) on the detail record. Both fields are assumed
/// globally unique and stable; a collision or URL-format drift makes the
/// course silently unresolvable. Resolutions are cached per course key.
pub async fn resolve_course(
    registry: &dyn RegistryApi,
    platform: &dyn PlatformApi,
    platform_base: &Url,
    cache: &ResolveCache,
    course_key: &str,
) -> Option<CourseDetail> {
    if let Some(hit) = cache.get(course_key) {
        return Some(hit);
    }

    let overview = platform.course_overview(course_key).await?;
    let external_url = about_url(platform_base, course_key);
    let catalog = registry.courses(&CourseFilter::default()).await?;

    for summary in &catalog.results {
        if summary.title != overview.display_name {
            continue;
        }
        let Some(detail) = registry.course(&summary.global_id).await else {
            // One candidate being unavailable should not hide the others.
            continue;
        };
        if detail.external_url.as_deref() == Some(external_url.as_str()) {
            cache.insert(course_key.to_string(), detail.clone());
            return Some(detail);
        }
    }

    debug!(course_key, "course has no registry record");
    None
}
