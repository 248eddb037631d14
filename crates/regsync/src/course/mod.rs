//! Assembly of canonical course records.
//!
//! A record merges two platform-internal sources: the catalog overview
//! (identifiers, dates, image, effort, promo video) and the marked-up
//! "about" page (everything the registry moderates). The about page is the
//! authoritative source: its values win on key collision, and without it
//! no record is produced at all, since required moderated fields live only
//! there.

pub mod error;
pub mod fields;

pub use error::CourseDataError;
pub use fields::{CoercionContext, CourseRecord, RawValue};

use crate::extract::{extract_marked_fragments, extract_teacher_blocks};
use crate::platform::{CourseOverview, PlatformApi};
use regex::Regex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static COURSE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*/courses/([\w:+-]+)(?:/.*)?$").unwrap());

/// Extracts the platform course key from a course URL
/// (`…/courses/<key>[/…]`).
pub fn course_key_from_url(course_url: &str) -> Option<String> {
    COURSE_KEY_RE
        .captures(course_url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// The public URL of a course's about page on the platform.
pub fn about_url(platform_base: &Url, course_key: &str) -> String {
    format!(
        "{}/courses/{}/about",
        platform_base.as_str().trim_end_matches('/'),
        course_key
    )
}

/// Builds the canonical course record for a platform course.
///
/// Returns `Ok(None)` when the course info is unavailable: the catalog does
/// not know the course, the about page cannot be fetched within the
/// timeout, or the page carries no marked content. Overview-only data is
/// never returned alone. Data-shape errors in the page content are fatal.
pub async fn get_course_info(
    platform: &dyn PlatformApi,
    platform_base: &Url,
    course_key: &str,
) -> Result<Option<CourseRecord>, CourseDataError> {
    let Some(overview) = platform.course_overview(course_key).await else {
        debug!(course_key, "catalog overview unavailable");
        return Ok(None);
    };
    let Some(html) = platform.about_page(course_key).await else {
        debug!(course_key, "about page unavailable");
        return Ok(None);
    };

    let fragments = extract_marked_fragments(&html);
    let teachers = extract_teacher_blocks(&html);
    if fragments.is_empty() && teachers.is_empty() {
        debug!(course_key, "about page carries no marked content");
        return Ok(None);
    }

    // About-page values win on key collision.
    let mut raw = overview_raw_map(&overview, platform_base, course_key)?;
    for (marker, value) in fragments {
        raw.insert(marker, RawValue::Fragments(value));
    }
    raw.insert("teachers".to_string(), RawValue::Teachers(teachers));

    let ctx = CoercionContext {
        platform_base: platform_base.clone(),
    };
    let mut record = CourseRecord::new();
    for (name, value) in raw {
        // Keys with no matching field are silently ignored.
        record.assign(&name, value, &ctx)?;
    }
    Ok(Some(record))
}

/// Converts catalog overview fields into raw record values, keyed by the
/// registry's field names. Dates are ISO calendar dates with no time
/// component; the image URL is made absolute.
fn overview_raw_map(
    overview: &CourseOverview,
    platform_base: &Url,
    course_key: &str,
) -> Result<HashMap<String, RawValue>, CourseDataError> {
    let image = platform_base
        .join(&overview.course_image_url)
        .map_err(|e| CourseDataError::BadImageUrl {
            path: overview.course_image_url.clone(),
            message: e.to_string(),
        })?;

    let date = |value: &Option<chrono::DateTime<chrono::Utc>>| match value {
        Some(moment) => json!(moment.date_naive().to_string()),
        None => serde_json::Value::Null,
    };

    let mut raw = HashMap::new();
    raw.insert("sessionid".to_string(), RawValue::Scalar(json!(overview.id)));
    raw.insert(
        "title".to_string(),
        RawValue::Scalar(json!(overview.display_name)),
    );
    raw.insert("started_at".to_string(), RawValue::Scalar(date(&overview.start)));
    raw.insert("finished_at".to_string(), RawValue::Scalar(date(&overview.end)));
    raw.insert(
        "enrollment_finished_at".to_string(),
        RawValue::Scalar(date(&overview.enrollment_end)),
    );
    raw.insert("image".to_string(), RawValue::Scalar(json!(image.as_str())));
    raw.insert(
        "external_url".to_string(),
        RawValue::Scalar(json!(about_url(platform_base, course_key))),
    );
    raw.insert(
        "hours_per_week".to_string(),
        RawValue::Scalar(overview.effort.as_deref().map_or(serde_json::Value::Null, |e| json!(e))),
    );
    raw.insert(
        "promo_url".to_string(),
        RawValue::Scalar(
            overview
                .course_video_url
                .as_deref()
                .map_or(serde_json::Value::Null, |u| json!(u)),
        ),
    );
    Ok(raw)
}
