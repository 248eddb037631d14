//! Background task handlers: one per synchronized lifecycle event.
//!
//! Every handler starts with the same two lookups: the acting user's
//! external uid and the course's registry record. Either one missing is an
//! expected no-op, not an error: the user never linked an external
//! identity, or the course was never registered externally. Handlers issue
//! no retries; a transient registry failure drops the update.

use super::{LifecycleEvent, SyncContext, SyncJob};
use crate::registry::{
    resolve_course, CheckpointResult, CourseDetail, CourseProgress, ParticipationCancellation,
    ParticipationRegistration,
};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use tracing::{debug, warn};

/// Runs one queued job to completion.
pub async fn run(job: SyncJob, ctx: &SyncContext) {
    match job {
        SyncJob::Enrolled(event) => user_enrolled(event, ctx).await,
        SyncJob::Unenrolled(event) => user_unenrolled(event, ctx).await,
        SyncJob::SubsectionGraded(event) => subsection_graded(event, ctx).await,
        SyncJob::CourseGraded(event) => course_graded(event, ctx).await,
    }
}

async fn user_enrolled(event: LifecycleEvent, ctx: &SyncContext) {
    let Some((uid, course)) = resolve_links(ctx, &event).await else {
        return;
    };
    let registration = ParticipationRegistration {
        course_id: course.global_id,
        session_id: event.data.course_id.clone(),
        user_id: uid,
        enroll_date: whole_seconds(&event.timestamp),
        session_start: None,
        session_end: None,
    };
    ctx.registry.register_participation(&registration).await;
}

async fn user_unenrolled(event: LifecycleEvent, ctx: &SyncContext) {
    let Some((uid, course)) = resolve_links(ctx, &event).await else {
        return;
    };
    let cancellation = ParticipationCancellation {
        course_id: course.global_id,
        session_id: event.data.course_id.clone(),
        user_id: uid,
    };
    ctx.registry.cancel_participation(&cancellation).await;
}

async fn subsection_graded(event: LifecycleEvent, ctx: &SyncContext) {
    let Some((uid, course)) = resolve_links(ctx, &event).await else {
        return;
    };
    let (Some(earned), Some(possible)) = (event.data.earned, event.data.possible) else {
        warn!(name = %event.name, "graded event is missing earned/possible scores");
        return;
    };
    if possible <= 0.0 {
        warn!(name = %event.name, possible, "graded event has no possible score");
        return;
    }
    let Some(block_id) = event.data.block_id.clone() else {
        warn!(name = %event.name, "graded event names no block");
        return;
    };
    let Some(checkpoint_name) = ctx.platform.block_display_name(&block_id).await else {
        warn!(block_id = %block_id, "checkpoint display name unavailable, result dropped");
        return;
    };

    let result = CheckpointResult {
        course_id: course.global_id,
        session_id: event.data.course_id.clone(),
        user_id: uid,
        date: whole_seconds(&event.timestamp),
        rating: round2(earned / possible * 100.0),
        checkpoint_name,
        checkpoint_id: block_id,
    };
    ctx.registry.publish_checkpoint_result(&result).await;
}

async fn course_graded(event: LifecycleEvent, ctx: &SyncContext) {
    let Some((uid, course)) = resolve_links(ctx, &event).await else {
        return;
    };
    let Some(percent_grade) = event.data.percent_grade else {
        warn!(name = %event.name, "graded event is missing the percent grade");
        return;
    };

    let progress = CourseProgress {
        course_id: course.global_id,
        session_id: event.data.course_id.clone(),
        user_id: uid,
        progress: round2(percent_grade * 100.0),
    };
    ctx.registry.publish_course_progress(&progress).await;
}

/// Resolves the acting user's external uid and the course's registry
/// record. `None` is the expected silent no-op path.
async fn resolve_links(
    ctx: &SyncContext,
    event: &LifecycleEvent,
) -> Option<(String, CourseDetail)> {
    let user_id = event.data.user_id;
    let course_key = &event.data.course_id;

    let Some(uid) = ctx.platform.external_uid(user_id).await else {
        debug!(user_id, "user has no linked external identity");
        return None;
    };
    let Some(course) = resolve_course(
        ctx.registry.as_ref(),
        ctx.platform.as_ref(),
        &ctx.platform_base,
        &ctx.resolve_cache,
        course_key,
    )
    .await
    else {
        debug!(course_key = %course_key, "course is not registered externally");
        return None;
    };
    Some((uid, course))
}

/// RFC 3339 with microseconds truncated to whole seconds.
fn whole_seconds(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
