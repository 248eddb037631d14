//! Lifecycle-event dispatch onto the background sync queue.
//!
//! The platform emits a stream of lifecycle events; exactly four of them
//! are synchronized to the registry. Matching events are wrapped into
//! [`SyncJob`]s and pushed onto a bounded queue, fire-and-forget; the
//! event source never learns about queue failures. A worker drains the
//! queue and spawns each job as an independent task, so a slow registry
//! call never blocks the queue. Ordering across concurrent events for the
//! same user/course is not guaranteed.

pub mod tasks;

use crate::platform::PlatformApi;
use crate::registry::{RegistryApi, ResolveCache};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};
use url::Url;

/// Event names that trigger synchronization. Anything else passes through
/// untouched.
pub const ENROLLMENT_ACTIVATED: &str = "course.enrollment.activated";
pub const ENROLLMENT_DEACTIVATED: &str = "course.enrollment.deactivated";
pub const SUBSECTION_GRADED: &str = "grades.subsection.calculated";
pub const COURSE_GRADED: &str = "grades.course.calculated";

/// An inbound platform event, payload unparsed. Only the four actionable
/// names ever get their payload interpreted; everything else passes
/// through untouched, whatever its shape.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEvent {
    pub name: String,
    pub timestamp: DateTime<FixedOffset>,
    pub data: Value,
}

/// An actionable lifecycle event with its payload parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleEvent {
    pub name: String,
    pub timestamp: DateTime<FixedOffset>,
    pub data: EventData,
}

/// Kind-specific event payload. Grade fields are only present on grade
/// events.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// Platform-internal user id; arrives as an integer or numeric string.
    #[serde(deserialize_with = "de_user_id")]
    pub user_id: i64,
    pub course_id: String,
    #[serde(default)]
    pub earned: Option<f64>,
    #[serde(default)]
    pub possible: Option<f64>,
    #[serde(default)]
    pub block_id: Option<String>,
    #[serde(default)]
    pub percent_grade: Option<f64>,
}

fn de_user_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom("user_id is not an integer")),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom("user_id is not numeric")),
        _ => Err(D::Error::custom(
            "user_id must be an integer or a numeric string",
        )),
    }
}

/// One queued unit of background work.
#[derive(Debug)]
pub enum SyncJob {
    Enrolled(LifecycleEvent),
    Unenrolled(LifecycleEvent),
    SubsectionGraded(LifecycleEvent),
    CourseGraded(LifecycleEvent),
}

/// Shared collaborators for background tasks.
pub struct SyncContext {
    pub registry: Arc<dyn RegistryApi>,
    pub platform: Arc<dyn PlatformApi>,
    pub platform_base: Url,
    pub resolve_cache: ResolveCache,
}

/// Filters inbound events and enqueues the matching ones.
#[derive(Clone)]
pub struct EventDispatcher {
    queue: mpsc::Sender<SyncJob>,
}

impl EventDispatcher {
    pub fn new(queue: mpsc::Sender<SyncJob>) -> Self {
        Self { queue }
    }

    /// Dispatches one event. Non-actionable names are ignored; a malformed
    /// payload or a failed queue submission is logged and swallowed.
    /// Delivery is at-most-once and the caller never learns of a failure.
    pub fn dispatch(&self, event: InboundEvent) {
        let InboundEvent {
            name,
            timestamp,
            data,
        } = event;
        let wrap = match name.as_str() {
            ENROLLMENT_ACTIVATED => SyncJob::Enrolled,
            ENROLLMENT_DEACTIVATED => SyncJob::Unenrolled,
            SUBSECTION_GRADED => SyncJob::SubsectionGraded,
            COURSE_GRADED => SyncJob::CourseGraded,
            _ => {
                debug!(name = %name, "event is not synchronized");
                return;
            }
        };
        let data: EventData = match serde_json::from_value(data) {
            Ok(data) => data,
            Err(e) => {
                error!(name = %name, error = %e, "event payload is malformed");
                return;
            }
        };
        let job = wrap(LifecycleEvent {
            name,
            timestamp,
            data,
        });
        if let Err(e) = self.queue.try_send(job) {
            error!(error = %e, "could not queue sync job");
        }
    }
}

/// Drains the job queue, spawning each job fire-and-forget.
pub struct SyncWorker {
    queue: mpsc::Receiver<SyncJob>,
    ctx: Arc<SyncContext>,
}

impl SyncWorker {
    pub async fn run(mut self) {
        while let Some(job) = self.queue.recv().await {
            let ctx = self.ctx.clone();
            tokio::spawn(async move {
                tasks::run(job, &ctx).await;
            });
        }
    }
}

/// Builds the dispatcher/worker pair around a bounded queue.
pub fn sync_queue(capacity: usize, ctx: Arc<SyncContext>) -> (EventDispatcher, SyncWorker) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventDispatcher::new(tx), SyncWorker { queue: rx, ctx })
}
