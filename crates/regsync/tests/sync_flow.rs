//! End-to-end tests of event dispatch, identity resolution and the
//! background task handlers, driven against recording fakes.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use regsync::platform::{CourseOverview, Enrollment, PlatformApi};
use regsync::registry::{
    resolve_course, CheckpointResult, CourseDetail, CourseFilter, CourseList, CourseProgress,
    CourseSummary, ParticipationCancellation, ParticipationRegistration, PartnerList,
    RegistryApi, ResolveCache,
};
use regsync::sync::{
    sync_queue, tasks, InboundEvent, LifecycleEvent, SyncContext, SyncJob, ENROLLMENT_ACTIVATED,
};

const COURSE_KEY: &str = "course-v1:Org+X+2024";
const ABOUT_URL: &str = "https://lms.example.org/courses/course-v1:Org+X+2024/about";

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Register {
        course_id: String,
        user_id: String,
        enroll_date: String,
    },
    Cancel {
        course_id: String,
        user_id: String,
    },
    Checkpoint {
        course_id: String,
        rating: f64,
        checkpoint_name: String,
        checkpoint_id: String,
    },
    Progress {
        course_id: String,
        progress: f64,
    },
}

/// Registry fake that records every mutation call.
struct RecordingRegistry {
    catalog: Vec<CourseSummary>,
    details: HashMap<String, CourseDetail>,
    calls: Mutex<Vec<Call>>,
    listings: AtomicUsize,
}

impl RecordingRegistry {
    fn new(catalog: Vec<CourseSummary>, details: HashMap<String, CourseDetail>) -> Self {
        Self {
            catalog,
            details,
            calls: Mutex::new(Vec::new()),
            listings: AtomicUsize::new(0),
        }
    }

    fn empty() -> Self {
        Self::new(Vec::new(), HashMap::new())
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RegistryApi for RecordingRegistry {
    async fn connection_check(&self) -> String {
        "200".to_string()
    }

    async fn platforms(&self) -> Option<PartnerList> {
        None
    }

    async fn rightholders(&self) -> Option<PartnerList> {
        None
    }

    async fn courses(&self, _filter: &CourseFilter) -> Option<CourseList> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        Some(CourseList {
            results: self.catalog.clone(),
        })
    }

    async fn course(&self, global_id: &str) -> Option<CourseDetail> {
        self.details.get(global_id).cloned()
    }

    async fn create_course(&self, _course: Value) -> Option<Value> {
        Some(json!({}))
    }

    async fn update_course(&self, _course: Value, _global_id: &str) -> Option<Value> {
        Some(json!({}))
    }

    async fn register_participation(
        &self,
        registration: &ParticipationRegistration,
    ) -> Option<Value> {
        self.record(Call::Register {
            course_id: registration.course_id.clone(),
            user_id: registration.user_id.clone(),
            enroll_date: registration.enroll_date.clone(),
        });
        Some(json!([{"status": "ok"}]))
    }

    async fn cancel_participation(
        &self,
        cancellation: &ParticipationCancellation,
    ) -> Option<Value> {
        self.record(Call::Cancel {
            course_id: cancellation.course_id.clone(),
            user_id: cancellation.user_id.clone(),
        });
        Some(json!([{"status": "ok"}]))
    }

    async fn publish_checkpoint_result(&self, result: &CheckpointResult) -> Option<Value> {
        self.record(Call::Checkpoint {
            course_id: result.course_id.clone(),
            rating: result.rating,
            checkpoint_name: result.checkpoint_name.clone(),
            checkpoint_id: result.checkpoint_id.clone(),
        });
        Some(json!([{"status": "ok"}]))
    }

    async fn publish_course_progress(&self, progress: &CourseProgress) -> Option<Value> {
        self.record(Call::Progress {
            course_id: progress.course_id.clone(),
            progress: progress.progress,
        });
        Some(json!([{"status": "ok"}]))
    }
}

/// Platform fake with a configurable identity link and block names.
struct FakePlatform {
    uid: Option<String>,
    display_name: String,
    block_names: HashMap<String, String>,
}

impl FakePlatform {
    fn linked(uid: &str) -> Self {
        Self {
            uid: Some(uid.to_string()),
            display_name: "Intro to X".to_string(),
            block_names: HashMap::new(),
        }
    }

    fn unlinked() -> Self {
        Self {
            uid: None,
            display_name: "Intro to X".to_string(),
            block_names: HashMap::new(),
        }
    }

    fn with_block(mut self, block_id: &str, display_name: &str) -> Self {
        self.block_names
            .insert(block_id.to_string(), display_name.to_string());
        self
    }
}

#[async_trait]
impl PlatformApi for FakePlatform {
    async fn course_overview(&self, course_key: &str) -> Option<CourseOverview> {
        Some(CourseOverview {
            id: course_key.to_string(),
            display_name: self.display_name.clone(),
            start: None,
            end: None,
            enrollment_end: None,
            course_image_url: "/asset/x.png".to_string(),
            effort: None,
            course_video_url: None,
        })
    }

    async fn about_page(&self, _course_key: &str) -> Option<String> {
        None
    }

    async fn block_display_name(&self, block_id: &str) -> Option<String> {
        self.block_names.get(block_id).cloned()
    }

    async fn external_uid(&self, _user_id: i64) -> Option<String> {
        self.uid.clone()
    }

    async fn course_enrollments(&self, _course_key: &str) -> Option<Vec<Enrollment>> {
        Some(Vec::new())
    }
}

fn summary(global_id: &str, title: &str) -> CourseSummary {
    CourseSummary {
        global_id: global_id.to_string(),
        title: title.to_string(),
        institution_id: None,
        extra: Map::new(),
    }
}

fn detail(global_id: &str, title: &str, external_url: &str) -> CourseDetail {
    CourseDetail {
        global_id: global_id.to_string(),
        title: Some(title.to_string()),
        external_url: Some(external_url.to_string()),
        extra: Map::new(),
    }
}

/// A registry knowing exactly one course that matches the platform course.
fn matching_registry() -> RecordingRegistry {
    RecordingRegistry::new(
        vec![summary("g-1", "Intro to X")],
        HashMap::from([("g-1".to_string(), detail("g-1", "Intro to X", ABOUT_URL))]),
    )
}

fn context(registry: Arc<RecordingRegistry>, platform: Arc<FakePlatform>) -> SyncContext {
    SyncContext {
        registry,
        platform,
        platform_base: Url::parse("https://lms.example.org").unwrap(),
        resolve_cache: ResolveCache::new(Duration::from_secs(60)),
    }
}

fn event(name: &str, data: Value) -> LifecycleEvent {
    serde_json::from_value(json!({
        "name": name,
        "timestamp": "2024-09-01T10:30:45.123456+00:00",
        "data": data,
    }))
    .unwrap()
}

fn enrollment_data() -> Value {
    json!({"user_id": 7, "course_id": COURSE_KEY})
}

#[tokio::test]
async fn test_enrollment_registers_participation() {
    let registry = Arc::new(matching_registry());
    let platform = Arc::new(FakePlatform::linked("ext-7"));
    let ctx = context(registry.clone(), platform);

    tasks::run(
        SyncJob::Enrolled(event("course.enrollment.activated", enrollment_data())),
        &ctx,
    )
    .await;

    assert_eq!(
        registry.calls(),
        vec![Call::Register {
            course_id: "g-1".to_string(),
            user_id: "ext-7".to_string(),
            // Microseconds are truncated from the event timestamp.
            enroll_date: "2024-09-01T10:30:45+00:00".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_unlinked_user_touches_nothing() {
    let registry = Arc::new(matching_registry());
    let platform = Arc::new(FakePlatform::unlinked());
    let ctx = context(registry.clone(), platform);

    tasks::run(
        SyncJob::Enrolled(event("course.enrollment.activated", enrollment_data())),
        &ctx,
    )
    .await;

    assert!(registry.calls().is_empty());
    // Not even a catalog listing happened.
    assert_eq!(registry.listings.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unregistered_course_is_a_noop() {
    let registry = Arc::new(RecordingRegistry::empty());
    let platform = Arc::new(FakePlatform::linked("ext-7"));
    let ctx = context(registry.clone(), platform);

    tasks::run(
        SyncJob::Enrolled(event("course.enrollment.activated", enrollment_data())),
        &ctx,
    )
    .await;

    assert!(registry.calls().is_empty());
}

#[tokio::test]
async fn test_unenrollment_cancels_participation() {
    let registry = Arc::new(matching_registry());
    let platform = Arc::new(FakePlatform::linked("ext-7"));
    let ctx = context(registry.clone(), platform);

    tasks::run(
        SyncJob::Unenrolled(event("course.enrollment.deactivated", enrollment_data())),
        &ctx,
    )
    .await;

    assert_eq!(
        registry.calls(),
        vec![Call::Cancel {
            course_id: "g-1".to_string(),
            user_id: "ext-7".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_subsection_grade_publishes_two_decimal_rating() {
    let registry = Arc::new(matching_registry());
    let platform = Arc::new(FakePlatform::linked("ext-7").with_block("b-1", "Week 1 test"));
    let ctx = context(registry.clone(), platform);

    tasks::run(
        SyncJob::SubsectionGraded(event(
            "grades.subsection.calculated",
            json!({
                "user_id": 7,
                "course_id": COURSE_KEY,
                "earned": 45.0,
                "possible": 60.0,
                "block_id": "b-1",
            }),
        )),
        &ctx,
    )
    .await;

    assert_eq!(
        registry.calls(),
        vec![Call::Checkpoint {
            course_id: "g-1".to_string(),
            rating: 75.0,
            checkpoint_name: "Week 1 test".to_string(),
            checkpoint_id: "b-1".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_unknown_block_drops_the_result() {
    let registry = Arc::new(matching_registry());
    let platform = Arc::new(FakePlatform::linked("ext-7"));
    let ctx = context(registry.clone(), platform);

    tasks::run(
        SyncJob::SubsectionGraded(event(
            "grades.subsection.calculated",
            json!({
                "user_id": 7,
                "course_id": COURSE_KEY,
                "earned": 45.0,
                "possible": 60.0,
                "block_id": "b-unknown",
            }),
        )),
        &ctx,
    )
    .await;

    assert!(registry.calls().is_empty());
}

#[tokio::test]
async fn test_course_grade_publishes_progress() {
    let registry = Arc::new(matching_registry());
    let platform = Arc::new(FakePlatform::linked("ext-7"));
    let ctx = context(registry.clone(), platform);

    tasks::run(
        SyncJob::CourseGraded(event(
            "grades.course.calculated",
            json!({"user_id": 7, "course_id": COURSE_KEY, "percent_grade": 0.856}),
        )),
        &ctx,
    )
    .await;

    assert_eq!(
        registry.calls(),
        vec![Call::Progress {
            course_id: "g-1".to_string(),
            progress: 85.6,
        }]
    );
}

#[tokio::test]
async fn test_resolution_needs_title_and_url_match() {
    // Two courses share the title; only one sits at the platform URL.
    let registry = RecordingRegistry::new(
        vec![summary("g-1", "Intro to X"), summary("g-2", "Intro to X")],
        HashMap::from([
            (
                "g-1".to_string(),
                detail("g-1", "Intro to X", "https://elsewhere.example.org/courses/other/about"),
            ),
            ("g-2".to_string(), detail("g-2", "Intro to X", ABOUT_URL)),
        ]),
    );
    let platform = FakePlatform::linked("ext-7");
    let base = Url::parse("https://lms.example.org").unwrap();
    let cache = ResolveCache::new(Duration::from_secs(60));

    let resolved = resolve_course(&registry, &platform, &base, &cache, COURSE_KEY)
        .await
        .unwrap();
    assert_eq!(resolved.global_id, "g-2");
}

#[tokio::test]
async fn test_resolution_title_match_alone_is_not_found() {
    let registry = RecordingRegistry::new(
        vec![summary("g-1", "Intro to X"), summary("g-2", "Intro to X")],
        HashMap::from([
            (
                "g-1".to_string(),
                detail("g-1", "Intro to X", "https://elsewhere.example.org/a/about"),
            ),
            (
                "g-2".to_string(),
                detail("g-2", "Intro to X", "https://elsewhere.example.org/b/about"),
            ),
        ]),
    );
    let platform = FakePlatform::linked("ext-7");
    let base = Url::parse("https://lms.example.org").unwrap();
    let cache = ResolveCache::new(Duration::from_secs(60));

    assert!(resolve_course(&registry, &platform, &base, &cache, COURSE_KEY)
        .await
        .is_none());
}

#[tokio::test]
async fn test_resolution_is_cached() {
    let registry = matching_registry();
    let platform = FakePlatform::linked("ext-7");
    let base = Url::parse("https://lms.example.org").unwrap();
    let cache = ResolveCache::new(Duration::from_secs(60));

    for _ in 0..3 {
        let resolved = resolve_course(&registry, &platform, &base, &cache, COURSE_KEY)
            .await
            .unwrap();
        assert_eq!(resolved.global_id, "g-1");
    }

    assert_eq!(registry.listings.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dispatched_event_reaches_the_registry() {
    let registry = Arc::new(matching_registry());
    let platform = Arc::new(FakePlatform::linked("ext-7"));
    let ctx = Arc::new(context(registry.clone(), platform));

    let (dispatcher, worker) = sync_queue(8, ctx);
    let worker_task = tokio::spawn(worker.run());

    let inbound: InboundEvent = serde_json::from_value(json!({
        "name": ENROLLMENT_ACTIVATED,
        "timestamp": "2024-09-01T10:30:45.123456+00:00",
        "data": enrollment_data(),
    }))
    .unwrap();
    dispatcher.dispatch(inbound);
    // The event source is long gone by the time the job runs.
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(registry.calls().len(), 1);
    worker_task.abort();
}
