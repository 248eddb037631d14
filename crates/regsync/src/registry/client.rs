//! HTTP client for the course registry API.
//!
//! Every operation is a single stateless request with a 5-second timeout.
//! A timed-out request or an undecodable response yields `None`
//! ("unavailable"); transient registry failures never raise past this
//! boundary. Mutating calls log their outbound payload and the registry's
//! response at info level: that trail is a compliance requirement, not
//! debug output.

use super::types::{
    CheckpointResult, CourseDetail, CourseFilter, CourseList, CourseProgress,
    ParticipationCancellation, ParticipationRegistration, PartnerList,
};
use super::RegistryApi;
use crate::config::RegistryConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

/// Header identifying this partner to the registry (`X-CN-UUID` on the
/// wire; header names are case-insensitive).
const PARTNER_HEADER: HeaderName = HeaderName::from_static("x-cn-uuid");

/// Request timeout for every registry call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const CHECK_PATH: &str = "/api/v2/connections/check";
const PLATFORMS_PATH: &str = "/api/v2/registry/partners/platforms";
const RIGHTHOLDERS_PATH: &str = "/api/v2/registry/partners/rightholders";
const COURSES_PATH: &str = "/api/v2/registry/courses";
const PARTICIPATION_PATH: &str = "/api/v2/courses/participation";
const RESULTS_PATH: &str = "/api/v2/courses/results";
const PROGRESS_PATH: &str = "/api/v2/courses/results/progress";

/// Stateless HTTP client for the registry.
pub struct RegistryClient {
    http: Client,
    base_url: String,
    partner_id: String,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(PARTNER_HEADER, HeaderValue::from_str(&config.partner_uuid)?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            partner_id: config.partner_id.clone(),
        })
    }

    pub fn partner_id(&self) -> &str {
        &self.partner_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Option<T> {
        let url = self.url(path);
        let response = match self.http.get(&url).query(params).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "registry request failed");
                return None;
            }
        };
        match response.json::<T>().await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(url = %url, error = %e, "registry response could not be decoded");
                None
            }
        }
    }

    /// Sends a mutating request, logging payload and response for audit.
    async fn send_audited(
        &self,
        action: &'static str,
        method: Method,
        path: &str,
        payload: &Value,
    ) -> Option<Value> {
        info!(action, payload = %payload, "registry request");
        let url = self.url(path);
        let response = match self.http.request(method, &url).json(payload).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(action, url = %url, error = %e, "registry request failed");
                return None;
            }
        };
        match response.json::<Value>().await {
            Ok(value) => {
                info!(action, response = %value, "registry response");
                Some(value)
            }
            Err(e) => {
                warn!(action, url = %url, error = %e, "registry response could not be decoded");
                None
            }
        }
    }
}

/// Wraps a course object the way registry create/update calls expect.
fn wrap_package(partner_id: &str, course: Value) -> Value {
    json!({
        "partner_id": partner_id,
        "package": { "items": [course] },
    })
}

/// Injects the registry course id into a course object before an update.
fn with_global_id(mut course: Value, global_id: &str) -> Value {
    if let Value::Object(fields) = &mut course {
        fields.insert("id".to_string(), json!(global_id));
    }
    course
}

#[async_trait]
impl RegistryApi for RegistryClient {
    async fn connection_check(&self) -> String {
        match self.http.get(self.url(CHECK_PATH)).send().await {
            Ok(response) => response.status().as_u16().to_string(),
            Err(e) if e.is_timeout() => "Connection timeout".to_string(),
            Err(e) => {
                warn!(error = %e, "registry connection check failed");
                "Connection error".to_string()
            }
        }
    }

    async fn platforms(&self) -> Option<PartnerList> {
        self.get_json(PLATFORMS_PATH, &[]).await
    }

    async fn rightholders(&self) -> Option<PartnerList> {
        self.get_json(RIGHTHOLDERS_PATH, &[]).await
    }

    async fn courses(&self, filter: &CourseFilter) -> Option<CourseList> {
        let partner_id = filter.partner_id.as_deref().unwrap_or(&self.partner_id);
        let mut params = vec![("partner_id", partner_id)];
        if let Some(language) = filter.language.as_deref() {
            params.push(("language", language));
        }
        if let Some(institution_id) = filter.institution_id.as_deref() {
            params.push(("institution_id", institution_id));
        }
        if let Some(direction_id) = filter.direction_id.as_deref() {
            params.push(("direction_id", direction_id));
        }
        if let Some(activity_id) = filter.activity_id.as_deref() {
            params.push(("activity_id", activity_id));
        }
        self.get_json(COURSES_PATH, &params).await
    }

    async fn course(&self, global_id: &str) -> Option<CourseDetail> {
        self.get_json(&format!("{COURSES_PATH}/{global_id}"), &[]).await
    }

    async fn create_course(&self, course: Value) -> Option<Value> {
        let payload = wrap_package(&self.partner_id, course);
        self.send_audited("create_course", Method::POST, COURSES_PATH, &payload)
            .await
    }

    async fn update_course(&self, course: Value, global_id: &str) -> Option<Value> {
        let payload = wrap_package(&self.partner_id, with_global_id(course, global_id));
        self.send_audited("update_course", Method::PUT, COURSES_PATH, &payload)
            .await
    }

    async fn register_participation(
        &self,
        registration: &ParticipationRegistration,
    ) -> Option<Value> {
        let payload = json!([registration]);
        self.send_audited(
            "register_participation",
            Method::POST,
            PARTICIPATION_PATH,
            &payload,
        )
        .await
    }

    async fn cancel_participation(
        &self,
        cancellation: &ParticipationCancellation,
    ) -> Option<Value> {
        let payload = json!([cancellation]);
        self.send_audited(
            "cancel_participation",
            Method::DELETE,
            PARTICIPATION_PATH,
            &payload,
        )
        .await
    }

    async fn publish_checkpoint_result(&self, result: &CheckpointResult) -> Option<Value> {
        let payload = json!([result]);
        self.send_audited(
            "publish_checkpoint_result",
            Method::POST,
            RESULTS_PATH,
            &payload,
        )
        .await
    }

    async fn publish_course_progress(&self, progress: &CourseProgress) -> Option<Value> {
        let payload = json!([progress]);
        self.send_audited(
            "publish_course_progress",
            Method::POST,
            PROGRESS_PATH,
            &payload,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_package() {
        let payload = wrap_package("platform-42", json!({"title": "Intro to X"}));
        assert_eq!(
            payload,
            json!({
                "partner_id": "platform-42",
                "package": { "items": [{"title": "Intro to X"}] },
            })
        );
    }

    #[test]
    fn test_update_injects_global_id() {
        let course = with_global_id(json!({"title": "Intro to X"}), "g-7");
        assert_eq!(course, json!({"title": "Intro to X", "id": "g-7"}));
    }

    #[test]
    fn test_update_overwrites_stale_id() {
        let course = with_global_id(json!({"id": "old", "title": "T"}), "g-7");
        assert_eq!(course["id"], json!("g-7"));
    }
}
