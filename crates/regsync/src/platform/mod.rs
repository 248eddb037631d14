//! Read-only collaborators inside the learning platform.
//!
//! The platform's catalog, block metadata, identity links and enrollment
//! store are existing systems this service only reads. They sit behind the
//! [`PlatformApi`] trait so the pipeline and the background tasks can be
//! driven against fakes in tests; [`LmsClient`] is the HTTP implementation
//! against the platform's internal REST surface.
//!
//! Every read degrades to `None` on timeout or decode failure. A missing
//! collaborator answer makes the surrounding operation "unavailable", it
//! never raises.

use crate::config::PlatformConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Request timeout for every platform read.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Catalog overview fields for one course.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseOverview {
    /// The platform's composite course identifier.
    pub id: String,
    pub display_name: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub enrollment_end: Option<DateTime<Utc>>,
    /// Image path, usually relative to the platform base URL.
    pub course_image_url: String,
    /// Weekly-effort hint, free-form.
    pub effort: Option<String>,
    pub course_video_url: Option<String>,
}

/// One enrollment of an externally-linked user.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Enrollment {
    pub user_id: i64,
    /// The user's identifier in the external registry.
    pub external_uid: String,
    pub created: DateTime<Utc>,
}

/// Read-only platform surface used by this service.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Catalog overview fields for a course, if the catalog knows it.
    async fn course_overview(&self, course_key: &str) -> Option<CourseOverview>;

    /// The rendered about page HTML for a course.
    async fn about_page(&self, course_key: &str) -> Option<String>;

    /// Display name of a graded block (subsection).
    async fn block_display_name(&self, block_id: &str) -> Option<String>;

    /// External-registry uid linked to a platform user, if the user has
    /// linked (and consented to) external reporting.
    async fn external_uid(&self, user_id: i64) -> Option<String>;

    /// Enrollments on a course, restricted to users with a linked external
    /// identity, ordered by creation time.
    async fn course_enrollments(&self, course_key: &str) -> Option<Vec<Enrollment>>;
}

/// HTTP client for the platform's internal REST surface.
pub struct LmsClient {
    http: Client,
    base: Url,
    identity_provider: String,
}

impl LmsClient {
    pub fn new(config: &PlatformConfig) -> anyhow::Result<Self> {
        let base = Url::parse(&config.base_url)?;
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base,
            identity_provider: config.identity_provider.clone(),
        })
    }

    /// Public base URL of the platform.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Option<Url> {
        match self.base.join(path) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(path, error = %e, "platform endpoint path is invalid");
                None
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Option<T> {
        let response = match self.http.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "platform request failed");
                return None;
            }
        };
        match response.json::<T>().await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(url = %url, error = %e, "platform response could not be decoded");
                None
            }
        }
    }
}

#[async_trait]
impl PlatformApi for LmsClient {
    async fn course_overview(&self, course_key: &str) -> Option<CourseOverview> {
        let url = self.endpoint(&format!("/api/courses/v1/courses/{course_key}"))?;
        self.get_json(url).await
    }

    async fn about_page(&self, course_key: &str) -> Option<String> {
        let url = self.endpoint(&format!("/courses/{course_key}/about"))?;
        let response = match self.http.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "about page fetch failed");
                return None;
            }
        };
        match response.text().await {
            Ok(html) => Some(html),
            Err(e) => {
                warn!(url = %url, error = %e, "about page body could not be read");
                None
            }
        }
    }

    async fn block_display_name(&self, block_id: &str) -> Option<String> {
        #[derive(Deserialize)]
        struct BlockInfo {
            display_name: String,
        }

        let mut url = self.endpoint(&format!("/api/courses/v1/blocks/{block_id}"))?;
        url.query_pairs_mut()
            .append_pair("requested_fields", "display_name");
        self.get_json::<BlockInfo>(url)
            .await
            .map(|block| block.display_name)
    }

    async fn external_uid(&self, user_id: i64) -> Option<String> {
        #[derive(Deserialize)]
        struct IdentityLink {
            uid: String,
        }

        let mut url = self.endpoint(&format!("/api/identity/v1/users/{user_id}"))?;
        url.query_pairs_mut()
            .append_pair("provider", &self.identity_provider);
        self.get_json::<IdentityLink>(url).await.map(|link| link.uid)
    }

    async fn course_enrollments(&self, course_key: &str) -> Option<Vec<Enrollment>> {
        let mut url = self.endpoint(&format!("/api/courses/v1/courses/{course_key}/enrollments"))?;
        url.query_pairs_mut()
            .append_pair("provider", &self.identity_provider);
        self.get_json(url).await
    }
}
