//! TTL cache for resolved course identities.
//!
//! Identity resolution does an unindexed full-catalog listing per lookup;
//! caching the result per platform course key bounds that cost as the
//! catalog grows. Entries expire on read.

use super::types::CourseDetail;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct CachedCourse {
    detail: CourseDetail,
    cached_at: Instant,
    ttl: Duration,
}

/// Thread-safe course-identity cache keyed by platform course key.
pub struct ResolveCache {
    entries: DashMap<String, CachedCourse>,
    default_ttl: Duration,
}

impl ResolveCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// Returns the cached detail record if present and not expired.
    pub fn get(&self, course_key: &str) -> Option<CourseDetail> {
        let entry = self.entries.get(course_key)?;
        if entry.cached_at.elapsed() < entry.ttl {
            Some(entry.detail.clone())
        } else {
            drop(entry);
            self.entries.remove(course_key);
            None
        }
    }

    pub fn insert(&self, course_key: String, detail: CourseDetail) {
        self.entries.insert(
            course_key,
            CachedCourse {
                detail,
                cached_at: Instant::now(),
                ttl: self.default_ttl,
            },
        );
    }

    /// Drops one course's cached identity (e.g. after its record changed).
    pub fn invalidate(&self, course_key: &str) {
        self.entries.remove(course_key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
