//! Live message source integration
//!
//! The live store (the chat feature's primary storage) is an external
//! collaborator. This module provides:
//! - A trait describing the four operations the engines consume
//! - An HTTP backend implementing it against the platform API

mod http_backend;

pub use http_backend::*;

use crate::error::Result;
use crate::model::{Message, SearchFilters};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Trait for live message source backends
#[async_trait]
pub trait LiveMessageSource: Send + Sync {
    /// Fetch all messages for a course older than the cutoff
    async fn fetch_messages(
        &self,
        course_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Message>>;

    /// Delegate a text query to the live store's own search
    async fn search_messages(
        &self,
        query: &str,
        course_id: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<Message>>;

    /// Delete messages older than the cutoff; returns the deleted count.
    /// The cutoff doubles as a safety bound: nothing newer is touched.
    async fn delete_messages(&self, course_id: &str, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Courses with at least `min_messages` messages older than cutoff
    async fn list_courses_needing_archival(
        &self,
        cutoff: DateTime<Utc>,
        min_messages: usize,
    ) -> Result<Vec<String>>;
}
