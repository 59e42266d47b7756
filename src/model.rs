//! Shared value types exchanged with the live message source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single chat message as the live store hands it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub course_id: String,
    pub tenant_id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Optional filters applied to a search query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub author_id: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.author_id.is_none() && self.date_from.is_none() && self.date_to.is_none()
    }

    /// Stable string form used as part of cache keys.
    pub fn cache_key_part(&self) -> String {
        format!(
            "{}:{}:{}",
            self.author_id.as_deref().unwrap_or("-"),
            self.date_from.map(|d| d.to_rfc3339()).unwrap_or_default(),
            self.date_to.map(|d| d.to_rfc3339()).unwrap_or_default(),
        )
    }
}
