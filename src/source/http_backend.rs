//! HTTP backend for the live message source

use super::LiveMessageSource;
use crate::config::LiveSourceConfig;
use crate::error::{Error, Result};
use crate::model::{Message, SearchFilters};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    course_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    author_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
struct MessagesResponse {
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Deserialize)]
struct DeleteResponse {
    deleted_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct CoursesResponse {
    course_ids: Vec<String>,
}

/// Live message source over the platform's HTTP API.
///
/// Two clients with different timeouts: archival fetch/delete calls can
/// carry large payloads and get the long timeout, query-time search
/// stays on the short one.
pub struct HttpLiveSource {
    fetch_client: Client,
    search_client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpLiveSource {
    pub fn new(config: &LiveSourceConfig, token: Option<String>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let fetch_client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()?;
        let search_client = Client::builder()
            .timeout(Duration::from_secs(config.search_timeout_secs))
            .build()?;

        Ok(Self {
            fetch_client,
            search_client,
            base_url,
            token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid live source URL: {}", e)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| Error::LiveSource(e.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|e| Error::LiveSource(e.to_string()))?;
        response
            .json::<T>()
            .await
            .map_err(|e| Error::LiveSource(format!("malformed response: {}", e)))
    }
}

#[async_trait]
impl LiveMessageSource for HttpLiveSource {
    async fn fetch_messages(
        &self,
        course_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Message>> {
        let url = self.endpoint(&format!("/api/courses/{}/messages", course_id))?;
        let request = self
            .fetch_client
            .get(url)
            .query(&[("cutoff", cutoff.to_rfc3339())]);
        let parsed: MessagesResponse = self.send(request).await?;
        Ok(parsed.messages)
    }

    async fn search_messages(
        &self,
        query: &str,
        course_id: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<Message>> {
        let url = self.endpoint("/api/messages/search")?;
        let body = SearchRequest {
            query,
            course_id,
            author_id: filters.author_id.as_deref(),
            date_from: filters.date_from,
            date_to: filters.date_to,
        };
        let parsed: MessagesResponse = self.send(self.search_client.post(url).json(&body)).await?;
        Ok(parsed.messages)
    }

    async fn delete_messages(&self, course_id: &str, cutoff: DateTime<Utc>) -> Result<u64> {
        let url = self.endpoint(&format!("/api/courses/{}/messages", course_id))?;
        let request = self
            .fetch_client
            .delete(url)
            .query(&[("cutoff", cutoff.to_rfc3339())]);
        let parsed: DeleteResponse = self.send(request).await?;
        Ok(parsed.deleted_count)
    }

    async fn list_courses_needing_archival(
        &self,
        cutoff: DateTime<Utc>,
        min_messages: usize,
    ) -> Result<Vec<String>> {
        let url = self.endpoint("/api/archival/candidates")?;
        let request = self.fetch_client.get(url).query(&[
            ("cutoff", cutoff.to_rfc3339()),
            ("min_messages", min_messages.to_string()),
        ]);
        let parsed: CoursesResponse = self.send(request).await?;
        Ok(parsed.course_ids)
    }
}
