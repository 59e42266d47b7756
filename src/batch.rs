//! Archive batch file format
//!
//! Each batch is a single JSON document holding the message set plus
//! metadata. The checksum is a blake3 digest over the serialized
//! `messages` array, computed before the write and re-verified
//! identically on every read.

use crate::error::{Error, Result};
use crate::model::Message;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Persisted batch document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPayload {
    pub course_id: String,
    pub batch_index: i64,
    pub archived_at: DateTime<Utc>,
    pub message_count: usize,
    pub checksum: String,
    pub messages: Vec<Message>,
}

/// Checksum of a message set: blake3 over the serialized JSON array
pub fn message_checksum(messages: &[Message]) -> Result<String> {
    let bytes = serde_json::to_vec(messages)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Deterministic, date-partitioned object path for a batch:
/// `year/month/day/course/batch-INDEX-EPOCH.json`
pub fn batch_path(course_id: &str, batch_index: i64, archived_at: DateTime<Utc>) -> String {
    format!(
        "{:04}/{:02}/{:02}/{}/batch-{}-{}.json",
        archived_at.year(),
        archived_at.month(),
        archived_at.day(),
        course_id,
        batch_index,
        archived_at.timestamp(),
    )
}

/// Covered time range of a message set (earliest, latest created_at)
pub fn time_range(messages: &[Message]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let min = messages.iter().map(|m| m.created_at).min()?;
    let max = messages.iter().map(|m| m.created_at).max()?;
    Some((min, max))
}

impl BatchPayload {
    /// Build a payload for a message set, computing its checksum
    pub fn build(
        course_id: &str,
        batch_index: i64,
        archived_at: DateTime<Utc>,
        messages: Vec<Message>,
    ) -> Result<Self> {
        let checksum = message_checksum(&messages)?;
        Ok(Self {
            course_id: course_id.to_string(),
            batch_index,
            archived_at,
            message_count: messages.len(),
            checksum,
            messages,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode stored bytes and verify the embedded checksum against the
    /// one recorded at write time. Content that fails verification is
    /// untrustworthy and never used.
    pub fn decode_verified(bytes: &[u8], path: &str, expected_checksum: &str) -> Result<Self> {
        let payload: BatchPayload = serde_json::from_slice(bytes)?;
        let actual = message_checksum(&payload.messages)?;

        if actual != expected_checksum || payload.checksum != expected_checksum {
            return Err(Error::ChecksumMismatch {
                path: path.to_string(),
                expected: expected_checksum.to_string(),
                actual,
            });
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_message(id: &str, content: &str, ts: DateTime<Utc>) -> Message {
        Message {
            id: id.to_string(),
            course_id: "c1".to_string(),
            tenant_id: "t1".to_string(),
            author_id: "a1".to_string(),
            content: content.to_string(),
            created_at: ts,
        }
    }

    #[test]
    fn test_checksum_is_content_sensitive() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let a = vec![make_message("m1", "hello", ts)];
        let b = vec![make_message("m1", "hello!", ts)];

        assert_eq!(
            message_checksum(&a).unwrap(),
            message_checksum(&a).unwrap()
        );
        assert_ne!(
            message_checksum(&a).unwrap(),
            message_checksum(&b).unwrap()
        );
    }

    #[test]
    fn test_batch_path_is_date_partitioned() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let path = batch_path("course-9", 3, at);
        assert!(path.starts_with("2024/03/05/course-9/batch-3-"));
        assert!(path.ends_with(".json"));
        // Same inputs, same path
        assert_eq!(path, batch_path("course-9", 3, at));
    }

    #[test]
    fn test_encode_decode_roundtrip_verifies() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let messages = vec![
            make_message("m1", "first", ts),
            make_message("m2", "second", ts),
        ];
        let payload = BatchPayload::build("c1", 0, Utc::now(), messages).unwrap();
        let checksum = payload.checksum.clone();
        let bytes = payload.encode().unwrap();

        let decoded = BatchPayload::decode_verified(&bytes, "p", &checksum).unwrap();
        assert_eq!(decoded.message_count, 2);
        assert_eq!(decoded.messages[1].id, "m2");
    }

    #[test]
    fn test_corrupted_bytes_fail_verification() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let payload =
            BatchPayload::build("c1", 0, Utc::now(), vec![make_message("m1", "data", ts)])
                .unwrap();
        let checksum = payload.checksum.clone();
        let corrupted = String::from_utf8(payload.encode().unwrap())
            .unwrap()
            .replace("data", "DATA");

        let err = BatchPayload::decode_verified(corrupted.as_bytes(), "p", &checksum).unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_time_range() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let messages = vec![
            make_message("m1", "x", t2),
            make_message("m2", "y", t1),
        ];
        assert_eq!(time_range(&messages), Some((t1, t2)));
        assert_eq!(time_range(&[]), None);
    }
}
