use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Backend-owned processing state. The client only observes it through re-fetches.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IndexingStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl IndexingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IndexingStatus::Pending => "pending",
            IndexingStatus::Processing => "processing",
            IndexingStatus::Completed => "completed",
            IndexingStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub file_name: String,
    pub file_size: u64,
    #[serde(with = "timestamp")]
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub indexing_status: IndexingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexing_error: Option<String>,
}

/// A fetchable location for a document's rendered content. Never the bytes themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentLocator {
    pub url: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        Self {
            content_type: content_type_for(&file_name).to_owned(),
            file_name,
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }
}

/// Maps a file name to the media type the backend serves it with.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("txt") => "text/plain",
        Some("html") => "text/html",
        _ => "application/octet-stream",
    }
}

/// Reads RFC 3339 timestamps, falling back to naive ISO-8601 which is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
}

pub mod timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp `{raw}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_document_with_naive_timestamp_and_missing_status() {
        let doc: Document = serde_json::from_value(json!({
            "id": "d1",
            "file_name": "contract.pdf",
            "file_size": 204800,
            "uploaded_at": "2024-03-01T10:15:30.123456"
        }))
        .expect("document");
        assert_eq!(doc.id.as_str(), "d1");
        assert_eq!(doc.indexing_status, IndexingStatus::Pending);
        assert_eq!(doc.uploaded_at.to_rfc3339(), "2024-03-01T10:15:30.123456+00:00");
    }

    #[test]
    fn reads_failed_status_with_error() {
        let doc: Document = serde_json::from_value(json!({
            "id": "d2",
            "file_name": "scan.docx",
            "file_size": 10,
            "uploaded_at": "2024-03-01T10:15:30Z",
            "indexing_status": "failed",
            "indexing_error": "unreadable"
        }))
        .expect("document");
        assert_eq!(doc.indexing_status, IndexingStatus::Failed);
        assert_eq!(doc.indexing_error.as_deref(), Some("unreadable"));
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        assert_eq!(content_type_for("notes.MD"), "application/octet-stream");
        assert_eq!(content_type_for("Report.PDF"), "application/pdf");
        assert_eq!(UploadFile::new("a.TXT", vec![1, 2]).extension().as_deref(), Some("txt"));
    }
}
