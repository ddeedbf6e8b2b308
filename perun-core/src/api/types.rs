//! Wire types exchanged with the analysis backend

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

/// Response of `POST /upload/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub batch_id: String,
}

/// Processing state of one uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Pending,
    #[serde(alias = "processing")]
    #[strum(to_string = "analysing", serialize = "processing")]
    Analysing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Whether results can be fetched for this job
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One job inside a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    pub job_id: String,
    pub filename: String,
    pub status: JobStatus,
}

/// Response of `GET /batch/{batch_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDetails {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub jobs: Vec<JobInfo>,
}

/// A flagged span as returned by the backend; `start` / `end` are textual
/// timestamps, not seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSpan {
    pub start: String,
    pub end: String,
    pub text: String,
    #[serde(default)]
    pub rationale: String,
    pub confidence: f32,
}

/// Response of `GET /batch/{batch_id}/{job_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAnalysisResult {
    pub audio_file_id: String,
    pub transcript_text: String,
    #[serde(default)]
    pub spans: Vec<AnalysisSpan>,
}

/// Human verdict on a piece of transcript text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FeedbackType {
    /// Confirm the text as a violation
    Positive,
    /// Reject a machine flag as a false positive
    Negative,
}

/// Body of `POST /feedback`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeedback {
    pub job_id: String,
    pub batch_id: String,
    pub text: String,
    pub feedback_type: FeedbackType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_confidence: Option<f32>,
}

/// A stored feedback record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub job_id: String,
    pub batch_id: String,
    pub text: String,
    pub feedback_type: FeedbackType,
    #[serde(default)]
    pub original_confidence: Option<f32>,
    /// Offset-less timestamps from the database are read as UTC
    #[serde(deserialize_with = "lenient_utc")]
    pub created_at: DateTime<Utc>,
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn lenient_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {:?}", raw)))
}

/// Response of `GET /feedback/batch/{batch_id}/summary`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    #[serde(default)]
    pub positive_examples: Vec<String>,
    #[serde(default)]
    pub negative_examples: Vec<String>,
}

/// Response of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub database: String,
}

/// A media file in memory, as served by `GET /batch/{batch_id}/{job_id}/file`
#[derive(Debug, Clone, PartialEq)]
pub struct MediaBlob {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl MediaBlob {
    /// Whether the payload looks like RIFF/WAVE audio
    pub fn is_wav(&self) -> bool {
        let by_type = self
            .content_type
            .as_deref()
            .is_some_and(|t| t.contains("wav"));
        let by_magic =
            self.bytes.len() >= 12 && &self.bytes[0..4] == b"RIFF" && &self.bytes[8..12] == b"WAVE";
        by_type || by_magic
    }

    /// File extension matching the content type, used as a decoder hint
    pub fn extension_hint(&self) -> Option<&'static str> {
        if self.is_wav() {
            return Some("wav");
        }
        let content_type = self.content_type.as_deref()?.to_ascii_lowercase();
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        let extension = match essence {
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/mp4" | "audio/x-m4a" | "audio/m4a" => "m4a",
            "video/mp4" => "mp4",
            "audio/aac" => "aac",
            "audio/flac" | "audio/x-flac" => "flac",
            "audio/ogg" | "video/ogg" => "ogg",
            "audio/webm" | "video/webm" => "webm",
            _ => return None,
        };
        Some(extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_job_status_accepts_legacy_names() {
        let job: JobInfo =
            serde_json::from_str(r#"{"job_id":"j","filename":"a.wav","status":"processing"}"#)
                .unwrap();
        assert_eq!(job.status, JobStatus::Analysing);

        let job: JobInfo =
            serde_json::from_str(r#"{"job_id":"j","filename":"a.wav","status":"queued"}"#).unwrap();
        assert_eq!(job.status, JobStatus::Unknown);
        assert_eq!(JobStatus::from_str("analysing").unwrap(), JobStatus::Analysing);
        assert_eq!(JobStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn test_new_feedback_omits_missing_confidence() {
        let body = NewFeedback {
            job_id: "j1".into(),
            batch_id: "b1".into(),
            text: "some words".into(),
            feedback_type: FeedbackType::Positive,
            original_confidence: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["feedback_type"], "positive");
        assert!(json.get("original_confidence").is_none());
    }

    #[test]
    fn test_wav_detection() {
        let mut bytes = b"RIFF\0\0\0\0WAVEfmt ".to_vec();
        bytes.extend_from_slice(&[0; 8]);
        let blob = MediaBlob {
            bytes,
            content_type: Some("application/octet-stream".into()),
        };
        assert!(blob.is_wav());
        let mp3 = MediaBlob {
            bytes: b"ID3\x03".to_vec(),
            content_type: Some("audio/mpeg".into()),
        };
        assert!(!mp3.is_wav());
        assert_eq!(mp3.extension_hint(), Some("mp3"));
        assert_eq!(blob.extension_hint(), Some("wav"));
    }

    #[test]
    fn test_extension_hint_ignores_parameters() {
        let blob = MediaBlob {
            bytes: Vec::new(),
            content_type: Some("Audio/MP4; codecs=mp4a.40.2".into()),
        };
        assert_eq!(blob.extension_hint(), Some("m4a"));
        let unknown = MediaBlob {
            bytes: Vec::new(),
            content_type: Some("application/octet-stream".into()),
        };
        assert_eq!(unknown.extension_hint(), None);
    }

    fn record_with(created_at: &str) -> serde_json::Result<FeedbackRecord> {
        serde_json::from_value(serde_json::json!({
            "id": "f1",
            "job_id": "j1",
            "batch_id": "b1",
            "text": "some words",
            "feedback_type": "negative",
            "created_at": created_at,
        }))
    }

    #[test]
    fn test_created_at_accepts_database_timestamps() {
        let expected = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        for raw in [
            "2024-05-01T12:00:00",
            "2024-05-01 12:00:00",
            "2024-05-01T12:00:00.000",
            "2024-05-01T12:00:00Z",
            "2024-05-01T14:00:00+02:00",
        ] {
            assert_eq!(record_with(raw).unwrap().created_at, expected, "{}", raw);
        }
        assert!(record_with("yesterday").is_err());
    }
}
