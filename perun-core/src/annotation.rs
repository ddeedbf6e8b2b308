//! Labeled ranges over a transcript

use crate::api::{AnalysisSpan, FeedbackRecord, FeedbackType};
use crate::timestamp;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use strum::Display;
use tracing::debug;

/// Transcript of one job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    /// Seconds; known once the media element reported its metadata
    pub duration: Option<f64>,
}

impl Transcript {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Who produced an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AnnotationSource {
    Machine,
    HumanPositive,
    HumanNegative,
}

impl AnnotationSource {
    pub fn is_human(&self) -> bool {
        !matches!(self, AnnotationSource::Machine)
    }
}

impl From<FeedbackType> for AnnotationSource {
    fn from(value: FeedbackType) -> Self {
        match value {
            FeedbackType::Positive => AnnotationSource::HumanPositive,
            FeedbackType::Negative => AnnotationSource::HumanNegative,
        }
    }
}

/// Severity shown in segment lists and exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Flag {
    Neutral,
    Mild,
    Extremist,
}

/// A labeled range within a transcript, addressed by its text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSpan {
    /// Exact substring used to locate the span
    pub text: String,
    /// Byte offsets into the transcript, when known at ingestion time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offsets: Option<Range<usize>>,
    /// Media start, seconds
    pub start: Option<f64>,
    /// Media end, seconds
    pub end: Option<f64>,
    pub source: AnnotationSource,
    /// Present only for machine spans, in `[0, 1]`
    pub confidence: Option<f32>,
    pub rationale: Option<String>,
}

impl AnnotationSpan {
    /// A machine span without timing, mostly useful in tests and tooling
    pub fn machine(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            offsets: None,
            start: None,
            end: None,
            source: AnnotationSource::Machine,
            confidence: Some(confidence),
            rationale: None,
        }
    }

    /// A human-feedback span
    pub fn human(text: impl Into<String>, feedback_type: FeedbackType) -> Self {
        Self {
            text: text.into(),
            offsets: None,
            start: None,
            end: None,
            source: feedback_type.into(),
            confidence: None,
            rationale: None,
        }
    }

    pub fn with_times(mut self, start: f64, end: f64) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_offsets(mut self, offsets: Range<usize>) -> Self {
        self.offsets = Some(offsets);
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    pub fn is_machine(&self) -> bool {
        self.source == AnnotationSource::Machine
    }

    /// Start time used for ordering; untimed spans sort last
    pub fn sort_key(&self) -> f64 {
        self.start.unwrap_or(f64::INFINITY)
    }

    /// Severity derived from the rationale wording
    pub fn flag(&self) -> Flag {
        match self.source {
            AnnotationSource::HumanNegative => Flag::Neutral,
            AnnotationSource::HumanPositive => Flag::Extremist,
            AnnotationSource::Machine => {
                let rationale = self
                    .rationale
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase();
                if rationale.contains("mild") || rationale.contains("minor") {
                    Flag::Mild
                } else {
                    Flag::Extremist
                }
            }
        }
    }

    /// Whether `seconds` falls within the span's media interval
    pub fn contains_time(&self, seconds: f64) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => seconds >= start && seconds <= end,
            (Some(start), None) => seconds >= start,
            _ => false,
        }
    }
}

impl From<&AnalysisSpan> for AnnotationSpan {
    fn from(span: &AnalysisSpan) -> Self {
        let start = parse_or_log(&span.start);
        let end = timestamp::parse_range(&span.end)
            .ok()
            .flatten()
            .map(|(_, end)| end)
            .or_else(|| parse_or_log(&span.end));
        let rationale = Some(span.rationale.clone()).filter(|r| !r.trim().is_empty());

        Self {
            text: span.text.clone(),
            offsets: None,
            start,
            end,
            source: AnnotationSource::Machine,
            confidence: Some(span.confidence.clamp(0.0, 1.0)),
            rationale,
        }
    }
}

impl From<&FeedbackRecord> for AnnotationSpan {
    fn from(record: &FeedbackRecord) -> Self {
        AnnotationSpan::human(record.text.clone(), record.feedback_type)
    }
}

fn parse_or_log(input: &str) -> Option<f64> {
    match timestamp::parse_seconds(input) {
        Ok(seconds) => Some(seconds),
        Err(e) => {
            debug!("Ignoring span time: {}", e);
            None
        }
    }
}
