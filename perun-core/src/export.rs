//! Downloadable analysis reports (JSON and CSV)

use crate::annotation::{AnnotationSpan, Flag};
use crate::error::Result;
use crate::summary::AnalysisSummary;
use crate::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }
}

/// One flagged span as it appears in a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSegment {
    pub timestamp: String,
    pub text: String,
    pub flag: Flag,
    pub confidence: Option<f32>,
    pub explanation: Option<String>,
}

impl From<&AnnotationSpan> for ExportSegment {
    fn from(span: &AnnotationSpan) -> Self {
        let timestamp = match (span.start, span.end) {
            (Some(start), Some(end)) => timestamp::format_range(start, end),
            (Some(start), None) => timestamp::format_padded(start),
            _ => String::new(),
        };
        Self {
            timestamp,
            text: span.text.clone(),
            flag: span.flag(),
            confidence: span.confidence,
            explanation: span.rationale.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub file: String,
    pub analyzed_at: DateTime<Utc>,
    pub summary: AnalysisSummary,
    pub segments: Vec<ExportSegment>,
}

impl AnalysisReport {
    /// Report over the machine spans of a job, in media order
    pub fn new(
        file: impl Into<String>,
        spans: &[AnnotationSpan],
        duration: Option<f64>,
        analyzed_at: DateTime<Utc>,
    ) -> Self {
        let mut machine: Vec<&AnnotationSpan> = spans.iter().filter(|s| s.is_machine()).collect();
        machine.sort_by(|a, b| a.sort_key().total_cmp(&b.sort_key()));

        Self {
            file: file.into(),
            analyzed_at,
            summary: AnalysisSummary::new(spans, duration),
            segments: machine.into_iter().map(ExportSegment::from).collect(),
        }
    }

    /// Suggested download name, e.g. `perun-analysis-1714564800000.csv`
    pub fn file_name(&self, format: ExportFormat) -> String {
        format!(
            "perun-analysis-{}.{}",
            self.analyzed_at.timestamp_millis(),
            format
        )
    }

    pub fn render(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Json => self.to_json(),
            ExportFormat::Csv => Ok(self.to_csv()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `Timestamp,Text,Flag,Confidence,Explanation`, one row per segment
    pub fn to_csv(&self) -> String {
        let mut lines = vec!["Timestamp,Text,Flag,Confidence,Explanation".to_string()];
        for segment in &self.segments {
            lines.push(format!(
                "{},{},{},{},{}",
                quote(&segment.timestamp),
                quote(&segment.text),
                segment.flag,
                segment
                    .confidence
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
                quote(segment.explanation.as_deref().unwrap_or_default()),
            ));
        }
        lines.join("\n")
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn report() -> AnalysisReport {
        let spans = vec![
            AnnotationSpan::machine("he said \"burn it\"", 0.8)
                .with_times(75.0, 80.0)
                .with_rationale("Call to \"arson\""),
            AnnotationSpan::machine("mildly rude", 0.3)
                .with_times(10.0, 12.0)
                .with_rationale("Mild insult"),
        ];
        AnalysisReport::new(
            "rally.wav",
            &spans,
            Some(120.0),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_csv() {
        let csv = report().to_csv();
        let expected = "Timestamp,Text,Flag,Confidence,Explanation\n\
            \"[00:10–00:12]\",\"mildly rude\",mild,0.3,\"Mild insult\"\n\
            \"[01:15–01:20]\",\"he said \"\"burn it\"\"\",extremist,0.8,\"Call to \"\"arson\"\"\"";
        assert_eq!(csv, expected);
    }

    #[test]
    fn test_json_report() {
        let report = report();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["file"], "rally.wav");
        assert_eq!(json["segments"].as_array().unwrap().len(), 2);
        assert_eq!(json["summary"]["risk_level"], "medium");
        assert_eq!(
            report.file_name(ExportFormat::Csv),
            "perun-analysis-1714564800000.csv"
        );
    }
}
