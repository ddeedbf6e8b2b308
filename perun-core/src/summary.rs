//! Headline numbers for a job and for a batch.

use crate::annotation::AnnotationSpan;
use crate::api::{BatchDetails, JobStatus};
use crate::timestamp;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Confidence at which a single span makes the whole job high risk
pub const HIGH_RISK_CONFIDENCE: f32 = 0.85;
/// Flagged share of the media, in percent, that makes a job high risk
pub const HIGH_RISK_PERCENTAGE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn message(&self) -> &'static str {
        match self {
            RiskLevel::High => "This content contains concerning language that requires review.",
            RiskLevel::Medium => "Some potentially problematic content detected.",
            RiskLevel::Low => "Content appears to be largely appropriate.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Seconds, once the media duration is known
    pub total_duration: Option<f64>,
    /// Seconds covered by at least one flagged span
    pub flagged_duration: f64,
    pub flagged_percentage: Option<f64>,
    pub spans_flagged: usize,
    pub average_confidence: Option<f32>,
    pub risk_level: RiskLevel,
}

impl AnalysisSummary {
    /// Summarise the machine spans of a job; human spans are ignored
    pub fn new(spans: &[AnnotationSpan], total_duration: Option<f64>) -> Self {
        let machine: Vec<&AnnotationSpan> = spans.iter().filter(|s| s.is_machine()).collect();

        let flagged_duration = union_length(machine.iter().filter_map(|s| match (s.start, s.end) {
            (Some(start), Some(end)) if end > start => Some((start, end)),
            _ => None,
        }));

        let flagged_percentage = total_duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| (flagged_duration / d * 100.0).min(100.0));

        let confidences: Vec<f32> = machine.iter().filter_map(|s| s.confidence).collect();
        let average_confidence = if confidences.is_empty() {
            None
        } else {
            Some(confidences.iter().sum::<f32>() / confidences.len() as f32)
        };

        let risk_level = if confidences.iter().any(|c| *c >= HIGH_RISK_CONFIDENCE)
            || flagged_percentage.is_some_and(|p| p >= HIGH_RISK_PERCENTAGE)
        {
            RiskLevel::High
        } else if !machine.is_empty() {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        Self {
            total_duration,
            flagged_duration,
            flagged_percentage,
            spans_flagged: machine.len(),
            average_confidence,
            risk_level,
        }
    }

    /// e.g. `18 sec (14%)`
    pub fn flagged_label(&self) -> String {
        let seconds = format!("{} sec", self.flagged_duration.round() as u64);
        match self.flagged_percentage {
            Some(p) => format!("{} ({}%)", seconds, p.round() as u64),
            None => seconds,
        }
    }

    /// e.g. `2:45 min`
    pub fn duration_label(&self) -> String {
        match self.total_duration {
            Some(d) => format!("{} min", timestamp::format_clock(d)),
            None => "unknown".to_string(),
        }
    }
}

/// Total length of the union of `(start, end)` intervals
fn union_length(intervals: impl Iterator<Item = (f64, f64)>) -> f64 {
    let mut intervals: Vec<(f64, f64)> = intervals.collect();
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut total = 0.0;
    let mut current: Option<(f64, f64)> = None;
    for (start, end) in intervals {
        current = match current {
            Some((cs, ce)) if start <= ce => Some((cs, ce.max(end))),
            Some((cs, ce)) => {
                total += ce - cs;
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((cs, ce)) = current {
        total += ce - cs;
    }
    total
}

/// Job counts of a batch by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub total: usize,
    pub pending: usize,
    pub analysing: usize,
    pub completed: usize,
    pub failed: usize,
    pub unknown: usize,
}

impl BatchProgress {
    pub fn new(batch: &BatchDetails) -> Self {
        let mut progress = Self {
            total: batch.jobs.len(),
            ..Self::default()
        };
        for job in &batch.jobs {
            match job.status {
                JobStatus::Pending => progress.pending += 1,
                JobStatus::Analysing => progress.analysing += 1,
                JobStatus::Completed => progress.completed += 1,
                JobStatus::Failed => progress.failed += 1,
                JobStatus::Unknown => progress.unknown += 1,
            }
        }
        progress
    }

    /// Share of jobs that finished successfully, in `[0, 1]`
    pub fn completed_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    pub fn is_finished(&self) -> bool {
        self.completed + self.failed == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FeedbackType, JobInfo};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_union_of_overlapping_spans() {
        let spans = vec![
            AnnotationSpan::machine("a", 0.5).with_times(10.0, 20.0),
            AnnotationSpan::machine("b", 0.6).with_times(15.0, 25.0),
            AnnotationSpan::machine("c", 0.7).with_times(40.0, 45.0),
            AnnotationSpan::human("d", FeedbackType::Positive).with_times(60.0, 90.0),
        ];
        let summary = AnalysisSummary::new(&spans, Some(200.0));
        assert_eq!(summary.flagged_duration, 20.0);
        assert_eq!(summary.flagged_percentage, Some(10.0));
        assert_eq!(summary.spans_flagged, 3);
        assert!((summary.average_confidence.unwrap() - 0.6).abs() < 1e-6);
        assert_eq!(summary.risk_level, RiskLevel::Medium);
        assert_eq!(summary.flagged_label(), "20 sec (10%)");
    }

    #[test]
    fn test_risk_levels() {
        let confident = vec![AnnotationSpan::machine("a", 0.9)];
        assert_eq!(AnalysisSummary::new(&confident, None).risk_level, RiskLevel::High);

        let long = vec![AnnotationSpan::machine("a", 0.3).with_times(0.0, 30.0)];
        assert_eq!(
            AnalysisSummary::new(&long, Some(100.0)).risk_level,
            RiskLevel::High
        );

        let summary = AnalysisSummary::new(&[], Some(100.0));
        assert_eq!(summary.risk_level, RiskLevel::Low);
        assert_eq!(summary.average_confidence, None);
        assert_eq!(summary.duration_label(), "1:40 min");
    }

    #[test]
    fn test_batch_progress() {
        let job = |status| JobInfo {
            job_id: "j".into(),
            filename: "f.wav".into(),
            status,
        };
        let batch = BatchDetails {
            name: "b".into(),
            description: None,
            jobs: vec![
                job(JobStatus::Completed),
                job(JobStatus::Analysing),
                job(JobStatus::Failed),
                job(JobStatus::Completed),
            ],
        };
        let progress = BatchProgress::new(&batch);
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.completed_fraction(), 0.5);
        assert!(!progress.is_finished());
    }
}
