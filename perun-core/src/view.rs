//! Derived state of one job page.
//!
//! [`JobView`] owns the transcript, the machine spans and the feedback of a
//! job and recomputes the aligned segments on every mutation.

use crate::align::{align, RenderSegment};
use crate::annotation::{AnnotationSpan, Transcript};
use crate::api::{FeedbackRecord, JobAnalysisResult};
use crate::summary::AnalysisSummary;

#[derive(Debug, Clone, Default)]
pub struct JobView {
    transcript: Transcript,
    spans: Vec<AnnotationSpan>,
    feedback: Vec<FeedbackRecord>,
    segments: Vec<RenderSegment>,
}

impl JobView {
    pub fn new(transcript: Transcript, spans: Vec<AnnotationSpan>) -> Self {
        let mut view = Self {
            transcript,
            spans,
            feedback: Vec::new(),
            segments: Vec::new(),
        };
        view.recompute();
        view
    }

    pub fn from_result(result: &JobAnalysisResult) -> Self {
        Self::new(
            Transcript::new(result.transcript_text.clone()),
            result.spans.iter().map(AnnotationSpan::from).collect(),
        )
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn spans(&self) -> &[AnnotationSpan] {
        &self.spans
    }

    pub fn feedback(&self) -> &[FeedbackRecord] {
        &self.feedback
    }

    pub fn segments(&self) -> &[RenderSegment] {
        &self.segments
    }

    pub fn set_transcript(&mut self, transcript: Transcript) {
        self.transcript = transcript;
        self.recompute();
    }

    /// Record the media duration; segments do not depend on it
    pub fn set_duration(&mut self, duration: f64) {
        self.transcript.duration = Some(duration);
    }

    pub fn set_spans(&mut self, spans: Vec<AnnotationSpan>) {
        self.spans = spans;
        self.recompute();
    }

    /// Replace all feedback, ordered by submission time
    pub fn set_feedback(&mut self, mut feedback: Vec<FeedbackRecord>) {
        feedback.sort_by_key(|f| f.created_at);
        self.feedback = feedback;
        self.recompute();
    }

    pub fn push_feedback(&mut self, record: FeedbackRecord) {
        self.feedback.push(record);
        self.recompute();
    }

    pub fn remove_feedback(&mut self, feedback_id: &str) -> Option<FeedbackRecord> {
        let index = self.feedback.iter().position(|f| f.id == feedback_id)?;
        let removed = self.feedback.remove(index);
        self.recompute();
        Some(removed)
    }

    /// Feedback recorded for exactly this text, if any
    pub fn feedback_for(&self, text: &str) -> Option<&FeedbackRecord> {
        let text = text.trim().to_lowercase();
        self.feedback
            .iter()
            .rev()
            .find(|f| f.text.trim().to_lowercase() == text)
    }

    /// Index of the segment whose machine span covers `position` seconds
    pub fn active_segment(&self, position: f64) -> Option<usize> {
        self.segments.iter().position(|segment| {
            segment
                .machine_span()
                .is_some_and(|span| span.contains_time(position))
        })
    }

    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary::new(&self.spans, self.transcript.duration)
    }

    fn recompute(&mut self) {
        let mut all = self.spans.clone();
        all.extend(self.feedback.iter().map(AnnotationSpan::from));
        self.segments = align(&self.transcript.text, &all);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::Verdict;
    use crate::api::{AnalysisSpan, FeedbackType};
    use chrono::{TimeZone, Utc};

    fn result() -> JobAnalysisResult {
        JobAnalysisResult {
            audio_file_id: "a1".into(),
            transcript_text: "Intro words. Kill them all. Outro words.".into(),
            spans: vec![AnalysisSpan {
                start: "00:00:04".into(),
                end: "00:00:06".into(),
                text: "Kill them all".into(),
                rationale: "Incitement to violence".into(),
                confidence: 0.95,
            }],
        }
    }

    fn record(id: &str, text: &str, kind: FeedbackType, minute: u32) -> FeedbackRecord {
        FeedbackRecord {
            id: id.into(),
            job_id: "j1".into(),
            batch_id: "b1".into(),
            text: text.into(),
            feedback_type: kind,
            original_confidence: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_active_segment_follows_playback() {
        let view = JobView::from_result(&result());
        assert_eq!(view.segments().len(), 3);
        assert_eq!(view.active_segment(5.0), Some(1));
        assert_eq!(view.active_segment(1.0), None);
    }

    #[test]
    fn test_feedback_recomputes_segments() {
        let mut view = JobView::from_result(&result());
        view.push_feedback(record("f1", "Kill them all", FeedbackType::Negative, 1));
        assert_eq!(
            view.segments()[1].annotation().unwrap().verdict,
            Some(Verdict::Rejected)
        );

        view.push_feedback(record("f2", "Outro", FeedbackType::Positive, 2));
        assert_eq!(view.segments().iter().filter(|s| s.is_annotated()).count(), 2);
        assert!(view.feedback_for("outro").is_some());

        view.remove_feedback("f2");
        assert_eq!(view.segments().iter().filter(|s| s.is_annotated()).count(), 1);
    }

    #[test]
    fn test_set_feedback_orders_by_submission() {
        let mut view = JobView::from_result(&result());
        view.set_feedback(vec![
            record("late", "Kill them all", FeedbackType::Positive, 9),
            record("early", "Kill them all", FeedbackType::Negative, 1),
        ]);
        assert_eq!(view.feedback()[0].id, "early");
        assert_eq!(
            view.segments()[1].annotation().unwrap().verdict,
            Some(Verdict::Confirmed)
        );
    }
}
