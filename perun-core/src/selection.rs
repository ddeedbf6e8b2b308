//! Turns text the reviewer selects in a transcript into feedback.

use crate::align::RenderSegment;
use crate::annotation::AnnotationSpan;
use crate::api::{FeedbackRecord, FeedbackType, NewFeedback};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bounding box of a selection, in viewport pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Rect {
    /// Point centred on the top edge, where the feedback popover is anchored
    pub fn top_center(&self) -> Point {
        Point {
            x: self.left + self.width / 2.0,
            y: self.top,
        }
    }
}

/// A selection waiting for the reviewer to confirm or dismiss it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSelection {
    pub text: String,
    pub anchor: Point,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionCapture {
    pending: Option<PendingSelection>,
}

impl SelectionCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&PendingSelection> {
        self.pending.as_ref()
    }

    /// Offer a finished selection.
    ///
    /// Returns the new pending selection, or `None` when the text is empty,
    /// overlaps an existing highlight or already has feedback. An empty
    /// selection (a plain click) clears the pending one; the other refusals
    /// leave it in place.
    pub fn on_pointer_up(
        &mut self,
        raw_text: &str,
        bounds: Rect,
        segments: &[RenderSegment],
        feedback: &[FeedbackRecord],
    ) -> Option<&PendingSelection> {
        let text = raw_text.trim();
        if text.is_empty() {
            self.pending = None;
            return None;
        }

        let needle = text.to_lowercase();
        let overlaps_highlight = segments
            .iter()
            .filter(|s| s.is_annotated())
            .map(|s| s.text.trim().to_lowercase())
            .any(|existing| existing.contains(&needle) || needle.contains(&existing));
        if overlaps_highlight {
            debug!("Selection overlaps an existing highlight: {:?}", text);
            return None;
        }

        if feedback
            .iter()
            .any(|f| f.text.trim().to_lowercase() == needle)
        {
            debug!("Selection already has feedback: {:?}", text);
            return None;
        }

        self.pending = Some(PendingSelection {
            text: text.to_string(),
            anchor: bounds.top_center(),
        });
        self.pending.as_ref()
    }

    /// Turn the pending selection into a positive feedback request
    pub fn confirm(&mut self, job_id: &str, batch_id: &str) -> Option<NewFeedback> {
        let pending = self.pending.take()?;
        Some(NewFeedback {
            job_id: job_id.to_string(),
            batch_id: batch_id.to_string(),
            text: pending.text,
            feedback_type: FeedbackType::Positive,
            original_confidence: None,
        })
    }

    pub fn dismiss(&mut self) {
        self.pending = None;
    }

    /// Mark a machine span as a false positive
    pub fn reject_span(job_id: &str, batch_id: &str, span: &AnnotationSpan) -> NewFeedback {
        NewFeedback {
            job_id: job_id.to_string(),
            batch_id: batch_id.to_string(),
            text: span.text.trim().to_string(),
            feedback_type: FeedbackType::Negative,
            original_confidence: span.confidence,
        }
    }
}
