//! Span alignment: turns a transcript and its annotations into an ordered,
//! non-overlapping list of segments ready for rendering.
//!
//! Spans are addressed by text, not by offset. Machine spans are placed
//! first, in start-time order, each searched forward from the end of the
//! previously placed machine span. Human feedback is placed afterwards: when
//! it touches a machine span it becomes a [`Verdict`] on that span instead of
//! a new boundary, otherwise it is highlighted on its own.
//!
//! Concatenating the text of the returned segments always yields the input
//! transcript.

use crate::annotation::{AnnotationSource, AnnotationSpan};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use tracing::debug;

/// Human decision attached to a machine span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Confirmed,
    Rejected,
}

impl Verdict {
    fn for_source(source: AnnotationSource) -> Option<Self> {
        match source {
            AnnotationSource::HumanPositive => Some(Verdict::Confirmed),
            AnnotationSource::HumanNegative => Some(Verdict::Rejected),
            AnnotationSource::Machine => None,
        }
    }
}

/// The annotation carried by a highlighted segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub span: AnnotationSpan,
    /// Latest human verdict on a machine span
    pub verdict: Option<Verdict>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SegmentKind {
    Plain,
    Annotated(Annotation),
}

/// A slice of the transcript, plain or annotated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSegment {
    /// Byte range within the transcript
    pub range: Range<usize>,
    pub text: String,
    pub kind: SegmentKind,
}

impl RenderSegment {
    fn plain(transcript: &str, range: Range<usize>) -> Self {
        Self {
            text: transcript[range.clone()].to_string(),
            range,
            kind: SegmentKind::Plain,
        }
    }

    pub fn annotation(&self) -> Option<&Annotation> {
        match &self.kind {
            SegmentKind::Annotated(annotation) => Some(annotation),
            SegmentKind::Plain => None,
        }
    }

    pub fn is_annotated(&self) -> bool {
        self.annotation().is_some()
    }

    /// Machine span of this segment, if any
    pub fn machine_span(&self) -> Option<&AnnotationSpan> {
        self.annotation()
            .map(|a| &a.span)
            .filter(|span| span.is_machine())
    }
}

struct Placement {
    range: Range<usize>,
    annotation: Annotation,
}

/// Align `spans` onto `transcript`.
///
/// Spans that cannot be located are dropped without error.
pub fn align(transcript: &str, spans: &[AnnotationSpan]) -> Vec<RenderSegment> {
    if transcript.is_empty() {
        return Vec::new();
    }

    let mut placements = place_machine_spans(transcript, spans);
    let machine_count = placements.len();
    place_human_spans(transcript, spans, &mut placements, machine_count);
    placements.sort_by_key(|p| p.range.start);

    let mut segments = Vec::with_capacity(placements.len() * 2 + 1);
    let mut position = 0;
    for placement in placements {
        if placement.range.start > position {
            segments.push(RenderSegment::plain(
                transcript,
                position..placement.range.start,
            ));
        }
        position = placement.range.end;
        segments.push(RenderSegment {
            text: transcript[placement.range.clone()].to_string(),
            range: placement.range,
            kind: SegmentKind::Annotated(placement.annotation),
        });
    }
    if position < transcript.len() {
        segments.push(RenderSegment::plain(transcript, position..transcript.len()));
    }

    segments
}

fn place_machine_spans(transcript: &str, spans: &[AnnotationSpan]) -> Vec<Placement> {
    let mut machine: Vec<&AnnotationSpan> = spans.iter().filter(|s| s.is_machine()).collect();
    machine.sort_by(|a, b| a.sort_key().total_cmp(&b.sort_key()));

    let mut placements: Vec<Placement> = Vec::with_capacity(machine.len());
    let mut cursor = 0;
    for span in machine {
        let Some(range) = locate(transcript, span, cursor) else {
            debug!("Dropping machine span not found in transcript: {:?}", span.text);
            continue;
        };
        if placements.iter().any(|p| overlaps(&p.range, &range)) {
            debug!("Dropping machine span overlapping another: {:?}", span.text);
            continue;
        }
        cursor = cursor.max(range.end);
        placements.push(Placement {
            range,
            annotation: Annotation {
                span: span.clone(),
                verdict: None,
            },
        });
    }
    placements
}

fn place_human_spans(
    transcript: &str,
    spans: &[AnnotationSpan],
    placements: &mut Vec<Placement>,
    machine_count: usize,
) {
    // One forward cursor per needle so repeated feedback on the same words
    // walks left to right.
    let mut cursors: HashMap<String, usize> = HashMap::new();

    for span in spans.iter().filter(|s| s.source.is_human()) {
        let key = span.text.trim().to_lowercase();
        let from = cursors.get(&key).copied().unwrap_or(0);
        let on_machine = &placements[..machine_count];
        let range = valid_offsets(transcript, span)
            .or_else(|| occurrence_within(transcript, span.text.trim(), from, on_machine))
            .or_else(|| occurrence_within(transcript, span.text.trim(), 0, on_machine))
            .or_else(|| find_ignore_case(transcript, span.text.trim(), from));
        let Some(range) = range else {
            debug!("Dropping feedback not found in transcript: {:?}", span.text);
            continue;
        };
        cursors.insert(key, range.end);

        let verdict = Verdict::for_source(span.source);
        let mut attached = false;
        for placement in placements[..machine_count].iter_mut() {
            if overlaps(&placement.range, &range) {
                placement.annotation.verdict = verdict;
                attached = true;
            }
        }
        if attached {
            continue;
        }

        if placements[machine_count..]
            .iter()
            .any(|p| overlaps(&p.range, &range))
        {
            debug!("Dropping feedback overlapping earlier feedback: {:?}", span.text);
            continue;
        }

        placements.push(Placement {
            range,
            annotation: Annotation {
                span: span.clone(),
                verdict: None,
            },
        });
    }
}

/// Resolve a span's byte range: valid offsets win, otherwise search forward
/// from `from`.
fn locate(transcript: &str, span: &AnnotationSpan, from: usize) -> Option<Range<usize>> {
    valid_offsets(transcript, span).or_else(|| find_ignore_case(transcript, span.text.trim(), from))
}

fn valid_offsets(transcript: &str, span: &AnnotationSpan) -> Option<Range<usize>> {
    let offsets = span.offsets.clone()?;
    if valid_range(transcript, &offsets) {
        Some(offsets)
    } else {
        debug!("Ignoring invalid offsets {:?} for {:?}", offsets, span.text);
        None
    }
}

/// First occurrence of `needle` at or after `from` that intersects one of
/// `placements`. Feedback on a repeated phrase lands on the flagged copy.
fn occurrence_within(
    transcript: &str,
    needle: &str,
    mut from: usize,
    placements: &[Placement],
) -> Option<Range<usize>> {
    while let Some(range) = find_ignore_case(transcript, needle, from) {
        if placements.iter().any(|p| overlaps(&p.range, &range)) {
            return Some(range);
        }
        let width = transcript[range.start..].chars().next()?.len_utf8();
        from = range.start + width;
    }
    None
}

fn valid_range(transcript: &str, range: &Range<usize>) -> bool {
    range.start < range.end
        && range.end <= transcript.len()
        && transcript.is_char_boundary(range.start)
        && transcript.is_char_boundary(range.end)
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Leftmost case-insensitive occurrence of `needle` at or after `from`.
pub fn find_ignore_case(haystack: &str, needle: &str, from: usize) -> Option<Range<usize>> {
    if needle.is_empty() || from >= haystack.len() || !haystack.is_char_boundary(from) {
        return None;
    }
    let tail = &haystack[from..];
    tail.char_indices().find_map(|(offset, _)| {
        match_prefix_ignore_case(&tail[offset..], needle).map(|len| {
            let start = from + offset;
            start..start + len
        })
    })
}

fn match_prefix_ignore_case(hay: &str, needle: &str) -> Option<usize> {
    let mut hay_chars = hay.char_indices();
    let mut end = 0;
    for n in needle.chars() {
        let (i, h) = hay_chars.next()?;
        if !h.to_lowercase().eq(n.to_lowercase()) {
            return None;
        }
        end = i + h.len_utf8();
    }
    Some(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FeedbackType;
    use pretty_assertions::assert_eq;

    const TRANSCRIPT: &str = "Hello world. We should eliminate all immigrants. Thanks.";

    fn texts(segments: &[RenderSegment]) -> Vec<(&str, bool)> {
        segments
            .iter()
            .map(|s| (s.text.as_str(), s.is_annotated()))
            .collect()
    }

    #[test]
    fn test_machine_span_only() {
        let spans = vec![AnnotationSpan::machine("we should eliminate all immigrants", 0.9)];
        let segments = align(TRANSCRIPT, &spans);
        assert_eq!(
            texts(&segments),
            vec![
                ("Hello world. ", false),
                ("We should eliminate all immigrants", true),
                (". Thanks.", false),
            ]
        );
        assert_eq!(segments[1].range, 13..47);
    }

    #[test]
    fn test_feedback_on_machine_span_becomes_verdict() {
        let spans = vec![
            AnnotationSpan::machine("we should eliminate all immigrants", 0.9),
            AnnotationSpan::human("We should eliminate all immigrants", FeedbackType::Negative),
        ];
        let segments = align(TRANSCRIPT, &spans);
        assert_eq!(segments.len(), 3);
        let annotation = segments[1].annotation().unwrap();
        assert!(annotation.span.is_machine());
        assert_eq!(annotation.verdict, Some(Verdict::Rejected));
    }

    #[test]
    fn test_partial_overlap_attaches_to_machine_span() {
        let spans = vec![
            AnnotationSpan::machine("eliminate all immigrants", 0.8),
            AnnotationSpan::human("We should eliminate", FeedbackType::Positive),
        ];
        let segments = align(TRANSCRIPT, &spans);
        assert_eq!(segments.iter().filter(|s| s.is_annotated()).count(), 1);
        assert_eq!(
            segments[1].annotation().unwrap().verdict,
            Some(Verdict::Confirmed)
        );
    }

    #[test]
    fn test_feedback_on_repeated_phrase_lands_on_flagged_copy() {
        let transcript = "go home now. We said go home.";
        let spans = vec![
            AnnotationSpan::machine("now", 0.4).with_times(1.0, 2.0),
            AnnotationSpan::machine("go home", 0.9).with_times(5.0, 6.0),
            AnnotationSpan::human("go home", FeedbackType::Negative),
        ];
        let segments = align(transcript, &spans);

        let flagged = segments.iter().find(|s| s.range == (21..28)).unwrap();
        assert_eq!(flagged.annotation().unwrap().verdict, Some(Verdict::Rejected));
        assert!(segments
            .iter()
            .filter_map(|s| s.annotation())
            .all(|a| a.span.is_machine()));
        assert_eq!(segments[0].text, "go home ");
        assert!(!segments[0].is_annotated());
    }

    #[test]
    fn test_unflagged_feedback_keeps_leftmost_occurrence() {
        let transcript = "go home now. We said go home.";
        let spans = vec![AnnotationSpan::human("go home", FeedbackType::Positive)];
        let segments = align(transcript, &spans);
        assert_eq!(segments[0].range, 0..7);
        assert!(segments[0].is_annotated());
    }

    #[test]
    fn test_latest_verdict_wins() {
        let spans = vec![
            AnnotationSpan::machine("Thanks", 0.3),
            AnnotationSpan::human("Thanks", FeedbackType::Positive),
            AnnotationSpan::human("thanks", FeedbackType::Negative),
        ];
        let segments = align(TRANSCRIPT, &spans);
        let annotated: Vec<_> = segments.iter().filter_map(|s| s.annotation()).collect();
        assert_eq!(annotated.len(), 1);
        assert_eq!(annotated[0].verdict, Some(Verdict::Rejected));
    }

    #[test]
    fn test_standalone_feedback_is_highlighted() {
        let spans = vec![
            AnnotationSpan::machine("eliminate all immigrants", 0.8),
            AnnotationSpan::human("Hello world", FeedbackType::Positive),
        ];
        let segments = align(TRANSCRIPT, &spans);
        assert_eq!(
            texts(&segments),
            vec![
                ("Hello world", true),
                (". We should ", false),
                ("eliminate all immigrants", true),
                (". Thanks.", false),
            ]
        );
        assert_eq!(
            segments[0].annotation().unwrap().span.source,
            AnnotationSource::HumanPositive
        );
    }

    #[test]
    fn test_unmatched_span_is_dropped() {
        let segments = align(
            "A short clip.",
            &[AnnotationSpan::machine("nonexistent phrase", 0.5)],
        );
        assert_eq!(texts(&segments), vec![("A short clip.", false)]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(align("", &[AnnotationSpan::machine("x", 0.5)]).is_empty());
        assert_eq!(texts(&align("abc", &[])), vec![("abc", false)]);
    }

    #[test]
    fn test_repeated_substrings_match_left_to_right() {
        let transcript = "go home, go home now";
        let spans = vec![
            AnnotationSpan::machine("go home", 0.4).with_times(1.0, 2.0),
            AnnotationSpan::machine("go home", 0.6).with_times(3.0, 4.0),
        ];
        let segments = align(transcript, &spans);
        let ranges: Vec<_> = segments
            .iter()
            .filter(|s| s.is_annotated())
            .map(|s| s.range.clone())
            .collect();
        assert_eq!(ranges, vec![0..7, 9..16]);
    }

    #[test]
    fn test_spans_are_ordered_by_start_time() {
        // Sorted by time, the later phrase is searched from the cursor of the
        // earlier one; out-of-order text is dropped.
        let transcript = "alpha beta gamma";
        let spans = vec![
            AnnotationSpan::machine("alpha", 0.5).with_times(5.0, 6.0),
            AnnotationSpan::machine("gamma", 0.5).with_times(1.0, 2.0),
        ];
        let segments = align(transcript, &spans);
        let annotated: Vec<_> = segments
            .iter()
            .filter(|s| s.is_annotated())
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(annotated, vec!["gamma"]);
    }

    #[test]
    fn test_offsets_take_precedence() {
        let transcript = "no no no";
        let spans = vec![AnnotationSpan::machine("no", 0.9).with_offsets(6..8)];
        let segments = align(transcript, &spans);
        assert_eq!(texts(&segments), vec![("no no ", false), ("no", true)]);
    }

    #[test]
    fn test_invalid_offsets_fall_back_to_search() {
        let spans = vec![AnnotationSpan::machine("Thanks", 0.9).with_offsets(50..99)];
        let segments = align(TRANSCRIPT, &spans);
        assert_eq!(segments.last().unwrap().text, ".");
        assert_eq!(segments[segments.len() - 2].text, "Thanks");
    }

    #[test]
    fn test_overlapping_feedback_keeps_first() {
        let spans = vec![
            AnnotationSpan::human("Hello world", FeedbackType::Positive),
            AnnotationSpan::human("world. We", FeedbackType::Positive),
        ];
        let segments = align(TRANSCRIPT, &spans);
        assert_eq!(segments.iter().filter(|s| s.is_annotated()).count(), 1);
        assert_eq!(segments[0].text, "Hello world");
    }

    #[test]
    fn test_case_insensitive_unicode() {
        let transcript = "Über alles";
        let found = find_ignore_case(transcript, "über", 0).unwrap();
        assert_eq!(&transcript[found], "Über");
        assert_eq!(find_ignore_case(transcript, "alles", 3), Some(6..11));
        assert_eq!(find_ignore_case(transcript, "", 0), None);
    }
}
