//! Integration tests for perun-core

use perun_core::api::{AnalysisSpan, FeedbackType, JobAnalysisResult};
use perun_core::waveform::{sample_count, synthetic_envelope};
use perun_core::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

const WORDS: &[&str] = &[
    "we", "must", "remove", "them", "all", "Today", "the", "weather", "is", "fine", "Über",
    "straße", "go", "home",
];

fn transcript_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 0..40).prop_map(|words| words.join(" "))
}

fn span_strategy() -> impl Strategy<Value = AnnotationSpan> {
    (
        prop::collection::vec(prop::sample::select(WORDS), 1..4),
        0.0f32..=1.0,
        0.0f64..100.0,
        0u8..3,
    )
        .prop_map(|(words, confidence, start, kind)| {
            let text = words.join(" ");
            match kind {
                0 => AnnotationSpan::machine(text, confidence).with_times(start, start + 2.0),
                1 => AnnotationSpan::human(text, FeedbackType::Positive),
                _ => AnnotationSpan::human(text, FeedbackType::Negative),
            }
        })
}

proptest! {
    /// Aligned segments cover the transcript exactly, in order
    #[test]
    fn prop_segments_reconstruct_transcript(
        transcript in transcript_strategy(),
        spans in prop::collection::vec(span_strategy(), 0..8),
    ) {
        let segments = align(&transcript, &spans);
        let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
        prop_assert_eq!(&joined, &transcript);

        let mut position = 0;
        for segment in &segments {
            prop_assert_eq!(segment.range.start, position);
            prop_assert!(segment.range.end > segment.range.start);
            prop_assert_eq!(&transcript[segment.range.clone()], segment.text.as_str());
            position = segment.range.end;
        }
        prop_assert_eq!(position, transcript.len());
    }

    /// Two plain segments are never adjacent
    #[test]
    fn prop_no_adjacent_plain_segments(
        transcript in transcript_strategy(),
        spans in prop::collection::vec(span_strategy(), 0..8),
    ) {
        let segments = align(&transcript, &spans);
        for pair in segments.windows(2) {
            prop_assert!(pair[0].is_annotated() || pair[1].is_annotated());
        }
    }

    /// Colour depends only on confidence; green falls as confidence rises
    #[test]
    fn prop_style_is_monotonic(a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
        prop_assert_eq!(SegmentStyle::for_confidence(a), SegmentStyle::for_confidence(a));

        let green = |c: f32| SegmentStyle::for_confidence(c).background.map(|bg| bg.g);
        if a <= b {
            prop_assert!(green(a) >= green(b));
        }
    }

    /// Sample count stays within bounds for any duration
    #[test]
    fn prop_sample_count_bounds(duration in 0.0f64..100_000.0) {
        let n = sample_count(duration);
        prop_assert!((50..=200).contains(&n));
    }
}

#[test]
fn test_style_extremes() {
    let low = SegmentStyle::for_confidence(0.0);
    let high = SegmentStyle::for_confidence(1.0);
    assert_eq!(low.background.unwrap().g, 255);
    assert_eq!(high.background.unwrap().g, 0);
}

#[test]
fn test_rejected_flag_keeps_single_segment() {
    let transcript = "Hello world. We should eliminate all immigrants. Thanks.";
    let spans = vec![
        AnnotationSpan::machine("we should eliminate all immigrants", 0.9),
        AnnotationSpan::human("We should eliminate all immigrants", FeedbackType::Negative),
    ];
    let segments = align(transcript, &spans);
    let annotated: Vec<_> = segments.iter().filter_map(|s| s.annotation()).collect();
    assert_eq!(annotated.len(), 1);
    assert_eq!(annotated[0].verdict, Some(Verdict::Rejected));
    assert_eq!(
        SegmentStyle::for_annotation(annotated[0]),
        SegmentStyle::rejected()
    );
}

#[test]
fn test_unmatched_span_leaves_plain_transcript() {
    let segments = align(
        "A short clip.",
        &[AnnotationSpan::machine("nonexistent phrase", 0.5)],
    );
    assert_eq!(segments.len(), 1);
    assert!(!segments[0].is_annotated());
    assert_eq!(segments[0].text, "A short clip.");
}

#[test]
fn test_waveform_fallback_for_two_minutes() {
    let waveform = Waveform::build::<PcmProbe>(None, 120.0, 4.0, &[]);
    assert!(waveform.synthetic);
    assert_eq!(waveform.points.len(), 60);
    assert_eq!(waveform.points[0].time, 0.0);
    assert_eq!(waveform.points[59].time, 120.0);
    assert_eq!(
        waveform.points.iter().map(|p| p.amplitude).collect::<Vec<_>>(),
        synthetic_envelope(60)
    );
}

#[rstest]
#[case(0.0, 0.0)]
#[case(25.0, 10.0)]
#[case(-4.0, 0.0)]
#[case(5.5, 5.5)]
fn test_seek_clamping(#[case] target: f64, #[case] expected: f64) {
    struct Silent;

    impl MediaTransport for Silent {
        fn set_source(&mut self, _source: Option<&str>) {}
        fn set_current_time(&mut self, _seconds: f64) {}
        fn play(&mut self) -> Result<()> {
            Ok(())
        }
        fn pause(&mut self) {}
        fn set_volume(&mut self, _volume: f64) {}
        fn set_muted(&mut self, _muted: bool) {}
    }

    let mut bridge = PlaybackBridge::new(Silent);
    bridge.set_source(Some("blob:1"));
    bridge.handle_event(MediaEvent::LoadedMetadata { duration: 10.0 });
    bridge.seek_to(target);
    assert_eq!(bridge.state().position, expected);
}

#[test]
fn test_job_view_from_backend_result() {
    let result = JobAnalysisResult {
        audio_file_id: "a1".into(),
        transcript_text: "They must be driven out. Anyway, lunch was good.".into(),
        spans: vec![AnalysisSpan {
            start: "[00:02-00:05]".into(),
            end: "[00:02-00:05]".into(),
            text: "They must be driven out".into(),
            rationale: "Calls for expulsion".into(),
            confidence: 0.92,
        }],
    };

    let mut view = JobView::from_result(&result);
    view.set_duration(60.0);
    assert_eq!(view.active_segment(3.0), Some(0));

    let summary = view.summary();
    assert_eq!(summary.risk_level, RiskLevel::High);
    assert_eq!(summary.flagged_duration, 3.0);

    let mut capture = SelectionCapture::new();
    let bounds = Rect {
        left: 0.0,
        top: 0.0,
        width: 10.0,
        height: 10.0,
    };
    assert!(capture
        .on_pointer_up("driven", bounds, view.segments(), view.feedback())
        .is_none());
    assert!(capture
        .on_pointer_up("lunch was good", bounds, view.segments(), view.feedback())
        .is_some());
}
