//! Transcript with highlighted spans.
//!
//! Clicking a timed highlight seeks the player; selecting plain text offers it
//! as new feedback through `on_select`.

use dioxus::prelude::*;
use perun_core::align::{RenderSegment, Verdict};
use perun_core::style::SegmentStyle;
use perun_core::timestamp;
use perun_core::{AnnotationSpan, Rect};
use serde::Deserialize;
use tracing::debug;

const READ_SELECTION_JS: &str = r#"
const sel = window.getSelection();
if (sel && sel.rangeCount > 0 && !sel.isCollapsed) {
    const r = sel.getRangeAt(0).getBoundingClientRect();
    dioxus.send({ text: sel.toString(), left: r.left, top: r.top, width: r.width, height: r.height });
} else {
    dioxus.send(null);
}
"#;

#[derive(Debug, Deserialize)]
struct BrowserSelection {
    text: String,
    #[serde(flatten)]
    bounds: Rect,
}

/// Current browser selection; a collapsed one comes back as empty text
async fn read_selection() -> Option<(String, Rect)> {
    let mut eval = document::eval(READ_SELECTION_JS);
    match eval.recv::<Option<BrowserSelection>>().await {
        Ok(Some(selection)) => Some((selection.text, selection.bounds)),
        Ok(None) => Some((String::new(), Rect::default())),
        Err(e) => {
            debug!("Could not read the text selection: {:?}", e);
            None
        }
    }
}

fn tooltip(segment: &RenderSegment) -> String {
    let Some(annotation) = segment.annotation() else {
        return String::new();
    };
    let span = &annotation.span;

    let mut parts = Vec::new();
    if let (Some(start), Some(end)) = (span.start, span.end) {
        parts.push(timestamp::format_range(start, end));
    }
    if let Some(confidence) = span.confidence {
        parts.push(format!("{:.0}% confidence", confidence * 100.0));
    }
    match annotation.verdict {
        Some(Verdict::Confirmed) => parts.push("confirmed by reviewer".to_string()),
        Some(Verdict::Rejected) => parts.push("rejected by reviewer".to_string()),
        None if !span.is_machine() => parts.push("added by reviewer".to_string()),
        None => {}
    }
    if let Some(rationale) = span.rationale.as_deref().filter(|r| !r.is_empty()) {
        parts.push(rationale.to_string());
    }
    parts.join(" · ")
}

#[component]
pub fn InteractiveTranscript(
    segments: Vec<RenderSegment>,
    active: Option<usize>,
    on_seek: EventHandler<f64>,
    on_select: EventHandler<(String, Rect)>,
    on_reject: EventHandler<AnnotationSpan>,
) -> Element {
    if segments.is_empty() {
        return rsx! {
            p { style: "color: #999; font-style: italic;", "No transcript available." }
        };
    }

    let on_mouse_up = move |_| {
        spawn(async move {
            if let Some(selection) = read_selection().await {
                on_select.call(selection);
            }
        });
    };

    rsx! {
        div {
            class: "perun-transcript",
            onmouseup: on_mouse_up,

            for (index, segment) in segments.into_iter().enumerate() {
                TranscriptSegment {
                    key: "{index}",
                    segment,
                    active: active == Some(index),
                    on_seek,
                    on_reject,
                }
            }
        }
    }
}

#[component]
fn TranscriptSegment(
    segment: RenderSegment,
    active: bool,
    on_seek: EventHandler<f64>,
    on_reject: EventHandler<AnnotationSpan>,
) -> Element {
    let Some(annotation) = segment.annotation().cloned() else {
        return rsx! {
            span { "{segment.text}" }
        };
    };

    let css = SegmentStyle::for_annotation(&annotation).to_css();
    let title = tooltip(&segment);
    let class = if active { "perun-flag active" } else { "perun-flag" };
    let start = annotation.span.start;
    let can_reject = annotation.span.is_machine() && annotation.verdict != Some(Verdict::Rejected);
    let span = annotation.span;

    rsx! {
        span {
            class,
            style: "{css}",
            title,
            onclick: move |_| {
                if let Some(start) = start {
                    on_seek.call(start);
                }
            },
            "{segment.text}"
        }
        if can_reject {
            button {
                title: "Reject this flag",
                style: "border: none; background: none; color: #9ca3af; cursor: pointer; font-size: 0.75rem; padding: 0 2px;",
                onmouseup: move |evt: MouseEvent| evt.stop_propagation(),
                onclick: move |_| on_reject.call(span.clone()),
                "✕"
            }
        }
    }
}
