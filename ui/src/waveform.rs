use dioxus::prelude::*;
use perun_core::annotation::Flag;
use perun_core::Waveform;

const CHART_HEIGHT: f64 = 100.0;

fn bar_colour(flag: Option<Flag>, played: bool) -> &'static str {
    match (flag, played) {
        (Some(Flag::Extremist), _) => "#dc2626",
        (Some(Flag::Mild), _) => "#f59e0b",
        (_, true) => "#3b82f6",
        _ => "#cbd5e1",
    }
}

/// Bar chart of the media volume; flagged bars are tinted, click seeks
#[component]
pub fn WaveformChart(waveform: Waveform, position: f64, on_seek: EventHandler<f64>) -> Element {
    if waveform.points.is_empty() {
        return rsx! {};
    }

    let count = waveform.points.len();
    let flagged = waveform.flagged_count();
    let current = waveform.index_at(position);
    let synthetic = waveform.synthetic;
    let points = waveform.points;

    rsx! {
        div {
            style: "margin-bottom: 1.5rem;",
            div {
                style: "display: flex; justify-content: space-between; color: #666; font-size: 0.85rem; margin-bottom: 0.25rem;",
                span { "Volume" }
                span {
                    "{flagged} of {count} samples flagged"
                    if synthetic { " · approximate" }
                }
            }
            svg {
                width: "100%",
                height: "{CHART_HEIGHT}",
                view_box: "0 0 {count} {CHART_HEIGHT}",
                preserve_aspect_ratio: "none",
                for (index, point) in points.into_iter().enumerate() {
                    rect {
                        key: "{index}",
                        class: "perun-bar",
                        x: format!("{}", index as f64 + 0.1),
                        y: format!("{}", CHART_HEIGHT - point.amplitude.max(1.0) as f64),
                        width: "0.8",
                        height: format!("{}", point.amplitude.max(1.0)),
                        fill: bar_colour(point.flag, current.is_some_and(|c| index <= c)),
                        onclick: move |_| on_seek.call(point.time),
                        title { {point.time_label()} }
                    }
                }
            }
        }
    }
}
