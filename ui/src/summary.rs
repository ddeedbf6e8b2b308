use dioxus::prelude::*;
use perun_core::{AnalysisSummary, ExportFormat, RiskLevel};

fn risk_colours(level: RiskLevel) -> (&'static str, &'static str) {
    match level {
        RiskLevel::High => ("#fef2f2", "#b91c1c"),
        RiskLevel::Medium => ("#fffbeb", "#b45309"),
        RiskLevel::Low => ("#f0fdf4", "#15803d"),
    }
}

#[component]
pub fn SummaryPanel(summary: AnalysisSummary, on_export: EventHandler<ExportFormat>) -> Element {
    let (background, colour) = risk_colours(summary.risk_level);
    let confidence = summary
        .average_confidence
        .map(|c| format!("{:.0}%", c * 100.0))
        .unwrap_or_else(|| "–".to_string());
    let flagged = summary.flagged_label();
    let duration = summary.duration_label();
    let level = summary.risk_level;
    let message = level.message();

    rsx! {
        div {
            style: "border: 1px solid #e5e7eb; border-radius: 10px; padding: 1rem; margin-bottom: 1.5rem;",
            div {
                style: "background: {background}; color: {colour}; border-radius: 6px; padding: 0.75rem; margin-bottom: 1rem;",
                strong { "Risk {level}: " }
                "{message}"
            }
            div {
                style: "display: grid; grid-template-columns: repeat(4, 1fr); gap: 0.5rem; text-align: center;",
                Stat { label: "Duration", value: duration }
                Stat { label: "Flagged", value: flagged }
                Stat { label: "Segments", value: summary.spans_flagged.to_string() }
                Stat { label: "Avg. confidence", value: confidence }
            }
            div {
                style: "margin-top: 1rem; display: flex; gap: 0.5rem; justify-content: flex-end;",
                for format in [ExportFormat::Json, ExportFormat::Csv] {
                    button {
                        key: "{format}",
                        style: "padding: 0.4rem 0.8rem; border: 1px solid #ddd; border-radius: 6px; background: white; cursor: pointer;",
                        onclick: move |_| on_export.call(format),
                        "Export {format}"
                    }
                }
            }
        }
    }
}

#[component]
fn Stat(label: &'static str, value: String) -> Element {
    rsx! {
        div {
            div { style: "font-size: 1.3rem; font-weight: 600; color: #333;", "{value}" }
            div { style: "font-size: 0.8rem; color: #888;", "{label}" }
        }
    }
}
