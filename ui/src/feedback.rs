use dioxus::prelude::*;
use perun_core::api::{FeedbackRecord, FeedbackType};
use perun_core::PendingSelection;

/// Floating confirm box anchored above a fresh selection
#[component]
pub fn FeedbackPopover(
    pending: Option<PendingSelection>,
    on_confirm: EventHandler<()>,
    on_dismiss: EventHandler<()>,
) -> Element {
    let Some(pending) = pending else {
        return rsx! {};
    };

    let preview = if pending.text.chars().count() > 60 {
        let head: String = pending.text.chars().take(57).collect();
        format!("{head}…")
    } else {
        pending.text.clone()
    };

    rsx! {
        div {
            class: "perun-popover",
            style: "left: {pending.anchor.x}px; top: {pending.anchor.y}px;",
            onmousedown: move |evt: MouseEvent| evt.stop_propagation(),
            onmouseup: move |evt: MouseEvent| evt.stop_propagation(),
            span {
                style: "max-width: 240px; color: #444; font-size: 0.85rem; align-self: center;",
                "“{preview}”"
            }
            button {
                style: "padding: 0.3rem 0.7rem; background: #dc2626; color: white; border: none; border-radius: 5px; cursor: pointer;",
                onclick: move |_| on_confirm.call(()),
                "Flag as violation"
            }
            button {
                style: "padding: 0.3rem 0.7rem; background: white; border: 1px solid #ddd; border-radius: 5px; cursor: pointer;",
                onclick: move |_| on_dismiss.call(()),
                "Cancel"
            }
        }
    }
}

/// Verdicts recorded for the current job, newest last
#[component]
pub fn FeedbackList(records: Vec<FeedbackRecord>, on_delete: EventHandler<String>) -> Element {
    if records.is_empty() {
        return rsx! {};
    }

    rsx! {
        div {
            style: "border: 1px solid #e5e7eb; border-radius: 10px; padding: 1rem; margin-top: 1.5rem;",
            h3 { style: "margin-top: 0; color: #333;", "Your feedback" }
            ul {
                style: "list-style: none; padding: 0; margin: 0;",
                for record in records {
                    li {
                        key: "{record.id}",
                        style: "display: flex; justify-content: space-between; gap: 1rem; padding: 0.3rem 0;",
                        span {
                            style: if record.feedback_type == FeedbackType::Positive { "color: #b91c1c;" } else { "color: #6b7280; text-decoration: line-through;" },
                            "“{record.text}”"
                        }
                        button {
                            style: "border: none; background: none; color: #9ca3af; cursor: pointer;",
                            title: "Withdraw",
                            onclick: {
                                let id = record.id.clone();
                                move |_| on_delete.call(id.clone())
                            },
                            "✕"
                        }
                    }
                }
            }
        }
    }
}
