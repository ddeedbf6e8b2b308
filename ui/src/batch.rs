//! Batch list, create-batch form and batch details.

use dioxus::prelude::*;
use perun_core::api::{BatchDetails, JobStatus, UploadFile, UploadRequest};
use perun_core::BatchProgress;
use tracing::{info, warn};

const CARD_STYLE: &str = "border: 1px solid #e5e7eb; border-radius: 10px; padding: 1rem; margin-bottom: 1rem;";

fn lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn status_colour(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Completed => "#15803d",
        JobStatus::Failed => "#b91c1c",
        JobStatus::Analysing => "#2563eb",
        JobStatus::Pending | JobStatus::Unknown => "#6b7280",
    }
}

#[component]
pub fn BatchList(
    ids: Vec<String>,
    on_open: EventHandler<String>,
    on_remove: EventHandler<String>,
) -> Element {
    rsx! {
        div {
            style: CARD_STYLE,
            h2 { style: "margin-top: 0; color: #333;", "Your batches" }
            if ids.is_empty() {
                p { style: "color: #999; font-style: italic;", "No batches yet. Create one below." }
            }
            ul {
                style: "list-style: none; padding: 0; margin: 0;",
                for id in ids {
                    li {
                        key: "{id}",
                        style: "display: flex; justify-content: space-between; padding: 0.4rem 0; border-bottom: 1px solid #f3f4f6;",
                        a {
                            style: "color: #2563eb; cursor: pointer; font-family: monospace;",
                            onclick: {
                                let id = id.clone();
                                move |_| on_open.call(id.clone())
                            },
                            "{id}"
                        }
                        button {
                            style: "border: none; background: none; color: #9ca3af; cursor: pointer;",
                            title: "Forget this batch",
                            onclick: {
                                let id = id.clone();
                                move |_| on_remove.call(id.clone())
                            },
                            "✕"
                        }
                    }
                }
            }
        }
    }
}

/// Form for `POST /upload/`; validation failures are shown inline
#[component]
pub fn CreateBatchForm(busy: bool, on_submit: EventHandler<UploadRequest>) -> Element {
    let mut name = use_signal(String::new);
    let mut description = use_signal(String::new);
    let mut definitions = use_signal(String::new);
    let mut positives = use_signal(String::new);
    let mut negatives = use_signal(String::new);
    let mut files = use_signal(Vec::<UploadFile>::new);
    let mut problem = use_signal(|| None::<String>);

    let on_files = move |evt: FormEvent| async move {
        let Some(engine) = evt.files() else {
            return;
        };
        let mut picked = Vec::new();
        for file_name in engine.files() {
            match engine.read_file(&file_name).await {
                Some(bytes) => picked.push(UploadFile {
                    file_name,
                    bytes,
                    content_type: None,
                }),
                None => warn!("Could not read {}", file_name),
            }
        }
        info!("Selected {} file(s)", picked.len());
        files.set(picked);
    };

    let submit = move |evt: FormEvent| {
        evt.prevent_default();
        let request = UploadRequest {
            name: name().trim().to_string(),
            description: description().trim().to_string(),
            default_definitions: lines(&definitions()),
            positive_examples: lines(&positives()),
            negative_examples: lines(&negatives()),
            files: files(),
        };
        match request.validate() {
            Ok(()) => {
                problem.set(None);
                on_submit.call(request);
            }
            Err(e) => problem.set(Some(e.to_string())),
        }
    };

    let field = "width: 100%; padding: 0.5rem; border: 1px solid #ddd; border-radius: 6px; margin-bottom: 0.75rem; box-sizing: border-box;";
    let file_count = files.read().len();

    rsx! {
        form {
            style: CARD_STYLE,
            onsubmit: submit,
            h2 { style: "margin-top: 0; color: #333;", "New batch" }

            input {
                style: field,
                placeholder: "Batch name",
                value: "{name}",
                oninput: move |evt| name.set(evt.value()),
            }
            textarea {
                style: field,
                placeholder: "Description",
                value: "{description}",
                oninput: move |evt| description.set(evt.value()),
            }
            textarea {
                style: field,
                placeholder: "Definitions of extremist speech, one per line",
                value: "{definitions}",
                oninput: move |evt| definitions.set(evt.value()),
            }
            textarea {
                style: field,
                placeholder: "Examples that should be flagged, one per line",
                value: "{positives}",
                oninput: move |evt| positives.set(evt.value()),
            }
            textarea {
                style: field,
                placeholder: "Examples that should not be flagged, one per line",
                value: "{negatives}",
                oninput: move |evt| negatives.set(evt.value()),
            }
            input {
                r#type: "file",
                accept: "audio/*,video/*",
                multiple: true,
                onchange: on_files,
            }
            if file_count > 0 {
                p { style: "color: #666; font-size: 0.9rem;", "{file_count} file(s) selected" }
            }
            if let Some(problem) = problem() {
                p { style: "color: #c33;", "{problem}" }
            }
            button {
                r#type: "submit",
                disabled: busy,
                style: "margin-top: 0.5rem; padding: 0.6rem 1.2rem; background: #2563eb; color: white; border: none; border-radius: 6px; cursor: pointer;",
                if busy { "Uploading…" } else { "Create batch" }
            }
        }
    }
}

#[component]
pub fn BatchOverview(details: BatchDetails, on_open_job: EventHandler<String>) -> Element {
    let progress = BatchProgress::new(&details);
    let percent = progress.completed_fraction() * 100.0;
    let in_progress = progress.pending + progress.analysing;
    let description = details.description.clone().filter(|d| !d.is_empty());

    rsx! {
        div {
            style: CARD_STYLE,
            h2 { style: "margin-top: 0; color: #333;", "{details.name}" }
            if let Some(description) = description {
                p { style: "color: #666;", "{description}" }
            }
            div {
                style: "background: #f3f4f6; border-radius: 4px; height: 8px; overflow: hidden; margin: 0.5rem 0;",
                div { style: "background: #15803d; height: 100%; width: {percent}%;" }
            }
            p {
                style: "color: #666; font-size: 0.9rem;",
                "{progress.completed} of {progress.total} completed"
                if progress.failed > 0 { ", {progress.failed} failed" }
                if !progress.is_finished() { ", {in_progress} in progress" }
            }
            ul {
                style: "list-style: none; padding: 0; margin: 0;",
                for job in details.jobs {
                    li {
                        key: "{job.job_id}",
                        style: "display: flex; justify-content: space-between; padding: 0.4rem 0; border-bottom: 1px solid #f3f4f6;",
                        if job.status == JobStatus::Completed {
                            a {
                                style: "color: #2563eb; cursor: pointer;",
                                onclick: {
                                    let job_id = job.job_id.clone();
                                    move |_| on_open_job.call(job_id.clone())
                                },
                                "{job.filename}"
                            }
                        } else {
                            span { "{job.filename}" }
                        }
                        span { style: format!("color: {};", status_colour(job.status)), "{job.status}" }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_drops_blank_entries() {
        assert_eq!(lines("  hate speech \n\n  threats\n"), vec!["hate speech", "threats"]);
    }
}
