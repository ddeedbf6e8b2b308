use crate::{Route, Services};
use dioxus::prelude::*;
use perun_core::api::BatchDetails;
use perun_core::LatestOnly;
use ui::{BatchOverview, ErrorBanner};

#[component]
pub fn Batch(batch_id: String) -> Element {
    let services = use_context::<Services>();
    let guard = use_hook(LatestOnly::new);
    let mut details = use_signal(|| None::<BatchDetails>);
    let mut error = use_signal(|| None::<String>);
    let mut refresh = use_signal(|| 0u32);
    let navigator = use_navigator();
    let open_batch = batch_id.clone();

    let client = services.client.clone();
    use_effect(use_reactive!(|(batch_id)| {
        refresh();
        let ticket = guard.issue();
        let (client, guard, batch_id) = (client.clone(), guard.clone(), batch_id.clone());
        spawn(async move {
            let result = client.batch(&batch_id).await;
            match guard.accept(ticket, result) {
                Some(Ok(batch)) => details.set(Some(batch)),
                Some(Err(e)) => error.set(Some(e.to_string())),
                None => {}
            }
        });
    }));

    rsx! {
        ErrorBanner { message: error(), on_dismiss: move |_| error.set(None) }

        div {
            style: "display: flex; justify-content: space-between; align-items: center;",
            p { style: "color: #888; font-family: monospace;", "Batch {batch_id}" }
            button {
                style: "padding: 0.4rem 0.8rem; border: 1px solid #ddd; border-radius: 6px; background: white; cursor: pointer;",
                onclick: move |_| refresh += 1,
                "Refresh"
            }
        }

        if let Some(details) = details() {
            BatchOverview {
                details,
                on_open_job: move |job_id: String| {
                    navigator.push(Route::Job { batch_id: open_batch.clone(), job_id });
                },
            }
        } else {
            p { style: "color: #999;", "Loading batch…" }
        }
    }
}
