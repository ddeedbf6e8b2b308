use crate::{Route, SavedBatches, Services};
use dioxus::prelude::*;
use perun_core::api::UploadRequest;
use perun_core::BatchStore;
use tracing::{info, warn};
use ui::{BatchList, CreateBatchForm, ErrorBanner};

#[component]
pub fn Home() -> Element {
    let services = use_context::<Services>();
    let mut store = use_context::<Signal<SavedBatches>>();
    let mut error = use_signal(|| None::<String>);
    let mut busy = use_signal(|| false);
    let mut lookup = use_signal(String::new);
    let navigator = use_navigator();

    let ids = store.read().list().unwrap_or_else(|e| {
        warn!("Could not read saved batches: {}", e);
        Vec::new()
    });

    let upload = move |request: UploadRequest| {
        let client = services.client.clone();
        busy.set(true);
        spawn(async move {
            match client.upload_batch(request).await {
                Ok(response) => {
                    info!("Created batch {}", response.batch_id);
                    if let Err(e) = store.write().add(&response.batch_id) {
                        error.set(Some(e.to_string()));
                    }
                    navigator.push(Route::Batch {
                        batch_id: response.batch_id,
                    });
                }
                Err(e) => error.set(Some(e.to_string())),
            }
            busy.set(false);
        });
    };

    let open_existing = move |evt: FormEvent| {
        evt.prevent_default();
        let batch_id = lookup().trim().to_string();
        match store.write().add(&batch_id) {
            Ok(()) => {
                lookup.set(String::new());
                navigator.push(Route::Batch { batch_id });
            }
            Err(e) => error.set(Some(e.to_string())),
        }
    };

    rsx! {
        ErrorBanner { message: error(), on_dismiss: move |_| error.set(None) }

        BatchList {
            ids,
            on_open: move |batch_id: String| {
                navigator.push(Route::Batch { batch_id });
            },
            on_remove: move |batch_id: String| {
                if let Err(e) = store.write().remove(&batch_id) {
                    error.set(Some(e.to_string()));
                }
            },
        }

        form {
            style: "display: flex; gap: 0.5rem; margin-bottom: 1rem;",
            onsubmit: open_existing,
            input {
                style: "flex: 1; padding: 0.5rem; border: 1px solid #ddd; border-radius: 6px;",
                placeholder: "Open a batch by id",
                value: "{lookup}",
                oninput: move |evt| lookup.set(evt.value()),
            }
            button {
                r#type: "submit",
                style: "padding: 0.5rem 1rem; border: 1px solid #ddd; border-radius: 6px; background: white; cursor: pointer;",
                "Open"
            }
        }

        CreateBatchForm { busy: busy(), on_submit: upload }
    }
}
