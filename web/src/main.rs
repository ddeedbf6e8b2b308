use dioxus::prelude::*;
use perun_core::{ClientConfig, PerunClient};
use ui::Hero;
use views::{Batch, Home, Job};

mod views;

/// Remembered batch ids; localStorage in the browser
#[cfg(target_arch = "wasm32")]
pub type SavedBatches = perun_core::LocalStorageBatchStore;
#[cfg(not(target_arch = "wasm32"))]
pub type SavedBatches = perun_core::MemoryBatchStore;

/// Backend access shared by every view
#[derive(Debug, Clone)]
pub struct Services {
    pub config: ClientConfig,
    pub client: PerunClient,
}

#[derive(Debug, Clone, Routable, PartialEq)]
#[rustfmt::skip]
pub enum Route {
    #[layout(Shell)]
        #[route("/")]
        Home {},
        #[route("/:batch_id")]
        Batch { batch_id: String },
        #[route("/:batch_id/:job_id")]
        Job { batch_id: String, job_id: String },
}

fn main() {
    dioxus::logger::initialize_default();

    let config = ClientConfig::from_env();
    match PerunClient::new(config.clone()) {
        Ok(client) => {
            tracing::info!("Using backend at {}", config.api_base_url);
            LaunchBuilder::new()
                .with_context(Services { config, client })
                .launch(App);
        }
        Err(e) => tracing::error!("Failed to create the API client: {}", e),
    }
}

#[component]
fn App() -> Element {
    use_context_provider(|| Signal::new(SavedBatches::default()));

    rsx! {
        Router::<Route> {}
    }
}

#[component]
fn Shell() -> Element {
    rsx! {
        div {
            style: "max-width: 960px; margin: 0 auto; padding: 0 1rem 3rem; font-family: system-ui, sans-serif;",
            Hero {}
            nav {
                style: "margin-bottom: 1rem;",
                Link { to: Route::Home {}, "← All batches" }
            }
            Outlet::<Route> {}
        }
    }
}
