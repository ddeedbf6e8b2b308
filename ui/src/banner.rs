use dioxus::prelude::*;

/// Dismissible error box shown above a view
#[component]
pub fn ErrorBanner(message: Option<String>, on_dismiss: EventHandler<()>) -> Element {
    let Some(message) = message else {
        return rsx! {};
    };

    rsx! {
        div {
            role: "alert",
            style: "
                background: #fee;
                border: 1px solid #fcc;
                border-radius: 8px;
                padding: 1rem;
                margin-bottom: 1rem;
                color: #c33;
                display: flex;
                justify-content: space-between;
                align-items: center;
            ",
            span { "Error: {message}" }
            button {
                style: "background: none; border: none; color: #c33; cursor: pointer; font-size: 1.1rem;",
                onclick: move |_| on_dismiss.call(()),
                "✕"
            }
        }
    }
}
