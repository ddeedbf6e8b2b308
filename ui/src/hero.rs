use dioxus::prelude::*;

const PERUN_CSS: Asset = asset!("/assets/styling/perun.css");

#[component]
pub fn Hero() -> Element {
    rsx! {
        document::Link { rel: "stylesheet", href: PERUN_CSS }

        div {
            id: "hero",
            div {
                style: "text-align: center; padding: 2rem 0 1rem;",
                h1 {
                    style: "font-size: 2.5rem; margin-bottom: 0.5rem; color: #333;",
                    "Perun"
                }
                p {
                    style: "font-size: 1.1rem; color: #666;",
                    "Review flagged speech, listen along and record your verdicts"
                }
            }
        }
    }
}
