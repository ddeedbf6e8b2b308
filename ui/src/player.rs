//! Audio player bound to a [`PlaybackBridge`].
//!
//! The `<audio>` element is driven through small JavaScript snippets; its
//! events come back over a long-lived eval channel and are fed to the bridge.

use dioxus::prelude::*;
use perun_core::error::Result;
use perun_core::{MediaEvent, MediaTransport, PlaybackBridge, PlaybackPhase};
use serde::Deserialize;
use tracing::{debug, warn};

/// Element id of the page's single audio element
pub const AUDIO_ELEMENT_ID: &str = "perun-audio";

/// Bridge type shared between the player, the transcript and the waveform
pub type SharedBridge = Signal<PlaybackBridge<DomTransport>>;

/// [`MediaTransport`] over an `<audio>` element in the page
#[derive(Debug, Clone)]
pub struct DomTransport {
    element_id: String,
}

impl DomTransport {
    pub fn new(element_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
        }
    }

    fn run(&self, body: &str) {
        let script = format!(
            "const el = document.getElementById({}); if (el) {{ {} }}",
            js_string(&self.element_id),
            body
        );
        document::eval(&script);
    }
}

impl Default for DomTransport {
    fn default() -> Self {
        Self::new(AUDIO_ELEMENT_ID)
    }
}

impl MediaTransport for DomTransport {
    fn set_source(&mut self, source: Option<&str>) {
        match source {
            Some(url) => self.run(&format!("el.src = {}; el.load();", js_string(url))),
            None => self.run("el.pause(); el.removeAttribute('src'); el.load();"),
        }
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.run(&format!("el.currentTime = {};", seconds));
    }

    // Rejections of the play promise surface later as an error event
    fn play(&mut self) -> Result<()> {
        self.run(
            "el.play().catch((e) => el.dispatchEvent(new CustomEvent('perun-play-error', \
             { detail: String((e && e.message) || e) })));",
        );
        Ok(())
    }

    fn pause(&mut self) {
        self.run("el.pause();");
    }

    fn set_volume(&mut self, volume: f64) {
        self.run(&format!("el.volume = {};", volume));
    }

    fn set_muted(&mut self, muted: bool) {
        self.run(&format!("el.muted = {};", muted));
    }
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Event forwarded by the listener script
#[derive(Debug, Deserialize)]
struct ElementMessage {
    kind: String,
    /// `null` when the browser reports NaN or Infinity
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

impl ElementMessage {
    fn into_event(self) -> Option<MediaEvent> {
        let value = self.value.unwrap_or(0.0);
        let event = match self.kind.as_str() {
            "loadedmetadata" => MediaEvent::LoadedMetadata { duration: value },
            "durationchange" => MediaEvent::DurationChange { duration: value },
            "timeupdate" => MediaEvent::TimeUpdate { position: value },
            "play" => MediaEvent::Play,
            "pause" => MediaEvent::Pause,
            "ended" => MediaEvent::Ended,
            "error" => MediaEvent::Error {
                message: self.message.unwrap_or_else(|| "unknown media error".to_string()),
            },
            other => {
                debug!("Ignoring media event {:?}", other);
                return None;
            }
        };
        Some(event)
    }
}

fn listener_script(element_id: &str) -> String {
    format!(
        r#"
const el = document.getElementById({id});
if (el) {{
    const send = (kind, extra) => dioxus.send(Object.assign({{ kind }}, extra || {{}}));
    el.addEventListener("loadedmetadata", () => send("loadedmetadata", {{ value: el.duration }}));
    el.addEventListener("durationchange", () => send("durationchange", {{ value: el.duration }}));
    el.addEventListener("timeupdate", () => send("timeupdate", {{ value: el.currentTime }}));
    el.addEventListener("play", () => send("play"));
    el.addEventListener("pause", () => send("pause"));
    el.addEventListener("ended", () => send("ended"));
    el.addEventListener("error", () => send("error", {{
        message: el.error ? (el.error.message || "media error " + el.error.code) : "media error",
    }}));
    el.addEventListener("perun-play-error", (e) => send("error", {{ message: e.detail }}));
}}
await new Promise(() => {{}});
"#,
        id = js_string(element_id)
    )
}

/// Attach to the audio element, load `source` and pump its events into the
/// bridge until the component goes away.
async fn pump_events(mut bridge: SharedBridge, source: String) {
    let element_id = bridge.peek().transport().element_id.clone();
    let mut events = document::eval(&listener_script(&element_id));
    bridge.write().set_source(Some(&source));

    loop {
        match events.recv::<ElementMessage>().await {
            Ok(message) => {
                if let Some(event) = message.into_event() {
                    bridge.write().handle_event(event);
                }
            }
            Err(e) => {
                warn!("Media event channel closed: {:?}", e);
                break;
            }
        }
    }
}

#[component]
pub fn MediaPlayer(mut bridge: SharedBridge, source: String, skip_seconds: f64) -> Element {
    let state = bridge.read().state();
    let playing = state.is_playing();
    let ready = state.phase.is_ready();
    let clock = state.clock_label();
    let volume = if state.muted { 0.0 } else { state.volume };

    let status = match (&state.phase, &state.status) {
        (_, Some(status)) => Some(status.clone()),
        (PlaybackPhase::Loading, None) => Some("Loading media…".to_string()),
        (PlaybackPhase::Empty, None) => Some("No media loaded".to_string()),
        _ => None,
    };

    let button_style = "padding: 0.5rem 0.9rem; border: 1px solid #ddd; border-radius: 6px; background: white; cursor: pointer;";

    rsx! {
        div {
            style: "
                border: 1px solid #e5e7eb;
                border-radius: 10px;
                padding: 1rem;
                margin-bottom: 1.5rem;
                background: #fafafa;
            ",

            audio {
                id: AUDIO_ELEMENT_ID,
                preload: "metadata",
                onmounted: move |_| {
                    let source = source.clone();
                    spawn(pump_events(bridge, source));
                },
            }

            div {
                style: "display: flex; align-items: center; gap: 0.5rem; flex-wrap: wrap;",
                button {
                    style: button_style,
                    disabled: !ready,
                    onclick: move |_| bridge.write().skip_backward(skip_seconds),
                    "⏪ {skip_seconds:.0}s"
                }
                button {
                    style: button_style,
                    disabled: !ready,
                    onclick: move |_| bridge.write().toggle_play(),
                    if playing { "⏸ Pause" } else { "▶ Play" }
                }
                button {
                    style: button_style,
                    disabled: !ready,
                    onclick: move |_| bridge.write().skip_forward(skip_seconds),
                    "{skip_seconds:.0}s ⏩"
                }
                span {
                    style: "font-family: monospace; margin-left: 0.5rem; color: #555;",
                    "{clock}"
                }
                div {
                    style: "margin-left: auto; display: flex; align-items: center; gap: 0.25rem;",
                    button {
                        style: button_style,
                        onclick: move |_| bridge.write().toggle_mute(),
                        if state.muted { "🔇" } else { "🔊" }
                    }
                    input {
                        r#type: "range",
                        min: "0",
                        max: "1",
                        step: "0.01",
                        value: "{volume}",
                        oninput: move |evt| {
                            if let Ok(volume) = evt.value().parse::<f64>() {
                                bridge.write().set_volume(volume);
                            }
                        },
                    }
                }
            }

            input {
                r#type: "range",
                style: "width: 100%; margin-top: 0.75rem;",
                min: "0",
                max: "{state.duration}",
                step: "0.1",
                value: "{state.position}",
                disabled: !ready,
                oninput: move |evt| {
                    if let Ok(seconds) = evt.value().parse::<f64>() {
                        bridge.write().seek_to(seconds);
                    }
                },
            }

            if let Some(status) = status {
                p { style: "margin: 0.5rem 0 0; color: #888; font-size: 0.9rem;", "{status}" }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(json: &str) -> Option<MediaEvent> {
        serde_json::from_str::<ElementMessage>(json)
            .unwrap()
            .into_event()
    }

    #[test]
    fn test_element_messages_map_to_events() {
        assert_eq!(
            message(r#"{"kind":"timeupdate","value":12.5}"#),
            Some(MediaEvent::TimeUpdate { position: 12.5 })
        );
        assert_eq!(
            message(r#"{"kind":"loadedmetadata","value":null}"#),
            Some(MediaEvent::LoadedMetadata { duration: 0.0 })
        );
        assert_eq!(
            message(r#"{"kind":"error","message":"NotAllowedError"}"#),
            Some(MediaEvent::Error {
                message: "NotAllowedError".into()
            })
        );
        assert_eq!(message(r#"{"kind":"seeking"}"#), None);
    }

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
    }
}
