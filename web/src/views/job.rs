use crate::Services;
use chrono::Utc;
use dioxus::prelude::*;
use perun_core::{
    load_job_view, AnalysisReport, AnalysisSummary, ExportFormat, JobView, LatestOnly,
    PcmProbe, PlaybackBridge, SelectionCapture, Waveform,
};
use tracing::{debug, info, warn};
use ui::{
    DomTransport, ErrorBanner, FeedbackList, FeedbackPopover, InteractiveTranscript, MediaPlayer,
    SharedBridge, SummaryPanel, WaveformChart,
};

const DOWNLOAD_JS: &str = r#"
const [name, mime, content] = await dioxus.recv();
const url = URL.createObjectURL(new Blob([content], { type: mime }));
const link = document.createElement("a");
link.href = url;
link.download = name;
link.click();
URL.revokeObjectURL(url);
"#;

fn download(name: String, mime: &'static str, content: String) {
    let eval = document::eval(DOWNLOAD_JS);
    if let Err(e) = eval.send((name, mime, content)) {
        warn!("Download failed: {:?}", e);
    }
}

#[component]
pub fn Job(batch_id: String, job_id: String) -> Element {
    let services = use_context::<Services>();
    let guard = use_hook(LatestOnly::new);
    let mut view = use_signal(|| None::<JobView>);
    let mut file_name = use_signal(String::new);
    let mut probe = use_signal(|| None::<PcmProbe>);
    let mut error = use_signal(|| None::<String>);
    let mut capture = use_signal(SelectionCapture::new);
    let mut bridge: SharedBridge = use_signal(|| PlaybackBridge::new(DomTransport::default()));

    let client = services.client.clone();
    let (effect_batch_id, effect_job_id) = (batch_id.clone(), job_id.clone());
    use_effect(use_reactive!(|(effect_batch_id, effect_job_id)| {
        let ticket = guard.issue();
        let (client, guard) = (client.clone(), guard.clone());
        let (batch_id, job_id) = (effect_batch_id.clone(), effect_job_id.clone());
        view.set(None);
        probe.set(None);
        capture.write().dismiss();

        spawn(async move {
            let loaded = load_job_view(&client, &batch_id, &job_id).await;
            match guard.accept(ticket, loaded) {
                Some(Ok(loaded)) => view.set(Some(loaded)),
                Some(Err(e)) => {
                    error.set(Some(e.to_string()));
                    return;
                }
                None => return,
            }

            let name = match client.batch(&batch_id).await {
                Ok(details) => details
                    .jobs
                    .into_iter()
                    .find(|job| job.job_id == job_id)
                    .map(|job| job.filename),
                Err(e) => {
                    debug!("Could not fetch batch details: {}", e);
                    None
                }
            };
            if let Some(name) = guard.accept(ticket, name.unwrap_or_else(|| job_id.clone())) {
                file_name.set(name);
            }

            match client.job_file(&batch_id, &job_id).await {
                Ok(blob) => {
                    let extension = blob.extension_hint();
                    match PcmProbe::from_media_bytes(blob.bytes, extension) {
                        Ok(decoded) => {
                            if let Some(decoded) = guard.accept(ticket, decoded) {
                                probe.set(Some(decoded));
                            }
                        }
                        Err(e) => info!("Showing an approximate waveform: {}", e),
                    }
                }
                Err(e) => warn!("Could not fetch media for the waveform: {}", e),
            }
        });
    }));

    let media_duration = use_memo(move || bridge.read().state().duration);
    let duration = use_memo(move || {
        let from_media = media_duration();
        if from_media > 0.0 {
            from_media
        } else {
            probe.read().as_ref().map(PcmProbe::duration).unwrap_or(0.0)
        }
    });

    let gain = services.config.waveform_gain;
    let waveform = use_memo(move || {
        let spans = view
            .read()
            .as_ref()
            .map(|v| v.spans().to_vec())
            .unwrap_or_default();
        // Clones share the decoded samples
        let mut probe = probe.read().clone();
        Waveform::build(probe.as_mut(), duration(), gain, &spans)
    });

    let state = bridge.read().state();
    let source = services
        .config
        .endpoint(&format!("/batch/{}/{}/file", batch_id, job_id));
    let skip_seconds = services.config.skip_seconds;

    let Some(current) = view() else {
        return rsx! {
            ErrorBanner { message: error(), on_dismiss: move |_| error.set(None) }
            p { style: "color: #999;", "Loading analysis…" }
        };
    };

    let known_duration = Some(duration()).filter(|d| *d > 0.0);
    let summary = AnalysisSummary::new(current.spans(), known_duration);
    let active = current.active_segment(state.position);
    let pending = capture.read().pending().cloned();

    let export = move |format: ExportFormat| {
        let Some(current) = view() else {
            return;
        };
        let report = AnalysisReport::new(file_name(), current.spans(), known_duration, Utc::now());
        match report.render(format) {
            Ok(content) => download(report.file_name(format), format.mime_type(), content),
            Err(e) => error.set(Some(e.to_string())),
        }
    };

    let submit_client = services.client.clone();
    let (submit_batch, submit_job) = (batch_id.clone(), job_id.clone());
    let confirm = move |_| {
        let Some(request) = capture.write().confirm(&submit_job, &submit_batch) else {
            return;
        };
        let client = submit_client.clone();
        spawn(async move {
            match client.create_feedback(&request).await {
                Ok(record) => {
                    if let Some(current) = view.write().as_mut() {
                        current.push_feedback(record);
                    }
                }
                Err(e) => error.set(Some(e.to_string())),
            }
        });
    };

    let reject_client = services.client.clone();
    let (reject_batch, reject_job) = (batch_id.clone(), job_id.clone());
    let reject = move |span| {
        let request = SelectionCapture::reject_span(&reject_job, &reject_batch, &span);
        let client = reject_client.clone();
        spawn(async move {
            match client.create_feedback(&request).await {
                Ok(record) => {
                    if let Some(current) = view.write().as_mut() {
                        current.push_feedback(record);
                    }
                }
                Err(e) => error.set(Some(e.to_string())),
            }
        });
    };

    let delete_client = services.client.clone();
    let delete = move |feedback_id: String| {
        let client = delete_client.clone();
        spawn(async move {
            match client.delete_feedback(&feedback_id).await {
                Ok(()) => {
                    if let Some(current) = view.write().as_mut() {
                        current.remove_feedback(&feedback_id);
                    }
                }
                Err(e) => error.set(Some(e.to_string())),
            }
        });
    };

    rsx! {
        div {
            // Any press outside the popover drops the pending selection
            onmousedown: move |_| capture.write().dismiss(),

            ErrorBanner { message: error(), on_dismiss: move |_| error.set(None) }

            h2 { style: "color: #333;", "{file_name}" }

            SummaryPanel { summary, on_export: export }

            MediaPlayer {
                key: "{job_id}",
                bridge,
                source,
                skip_seconds,
            }

            WaveformChart {
                waveform: waveform(),
                position: state.position,
                on_seek: move |seconds| bridge.write().seek_to(seconds),
            }

            InteractiveTranscript {
                segments: current.segments().to_vec(),
                active,
                on_seek: move |seconds| bridge.write().seek_to(seconds),
                on_select: move |(text, bounds): (String, perun_core::Rect)| {
                    let current = view.read();
                    if let Some(current) = current.as_ref() {
                        capture
                            .write()
                            .on_pointer_up(&text, bounds, current.segments(), current.feedback());
                    }
                },
                on_reject: reject,
            }

            FeedbackPopover {
                pending,
                on_confirm: confirm,
                on_dismiss: move |_| capture.write().dismiss(),
            }

            FeedbackList {
                records: current.feedback().to_vec(),
                on_delete: delete,
            }
        }
    }
}
