//! Perun Core Library
//!
//! Client-side logic for reviewing extremist-speech analysis results: aligning
//! flagged spans onto transcripts, colouring them by confidence, keeping media
//! playback in sync with the transcript, capturing reviewer feedback and
//! talking to the analysis backend.

pub mod align;
pub mod annotation;
pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch_guard;
pub mod playback;
pub mod selection;
pub mod store;
pub mod style;
pub mod summary;
pub mod timestamp;
pub mod view;
pub mod waveform;

pub use align::{align, Annotation, RenderSegment, SegmentKind, Verdict};
pub use annotation::{AnnotationSource, AnnotationSpan, Flag, Transcript};
pub use api::PerunClient;
pub use config::ClientConfig;
pub use error::{PerunError, Result};
pub use export::{AnalysisReport, ExportFormat};
pub use fetch_guard::{LatestOnly, Ticket};
pub use playback::{MediaEvent, MediaTransport, PlaybackBridge, PlaybackPhase, PlaybackState};
pub use selection::{PendingSelection, Rect, SelectionCapture};
#[cfg(not(target_arch = "wasm32"))]
pub use store::FileBatchStore;
#[cfg(target_arch = "wasm32")]
pub use store::LocalStorageBatchStore;
pub use store::{BatchStore, MemoryBatchStore, BATCH_IDS_KEY};
pub use style::SegmentStyle;
pub use summary::{AnalysisSummary, BatchProgress, RiskLevel};
pub use view::JobView;
pub use waveform::{AmplitudeProbe, PcmProbe, Waveform};

/// Fetch a job together with its feedback and build its view
pub async fn load_job_view(client: &PerunClient, batch_id: &str, job_id: &str) -> Result<JobView> {
    let result = client.job(batch_id, job_id).await?;
    let feedback = client.job_feedback(job_id).await?;

    let mut view = JobView::from_result(&result);
    view.set_feedback(feedback);
    Ok(view)
}
