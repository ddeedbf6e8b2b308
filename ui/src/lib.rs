//! This crate contains all shared UI for the workspace.

mod banner;
pub use banner::ErrorBanner;

mod batch;
pub use batch::{BatchList, BatchOverview, CreateBatchForm};

mod feedback;
pub use feedback::{FeedbackList, FeedbackPopover};

mod hero;
pub use hero::Hero;

mod player;
pub use player::{DomTransport, MediaPlayer, SharedBridge, AUDIO_ELEMENT_ID};

mod summary;
pub use summary::SummaryPanel;

mod transcript;
pub use transcript::InteractiveTranscript;

mod waveform;
pub use waveform::WaveformChart;
