//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend used when neither the caller nor `PERUN_API_URL` provide one.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable overriding the backend URL
pub const API_URL_ENV: &str = "PERUN_API_URL";

/// Configuration shared by the CLI and the web views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the analysis backend, without trailing slash
    pub api_base_url: String,

    /// Per-request timeout (native targets only)
    pub timeout: Option<Duration>,

    /// Seconds moved by skip forward / skip backward
    pub skip_seconds: f64,

    /// Multiplier applied to RMS before scaling to the 0-100 chart range
    pub waveform_gain: f32,

    /// Enable verbose debug output
    pub verbose: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            timeout: Some(Duration::from_secs(30)),
            skip_seconds: 10.0,
            waveform_gain: 4.0,
            verbose: false,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, with the backend URL taken from `PERUN_API_URL` when set
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => config.with_api_base_url(url),
            _ => config,
        }
    }

    /// Set the backend URL
    pub fn with_api_base_url<S: Into<String>>(mut self, url: S) -> Self {
        let url = url.into();
        self.api_base_url = url.trim().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the skip distance in seconds
    pub fn with_skip_seconds(mut self, seconds: f64) -> Self {
        self.skip_seconds = seconds.max(0.0);
        self
    }

    /// Set the waveform RMS gain
    pub fn with_waveform_gain(mut self, gain: f32) -> Self {
        self.waveform_gain = gain;
        self
    }

    /// Enable or disable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Absolute URL for an API path such as `/batch/abc`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }
}
