//! REST client for the analysis backend.
//!
//! One request per call; no retries. Any non-2xx response becomes
//! [`PerunError::Api`] carrying the status code and status text.

mod types;

pub use types::*;

use crate::config::ClientConfig;
use crate::error::{PerunError, Result};
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// A file to include in a batch upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Form fields of `POST /upload/`
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub name: String,
    pub description: String,
    pub default_definitions: Vec<String>,
    pub positive_examples: Vec<String>,
    pub negative_examples: Vec<String>,
    pub files: Vec<UploadFile>,
}

impl UploadRequest {
    /// Reject requests the backend would refuse anyway
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.files.is_empty() {
            return Err(PerunError::Configuration(
                "Please provide a batch name and select at least one file".to_string(),
            ));
        }
        Ok(())
    }

    fn into_form(self) -> Result<Form> {
        let mut form = Form::new()
            .text("name", self.name)
            .text("description", self.description)
            .text(
                "default_definitions",
                serde_json::to_string(&self.default_definitions)?,
            )
            .text(
                "positive_examples",
                serde_json::to_string(&self.positive_examples)?,
            )
            .text(
                "negative_examples",
                serde_json::to_string(&self.negative_examples)?,
            );

        for file in self.files {
            let mut part = Part::bytes(file.bytes).file_name(file.file_name);
            if let Some(content_type) = file.content_type {
                part = part.mime_str(&content_type)?;
            }
            form = form.part("files", part);
        }

        Ok(form)
    }
}

/// Client for the Perun backend
#[derive(Debug, Clone)]
pub struct PerunClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl PerunClient {
    /// Create a client for the configured backend
    pub fn new(config: ClientConfig) -> Result<Self> {
        #[allow(unused_mut)]
        let mut builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Upload a batch of files; returns the new batch id
    pub async fn upload_batch(&self, request: UploadRequest) -> Result<UploadResponse> {
        request.validate()?;
        info!(
            "Uploading batch {:?} with {} file(s)",
            request.name,
            request.files.len()
        );
        let form = request.into_form()?;
        let response = self
            .http
            .post(self.config.endpoint("/upload/"))
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response, "Upload failed")?;
        Ok(response.json().await?)
    }

    /// Batch name, description and job list
    pub async fn batch(&self, batch_id: &str) -> Result<BatchDetails> {
        self.get_json(&format!("/batch/{}", batch_id), "Failed to fetch batch")
            .await
    }

    /// Transcript and flagged spans of one job
    pub async fn job(&self, batch_id: &str, job_id: &str) -> Result<JobAnalysisResult> {
        self.get_json(
            &format!("/batch/{}/{}", batch_id, job_id),
            "Failed to fetch job",
        )
        .await
    }

    /// The job's original media file
    pub async fn job_file(&self, batch_id: &str, job_id: &str) -> Result<MediaBlob> {
        self.job_file_with_progress(batch_id, job_id, |_, _| {})
            .await
    }

    /// The job's original media file, reporting `(downloaded_bytes, total_bytes)`
    pub async fn job_file_with_progress<F>(
        &self,
        batch_id: &str,
        job_id: &str,
        mut progress_callback: F,
    ) -> Result<MediaBlob>
    where
        F: FnMut(u64, Option<u64>),
    {
        let url = self
            .config
            .endpoint(&format!("/batch/{}/{}/file", batch_id, job_id));
        debug!("Fetching media from {}", url);

        let response = self.http.get(&url).send().await?;
        let response = ensure_success(response, "Failed to fetch audio file")?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let total_size = response.content_length();

        let mut bytes = Vec::with_capacity(total_size.unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            bytes.extend_from_slice(&chunk);
            progress_callback(bytes.len() as u64, total_size);
        }

        Ok(MediaBlob {
            bytes,
            content_type,
        })
    }

    /// Record a human verdict
    pub async fn create_feedback(&self, feedback: &NewFeedback) -> Result<FeedbackRecord> {
        let response = self
            .http
            .post(self.config.endpoint("/feedback"))
            .json(feedback)
            .send()
            .await?;
        let response = ensure_success(response, "Failed to submit feedback")?;
        Ok(response.json().await?)
    }

    /// Feedback recorded for one job
    pub async fn job_feedback(&self, job_id: &str) -> Result<Vec<FeedbackRecord>> {
        self.get_json(
            &format!("/feedback/job/{}", job_id),
            "Failed to fetch feedback",
        )
        .await
    }

    /// Feedback recorded for every job of a batch
    pub async fn batch_feedback(&self, batch_id: &str) -> Result<Vec<FeedbackRecord>> {
        self.get_json(
            &format!("/feedback/batch/{}", batch_id),
            "Failed to fetch feedback",
        )
        .await
    }

    /// Feedback texts of a batch, grouped as re-training examples
    pub async fn batch_feedback_summary(&self, batch_id: &str) -> Result<FeedbackSummary> {
        self.get_json(
            &format!("/feedback/batch/{}/summary", batch_id),
            "Failed to fetch feedback summary",
        )
        .await
    }

    /// Remove a feedback record
    pub async fn delete_feedback(&self, feedback_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.config.endpoint(&format!("/feedback/{}", feedback_id)))
            .send()
            .await?;
        ensure_success(response, "Failed to delete feedback")?;
        Ok(())
    }

    /// Backend and database status
    pub async fn health(&self) -> Result<HealthStatus> {
        self.get_json("/health", "Health check failed").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let url = self.config.endpoint(path);
        debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        let response = ensure_success(response, what)?;
        Ok(response.json().await?)
    }
}

fn ensure_success(response: Response, what: &str) -> Result<Response> {
    let status: StatusCode = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(PerunError::api(what, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_validation() {
        let empty = UploadRequest::default();
        assert!(matches!(
            empty.validate(),
            Err(PerunError::Configuration(_))
        ));

        let ok = UploadRequest {
            name: "Rally recordings".into(),
            files: vec![UploadFile {
                file_name: "a.wav".into(),
                bytes: vec![0; 4],
                content_type: None,
            }],
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }
}
