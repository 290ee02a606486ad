//! HTTP client for the transform service
//!
//! The transform service performs the actual import/validate/export/transfer
//! computation and exposes an asynchronous job API: a submission returns a
//! status URL in its `Location` header, the status document links to the
//! terminal action report.

use crate::adapters::transform::models::{ActionReportWrapper, JobStatusResponse};
use crate::config::TransformServiceConfig;
use crate::domain::provider::DataFormat;
use crate::domain::{ConductorError, Referential, Result, TransformError};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use std::time::Duration;

/// Stage-specific submission endpoint
///
/// Maps to the path segment after the referential:
/// `importer/{format}`, `exporter/{format}` or `validator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTarget {
    Importer(DataFormat),
    Exporter(ExportFormat),
    Validator,
}

/// Export flavor selected on the exporter endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Gtfs,
    Transfer,
}

impl SubmitTarget {
    fn path(&self) -> &'static str {
        match self {
            SubmitTarget::Importer(DataFormat::Gtfs) => "importer/gtfs",
            SubmitTarget::Importer(DataFormat::Netex) => "importer/netexprofile",
            SubmitTarget::Exporter(ExportFormat::Gtfs) => "exporter/gtfs",
            SubmitTarget::Exporter(ExportFormat::Transfer) => "exporter/transfer",
            SubmitTarget::Validator => "validator",
        }
    }
}

/// Client for the transform service's job API
pub struct TransformClient {
    base_url: String,
    client: Client,
}

impl TransformClient {
    /// Creates a client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &TransformServiceConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                ConductorError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Base URL of the transform service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submits a job and returns its status URL
    ///
    /// The multipart body carries the JSON parameter document as
    /// `parameters.json` and, for imports, the raw feed file. The status
    /// URL is taken from the `Location` response header.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter document is empty, a feed part has
    /// an empty name or no content, the service returns a non-2xx status,
    /// or the response carries no `Location` header.
    pub async fn submit_job(
        &self,
        referential: &Referential,
        target: SubmitTarget,
        parameters_json: &str,
        feed: Option<(String, Vec<u8>)>,
    ) -> Result<String> {
        if parameters_json.trim().is_empty() {
            return Err(TransformError::MissingParameters(format!(
                "empty parameter document for {referential}"
            ))
            .into());
        }

        let mut form = Form::new().part(
            "parameters",
            Part::bytes(parameters_json.as_bytes().to_vec()).file_name("parameters.json"),
        );

        if let Some((file_name, bytes)) = feed {
            if file_name.trim().is_empty() {
                return Err(TransformError::MissingFile(format!(
                    "feed part with no file name for {referential}"
                ))
                .into());
            }
            if bytes.is_empty() {
                return Err(
                    TransformError::MissingFile(format!("empty feed file {file_name}")).into(),
                );
            }
            form = form.part("feed", Part::bytes(bytes).file_name(file_name));
        }

        let url = format!("{}/referentials/{}/{}", self.base_url, referential, target.path());
        tracing::debug!(url = %url, "Submitting job to transform service");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransformError::ConnectionFailed(e.to_string()))?;

        let response = Self::check_status(response).await?;

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                TransformError::MissingLocation(format!("submission to {url} returned no Location"))
            })?;

        tracing::debug!(status_url = %location, "Job submitted");
        Ok(location)
    }

    /// Fetches a job's status document
    pub async fn job_status(&self, status_url: &str) -> Result<JobStatusResponse> {
        let response = self
            .client
            .get(status_url)
            .send()
            .await
            .map_err(|e| TransformError::ConnectionFailed(e.to_string()))?;

        let response = Self::check_status(response).await?;

        response
            .json::<JobStatusResponse>()
            .await
            .map_err(|e| TransformError::InvalidResponse(e.to_string()).into())
    }

    /// Fetches a job's terminal action report
    pub async fn action_report(&self, report_url: &str) -> Result<ActionReportWrapper> {
        let response = self
            .client
            .get(report_url)
            .send()
            .await
            .map_err(|e| TransformError::ConnectionFailed(e.to_string()))?;

        let response = Self::check_status(response).await?;

        response
            .json::<ActionReportWrapper>()
            .await
            .map_err(|e| TransformError::InvalidResponse(e.to_string()).into())
    }

    /// Lists jobs in a referential
    ///
    /// Used to check for sibling in-flight jobs before advancing the
    /// pipeline past import or validation. An optional action filter is
    /// passed through as a query parameter.
    pub async fn jobs(
        &self,
        referential: &Referential,
        action: Option<&str>,
    ) -> Result<Vec<JobStatusResponse>> {
        let url = format!("{}/referentials/{}/jobs", self.base_url, referential);

        let mut request = self.client.get(&url);
        if let Some(action) = action {
            request = request.query(&[("action", action)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransformError::ConnectionFailed(e.to_string()))?;

        let response = Self::check_status(response).await?;

        response
            .json::<Vec<JobStatusResponse>>()
            .await
            .map_err(|e| TransformError::InvalidResponse(e.to_string()).into())
    }

    /// Downloads a job artifact (e.g. an exported archive) from a link
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransformError::ConnectionFailed(e.to_string()))?;

        let response = Self::check_status(response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransformError::InvalidResponse(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// Maps non-2xx responses to domain errors
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        let err = if status.is_server_error() {
            TransformError::ServerError {
                status: status.as_u16(),
                message,
            }
        } else if status == StatusCode::NOT_FOUND {
            TransformError::InvalidResponse(format!("resource not found: {message}"))
        } else {
            TransformError::ClientError {
                status: status.as_u16(),
                message,
            }
        };
        Err(err.into())
    }
}
