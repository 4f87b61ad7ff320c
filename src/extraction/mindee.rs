//! Mindee prediction client: one multipart upload per document.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error};

use crate::error::ExtractionError;
use crate::extraction::{DocumentExtractor, DocumentKind, PredictOutcome};

/// Client for the Mindee prediction endpoints.
pub struct MindeeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl MindeeClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::Request {
                document: "client".into(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, kind: DocumentKind) -> String {
        let product = match kind {
            DocumentKind::Identity => "passports",
            DocumentKind::VehicleRegistration => "international_id",
        };
        format!("{}/v1/products/{product}/v1/predict", self.base_url)
    }

    async fn post_document(
        &self,
        kind: DocumentKind,
        image: Vec<u8>,
    ) -> Result<PredictOutcome, ExtractionError> {
        let part = Part::bytes(image).file_name(kind.upload_name());
        let form = Form::new().part("document", part);

        let resp = self
            .client
            .post(self.endpoint(kind))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ExtractionError::Request {
                document: kind.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(PredictOutcome::NotFound);
        }
        if !status.is_success() {
            return Err(ExtractionError::Status {
                document: kind.to_string(),
                status: status.as_u16(),
            });
        }

        let payload: serde_json::Value =
            resp.json()
                .await
                .map_err(|e| ExtractionError::InvalidResponse {
                    document: kind.to_string(),
                    reason: e.to_string(),
                })?;
        debug!(document = %kind, "Prediction received");
        Ok(PredictOutcome::Success(payload))
    }
}

#[async_trait]
impl DocumentExtractor for MindeeClient {
    async fn predict(&self, kind: DocumentKind, image: Vec<u8>) -> PredictOutcome {
        match self.post_document(kind, image).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(document = %kind, error = %e, "Prediction request failed");
                PredictOutcome::Error(e)
            }
        }
    }
}
