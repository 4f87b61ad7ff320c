//! Extraction gateway: pulls the six policy fields out of two document photos.
//!
//! Each image is sent to its own prediction endpoint. A "not found" answer from
//! either endpoint swaps the whole result for `ExtractedRecord::fallback()`;
//! the returned `Extraction` says which of the two the caller got.

pub mod mindee;
pub mod record;

pub use mindee::MindeeClient;
pub use record::{ExtractedRecord, UNKNOWN};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::channels::PhotoSource;
use crate::error::ExtractionError;

/// Which document an image holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Passport or other identity document.
    Identity,
    /// Vehicle registration certificate.
    VehicleRegistration,
}

impl DocumentKind {
    /// File name used for the multipart upload.
    pub fn upload_name(&self) -> &'static str {
        match self {
            Self::Identity => "passport.jpg",
            Self::VehicleRegistration => "vehicle.jpg",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Identity => "identity",
            Self::VehicleRegistration => "vehicle_registration",
        };
        write!(f, "{s}")
    }
}

/// Outcome of a single prediction request.
#[derive(Debug)]
pub enum PredictOutcome {
    /// Raw prediction payload.
    Success(serde_json::Value),
    /// The service has no such resource for this account.
    NotFound,
    Error(ExtractionError),
}

/// A document-data-extraction backend.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn predict(&self, kind: DocumentKind, image: Vec<u8>) -> PredictOutcome;
}

/// Where the fields of an `Extraction` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    /// Parsed from the service's predictions.
    Extracted,
    /// The hard-coded fallback record.
    Simulated,
}

/// Result of a successful `extract` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub record: ExtractedRecord,
    pub source: RecordSource,
}

impl Extraction {
    pub fn is_simulated(&self) -> bool {
        self.source == RecordSource::Simulated
    }
}

/// Wraps a `DocumentExtractor` with the fallback policy.
pub struct ExtractionGateway {
    extractor: Arc<dyn DocumentExtractor>,
}

impl ExtractionGateway {
    pub fn new(extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self { extractor }
    }

    /// Extract the record from an identity image and a vehicle-document image.
    ///
    /// Both requests run concurrently. `NotFound` from either side wins over
    /// any other outcome and yields the fallback record.
    pub async fn extract(
        &self,
        identity_image: Vec<u8>,
        vehicle_image: Vec<u8>,
    ) -> Result<Extraction, ExtractionError> {
        info!("Requesting document extraction");
        let (identity, vehicle) = tokio::join!(
            self.extractor.predict(DocumentKind::Identity, identity_image),
            self.extractor
                .predict(DocumentKind::VehicleRegistration, vehicle_image),
        );

        match (identity, vehicle) {
            (PredictOutcome::NotFound, _) | (_, PredictOutcome::NotFound) => {
                warn!("Extraction service reported not found; using simulated record");
                Ok(Extraction {
                    record: ExtractedRecord::fallback(),
                    source: RecordSource::Simulated,
                })
            }
            (PredictOutcome::Error(e), _) | (_, PredictOutcome::Error(e)) => Err(e),
            (PredictOutcome::Success(identity), PredictOutcome::Success(vehicle)) => {
                info!("Document extraction succeeded");
                Ok(Extraction {
                    record: ExtractedRecord::from_predictions(&identity, &vehicle),
                    source: RecordSource::Extracted,
                })
            }
        }
    }

    /// Download both photos through `photos`, then `extract`.
    pub async fn extract_photos(
        &self,
        photos: &dyn PhotoSource,
        identity_ref: &str,
        vehicle_ref: &str,
    ) -> Result<Extraction, ExtractionError> {
        let (identity_image, vehicle_image) =
            tokio::try_join!(photos.download(identity_ref), photos.download(vehicle_ref))?;
        self.extract(identity_image, vehicle_image).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::error::ChannelError;

    /// Extractor returning a fixed outcome per document kind.
    struct StubExtractor {
        identity: fn() -> PredictOutcome,
        vehicle: fn() -> PredictOutcome,
        seen: Mutex<Vec<(DocumentKind, Vec<u8>)>>,
    }

    impl StubExtractor {
        fn new(identity: fn() -> PredictOutcome, vehicle: fn() -> PredictOutcome) -> Arc<Self> {
            Arc::new(Self {
                identity,
                vehicle,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl DocumentExtractor for StubExtractor {
        async fn predict(&self, kind: DocumentKind, image: Vec<u8>) -> PredictOutcome {
            self.seen.lock().unwrap().push((kind, image));
            match kind {
                DocumentKind::Identity => (self.identity)(),
                DocumentKind::VehicleRegistration => (self.vehicle)(),
            }
        }
    }

    fn identity_ok() -> PredictOutcome {
        PredictOutcome::Success(json!({
            "document": {"inference": {"prediction": {
                "given_names": [{"value": "Олена"}],
                "id_number": {"value": "EK000001"}
            }}}
        }))
    }

    fn vehicle_ok() -> PredictOutcome {
        PredictOutcome::Success(json!({
            "document": {"inference": {"prediction": {
                "id_number": {"value": "VF1RFB00X12345678"},
                "license_plate": {"value": "KA 0001 AA"},
                "make": {"value": "Renault"},
                "year": {"value": "2012"}
            }}}
        }))
    }

    fn not_found() -> PredictOutcome {
        PredictOutcome::NotFound
    }

    fn unauthorized() -> PredictOutcome {
        PredictOutcome::Error(ExtractionError::Status {
            document: "identity".into(),
            status: 401,
        })
    }

    #[tokio::test]
    async fn successful_predictions_produce_extracted_record() {
        let stub = StubExtractor::new(identity_ok, vehicle_ok);
        let gateway = ExtractionGateway::new(stub.clone());
        let extraction = gateway.extract(b"id".to_vec(), b"veh".to_vec()).await.unwrap();

        assert_eq!(extraction.source, RecordSource::Extracted);
        assert_eq!(extraction.record.name, "Олена");
        assert_eq!(extraction.record.vehicle_make, "Renault");

        let seen = stub.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&(DocumentKind::Identity, b"id".to_vec())));
        assert!(seen.contains(&(DocumentKind::VehicleRegistration, b"veh".to_vec())));
    }

    #[tokio::test]
    async fn not_found_on_either_side_yields_fallback() {
        let cases: [(fn() -> PredictOutcome, fn() -> PredictOutcome); 3] = [
            (not_found, vehicle_ok),
            (identity_ok, not_found),
            (not_found, not_found),
        ];
        for (identity, vehicle) in cases {
            let gateway = ExtractionGateway::new(StubExtractor::new(identity, vehicle));
            let extraction = gateway.extract(vec![1], vec![2]).await.unwrap();
            assert!(extraction.is_simulated());
            assert_eq!(extraction.record, ExtractedRecord::fallback());
        }
    }

    #[tokio::test]
    async fn not_found_outranks_other_errors() {
        let gateway = ExtractionGateway::new(StubExtractor::new(unauthorized, not_found));
        let extraction = gateway.extract(vec![1], vec![2]).await.unwrap();
        assert!(extraction.is_simulated());
    }

    #[tokio::test]
    async fn other_errors_propagate() {
        let gateway = ExtractionGateway::new(StubExtractor::new(unauthorized, vehicle_ok));
        let err = gateway.extract(vec![1], vec![2]).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Status { status: 401, .. }));
    }

    struct MapPhotos;

    #[async_trait]
    impl PhotoSource for MapPhotos {
        async fn download(&self, file_ref: &str) -> Result<Vec<u8>, ChannelError> {
            match file_ref {
                "missing" => Err(ChannelError::DownloadFailed {
                    name: "stub".into(),
                    file_ref: file_ref.into(),
                    reason: "gone".into(),
                }),
                other => Ok(other.as_bytes().to_vec()),
            }
        }
    }

    #[tokio::test]
    async fn extract_photos_downloads_both_references() {
        let stub = StubExtractor::new(identity_ok, vehicle_ok);
        let gateway = ExtractionGateway::new(stub.clone());
        gateway
            .extract_photos(&MapPhotos, "passport-ref", "vehicle-ref")
            .await
            .unwrap();
        let seen = stub.seen.lock().unwrap();
        assert!(seen.contains(&(DocumentKind::Identity, b"passport-ref".to_vec())));
        assert!(seen.contains(&(DocumentKind::VehicleRegistration, b"vehicle-ref".to_vec())));
    }

    #[tokio::test]
    async fn download_failure_is_extraction_error() {
        let gateway = ExtractionGateway::new(StubExtractor::new(identity_ok, vehicle_ok));
        let err = gateway
            .extract_photos(&MapPhotos, "missing", "vehicle-ref")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::PhotoDownload(_)));
    }
}
