//! Conversation stages and the per-user session record.

use serde::{Deserialize, Serialize};

use crate::extraction::Extraction;

/// Position of a user in the policy flow.
///
/// Cycles: Start → AwaitingIdentityPhoto → AwaitingVehicleDocPhoto →
/// ConfirmData → ConfirmPrice → Start. Rejecting the data goes back to
/// AwaitingIdentityPhoto.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Start,
    AwaitingIdentityPhoto,
    AwaitingVehicleDocPhoto,
    ConfirmData,
    ConfirmPrice,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Start,
        Stage::AwaitingIdentityPhoto,
        Stage::AwaitingVehicleDocPhoto,
        Stage::ConfirmData,
        Stage::ConfirmPrice,
    ];

    /// Check if a transition from `self` to `target` is valid.
    /// Staying in place is always allowed.
    pub fn can_transition_to(&self, target: Stage) -> bool {
        use Stage::*;
        *self == target
            || matches!(
                (self, target),
                (Start, AwaitingIdentityPhoto)
                    | (AwaitingIdentityPhoto, AwaitingVehicleDocPhoto)
                    | (AwaitingVehicleDocPhoto, ConfirmData)
                    | (ConfirmData, ConfirmPrice)
                    | (ConfirmData, AwaitingIdentityPhoto)
                    | (ConfirmPrice, Start)
            )
    }

    /// Whether sessions in this stage must hold extracted data.
    pub fn holds_extraction(&self) -> bool {
        matches!(self, Self::ConfirmData | Self::ConfirmPrice)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::AwaitingIdentityPhoto => "awaiting_identity_photo",
            Self::AwaitingVehicleDocPhoto => "awaiting_vehicle_doc_photo",
            Self::ConfirmData => "confirm_data",
            Self::ConfirmPrice => "confirm_price",
        };
        write!(f, "{s}")
    }
}

/// Per-user conversation state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub stage: Stage,
    pub identity_photo_ref: Option<String>,
    pub vehicle_doc_photo_ref: Option<String>,
    /// Present exactly while `stage.holds_extraction()`.
    pub extraction: Option<Extraction>,
}

impl Session {
    /// Back to Start with every collected reference and record dropped.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Back to AwaitingIdentityPhoto, dropping photos and extracted data.
    pub fn restart_collection(&mut self) {
        self.identity_photo_ref = None;
        self.vehicle_doc_photo_ref = None;
        self.extraction = None;
        self.stage = Stage::AwaitingIdentityPhoto;
    }

    /// Whether the extraction field agrees with the stage.
    pub fn is_consistent(&self) -> bool {
        self.stage.holds_extraction() == self.extraction.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{ExtractedRecord, RecordSource};

    #[test]
    fn valid_transitions() {
        use Stage::*;
        let transitions = [
            (Start, AwaitingIdentityPhoto),
            (AwaitingIdentityPhoto, AwaitingVehicleDocPhoto),
            (AwaitingVehicleDocPhoto, ConfirmData),
            (ConfirmData, ConfirmPrice),
            (ConfirmData, AwaitingIdentityPhoto),
            (ConfirmPrice, Start),
        ];
        for (from, to) in transitions {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
        for stage in Stage::ALL {
            assert!(stage.can_transition_to(stage));
        }
    }

    #[test]
    fn invalid_transitions() {
        use Stage::*;
        assert!(!Start.can_transition_to(ConfirmData));
        assert!(!AwaitingVehicleDocPhoto.can_transition_to(AwaitingIdentityPhoto));
        assert!(!ConfirmPrice.can_transition_to(ConfirmData));
        assert!(!ConfirmPrice.can_transition_to(AwaitingIdentityPhoto));
        assert!(!AwaitingIdentityPhoto.can_transition_to(Start));
    }

    #[test]
    fn display_matches_serde() {
        for stage in Stage::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(format!("\"{stage}\""), json);
        }
    }

    #[test]
    fn reset_clears_everything() {
        let mut session = Session {
            stage: Stage::ConfirmPrice,
            identity_photo_ref: Some("a".into()),
            vehicle_doc_photo_ref: Some("b".into()),
            extraction: Some(Extraction {
                record: ExtractedRecord::fallback(),
                source: RecordSource::Simulated,
            }),
        };
        session.reset();
        assert_eq!(session, Session::default());
        assert!(session.is_consistent());
    }

    #[test]
    fn restart_collection_drops_photos_and_data() {
        let mut session = Session {
            stage: Stage::ConfirmData,
            identity_photo_ref: Some("a".into()),
            vehicle_doc_photo_ref: Some("b".into()),
            extraction: Some(Extraction {
                record: ExtractedRecord::fallback(),
                source: RecordSource::Extracted,
            }),
        };
        session.restart_collection();
        assert_eq!(session.stage, Stage::AwaitingIdentityPhoto);
        assert!(session.identity_photo_ref.is_none());
        assert!(session.vehicle_doc_photo_ref.is_none());
        assert!(session.extraction.is_none());
        assert!(session.is_consistent());
    }
}
