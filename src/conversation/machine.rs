//! The transition table and the engine that executes it.
//!
//! `transition` maps `(Stage, Input)` to an `Action` declaratively; the
//! engine performs the action's side effects (paraphrasing, extraction,
//! policy rendering) and only then commits the new stage, so a failed
//! extraction leaves the session untouched.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info};

use crate::channels::{OutgoingResponse, PhotoSource};
use crate::conversation::input::Input;
use crate::conversation::prompts;
use crate::conversation::state::{Session, Stage};
use crate::error::ExtractionError;
use crate::extraction::ExtractionGateway;
use crate::llm::Rephraser;
use crate::policy;

/// Attempts the phrasing gateway makes on rate limiting.
pub const PHRASING_RETRIES: u32 = 2;

/// What a turn does, decided from the stage and the input category alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Greet and ask for the identity photo.
    Welcome,
    /// Tell the user to send /start (sent verbatim).
    RemindStart,
    AcceptIdentityPhoto(String),
    RejectIdentityPhoto,
    /// Store the vehicle photo, run extraction, ask to confirm the data.
    ExtractAndConfirm(String),
    RejectVehiclePhoto,
    QuotePrice,
    RestartCollection,
    /// Re-ask yes/no without moving.
    RepeatYesNo,
    IssuePolicy,
    InsistOnPrice,
}

impl Action {
    /// Stage the session ends in when the action completes.
    pub fn target(&self, from: Stage) -> Stage {
        match self {
            Self::Welcome | Self::RejectIdentityPhoto | Self::RestartCollection => {
                Stage::AwaitingIdentityPhoto
            }
            Self::RemindStart | Self::IssuePolicy => Stage::Start,
            Self::AcceptIdentityPhoto(_) | Self::RejectVehiclePhoto => {
                Stage::AwaitingVehicleDocPhoto
            }
            Self::ExtractAndConfirm(_) => Stage::ConfirmData,
            Self::QuotePrice | Self::InsistOnPrice => Stage::ConfirmPrice,
            Self::RepeatYesNo => from,
        }
    }
}

/// The transition table.
pub fn transition(stage: Stage, input: &Input) -> Action {
    use Stage::*;
    match (stage, input) {
        (Start, Input::StartCommand) => Action::Welcome,
        (Start, _) => Action::RemindStart,

        (AwaitingIdentityPhoto, Input::Photo(r)) => Action::AcceptIdentityPhoto(r.clone()),
        (AwaitingIdentityPhoto, _) => Action::RejectIdentityPhoto,

        (AwaitingVehicleDocPhoto, Input::Photo(r)) => Action::ExtractAndConfirm(r.clone()),
        (AwaitingVehicleDocPhoto, _) => Action::RejectVehiclePhoto,

        (ConfirmData, Input::Yes) => Action::QuotePrice,
        (ConfirmData, Input::No) => Action::RestartCollection,
        (ConfirmData, _) => Action::RepeatYesNo,

        (ConfirmPrice, Input::Yes) => Action::IssuePolicy,
        (ConfirmPrice, Input::No) => Action::InsistOnPrice,
        (ConfirmPrice, _) => Action::RepeatYesNo,
    }
}

/// Source of the issue date for new policies.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Executes one conversation turn against a session.
pub struct ConversationEngine {
    rephraser: Arc<Rephraser>,
    extraction: Arc<ExtractionGateway>,
    photos: Arc<dyn PhotoSource>,
    clock: Clock,
    phrasing_retries: u32,
}

impl ConversationEngine {
    pub fn new(
        rephraser: Arc<Rephraser>,
        extraction: Arc<ExtractionGateway>,
        photos: Arc<dyn PhotoSource>,
    ) -> Self {
        Self {
            rephraser,
            extraction,
            photos,
            clock: Arc::new(|| chrono::Local::now().date_naive()),
            phrasing_retries: PHRASING_RETRIES,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_phrasing_retries(mut self, retries: u32) -> Self {
        self.phrasing_retries = retries;
        self
    }

    async fn say(&self, template: &str) -> String {
        self.rephraser.rephrase(template, self.phrasing_retries).await
    }

    /// Phrased notice sent when extraction fails and the user should retry.
    pub async fn failure_notice(&self) -> String {
        self.say(prompts::EXTRACTION_FAILED).await
    }

    /// Run one turn. On `Err` the session is left exactly as it was.
    pub async fn step(
        &self,
        session: &mut Session,
        input: &Input,
    ) -> Result<Vec<OutgoingResponse>, ExtractionError> {
        let from = session.stage;
        let action = transition(from, input);

        let replies = match &action {
            Action::Welcome => {
                session.reset();
                vec![OutgoingResponse::text(self.say(prompts::WELCOME).await)]
            }
            Action::RemindStart => vec![OutgoingResponse::text(prompts::USE_START)],
            Action::AcceptIdentityPhoto(photo) => {
                session.identity_photo_ref = Some(photo.clone());
                vec![OutgoingResponse::text(
                    self.say(prompts::ASK_VEHICLE_DOC).await,
                )]
            }
            Action::RejectIdentityPhoto => vec![OutgoingResponse::text(
                self.say(prompts::INVALID_IDENTITY_PHOTO).await,
            )],
            Action::ExtractAndConfirm(photo) => {
                let identity_ref = session.identity_photo_ref.as_deref().ok_or_else(|| {
                    ExtractionError::MissingPhoto {
                        document: "identity".into(),
                    }
                })?;
                let extraction = self
                    .extraction
                    .extract_photos(self.photos.as_ref(), identity_ref, photo)
                    .await?;
                let summary = prompts::confirmation_summary(&extraction);
                session.vehicle_doc_photo_ref = Some(photo.clone());
                session.extraction = Some(extraction);
                vec![OutgoingResponse::yes_no(self.say(&summary).await)]
            }
            Action::RejectVehiclePhoto => vec![OutgoingResponse::text(
                self.say(prompts::INVALID_VEHICLE_PHOTO).await,
            )],
            Action::QuotePrice => {
                vec![OutgoingResponse::yes_no(self.say(&prompts::price_quote()).await)]
            }
            Action::RestartCollection => {
                session.restart_collection();
                vec![OutgoingResponse::text(self.say(prompts::RESEND_BOTH).await)]
            }
            Action::RepeatYesNo => {
                vec![OutgoingResponse::yes_no(self.say(prompts::ANSWER_YES_NO).await)]
            }
            Action::IssuePolicy => match session.extraction.take() {
                Some(extraction) => {
                    let document = policy::synthesize(&extraction.record, (self.clock)());
                    let file_name = document.file_name.clone();
                    session.reset();
                    vec![
                        OutgoingResponse::document(document.into_bytes(), file_name),
                        OutgoingResponse::text(self.say(prompts::POLICY_ISSUED).await),
                    ]
                }
                None => {
                    error!("Price confirmed without extracted data; resetting session");
                    session.reset();
                    vec![OutgoingResponse::text(prompts::USE_START)]
                }
            },
            Action::InsistOnPrice => {
                vec![OutgoingResponse::yes_no(self.say(&prompts::price_is_fixed()).await)]
            }
        };

        session.stage = action.target(from);
        info!(from = %from, to = %session.stage, ?action, "Turn handled");
        Ok(replies)
    }
}
