//! Session Orchestrator: the state machine that ties capture, classification,
//! generation and the learning views together.
//!
//! ```text
//! Upload --capture--> SelectProfile (saved profiles exist)
//!        \----------> Quiz          (none saved)
//! SelectProfile --start_quiz--> Quiz --cancel_quiz--> SelectProfile
//! SelectProfile | Quiz --choose--> Processing --ok--> ViewContent
//!                                            \-err--> SelectProfile (artifact kept)
//! Upload <--> About
//! any --reset--> Upload
//! ```

use std::sync::Arc;

use base64::Engine as _;

use crate::app::store::{ProfileStore, SaveProfileError};
use crate::audio::{AudioError, AudioOutput, Playback};
use crate::classify::{Classification, QuizSession, QuizStep};
use crate::document::{DocumentWarning, Message, Role, Transcript, TransformedDocument};
use crate::generator::{ChatRequest, FeedbackRequest, GenerationError, Generator, TransformRequest};
use crate::mindmap::{Expansion, MindmapIndex, TreeNode};
use crate::profile::Profile;
use crate::settings::{Settings, SettingsChange, SettingsError};
use crate::verify::{self, Verdict};

pub const PROCESSING_FAILED: &str =
    "Failed to process the document. Please ensure the API Key is valid and try again.";
pub const FEEDBACK_UNHEARD: &str = "I had trouble hearing that. Can you say it again?";
pub const FEEDBACK_EMPTY: &str = "Keep going, I'm listening!";

const CHAT_CONTEXT_CHARS: usize = 1000;

pub fn conversation_greeting(title: &str) -> String {
    format!(
        "Hi! I'd love to hear what you learned about \"{title}\". Can you explain it to me in your own words?"
    )
}
const FEEDBACK_CONTEXT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Upload,
    About,
    SelectProfile,
    Quiz,
    Processing,
    ViewContent,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("cannot {action} while in {from:?}")]
    InvalidTransition { from: Mode, action: &'static str },

    #[error("a document is already being processed")]
    Busy,

    #[error("no artifact has been captured")]
    NoArtifact,

    #[error("unsupported artifact type: {0}")]
    UnsupportedArtifact(String),

    #[error("artifact is empty")]
    EmptyArtifact,

    #[error("no document is loaded")]
    NoDocument,

    #[error("unknown activity: {0}")]
    UnknownActivity(String),

    #[error("unknown saved profile: {0}")]
    UnknownSavedProfile(String),

    #[error("profile name must not be empty")]
    EmptyProfileName,

    #[error("no conversation is open")]
    NoConversation,

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Playback(#[from] AudioError),

    #[error("save profiles: {0:#}")]
    Persistence(anyhow::Error),
}

/// Raw upload, held until reset so a failed generation can be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    bytes: Vec<u8>,
    mime_type: String,
}

impl Artifact {
    /// Accepts images, PDFs and plain text.
    pub fn new(bytes: Vec<u8>, mime_type: &str) -> Result<Self, SessionError> {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        let supported = mime_type.starts_with("image/")
            || mime_type == "application/pdf"
            || mime_type.starts_with("text/");
        if !supported {
            return Err(SessionError::UnsupportedArtifact(mime_type));
        }
        if bytes.is_empty() {
            return Err(SessionError::EmptyArtifact);
        }
        Ok(Self { bytes, mime_type })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// A loaded document plus the state derived from it once at load time.
#[derive(Debug, Clone)]
struct LoadedDocument {
    document: TransformedDocument,
    mindmap: MindmapIndex,
    expansion: Expansion,
    warnings: Vec<DocumentWarning>,
}

pub struct Session {
    generator: Arc<dyn Generator>,
    store: Arc<dyn ProfileStore>,
    audio: AudioOutput,
    mode: Mode,
    artifact: Option<Artifact>,
    loaded: Option<LoadedDocument>,
    settings: Settings,
    saved: Vec<Settings>,
    quiz: Option<QuizSession>,
    conversation: Option<Transcript>,
    processing_profile: Option<Profile>,
    error: Option<String>,
}

impl Session {
    /// Starts in `Upload` with the saved profiles read from `store`.
    pub async fn open(generator: Arc<dyn Generator>, store: Arc<dyn ProfileStore>) -> Self {
        let saved = store.load().await;
        tracing::debug!(saved = saved.len(), "session opened");
        Self {
            generator,
            store,
            audio: AudioOutput::new(),
            mode: Mode::Upload,
            artifact: None,
            loaded: None,
            settings: Settings::default(),
            saved,
            quiz: None,
            conversation: None,
            processing_profile: None,
            error: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn saved_profiles(&self) -> &[Settings] {
        &self.saved
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn document(&self) -> Option<&TransformedDocument> {
        self.loaded.as_ref().map(|l| &l.document)
    }

    pub fn warnings(&self) -> &[DocumentWarning] {
        self.loaded.as_ref().map(|l| l.warnings.as_slice()).unwrap_or_default()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn quiz(&self) -> Option<&QuizSession> {
        self.quiz.as_ref()
    }

    pub fn conversation(&self) -> Option<&Transcript> {
        self.conversation.as_ref()
    }

    pub fn processing_profile(&self) -> Option<Profile> {
        self.processing_profile
    }

    pub fn audio(&self) -> &AudioOutput {
        &self.audio
    }

    fn transition(&mut self, next: Mode) {
        tracing::debug!(from = ?self.mode, to = ?next, "session transition");
        self.mode = next;
    }

    fn require(&self, mode: Mode, action: &'static str) -> Result<(), SessionError> {
        if self.mode == Mode::Processing && mode != Mode::Processing {
            return Err(SessionError::Busy);
        }
        if self.mode != mode {
            return Err(SessionError::InvalidTransition {
                from: self.mode,
                action,
            });
        }
        Ok(())
    }

    fn loaded(&self) -> Result<&LoadedDocument, SessionError> {
        self.loaded.as_ref().ok_or(SessionError::NoDocument)
    }

    pub fn show_about(&mut self) -> Result<(), SessionError> {
        self.require(Mode::Upload, "show about")?;
        self.transition(Mode::About);
        Ok(())
    }

    pub fn close_about(&mut self) -> Result<(), SessionError> {
        self.require(Mode::About, "close about")?;
        self.transition(Mode::Upload);
        Ok(())
    }

    /// Takes the uploaded artifact. Learners with saved profiles get to pick
    /// one; everyone else goes straight to the sorting ceremony.
    pub fn capture(&mut self, bytes: Vec<u8>, mime_type: &str) -> Result<(), SessionError> {
        self.require(Mode::Upload, "capture an artifact")?;
        let artifact = match Artifact::new(bytes, mime_type) {
            Ok(artifact) => artifact,
            Err(err) => {
                tracing::warn!(mime_type, error = %err, "artifact rejected");
                self.error = Some(err.to_string());
                return Err(err);
            }
        };
        tracing::info!(mime_type = %artifact.mime_type, bytes = artifact.len(), "artifact captured");
        self.artifact = Some(artifact);
        self.error = None;

        if self.saved.is_empty() {
            self.quiz = Some(QuizSession::sorting_ceremony());
            self.transition(Mode::Quiz);
        } else {
            self.transition(Mode::SelectProfile);
        }
        Ok(())
    }

    pub fn start_quiz(&mut self) -> Result<(), SessionError> {
        self.require(Mode::SelectProfile, "start the quiz")?;
        self.quiz = Some(QuizSession::sorting_ceremony());
        self.transition(Mode::Quiz);
        Ok(())
    }

    pub fn cancel_quiz(&mut self) -> Result<(), SessionError> {
        self.require(Mode::Quiz, "cancel the quiz")?;
        self.quiz = None;
        self.transition(Mode::SelectProfile);
        Ok(())
    }

    /// Answers the current question. When the ceremony finishes, the document
    /// is processed for the recommended profile before this returns.
    pub async fn answer_quiz(&mut self, option: usize) -> Result<QuizStep, SessionError> {
        self.require(Mode::Quiz, "answer the quiz")?;
        let quiz = self.quiz.get_or_insert_with(QuizSession::sorting_ceremony);
        let step = quiz.choose(option);
        if let QuizStep::Finished(classification) = &step {
            let classification = classification.clone();
            self.complete_quiz(&classification).await?;
        }
        Ok(step)
    }

    pub async fn complete_quiz(
        &mut self,
        classification: &Classification,
    ) -> Result<(), SessionError> {
        self.require(Mode::Quiz, "complete the quiz")?;
        self.quiz = None;
        tracing::info!(
            profile = %classification.profile,
            color_blind = classification.color_blind,
            "sorting ceremony finished"
        );
        let settings = Settings::from_classification(classification);
        self.process(classification.profile, settings).await
    }

    pub async fn select_profile(&mut self, profile: Profile) -> Result<(), SessionError> {
        self.require(Mode::SelectProfile, "select a profile")?;
        self.process(profile, Settings::for_profile(profile)).await
    }

    pub async fn select_saved(&mut self, id: &str) -> Result<(), SessionError> {
        self.require(Mode::SelectProfile, "select a saved profile")?;
        let settings = self
            .saved
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownSavedProfile(id.to_owned()))?;
        self.process(settings.base_profile, settings).await
    }

    /// `settings` become active only once a document has been produced.
    async fn process(&mut self, profile: Profile, settings: Settings) -> Result<(), SessionError> {
        if self.mode == Mode::Processing {
            return Err(SessionError::Busy);
        }
        let artifact = self.artifact.as_ref().ok_or(SessionError::NoArtifact)?;
        let request = TransformRequest {
            data_base64: artifact.to_base64(),
            mime_type: artifact.mime_type.clone(),
            profile,
        };

        self.processing_profile = Some(profile);
        self.error = None;
        self.transition(Mode::Processing);

        let result = self.generator.transform(&request).await;
        self.processing_profile = None;

        match result {
            Ok(document) => {
                let warnings = document.lint();
                for warning in &warnings {
                    tracing::warn!(?warning, "document lint");
                }
                self.loaded = Some(LoadedDocument {
                    mindmap: MindmapIndex::build(&document.mindmap),
                    expansion: Expansion::default(),
                    warnings,
                    document,
                });
                self.settings = settings;
                self.conversation = None;
                self.transition(Mode::ViewContent);
                Ok(())
            }
            Err(err) => {
                tracing::error!(%profile, error = %err, "document processing failed");
                self.error = Some(PROCESSING_FAILED.to_owned());
                self.transition(Mode::SelectProfile);
                Err(err.into())
            }
        }
    }

    /// Back to `Upload`, discarding the artifact, document and error.
    pub fn reset(&mut self) {
        self.artifact = None;
        self.loaded = None;
        self.quiz = None;
        self.conversation = None;
        self.processing_profile = None;
        self.error = None;
        self.transition(Mode::Upload);
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn update_settings(&mut self, change: SettingsChange) -> Result<&Settings, SessionError> {
        self.settings = self.settings.with(change)?;
        tracing::debug!(?change, "settings updated");
        Ok(&self.settings)
    }

    pub fn toggle_dark_mode(&mut self) -> &Settings {
        self.settings = self.settings.toggled_dark_mode();
        &self.settings
    }

    /// Snapshots the active settings under `name` and rewrites the collection.
    pub async fn save_profile(&mut self, name: &str) -> Result<&Settings, SessionError> {
        let updated = self
            .store
            .append_snapshot(&self.saved, &self.settings, name)
            .await
            .map_err(|err| match err {
                SaveProfileError::EmptyName => SessionError::EmptyProfileName,
                SaveProfileError::Write(err) => SessionError::Persistence(err),
            })?;
        self.saved = updated;
        self.saved.last().ok_or(SessionError::EmptyProfileName)
    }

    pub fn mindmap_forest(&self) -> Result<Vec<TreeNode>, SessionError> {
        let loaded = self.loaded()?;
        Ok(loaded.mindmap.forest(&loaded.document.mindmap))
    }

    pub fn is_expanded(&self, node_id: &str, depth: usize) -> bool {
        self.loaded
            .as_ref()
            .is_some_and(|l| l.expansion.is_expanded(node_id, depth))
    }

    pub fn toggle_node(&mut self, node_id: &str) -> Result<(), SessionError> {
        let loaded = self.loaded.as_mut().ok_or(SessionError::NoDocument)?;
        loaded.expansion.toggle(node_id);
        Ok(())
    }

    pub fn check_answer(&self, activity_id: &str, chosen: &str) -> Result<Verdict, SessionError> {
        let activity = self
            .loaded()?
            .document
            .activity(activity_id)
            .ok_or_else(|| SessionError::UnknownActivity(activity_id.to_owned()))?;
        let verdict = verify::verify_activity(activity, chosen);
        tracing::debug!(activity = activity_id, ?verdict, "answer checked");
        Ok(verdict)
    }

    /// Starts a fresh transcript with the tutor's opening question.
    pub fn open_conversation(&mut self) -> Result<(), SessionError> {
        self.require(Mode::ViewContent, "open a conversation")?;
        let greeting = conversation_greeting(&self.loaded()?.document.title);
        let mut transcript = Transcript::default();
        transcript.push(Role::Model, greeting);
        self.conversation = Some(transcript);
        Ok(())
    }

    pub fn close_conversation(&mut self) {
        self.conversation = None;
    }

    /// One tutoring turn. The reply is appended before this returns, so turns
    /// never interleave. Blank input is ignored.
    pub async fn send_message(&mut self, text: &str) -> Result<Option<&Message>, SessionError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let document = &self.loaded()?.document;
        let context_title = document.title.clone();
        let context_script = document
            .audio_script
            .chars()
            .take(CHAT_CONTEXT_CHARS)
            .collect();
        let profile = self.settings.base_profile;
        let transcript = self.conversation.as_mut().ok_or(SessionError::NoConversation)?;

        let request = ChatRequest {
            history: transcript.messages().to_vec(),
            new_message: text.to_owned(),
            context_title,
            context_script,
            profile,
        };
        transcript.push(Role::User, text);

        match self.generator.chat(&request).await {
            Ok(reply) => {
                transcript.push(Role::Model, reply);
                Ok(transcript.messages().last())
            }
            Err(err) => {
                tracing::error!(error = %err, "chat turn failed");
                Err(err.into())
            }
        }
    }

    /// Grades a spoken explanation. Generator failures become a spoken retry prompt.
    pub async fn spoken_feedback(&self, audio_base64: &str) -> Result<String, SessionError> {
        let document = &self.loaded()?.document;
        let request = FeedbackRequest {
            audio_base64: audio_base64.to_owned(),
            context_summary: document.context_summary(FEEDBACK_CONTEXT_CHARS),
            profile: self.settings.base_profile,
        };
        let reply = match self.generator.feedback(&request).await {
            Ok(text) => text,
            Err(GenerationError::EmptyResponse(_)) => FEEDBACK_EMPTY.to_owned(),
            Err(err) => {
                tracing::warn!(error = %err, "spoken feedback failed");
                FEEDBACK_UNHEARD.to_owned()
            }
        };
        Ok(reply)
    }

    /// Synthesizes `text` and starts playing it at the active narration speed.
    pub async fn narrate(&self, text: &str) -> Result<Playback, SessionError> {
        if self.audio.is_busy() {
            return Err(AudioError::DeviceBusy.into());
        }
        let clip = self.generator.narrate(text).await?;
        let playback = self
            .audio
            .play(clip, self.settings.customizations.narration_speed)?;
        Ok(playback)
    }
}
