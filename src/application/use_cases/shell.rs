use std::sync::Arc;
use tracing::{info, warn};

use crate::application::use_cases::image_normalizer::ImageNormalizer;
use crate::application::use_cases::meter_analysis::MeterAnalyzer;
use crate::application::use_cases::results_presenter::ResultsPresenter;
use crate::application::use_cases::session_store::SessionStore;
use crate::domain::analysis::AnalysisResult;
use crate::domain::error::{AppError, Result};
use crate::domain::locale::Labels;

/// An image picked by the user, held in memory until analysis or save.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedImage {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl SelectedImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShellState {
    Idle,
    ImageSelected {
        image: SelectedImage,
    },
    Analyzing {
        image: SelectedImage,
    },
    ResultsReady {
        image: SelectedImage,
        results: Vec<AnalysisResult>,
    },
    ViewingSavedSession {
        session_id: String,
    },
}

impl ShellState {
    pub fn name(&self) -> &'static str {
        match self {
            ShellState::Idle => "idle",
            ShellState::ImageSelected { .. } => "image_selected",
            ShellState::Analyzing { .. } => "analyzing",
            ShellState::ResultsReady { .. } => "results_ready",
            ShellState::ViewingSavedSession { .. } => "viewing_saved_session",
        }
    }
}

/// Inputs to the state machine. Every transition goes through
/// [`AppShell::apply`].
#[derive(Debug)]
pub enum ShellEvent {
    ImageChosen(SelectedImage),
    ImageCleared,
    AnalysisStarted,
    AnalysisSucceeded(Vec<AnalysisResult>),
    AnalysisFailed(AppError),
    SessionSaved(String),
    SessionOpened(String),
    SessionDeleted(String),
    NewAnalysis,
}

/// Upload, analyze, display, save and load, with an error banner that sits on
/// top of whatever state is current.
pub struct AppShell {
    state: ShellState,
    error: Option<AppError>,
    presenter: ResultsPresenter,
    labels: &'static Labels,
}

impl AppShell {
    pub fn new(labels: &'static Labels) -> Self {
        Self {
            state: ShellState::Idle,
            error: None,
            presenter: ResultsPresenter::new(),
            labels,
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn error(&self) -> Option<&AppError> {
        self.error.as_ref()
    }

    pub fn banner(&self) -> Option<String> {
        self.error.as_ref().map(|err| self.labels.banner(err))
    }

    pub fn labels(&self) -> &'static Labels {
        self.labels
    }

    pub fn presenter(&self) -> &ResultsPresenter {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut ResultsPresenter {
        &mut self.presenter
    }

    pub fn set_error(&mut self, err: AppError) {
        self.error = Some(err);
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, ShellState::Analyzing { .. })
    }

    /// Whether the analyze control is enabled.
    pub fn can_analyze(&self) -> bool {
        matches!(
            self.state,
            ShellState::ImageSelected { .. } | ShellState::ResultsReady { .. }
        )
    }

    /// Applies one event. Disallowed transitions are rejected and leave the
    /// state as it was.
    pub fn apply(&mut self, event: ShellEvent) -> Result<()> {
        let current = std::mem::replace(&mut self.state, ShellState::Idle);
        let from = current.name();

        let outcome = match (current, event) {
            (ShellState::Analyzing { image }, ShellEvent::AnalysisSucceeded(results)) => {
                self.error = None;
                self.presenter = ResultsPresenter::new();
                Ok(ShellState::ResultsReady { image, results })
            }
            (ShellState::Analyzing { image }, ShellEvent::AnalysisFailed(err)) => {
                self.error = Some(err);
                Ok(ShellState::ImageSelected { image })
            }
            (current @ ShellState::Analyzing { .. }, event) => {
                Err((current, busy_error(&event)))
            }

            (_, ShellEvent::ImageChosen(image)) => {
                self.error = None;
                Ok(ShellState::ImageSelected { image })
            }
            (_, ShellEvent::ImageCleared) => {
                self.error = None;
                Ok(ShellState::Idle)
            }

            (
                ShellState::ImageSelected { image } | ShellState::ResultsReady { image, .. },
                ShellEvent::AnalysisStarted,
            ) => {
                self.error = None;
                Ok(ShellState::Analyzing { image })
            }
            (current, ShellEvent::AnalysisStarted) => {
                let err = AppError::ValidationError(self.labels.select_image_first.to_string());
                self.error = Some(err.clone());
                Err((current, err))
            }

            (ShellState::ResultsReady { .. }, ShellEvent::SessionSaved(session_id))
            | (_, ShellEvent::SessionOpened(session_id)) => {
                self.error = None;
                self.presenter = ResultsPresenter::new();
                Ok(ShellState::ViewingSavedSession { session_id })
            }

            (ShellState::ViewingSavedSession { session_id }, ShellEvent::SessionDeleted(deleted))
                if session_id == deleted =>
            {
                Ok(ShellState::Idle)
            }
            (current, ShellEvent::SessionDeleted(_)) => Ok(current),

            (_, ShellEvent::NewAnalysis) => {
                self.error = None;
                Ok(ShellState::Idle)
            }

            (current, event) => {
                let err = AppError::ValidationError(format!(
                    "{} is not allowed while {}",
                    event_name(&event),
                    current.name()
                ));
                Err((current, err))
            }
        };

        match outcome {
            Ok(next) => {
                if next.name() != from {
                    info!(from, to = next.name(), "Shell transition");
                }
                self.state = next;
                Ok(())
            }
            Err((unchanged, err)) => {
                warn!(state = from, error = %err, "Rejected shell event");
                self.state = unchanged;
                Err(err)
            }
        }
    }

    pub fn select_image(&mut self, image: Option<SelectedImage>) -> Result<()> {
        match image {
            Some(image) => self.apply(ShellEvent::ImageChosen(image)),
            None => self.apply(ShellEvent::ImageCleared),
        }
    }

    /// Moves to `Analyzing` and hands back the image to send.
    pub fn begin_analysis(&mut self) -> Result<SelectedImage> {
        self.apply(ShellEvent::AnalysisStarted)?;
        match &self.state {
            ShellState::Analyzing { image } => Ok(image.clone()),
            other => Err(AppError::Internal(format!(
                "Expected analyzing state, found {}",
                other.name()
            ))),
        }
    }

    pub fn finish_analysis(&mut self, outcome: Result<Vec<AnalysisResult>>) -> Result<()> {
        match outcome {
            Ok(results) => self.apply(ShellEvent::AnalysisSucceeded(results)),
            Err(err) => self.apply(ShellEvent::AnalysisFailed(err)),
        }
    }

    /// Runs one analysis round trip. Failures end up in the error banner
    /// rather than in the return value.
    pub async fn analyze(&mut self, analyzer: &(dyn MeterAnalyzer + Send + Sync)) -> Result<()> {
        let image = self.begin_analysis()?;
        let outcome = analyzer.analyze(&image.bytes).await;
        self.finish_analysis(outcome)
    }

    /// Persists the current results with a thumbnail and switches to viewing
    /// the new session. Returns the new session id.
    pub fn save_results(
        &mut self,
        store: &mut SessionStore,
        name: &str,
        thumbnails: &ImageNormalizer,
    ) -> Result<String> {
        let (image, results) = match &self.state {
            ShellState::ResultsReady { image, results } => (image.clone(), results.clone()),
            other => {
                return Err(AppError::ValidationError(format!(
                    "Nothing to save while {}",
                    other.name()
                )))
            }
        };

        let thumbnail = match thumbnails.to_data_url(&image.bytes) {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(error = %err, image = %image.name, "Saving session without thumbnail");
                None
            }
        };

        let session = store.save(name, results, thumbnail)?;
        self.apply(ShellEvent::SessionSaved(session.id.clone()))?;
        Ok(session.id)
    }

    /// Opens a saved session, discarding any unsaved image or results.
    pub fn load_session(&mut self, store: &SessionStore, id: &str) -> Result<()> {
        if store.find(id).is_none() {
            return Err(AppError::NotFound(format!("Session {}", id)));
        }
        self.apply(ShellEvent::SessionOpened(id.to_string()))
    }

    pub fn rename_session(&mut self, store: &mut SessionStore, id: &str, name: &str) -> Result<()> {
        if store.rename(id, name)? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Session {}", id)))
        }
    }

    /// Refused while an analysis is running, before storage is touched.
    pub fn delete_session(&mut self, store: &mut SessionStore, id: &str) -> Result<()> {
        let event = ShellEvent::SessionDeleted(id.to_string());
        if self.is_busy() {
            return Err(busy_error(&event));
        }
        if !store.delete(id)? {
            return Err(AppError::NotFound(format!("Session {}", id)));
        }
        self.apply(event)
    }

    pub fn analyze_new(&mut self) -> Result<()> {
        self.apply(ShellEvent::NewAnalysis)
    }

    pub fn active_session_id(&self) -> Option<&str> {
        match &self.state {
            ShellState::ViewingSavedSession { session_id } => Some(session_id.as_str()),
            _ => None,
        }
    }

    /// The table currently on display, from memory or from the store.
    pub fn current_results<'a>(&'a self, store: &'a SessionStore) -> Option<&'a [AnalysisResult]> {
        match &self.state {
            ShellState::ResultsReady { results, .. } => Some(results.as_slice()),
            ShellState::ViewingSavedSession { session_id } => {
                store.find(session_id).map(|session| session.results.as_slice())
            }
            _ => None,
        }
    }
}

fn event_name(event: &ShellEvent) -> &'static str {
    match event {
        ShellEvent::ImageChosen(_) => "ImageChosen",
        ShellEvent::ImageCleared => "ImageCleared",
        ShellEvent::AnalysisStarted => "AnalysisStarted",
        ShellEvent::AnalysisSucceeded(_) => "AnalysisSucceeded",
        ShellEvent::AnalysisFailed(_) => "AnalysisFailed",
        ShellEvent::SessionSaved(_) => "SessionSaved",
        ShellEvent::SessionOpened(_) => "SessionOpened",
        ShellEvent::SessionDeleted(_) => "SessionDeleted",
        ShellEvent::NewAnalysis => "NewAnalysis",
    }
}

fn busy_error(event: &ShellEvent) -> AppError {
    AppError::ValidationError(format!(
        "{} is disabled while an analysis is running",
        event_name(event)
    ))
}
