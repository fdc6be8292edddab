//! The phased session state machine.
//!
//! [`SessionMachine`] is pure: it never touches the network. The client
//! driver feeds it inbound messages in arrival order and reports connection
//! lifecycle changes; every call returns a [`Transition`] describing what
//! changed so a view can redraw.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::SessionError,
    notes::StudyNotes,
    phase::{KnowledgeLevel, Phase, PhaseRequest},
    protocol::{ServerMessage, humanize_step},
    quiz::QuizAttempt,
    types::{Connections, KeyConcepts, Quiz, ThesisArguments, VerifiedClaims},
    youtube::extract_video_id,
};

pub const CONNECTION_ERROR_MESSAGE: &str = "Connection error. Check that the backend is running.";

const CAPTION_STEP: &str = "caption_extractor";
const KEY_CONCEPTS_STEP: &str = "key_concepts_extractor";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEntry {
    pub phase: Phase,
    pub text: String,
}

/// A decoded terminal payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseResult {
    KeyConcepts(KeyConcepts),
    ThesisArguments(ThesisArguments),
    Connections(Connections),
    VerifiedClaims(VerifiedClaims),
    Quiz(Quiz),
}

impl PhaseResult {
    pub fn decode(phase: Phase, payload: &Value) -> serde_json::Result<PhaseResult> {
        let payload = payload.clone();
        Ok(match phase {
            Phase::KeyConcepts => PhaseResult::KeyConcepts(serde_json::from_value(payload)?),
            Phase::ThesisArguments => {
                PhaseResult::ThesisArguments(serde_json::from_value(payload)?)
            }
            Phase::Connections => PhaseResult::Connections(serde_json::from_value(payload)?),
            Phase::ClaimVerification => {
                PhaseResult::VerifiedClaims(serde_json::from_value(payload)?)
            }
            Phase::Quiz => PhaseResult::Quiz(serde_json::from_value(payload)?),
        })
    }

    pub fn phase(&self) -> Phase {
        match self {
            PhaseResult::KeyConcepts(_) => Phase::KeyConcepts,
            PhaseResult::ThesisArguments(_) => Phase::ThesisArguments,
            PhaseResult::Connections(_) => Phase::Connections,
            PhaseResult::VerifiedClaims(_) => Phase::ClaimVerification,
            PhaseResult::Quiz(_) => Phase::Quiz,
        }
    }
}

/// What a single input did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Progress { phase: Phase, text: String, percent: u8 },
    Completed(Phase),
    Failed { phase: Phase, message: String },
    /// Connection went away before a terminal message. Not an error.
    Closed(Phase),
    Cancelled(Phase),
    Ignored,
}

impl Transition {
    /// The loading phase is over after this transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Transition::Completed(_)
                | Transition::Failed { .. }
                | Transition::Closed(_)
                | Transition::Cancelled(_)
        )
    }
}

/// All client-held state for one video's run.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub video_url: String,
    pub video_id: Option<String>,
    pub knowledge_level: KnowledgeLevel,

    pub key_concepts: Option<KeyConcepts>,
    pub thesis_arguments: Option<ThesisArguments>,
    pub connections: Option<Connections>,
    pub verified_claims: Option<VerifiedClaims>,
    pub quiz: Option<Quiz>,

    pub active_phase: Phase,
    pub loading_phase: Option<Phase>,
    pub error: Option<String>,
    pub progress: Vec<ProgressEntry>,
    pub progress_percent: u8,
    pub expanded_section: Option<Phase>,
    pub quiz_attempt: QuizAttempt,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            video_url: String::new(),
            video_id: None,
            knowledge_level: KnowledgeLevel::default(),
            key_concepts: None,
            thesis_arguments: None,
            connections: None,
            verified_claims: None,
            quiz: None,
            active_phase: Phase::KeyConcepts,
            loading_phase: None,
            error: None,
            progress: Vec::new(),
            progress_percent: 0,
            expanded_section: None,
            quiz_attempt: QuizAttempt::default(),
        }
    }
}

impl Session {
    pub fn has_result(&self, phase: Phase) -> bool {
        match phase {
            Phase::KeyConcepts => self.key_concepts.is_some(),
            Phase::ThesisArguments => self.thesis_arguments.is_some(),
            Phase::Connections => self.connections.is_some(),
            Phase::ClaimVerification => self.verified_claims.is_some(),
            Phase::Quiz => self.quiz.is_some(),
        }
    }

    fn clear_result(&mut self, phase: Phase) {
        match phase {
            Phase::KeyConcepts => self.key_concepts = None,
            Phase::ThesisArguments => self.thesis_arguments = None,
            Phase::Connections => self.connections = None,
            Phase::ClaimVerification => self.verified_claims = None,
            Phase::Quiz => self.quiz = None,
        }
    }

    fn store(&mut self, result: PhaseResult) {
        match result {
            PhaseResult::KeyConcepts(r) => self.key_concepts = Some(r),
            PhaseResult::ThesisArguments(r) => self.thesis_arguments = Some(r),
            PhaseResult::Connections(r) => self.connections = Some(r),
            PhaseResult::VerifiedClaims(r) => self.verified_claims = Some(r),
            PhaseResult::Quiz(r) => self.quiz = Some(r),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading_phase.is_some()
    }

    /// Snapshot of the results gathered so far.
    pub fn notes(&self) -> StudyNotes {
        StudyNotes {
            session_id: self.id,
            video_url: self.video_url.clone(),
            video_id: self.video_id.clone().unwrap_or_default(),
            knowledge_level: self.knowledge_level,
            key_concepts: self.key_concepts.clone(),
            thesis_arguments: self.thesis_arguments.clone(),
            connections: self.connections.clone(),
            verified_claims: self.verified_claims.clone(),
            quiz: self.quiz.clone(),
            quiz_score: self.quiz_attempt.score(),
        }
    }
}

/// Fixed per-step progress estimate. Phase 1 knows its two backend steps;
/// the others only get coarse marks.
fn step_percent(phase: Phase, message: &ServerMessage) -> Option<u8> {
    match (phase, message) {
        (Phase::KeyConcepts, ServerMessage::Started { .. }) => Some(5),
        (Phase::KeyConcepts, ServerMessage::WorkflowStarted { .. })
        | (Phase::KeyConcepts, ServerMessage::PhaseStarted { .. }) => Some(10),
        (Phase::KeyConcepts, ServerMessage::StepStarted { id, .. }) => match id.as_deref() {
            Some(CAPTION_STEP) => Some(15),
            Some(KEY_CONCEPTS_STEP) => Some(50),
            _ => None,
        },
        (Phase::KeyConcepts, ServerMessage::StepCompleted { id, .. }) => match id.as_deref() {
            Some(CAPTION_STEP) => Some(40),
            Some(KEY_CONCEPTS_STEP) => Some(90),
            _ => None,
        },
        (_, ServerMessage::Started { .. })
        | (_, ServerMessage::WorkflowStarted { .. })
        | (_, ServerMessage::PhaseStarted { .. }) => Some(10),
        (_, ServerMessage::StepStarted { .. }) => Some(30),
        (_, ServerMessage::StepCompleted { .. }) => Some(80),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct SessionMachine {
    session: Session,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn log(&mut self, phase: Phase, text: impl Into<String>) -> Transition {
        let text = text.into();
        debug!(%phase, %text, "progress");
        self.session.progress.push(ProgressEntry {
            phase,
            text: text.clone(),
        });
        Transition::Progress {
            phase,
            text,
            percent: self.session.progress_percent,
        }
    }

    /// Validate a URL and start phase 1 on a fresh session.
    pub fn submit_url(
        &mut self,
        url: &str,
        level: KnowledgeLevel,
    ) -> Result<PhaseRequest, SessionError> {
        let url = url.trim();
        let outcome = if url.is_empty() {
            Err(SessionError::EmptyUrl)
        } else {
            extract_video_id(url).ok_or_else(|| SessionError::InvalidUrl {
                url: url.to_string(),
            })
        };

        let video_id = match outcome {
            Ok(id) => id,
            Err(e) => {
                // an in-flight phase still owns the error slot
                if !self.session.is_loading() {
                    self.session.error = Some(e.to_string());
                }
                return Err(e);
            }
        };

        if let Some(phase) = self.session.loading_phase {
            warn!(%phase, "abandoning in-flight phase for new submission");
        }

        self.session = Session {
            video_url: url.to_string(),
            video_id: Some(video_id),
            knowledge_level: level,
            ..Session::default()
        };
        info!(session_id = %self.session.id, video_id = ?self.session.video_id, "new session");

        self.start_phase(Phase::KeyConcepts)
    }

    /// Replace the session with previously saved notes. Nothing is loading
    /// afterwards and the quiz attempt starts fresh.
    pub fn resume(&mut self, notes: StudyNotes) -> Result<(), SessionError> {
        if let Some(phase) = self.session.loading_phase {
            return Err(SessionError::PhaseInFlight { phase });
        }
        let video_id = extract_video_id(&notes.video_url).ok_or_else(|| {
            SessionError::InvalidUrl {
                url: notes.video_url.clone(),
            }
        })?;

        let mut session = Session {
            id: notes.session_id,
            video_url: notes.video_url,
            video_id: Some(video_id),
            knowledge_level: notes.knowledge_level,
            key_concepts: notes.key_concepts,
            thesis_arguments: notes.thesis_arguments,
            connections: notes.connections,
            verified_claims: notes.verified_claims,
            quiz: notes.quiz,
            ..Session::default()
        };
        if let Some(last) = Phase::ALL.into_iter().rev().find(|p| session.has_result(*p)) {
            session.active_phase = last;
            session.progress_percent = 100;
        }
        info!(session_id = %session.id, active_phase = %session.active_phase, "resumed saved notes");
        self.session = session;
        Ok(())
    }

    /// Gate and begin `phase`, returning the request to send once connected.
    pub fn start_phase(&mut self, phase: Phase) -> Result<PhaseRequest, SessionError> {
        let request = self.build_request(phase)?;

        self.session.clear_result(phase);
        for &stale in phase.dependents() {
            self.session.clear_result(stale);
        }
        if phase == Phase::Quiz || phase.dependents().contains(&Phase::Quiz) {
            self.session.quiz_attempt.reset();
        }
        if phase == Phase::KeyConcepts {
            self.session.expanded_section = None;
        }

        self.session.loading_phase = Some(phase);
        self.session.active_phase = phase;
        self.session.error = None;
        self.session.progress_percent = 0;
        info!(%phase, "phase started");
        self.log(phase, format!("Connecting to {} ({})...", phase, phase.title()));

        Ok(request)
    }

    fn build_request(&self, phase: Phase) -> Result<PhaseRequest, SessionError> {
        let s = &self.session;

        if phase != Phase::KeyConcepts {
            if let Some(loading) = s.loading_phase {
                return Err(SessionError::PhaseInFlight { phase: loading });
            }
        }

        if let Some(requires) = phase.prerequisite() {
            if !s.has_result(requires) {
                return Err(SessionError::MissingPrerequisite { phase, requires });
            }
        }
        let missing = || SessionError::MissingPrerequisite {
            phase,
            requires: phase.prerequisite().unwrap_or(Phase::KeyConcepts),
        };

        match phase {
            Phase::KeyConcepts => {
                if s.video_url.is_empty() {
                    return Err(SessionError::NoVideo);
                }
                Ok(PhaseRequest::KeyConcepts {
                    video_url: s.video_url.clone(),
                    knowledge_level: s.knowledge_level,
                })
            }
            Phase::ThesisArguments => {
                let concepts = s
                    .key_concepts
                    .as_ref()
                    .ok_or_else(missing)?;
                let video_id = concepts
                    .video_id
                    .clone()
                    .or_else(|| s.video_id.clone())
                    .ok_or(SessionError::NoVideo)?;
                Ok(PhaseRequest::ThesisArguments { video_id })
            }
            Phase::Connections => {
                let concepts = s
                    .key_concepts
                    .as_ref()
                    .ok_or_else(missing)?;
                Ok(PhaseRequest::Connections {
                    key_concepts: concepts.key_concepts.clone(),
                })
            }
            Phase::ClaimVerification => {
                let thesis = s
                    .thesis_arguments
                    .as_ref()
                    .ok_or_else(missing)?;
                Ok(PhaseRequest::ClaimVerification {
                    thesis: thesis.main_thesis.clone(),
                    argument_chains: thesis.argument_chains.clone(),
                    claims: thesis.claims.clone(),
                })
            }
            Phase::Quiz => {
                let concepts = s
                    .key_concepts
                    .as_ref()
                    .ok_or_else(missing)?;
                Ok(PhaseRequest::Quiz {
                    key_concepts: concepts.key_concepts.clone(),
                    thesis: s.thesis_arguments.as_ref().map(|t| t.main_thesis.clone()),
                    argument_chains: s
                        .thesis_arguments
                        .as_ref()
                        .map(|t| t.argument_chains.clone())
                        .unwrap_or_default(),
                    connections: s
                        .connections
                        .as_ref()
                        .map(|c| c.connections.clone())
                        .unwrap_or_default(),
                })
            }
        }
    }

    /// Parse and apply one raw text frame.
    pub fn handle_text(&mut self, text: &str) -> Transition {
        match ServerMessage::parse(text) {
            Ok(message) => self.handle(message),
            Err(e) => {
                warn!(error = %e, "dropping malformed message");
                Transition::Ignored
            }
        }
    }

    /// Apply one inbound message to the loading phase.
    pub fn handle(&mut self, message: ServerMessage) -> Transition {
        let Some(phase) = self.session.loading_phase else {
            debug!(kind = message.type_name(), "message with no phase loading");
            return Transition::Ignored;
        };
        debug!(%phase, kind = message.type_name(), "inbound message");

        if let Some(declared) = message.declared_phase() {
            if declared != phase {
                warn!(%phase, %declared, kind = message.type_name(), "message for another phase");
                return Transition::Ignored;
            }
        }

        if let Some(percent) = step_percent(phase, &message) {
            self.session.progress_percent = self.session.progress_percent.max(percent);
        }

        match &message {
            ServerMessage::Started { message, .. } => {
                let text = message
                    .clone()
                    .unwrap_or_else(|| "Workflow initiated".to_string());
                self.log(phase, text)
            }
            ServerMessage::WorkflowStarted { .. } => self.log(phase, "Workflow started"),
            ServerMessage::StepStarted { id, .. } => {
                let text = match id {
                    Some(id) => format!("Running {}...", humanize_step(id).to_lowercase()),
                    None => "Step started".to_string(),
                };
                self.log(phase, text)
            }
            ServerMessage::StepCompleted { id, .. } => {
                let text = match id {
                    Some(id) => format!("{} done", humanize_step(id)),
                    None => "Step completed".to_string(),
                };
                self.log(phase, text)
            }
            ServerMessage::PhaseStarted { message, .. } => {
                let text = message
                    .clone()
                    .unwrap_or_else(|| format!("{} started", phase));
                self.log(phase, text)
            }
            ServerMessage::WorkflowOutput { .. }
            | ServerMessage::Completed { .. }
            | ServerMessage::PhaseOutput { .. }
            | ServerMessage::PhaseCompleted { .. } => match message.result_payload() {
                Some(payload) => self.complete(phase, payload),
                None => self.log(phase, format!("{} reported no result yet", phase)),
            },
            ServerMessage::Error { .. } | ServerMessage::StepFailed { .. } => {
                let text = message.failure_text().unwrap_or_default();
                self.fail(phase, format!("{}: {}", phase, text))
            }
            ServerMessage::Unrecognized => {
                warn!(%phase, "ignoring unrecognized message type");
                Transition::Ignored
            }
        }
    }

    fn complete(&mut self, phase: Phase, payload: &Value) -> Transition {
        match PhaseResult::decode(phase, payload) {
            Ok(result) => {
                self.session.store(result);
                self.session.error = None;
                self.session.loading_phase = None;
                self.session.active_phase = phase;
                self.session.expanded_section = Some(phase);
                self.session.progress_percent = 100;
                info!(%phase, "phase completed");
                self.log(phase, format!("{} ready", phase.title()));
                Transition::Completed(phase)
            }
            Err(e) => {
                warn!(%phase, error = %e, "undecodable phase result");
                self.fail(phase, format!("{}: malformed result ({})", phase, e))
            }
        }
    }

    fn fail(&mut self, phase: Phase, message: String) -> Transition {
        warn!(%phase, %message, "phase failed");
        self.session.clear_result(phase);
        self.session.loading_phase = None;
        self.session.error = Some(message.clone());
        Transition::Failed { phase, message }
    }

    /// The connection ended. Only matters if no terminal message arrived.
    pub fn connection_closed(&mut self) -> Transition {
        let Some(phase) = self.session.loading_phase.take() else {
            return Transition::Ignored;
        };
        info!(%phase, "connection closed without a result");
        self.log(phase, "Connection closed");
        Transition::Closed(phase)
    }

    /// The transport failed to connect or broke mid-stream.
    pub fn connection_failed(&mut self, reason: &str) -> Transition {
        let Some(phase) = self.session.loading_phase else {
            return Transition::Ignored;
        };
        warn!(%phase, %reason, "connection error");
        self.fail(phase, CONNECTION_ERROR_MESSAGE.to_string())
    }

    pub fn timed_out(&mut self, after: Duration) -> Transition {
        let Some(phase) = self.session.loading_phase else {
            return Transition::Ignored;
        };
        self.fail(
            phase,
            format!("{} timed out after {}s", phase, after.as_secs()),
        )
    }

    /// Stop waiting on the loading phase. Calling it again does nothing.
    pub fn cancel(&mut self) -> Transition {
        let Some(phase) = self.session.loading_phase.take() else {
            return Transition::Ignored;
        };
        info!(%phase, "phase cancelled");
        self.log(phase, "Cancelled");
        Transition::Cancelled(phase)
    }

    pub fn answer_question(&mut self, question: usize, option: usize) -> bool {
        let Some(quiz) = &self.session.quiz else {
            return false;
        };
        self.session.quiz_attempt.answer(quiz, question, option)
    }

    pub fn submit_quiz(&mut self) -> Result<u8, SessionError> {
        let quiz = self.session.quiz.as_ref().ok_or(SessionError::NoQuiz)?;
        Ok(self.session.quiz_attempt.submit(quiz))
    }

    pub fn retake_quiz(&mut self) {
        self.session.quiz_attempt.reset();
    }

    pub fn toggle_section(&mut self, phase: Phase) {
        self.session.expanded_section = match self.session.expanded_section {
            Some(open) if open == phase => None,
            _ => Some(phase),
        };
    }
}
