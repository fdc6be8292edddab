//! Konspekt Core Library
//!
//! Drives the phased study-notes backend for a YouTube video: concepts,
//! thesis and arguments, connections, claim verification and a quiz, each
//! streamed over its own websocket.

pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod health;
pub mod notes;
pub mod phase;
pub mod protocol;
pub mod quiz;
pub mod session;
pub mod transport;
pub mod types;
pub mod youtube;

pub use client::{CancelHandle, PhaseOutcome, StudyClient};
pub use config::ClientConfig;
pub use error::{KonspektError, Result, SessionError, TransportError};
pub use format::{compact_timestamp, format_notes_readable, parse_timestamp_to_seconds};
pub use health::check_health;
pub use notes::{
    StudyNotes, find_cached_notes, get_notes_dir, get_notes_path, load_notes, save_notes,
};
pub use phase::{KnowledgeLevel, Phase, PhaseRequest};
pub use protocol::ServerMessage;
pub use quiz::QuizAttempt;
pub use session::{ProgressEntry, Session, SessionMachine, Transition};
pub use transport::{Connector, Transport, WsConnector};
pub use types::{
    ArgumentChain, Claim, ConceptExplanation, ConnectionInsight, Connections, KeyConcepts, Quiz,
    QuizQuestion, ThesisArguments, Verdict, VerifiedClaim, VerifiedClaims,
};
pub use youtube::extract_video_id;
