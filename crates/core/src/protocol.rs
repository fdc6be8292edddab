//! Inbound event messages streamed by the backend during a phase.
//!
//! Every message is a JSON object tagged by `type`. Result payloads arrive
//! under either `output` or `event` depending on the backend route, so the
//! terminal variants carry both and [`ServerMessage::result_payload`] picks
//! whichever is present.

use serde::Deserialize;
use serde_json::Value;

use crate::phase::Phase;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Started {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        timestamp: String,
    },
    WorkflowStarted {
        #[serde(default)]
        timestamp: String,
    },
    StepStarted {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        timestamp: String,
    },
    StepCompleted {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        timestamp: String,
    },
    PhaseStarted {
        #[serde(default)]
        phase: Option<Phase>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        timestamp: String,
    },
    WorkflowOutput {
        #[serde(default)]
        event: Option<Value>,
        #[serde(default)]
        output: Option<Value>,
        #[serde(default)]
        timestamp: String,
    },
    Completed {
        #[serde(default)]
        output: Option<Value>,
        #[serde(default)]
        event: Option<Value>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        timestamp: String,
    },
    PhaseOutput {
        #[serde(default)]
        phase: Option<Phase>,
        #[serde(default)]
        output: Option<Value>,
        #[serde(default)]
        event: Option<Value>,
        #[serde(default)]
        timestamp: String,
    },
    PhaseCompleted {
        #[serde(default)]
        phase: Option<Phase>,
        #[serde(default)]
        output: Option<Value>,
        #[serde(default)]
        event: Option<Value>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        timestamp: String,
    },
    Error {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        timestamp: String,
    },
    StepFailed {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        event: Option<Value>,
        #[serde(default)]
        timestamp: String,
    },
    #[serde(other)]
    Unrecognized,
}

fn present(value: &Option<Value>) -> Option<&Value> {
    value.as_ref().filter(|v| !v.is_null())
}

impl ServerMessage {
    /// Parse one text frame. Unknown `type` values become
    /// [`ServerMessage::Unrecognized`]; frames that aren't a tagged JSON
    /// object are an error.
    pub fn parse(text: &str) -> serde_json::Result<ServerMessage> {
        serde_json::from_str(text)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ServerMessage::Started { .. } => "started",
            ServerMessage::WorkflowStarted { .. } => "workflow_started",
            ServerMessage::StepStarted { .. } => "step_started",
            ServerMessage::StepCompleted { .. } => "step_completed",
            ServerMessage::PhaseStarted { .. } => "phase_started",
            ServerMessage::WorkflowOutput { .. } => "workflow_output",
            ServerMessage::Completed { .. } => "completed",
            ServerMessage::PhaseOutput { .. } => "phase_output",
            ServerMessage::PhaseCompleted { .. } => "phase_completed",
            ServerMessage::Error { .. } => "error",
            ServerMessage::StepFailed { .. } => "step_failed",
            ServerMessage::Unrecognized => "unrecognized",
        }
    }

    /// The result payload, from `output` or `event`. Null counts as absent.
    pub fn result_payload(&self) -> Option<&Value> {
        match self {
            ServerMessage::WorkflowOutput { event, output, .. } => {
                present(event).or_else(|| present(output))
            }
            ServerMessage::Completed { output, event, .. }
            | ServerMessage::PhaseOutput { output, event, .. }
            | ServerMessage::PhaseCompleted { output, event, .. } => {
                present(output).or_else(|| present(event))
            }
            _ => None,
        }
    }

    /// The phase the server says this message belongs to, if it says.
    pub fn declared_phase(&self) -> Option<Phase> {
        match self {
            ServerMessage::PhaseStarted { phase, .. }
            | ServerMessage::PhaseOutput { phase, .. }
            | ServerMessage::PhaseCompleted { phase, .. } => *phase,
            _ => None,
        }
    }

    /// Failure text for `error` / `step_failed`.
    pub fn failure_text(&self) -> Option<String> {
        match self {
            ServerMessage::Error { message, .. } => {
                Some(message.clone().unwrap_or_else(|| "Unknown error".to_string()))
            }
            ServerMessage::StepFailed {
                id, message, event, ..
            } => {
                let text = message
                    .clone()
                    .or_else(|| event.as_ref().and_then(|e| e.as_str()).map(str::to_string))
                    .unwrap_or_else(|| "step failed".to_string());
                Some(match id {
                    Some(id) => format!("{} failed: {}", humanize_step(id), text),
                    None => text,
                })
            }
            _ => None,
        }
    }
}

/// `key_concepts_extractor` -> `Key concepts extractor`.
pub fn humanize_step(id: &str) -> String {
    let spaced = id.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
