use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ArgumentChain, Claim, ConceptExplanation, ConnectionInsight};

/// One step of the five-step comprehension pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Phase {
    KeyConcepts = 1,
    ThesisArguments = 2,
    Connections = 3,
    ClaimVerification = 4,
    Quiz = 5,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::KeyConcepts,
        Phase::ThesisArguments,
        Phase::Connections,
        Phase::ClaimVerification,
        Phase::Quiz,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Phase> {
        Phase::ALL.into_iter().find(|p| p.number() == n)
    }

    /// Websocket path segment under `/ws/`.
    pub fn endpoint_name(self) -> &'static str {
        match self {
            Phase::KeyConcepts => "phase1",
            Phase::ThesisArguments => "phase2",
            Phase::Connections => "phase3",
            Phase::ClaimVerification => "phase4",
            Phase::Quiz => "phase5",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Phase::KeyConcepts => "Key Concepts",
            Phase::ThesisArguments => "Thesis & Arguments",
            Phase::Connections => "Connections",
            Phase::ClaimVerification => "Claim Verification",
            Phase::Quiz => "Quiz",
        }
    }

    /// The phase whose result must exist before this one may start.
    pub fn prerequisite(self) -> Option<Phase> {
        match self {
            Phase::KeyConcepts => None,
            Phase::ThesisArguments => Some(Phase::KeyConcepts),
            Phase::Connections => Some(Phase::KeyConcepts),
            Phase::ClaimVerification => Some(Phase::ThesisArguments),
            Phase::Quiz => Some(Phase::KeyConcepts),
        }
    }

    /// Later phases whose requests are built from this phase's result.
    pub fn dependents(self) -> &'static [Phase] {
        match self {
            Phase::KeyConcepts => &[
                Phase::ThesisArguments,
                Phase::Connections,
                Phase::ClaimVerification,
                Phase::Quiz,
            ],
            Phase::ThesisArguments => &[Phase::ClaimVerification, Phase::Quiz],
            Phase::Connections => &[Phase::Quiz],
            Phase::ClaimVerification | Phase::Quiz => &[],
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Phase {}", self.number())
    }
}

impl TryFrom<u8> for Phase {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Phase::from_number(n).ok_or_else(|| format!("phase must be 1..=5, got {n}"))
    }
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> Self {
        phase.number()
    }
}

/// How much background the viewer already has; steers how many concepts the
/// backend extracts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl KnowledgeLevel {
    pub fn name(&self) -> &'static str {
        match self {
            KnowledgeLevel::Beginner => "beginner",
            KnowledgeLevel::Intermediate => "intermediate",
            KnowledgeLevel::Advanced => "advanced",
        }
    }
}

/// The single request message sent right after a phase connection opens.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PhaseRequest {
    KeyConcepts {
        video_url: String,
        knowledge_level: KnowledgeLevel,
    },
    ThesisArguments {
        video_id: String,
    },
    Connections {
        key_concepts: Vec<ConceptExplanation>,
    },
    ClaimVerification {
        thesis: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        argument_chains: Vec<ArgumentChain>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        claims: Vec<Claim>,
    },
    Quiz {
        key_concepts: Vec<ConceptExplanation>,
        #[serde(skip_serializing_if = "Option::is_none")]
        thesis: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        argument_chains: Vec<ArgumentChain>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        connections: Vec<ConnectionInsight>,
    },
}

impl PhaseRequest {
    pub fn phase(&self) -> Phase {
        match self {
            PhaseRequest::KeyConcepts { .. } => Phase::KeyConcepts,
            PhaseRequest::ThesisArguments { .. } => Phase::ThesisArguments,
            PhaseRequest::Connections { .. } => Phase::Connections,
            PhaseRequest::ClaimVerification { .. } => Phase::ClaimVerification,
            PhaseRequest::Quiz { .. } => Phase::Quiz,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
