use serde::{Deserialize, Serialize};

use crate::format::parse_timestamp_to_seconds;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyConcepts {
    pub key_concepts: Vec<ConceptExplanation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptExplanation {
    pub term: String,
    pub definition: String,
    pub relevance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_seconds: Option<u32>,
}

impl ConceptExplanation {
    /// Position in the video, preferring the explicit seconds field.
    pub fn seconds(&self) -> Option<u32> {
        self.timestamp_seconds
            .or_else(|| self.timestamp.as_deref().and_then(parse_timestamp_to_seconds))
    }

    /// Deep link into the video at the point this concept is introduced.
    pub fn watch_url(&self, video_id: &str) -> Option<String> {
        self.seconds()
            .map(|s| format!("https://www.youtube.com/watch?v={video_id}&t={s}s"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThesisArguments {
    pub main_thesis: String,
    #[serde(default)]
    pub argument_chains: Vec<ArgumentChain>,
    #[serde(default)]
    pub claims: Vec<Claim>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentChain {
    pub title: String,
    pub premise: String,
    #[serde(default)]
    pub reasoning_steps: Vec<String>,
    pub conclusion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implications: Option<String>,
}

/// A factual statement from the video that phase 4 checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim: String,
    pub claim_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connections {
    pub connections: Vec<ConnectionInsight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInsight {
    pub concept_a: String,
    pub concept_b: String,
    pub relationship: String,
    pub significance: String,
}

impl ConnectionInsight {
    /// True when this insight relates `a` and `b`, in either order.
    pub fn links(&self, a: &str, b: &str) -> bool {
        (self.concept_a == a && self.concept_b == b) || (self.concept_a == b && self.concept_b == a)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedClaims {
    #[serde(alias = "claims")]
    pub verified_claims: Vec<VerifiedClaim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedClaim {
    pub claim: String,
    pub claim_type: String,
    pub verdict: Verdict,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verdict {
    Supported,
    Refuted,
    PartiallyTrue,
    /// Anything the backend could not settle, including verdicts we don't know.
    Unverifiable,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Supported => "supported",
            Verdict::Refuted => "refuted",
            Verdict::PartiallyTrue => "partially_true",
            Verdict::Unverifiable => "unverifiable",
        }
    }
}

impl From<String> for Verdict {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "supported" => Verdict::Supported,
            "refuted" => Verdict::Refuted,
            "partially_true" => Verdict::PartiallyTrue,
            _ => Verdict::Unverifiable,
        }
    }
}

impl From<Verdict> for String {
    fn from(verdict: Verdict) -> Self {
        verdict.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub questions: Vec<QuizQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_focus: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: String,
    pub difficulty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_concept: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_verdicts_are_unverifiable() {
        let claim: VerifiedClaim = serde_json::from_value(serde_json::json!({
            "claim": "c",
            "claim_type": "statistic",
            "verdict": "mostly_vibes",
            "reasoning": "r"
        }))
        .unwrap();
        assert_eq!(claim.verdict, Verdict::Unverifiable);

        let claim: VerifiedClaim = serde_json::from_value(serde_json::json!({
            "claim": "c",
            "claim_type": "statistic",
            "verdict": "partially_true",
            "reasoning": "r"
        }))
        .unwrap();
        assert_eq!(claim.verdict, Verdict::PartiallyTrue);
    }

    #[test]
    fn connection_is_an_unordered_pair() {
        let insight = ConnectionInsight {
            concept_a: "Inflation".into(),
            concept_b: "Interest rates".into(),
            relationship: "drives".into(),
            significance: "policy".into(),
        };
        assert!(insight.links("Inflation", "Interest rates"));
        assert!(insight.links("Interest rates", "Inflation"));
        assert!(!insight.links("Inflation", "Inflation"));
    }

    #[test]
    fn concept_seconds_fall_back_to_timestamp() {
        let mut concept = ConceptExplanation {
            term: "t".into(),
            definition: "d".into(),
            relevance: "r".into(),
            timestamp: Some("1:05:30".into()),
            timestamp_seconds: None,
        };
        assert_eq!(concept.seconds(), Some(3930));
        assert_eq!(
            concept.watch_url("abc").as_deref(),
            Some("https://www.youtube.com/watch?v=abc&t=3930s")
        );

        concept.timestamp_seconds = Some(12);
        assert_eq!(concept.seconds(), Some(12));

        concept.timestamp = None;
        concept.timestamp_seconds = None;
        assert_eq!(concept.watch_url("abc"), None);
    }

    #[test]
    fn verified_claims_accept_either_key() {
        let parsed: VerifiedClaims =
            serde_json::from_value(serde_json::json!({"claims": []})).unwrap();
        assert!(parsed.verified_claims.is_empty());
    }
}
