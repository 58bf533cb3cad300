//! Lifecycle states for each curiosity variant, plus evidence effects.

use serde::{Deserialize, Serialize};

use crate::entities::CuriosityKind;

/// States of a Discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStatus {
    #[default]
    Active,
    Dormant,
}

/// States of a Question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    #[default]
    Open,
    /// Some of the answer is known.
    Partial,
    Answered,
    /// Turned into a hypothesis.
    Evolved,
    Dormant,
}

/// States of a Hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisStatus {
    #[default]
    Weak,
    Testing,
    Supported,
    Confirmed,
    Refuted,
    /// Replaced by a successor theory.
    Transformed,
    Dormant,
}

/// States of a Pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PatternStatus {
    #[default]
    Emerging,
    Solid,
    Foundational,
    /// Doubt has been cast; also the resting state a quiet pattern falls into.
    Questioned,
    Dissolved,
}

impl DiscoveryStatus {
    pub fn is_terminal(&self) -> bool {
        false
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryStatus::Active => "active",
            DiscoveryStatus::Dormant => "dormant",
        }
    }
}

impl QuestionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QuestionStatus::Answered | QuestionStatus::Evolved)
    }

    /// Open or partially answered: still a "known unknown".
    pub fn is_unresolved(&self) -> bool {
        matches!(self, QuestionStatus::Open | QuestionStatus::Partial)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionStatus::Open => "open",
            QuestionStatus::Partial => "partial",
            QuestionStatus::Answered => "answered",
            QuestionStatus::Evolved => "evolved",
            QuestionStatus::Dormant => "dormant",
        }
    }
}

impl HypothesisStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HypothesisStatus::Confirmed | HypothesisStatus::Refuted | HypothesisStatus::Transformed
        )
    }

    /// Weak or under test: not yet backed by enough evidence.
    pub fn is_unsettled(&self) -> bool {
        matches!(self, HypothesisStatus::Weak | HypothesisStatus::Testing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HypothesisStatus::Weak => "weak",
            HypothesisStatus::Testing => "testing",
            HypothesisStatus::Supported => "supported",
            HypothesisStatus::Confirmed => "confirmed",
            HypothesisStatus::Refuted => "refuted",
            HypothesisStatus::Transformed => "transformed",
            HypothesisStatus::Dormant => "dormant",
        }
    }
}

impl PatternStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PatternStatus::Dissolved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternStatus::Emerging => "emerging",
            PatternStatus::Solid => "solid",
            PatternStatus::Foundational => "foundational",
            PatternStatus::Questioned => "questioned",
            PatternStatus::Dissolved => "dissolved",
        }
    }
}

/// A status of any variant, used where the caller does not know the variant
/// statically (e.g. partial updates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum CuriosityStatus {
    Discovery(DiscoveryStatus),
    Question(QuestionStatus),
    Hypothesis(HypothesisStatus),
    Pattern(PatternStatus),
}

impl CuriosityStatus {
    /// The variant this status belongs to.
    pub fn kind(&self) -> CuriosityKind {
        match self {
            CuriosityStatus::Discovery(_) => CuriosityKind::Discovery,
            CuriosityStatus::Question(_) => CuriosityKind::Question,
            CuriosityStatus::Hypothesis(_) => CuriosityKind::Hypothesis,
            CuriosityStatus::Pattern(_) => CuriosityKind::Pattern,
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            CuriosityStatus::Discovery(s) => s.is_terminal(),
            CuriosityStatus::Question(s) => s.is_terminal(),
            CuriosityStatus::Hypothesis(s) => s.is_terminal(),
            CuriosityStatus::Pattern(s) => s.is_terminal(),
        }
    }

    /// Whether this is the variant's dormant (resting) state.
    ///
    /// Patterns have no dormant status of their own, so a `questioned`
    /// pattern counts as resting. It is left out of `get_active`, shows up in
    /// `get_dormant`, and revival returns it to `emerging`.
    pub fn is_dormant(&self) -> bool {
        matches!(
            self,
            CuriosityStatus::Discovery(DiscoveryStatus::Dormant)
                | CuriosityStatus::Question(QuestionStatus::Dormant)
                | CuriosityStatus::Hypothesis(HypothesisStatus::Dormant)
                | CuriosityStatus::Pattern(PatternStatus::Questioned)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CuriosityStatus::Discovery(s) => s.as_str(),
            CuriosityStatus::Question(s) => s.as_str(),
            CuriosityStatus::Hypothesis(s) => s.as_str(),
            CuriosityStatus::Pattern(s) => s.as_str(),
        }
    }
}

impl From<DiscoveryStatus> for CuriosityStatus {
    fn from(value: DiscoveryStatus) -> Self {
        CuriosityStatus::Discovery(value)
    }
}

impl From<QuestionStatus> for CuriosityStatus {
    fn from(value: QuestionStatus) -> Self {
        CuriosityStatus::Question(value)
    }
}

impl From<HypothesisStatus> for CuriosityStatus {
    fn from(value: HypothesisStatus) -> Self {
        CuriosityStatus::Hypothesis(value)
    }
}

impl From<PatternStatus> for CuriosityStatus {
    fn from(value: PatternStatus) -> Self {
        CuriosityStatus::Pattern(value)
    }
}

impl std::fmt::Display for CuriosityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a piece of evidence bears on a curiosity, as judged by the reasoning producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceEffect {
    Supports,
    Contradicts,
    /// Reframes the claim rather than moving its certainty.
    Transforms,
    Neutral,
}

impl EvidenceEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceEffect::Supports => "supports",
            EvidenceEffect::Contradicts => "contradicts",
            EvidenceEffect::Transforms => "transforms",
            EvidenceEffect::Neutral => "neutral",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!DiscoveryStatus::Active.is_terminal());
        assert!(!DiscoveryStatus::Dormant.is_terminal());
        assert!(QuestionStatus::Answered.is_terminal());
        assert!(QuestionStatus::Evolved.is_terminal());
        assert!(!QuestionStatus::Partial.is_terminal());
        assert!(HypothesisStatus::Confirmed.is_terminal());
        assert!(HypothesisStatus::Refuted.is_terminal());
        assert!(HypothesisStatus::Transformed.is_terminal());
        assert!(!HypothesisStatus::Supported.is_terminal());
        assert!(PatternStatus::Dissolved.is_terminal());
        assert!(!PatternStatus::Questioned.is_terminal());
    }

    #[test]
    fn test_status_kind_routing() {
        let status = CuriosityStatus::Hypothesis(HypothesisStatus::Testing);
        assert_eq!(status.kind(), CuriosityKind::Hypothesis);
        assert_eq!(status.to_string(), "testing");
    }

    #[test]
    fn test_dormant_states() {
        assert!(CuriosityStatus::Question(QuestionStatus::Dormant).is_dormant());
        assert!(CuriosityStatus::Pattern(PatternStatus::Questioned).is_dormant());
        assert!(!CuriosityStatus::Pattern(PatternStatus::Dissolved).is_dormant());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&QuestionStatus::Partial).unwrap();
        assert_eq!(json, "\"partial\"");

        let tagged = serde_json::to_value(CuriosityStatus::Pattern(PatternStatus::Solid)).unwrap();
        assert_eq!(tagged["kind"], "pattern");
        assert_eq!(tagged["status"], "solid");
    }
}
