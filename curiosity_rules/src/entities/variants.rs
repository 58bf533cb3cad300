//! The four curiosity variants and their lineage links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{clamp_unit, CuriosityBase, CuriosityId};
use crate::lifecycle::{
    DiscoveryStatus, EvidenceEffect, HypothesisStatus, PatternStatus, QuestionStatus,
};

/// An open lead noticed in an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    pub base: CuriosityBase,

    /// How complete the picture is (0.0 - 1.0).
    pub fullness: f64,

    pub status: DiscoveryStatus,

    /// Curiosities this discovery led to.
    #[serde(default)]
    pub spawned_curiosities: Vec<CuriosityId>,
}

impl Discovery {
    /// Create a new active discovery.
    pub fn new(focus: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            base: CuriosityBase::new(focus, domain),
            fullness: 0.0,
            status: DiscoveryStatus::Active,
            spawned_curiosities: Vec::new(),
        }
    }

    /// Set the fullness.
    pub fn with_fullness(mut self, fullness: f64) -> Self {
        self.fullness = clamp_unit(fullness);
        self
    }

    /// Set the pull.
    pub fn with_pull(mut self, pull: f64) -> Self {
        self.base.set_pull(pull);
        self
    }
}

/// A question the system wants answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub base: CuriosityBase,

    /// How much of the answer is known (0.0 - 1.0).
    pub fullness: f64,

    pub status: QuestionStatus,

    /// The question itself.
    pub question: String,

    /// Discovery this question came from.
    #[serde(default)]
    pub source_discovery: Option<CuriosityId>,

    /// Hypothesis this question evolved into. Cleared on reopening.
    #[serde(default)]
    pub spawned_hypothesis: Option<CuriosityId>,
}

impl Question {
    /// Create a new open question.
    pub fn new(
        focus: impl Into<String>,
        domain: impl Into<String>,
        question: impl Into<String>,
    ) -> Self {
        Self {
            base: CuriosityBase::new(focus, domain),
            fullness: 0.0,
            status: QuestionStatus::Open,
            question: question.into(),
            source_discovery: None,
            spawned_hypothesis: None,
        }
    }

    /// Set the fullness.
    pub fn with_fullness(mut self, fullness: f64) -> Self {
        self.fullness = clamp_unit(fullness);
        self
    }

    /// Set the pull.
    pub fn with_pull(mut self, pull: f64) -> Self {
        self.base.set_pull(pull);
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: QuestionStatus) -> Self {
        self.status = status;
        self
    }

    /// Link the originating discovery.
    pub fn with_source_discovery(mut self, discovery: CuriosityId) -> Self {
        self.source_discovery = Some(discovery);
        self
    }
}

/// One piece of evidence gathered while investigating a hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceNote {
    /// Observation the evidence came from.
    pub observation_ref: String,
    pub effect: EvidenceEffect,
    pub recorded_at: DateTime<Utc>,
}

/// Evidence gathered while a hypothesis is under investigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investigation {
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub evidence: Vec<EvidenceNote>,
}

impl Investigation {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            evidence: Vec::new(),
        }
    }

    /// Count evidence with the given effect.
    pub fn count(&self, effect: EvidenceEffect) -> usize {
        self.evidence.iter().filter(|e| e.effect == effect).count()
    }
}

/// A working theory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub base: CuriosityBase,

    /// How certain the claim is (0.0 - 1.0).
    pub confidence: f64,

    pub status: HypothesisStatus,

    pub theory: String,

    /// Question this hypothesis evolved from.
    #[serde(default)]
    pub source_question: Option<CuriosityId>,

    /// Earlier theory this one replaced.
    #[serde(default)]
    pub predecessor: Option<CuriosityId>,

    /// Later theory that replaced this one.
    #[serde(default)]
    pub successor: Option<CuriosityId>,

    /// Foci of patterns this hypothesis contributed to.
    #[serde(default)]
    pub contributed_to_patterns: Vec<String>,

    /// Whether a video is a suitable way to test it.
    #[serde(default)]
    pub video_appropriate: bool,

    #[serde(default)]
    pub investigation: Option<Investigation>,
}

impl Hypothesis {
    /// Create a new weak hypothesis.
    pub fn new(
        focus: impl Into<String>,
        domain: impl Into<String>,
        theory: impl Into<String>,
    ) -> Self {
        Self {
            base: CuriosityBase::new(focus, domain),
            confidence: 0.0,
            status: HypothesisStatus::Weak,
            theory: theory.into(),
            source_question: None,
            predecessor: None,
            successor: None,
            contributed_to_patterns: Vec::new(),
            video_appropriate: false,
            investigation: None,
        }
    }

    /// Set the confidence.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_unit(confidence);
        self
    }

    /// Set the pull.
    pub fn with_pull(mut self, pull: f64) -> Self {
        self.base.set_pull(pull);
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: HypothesisStatus) -> Self {
        self.status = status;
        self
    }

    /// Link the originating question.
    pub fn with_source_question(mut self, question: CuriosityId) -> Self {
        self.source_question = Some(question);
        self
    }

    /// Record a pattern this hypothesis feeds into.
    pub fn with_pattern(mut self, pattern_focus: impl Into<String>) -> Self {
        let focus = pattern_focus.into();
        if !self.contributed_to_patterns.contains(&focus) {
            self.contributed_to_patterns.push(focus);
        }
        self
    }

    /// Mark whether a video can test this hypothesis.
    pub fn with_video_appropriate(mut self, appropriate: bool) -> Self {
        self.video_appropriate = appropriate;
        self
    }

    /// Append a piece of evidence, opening an investigation if needed.
    pub fn note_evidence(
        &mut self,
        observation_ref: impl Into<String>,
        effect: EvidenceEffect,
        now: DateTime<Utc>,
    ) {
        self.investigation
            .get_or_insert_with(|| Investigation::new(now))
            .evidence
            .push(EvidenceNote {
                observation_ref: observation_ref.into(),
                effect,
                recorded_at: now,
            });
    }
}

/// A cross-cutting pattern synthesized from several hypotheses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub base: CuriosityBase,

    /// How certain the pattern is (0.0 - 1.0).
    pub confidence: f64,

    pub status: PatternStatus,

    #[serde(default)]
    pub domains_involved: Vec<String>,

    /// Hypotheses the pattern was built from.
    #[serde(default)]
    pub source_hypotheses: Vec<CuriosityId>,

    /// Questions the pattern raised.
    #[serde(default)]
    pub spawned_questions: Vec<CuriosityId>,
}

impl Pattern {
    /// Create a new emerging pattern.
    pub fn new(focus: impl Into<String>, domain: impl Into<String>) -> Self {
        let base = CuriosityBase::new(focus, domain);
        let domains_involved = vec![base.domain.clone()];
        Self {
            base,
            confidence: 0.0,
            status: PatternStatus::Emerging,
            domains_involved,
            source_hypotheses: Vec::new(),
            spawned_questions: Vec::new(),
        }
    }

    /// Set the confidence.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_unit(confidence);
        self
    }

    /// Set the pull.
    pub fn with_pull(mut self, pull: f64) -> Self {
        self.base.set_pull(pull);
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: PatternStatus) -> Self {
        self.status = status;
        self
    }

    /// Add a source hypothesis.
    pub fn with_source_hypothesis(mut self, hypothesis: CuriosityId) -> Self {
        if !self.source_hypotheses.contains(&hypothesis) {
            self.source_hypotheses.push(hypothesis);
        }
        self
    }

    /// Add a question this pattern raised.
    pub fn with_spawned_question(mut self, question: CuriosityId) -> Self {
        if !self.spawned_questions.contains(&question) {
            self.spawned_questions.push(question);
        }
        self
    }

    /// Add another domain the pattern spans.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        if !self.domains_involved.contains(&domain) {
            self.domains_involved.push(domain);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_builder() {
        let discovery = Discovery::new("likes trains", "transport");
        let question = Question::new("why trains", "transport", "Why does she love trains?")
            .with_fullness(0.4)
            .with_pull(0.8)
            .with_source_discovery(discovery.base.id);

        assert_eq!(question.status, QuestionStatus::Open);
        assert_eq!(question.fullness, 0.4);
        assert_eq!(question.base.pull, 0.8);
        assert_eq!(question.source_discovery, Some(discovery.base.id));
        assert!(question.spawned_hypothesis.is_none());
    }

    #[test]
    fn test_certainty_clamping() {
        let hypothesis = Hypothesis::new("h", "d", "t").with_confidence(1.4);
        assert_eq!(hypothesis.confidence, 1.0);

        let pattern = Pattern::new("p", "d").with_confidence(-1.0);
        assert_eq!(pattern.confidence, 0.0);
    }

    #[test]
    fn test_hypothesis_pattern_links_are_unique() {
        let hypothesis = Hypothesis::new("music helps regulation", "emotions", "Music calms him")
            .with_pattern("sensory regulation")
            .with_pattern("sensory regulation");

        assert_eq!(hypothesis.contributed_to_patterns, vec!["sensory regulation"]);
    }

    #[test]
    fn test_note_evidence_opens_investigation() {
        let mut hypothesis = Hypothesis::new("h", "d", "t");
        let now = Utc::now();

        hypothesis.note_evidence("obs-1", EvidenceEffect::Supports, now);
        hypothesis.note_evidence("obs-2", EvidenceEffect::Contradicts, now);

        let investigation = hypothesis.investigation.as_ref().unwrap();
        assert_eq!(investigation.started_at, now);
        assert_eq!(investigation.evidence.len(), 2);
        assert_eq!(investigation.count(EvidenceEffect::Supports), 1);
    }

    #[test]
    fn test_pattern_domains() {
        let pattern = Pattern::new("routine comfort", "daily life")
            .with_domain("emotions")
            .with_domain("daily life");

        assert_eq!(pattern.domains_involved, vec!["daily life", "emotions"]);
        assert_eq!(pattern.status, PatternStatus::Emerging);
    }
}
