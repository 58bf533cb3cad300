//! Cascade Handler - ripple effects of significant belief changes.
//!
//! Each handler mutates the affected entities in the store and returns one
//! event per changed entity, source effects before pattern effects. A
//! dangling reference skips that ripple only.

use chrono::{DateTime, Utc};
use curiosity_rules::{
    CascadePolicy, Curiosity, CuriosityId, Hypothesis, Nature, Pattern, PatternStatus,
    QuestionStatus,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::events::{changes_from, CuriosityEvent, EntityType, EventType, FieldChange};
use crate::store::CuriosityStore;

/// Who asked for a cascade and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub session_id: String,
    pub child_id: String,
    pub reasoning: String,
}

impl Provenance {
    pub fn new(
        session_id: impl Into<String>,
        child_id: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            child_id: child_id.into(),
            reasoning: reasoning.into(),
        }
    }
}

/// Everything a cascade changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CascadeResult {
    pub affected_ids: Vec<CuriosityId>,
    /// Ready to append, in the order the changes were made.
    pub events: Vec<CuriosityEvent>,
    /// Whether downstream summaries built from these beliefs are stale.
    pub crystal_needs_regeneration: bool,
}

impl CascadeResult {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Collects per-entity events for one cascade.
struct Ripple<'a> {
    provenance: &'a Provenance,
    now: DateTime<Utc>,
    result: CascadeResult,
}

impl<'a> Ripple<'a> {
    fn new(provenance: &'a Provenance, now: DateTime<Utc>, regenerate: bool) -> Self {
        Self {
            provenance,
            now,
            result: CascadeResult {
                crystal_needs_regeneration: regenerate,
                ..CascadeResult::default()
            },
        }
    }

    /// Record one event for `curiosity` if anything actually changed.
    fn record(
        &mut self,
        event_type: EventType,
        curiosity: &Curiosity,
        changes: impl IntoIterator<Item = Option<FieldChange>>,
    ) {
        let changes = changes_from(changes.into_iter().flatten());
        if changes.is_empty() {
            return;
        }
        let mut event = CuriosityEvent::new(
            event_type,
            EntityType::of(curiosity.kind()),
            curiosity.id(),
            self.provenance.reasoning.clone(),
        )
        .with_context(
            self.provenance.session_id.clone(),
            self.provenance.child_id.clone(),
        )
        .with_timestamp(self.now);
        event.changes = changes;

        self.result.affected_ids.push(curiosity.id());
        self.result.events.push(event);
    }

    fn finish(self) -> CascadeResult {
        self.result
    }
}

pub(crate) fn id_value(id: Option<CuriosityId>) -> Value {
    id.map(|id| Value::from(id.to_string())).unwrap_or(Value::Null)
}

/// Applies cascade rules from a [`CascadePolicy`].
///
/// Triggering entities are passed by value snapshot, so callers clone them
/// out of the store before invoking a handler.
#[derive(Debug, Clone, Default)]
pub struct CascadeHandler {
    policy: CascadePolicy,
}

impl CascadeHandler {
    pub fn new(policy: CascadePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CascadePolicy {
        &self.policy
    }

    /// A hypothesis was refuted: reopen its question and weaken its patterns.
    pub fn handle_refutation(
        &self,
        store: &mut CuriosityStore,
        hypothesis: &Hypothesis,
        provenance: &Provenance,
        now: DateTime<Utc>,
    ) -> CascadeResult {
        let mut ripple = Ripple::new(provenance, now, true);

        if let Some(question_id) = hypothesis.source_question {
            match store.get_by_id_mut(question_id) {
                Some(Curiosity::Question(question)) => {
                    let old_status = question.status;
                    let old_link = question.spawned_hypothesis;

                    question.status = if question.fullness > self.policy.reopen_partial_above {
                        QuestionStatus::Partial
                    } else {
                        QuestionStatus::Open
                    };
                    if question.spawned_hypothesis == Some(hypothesis.base.id) {
                        question.spawned_hypothesis = None;
                    }
                    question.base.touch(now);

                    let changes = [
                        FieldChange::diff("status", old_status.as_str(), question.status.as_str()),
                        FieldChange::diff(
                            "spawned_hypothesis",
                            id_value(old_link),
                            id_value(question.spawned_hypothesis),
                        ),
                    ];
                    let question = Curiosity::Question(question.clone());
                    ripple.record(EventType::Updated, &question, changes);
                }
                Some(other) => warn!(
                    hypothesis = %hypothesis.base.id,
                    target = %question_id,
                    kind = %other.kind(),
                    "Source question link points at another variant"
                ),
                None => warn!(
                    hypothesis = %hypothesis.base.id,
                    target = %question_id,
                    "Source question is missing, skipping"
                ),
            }
        }

        for focus in &hypothesis.contributed_to_patterns {
            let Some(pattern) = pattern_mut(store, focus, hypothesis.base.id) else {
                continue;
            };
            let old_confidence = pattern.confidence;
            let old_status = pattern.status;

            pattern.confidence = (old_confidence * self.policy.refute_factor)
                .max(self.policy.refute_floor)
                .min(1.0);
            if old_status == PatternStatus::Solid
                && pattern.confidence < self.policy.questioned_below
            {
                pattern.status = PatternStatus::Questioned;
            }
            pattern.base.touch(now);

            let event_type = if pattern.status == PatternStatus::Questioned
                && old_status != PatternStatus::Questioned
            {
                EventType::PatternQuestioned
            } else {
                EventType::Updated
            };
            let changes = [
                FieldChange::diff("confidence", old_confidence, pattern.confidence),
                FieldChange::diff("status", old_status.as_str(), pattern.status.as_str()),
            ];
            let pattern = Curiosity::Pattern(pattern.clone());
            ripple.record(event_type, &pattern, changes);
        }

        let result = ripple.finish();
        info!(
            hypothesis = hypothesis.base.focus.as_str(),
            affected = result.affected_ids.len(),
            "Refutation cascade"
        );
        result
    }

    /// A hypothesis was confirmed: answer its question and strengthen its patterns.
    pub fn handle_confirmation(
        &self,
        store: &mut CuriosityStore,
        hypothesis: &Hypothesis,
        provenance: &Provenance,
        now: DateTime<Utc>,
    ) -> CascadeResult {
        let mut ripple = Ripple::new(provenance, now, true);

        if let Some(question_id) = hypothesis.source_question {
            match store.get_by_id_mut(question_id) {
                Some(Curiosity::Question(question)) => {
                    let old_status = question.status;
                    let old_fullness = question.fullness;

                    question.status = QuestionStatus::Answered;
                    question.fullness = 1.0;
                    question.base.touch(now);

                    let changes = [
                        FieldChange::diff("status", old_status.as_str(), question.status.as_str()),
                        FieldChange::diff("fullness", old_fullness, question.fullness),
                    ];
                    let question = Curiosity::Question(question.clone());
                    ripple.record(EventType::Updated, &question, changes);
                }
                _ => warn!(
                    hypothesis = %hypothesis.base.id,
                    target = %question_id,
                    "Source question is missing, skipping"
                ),
            }
        }

        for focus in &hypothesis.contributed_to_patterns {
            let Some(pattern) = pattern_mut(store, focus, hypothesis.base.id) else {
                continue;
            };
            let old_confidence = pattern.confidence;
            let old_status = pattern.status;

            pattern.confidence = (old_confidence * self.policy.confirm_factor).min(1.0);
            match old_status {
                PatternStatus::Solid if pattern.confidence >= self.policy.foundational_at => {
                    pattern.status = PatternStatus::Foundational;
                }
                PatternStatus::Emerging if pattern.confidence >= self.policy.solid_at => {
                    pattern.status = PatternStatus::Solid;
                }
                _ => {}
            }
            pattern.base.touch(now);

            let changes = [
                FieldChange::diff("confidence", old_confidence, pattern.confidence),
                FieldChange::diff("status", old_status.as_str(), pattern.status.as_str()),
            ];
            let pattern = Curiosity::Pattern(pattern.clone());
            ripple.record(EventType::PatternStrengthened, &pattern, changes);
        }

        let result = ripple.finish();
        info!(
            hypothesis = hypothesis.base.focus.as_str(),
            affected = result.affected_ids.len(),
            "Confirmation cascade"
        );
        result
    }

    /// A pattern dissolved: unlink its hypotheses and reopen its questions.
    pub fn handle_pattern_dissolved(
        &self,
        store: &mut CuriosityStore,
        pattern: &Pattern,
        provenance: &Provenance,
        now: DateTime<Utc>,
    ) -> CascadeResult {
        let mut ripple = Ripple::new(provenance, now, true);
        let focus = pattern.base.focus.as_str();

        for &hypothesis_id in &pattern.source_hypotheses {
            let Some(Curiosity::Hypothesis(hypothesis)) = store.get_by_id_mut(hypothesis_id) else {
                warn!(pattern = focus, target = %hypothesis_id, "Source hypothesis is missing, skipping");
                continue;
            };
            let before = hypothesis.contributed_to_patterns.clone();
            hypothesis.contributed_to_patterns.retain(|p| p != focus);
            if hypothesis.contributed_to_patterns.len() != before.len() {
                hypothesis.base.touch(now);
            }

            let changes = [FieldChange::diff(
                "contributed_to_patterns",
                before,
                hypothesis.contributed_to_patterns.clone(),
            )];
            let hypothesis = Curiosity::Hypothesis(hypothesis.clone());
            ripple.record(EventType::Updated, &hypothesis, changes);
        }

        for &question_id in &pattern.spawned_questions {
            let Some(Curiosity::Question(question)) = store.get_by_id_mut(question_id) else {
                warn!(pattern = focus, target = %question_id, "Spawned question is missing, skipping");
                continue;
            };
            if question.status == QuestionStatus::Answered {
                continue;
            }
            let old_status = question.status;
            let old_link = question.spawned_hypothesis.take();
            question.status = QuestionStatus::Open;
            question.base.touch(now);

            let changes = [
                FieldChange::diff("status", old_status.as_str(), question.status.as_str()),
                FieldChange::diff("spawned_hypothesis", id_value(old_link), Value::Null),
            ];
            let question = Curiosity::Question(question.clone());
            ripple.record(EventType::Updated, &question, changes);
        }

        let result = ripple.finish();
        info!(pattern = focus, affected = result.affected_ids.len(), "Dissolution cascade");
        result
    }

    /// Evidence knocked a strong belief down hard: pass part of the drop on.
    ///
    /// Only assertive curiosities cascade, and only when the prior belief was
    /// strong and the drop was large.
    pub fn handle_evidence_contradiction(
        &self,
        store: &mut CuriosityStore,
        curiosity: &Curiosity,
        old_confidence: f64,
        new_confidence: f64,
        provenance: &Provenance,
        now: DateTime<Utc>,
    ) -> CascadeResult {
        let drop = old_confidence - new_confidence;
        let major = curiosity.nature() == Nature::Assertive
            && drop > self.policy.contradiction_drop
            && old_confidence >= self.policy.contradiction_prior;
        if !major {
            return CascadeResult::default();
        }

        let mut ripple = Ripple::new(provenance, now, true);

        if let Curiosity::Hypothesis(hypothesis) = curiosity {
            let reduction = (drop * self.policy.contradiction_scale).min(self.policy.contradiction_cap);

            for focus in &hypothesis.contributed_to_patterns {
                let Some(pattern) = pattern_mut(store, focus, hypothesis.base.id) else {
                    continue;
                };
                let old = pattern.confidence;
                pattern.confidence = (old - reduction).max(self.policy.refute_floor).min(1.0);
                pattern.base.touch(now);

                let changes = [FieldChange::diff("confidence", old, pattern.confidence)];
                let pattern = Curiosity::Pattern(pattern.clone());
                ripple.record(EventType::Updated, &pattern, changes);
            }
        }

        let result = ripple.finish();
        info!(
            focus = curiosity.focus(),
            drop,
            affected = result.affected_ids.len(),
            "Contradiction cascade"
        );
        result
    }
}

/// Resolve a pattern a hypothesis points at by focus.
fn pattern_mut<'s>(
    store: &'s mut CuriosityStore,
    focus: &str,
    hypothesis: CuriosityId,
) -> Option<&'s mut Pattern> {
    match store.get_by_focus_mut(focus) {
        Some(Curiosity::Pattern(pattern)) => Some(pattern),
        _ => {
            warn!(hypothesis = %hypothesis, pattern = focus, "Contributed pattern is missing, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curiosity_rules::HypothesisStatus;

    fn provenance() -> Provenance {
        Provenance::new("session-1", "child-1", "observed across three sessions")
    }

    struct Fixture {
        store: CuriosityStore,
        hypothesis: Hypothesis,
        question: CuriosityId,
        pattern: CuriosityId,
    }

    fn fixture(fullness: f64, pattern_confidence: f64, pattern_status: PatternStatus) -> Fixture {
        let mut store = CuriosityStore::new();
        let mut question = curiosity_rules::Question::new("why-calm", "music", "Why is she calm?")
            .with_fullness(fullness);
        let pattern = Pattern::new("sensory-regulation", "senses")
            .with_confidence(pattern_confidence)
            .with_status(pattern_status);
        let hypothesis = Hypothesis::new("music-regulates", "music", "Music helps regulation")
            .with_confidence(0.3)
            .with_source_question(question.base.id)
            .with_pattern("sensory-regulation");
        question.spawned_hypothesis = Some(hypothesis.base.id);

        let question_id = store.add(question).unwrap();
        let pattern_id = store
            .add(pattern.with_source_hypothesis(hypothesis.base.id))
            .unwrap();
        store.add(hypothesis.clone()).unwrap();

        Fixture {
            store,
            hypothesis,
            question: question_id,
            pattern: pattern_id,
        }
    }

    fn question(store: &CuriosityStore, id: CuriosityId) -> &curiosity_rules::Question {
        store.get_by_id(id).and_then(Curiosity::as_question).unwrap()
    }

    fn pattern(store: &CuriosityStore, id: CuriosityId) -> &Pattern {
        store.get_by_id(id).and_then(Curiosity::as_pattern).unwrap()
    }

    #[test]
    fn test_refutation_reopens_question() {
        let mut f = fixture(0.2, 0.5, PatternStatus::Solid);
        let handler = CascadeHandler::default();

        let result = handler.handle_refutation(&mut f.store, &f.hypothesis, &provenance(), Utc::now());

        assert!(result.crystal_needs_regeneration);
        let q = question(&f.store, f.question);
        assert_eq!(q.status, QuestionStatus::Open);
        assert_eq!(q.spawned_hypothesis, None);
        assert_eq!(result.events[0].entity_id, f.question);
        assert!(result.events[0].changes.contains_key("spawned_hypothesis"));
    }

    #[test]
    fn test_refutation_partial_when_question_was_filling() {
        let mut f = fixture(0.45, 0.5, PatternStatus::Emerging);
        let handler = CascadeHandler::default();

        handler.handle_refutation(&mut f.store, &f.hypothesis, &provenance(), Utc::now());

        assert_eq!(question(&f.store, f.question).status, QuestionStatus::Partial);
    }

    #[test]
    fn test_refutation_weakens_and_questions_pattern() {
        let mut f = fixture(0.2, 0.4, PatternStatus::Solid);
        let handler = CascadeHandler::default();

        let result = handler.handle_refutation(&mut f.store, &f.hypothesis, &provenance(), Utc::now());

        let p = pattern(&f.store, f.pattern);
        assert!((p.confidence - 0.28).abs() < 1e-9);
        assert_eq!(p.status, PatternStatus::Questioned);
        assert_eq!(result.events.len(), 2);
        assert_eq!(result.events[1].event_type, EventType::PatternQuestioned);
        assert_eq!(result.affected_ids, vec![f.question, f.pattern]);
    }

    #[test]
    fn test_refutation_floors_pattern_confidence() {
        let mut f = fixture(0.2, 0.12, PatternStatus::Emerging);
        let handler = CascadeHandler::default();

        handler.handle_refutation(&mut f.store, &f.hypothesis, &provenance(), Utc::now());

        let p = pattern(&f.store, f.pattern);
        assert_eq!(p.confidence, 0.1);
        assert_eq!(p.status, PatternStatus::Emerging);
    }

    #[test]
    fn test_confirmation_answers_and_promotes() {
        let mut f = fixture(0.4, 0.5, PatternStatus::Emerging);
        let handler = CascadeHandler::default();

        let result = handler.handle_confirmation(&mut f.store, &f.hypothesis, &provenance(), Utc::now());

        let q = question(&f.store, f.question);
        assert_eq!(q.status, QuestionStatus::Answered);
        assert_eq!(q.fullness, 1.0);

        let p = pattern(&f.store, f.pattern);
        assert!((p.confidence - 0.6).abs() < 1e-9);
        assert_eq!(p.status, PatternStatus::Solid);

        assert!(result.crystal_needs_regeneration);
        assert_eq!(result.events.len(), 2);
        assert_eq!(result.events[1].event_type, EventType::PatternStrengthened);
        assert_eq!(result.events[1].changes["status"].to_value, "solid");
    }

    #[test]
    fn test_confirmation_solid_to_foundational() {
        let mut f = fixture(0.4, 0.7, PatternStatus::Solid);
        let handler = CascadeHandler::default();

        handler.handle_confirmation(&mut f.store, &f.hypothesis, &provenance(), Utc::now());

        let p = pattern(&f.store, f.pattern);
        assert!((p.confidence - 0.84).abs() < 1e-9);
        assert_eq!(p.status, PatternStatus::Foundational);
    }

    #[test]
    fn test_dissolution_unlinks_and_reopens() {
        let mut store = CuriosityStore::new();
        let hypothesis = Hypothesis::new("h", "d", "t").with_pattern("p").with_pattern("other");
        let mut partial = curiosity_rules::Question::new("q1", "d", "?").with_status(QuestionStatus::Partial);
        partial.spawned_hypothesis = Some(hypothesis.base.id);
        let answered = curiosity_rules::Question::new("q2", "d", "?").with_status(QuestionStatus::Answered);
        let pattern = Pattern::new("p", "d")
            .with_source_hypothesis(hypothesis.base.id)
            .with_spawned_question(partial.base.id)
            .with_spawned_question(answered.base.id)
            .with_spawned_question(CuriosityId::new())
            .with_status(PatternStatus::Dissolved);
        store.add(hypothesis).unwrap();
        store.add(partial).unwrap();
        store.add(answered).unwrap();
        store.add(pattern.clone()).unwrap();

        let result = CascadeHandler::default().handle_pattern_dissolved(
            &mut store,
            &pattern,
            &provenance(),
            Utc::now(),
        );

        assert!(result.crystal_needs_regeneration);
        assert_eq!(store.get_hypothesis("h").unwrap().contributed_to_patterns, vec!["other"]);
        let reopened = store.get_question("q1").unwrap();
        assert_eq!(reopened.status, QuestionStatus::Open);
        assert_eq!(reopened.spawned_hypothesis, None);
        assert_eq!(store.get_question("q2").unwrap().status, QuestionStatus::Answered);
        assert_eq!(result.events.len(), 2);

        let reopening = result
            .events
            .iter()
            .find(|e| e.entity_id == reopened.base.id)
            .unwrap();
        assert!(reopening.changes.contains_key("status"));
        assert!(reopening.changes["spawned_hypothesis"].to_value.is_null());
    }

    #[test]
    fn test_major_contradiction_weakens_patterns() {
        let mut f = fixture(0.2, 0.5, PatternStatus::Solid);
        let handler = CascadeHandler::default();
        let subject = Curiosity::Hypothesis(f.hypothesis.clone().with_status(HypothesisStatus::Testing));

        let result = handler.handle_evidence_contradiction(
            &mut f.store,
            &subject,
            0.8,
            0.3,
            &provenance(),
            Utc::now(),
        );

        assert!(result.crystal_needs_regeneration);
        // drop 0.5 -> reduction min(0.2, 0.15)
        assert!((pattern(&f.store, f.pattern).confidence - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_minor_contradiction_does_nothing() {
        let mut f = fixture(0.2, 0.5, PatternStatus::Solid);
        let handler = CascadeHandler::default();
        let subject = Curiosity::Hypothesis(f.hypothesis.clone());
        let receptive_subject = Curiosity::Question(question(&f.store, f.question).clone());

        let small_drop = handler.handle_evidence_contradiction(
            &mut f.store, &subject, 0.9, 0.6, &provenance(), Utc::now(),
        );
        let weak_prior = handler.handle_evidence_contradiction(
            &mut f.store, &subject, 0.6, 0.1, &provenance(), Utc::now(),
        );
        let receptive = handler.handle_evidence_contradiction(
            &mut f.store,
            &receptive_subject,
            0.9,
            0.1,
            &provenance(),
            Utc::now(),
        );

        assert!(!small_drop.crystal_needs_regeneration);
        assert!(!weak_prior.crystal_needs_regeneration);
        assert!(!receptive.crystal_needs_regeneration);
        assert_eq!(pattern(&f.store, f.pattern).confidence, 0.5);
    }

    #[test]
    fn test_dangling_question_does_not_abort() {
        let mut f = fixture(0.2, 0.5, PatternStatus::Emerging);
        f.store.remove(f.question);
        let handler = CascadeHandler::default();

        let result = handler.handle_confirmation(&mut f.store, &f.hypothesis, &provenance(), Utc::now());

        assert_eq!(result.affected_ids, vec![f.pattern]);
        assert_eq!(result.events.len(), 1);
    }
}
