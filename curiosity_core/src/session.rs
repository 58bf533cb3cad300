//! Per-child orchestration of store, decay, cascades and recording.
//!
//! A [`CuriositySession`] owns one child's [`CuriosityStore`] and pairs it
//! with the engine, handler and recorder that act on it. Every reasoned
//! change made through the session lands in the event log; cascade
//! side-effects are recorded under the event that caused them.
//!
//! A change is staged against the store, then its events are appended in one
//! batch. If staging or the append fails the store is put back as it was, so
//! the store never holds a change the log does not explain.

use chrono::{DateTime, Utc};
use curiosity_rules::{
    Curiosity, CuriosityConfig, CuriosityId, CuriosityKind, CuriosityStatus, EvidenceEffect,
    Hypothesis, HypothesisStatus, PatternStatus, QuestionStatus,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cascade::{id_value, CascadeHandler, CascadeResult, Provenance};
use crate::decay::{DecayEngine, DecayReport};
use crate::error::{CuriosityError, CuriosityResult};
use crate::events::{
    changes_from, Changes, CuriosityEvent, EventLog, EventRecorder, EventType, FieldChange,
};
use crate::store::{CuriosityStore, CuriosityUpdate};

/// A recorded change and the cascade it set off.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeOutcome {
    pub event: CuriosityEvent,
    /// Events here are the stored copies, already linked to `event`.
    pub cascade: CascadeResult,
}

/// Result of [`CuriositySession::decay_tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecayTick {
    pub report: DecayReport,
    pub dormancy_events: Vec<CuriosityEvent>,
}

/// One child's curiosity state and the machinery that changes it.
#[derive(Debug)]
pub struct CuriositySession {
    store: CuriosityStore,
    decay: DecayEngine,
    cascade: CascadeHandler,
    recorder: EventRecorder,
}

impl CuriositySession {
    /// Start a session over an empty store.
    pub fn new(
        log: Arc<dyn EventLog>,
        session_id: impl Into<String>,
        child_id: impl Into<String>,
        config: &CuriosityConfig,
    ) -> Self {
        let store = CuriosityStore::with_config(config.store.clone());
        Self::with_store(store, log, session_id, child_id, config)
    }

    /// Start a session over a previously restored store.
    pub fn with_store(
        store: CuriosityStore,
        log: Arc<dyn EventLog>,
        session_id: impl Into<String>,
        child_id: impl Into<String>,
        config: &CuriosityConfig,
    ) -> Self {
        Self {
            store,
            decay: DecayEngine::new(config.decay.clone()),
            cascade: CascadeHandler::new(config.cascade.clone()),
            recorder: EventRecorder::new(log, session_id, child_id),
        }
    }

    pub fn store(&self) -> &CuriosityStore {
        &self.store
    }

    pub fn into_store(self) -> CuriosityStore {
        self.store
    }

    pub fn recorder(&self) -> &EventRecorder {
        &self.recorder
    }

    pub fn log(&self) -> &Arc<dyn EventLog> {
        self.recorder.log()
    }

    pub fn decay_engine(&self) -> &DecayEngine {
        &self.decay
    }

    pub fn cascade_handler(&self) -> &CascadeHandler {
        &self.cascade
    }

    /// Track a new curiosity and fill in the back-references of anything it names.
    pub async fn propose(
        &mut self,
        curiosity: impl Into<Curiosity>,
        reasoning: &str,
    ) -> CuriosityResult<CascadeOutcome> {
        require_reasoning(reasoning)?;
        let checkpoint = self.store.clone();
        let staged = self.stage_proposal(curiosity.into(), reasoning, Utc::now());
        self.commit(checkpoint, staged).await
    }

    /// Explicit update. `None` when nothing actually changed.
    pub async fn update(
        &mut self,
        focus: &str,
        update: CuriosityUpdate,
        reasoning: &str,
    ) -> CuriosityResult<Option<CuriosityEvent>> {
        require_reasoning(reasoning)?;
        let checkpoint = self.store.clone();
        let result = self.apply_update(focus, update, reasoning, Utc::now()).await;
        self.restore_on_error(checkpoint, result)
    }

    /// Apply an evidence judgment and pass on any major contradiction.
    pub async fn apply_evidence(
        &mut self,
        focus: &str,
        effect: EvidenceEffect,
        evidence_ref: Option<&str>,
        reasoning: &str,
    ) -> CuriosityResult<CascadeOutcome> {
        require_reasoning(reasoning)?;
        let checkpoint = self.store.clone();
        let staged = self.stage_evidence(focus, effect, evidence_ref, reasoning, Utc::now());
        self.commit(checkpoint, staged).await
    }

    /// A domain came up in conversation.
    pub async fn touch_domain(
        &mut self,
        domain: &str,
        reasoning: &str,
    ) -> CuriosityResult<Vec<CuriosityEvent>> {
        require_reasoning(reasoning)?;
        let checkpoint = self.store.clone();
        let now = Utc::now();
        let touched = self.store.on_domain_touched(domain, now);

        for (id, changes) in touched {
            if changes.is_empty() {
                continue;
            }
            if let Some(curiosity) = self.store.get_by_id(id) {
                let event = self
                    .recorder
                    .event_for(EventType::Updated, curiosity, changes, reasoning)
                    .with_timestamp(now);
                self.recorder.queue(event);
            }
        }
        let result = self.recorder.flush().await.map_err(CuriosityError::from);
        self.restore_on_error(checkpoint, result)
    }

    pub async fn confirm_hypothesis(
        &mut self,
        focus: &str,
        reasoning: &str,
    ) -> CuriosityResult<CascadeOutcome> {
        require_reasoning(reasoning)?;
        let checkpoint = self.store.clone();
        let staged =
            self.stage_settlement(focus, HypothesisStatus::Confirmed, reasoning, Utc::now());
        self.commit(checkpoint, staged).await
    }

    pub async fn refute_hypothesis(
        &mut self,
        focus: &str,
        reasoning: &str,
    ) -> CuriosityResult<CascadeOutcome> {
        require_reasoning(reasoning)?;
        let checkpoint = self.store.clone();
        let staged = self.stage_settlement(focus, HypothesisStatus::Refuted, reasoning, Utc::now());
        self.commit(checkpoint, staged).await
    }

    pub async fn dissolve_pattern(
        &mut self,
        focus: &str,
        reasoning: &str,
    ) -> CuriosityResult<CascadeOutcome> {
        require_reasoning(reasoning)?;
        let checkpoint = self.store.clone();
        let staged = self.stage_dissolution(focus, reasoning, Utc::now());
        self.commit(checkpoint, staged).await
    }

    /// A question turned into a testable theory.
    pub async fn evolve_question(
        &mut self,
        question_focus: &str,
        hypothesis: Hypothesis,
        reasoning: &str,
    ) -> CuriosityResult<CascadeOutcome> {
        require_reasoning(reasoning)?;
        let successor = hypothesis.base.focus.clone();
        let checkpoint = self.store.clone();
        let staged = self.stage_question_evolution(question_focus, hypothesis, reasoning, Utc::now());
        let outcome = self.commit(checkpoint, staged).await?;

        info!(question = question_focus, hypothesis = %successor, "Question evolved");
        Ok(outcome)
    }

    /// A theory was replaced by a refined successor.
    pub async fn evolve_hypothesis(
        &mut self,
        focus: &str,
        successor: Hypothesis,
        reasoning: &str,
    ) -> CuriosityResult<CascadeOutcome> {
        require_reasoning(reasoning)?;
        let successor_focus = successor.base.focus.clone();
        let checkpoint = self.store.clone();
        let staged = self.stage_hypothesis_evolution(focus, successor, reasoning, Utc::now());
        let outcome = self.commit(checkpoint, staged).await?;

        info!(predecessor = focus, successor = %successor_focus, "Hypothesis evolved");
        Ok(outcome)
    }

    /// Record a written-up synthesis drawn from a curiosity.
    pub async fn record_synthesis(
        &mut self,
        focus: &str,
        synthesis: &str,
        reasoning: &str,
    ) -> CuriosityResult<CuriosityEvent> {
        require_reasoning(reasoning)?;
        let curiosity = self.require(focus)?.clone();
        Ok(self
            .recorder
            .record_synthesis(&curiosity, synthesis, reasoning)
            .await?)
    }

    /// Decay everything to `now` and put quiet, faint curiosities to rest.
    pub async fn decay_tick(&mut self, now: DateTime<Utc>) -> CuriosityResult<DecayTick> {
        let checkpoint = self.store.clone();
        let result = self.rest_quiet_curiosities(now).await;
        self.restore_on_error(checkpoint, result)
    }

    /// Wake a dormant curiosity.
    pub async fn revive(
        &mut self,
        focus: &str,
        reasoning: &str,
    ) -> CuriosityResult<CuriosityEvent> {
        require_reasoning(reasoning)?;
        let checkpoint = self.store.clone();
        let result = self.apply_revival(focus, reasoning, Utc::now()).await;
        self.restore_on_error(checkpoint, result)
    }

    fn stage_proposal(
        &mut self,
        curiosity: Curiosity,
        reasoning: &str,
        now: DateTime<Utc>,
    ) -> CuriosityResult<CascadeOutcome> {
        self.store.add(curiosity.clone())?;
        let cascade = self.link_parents(&curiosity, reasoning, now);
        let event = self
            .recorder
            .creation_event(&curiosity, reasoning)
            .with_timestamp(now);
        Ok(CascadeOutcome { event, cascade })
    }

    async fn apply_update(
        &mut self,
        focus: &str,
        update: CuriosityUpdate,
        reasoning: &str,
        now: DateTime<Utc>,
    ) -> CuriosityResult<Option<CuriosityEvent>> {
        let changes = self
            .store
            .update_curiosity(focus, update, now)?
            .ok_or_else(|| not_found("curiosity", focus))?;
        if changes.is_empty() {
            return Ok(None);
        }

        let curiosity = self.require(focus)?;
        let event = self
            .recorder
            .event_for(EventType::Updated, curiosity, changes, reasoning)
            .with_timestamp(now);
        Ok(Some(self.recorder.record(event).await?))
    }

    fn stage_evidence(
        &mut self,
        focus: &str,
        effect: EvidenceEffect,
        evidence_ref: Option<&str>,
        reasoning: &str,
        now: DateTime<Utc>,
    ) -> CuriosityResult<CascadeOutcome> {
        let outcome = self
            .store
            .on_evidence_added(focus, effect, now)
            .ok_or_else(|| not_found("curiosity", focus))?;
        if let Some(observation) = evidence_ref {
            if let Some(Curiosity::Hypothesis(h)) = self.store.get_by_id_mut(outcome.id) {
                h.note_evidence(observation, effect, now);
            }
        }

        let subject = self.require(focus)?.clone();
        let event = self
            .recorder
            .event_for(EventType::EvidenceAdded, &subject, outcome.changes, reasoning)
            .with_evidence_refs(evidence_ref.map(str::to_string))
            .with_timestamp(now);

        let provenance = self.provenance(reasoning);
        let cascade = self.cascade.handle_evidence_contradiction(
            &mut self.store,
            &subject,
            outcome.old_certainty,
            outcome.new_certainty,
            &provenance,
            now,
        );
        Ok(CascadeOutcome { event, cascade })
    }

    /// Confirm or refute a hypothesis and work out what that does to its neighbours.
    fn stage_settlement(
        &mut self,
        focus: &str,
        status: HypothesisStatus,
        reasoning: &str,
        now: DateTime<Utc>,
    ) -> CuriosityResult<CascadeOutcome> {
        let (hypothesis, changes) = self.transition(focus, status.into(), now)?;
        let Curiosity::Hypothesis(h) = &hypothesis else {
            return Err(wrong_kind(focus, CuriosityKind::Hypothesis, hypothesis.kind()));
        };

        let provenance = self.provenance(reasoning);
        let (event_type, cascade) = match status {
            HypothesisStatus::Confirmed => (
                EventType::Confirmed,
                self.cascade
                    .handle_confirmation(&mut self.store, h, &provenance, now),
            ),
            _ => (
                EventType::Refuted,
                self.cascade
                    .handle_refutation(&mut self.store, h, &provenance, now),
            ),
        };
        let event = self
            .recorder
            .event_for(event_type, &hypothesis, changes, reasoning)
            .with_timestamp(now);
        Ok(CascadeOutcome { event, cascade })
    }

    fn stage_dissolution(
        &mut self,
        focus: &str,
        reasoning: &str,
        now: DateTime<Utc>,
    ) -> CuriosityResult<CascadeOutcome> {
        let (pattern, changes) = self.transition(focus, PatternStatus::Dissolved.into(), now)?;
        let Curiosity::Pattern(p) = &pattern else {
            return Err(wrong_kind(focus, CuriosityKind::Pattern, pattern.kind()));
        };

        let provenance = self.provenance(reasoning);
        let cascade = self
            .cascade
            .handle_pattern_dissolved(&mut self.store, p, &provenance, now);
        let event = self
            .recorder
            .event_for(EventType::PatternDissolved, &pattern, changes, reasoning)
            .with_timestamp(now);
        Ok(CascadeOutcome { event, cascade })
    }

    fn stage_question_evolution(
        &mut self,
        question_focus: &str,
        hypothesis: Hypothesis,
        reasoning: &str,
        now: DateTime<Utc>,
    ) -> CuriosityResult<CascadeOutcome> {
        let question_id = self.require_live(question_focus, CuriosityKind::Question)?;

        let mut hypothesis = hypothesis;
        hypothesis.source_question = Some(question_id);
        let successor_id = hypothesis.base.id;
        let successor = Curiosity::Hypothesis(hypothesis);

        self.store.add(successor.clone())?;
        let (question, mut changes) =
            self.transition(question_focus, QuestionStatus::Evolved.into(), now)?;

        let question = match self.store.get_by_id_mut(question_id) {
            Some(Curiosity::Question(q)) => {
                let old = q.spawned_hypothesis;
                q.spawned_hypothesis = Some(successor_id);
                changes.extend(changes_from(FieldChange::diff(
                    "spawned_hypothesis",
                    id_value(old),
                    id_value(q.spawned_hypothesis),
                )));
                Curiosity::Question(q.clone())
            }
            _ => question,
        };

        let event = self
            .recorder
            .event_for(EventType::Evolved, &question, changes, reasoning)
            .with_timestamp(now);
        let cascade = self.successor_ripple(&successor, reasoning, now);
        Ok(CascadeOutcome { event, cascade })
    }

    fn stage_hypothesis_evolution(
        &mut self,
        focus: &str,
        successor: Hypothesis,
        reasoning: &str,
        now: DateTime<Utc>,
    ) -> CuriosityResult<CascadeOutcome> {
        let predecessor_id = self.require_live(focus, CuriosityKind::Hypothesis)?;

        let mut successor = successor;
        successor.predecessor = Some(predecessor_id);
        let successor_id = successor.base.id;
        let successor = Curiosity::Hypothesis(successor);

        self.store.add(successor.clone())?;
        let (predecessor, mut changes) =
            self.transition(focus, HypothesisStatus::Transformed.into(), now)?;

        let predecessor = match self.store.get_by_id_mut(predecessor_id) {
            Some(Curiosity::Hypothesis(h)) => {
                let old = h.successor;
                h.successor = Some(successor_id);
                changes.extend(changes_from(FieldChange::diff(
                    "successor",
                    id_value(old),
                    id_value(h.successor),
                )));
                Curiosity::Hypothesis(h.clone())
            }
            _ => predecessor,
        };

        let event = self
            .recorder
            .event_for(EventType::Evolved, &predecessor, changes, reasoning)
            .with_timestamp(now);
        let cascade = self.successor_ripple(&successor, reasoning, now);
        Ok(CascadeOutcome { event, cascade })
    }

    async fn rest_quiet_curiosities(&mut self, now: DateTime<Utc>) -> CuriosityResult<DecayTick> {
        let report = self.decay.decay_store(&mut self.store, now);
        let floor = self.decay.config().dormancy_pull_floor;

        let mut resting = Vec::new();
        for &id in &report.dormancy_candidates {
            let Some(curiosity) = self.store.get_by_id_mut(id) else {
                continue;
            };
            let idle_days = curiosity.base().days_since_update(now);
            let pull = curiosity.pull();
            let changes = self.decay.mark_dormant(curiosity)?;
            let reasoning = format!(
                "pull {pull:.3} fell below {floor:.2} after {idle_days:.1} idle days"
            );
            let event = self
                .recorder
                .event_for(EventType::Dormant, curiosity, changes, reasoning)
                .with_timestamp(now);
            resting.push(event);
        }

        for event in resting {
            self.recorder.queue(event);
        }
        let dormancy_events = self.recorder.flush().await?;
        debug!(
            decayed = report.decayed.len(),
            dormant = dormancy_events.len(),
            "Decay tick"
        );
        Ok(DecayTick {
            report,
            dormancy_events,
        })
    }

    async fn apply_revival(
        &mut self,
        focus: &str,
        reasoning: &str,
        now: DateTime<Utc>,
    ) -> CuriosityResult<CuriosityEvent> {
        let curiosity = self
            .store
            .get_by_focus_mut(focus)
            .ok_or_else(|| not_found("curiosity", focus))?;
        let changes = self.decay.revive(curiosity, now)?;
        let event = self
            .recorder
            .event_for(EventType::Revived, curiosity, changes, reasoning)
            .with_timestamp(now);
        Ok(self.recorder.record(event).await?)
    }

    /// Append a staged change and its cascade as one batch.
    ///
    /// Returns the stored copies. On any failure the store goes back to
    /// `checkpoint`.
    async fn commit(
        &mut self,
        checkpoint: CuriosityStore,
        staged: CuriosityResult<CascadeOutcome>,
    ) -> CuriosityResult<CascadeOutcome> {
        let result = match staged {
            Ok(CascadeOutcome { event, mut cascade }) => {
                let children = std::mem::take(&mut cascade.events);
                match self.recorder.record_with_cascade(event, children).await {
                    Ok((event, children)) => {
                        cascade.events = children;
                        Ok(CascadeOutcome { event, cascade })
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e),
        };
        self.restore_on_error(checkpoint, result)
    }

    fn restore_on_error<T>(
        &mut self,
        checkpoint: CuriosityStore,
        result: CuriosityResult<T>,
    ) -> CuriosityResult<T> {
        if let Err(e) = &result {
            if matches!(e, CuriosityError::EventLog(_)) {
                warn!(error = %e, "Event log rejected a change, store restored");
            }
            self.store = checkpoint;
        }
        result
    }

    fn provenance(&self, reasoning: &str) -> Provenance {
        Provenance::new(
            self.recorder.session_id(),
            self.recorder.child_id(),
            reasoning,
        )
    }

    fn require(&self, focus: &str) -> CuriosityResult<&Curiosity> {
        self.store
            .get_by_focus(focus)
            .ok_or_else(|| not_found("curiosity", focus))
    }

    fn require_kind(&self, focus: &str, kind: CuriosityKind) -> CuriosityResult<&Curiosity> {
        let curiosity = self
            .store
            .get_by_focus(focus)
            .ok_or_else(|| not_found(kind.as_str(), focus))?;
        if curiosity.kind() != kind {
            return Err(wrong_kind(focus, kind, curiosity.kind()));
        }
        Ok(curiosity)
    }

    /// The id of a curiosity of `kind` that has not reached a terminal state.
    fn require_live(&self, focus: &str, kind: CuriosityKind) -> CuriosityResult<CuriosityId> {
        let curiosity = self.require_kind(focus, kind)?;
        if curiosity.is_terminal() {
            warn!(focus, status = %curiosity.status(), "Rejected change to a settled curiosity");
            return Err(CuriosityError::InvalidTransition(format!(
                "{kind} `{focus}` is already {}",
                curiosity.status()
            )));
        }
        Ok(curiosity.id())
    }

    /// Move a live curiosity to `status`, returning its new state and the change.
    fn transition(
        &mut self,
        focus: &str,
        status: CuriosityStatus,
        now: DateTime<Utc>,
    ) -> CuriosityResult<(Curiosity, Changes)> {
        self.require_live(focus, status.kind())?;
        let changes = self
            .store
            .update_curiosity(focus, CuriosityUpdate::new().status(status), now)?
            .ok_or_else(|| not_found(status.kind().as_str(), focus))?;
        let curiosity = self.require(focus)?.clone();
        Ok((curiosity, changes))
    }

    /// Back-references owed by a newly tracked curiosity to what it names.
    fn link_parents(
        &mut self,
        curiosity: &Curiosity,
        reasoning: &str,
        now: DateTime<Utc>,
    ) -> CascadeResult {
        let id = curiosity.id();
        let mut linked = Vec::new();

        match curiosity {
            Curiosity::Question(q) => {
                let parent = match q.source_discovery {
                    Some(discovery) => self.store.get_by_id_mut(discovery),
                    None => None,
                };
                if let Some(Curiosity::Discovery(d)) = parent {
                    if !d.spawned_curiosities.contains(&id) {
                        let before = ids_value(&d.spawned_curiosities);
                        d.spawned_curiosities.push(id);
                        d.base.touch(now);
                        let change = FieldChange::new(
                            "spawned_curiosities",
                            before,
                            ids_value(&d.spawned_curiosities),
                        );
                        linked.push((Curiosity::Discovery(d.clone()), change));
                    }
                }
            }
            Curiosity::Hypothesis(h) => {
                let parent = match h.source_question {
                    Some(question) => self.store.get_by_id_mut(question),
                    None => None,
                };
                if let Some(Curiosity::Question(q)) = parent {
                    if q.spawned_hypothesis != Some(id) {
                        let before = id_value(q.spawned_hypothesis);
                        q.spawned_hypothesis = Some(id);
                        q.base.touch(now);
                        let change =
                            FieldChange::new("spawned_hypothesis", before, id_value(Some(id)));
                        linked.push((Curiosity::Question(q.clone()), change));
                    }
                }
                for focus in &h.contributed_to_patterns {
                    if let Some(Curiosity::Pattern(p)) = self.store.get_by_focus_mut(focus) {
                        if !p.source_hypotheses.contains(&id) {
                            let before = ids_value(&p.source_hypotheses);
                            p.source_hypotheses.push(id);
                            p.base.touch(now);
                            let change = FieldChange::new(
                                "source_hypotheses",
                                before,
                                ids_value(&p.source_hypotheses),
                            );
                            linked.push((Curiosity::Pattern(p.clone()), change));
                        }
                    }
                }
            }
            Curiosity::Pattern(p) => {
                for &hypothesis_id in &p.source_hypotheses {
                    let parent = self.store.get_by_id_mut(hypothesis_id);
                    if let Some(Curiosity::Hypothesis(h)) = parent {
                        if !h.contributed_to_patterns.contains(&p.base.focus) {
                            let before = h.contributed_to_patterns.clone();
                            h.contributed_to_patterns.push(p.base.focus.clone());
                            h.base.touch(now);
                            let change = FieldChange::new(
                                "contributed_to_patterns",
                                before,
                                h.contributed_to_patterns.clone(),
                            );
                            linked.push((Curiosity::Hypothesis(h.clone()), change));
                        }
                    }
                }
            }
            Curiosity::Discovery(_) => {}
        }

        let mut result = CascadeResult::default();
        for (parent, change) in linked {
            let event = self
                .recorder
                .event_for(EventType::Updated, &parent, changes_from([change]), reasoning)
                .with_timestamp(now);
            result.affected_ids.push(parent.id());
            result.events.push(event);
        }
        result
    }

    /// Creation of an evolved successor, plus the back-references it is owed.
    fn successor_ripple(
        &mut self,
        successor: &Curiosity,
        reasoning: &str,
        now: DateTime<Utc>,
    ) -> CascadeResult {
        let created = self
            .recorder
            .creation_event(successor, reasoning)
            .with_timestamp(now);
        let links = self.link_parents(successor, reasoning, now);

        let mut ripple = CascadeResult {
            affected_ids: vec![successor.id()],
            events: vec![created],
            crystal_needs_regeneration: false,
        };
        ripple.affected_ids.extend(links.affected_ids);
        ripple.events.extend(links.events);
        ripple
    }
}

fn require_reasoning(reasoning: &str) -> CuriosityResult<()> {
    if reasoning.trim().is_empty() {
        warn!("Rejected a change without reasoning");
        return Err(CuriosityError::MissingReasoning);
    }
    Ok(())
}

fn not_found(kind: &'static str, focus: &str) -> CuriosityError {
    CuriosityError::NotFound {
        kind,
        focus: focus.to_string(),
    }
}

fn wrong_kind(focus: &str, expected: CuriosityKind, found: CuriosityKind) -> CuriosityError {
    CuriosityError::WrongKind {
        focus: focus.to_string(),
        expected,
        found,
    }
}

fn ids_value(ids: &[CuriosityId]) -> Value {
    Value::from(ids.iter().map(ToString::to_string).collect::<Vec<_>>())
}
