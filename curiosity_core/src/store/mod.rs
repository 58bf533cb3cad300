//! Curiosity Store - type-routed storage for one child's curiosities.

mod lineage;
mod snapshot;

pub use lineage::*;
pub use snapshot::*;

use chrono::{DateTime, Utc};
use curiosity_rules::{
    clamp_unit, Curiosity, CuriosityId, CuriosityKind, CuriosityStatus, Discovery,
    EvidenceEffect, Hypothesis, Nature, Pattern, Question, StatusMismatch, StoreConfig,
};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{CuriosityError, CuriosityResult};
use crate::events::{changes_from, Changes, FieldChange};

/// A partial update. Only provided fields are written.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CuriosityUpdate {
    pub certainty: Option<f64>,
    pub pull: Option<f64>,
    pub status: Option<CuriosityStatus>,
}

impl CuriosityUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fullness or confidence, depending on the variant.
    pub fn certainty(mut self, certainty: f64) -> Self {
        self.certainty = Some(certainty);
        self
    }

    pub fn pull(mut self, pull: f64) -> Self {
        self.pull = Some(pull);
        self
    }

    pub fn status(mut self, status: impl Into<CuriosityStatus>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.certainty.is_none() && self.pull.is_none() && self.status.is_none()
    }
}

/// What an evidence judgment did to its target.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceOutcome {
    pub id: CuriosityId,
    pub effect: EvidenceEffect,
    pub old_certainty: f64,
    pub new_certainty: f64,
    pub changes: Changes,
}

impl EvidenceOutcome {
    /// How far certainty fell. Negative when it rose.
    pub fn drop(&self) -> f64 {
        self.old_certainty - self.new_certainty
    }
}

/// Owns every curiosity of one child, indexed by id and by focus.
///
/// Ids are the only links between entities; the store resolves them.
#[derive(Debug, Clone, Default)]
pub struct CuriosityStore {
    config: StoreConfig,

    entities: HashMap<CuriosityId, Curiosity>,

    /// Insertion order, used as the tie-breaker for sorted views.
    order: Vec<CuriosityId>,

    focus_index: HashMap<String, CuriosityId>,
}

impl CuriosityStore {
    /// Create an empty store with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store tuned by `config`.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether any curiosity, live or settled, already holds `focus`.
    pub fn contains_focus(&self, focus: &str) -> bool {
        self.focus_index.contains_key(focus)
    }

    /// Add a curiosity. Focus and id must both be new.
    pub fn add(&mut self, curiosity: impl Into<Curiosity>) -> CuriosityResult<CuriosityId> {
        let curiosity = curiosity.into();
        let id = curiosity.id();

        if self.entities.contains_key(&id) {
            return Err(CuriosityError::DuplicateId(id));
        }
        if self.focus_index.contains_key(curiosity.focus()) {
            return Err(CuriosityError::DuplicateFocus(curiosity.focus().to_string()));
        }

        debug!(
            id = %id,
            kind = %curiosity.kind(),
            focus = curiosity.focus(),
            "Added curiosity"
        );

        self.focus_index.insert(curiosity.focus().to_string(), id);
        self.order.push(id);
        self.entities.insert(id, curiosity);
        Ok(id)
    }

    /// Add an untyped value carrying a `type` discriminator.
    pub fn add_value(&mut self, value: Value) -> CuriosityResult<CuriosityId> {
        let curiosity = curiosity_from_value(value)?;
        self.add(curiosity)
    }

    /// Remove by id. Absent ids are not an error.
    pub fn remove(&mut self, id: CuriosityId) -> Option<Curiosity> {
        let curiosity = self.entities.remove(&id)?;
        self.focus_index.remove(curiosity.focus());
        self.order.retain(|existing| *existing != id);
        debug!(id = %id, focus = curiosity.focus(), "Removed curiosity");
        Some(curiosity)
    }

    /// Remove by focus, freeing the focus for reuse.
    pub fn remove_by_focus(&mut self, focus: &str) -> Option<Curiosity> {
        let id = *self.focus_index.get(focus)?;
        self.remove(id)
    }

    /// Look up a curiosity by id.
    pub fn get_by_id(&self, id: CuriosityId) -> Option<&Curiosity> {
        self.entities.get(&id)
    }

    /// Mutable access by id. Focus must not be changed through this reference.
    pub fn get_by_id_mut(&mut self, id: CuriosityId) -> Option<&mut Curiosity> {
        self.entities.get_mut(&id)
    }

    /// Look up a curiosity by its focus, the unique subject key.
    pub fn get_by_focus(&self, focus: &str) -> Option<&Curiosity> {
        self.focus_index
            .get(focus)
            .and_then(|id| self.entities.get(id))
    }

    /// Mutable access by focus. Focus must not be changed through this reference.
    pub fn get_by_focus_mut(&mut self, focus: &str) -> Option<&mut Curiosity> {
        let id = *self.focus_index.get(focus)?;
        self.entities.get_mut(&id)
    }

    /// Typed lookup. `None` if `focus` is missing or holds another variant.
    pub fn get_discovery(&self, focus: &str) -> Option<&Discovery> {
        self.get_by_focus(focus).and_then(Curiosity::as_discovery)
    }

    pub fn get_question(&self, focus: &str) -> Option<&Question> {
        self.get_by_focus(focus).and_then(Curiosity::as_question)
    }

    pub fn get_hypothesis(&self, focus: &str) -> Option<&Hypothesis> {
        self.get_by_focus(focus).and_then(Curiosity::as_hypothesis)
    }

    pub fn get_pattern(&self, focus: &str) -> Option<&Pattern> {
        self.get_by_focus(focus).and_then(Curiosity::as_pattern)
    }

    /// Every curiosity in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Curiosity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<CuriosityId> {
        self.order.clone()
    }

    /// Every curiosity, including dormant and settled ones.
    pub fn get_all(&self) -> Vec<&Curiosity> {
        self.iter().collect()
    }

    /// Curiosities of one variant, in insertion order.
    pub fn get_by_type(&self, kind: CuriosityKind) -> Vec<&Curiosity> {
        self.iter().filter(|c| c.kind() == kind).collect()
    }

    /// Receptive (discoveries, questions) or assertive (hypotheses, patterns).
    pub fn get_by_nature(&self, nature: Nature) -> Vec<&Curiosity> {
        self.iter().filter(|c| c.nature() == nature).collect()
    }

    /// Exact domain match.
    pub fn get_by_domain(&self, domain: &str) -> Vec<&Curiosity> {
        self.iter().filter(|c| c.domain() == domain).collect()
    }

    /// Resting curiosities, questioned patterns included.
    pub fn get_dormant(&self) -> Vec<&Curiosity> {
        self.iter().filter(|c| c.is_dormant()).collect()
    }

    /// Live curiosities with at least `min_pull`, strongest pull first.
    pub fn get_active(&self, min_pull: f64) -> Vec<&Curiosity> {
        let mut active: Vec<_> = self
            .iter()
            .filter(|c| c.is_active() && c.pull() >= min_pull)
            .collect();
        sort_by_pull(&mut active);
        active
    }

    /// Known unknowns: unresolved questions and unsettled hypotheses below
    /// the gap threshold, strongest pull first.
    pub fn get_gaps(&self) -> Vec<&Curiosity> {
        let threshold = self.config.gap_threshold;
        let mut gaps: Vec<_> = self
            .iter()
            .filter(|c| match c {
                Curiosity::Question(q) => q.status.is_unresolved() && q.fullness < threshold,
                Curiosity::Hypothesis(h) => h.status.is_unsettled() && h.confidence < threshold,
                _ => false,
            })
            .collect();
        sort_by_pull(&mut gaps);
        gaps
    }

    /// Apply a partial update to the curiosity at `focus`.
    ///
    /// Returns the field changes, or `None` if nothing lives at `focus`.
    /// A status of another variant is rejected before anything is written.
    pub fn update_curiosity(
        &mut self,
        focus: &str,
        update: CuriosityUpdate,
        now: DateTime<Utc>,
    ) -> CuriosityResult<Option<Changes>> {
        let Some(curiosity) = self.get_by_focus_mut(focus) else {
            return Ok(None);
        };

        if let Some(status) = update.status {
            if status.kind() != curiosity.kind() {
                return Err(StatusMismatch {
                    kind: curiosity.kind(),
                    status,
                }
                .into());
            }
        }

        let mut changes = Vec::new();

        if let Some(certainty) = update.certainty {
            let old = curiosity.certainty();
            curiosity.set_certainty(certainty);
            changes.extend(FieldChange::diff(
                curiosity.nature().certainty_field(),
                old,
                curiosity.certainty(),
            ));
        }

        if let Some(pull) = update.pull {
            let old = curiosity.pull();
            curiosity.base_mut().set_pull(pull);
            changes.extend(FieldChange::diff("pull", old, curiosity.pull()));
        }

        if let Some(status) = update.status {
            let old = curiosity.status();
            curiosity.set_status(status)?;
            changes.extend(FieldChange::diff("status", old.as_str(), status.as_str()));
        }

        curiosity.touch(now);

        debug!(focus, changed = changes.len(), "Updated curiosity");
        Ok(Some(changes_from(changes)))
    }

    /// A domain came up: every live curiosity in it gains a little pull.
    pub fn on_domain_touched(
        &mut self,
        domain: &str,
        now: DateTime<Utc>,
    ) -> Vec<(CuriosityId, Changes)> {
        let boost = self.config.domain_touch_pull_boost;
        let mut touched = Vec::new();

        for id in &self.order {
            let Some(curiosity) = self.entities.get_mut(id) else {
                continue;
            };
            if curiosity.domain() != domain || !curiosity.is_active() {
                continue;
            }
            let old = curiosity.pull();
            curiosity.base_mut().set_pull(old + boost);
            curiosity.touch(now);
            let changes = changes_from(FieldChange::diff("pull", old, curiosity.pull()));
            touched.push((*id, changes));
        }

        debug!(domain, touched = touched.len(), "Domain touched");
        touched
    }

    /// Apply an evidence judgment to the curiosity at `focus`.
    ///
    /// Supporting and contradicting evidence move confidence on assertive
    /// variants. Every judgment raises pull and stamps activity.
    pub fn on_evidence_added(
        &mut self,
        focus: &str,
        effect: EvidenceEffect,
        now: DateTime<Utc>,
    ) -> Option<EvidenceOutcome> {
        let config = self.config.clone();
        let curiosity = self.get_by_focus_mut(focus)?;
        let old_certainty = curiosity.certainty();
        let mut changes = Vec::new();

        if curiosity.nature() == Nature::Assertive {
            let delta = match effect {
                EvidenceEffect::Supports => config.supports_delta,
                EvidenceEffect::Contradicts => -config.contradicts_delta,
                EvidenceEffect::Transforms | EvidenceEffect::Neutral => 0.0,
            };
            if delta != 0.0 {
                curiosity.set_certainty(clamp_unit(old_certainty + delta));
                changes.extend(FieldChange::diff(
                    "confidence",
                    old_certainty,
                    curiosity.certainty(),
                ));
            }
        }

        let old_pull = curiosity.pull();
        curiosity
            .base_mut()
            .set_pull(old_pull + config.evidence_pull_boost);
        changes.extend(FieldChange::diff("pull", old_pull, curiosity.pull()));
        curiosity.touch(now);

        debug!(focus, effect = effect.as_str(), "Evidence applied");
        Some(EvidenceOutcome {
            id: curiosity.id(),
            effect,
            old_certainty,
            new_certainty: curiosity.certainty(),
            changes: changes_from(changes),
        })
    }
}

/// Parse a tagged value into a known variant.
pub(crate) fn curiosity_from_value(value: Value) -> CuriosityResult<Curiosity> {
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| CuriosityError::TypeMismatch("missing variant tag".to_string()))?;
    if CuriosityKind::from_tag(tag).is_none() {
        return Err(CuriosityError::TypeMismatch(format!(
            "unknown curiosity variant `{tag}`"
        )));
    }
    Ok(serde_json::from_value(value)?)
}

fn sort_by_pull(curiosities: &mut [&Curiosity]) {
    curiosities.sort_by(|a, b| b.pull().partial_cmp(&a.pull()).unwrap_or(Ordering::Equal));
}

#[cfg(test)]
mod tests {
    use super::*;
    use curiosity_rules::{HypothesisStatus, PatternStatus, QuestionStatus};
    use serde_json::json;

    fn store_with(curiosities: Vec<Curiosity>) -> CuriosityStore {
        let mut store = CuriosityStore::new();
        for curiosity in curiosities {
            store.add(curiosity).unwrap();
        }
        store
    }

    #[test]
    fn test_add_and_lookup() {
        let question = Question::new("why-sky-blue", "light", "Why is the sky blue?");
        let id = question.base.id;
        let mut store = CuriosityStore::new();

        assert_eq!(store.add(question).unwrap(), id);
        assert_eq!(store.get_by_id(id).unwrap().focus(), "why-sky-blue");
        assert!(store.get_question("why-sky-blue").is_some());
        assert!(store.get_hypothesis("why-sky-blue").is_none());
        assert!(store.get_by_focus("unknown").is_none());
    }

    #[test]
    fn test_duplicates_rejected() {
        let discovery = Discovery::new("stars", "space");
        let mut store = CuriosityStore::new();
        store.add(discovery.clone()).unwrap();

        assert!(matches!(
            store.add(discovery),
            Err(CuriosityError::DuplicateId(_))
        ));
        assert!(matches!(
            store.add(Pattern::new("stars", "space")),
            Err(CuriosityError::DuplicateFocus(focus)) if focus == "stars"
        ));
    }

    #[test]
    fn test_add_value_checks_variant() {
        let mut store = CuriosityStore::new();
        let value = serde_json::to_value(Curiosity::from(Discovery::new("d", "x"))).unwrap();
        assert!(store.add_value(value).is_ok());

        let unknown = json!({ "type": "hunch", "focus": "h" });
        assert!(matches!(
            store.add_value(unknown),
            Err(CuriosityError::TypeMismatch(_))
        ));
        assert!(matches!(
            store.add_value(json!({ "focus": "no-tag" })),
            Err(CuriosityError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_remove_is_quiet() {
        let mut store = store_with(vec![Discovery::new("d", "x").into()]);

        assert!(store.remove_by_focus("missing").is_none());
        assert!(store.remove(CuriosityId::new()).is_none());
        assert_eq!(store.remove_by_focus("d").unwrap().focus(), "d");
        assert!(store.is_empty());
        assert!(!store.contains_focus("d"));
    }

    #[test]
    fn test_get_active_sorted_and_stable() {
        let store = store_with(vec![
            Discovery::new("low", "x").with_pull(0.2).into(),
            Discovery::new("tie-a", "x").with_pull(0.7).into(),
            Question::new("answered", "x", "?")
                .with_pull(0.9)
                .with_status(QuestionStatus::Answered)
                .into(),
            Discovery::new("tie-b", "x").with_pull(0.7).into(),
            Pattern::new("resting", "x")
                .with_pull(0.95)
                .with_status(PatternStatus::Questioned)
                .into(),
        ]);

        let foci: Vec<_> = store.get_active(0.0).iter().map(|c| c.focus()).collect();
        assert_eq!(foci, vec!["tie-a", "tie-b", "low"]);

        let strong: Vec<_> = store.get_active(0.5).iter().map(|c| c.focus()).collect();
        assert_eq!(strong, vec!["tie-a", "tie-b"]);
    }

    #[test]
    fn test_get_gaps() {
        let store = store_with(vec![
            Question::new("open-gap", "x", "?").with_fullness(0.2).with_pull(0.3).into(),
            Question::new("nearly-known", "x", "?").with_fullness(0.6).into(),
            Question::new("answered", "x", "?")
                .with_status(QuestionStatus::Answered)
                .into(),
            Hypothesis::new("testing-gap", "x", "t")
                .with_confidence(0.4)
                .with_status(HypothesisStatus::Testing)
                .with_pull(0.8)
                .into(),
            Hypothesis::new("supported", "x", "t")
                .with_confidence(0.3)
                .with_status(HypothesisStatus::Supported)
                .into(),
            Discovery::new("discovery", "x").into(),
        ]);

        let foci: Vec<_> = store.get_gaps().iter().map(|c| c.focus()).collect();
        assert_eq!(foci, vec!["testing-gap", "open-gap"]);
    }

    #[test]
    fn test_grouping_queries() {
        let store = store_with(vec![
            Discovery::new("d", "music").into(),
            Question::new("q", "art", "?").into(),
            Hypothesis::new("h", "music", "t")
                .with_status(HypothesisStatus::Dormant)
                .into(),
            Pattern::new("p", "art").into(),
        ]);

        assert_eq!(store.get_by_type(CuriosityKind::Question).len(), 1);
        assert_eq!(store.get_by_nature(Nature::Receptive).len(), 2);
        assert_eq!(store.get_by_domain("music").len(), 2);
        assert_eq!(store.get_dormant()[0].focus(), "h");
        assert_eq!(store.get_all().len(), 4);
    }

    #[test]
    fn test_update_writes_only_provided_fields() {
        let mut store = store_with(vec![Question::new("q", "x", "?").with_fullness(0.2).into()]);
        let later = Utc::now() + chrono::Duration::hours(1);

        let changes = store
            .update_curiosity(
                "q",
                CuriosityUpdate::new().certainty(1.7).status(QuestionStatus::Partial),
                later,
            )
            .unwrap()
            .unwrap();

        let question = store.get_question("q").unwrap();
        assert_eq!(question.fullness, 1.0);
        assert_eq!(question.status, QuestionStatus::Partial);
        assert_eq!(question.base.pull, 0.5);
        assert_eq!(question.base.last_updated, later);

        assert_eq!(changes["fullness"].to_value, 1.0);
        assert_eq!(changes["status"].from_value, "open");
        assert!(!changes.contains_key("pull"));
    }

    #[test]
    fn test_update_rejects_foreign_status() {
        let mut store = store_with(vec![Question::new("q", "x", "?").into()]);

        let result = store.update_curiosity(
            "q",
            CuriosityUpdate::new().pull(0.9).status(PatternStatus::Solid),
            Utc::now(),
        );

        assert!(matches!(result, Err(CuriosityError::StatusMismatch(_))));
        assert_eq!(store.get_by_focus("q").unwrap().pull(), 0.5);
        assert!(store
            .update_curiosity("missing", CuriosityUpdate::new().pull(0.1), Utc::now())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_evidence_effects() {
        let mut store = store_with(vec![
            Hypothesis::new("h", "x", "t").with_confidence(0.95).into(),
            Question::new("q", "x", "?").with_fullness(0.4).into(),
        ]);
        let now = Utc::now();

        let supported = store.on_evidence_added("h", EvidenceEffect::Supports, now).unwrap();
        assert_eq!(supported.new_certainty, 1.0);
        assert!((store.get_by_focus("h").unwrap().pull() - 0.6).abs() < 1e-9);

        let contradicted = store
            .on_evidence_added("h", EvidenceEffect::Contradicts, now)
            .unwrap();
        assert!((contradicted.new_certainty - 0.85).abs() < 1e-9);
        assert!((contradicted.drop() - 0.15).abs() < 1e-9);

        let reframed = store.on_evidence_added("h", EvidenceEffect::Transforms, now).unwrap();
        assert_eq!(reframed.old_certainty, reframed.new_certainty);
        assert!(!reframed.changes.contains_key("confidence"));

        let receptive = store.on_evidence_added("q", EvidenceEffect::Supports, now).unwrap();
        assert_eq!(receptive.new_certainty, 0.4);

        assert!(store
            .on_evidence_added("missing", EvidenceEffect::Supports, now)
            .is_none());
    }

    #[test]
    fn test_domain_touch_boosts_live_curiosities() {
        let mut store = store_with(vec![
            Discovery::new("live", "music").into(),
            Question::new("done", "music", "?")
                .with_status(QuestionStatus::Answered)
                .into(),
            Discovery::new("elsewhere", "art").into(),
        ]);

        let touched = store.on_domain_touched("music", Utc::now());

        assert_eq!(touched.len(), 1);
        assert!((store.get_by_focus("live").unwrap().pull() - 0.55).abs() < 1e-9);
        assert_eq!(store.get_by_focus("done").unwrap().pull(), 0.5);
        assert_eq!(store.get_by_focus("elsewhere").unwrap().pull(), 0.5);
    }
}
