//! The closed sum type over all curiosity variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use super::{
    clamp_unit, CuriosityBase, CuriosityId, CuriosityKind, Discovery, Hypothesis, Nature, Pattern,
    Question,
};
use crate::lifecycle::CuriosityStatus;

/// A status was applied to a curiosity of a different variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("status `{status}` does not apply to a {kind}")]
pub struct StatusMismatch {
    pub kind: CuriosityKind,
    pub status: CuriosityStatus,
}

/// Any tracked curiosity.
///
/// Serialized with a `type` discriminator so persisted arrays can be
/// routed back to the right variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Curiosity {
    Discovery(Discovery),
    Question(Question),
    Hypothesis(Hypothesis),
    Pattern(Pattern),
}

impl Curiosity {
    pub fn base(&self) -> &CuriosityBase {
        match self {
            Curiosity::Discovery(d) => &d.base,
            Curiosity::Question(q) => &q.base,
            Curiosity::Hypothesis(h) => &h.base,
            Curiosity::Pattern(p) => &p.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut CuriosityBase {
        match self {
            Curiosity::Discovery(d) => &mut d.base,
            Curiosity::Question(q) => &mut q.base,
            Curiosity::Hypothesis(h) => &mut h.base,
            Curiosity::Pattern(p) => &mut p.base,
        }
    }

    pub fn id(&self) -> CuriosityId {
        self.base().id
    }

    pub fn focus(&self) -> &str {
        &self.base().focus
    }

    pub fn domain(&self) -> &str {
        &self.base().domain
    }

    pub fn pull(&self) -> f64 {
        self.base().pull
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.base().last_updated
    }

    pub fn kind(&self) -> CuriosityKind {
        match self {
            Curiosity::Discovery(_) => CuriosityKind::Discovery,
            Curiosity::Question(_) => CuriosityKind::Question,
            Curiosity::Hypothesis(_) => CuriosityKind::Hypothesis,
            Curiosity::Pattern(_) => CuriosityKind::Pattern,
        }
    }

    pub fn nature(&self) -> Nature {
        self.kind().nature()
    }

    /// Fullness for receptive variants, confidence for assertive ones.
    pub fn certainty(&self) -> f64 {
        match self {
            Curiosity::Discovery(d) => d.fullness,
            Curiosity::Question(q) => q.fullness,
            Curiosity::Hypothesis(h) => h.confidence,
            Curiosity::Pattern(p) => p.confidence,
        }
    }

    /// Set the variant's certainty measure, clamped to [0, 1].
    pub fn set_certainty(&mut self, value: f64) {
        let value = clamp_unit(value);
        match self {
            Curiosity::Discovery(d) => d.fullness = value,
            Curiosity::Question(q) => q.fullness = value,
            Curiosity::Hypothesis(h) => h.confidence = value,
            Curiosity::Pattern(p) => p.confidence = value,
        }
    }

    pub fn status(&self) -> CuriosityStatus {
        match self {
            Curiosity::Discovery(d) => CuriosityStatus::Discovery(d.status),
            Curiosity::Question(q) => CuriosityStatus::Question(q.status),
            Curiosity::Hypothesis(h) => CuriosityStatus::Hypothesis(h.status),
            Curiosity::Pattern(p) => CuriosityStatus::Pattern(p.status),
        }
    }

    /// Set the status. The status must belong to this variant.
    pub fn set_status(&mut self, status: CuriosityStatus) -> Result<(), StatusMismatch> {
        match (self, status) {
            (Curiosity::Discovery(d), CuriosityStatus::Discovery(s)) => d.status = s,
            (Curiosity::Question(q), CuriosityStatus::Question(s)) => q.status = s,
            (Curiosity::Hypothesis(h), CuriosityStatus::Hypothesis(s)) => h.status = s,
            (Curiosity::Pattern(p), CuriosityStatus::Pattern(s)) => p.status = s,
            (this, status) => {
                return Err(StatusMismatch {
                    kind: this.kind(),
                    status,
                })
            }
        }
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn is_dormant(&self) -> bool {
        self.status().is_dormant()
    }

    /// Neither terminal nor resting.
    pub fn is_active(&self) -> bool {
        !self.is_terminal() && !self.is_dormant()
    }

    /// Stamp activity.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.base_mut().touch(now);
    }

    pub fn as_discovery(&self) -> Option<&Discovery> {
        match self {
            Curiosity::Discovery(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_question(&self) -> Option<&Question> {
        match self {
            Curiosity::Question(q) => Some(q),
            _ => None,
        }
    }

    pub fn as_question_mut(&mut self) -> Option<&mut Question> {
        match self {
            Curiosity::Question(q) => Some(q),
            _ => None,
        }
    }

    pub fn as_hypothesis(&self) -> Option<&Hypothesis> {
        match self {
            Curiosity::Hypothesis(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_hypothesis_mut(&mut self) -> Option<&mut Hypothesis> {
        match self {
            Curiosity::Hypothesis(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_pattern(&self) -> Option<&Pattern> {
        match self {
            Curiosity::Pattern(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_pattern_mut(&mut self) -> Option<&mut Pattern> {
        match self {
            Curiosity::Pattern(p) => Some(p),
            _ => None,
        }
    }

    /// Ids this curiosity descends from.
    pub fn ancestor_ids(&self) -> Vec<CuriosityId> {
        match self {
            Curiosity::Discovery(_) => Vec::new(),
            Curiosity::Question(q) => q.source_discovery.into_iter().collect(),
            Curiosity::Hypothesis(h) => h
                .source_question
                .into_iter()
                .chain(h.predecessor)
                .collect(),
            Curiosity::Pattern(p) => p.source_hypotheses.clone(),
        }
    }

    /// Ids this curiosity led to, by id reference. Pattern links held by
    /// focus are resolved by the store.
    pub fn descendant_ids(&self) -> Vec<CuriosityId> {
        match self {
            Curiosity::Discovery(d) => d.spawned_curiosities.clone(),
            Curiosity::Question(q) => q.spawned_hypothesis.into_iter().collect(),
            Curiosity::Hypothesis(h) => h.successor.into_iter().collect(),
            Curiosity::Pattern(p) => p.spawned_questions.clone(),
        }
    }

    /// Flat field view used for creation events and replay.
    ///
    /// Base fields are lifted to the top level; `id` is omitted since the
    /// event carries it separately.
    pub fn field_map(&self) -> BTreeMap<String, Value> {
        let mut fields = BTreeMap::new();
        let Ok(Value::Object(mut object)) = serde_json::to_value(self) else {
            return fields;
        };
        if let Some(Value::Object(base)) = object.remove("base") {
            fields.extend(base.into_iter().filter(|(key, _)| key != "id"));
        }
        fields.extend(object);
        fields
    }
}

impl From<Discovery> for Curiosity {
    fn from(value: Discovery) -> Self {
        Curiosity::Discovery(value)
    }
}

impl From<Question> for Curiosity {
    fn from(value: Question) -> Self {
        Curiosity::Question(value)
    }
}

impl From<Hypothesis> for Curiosity {
    fn from(value: Hypothesis) -> Self {
        Curiosity::Hypothesis(value)
    }
}

impl From<Pattern> for Curiosity {
    fn from(value: Pattern) -> Self {
        Curiosity::Pattern(value)
    }
}
