//! Decay Engine - time-based erosion of pull, plus dormancy and revival.
//!
//! Decay is the only mutation that happens without reasoning. It touches
//! `pull` alone and never cascades.

use chrono::{DateTime, Utc};
use curiosity_rules::{
    Curiosity, CuriosityId, CuriosityStatus, DecayConfig, DiscoveryStatus, HypothesisStatus,
    PatternStatus, QuestionStatus,
};
use tracing::{debug, info};

use crate::error::{CuriosityError, CuriosityResult};
use crate::events::{changes_from, Changes, FieldChange};
use crate::store::CuriosityStore;

/// Pull lost by one curiosity in a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayEntry {
    pub id: CuriosityId,
    pub from: f64,
    pub to: f64,
}

/// Outcome of [`DecayEngine::decay_store`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecayReport {
    pub decayed: Vec<DecayEntry>,
    /// Curiosities that now qualify for dormancy. Not yet transitioned.
    pub dormancy_candidates: Vec<CuriosityId>,
}

impl DecayReport {
    pub fn total_decay(&self) -> f64 {
        self.decayed.iter().map(|e| e.from - e.to).sum()
    }
}

/// Pure decay rules over a [`DecayConfig`].
#[derive(Debug, Clone, Default)]
pub struct DecayEngine {
    config: DecayConfig,
}

impl DecayEngine {
    pub fn new(config: DecayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecayConfig {
        &self.config
    }

    /// Erode pull for the time elapsed since the last decay or activity.
    ///
    /// Returns the amount of pull lost. Calling again with the same `now`
    /// loses nothing.
    pub fn apply_decay(&self, curiosity: &mut Curiosity, now: DateTime<Utc>) -> f64 {
        let days = curiosity.base().days_since_decay(now);
        if days <= 0.0 {
            return 0.0;
        }

        let rate = self.config.rate(curiosity.kind());
        let base = curiosity.base_mut();
        let old = base.pull;
        base.set_pull((old * (1.0 - rate).powf(days)).max(0.0));
        base.last_decayed_at = Some(now);

        old - base.pull
    }

    /// Whether a live curiosity has gone quiet long enough to rest.
    pub fn check_dormancy(&self, curiosity: &Curiosity, now: DateTime<Utc>) -> bool {
        if curiosity.is_dormant() || curiosity.is_terminal() {
            return false;
        }
        curiosity.pull() < self.config.dormancy_pull_floor
            && curiosity.base().days_since_update(now)
                > self.config.dormancy_days(curiosity.kind())
    }

    /// Dormant curiosities can come back; a pattern only from `questioned`.
    pub fn can_revive(&self, curiosity: &Curiosity) -> bool {
        curiosity.is_dormant()
    }

    /// Days of inactivity until pull falls to the dormancy floor.
    ///
    /// Zero when already at or below the floor, `None` when the variant
    /// never decays.
    pub fn calculate_time_to_dormancy(&self, curiosity: &Curiosity) -> Option<f64> {
        let floor = self.config.dormancy_pull_floor;
        let pull = curiosity.pull();
        if pull <= floor {
            return Some(0.0);
        }
        let rate = self.config.rate(curiosity.kind());
        if rate <= 0.0 {
            return None;
        }
        Some((floor / pull).ln() / (1.0 - rate).ln())
    }

    /// Move a live curiosity into its resting state.
    pub fn mark_dormant(&self, curiosity: &mut Curiosity) -> CuriosityResult<Changes> {
        if curiosity.is_dormant() || curiosity.is_terminal() {
            return Err(CuriosityError::InvalidTransition(format!(
                "{} `{}` is {} and cannot go dormant",
                curiosity.kind(),
                curiosity.focus(),
                curiosity.status()
            )));
        }

        let old = curiosity.status();
        let resting = match curiosity {
            Curiosity::Discovery(_) => CuriosityStatus::Discovery(DiscoveryStatus::Dormant),
            Curiosity::Question(_) => CuriosityStatus::Question(QuestionStatus::Dormant),
            Curiosity::Hypothesis(_) => CuriosityStatus::Hypothesis(HypothesisStatus::Dormant),
            Curiosity::Pattern(_) => CuriosityStatus::Pattern(PatternStatus::Questioned),
        };
        curiosity.set_status(resting)?;

        info!(
            id = %curiosity.id(),
            focus = curiosity.focus(),
            "Curiosity went dormant"
        );
        Ok(changes_from(FieldChange::diff(
            "status",
            old.as_str(),
            resting.as_str(),
        )))
    }

    /// Bring a dormant curiosity back to its working state with fresh pull.
    pub fn revive(&self, curiosity: &mut Curiosity, now: DateTime<Utc>) -> CuriosityResult<Changes> {
        if !self.can_revive(curiosity) {
            return Err(CuriosityError::InvalidTransition(format!(
                "{} `{}` is {} and cannot be revived",
                curiosity.kind(),
                curiosity.focus(),
                curiosity.status()
            )));
        }

        let old_status = curiosity.status();
        let working = match curiosity {
            Curiosity::Discovery(_) => CuriosityStatus::Discovery(DiscoveryStatus::Active),
            Curiosity::Question(q) if q.fullness > 0.3 => {
                CuriosityStatus::Question(QuestionStatus::Partial)
            }
            Curiosity::Question(_) => CuriosityStatus::Question(QuestionStatus::Open),
            Curiosity::Hypothesis(_) => CuriosityStatus::Hypothesis(HypothesisStatus::Testing),
            Curiosity::Pattern(_) => CuriosityStatus::Pattern(PatternStatus::Emerging),
        };
        curiosity.set_status(working)?;

        let old_pull = curiosity.pull();
        curiosity
            .base_mut()
            .set_pull(old_pull.max(self.config.revival_pull));
        curiosity.touch(now);

        info!(
            id = %curiosity.id(),
            focus = curiosity.focus(),
            status = %working,
            "Curiosity revived"
        );

        let changes = [
            FieldChange::diff("status", old_status.as_str(), working.as_str()),
            FieldChange::diff("pull", old_pull, curiosity.pull()),
        ];
        Ok(changes_from(changes.into_iter().flatten()))
    }

    /// Decay every non-terminal curiosity and report which now qualify for dormancy.
    pub fn decay_store(&self, store: &mut CuriosityStore, now: DateTime<Utc>) -> DecayReport {
        let mut report = DecayReport::default();

        for id in store.ids() {
            let Some(curiosity) = store.get_by_id_mut(id) else {
                continue;
            };
            if curiosity.is_terminal() {
                continue;
            }

            let from = curiosity.pull();
            let lost = self.apply_decay(curiosity, now);
            if lost > 0.0 {
                report.decayed.push(DecayEntry {
                    id,
                    from,
                    to: curiosity.pull(),
                });
            }
            if self.check_dormancy(curiosity, now) {
                report.dormancy_candidates.push(id);
            }
        }

        debug!(
            decayed = report.decayed.len(),
            candidates = report.dormancy_candidates.len(),
            "Decay sweep finished"
        );
        report
    }
}
