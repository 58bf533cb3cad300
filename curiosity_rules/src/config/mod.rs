//! Tunable rules: decay rates, dormancy thresholds, and cascade policy.
//!
//! Every value has a default, so a TOML file only needs the keys it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::entities::CuriosityKind;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Decay behavior of one variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariantDecay {
    /// Fraction of pull lost per day.
    pub rate: f64,
    /// Days without activity before a low-pull curiosity goes dormant.
    pub dormancy_days: f64,
}

/// Decay settings for all variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub discovery: VariantDecay,
    pub question: VariantDecay,
    pub hypothesis: VariantDecay,
    pub pattern: VariantDecay,

    /// Pull below which a curiosity may go dormant.
    pub dormancy_pull_floor: f64,

    /// Pull a revived curiosity is raised to.
    pub revival_pull: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            discovery: VariantDecay {
                rate: 0.008,
                dormancy_days: 21.0,
            },
            question: VariantDecay {
                rate: 0.015,
                dormancy_days: 14.0,
            },
            hypothesis: VariantDecay {
                rate: 0.012,
                dormancy_days: 30.0,
            },
            pattern: VariantDecay {
                rate: 0.006,
                dormancy_days: 45.0,
            },
            dormancy_pull_floor: 0.1,
            revival_pull: 0.5,
        }
    }
}

impl DecayConfig {
    /// Settings for one variant.
    pub fn for_kind(&self, kind: CuriosityKind) -> VariantDecay {
        match kind {
            CuriosityKind::Discovery => self.discovery,
            CuriosityKind::Question => self.question,
            CuriosityKind::Hypothesis => self.hypothesis,
            CuriosityKind::Pattern => self.pattern,
        }
    }

    pub fn rate(&self, kind: CuriosityKind) -> f64 {
        self.for_kind(kind).rate
    }

    pub fn dormancy_days(&self, kind: CuriosityKind) -> f64 {
        self.for_kind(kind).dormancy_days
    }
}

/// Store-level nudges applied by activity hooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Certainty below which an unresolved curiosity counts as a gap.
    pub gap_threshold: f64,
    /// Confidence gained from supporting evidence.
    pub supports_delta: f64,
    /// Confidence lost to contradicting evidence.
    pub contradicts_delta: f64,
    /// Pull gained by the curiosity that received evidence.
    pub evidence_pull_boost: f64,
    /// Pull gained by curiosities in a domain that came up.
    pub domain_touch_pull_boost: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            gap_threshold: 0.5,
            supports_delta: 0.1,
            contradicts_delta: 0.15,
            evidence_pull_boost: 0.1,
            domain_touch_pull_boost: 0.05,
        }
    }
}

/// Numeric policy for cascades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadePolicy {
    /// Pattern confidence multiplier on refutation.
    pub refute_factor: f64,
    /// Pattern confidence never drops below this through a cascade.
    pub refute_floor: f64,
    /// A solid pattern below this confidence becomes questioned.
    pub questioned_below: f64,
    /// A reopened question above this fullness becomes partial rather than open.
    pub reopen_partial_above: f64,
    /// Pattern confidence multiplier on confirmation.
    pub confirm_factor: f64,
    /// Solid patterns at or above this confidence become foundational.
    pub foundational_at: f64,
    /// Emerging patterns at or above this confidence become solid.
    pub solid_at: f64,
    /// Minimum confidence drop for a major contradiction.
    pub contradiction_drop: f64,
    /// Minimum prior confidence for a major contradiction.
    pub contradiction_prior: f64,
    /// Share of the drop passed on to patterns.
    pub contradiction_scale: f64,
    /// Largest reduction a contradiction passes on to one pattern.
    pub contradiction_cap: f64,
}

impl Default for CascadePolicy {
    fn default() -> Self {
        Self {
            refute_factor: 0.7,
            refute_floor: 0.1,
            questioned_below: 0.3,
            reopen_partial_above: 0.3,
            confirm_factor: 1.2,
            foundational_at: 0.8,
            solid_at: 0.5,
            contradiction_drop: 0.4,
            contradiction_prior: 0.7,
            contradiction_scale: 0.3,
            contradiction_cap: 0.2,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CuriosityConfig {
    pub decay: DecayConfig,
    pub store: StoreConfig,
    pub cascade: CascadePolicy,
}

impl CuriosityConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check that all values are in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in CuriosityKind::ALL {
            let decay = self.decay.for_kind(kind);
            if !(0.0..1.0).contains(&decay.rate) {
                return Err(ConfigError::Invalid(format!(
                    "{} decay rate {} must be in [0, 1)",
                    kind, decay.rate
                )));
            }
            if decay.dormancy_days < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} dormancy threshold {} must not be negative",
                    kind, decay.dormancy_days
                )));
            }
        }

        let unit_values = [
            ("decay.dormancy_pull_floor", self.decay.dormancy_pull_floor),
            ("decay.revival_pull", self.decay.revival_pull),
            ("store.gap_threshold", self.store.gap_threshold),
            ("store.supports_delta", self.store.supports_delta),
            ("store.contradicts_delta", self.store.contradicts_delta),
            ("store.evidence_pull_boost", self.store.evidence_pull_boost),
            ("store.domain_touch_pull_boost", self.store.domain_touch_pull_boost),
            ("cascade.refute_factor", self.cascade.refute_factor),
            ("cascade.refute_floor", self.cascade.refute_floor),
            ("cascade.questioned_below", self.cascade.questioned_below),
            ("cascade.reopen_partial_above", self.cascade.reopen_partial_above),
            ("cascade.foundational_at", self.cascade.foundational_at),
            ("cascade.solid_at", self.cascade.solid_at),
            ("cascade.contradiction_drop", self.cascade.contradiction_drop),
            ("cascade.contradiction_prior", self.cascade.contradiction_prior),
            ("cascade.contradiction_scale", self.cascade.contradiction_scale),
            ("cascade.contradiction_cap", self.cascade.contradiction_cap),
        ];
        for (name, value) in unit_values {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} = {value} must be in [0, 1]"
                )));
            }
        }

        if self.cascade.confirm_factor < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "cascade.confirm_factor = {} must be at least 1",
                self.cascade.confirm_factor
            )));
        }

        Ok(())
    }
}
