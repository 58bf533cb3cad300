//! Persisted layout: one array per variant, each entity tagged with its variant.

use curiosity_rules::{Curiosity, CuriosityKind, StoreConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CuriosityStore;
use crate::error::{CuriosityError, CuriosityResult};

/// Serializable image of a [`CuriosityStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub discoveries: Vec<Curiosity>,
    pub questions: Vec<Curiosity>,
    pub hypotheses: Vec<Curiosity>,
    pub patterns: Vec<Curiosity>,
}

impl StoreSnapshot {
    pub fn to_json(&self) -> CuriosityResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> CuriosityResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.discoveries.len() + self.questions.len() + self.hypotheses.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn arrays(self) -> [(CuriosityKind, Vec<Curiosity>); 4] {
        [
            (CuriosityKind::Discovery, self.discoveries),
            (CuriosityKind::Question, self.questions),
            (CuriosityKind::Hypothesis, self.hypotheses),
            (CuriosityKind::Pattern, self.patterns),
        ]
    }
}

impl CuriosityStore {
    /// Group every curiosity into its variant's array.
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::default();
        for curiosity in self.iter() {
            let array = match curiosity.kind() {
                CuriosityKind::Discovery => &mut snapshot.discoveries,
                CuriosityKind::Question => &mut snapshot.questions,
                CuriosityKind::Hypothesis => &mut snapshot.hypotheses,
                CuriosityKind::Pattern => &mut snapshot.patterns,
            };
            array.push(curiosity.clone());
        }
        snapshot
    }

    /// Rebuild a store. An entity filed under the wrong variant is rejected.
    pub fn from_snapshot(snapshot: StoreSnapshot, config: StoreConfig) -> CuriosityResult<Self> {
        let mut store = Self::with_config(config);
        for (kind, curiosities) in snapshot.arrays() {
            for curiosity in curiosities {
                if curiosity.kind() != kind {
                    return Err(CuriosityError::TypeMismatch(format!(
                        "{} `{}` filed under {}",
                        curiosity.kind(),
                        curiosity.focus(),
                        kind
                    )));
                }
                store.add(curiosity)?;
            }
        }
        debug!(count = store.len(), "Restored curiosity store");
        Ok(store)
    }

    pub fn to_json(&self) -> CuriosityResult<String> {
        self.snapshot().to_json()
    }

    pub fn from_json(json: &str, config: StoreConfig) -> CuriosityResult<Self> {
        Self::from_snapshot(StoreSnapshot::from_json(json)?, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curiosity_rules::{Discovery, Hypothesis, Pattern, Question};

    #[test]
    fn test_store_round_trip() {
        let mut store = CuriosityStore::new();
        store.add(Discovery::new("d", "nature").with_fullness(0.3)).unwrap();
        store
            .add(Question::new("q", "nature", "Why do leaves fall?").with_pull(0.8))
            .unwrap();
        store
            .add(Hypothesis::new("h", "nature", "Cold makes leaves fall").with_pattern("p"))
            .unwrap();
        store
            .add(Pattern::new("p", "nature").with_domain("weather"))
            .unwrap();

        let json = store.to_json().unwrap();
        let restored = CuriosityStore::from_json(&json, StoreConfig::default()).unwrap();

        assert_eq!(restored.len(), store.len());
        for curiosity in store.iter() {
            assert_eq!(restored.get_by_id(curiosity.id()), Some(curiosity));
            assert_eq!(restored.get_by_focus(curiosity.focus()), Some(curiosity));
        }
    }

    #[test]
    fn test_misfiled_entity_rejected() {
        let snapshot = StoreSnapshot {
            discoveries: vec![Question::new("q", "d", "?").into()],
            ..StoreSnapshot::default()
        };

        let result = CuriosityStore::from_snapshot(snapshot, StoreConfig::default());
        assert!(matches!(result, Err(CuriosityError::TypeMismatch(_))));
    }

    #[test]
    fn test_variant_tag_in_json() {
        let mut store = CuriosityStore::new();
        store.add(Pattern::new("p", "d")).unwrap();

        let value: serde_json::Value = serde_json::from_str(&store.to_json().unwrap()).unwrap();
        assert_eq!(value["patterns"][0]["type"], "pattern");
        assert!(value["discoveries"].as_array().unwrap().is_empty());
    }
}
