//! Lineage tracing over id references.

use curiosity_rules::{Curiosity, CuriosityId};
use std::collections::{HashSet, VecDeque};

use super::CuriosityStore;

/// Where a curiosity came from and what it led to.
#[derive(Debug, Clone)]
pub struct Lineage<'a> {
    /// Earliest ancestor first.
    pub ancestors: Vec<&'a Curiosity>,
    pub subject: &'a Curiosity,
    /// Nearest descendant first.
    pub descendants: Vec<&'a Curiosity>,
}

impl<'a> Lineage<'a> {
    /// Ancestors, subject, then descendants.
    pub fn chain(&self) -> Vec<&'a Curiosity> {
        self.ancestors
            .iter()
            .copied()
            .chain(std::iter::once(self.subject))
            .chain(self.descendants.iter().copied())
            .collect()
    }

    pub fn foci(&self) -> Vec<&'a str> {
        self.chain().into_iter().map(Curiosity::focus).collect()
    }
}

impl CuriosityStore {
    /// Where a curiosity came from: every ancestor, followed recursively,
    /// earliest first. Descendants are left empty. Cycle-safe.
    pub fn get_lineage(&self, id: CuriosityId) -> Option<Lineage<'_>> {
        self.lineage(id, false)
    }

    /// Every ancestor and descendant reachable from a curiosity. Cycle-safe.
    pub fn trace_full_lineage(&self, id: CuriosityId) -> Option<Lineage<'_>> {
        self.lineage(id, true)
    }

    fn lineage(&self, id: CuriosityId, with_descendants: bool) -> Option<Lineage<'_>> {
        let subject = self.get_by_id(id)?;

        let mut ancestors = self.walk(id, |c| c.ancestor_ids());
        ancestors.reverse();
        let descendants = if with_descendants {
            self.walk(id, |c| self.child_ids(c))
        } else {
            Vec::new()
        };

        Some(Lineage {
            ancestors,
            subject,
            descendants,
        })
    }

    /// Breadth-first walk from `start`, excluding it. Dangling ids are skipped.
    fn walk<F>(&self, start: CuriosityId, next: F) -> Vec<&Curiosity>
    where
        F: Fn(&Curiosity) -> Vec<CuriosityId>,
    {
        let mut found = Vec::new();
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(id) = queue.pop_front() {
            let Some(current) = self.get_by_id(id) else {
                continue;
            };
            for next_id in next(current) {
                if !visited.insert(next_id) {
                    continue;
                }
                if let Some(curiosity) = self.get_by_id(next_id) {
                    found.push(curiosity);
                    queue.push_back(next_id);
                }
            }
        }

        found
    }

    /// Children by id, plus patterns a hypothesis feeds by focus.
    fn child_ids(&self, curiosity: &Curiosity) -> Vec<CuriosityId> {
        let mut ids = curiosity.descendant_ids();
        if let Curiosity::Hypothesis(h) = curiosity {
            ids.extend(
                h.contributed_to_patterns
                    .iter()
                    .filter_map(|focus| self.get_by_focus(focus))
                    .map(Curiosity::id),
            );
        }
        ids
    }
}
