//! Alias classes: sets of slots known to hold the same value.

use crate::il;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A partition of slots into classes of slots holding identical values.
///
/// Only classes of two or more slots are stored. A slot in no class is only
/// known to be equal to itself.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct AliasClasses {
    classes: BTreeSet<BTreeSet<il::Slot>>,
}

impl AliasClasses {
    pub fn new() -> AliasClasses {
        AliasClasses::default()
    }

    /// Every class of two or more aliased slots.
    pub fn classes(&self) -> impl Iterator<Item = &BTreeSet<il::Slot>> {
        self.classes.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn class_of(&self, slot: &il::Slot) -> Option<&BTreeSet<il::Slot>> {
        self.classes.iter().find(|class| class.contains(slot))
    }

    /// Every slot aliased with `slot`, including `slot` itself.
    pub fn class(&self, slot: &il::Slot) -> BTreeSet<il::Slot> {
        match self.class_of(slot) {
            Some(class) => class.clone(),
            None => {
                let mut class = BTreeSet::new();
                class.insert(slot.clone());
                class
            }
        }
    }

    pub fn are_aliased(&self, lhs: &il::Slot, rhs: &il::Slot) -> bool {
        lhs == rhs
            || self
                .class_of(lhs)
                .map(|class| class.contains(rhs))
                .unwrap_or(false)
    }

    /// `slot` was overwritten, and no longer holds the value of its class.
    pub fn invalidate(&mut self, slot: &il::Slot) {
        let class = match self.class_of(slot) {
            Some(class) => class.clone(),
            None => return,
        };
        self.classes.remove(&class);
        let mut class = class;
        class.remove(slot);
        if class.len() > 1 {
            self.classes.insert(class);
        }
    }

    /// `dst` now holds the value of `src`.
    pub fn copy(&mut self, dst: &il::Slot, src: &il::Slot) {
        if dst == src {
            return;
        }
        self.invalidate(dst);
        self.union(dst, src);
    }

    /// Merge the classes of two slots now known to hold the same value.
    pub fn union(&mut self, lhs: &il::Slot, rhs: &il::Slot) {
        if self.are_aliased(lhs, rhs) {
            return;
        }
        let lhs_class = self.class(lhs);
        let rhs_class = self.class(rhs);
        self.classes.remove(&lhs_class);
        self.classes.remove(&rhs_class);
        self.classes
            .insert(lhs_class.union(&rhs_class).cloned().collect());
    }

    /// The aliases holding on both sides of a merge.
    pub fn intersect(&self, other: &AliasClasses) -> AliasClasses {
        let mut classes = BTreeSet::new();
        for lhs in &self.classes {
            for rhs in &other.classes {
                let class: BTreeSet<il::Slot> = lhs.intersection(rhs).cloned().collect();
                if class.len() > 1 {
                    classes.insert(class);
                }
            }
        }
        AliasClasses { classes }
    }

    /// Returns true if every alias in `other` also holds in `self`.
    pub fn refines(&self, other: &AliasClasses) -> bool {
        other.classes.iter().all(|class| {
            self.classes
                .iter()
                .any(|candidate| class.is_subset(candidate))
        })
    }
}

impl fmt::Display for AliasClasses {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let classes = self
            .classes
            .iter()
            .map(|class| {
                let slots = class
                    .iter()
                    .map(|slot| slot.to_string())
                    .collect::<Vec<String>>();
                format!("{{{}}}", slots.join(" = "))
            })
            .collect::<Vec<String>>();
        write!(f, "{}", classes.join(" "))
    }
}
