//! The abstract state at a program point.

use crate::analysis::{AliasClasses, Interval};
use crate::il;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, PartialOrd};
use std::collections::BTreeMap;
use std::fmt;

/// The interval of every slot at a program point, and the slots known to
/// alias each other there.
///
/// Slots without an entry are unconstrained. `State::new()` is therefore the
/// state knowing nothing at all. An unreachable point has no `State`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct State {
    #[serde(with = "value_entries")]
    values: BTreeMap<il::Slot, Interval>,
    aliases: AliasClasses,
}

impl State {
    /// The state where every slot is unconstrained.
    pub fn new() -> State {
        State::default()
    }

    /// This state with `slot` constrained to `interval`. Used to seed the
    /// initial facts of an analysis.
    ///
    /// An interval of another width than the slot's says nothing about it,
    /// and leaves the slot unconstrained.
    pub fn with_value(mut self, slot: il::Slot, interval: Interval) -> State {
        self.set(&slot, interval);
        self
    }

    /// The interval of `slot`.
    pub fn value(&self, slot: &il::Slot) -> Interval {
        self.values
            .get(slot)
            .cloned()
            .unwrap_or_else(|| Interval::top(slot.bits()))
    }

    /// The interval of an operand.
    pub fn eval(&self, operand: &il::Operand) -> Interval {
        match operand {
            il::Operand::Slot(slot) => self.value(slot),
            il::Operand::Constant(constant) => {
                Interval::constant(constant.bits(), constant.value())
            }
        }
    }

    /// Every constrained slot, with its interval.
    pub fn values(&self) -> &BTreeMap<il::Slot, Interval> {
        &self.values
    }

    pub fn aliases(&self) -> &AliasClasses {
        &self.aliases
    }

    fn store(&mut self, slot: &il::Slot, interval: Interval) {
        if interval.is_top() || interval.bits() != slot.bits() {
            self.values.remove(slot);
        } else {
            self.values.insert(slot.clone(), interval);
        }
    }

    /// Write `interval` to `slot`. The slot leaves its alias class.
    pub fn set(&mut self, slot: &il::Slot, interval: Interval) {
        self.aliases.invalidate(slot);
        self.store(slot, interval);
    }

    /// Copy `src` into `dst`. Both slots alias each other afterwards.
    pub fn copy(&mut self, dst: &il::Slot, src: &il::Slot) {
        let interval = self.value(src);
        self.aliases.copy(dst, src);
        self.store(dst, interval);
    }

    /// Constrain `slot`, and every slot aliased with it, to `interval`.
    ///
    /// Returns false if the constraint leaves no possible value, in which case
    /// the state must be discarded.
    pub fn narrow(&mut self, slot: &il::Slot, interval: &Interval) -> bool {
        for alias in self.aliases.class(slot) {
            let narrowed = self.value(&alias).meet(interval);
            if narrowed.is_bottom() {
                return false;
            }
            self.store(&alias, narrowed);
        }
        true
    }

    /// Record that `lhs` and `rhs` hold the same value.
    ///
    /// Returns false if their intervals are disjoint.
    pub fn equate(&mut self, lhs: &il::Slot, rhs: &il::Slot) -> bool {
        let interval = self.value(lhs).meet(&self.value(rhs));
        if !self.narrow(lhs, &interval) || !self.narrow(rhs, &interval) {
            return false;
        }
        if lhs.bits() == rhs.bits() {
            self.aliases.union(lhs, rhs);
        }
        true
    }

    /// The least upper bound of two states.
    ///
    /// A slot stays constrained only if both states constrain it, and two
    /// slots stay aliased only if they are aliased in both states.
    pub fn join(&self, other: &State) -> State {
        self.combine(other, |lhs, rhs| lhs.join(rhs))
    }

    /// Widen `self`, the previous state, with `new`.
    pub fn widen(&self, new: &State) -> State {
        self.combine(new, |old, new| old.widen(new))
    }

    fn combine<F>(&self, other: &State, f: F) -> State
    where
        F: Fn(&Interval, &Interval) -> Interval,
    {
        let mut state = State {
            values: BTreeMap::new(),
            aliases: self.aliases.intersect(&other.aliases),
        };
        for (slot, lhs) in &self.values {
            if let Some(rhs) = other.values.get(slot) {
                state.store(slot, f(lhs, rhs));
            }
        }
        state
    }

    /// Returns true if every fact of `other` also holds in `self`.
    pub fn is_subset_of(&self, other: &State) -> bool {
        other
            .values
            .iter()
            .all(|(slot, interval)| self.value(slot) <= *interval)
            && self.aliases.refines(&other.aliases)
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &State) -> Option<Ordering> {
        if self == other {
            Some(Ordering::Equal)
        } else if self.is_subset_of(other) {
            Some(Ordering::Less)
        } else if other.is_subset_of(self) {
            Some(Ordering::Greater)
        } else {
            None
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let values = self
            .values
            .iter()
            .map(|(slot, interval)| format!("{} = {}", slot, interval))
            .collect::<Vec<String>>();
        write!(f, "{{{}}}", values.join(", "))?;
        if !self.aliases.is_empty() {
            write!(f, " aliases {}", self.aliases)?;
        }
        Ok(())
    }
}

/// Slots are not strings, so the value map is written as a list of pairs.
mod value_entries {
    use crate::analysis::Interval;
    use crate::il;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(
        values: &BTreeMap<il::Slot, Interval>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(values.iter())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<il::Slot, Interval>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries: Vec<(il::Slot, Interval)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}
