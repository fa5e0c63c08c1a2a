//! Translation of archived state keys into freshly assigned ones.

use super::{State, StateId, StateSnapshot};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Attribute tuple identifying a state within one board.
///
/// `(name, order)` is already unique per board; the timestamps guard against
/// a state that was renamed and re-ranked between snapshot and restore.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateMatchKey {
    name: String,
    order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StateMatchKey {
    /// Builds a match key from state attributes.
    #[must_use]
    pub fn new(
        name: &str,
        order: i32,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            order,
            created_at,
            updated_at,
        }
    }

    /// Returns the key of a persisted state.
    #[must_use]
    pub fn of_state(state: &State) -> Self {
        Self::new(&state.name, state.order, state.created_at, state.updated_at)
    }
}

/// Map from archived state keys to the keys assigned on restore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateKeyMap {
    entries: HashMap<StateId, StateId>,
    unmatched: Vec<StateId>,
}

impl StateKeyMap {
    /// Matches archived states against recreated ones by attribute tuple.
    ///
    /// Original keys with no recreated counterpart are left unmapped and
    /// reported by [`StateKeyMap::unmatched`].
    #[must_use]
    pub fn build(originals: &[StateSnapshot], recreated: &[State]) -> Self {
        let by_key: HashMap<StateMatchKey, StateId> = recreated
            .iter()
            .map(|state| (StateMatchKey::of_state(state), state.id))
            .collect();

        let mut map = Self::default();
        for original in originals {
            match by_key.get(&original.match_key()) {
                Some(new_id) => {
                    map.entries.insert(original.id, *new_id);
                }
                None => map.unmatched.push(original.id),
            }
        }
        map
    }

    /// Returns the new key for an archived key, if one was matched.
    #[must_use]
    pub fn resolve(&self, original: StateId) -> Option<StateId> {
        self.entries.get(&original).copied()
    }

    /// Returns archived keys that found no recreated state.
    #[must_use]
    pub fn unmatched(&self) -> &[StateId] {
        &self.unmatched
    }

    /// Returns the number of mapped keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no key was mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(original, recreated)` pairs in ascending original order.
    pub fn pairs(&self) -> impl Iterator<Item = (StateId, StateId)> + '_ {
        let mut pairs: Vec<_> = self.entries.iter().map(|(from, to)| (*from, *to)).collect();
        pairs.sort_unstable();
        pairs.into_iter()
    }
}
