// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use log::debug;
use std::{collections::BTreeMap, fmt::Display};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Edit<V> {
    Set(V),
    Remove,
}

/// A pure map of edits applied on top of a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Overlay<K: Ord, V> {
    edits: BTreeMap<K, Edit<V>>,
}

impl<K: Ord, V> Default for Overlay<K, V> {
    fn default() -> Self {
        Self {
            edits: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V> Overlay<K, V> {
    pub fn set(mut self, key: K, value: V) -> Self {
        self.edits.insert(key, Edit::Set(value));
        self
    }

    pub fn remove(mut self, key: K) -> Self {
        self.edits.insert(key, Edit::Remove);
        self
    }

    pub fn set_all(self, entries: impl IntoIterator<Item = (K, V)>) -> Self {
        entries.into_iter().fold(self, |overlay, (key, value)| overlay.set(key, value))
    }

    pub fn remove_all(self, keys: impl IntoIterator<Item = K>) -> Self {
        keys.into_iter().fold(self, |overlay, key| overlay.remove(key))
    }

    pub fn edits(&self) -> impl Iterator<Item = (&K, &Edit<V>)> {
        self.edits.iter()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Composes two overlays: applying the result equals applying `self`, then `next`.
    pub fn then(mut self, next: Self) -> Self {
        self.edits.extend(next.edits);
        self
    }
}

/// Applies `overlay` to `base`, returning a new table. Later edits replace earlier
/// entries; replacements are reported at debug level.
pub fn merge<K, V>(base: &BTreeMap<K, V>, overlay: &Overlay<K, V>) -> BTreeMap<K, V>
where
    K: Ord + Clone + Display,
    V: Clone,
{
    let mut table = base.clone();
    for (key, edit) in overlay.edits() {
        match edit {
            Edit::Set(value) => {
                if table.insert(key.clone(), value.clone()).is_some() {
                    debug!("overlay replaces entry for `{}`", key);
                }
            }
            Edit::Remove => {
                table.remove(key);
            }
        }
    }
    table
}
