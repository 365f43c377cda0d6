//! Set of pinned (fixed) particle indices.

use std::collections::BTreeSet;

/// Ordered set of pinned particle indices.
///
/// Pure data: validation against the particle count happens in
/// `DynamicalSystem`, which knows how many particles exist.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PinSet {
    ids: BTreeSet<usize>,
}

impl PinSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the pin state of `id`; returns whether it is pinned afterwards.
    pub fn toggle(&mut self, id: usize) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    /// Pin or unpin `id`. Unpinning an absent id is a no-op.
    pub fn set(&mut self, id: usize, pinned: bool) {
        if pinned {
            self.ids.insert(id);
        } else {
            self.ids.remove(&id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: usize) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.ids.iter().copied()
    }

    pub fn ids(&self) -> &BTreeSet<usize> {
        &self.ids
    }
}

impl FromIterator<usize> for PinSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
