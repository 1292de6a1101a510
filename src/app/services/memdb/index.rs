//! Ordered secondary indices
//!
//! An [`Index`] maps a key (latitude, identifier, level, date, referenced slot
//! id...) to the postings set of slot ids currently holding that key. Indices
//! never own entities; the owning store keeps them in sync on insert and remove.

use super::sequence::{Postings, SetIntersection};
use crate::app::models::SlotId;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::ops::{Bound, RangeBounds};

/// Outcome of a range scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeMatch<'a> {
    /// No key in range: the query can have no result
    Nothing,
    /// Every key in the index is in range: no filtering is needed
    Everything,
    /// Postings of the keys in range, in key order
    Postings(Vec<&'a Postings>),
}

impl RangeMatch<'_> {
    pub fn is_nothing(&self) -> bool {
        matches!(self, RangeMatch::Nothing)
    }
}

/// Ordered key to postings map
#[derive(Debug, Clone)]
pub struct Index<K: Ord> {
    map: BTreeMap<K, Postings>,
}

impl<K: Ord> Default for Index<K> {
    fn default() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }
}

impl<K: Ord> Index<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that slot `id` holds `key`
    pub fn insert(&mut self, key: K, id: SlotId) {
        self.map.entry(key).or_default().insert(id);
    }

    /// Forget that slot `id` holds `key`, dropping the key once unused
    pub fn remove<Q>(&mut self, key: &Q, id: SlotId) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(postings) = self.map.get_mut(key) else {
            return false;
        };
        let removed = postings.remove(&id);
        if postings.is_empty() {
            self.map.remove(key);
        }
        removed
    }

    /// Postings for `key`, or `None` if no slot holds it
    pub fn lookup<Q>(&self, key: &Q) -> Option<&Postings>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.get(key)
    }

    /// Add the postings for `key` to an intersection; false if the key is absent
    pub fn lookup_into<'a, Q>(&'a self, key: &Q, out: &mut SetIntersection<'a>) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.map.get(key) {
            Some(postings) => {
                out.add(postings);
                true
            }
            None => false,
        }
    }

    /// True if slot `id` is recorded under `key`
    pub fn contains<Q>(&self, key: &Q, id: SlotId) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.get(key).is_some_and(|p| p.contains(&id))
    }

    /// Keys greater than or equal to `lo`
    pub fn range_from(&self, lo: &K) -> RangeMatch<'_> {
        self.scan((Bound::Included(lo), Bound::Unbounded))
    }

    /// Keys less than or equal to `hi`
    pub fn range_to(&self, hi: &K) -> RangeMatch<'_> {
        self.scan((Bound::Unbounded, Bound::Included(hi)))
    }

    /// Keys between `lo` and `hi`, both included
    pub fn range_between(&self, lo: &K, hi: &K) -> RangeMatch<'_> {
        if lo > hi {
            return RangeMatch::Nothing;
        }
        self.scan((Bound::Included(lo), Bound::Included(hi)))
    }

    fn scan(&self, range: (Bound<&K>, Bound<&K>)) -> RangeMatch<'_> {
        let (Some((first, _)), Some((last, _))) =
            (self.map.first_key_value(), self.map.last_key_value())
        else {
            return RangeMatch::Nothing;
        };
        if range.contains(first) && range.contains(last) {
            return RangeMatch::Everything;
        }
        let postings: Vec<&Postings> = self.map.range::<K, _>(range).map(|(_, p)| p).collect();
        if postings.is_empty() {
            RangeMatch::Nothing
        } else {
            RangeMatch::Postings(postings)
        }
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.map.keys()
    }

    pub fn first_key(&self) -> Option<&K> {
        self.map.first_key_value().map(|(k, _)| k)
    }

    pub fn last_key(&self) -> Option<&K> {
        self.map.last_key_value().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &Postings)> {
        self.map.iter()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}
