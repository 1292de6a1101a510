//! Query result accumulator
//!
//! A [`Results`] collects the constraints of one query against one arena:
//! exact postings sets to intersect, range scans to union and then intersect,
//! and residual filters to apply to every candidate. Nothing is materialised
//! until the results are iterated.

use super::arena::Arena;
use super::index::RangeMatch;
use super::sequence::{Intersection, Postings, Sequence, SetIntersection, union_sets};
use crate::app::models::SlotId;
use std::fmt;

/// Residual predicate on a stored entity
pub type Filter<'a, T> = Box<dyn Fn(&T) -> bool + 'a>;

/// Lazily evaluated query result over an arena
pub struct Results<'a, T> {
    arena: &'a Arena<T>,
    empty: bool,
    select_all: bool,
    exact: SetIntersection<'a>,
    singleton: Option<SlotId>,
    unions: Vec<Vec<&'a Postings>>,
    filters: Vec<Filter<'a, T>>,
}

impl<'a, T> Results<'a, T> {
    pub fn new(arena: &'a Arena<T>) -> Self {
        Self {
            arena,
            empty: false,
            select_all: true,
            exact: SetIntersection::new(),
            singleton: None,
            unions: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// True once the results are known to be empty
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// True if no constraint has been added
    pub fn is_select_all(&self) -> bool {
        !self.empty && self.select_all
    }

    /// Force the results to be empty, whatever is added later
    pub fn mark_empty(&mut self) {
        self.empty = true;
        self.select_all = false;
    }

    /// Intersect with a postings set
    pub fn add_exact(&mut self, postings: &'a Postings) {
        self.select_all = false;
        if postings.is_empty() {
            self.mark_empty();
            return;
        }
        self.exact.add(postings);
    }

    /// Intersect with the single slot `id`
    pub fn add_singleton(&mut self, id: SlotId) {
        self.select_all = false;
        match self.singleton {
            Some(existing) if existing != id => self.mark_empty(),
            _ => self.singleton = Some(id),
        }
    }

    /// Intersect with the union of several postings sets
    pub fn add_range_union(&mut self, postings: Vec<&'a Postings>) {
        self.select_all = false;
        if postings.iter().all(|p| p.is_empty()) {
            self.mark_empty();
            return;
        }
        self.unions.push(postings);
    }

    /// Apply the outcome of a range scan
    pub fn add_range(&mut self, range: RangeMatch<'a>) {
        match range {
            RangeMatch::Nothing => self.mark_empty(),
            RangeMatch::Everything => {}
            RangeMatch::Postings(postings) => self.add_range_union(postings),
        }
    }

    /// Require every result to satisfy `filter`
    pub fn add_filter(&mut self, filter: impl Fn(&T) -> bool + 'a) {
        self.select_all = false;
        self.filters.push(Box::new(filter));
    }

    /// Ordered candidate slot ids, `None` when only filters constrain the arena
    fn candidates(&self) -> Option<Sequence<'a>> {
        let mut sources: Vec<Sequence<'a>> = Vec::new();
        if !self.exact.is_empty() {
            sources.push(Box::new(self.exact.iter()));
        }
        if let Some(id) = self.singleton {
            sources.push(Box::new(std::iter::once(id)));
        }
        for postings in &self.unions {
            sources.push(Box::new(union_sets(postings.iter().copied())));
        }
        match sources.len() {
            0 => None,
            1 => sources.pop(),
            _ => Some(Box::new(Intersection::new(sources))),
        }
    }

    fn accepts(&self, value: &T) -> bool {
        self.filters.iter().all(|filter| filter(value))
    }

    /// Matching entities in ascending slot order
    pub fn iter(&self) -> Box<dyn Iterator<Item = (SlotId, &'a T)> + '_> {
        if self.empty {
            return Box::new(std::iter::empty());
        }
        let arena = self.arena;
        match self.candidates() {
            None => Box::new(arena.iter().filter(move |(_, value)| self.accepts(value))),
            Some(ids) => Box::new(
                ids.filter_map(move |id| arena.get(id).map(|value| (id, value)))
                    .filter(move |(_, value)| self.accepts(value)),
            ),
        }
    }

    /// Matching slot ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.iter().map(|(id, _)| id)
    }

    /// Matching slot ids collected in a vector
    pub fn to_ids(&self) -> Vec<SlotId> {
        self.ids().collect()
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }
}

impl<T> fmt::Debug for Results<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Results")
            .field("empty", &self.empty)
            .field("select_all", &self.select_all)
            .field("exact_sets", &self.exact.len())
            .field("singleton", &self.singleton)
            .field("unions", &self.unions.len())
            .field("filters", &self.filters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> Arena<i32> {
        let mut arena = Arena::new();
        for i in 0..10 {
            arena.add(i * 10);
        }
        arena
    }

    fn set(values: &[SlotId]) -> Postings {
        values.iter().copied().collect()
    }

    #[test]
    fn test_unconstrained_selects_all() {
        let mut arena = arena();
        arena.remove(4);
        let res = Results::new(&arena);
        assert!(res.is_select_all());
        assert!(!res.is_empty());
        assert_eq!(res.count(), 9);
        assert!(!res.to_ids().contains(&4));
    }

    #[test]
    fn test_exact_and_union_intersection() {
        let arena = arena();
        let a = set(&[1, 2, 3, 5, 8]);
        let b = set(&[2, 3]);
        let c = set(&[5, 8, 9]);
        let mut res = Results::new(&arena);
        res.add_exact(&a);
        res.add_range_union(vec![&b, &c]);
        assert!(!res.is_select_all());
        assert_eq!(res.to_ids(), vec![2, 3, 5, 8]);
    }

    #[test]
    fn test_filters_apply_to_candidates() {
        let arena = arena();
        let a = set(&[1, 2, 3, 4]);
        let mut res = Results::new(&arena);
        res.add_exact(&a);
        res.add_filter(|v: &i32| *v >= 30);
        assert_eq!(res.to_ids(), vec![3, 4]);
    }

    #[test]
    fn test_filter_only_enumerates_arena() {
        let arena = arena();
        let mut res = Results::new(&arena);
        res.add_filter(|v: &i32| v % 20 == 0);
        assert!(!res.is_select_all());
        assert_eq!(res.to_ids(), vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn test_mark_empty_wins() {
        let arena = arena();
        let a = set(&[1, 2]);
        let mut res = Results::new(&arena);
        res.mark_empty();
        res.add_exact(&a);
        assert!(res.is_empty());
        assert!(!res.is_select_all());
        assert_eq!(res.count(), 0);
    }

    #[test]
    fn test_singletons() {
        let arena = arena();
        let a = set(&[3, 4, 5]);
        let mut res = Results::new(&arena);
        res.add_singleton(4);
        res.add_exact(&a);
        assert_eq!(res.to_ids(), vec![4]);

        let mut res = Results::new(&arena);
        res.add_singleton(4);
        res.add_singleton(5);
        assert!(res.is_empty());
    }

    #[test]
    fn test_holes_are_skipped() {
        let mut arena = arena();
        let a = set(&[1, 2, 3]);
        arena.remove(2);
        let mut res = Results::new(&arena);
        res.add_exact(&a);
        assert_eq!(res.to_ids(), vec![1, 3]);
    }

    #[test]
    fn test_range_outcomes() {
        let arena = arena();
        let a = set(&[7]);

        let mut res = Results::new(&arena);
        res.add_range(RangeMatch::Everything);
        assert!(res.is_select_all());

        res.add_range(RangeMatch::Postings(vec![&a]));
        assert_eq!(res.to_ids(), vec![7]);

        res.add_range(RangeMatch::Nothing);
        assert!(res.is_empty());
    }

    #[test]
    fn test_empty_postings_mark_empty() {
        let arena = arena();
        let empty = Postings::new();
        let mut res = Results::new(&arena);
        res.add_exact(&empty);
        assert!(res.is_empty());
    }
}
