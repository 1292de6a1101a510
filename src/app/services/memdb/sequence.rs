//! Lazy set algebra over sorted slot id sequences
//!
//! Index postings are sorted and duplicate free, so they can be combined with
//! cursor merges instead of hash sets:
//! - [`Intersection`] advances every cursor below the current maximum until all
//!   of them agree, then emits that value
//! - [`Union`] emits the current minimum and advances every cursor sitting on it
//! - [`SetIntersection`] collects postings sets and seeks each one to the
//!   largest first element before running [`Intersection`], skipping values
//!   that cannot be in the result without visiting them
//!
//! The intersection of zero sequences is never requested by the stores and
//! yields nothing; the union of zero sequences is empty.

use crate::app::models::SlotId;
use std::collections::BTreeSet;
use std::collections::btree_set;
use std::iter::{Copied, Peekable};

/// Slot ids currently holding one index key
pub type Postings = BTreeSet<SlotId>;

/// Boxed sorted slot id sequence
pub type Sequence<'a> = Box<dyn Iterator<Item = SlotId> + 'a>;

/// Cursor over a postings set
pub type SetCursor<'a> = Copied<btree_set::Range<'a, SlotId>>;

/// Values present in every input sequence, in increasing order
pub struct Intersection<I: Iterator<Item = SlotId>> {
    cursors: Vec<Peekable<I>>,
    done: bool,
}

impl<I: Iterator<Item = SlotId>> Intersection<I> {
    pub fn new(sources: impl IntoIterator<Item = I>) -> Self {
        let cursors: Vec<_> = sources.into_iter().map(Iterator::peekable).collect();
        let done = cursors.is_empty();
        Self { cursors, done }
    }
}

impl<I: Iterator<Item = SlotId>> Iterator for Intersection<I> {
    type Item = SlotId;

    fn next(&mut self) -> Option<SlotId> {
        if self.done {
            return None;
        }
        loop {
            let mut max = 0;
            for cursor in self.cursors.iter_mut() {
                match cursor.peek() {
                    Some(&value) => max = max.max(value),
                    None => {
                        self.done = true;
                        return None;
                    }
                }
            }

            let mut agreed = true;
            for cursor in self.cursors.iter_mut() {
                while cursor.next_if(|&value| value < max).is_some() {}
                match cursor.peek() {
                    Some(&value) if value == max => {}
                    Some(_) => agreed = false,
                    None => {
                        self.done = true;
                        return None;
                    }
                }
            }

            if agreed {
                for cursor in self.cursors.iter_mut() {
                    cursor.next();
                }
                return Some(max);
            }
        }
    }
}

/// Values present in any input sequence, strictly increasing
pub struct Union<I: Iterator<Item = SlotId>> {
    cursors: Vec<Peekable<I>>,
}

impl<I: Iterator<Item = SlotId>> Union<I> {
    pub fn new(sources: impl IntoIterator<Item = I>) -> Self {
        Self {
            cursors: sources.into_iter().map(Iterator::peekable).collect(),
        }
    }
}

impl<I: Iterator<Item = SlotId>> Iterator for Union<I> {
    type Item = SlotId;

    fn next(&mut self) -> Option<SlotId> {
        let min = self
            .cursors
            .iter_mut()
            .filter_map(|cursor| cursor.peek().copied())
            .min()?;
        for cursor in self.cursors.iter_mut() {
            cursor.next_if_eq(&min);
        }
        Some(min)
    }
}

/// Accumulator of postings sets to be intersected
#[derive(Debug, Clone, Default)]
pub struct SetIntersection<'a> {
    sets: Vec<&'a Postings>,
}

impl<'a> SetIntersection<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, set: &'a Postings) {
        self.sets.push(set);
    }

    /// True if no set has been added
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// True if some added set is empty, making the intersection empty
    pub fn has_empty_set(&self) -> bool {
        self.sets.iter().any(|set| set.is_empty())
    }

    /// Intersection of all added sets
    ///
    /// Every set is sought to the largest of the first elements before merging.
    pub fn iter(&self) -> Intersection<SetCursor<'a>> {
        let start = self
            .sets
            .iter()
            .map(|&set| set.first().copied())
            .try_fold(0, |acc, first| first.map(|value| acc.max(value)));
        match start {
            Some(start) => {
                Intersection::new(self.sets.iter().map(|&set| set.range(start..).copied()))
            }
            None => Intersection::new(Vec::new()),
        }
    }
}

/// Union of postings sets
pub fn union_sets<'a>(sets: impl IntoIterator<Item = &'a Postings>) -> Union<SetCursor<'a>> {
    Union::new(
        sets.into_iter()
            .map(|set| set.range::<SlotId, _>(..).copied()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[SlotId]) -> Postings {
        values.iter().copied().collect()
    }

    fn intersect(inputs: &[&[SlotId]]) -> Vec<SlotId> {
        Intersection::new(inputs.iter().map(|s| s.iter().copied())).collect()
    }

    fn unite(inputs: &[&[SlotId]]) -> Vec<SlotId> {
        Union::new(inputs.iter().map(|s| s.iter().copied())).collect()
    }

    #[test]
    fn test_intersection_basic() {
        assert_eq!(intersect(&[&[1, 3, 5, 7], &[3, 4, 5, 8], &[0, 3, 5]]), vec![3, 5]);
        assert_eq!(intersect(&[&[1, 2, 3]]), vec![1, 2, 3]);
    }

    #[test]
    fn test_intersection_unequal_lengths_and_disjoint() {
        assert_eq!(intersect(&[&[1, 2, 3, 4, 5, 6, 7, 8, 9], &[9]]), vec![9]);
        assert_eq!(intersect(&[&[1, 2], &[3, 4]]), Vec::<SlotId>::new());
        assert_eq!(intersect(&[&[1, 2], &[]]), Vec::<SlotId>::new());
        assert_eq!(intersect(&[&[0], &[0]]), vec![0]);
    }

    #[test]
    fn test_intersection_of_nothing_is_empty() {
        assert_eq!(intersect(&[]), Vec::<SlotId>::new());
    }

    #[test]
    fn test_intersection_matches_set_semantics() {
        let a: Vec<SlotId> = (0..200).filter(|v| v % 2 == 0).collect();
        let b: Vec<SlotId> = (0..200).filter(|v| v % 3 == 0).collect();
        let c: Vec<SlotId> = (50..150).collect();
        let expected: Vec<SlotId> = (0..200)
            .filter(|v| v % 6 == 0 && (50..150).contains(v))
            .collect();
        assert_eq!(intersect(&[a.as_slice(), b.as_slice(), c.as_slice()]), expected);
        assert_eq!(intersect(&[c.as_slice(), b.as_slice(), a.as_slice()]), expected);
    }

    #[test]
    fn test_union_basic() {
        assert_eq!(unite(&[&[1, 4], &[2, 4, 6], &[0, 7]]), vec![0, 1, 2, 4, 6, 7]);
        assert_eq!(unite(&[&[5], &[]]), vec![5]);
        assert_eq!(unite(&[]), Vec::<SlotId>::new());
    }

    #[test]
    fn test_union_is_order_independent() {
        let a: Vec<SlotId> = (0..30).step_by(3).collect();
        let b: Vec<SlotId> = (0..30).step_by(5).collect();
        let mut expected: Vec<SlotId> = a.iter().chain(b.iter()).copied().collect();
        expected.sort();
        expected.dedup();
        assert_eq!(unite(&[a.as_slice(), b.as_slice()]), expected);
        assert_eq!(unite(&[b.as_slice(), a.as_slice()]), expected);
    }

    #[test]
    fn test_set_intersection_seeks_to_common_start() {
        let a = set(&[1, 2, 3, 10, 20, 30]);
        let b = set(&[10, 30, 40]);
        let c = set(&[0, 5, 10, 30]);
        let mut acc = SetIntersection::new();
        acc.add(&a);
        acc.add(&b);
        acc.add(&c);
        assert_eq!(acc.iter().collect::<Vec<_>>(), vec![10, 30]);
    }

    #[test]
    fn test_set_intersection_with_empty_set() {
        let a = set(&[1, 2, 3]);
        let empty = Postings::new();
        let mut acc = SetIntersection::new();
        acc.add(&a);
        acc.add(&empty);
        assert!(acc.has_empty_set());
        assert_eq!(acc.iter().count(), 0);
        assert_eq!(SetIntersection::new().iter().count(), 0);
    }

    #[test]
    fn test_union_sets() {
        let a = set(&[3, 1]);
        let b = set(&[2, 3]);
        assert_eq!(union_sets([&a, &b]).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_intersection_over_lazy_sources() {
        let evens = (0..).step_by(2).take_while(|v| *v < 100);
        let tens = (0..).step_by(10).take_while(|v| *v < 100);
        let boxed: Vec<Sequence> = vec![Box::new(evens), Box::new(tens)];
        let result: Vec<_> = Intersection::new(boxed).collect();
        assert_eq!(result, (0..100).step_by(10).collect::<Vec<_>>());
    }
}
