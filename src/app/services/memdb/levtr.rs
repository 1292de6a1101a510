//! Level and time range store

use super::arena::Arena;
use super::index::Index;
use super::results::Results;
use super::sequence::SetIntersection;
use crate::app::models::{LevTr, Level, Query, SlotId, Trange};
use crate::{Error, Result};
use tracing::debug;

/// Deduplicated level/time range storage
#[derive(Debug, Clone, Default)]
pub struct LevTrs {
    arena: Arena<LevTr>,
    by_level: Index<Level>,
    by_trange: Index<Trange>,
}

impl LevTrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, levtr: &LevTr) -> Option<SlotId> {
        let mut candidates = SetIntersection::new();
        if !self.by_level.lookup_into(&levtr.level, &mut candidates)
            || !self.by_trange.lookup_into(&levtr.trange, &mut candidates)
        {
            return None;
        }
        candidates
            .iter()
            .find(|&id| self.arena.get(id).is_some_and(|lt| lt == levtr))
    }

    /// Find a level/time range, creating it if allowed
    ///
    /// # Errors
    /// * Returns `Error::NotFound` if it does not exist and `create` is false
    pub fn obtain(&mut self, levtr: &LevTr, create: bool) -> Result<SlotId> {
        if let Some(id) = self.find(levtr) {
            return Ok(id);
        }
        if !create {
            return Err(Error::not_found(format!(
                "level {} time range {}",
                levtr.level, levtr.trange
            )));
        }
        let id = self.arena.add(*levtr);
        self.by_level.insert(levtr.level, id);
        self.by_trange.insert(levtr.trange, id);
        debug!(
            "Created level {} time range {} at slot {}",
            levtr.level, levtr.trange, id
        );
        Ok(id)
    }

    pub(crate) fn remove(&mut self, id: SlotId) -> Result<LevTr> {
        let levtr = self
            .arena
            .remove(id)
            .ok_or_else(|| Error::not_found(format!("no level/time range at slot {}", id)))?;
        self.by_level.remove(&levtr.level, id);
        self.by_trange.remove(&levtr.trange, id);
        Ok(levtr)
    }

    pub fn get(&self, id: SlotId) -> Option<&LevTr> {
        self.arena.get(id)
    }

    pub fn try_get(&self, id: SlotId) -> Result<&LevTr> {
        self.arena.try_get(id)
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.arena.contains(id)
    }

    pub fn len(&self) -> usize {
        self.arena.count_live()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &LevTr)> {
        self.arena.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.arena.clear();
        self.by_level.clear();
        self.by_trange.clear();
    }

    /// Select level/time ranges equal to the query's level and time range
    pub fn query(&self, query: &Query) -> Results<'_, LevTr> {
        let mut res = Results::new(&self.arena);
        if let Some(level) = &query.level {
            match self.by_level.lookup(level) {
                Some(postings) => res.add_exact(postings),
                None => res.mark_empty(),
            }
        }
        if let Some(trange) = &query.trange {
            match self.by_trange.lookup(trange) {
                Some(postings) => res.add_exact(postings),
                None => res.mark_empty(),
            }
        }
        res
    }

    pub fn check_indices(&self) -> Result<()> {
        for (id, levtr) in self.arena.iter() {
            if !self.by_level.contains(&levtr.level, id) || !self.by_trange.contains(&levtr.trange, id)
            {
                return Err(Error::consistency(format!(
                    "level/time range {} missing from an index",
                    id
                )));
            }
        }
        for (level, postings) in self.by_level.iter() {
            for &id in postings {
                if !self.arena.get(id).is_some_and(|lt| lt.level == *level) {
                    return Err(Error::consistency(format!(
                        "index entry for level/time range slot {} is stale",
                        id
                    )));
                }
            }
        }
        for (trange, postings) in self.by_trange.iter() {
            for &id in postings {
                if !self.arena.get(id).is_some_and(|lt| lt.trange == *trange) {
                    return Err(Error::consistency(format!(
                        "index entry for level/time range slot {} is stale",
                        id
                    )));
                }
            }
        }
        Ok(())
    }
}
