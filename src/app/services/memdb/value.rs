//! Observation value store
//!
//! At most one value per (station, level/time range, datetime, variable code).
//! Values are indexed by station slot, level/time range slot and datetime.

use super::arena::Arena;
use super::index::Index;
use super::matcher::VarMatch;
use super::results::Results;
use super::sequence::SetIntersection;
use crate::app::models::var::{Var, Varcode};
use crate::app::models::{LevTr, Query, SlotId, Station, Value};
use crate::app::services::vartable::VarTable;
use crate::{Error, Result};
use chrono::NaiveDateTime;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Values {
    arena: Arena<Value>,
    by_station: Index<SlotId>,
    by_levtr: Index<SlotId>,
    by_date: Index<NaiveDateTime>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot id of the value with this identity, if any
    pub fn find(
        &self,
        station: SlotId,
        levtr: SlotId,
        datetime: &NaiveDateTime,
        code: Varcode,
    ) -> Option<SlotId> {
        let mut candidates = SetIntersection::new();
        if !self.by_station.lookup_into(&station, &mut candidates)
            || !self.by_levtr.lookup_into(&levtr, &mut candidates)
            || !self.by_date.lookup_into(datetime, &mut candidates)
        {
            return None;
        }
        candidates
            .iter()
            .find(|&id| self.arena.get(id).is_some_and(|v| v.var.code() == code))
    }

    /// Insert a value, or replace the existing one if allowed
    ///
    /// Station and level/time range ids are not checked here; the database
    /// validates them.
    ///
    /// # Errors
    /// * Returns `Error::Consistency` if a value with the same identity exists
    ///   and `can_replace` is false; the store is left unchanged
    pub fn insert(
        &mut self,
        station: SlotId,
        levtr: SlotId,
        datetime: NaiveDateTime,
        var: Var,
        can_replace: bool,
    ) -> Result<SlotId> {
        if let Some(id) = self.find(station, levtr, &datetime, var.code()) {
            if !can_replace {
                return Err(Error::consistency(format!(
                    "value {} already exists for station {} levtr {} at {}",
                    var.code(),
                    station,
                    levtr,
                    datetime
                )));
            }
            self.arena.try_get_mut(id)?.var.replace_with(var);
            debug!("Replaced value {}", id);
            return Ok(id);
        }
        let id = self.arena.add(Value {
            station,
            levtr,
            datetime,
            var,
        });
        self.by_station.insert(station, id);
        self.by_levtr.insert(levtr, id);
        self.by_date.insert(datetime, id);
        Ok(id)
    }

    pub(crate) fn remove(&mut self, id: SlotId) -> Result<Value> {
        let value = self
            .arena
            .remove(id)
            .ok_or_else(|| Error::not_found(format!("no value at slot {}", id)))?;
        self.by_station.remove(&value.station, id);
        self.by_levtr.remove(&value.levtr, id);
        self.by_date.remove(&value.datetime, id);
        Ok(value)
    }

    pub fn ids_for_station(&self, station: SlotId) -> Vec<SlotId> {
        self.by_station
            .lookup(&station)
            .map(|p| p.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn references_station(&self, station: SlotId) -> bool {
        self.by_station.lookup(&station).is_some()
    }

    pub fn references_levtr(&self, levtr: SlotId) -> bool {
        self.by_levtr.lookup(&levtr).is_some()
    }

    pub fn get(&self, id: SlotId) -> Option<&Value> {
        self.arena.get(id)
    }

    pub fn try_get(&self, id: SlotId) -> Result<&Value> {
        self.arena.try_get(id)
    }

    pub(crate) fn try_get_mut(&mut self, id: SlotId) -> Result<&mut Value> {
        self.arena.try_get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.arena.count_live()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Value)> {
        self.arena.iter()
    }

    /// Earliest and latest datetime of the stored values
    pub fn datetime_extent(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((*self.by_date.first_key()?, *self.by_date.last_key()?))
    }

    pub(crate) fn clear(&mut self) {
        self.arena.clear();
        self.by_station.clear();
        self.by_levtr.clear();
        self.by_date.clear();
    }

    /// Select values at the given stations and level/time ranges matching
    /// the datetime and variable constraints of `query`
    ///
    /// # Errors
    /// * Returns the parse error of an invalid data or attribute filter
    pub fn query<'a>(
        &'a self,
        query: &Query,
        stations: &Results<'_, Station>,
        levtrs: &Results<'_, LevTr>,
        table: &dyn VarTable,
    ) -> Result<Results<'a, Value>> {
        let matches = VarMatch::for_query(query, table)?;
        let mut res = Results::new(&self.arena);

        if stations.is_empty() || levtrs.is_empty() {
            res.mark_empty();
            return Ok(res);
        }
        if !stations.is_select_all() {
            let postings: Vec<_> = stations
                .ids()
                .filter_map(|id| self.by_station.lookup(&id))
                .collect();
            if postings.is_empty() {
                debug!("Value query: selected stations have no values");
                res.mark_empty();
                return Ok(res);
            }
            res.add_range_union(postings);
        }
        if !levtrs.is_select_all() {
            let postings: Vec<_> = levtrs
                .ids()
                .filter_map(|id| self.by_levtr.lookup(&id))
                .collect();
            if postings.is_empty() {
                debug!("Value query: selected level/time ranges have no values");
                res.mark_empty();
                return Ok(res);
            }
            res.add_range_union(postings);
        }

        match (&query.dtmin, &query.dtmax) {
            (None, None) => {}
            (Some(min), Some(max)) if min == max => match self.by_date.lookup(min) {
                Some(postings) => res.add_exact(postings),
                None => res.mark_empty(),
            },
            (Some(min), Some(max)) => res.add_range(self.by_date.range_between(min, max)),
            (Some(min), None) => res.add_range(self.by_date.range_from(min)),
            (None, Some(max)) => res.add_range(self.by_date.range_to(max)),
        }

        for m in matches {
            res.add_filter(move |v: &Value| m.matches(&v.var));
        }
        Ok(res)
    }

    /// Verify that indices and arena agree
    pub fn check_indices(&self) -> Result<()> {
        for (id, value) in self.arena.iter() {
            if !self.by_station.contains(&value.station, id)
                || !self.by_levtr.contains(&value.levtr, id)
                || !self.by_date.contains(&value.datetime, id)
            {
                return Err(Error::consistency(format!(
                    "value {} missing from an index",
                    id
                )));
            }
        }
        let stale = |index_ok: bool, id: SlotId| {
            if index_ok {
                Ok(())
            } else {
                Err(Error::consistency(format!(
                    "index entry for value slot {} is stale",
                    id
                )))
            }
        };
        for (station, postings) in self.by_station.iter() {
            for &id in postings {
                stale(self.arena.get(id).is_some_and(|v| v.station == *station), id)?;
            }
        }
        for (levtr, postings) in self.by_levtr.iter() {
            for &id in postings {
                stale(self.arena.get(id).is_some_and(|v| v.levtr == *levtr), id)?;
            }
        }
        for (datetime, postings) in self.by_date.iter() {
            for &id in postings {
                stale(self.arena.get(id).is_some_and(|v| v.datetime == *datetime), id)?;
            }
        }
        Ok(())
    }
}
