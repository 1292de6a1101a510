//! Station value store
//!
//! At most one value per (station, variable code). Values are indexed by the
//! slot id of their station; the code is checked on the candidates.

use super::arena::Arena;
use super::index::Index;
use super::matcher::VarMatch;
use super::results::Results;
use crate::app::models::var::{Var, Varcode};
use crate::app::models::{Query, SlotId, Station, StationValue};
use crate::app::services::vartable::VarTable;
use crate::{Error, Result};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct StationValues {
    arena: Arena<StationValue>,
    by_station: Index<SlotId>,
}

impl StationValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot id of the value for `code` at `station`, if any
    pub fn find(&self, station: SlotId, code: Varcode) -> Option<SlotId> {
        self.by_station.lookup(&station)?.iter().copied().find(|&id| {
            self.arena
                .get(id)
                .is_some_and(|sv| sv.var.code() == code)
        })
    }

    /// Insert a station value, or replace the existing one if allowed
    ///
    /// The station id is not checked here; the database validates it.
    ///
    /// # Errors
    /// * Returns `Error::Consistency` if a value with the same code exists and
    ///   `can_replace` is false; the store is left unchanged
    pub fn insert(&mut self, station: SlotId, var: Var, can_replace: bool) -> Result<SlotId> {
        if let Some(id) = self.find(station, var.code()) {
            if !can_replace {
                return Err(Error::consistency(format!(
                    "station {} already has a value for {}",
                    station,
                    var.code()
                )));
            }
            self.arena.try_get_mut(id)?.var.replace_with(var);
            debug!("Replaced station value {}", id);
            return Ok(id);
        }
        let id = self.arena.add(StationValue { station, var });
        self.by_station.insert(station, id);
        Ok(id)
    }

    pub(crate) fn remove(&mut self, id: SlotId) -> Result<StationValue> {
        let value = self
            .arena
            .remove(id)
            .ok_or_else(|| Error::not_found(format!("no station value at slot {}", id)))?;
        self.by_station.remove(&value.station, id);
        Ok(value)
    }

    /// Slot ids of all values of a station
    pub fn ids_for_station(&self, station: SlotId) -> Vec<SlotId> {
        self.by_station
            .lookup(&station)
            .map(|p| p.iter().copied().collect())
            .unwrap_or_default()
    }

    /// True if any value refers to `station`
    pub fn references_station(&self, station: SlotId) -> bool {
        self.by_station.lookup(&station).is_some()
    }

    pub fn get(&self, id: SlotId) -> Option<&StationValue> {
        self.arena.get(id)
    }

    pub fn try_get(&self, id: SlotId) -> Result<&StationValue> {
        self.arena.try_get(id)
    }

    pub(crate) fn try_get_mut(&mut self, id: SlotId) -> Result<&mut StationValue> {
        self.arena.try_get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.arena.count_live()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &StationValue)> {
        self.arena.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.arena.clear();
        self.by_station.clear();
    }

    /// Select values at the given stations matching the variable constraints of `query`
    ///
    /// # Errors
    /// * Returns the parse error of an invalid data or attribute filter
    pub fn query<'a>(
        &'a self,
        query: &Query,
        stations: &Results<'_, Station>,
        table: &dyn VarTable,
    ) -> Result<Results<'a, StationValue>> {
        let matches = VarMatch::for_query(query, table)?;
        let mut res = Results::new(&self.arena);

        if stations.is_empty() {
            res.mark_empty();
            return Ok(res);
        }
        if !stations.is_select_all() {
            let postings: Vec<_> = stations
                .ids()
                .filter_map(|id| self.by_station.lookup(&id))
                .collect();
            if postings.is_empty() {
                debug!("Station value query: selected stations have no values");
                res.mark_empty();
                return Ok(res);
            }
            res.add_range_union(postings);
        }

        for m in matches {
            res.add_filter(move |sv: &StationValue| m.matches(&sv.var));
        }
        Ok(res)
    }

    pub fn check_indices(&self) -> Result<()> {
        for (id, value) in self.arena.iter() {
            if !self.by_station.contains(&value.station, id) {
                return Err(Error::consistency(format!(
                    "station value {} missing from the station index",
                    id
                )));
            }
        }
        for (station, postings) in self.by_station.iter() {
            for &id in postings {
                if !self.get(id).is_some_and(|sv| sv.station == *station) {
                    return Err(Error::consistency(format!(
                        "index entry for station value slot {} is stale",
                        id
                    )));
                }
            }
        }
        Ok(())
    }
}
