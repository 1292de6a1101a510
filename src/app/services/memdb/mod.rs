//! In-memory observation database
//!
//! [`Memdb`] owns four stores: stations, level/time ranges, station values
//! and observation values. Values refer to stations and level/time ranges by
//! slot id, so every cross-store operation goes through this type, which
//! keeps the references valid:
//! - inserting a value checks that the station (and level/time range) exist
//! - removing a station removes every value referring to it
//! - a level/time range still referenced by a value cannot be removed
//!
//! Queries are answered in two steps: station and level/time range
//! constraints are resolved first, then the value store narrows its own
//! candidates to the values of those entities.

pub mod arena;
pub mod index;
pub mod levtr;
pub mod matcher;
pub mod results;
pub mod sequence;
pub mod station;
pub mod station_value;
pub mod value;

#[cfg(test)]
pub mod tests;

use crate::app::models::var::{Var, Varcode};
use crate::app::models::{
    DataRow, LevTr, Query, SlotId, Station, StationDataRow, StationValue, Summary, Value,
};
use crate::app::services::vartable::{BufrTable, VarTable};
use crate::{Error, Result};
use chrono::NaiveDateTime;
use levtr::LevTrs;
use results::Results;
use station::Stations;
use station_value::StationValues;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use value::Values;

/// Slot ids touched by a batch insert of observation values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataInsert {
    pub station: SlotId,
    pub levtr: SlotId,
    pub values: Vec<SlotId>,
}

/// In-memory store of stations, levels/time ranges and their values
#[derive(Clone)]
pub struct Memdb {
    stations: Stations,
    levtrs: LevTrs,
    station_values: StationValues,
    values: Values,
    vartable: Arc<dyn VarTable>,
}

impl Default for Memdb {
    fn default() -> Self {
        Self::new(Arc::new(BufrTable::standard()))
    }
}

impl fmt::Debug for Memdb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memdb")
            .field("stations", &self.stations.len())
            .field("levtrs", &self.levtrs.len())
            .field("station_values", &self.station_values.len())
            .field("values", &self.values.len())
            .finish()
    }
}

impl Memdb {
    /// Create an empty database using `vartable` for variable metadata
    pub fn new(vartable: Arc<dyn VarTable>) -> Self {
        Self {
            stations: Stations::new(),
            levtrs: LevTrs::new(),
            station_values: StationValues::new(),
            values: Values::new(),
            vartable,
        }
    }

    pub fn vartable(&self) -> &dyn VarTable {
        self.vartable.as_ref()
    }

    pub fn stations(&self) -> &Stations {
        &self.stations
    }

    pub fn levtrs(&self) -> &LevTrs {
        &self.levtrs
    }

    pub fn station_values(&self) -> &StationValues {
        &self.station_values
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty() && self.levtrs.is_empty()
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Find a station by identity, creating it if `create` is set
    pub fn obtain_station(&mut self, station: &Station, create: bool) -> Result<SlotId> {
        self.stations.obtain(station, create)
    }

    /// Find a level/time range, creating it if `create` is set
    pub fn obtain_levtr(&mut self, levtr: &LevTr, create: bool) -> Result<SlotId> {
        self.levtrs.obtain(levtr, create)
    }

    /// Insert or replace a station value
    ///
    /// # Errors
    /// * Returns `Error::NotFound` if `station` is not a live station
    /// * Returns `Error::Consistency` on a duplicate when `can_replace` is false
    pub fn insert_station_value(
        &mut self,
        station: SlotId,
        var: Var,
        can_replace: bool,
    ) -> Result<SlotId> {
        if !self.stations.contains(station) {
            return Err(Error::not_found(format!("no station at slot {}", station)));
        }
        self.station_values.insert(station, var, can_replace)
    }

    /// Insert or replace an observation value
    ///
    /// # Errors
    /// * Returns `Error::NotFound` if `station` or `levtr` is not live
    /// * Returns `Error::Consistency` on a duplicate when `can_replace` is false
    pub fn insert_value(
        &mut self,
        station: SlotId,
        levtr: SlotId,
        datetime: NaiveDateTime,
        var: Var,
        can_replace: bool,
    ) -> Result<SlotId> {
        if !self.stations.contains(station) {
            return Err(Error::not_found(format!("no station at slot {}", station)));
        }
        if !self.levtrs.contains(levtr) {
            return Err(Error::not_found(format!(
                "no level/time range at slot {}",
                levtr
            )));
        }
        self.values
            .insert(station, levtr, datetime, var, can_replace)
    }

    /// Insert station values for a station given by identity
    ///
    /// Duplicates are detected before anything is created, so a failed call
    /// leaves the database unchanged.
    pub fn insert_station_data(
        &mut self,
        station: &Station,
        vars: Vec<Var>,
        can_replace: bool,
        station_can_add: bool,
    ) -> Result<(SlotId, Vec<SlotId>)> {
        match self.stations.find(station) {
            Some(id) if !can_replace => {
                if let Some(var) = vars
                    .iter()
                    .find(|var| self.station_values.find(id, var.code()).is_some())
                {
                    return Err(Error::consistency(format!(
                        "station {} already has a value for {}",
                        id,
                        var.code()
                    )));
                }
            }
            Some(_) => {}
            None if !station_can_add => {
                return Err(Error::not_found(format!("station {}", station)));
            }
            None => {}
        }
        if !can_replace {
            check_unique_codes(&vars)?;
        }

        let station_id = self.stations.obtain(station, station_can_add)?;
        let ids = vars
            .into_iter()
            .map(|var| self.station_values.insert(station_id, var, can_replace))
            .collect::<Result<Vec<_>>>()?;
        Ok((station_id, ids))
    }

    /// Insert observation values sharing station, level/time range and datetime
    ///
    /// Duplicates are detected before anything is created, so a failed call
    /// leaves the database unchanged.
    pub fn insert_data(
        &mut self,
        station: &Station,
        levtr: &LevTr,
        datetime: NaiveDateTime,
        vars: Vec<Var>,
        can_replace: bool,
        station_can_add: bool,
    ) -> Result<DataInsert> {
        let existing_station = self.stations.find(station);
        if existing_station.is_none() && !station_can_add {
            return Err(Error::not_found(format!("station {}", station)));
        }
        if let (Some(station_id), Some(levtr_id), false) =
            (existing_station, self.levtrs.find(levtr), can_replace)
        {
            if let Some(var) = vars.iter().find(|var| {
                self.values
                    .find(station_id, levtr_id, &datetime, var.code())
                    .is_some()
            }) {
                return Err(Error::consistency(format!(
                    "value {} already exists for station {} at {}",
                    var.code(),
                    station_id,
                    datetime
                )));
            }
        }
        if !can_replace {
            check_unique_codes(&vars)?;
        }

        let station_id = self.stations.obtain(station, station_can_add)?;
        let levtr_id = self.levtrs.obtain(levtr, true)?;
        let values = vars
            .into_iter()
            .map(|var| {
                self.values
                    .insert(station_id, levtr_id, datetime, var, can_replace)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(DataInsert {
            station: station_id,
            levtr: levtr_id,
            values,
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Stations matching the station constraints of `query`
    pub fn query_stations(&self, query: &Query) -> Result<Results<'_, Station>> {
        self.stations.query(query)
    }

    /// Level/time ranges matching the level and time range of `query`
    pub fn query_levtrs(&self, query: &Query) -> Results<'_, LevTr> {
        self.levtrs.query(query)
    }

    /// Station values matching `query`, unresolved
    pub fn query_station_values(&self, query: &Query) -> Result<Results<'_, StationValue>> {
        let stations = self.stations.query(query)?;
        self.station_values
            .query(query, &stations, self.vartable.as_ref())
    }

    /// Observation values matching `query`, unresolved
    pub fn query_values(&self, query: &Query) -> Result<Results<'_, Value>> {
        let stations = self.stations.query(query)?;
        let levtrs = self.levtrs.query(query);
        self.values
            .query(query, &stations, &levtrs, self.vartable.as_ref())
    }

    /// Station values matching `query`, resolved with their station
    pub fn query_station_data(&self, query: &Query) -> Result<Vec<StationDataRow<'_>>> {
        let results = self.query_station_values(query)?;
        let rows = results
            .iter()
            .filter_map(|(id, sv)| {
                let station = self.stations.get(sv.station)?;
                Some(StationDataRow {
                    id,
                    station_id: sv.station,
                    station,
                    var: &sv.var,
                })
            })
            .collect();
        Ok(rows)
    }

    /// Observation values matching `query`, resolved with station and level/time range
    pub fn query_data(&self, query: &Query) -> Result<Vec<DataRow<'_>>> {
        let results = self.query_values(query)?;
        let rows = results
            .iter()
            .filter_map(|(id, value)| {
                let station = self.stations.get(value.station)?;
                let levtr = self.levtrs.get(value.levtr)?;
                Some(DataRow {
                    id,
                    station_id: value.station,
                    station,
                    levtr_id: value.levtr,
                    levtr,
                    datetime: value.datetime,
                    var: &value.var,
                })
            })
            .collect();
        Ok(rows)
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn value_attrs(&self, id: SlotId) -> Result<&[Var]> {
        Ok(self.values.try_get(id)?.var.attrs())
    }

    /// Set attributes on a value
    ///
    /// With `replace`, existing attributes are dropped first; otherwise only
    /// those with the same code as a new one are replaced.
    pub fn set_value_attrs(&mut self, id: SlotId, attrs: Vec<Var>, replace: bool) -> Result<()> {
        set_attrs(&mut self.values.try_get_mut(id)?.var, attrs, replace);
        Ok(())
    }

    /// Remove attributes from a value; an empty list removes all of them
    pub fn remove_value_attrs(&mut self, id: SlotId, codes: &[Varcode]) -> Result<()> {
        self.values.try_get_mut(id)?.var.remove_attrs(codes);
        Ok(())
    }

    pub fn station_value_attrs(&self, id: SlotId) -> Result<&[Var]> {
        Ok(self.station_values.try_get(id)?.var.attrs())
    }

    pub fn set_station_value_attrs(
        &mut self,
        id: SlotId,
        attrs: Vec<Var>,
        replace: bool,
    ) -> Result<()> {
        set_attrs(&mut self.station_values.try_get_mut(id)?.var, attrs, replace);
        Ok(())
    }

    pub fn remove_station_value_attrs(&mut self, id: SlotId, codes: &[Varcode]) -> Result<()> {
        self.station_values.try_get_mut(id)?.var.remove_attrs(codes);
        Ok(())
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Remove a station together with every value referring to it
    ///
    /// Returns the number of dependent values removed.
    pub fn remove_station(&mut self, id: SlotId) -> Result<usize> {
        if !self.stations.contains(id) {
            return Err(Error::not_found(format!("no station at slot {}", id)));
        }
        let mut removed = 0;
        for value_id in self.values.ids_for_station(id) {
            self.values.remove(value_id)?;
            removed += 1;
        }
        for sv_id in self.station_values.ids_for_station(id) {
            self.station_values.remove(sv_id)?;
            removed += 1;
        }
        self.stations.remove(id)?;
        debug!("Removed station {} and {} dependent values", id, removed);
        Ok(removed)
    }

    /// Remove a level/time range no value refers to
    ///
    /// # Errors
    /// * Returns `Error::Consistency` if a value still refers to it
    pub fn remove_levtr(&mut self, id: SlotId) -> Result<LevTr> {
        if self.values.references_levtr(id) {
            return Err(Error::consistency(format!(
                "level/time range {} is still referenced by values",
                id
            )));
        }
        self.levtrs.remove(id)
    }

    pub fn remove_value(&mut self, id: SlotId) -> Result<Value> {
        self.values.remove(id)
    }

    pub fn remove_station_value(&mut self, id: SlotId) -> Result<StationValue> {
        self.station_values.remove(id)
    }

    /// Remove the observation values matching `query`, returning how many
    pub fn remove_data(&mut self, query: &Query) -> Result<usize> {
        let ids = self.query_values(query)?.to_ids();
        for &id in &ids {
            self.values.remove(id)?;
        }
        debug!("Removed {} values", ids.len());
        Ok(ids.len())
    }

    /// Remove the station values matching `query`, returning how many
    pub fn remove_station_data(&mut self, query: &Query) -> Result<usize> {
        let ids = self.query_station_values(query)?.to_ids();
        for &id in &ids {
            self.station_values.remove(id)?;
        }
        debug!("Removed {} station values", ids.len());
        Ok(ids.len())
    }

    /// Remove everything and restart slot numbering
    pub fn remove_all(&mut self) {
        self.values.clear();
        self.station_values.clear();
        self.levtrs.clear();
        self.stations.clear();
        info!("Cleared memdb");
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn summary(&self) -> Summary {
        let varcodes = self
            .values
            .iter()
            .map(|(_, v)| v.var.code())
            .chain(self.station_values.iter().map(|(_, sv)| sv.var.code()))
            .collect();
        Summary {
            stations: self.stations.len(),
            levtrs: self.levtrs.len(),
            station_values: self.station_values.len(),
            values: self.values.len(),
            varcodes,
        }
    }

    /// Verify every index against its arena and every reference against its target
    pub fn check_consistency(&self) -> Result<()> {
        self.stations.check_indices()?;
        self.levtrs.check_indices()?;
        self.station_values.check_indices()?;
        self.values.check_indices()?;
        for (id, sv) in self.station_values.iter() {
            if !self.stations.contains(sv.station) {
                return Err(Error::consistency(format!(
                    "station value {} refers to missing station {}",
                    id, sv.station
                )));
            }
        }
        for (id, value) in self.values.iter() {
            if !self.stations.contains(value.station) || !self.levtrs.contains(value.levtr) {
                return Err(Error::consistency(format!(
                    "value {} refers to a missing station or level/time range",
                    id
                )));
            }
        }
        Ok(())
    }
}

fn set_attrs(var: &mut Var, attrs: Vec<Var>, replace: bool) {
    if replace {
        var.remove_attrs(&[]);
    }
    for attr in attrs {
        var.set_attr(attr);
    }
}

fn check_unique_codes(vars: &[Var]) -> Result<()> {
    for (i, var) in vars.iter().enumerate() {
        if vars[..i].iter().any(|other| other.code() == var.code()) {
            return Err(Error::consistency(format!(
                "variable {} given more than once",
                var.code()
            )));
        }
    }
    Ok(())
}
