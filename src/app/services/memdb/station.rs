//! Station store
//!
//! Stations are indexed by latitude, longitude and (for mobile stations)
//! identifier. The mobile flag and report type have no index: they are checked
//! on the candidates left by the coordinate lookups.

use super::arena::Arena;
use super::index::Index;
use super::results::Results;
use super::sequence::SetIntersection;
use crate::app::models::{Query, SlotId, Station, check_finite, lat_to_int, lon_to_int};
use crate::{Error, Result};
use tracing::debug;

/// Deduplicated station storage
#[derive(Debug, Clone, Default)]
pub struct Stations {
    arena: Arena<Station>,
    by_lat: Index<i32>,
    by_lon: Index<i32>,
    by_ident: Index<String>,
}

impl Stations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot id of the station with the same identity, if any
    pub fn find(&self, station: &Station) -> Option<SlotId> {
        let mut candidates = SetIntersection::new();
        if !self.by_lat.lookup_into(&station.coords.lat, &mut candidates) {
            return None;
        }
        if !self.by_lon.lookup_into(&station.coords.lon, &mut candidates) {
            return None;
        }
        if !station.ident.is_empty()
            && !self.by_ident.lookup_into(station.ident.as_str(), &mut candidates)
        {
            return None;
        }
        candidates
            .iter()
            .find(|&id| self.arena.get(id).is_some_and(|s| s == station))
    }

    /// Find a station by identity, creating it if allowed
    ///
    /// # Errors
    /// * Returns `Error::NotFound` if the station does not exist and `create` is false
    pub fn obtain(&mut self, station: &Station, create: bool) -> Result<SlotId> {
        if let Some(id) = self.find(station) {
            return Ok(id);
        }
        if !create {
            return Err(Error::not_found(format!("station {}", station)));
        }
        let id = self.arena.add(station.clone());
        self.index(id, station);
        debug!("Created station {} at slot {}", station, id);
        Ok(id)
    }

    fn index(&mut self, id: SlotId, station: &Station) {
        self.by_lat.insert(station.coords.lat, id);
        self.by_lon.insert(station.coords.lon, id);
        if !station.ident.is_empty() {
            self.by_ident.insert(station.ident.clone(), id);
        }
    }

    /// Remove a station and its index entries
    ///
    /// Callers must remove the values referring to it first.
    pub(crate) fn remove(&mut self, id: SlotId) -> Result<Station> {
        let station = self
            .arena
            .remove(id)
            .ok_or_else(|| Error::not_found(format!("no station at slot {}", id)))?;
        self.by_lat.remove(&station.coords.lat, id);
        self.by_lon.remove(&station.coords.lon, id);
        if !station.ident.is_empty() {
            self.by_ident.remove(station.ident.as_str(), id);
        }
        Ok(station)
    }

    pub fn get(&self, id: SlotId) -> Option<&Station> {
        self.arena.get(id)
    }

    pub fn try_get(&self, id: SlotId) -> Result<&Station> {
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

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Station)> {
        self.arena.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.arena.clear();
        self.by_lat.clear();
        self.by_lon.clear();
        self.by_ident.clear();
    }

    /// Select stations matching the station constraints of `query`
    ///
    /// # Errors
    /// * Returns `Error::Consistency` if only one of `lonmin` and `lonmax` is set
    /// * Returns `Error::Consistency` if a coordinate bound is NaN or infinite
    pub fn query(&self, query: &Query) -> Result<Results<'_, Station>> {
        for (name, bound) in [
            ("latmin", query.latmin),
            ("latmax", query.latmax),
            ("lonmin", query.lonmin),
            ("lonmax", query.lonmax),
        ] {
            if let Some(degrees) = bound {
                check_finite(name, degrees)?;
            }
        }

        let mut res = Results::new(&self.arena);

        if let Some(ana_id) = query.ana_id {
            if !self.arena.contains(ana_id) {
                debug!("Station query: ana_id {} does not exist", ana_id);
                res.mark_empty();
                return Ok(res);
            }
            res.add_singleton(ana_id);
        }

        match (query.latmin, query.latmax) {
            (None, None) => {}
            (Some(min), Some(max)) => {
                let (lo, hi) = (lat_to_int(min), lat_to_int(max));
                if lo == hi {
                    match self.by_lat.lookup(&lo) {
                        Some(postings) => res.add_exact(postings),
                        None => res.mark_empty(),
                    }
                } else {
                    res.add_range(self.by_lat.range_between(&lo, &hi));
                }
            }
            (Some(min), None) => res.add_range(self.by_lat.range_from(&lat_to_int(min))),
            (None, Some(max)) => res.add_range(self.by_lat.range_to(&lat_to_int(max))),
        }

        match (query.lonmin, query.lonmax) {
            (None, None) => {}
            (Some(min), Some(max)) if max - min >= 360.0 => {}
            (Some(min), Some(max)) => {
                let (lo, hi) = (lon_to_int(min), lon_to_int(max));
                if lo == hi {
                    match self.by_lon.lookup(&lo) {
                        Some(postings) => res.add_exact(postings),
                        None => res.mark_empty(),
                    }
                } else if lo < hi {
                    res.add_range(self.by_lon.range_between(&lo, &hi));
                } else {
                    res.add_filter(move |s: &Station| s.coords.lon >= lo || s.coords.lon <= hi);
                }
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(Error::consistency(
                    "longitude range needs both lonmin and lonmax",
                ));
            }
        }

        if let Some(mobile) = query.mobile {
            res.add_filter(move |s: &Station| s.mobile == mobile);
        }

        if let Some(ident) = &query.ident {
            if ident.is_empty() {
                res.add_filter(|s: &Station| s.ident.is_empty());
            } else {
                match self.by_ident.lookup(ident.as_str()) {
                    Some(postings) => res.add_exact(postings),
                    None => res.mark_empty(),
                }
            }
        }

        if let Some(report) = query.report.clone() {
            res.add_filter(move |s: &Station| s.report == report);
        }

        if res.is_empty() {
            debug!("Station query resolved to no results from the indices");
        }
        Ok(res)
    }

    /// Verify that indices and arena agree
    pub fn check_indices(&self) -> Result<()> {
        for (id, station) in self.arena.iter() {
            let ident_ok = station.ident.is_empty() || self.by_ident.contains(station.ident.as_str(), id);
            if !self.by_lat.contains(&station.coords.lat, id)
                || !self.by_lon.contains(&station.coords.lon, id)
                || !ident_ok
            {
                return Err(Error::consistency(format!(
                    "station {} missing from an index",
                    id
                )));
            }
        }
        let stale = |index_ok: bool, id: SlotId| {
            if index_ok {
                Ok(())
            } else {
                Err(Error::consistency(format!("index entry for slot {} is stale", id)))
            }
        };
        for (lat, postings) in self.by_lat.iter() {
            for &id in postings {
                stale(self.get(id).is_some_and(|s| s.coords.lat == *lat), id)?;
            }
        }
        for (lon, postings) in self.by_lon.iter() {
            for &id in postings {
                stale(self.get(id).is_some_and(|s| s.coords.lon == *lon), id)?;
            }
        }
        for (ident, postings) in self.by_ident.iter() {
            for &id in postings {
                stale(self.get(id).is_some_and(|s| &s.ident == ident), id)?;
            }
        }
        Ok(())
    }
}
