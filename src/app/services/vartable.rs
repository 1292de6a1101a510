//! Variable metadata lookup
//!
//! Components that need to know how a variable is encoded receive a
//! [`VarTable`] handle explicitly. [`BufrTable`] is the built-in provider,
//! preloaded with the common surface-observation descriptors; tests can build
//! an empty table and register only the entries they need.

use crate::app::models::var::{VarType, Varcode, Varinfo};
use crate::{Error, Result};
use std::collections::HashMap;

/// Source of variable metadata
pub trait VarTable: Send + Sync {
    /// Look up the metadata of a variable code
    fn query(&self, code: Varcode) -> Result<&Varinfo>;
}

/// In-memory table of variable metadata
#[derive(Debug, Clone, Default)]
pub struct BufrTable {
    entries: HashMap<Varcode, Varinfo>,
}

impl BufrTable {
    /// Create a table with no entries
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a table preloaded with common surface-observation descriptors
    pub fn standard() -> Self {
        let mut table = Self::empty();
        for &(f, x, y, var_type, scale, unit, description) in STANDARD_ENTRIES {
            table.insert(Varinfo::new(
                Varcode::new(f, x, y),
                var_type,
                scale,
                unit,
                description,
            ));
        }
        table
    }

    /// Add or replace an entry
    pub fn insert(&mut self, info: Varinfo) {
        self.entries.insert(info.code, info);
    }

    /// Builder-style [`BufrTable::insert`]
    pub fn with(mut self, info: Varinfo) -> Self {
        self.insert(info);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl VarTable for BufrTable {
    fn query(&self, code: Varcode) -> Result<&Varinfo> {
        self.entries
            .get(&code)
            .ok_or_else(|| Error::not_found(format!("variable {} not in table", code)))
    }
}

type Entry = (u16, u16, u16, VarType, i32, &'static str, &'static str);

const STANDARD_ENTRIES: &[Entry] = &[
    (0, 1, 1, VarType::Integer, 0, "NUMERIC", "WMO block number"),
    (0, 1, 2, VarType::Integer, 0, "NUMERIC", "WMO station number"),
    (0, 1, 11, VarType::String, 0, "CCITTIA5", "Ship or mobile land station identifier"),
    (0, 1, 19, VarType::String, 0, "CCITTIA5", "Long station or site name"),
    (0, 1, 194, VarType::String, 0, "CCITTIA5", "Report mnemonic"),
    (0, 5, 1, VarType::Decimal, 5, "DEGREE", "Latitude (high accuracy)"),
    (0, 6, 1, VarType::Decimal, 5, "DEGREE", "Longitude (high accuracy)"),
    (0, 7, 30, VarType::Decimal, 1, "M", "Height of station ground above mean sea level"),
    (0, 7, 31, VarType::Decimal, 1, "M", "Height of barometer above mean sea level"),
    (0, 10, 4, VarType::Decimal, -1, "PA", "Pressure"),
    (0, 10, 51, VarType::Decimal, -1, "PA", "Pressure reduced to mean sea level"),
    (0, 11, 1, VarType::Integer, 0, "DEGREE TRUE", "Wind direction"),
    (0, 11, 2, VarType::Decimal, 1, "M/S", "Wind speed"),
    (0, 12, 101, VarType::Decimal, 2, "K", "Temperature/air temperature"),
    (0, 12, 103, VarType::Decimal, 2, "K", "Dew-point temperature"),
    (0, 13, 3, VarType::Integer, 0, "%", "Relative humidity"),
    (0, 13, 11, VarType::Decimal, 1, "KG/M**2", "Total precipitation / total water equivalent"),
    (0, 20, 1, VarType::Integer, -1, "M", "Horizontal visibility"),
    (0, 33, 7, VarType::Integer, 0, "%", "Per cent confidence"),
    (0, 33, 196, VarType::Integer, 0, "FLAG TABLE", "Data has been invalidated"),
    (0, 33, 197, VarType::Integer, 0, "FLAG TABLE", "Manual replacement in substitution"),
];
