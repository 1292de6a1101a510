//! CSV snapshots of a memdb
//!
//! A snapshot is a directory holding one comma-delimited file per entity kind
//! plus one per attribute list (see [`crate::constants::snapshot_files`]).
//! Every row carries the slot id the entity had when saved; on load, slot ids
//! are reassigned and references are remapped through them.
//!
//! Variable values are stored in their encoded form (scaled integers for
//! numeric variables), so a round trip never goes through floating point. An
//! empty field is a missing value.

pub mod reader;
pub mod writer;

#[cfg(test)]
pub mod tests;

use crate::app::models::SlotId;
use crate::app::models::var::{VarType, VarValue, Varcode};
use crate::app::services::memdb::Memdb;
use crate::app::services::vartable::VarTable;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Counts of rows written or loaded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub stations: usize,
    pub levtrs: usize,
    pub station_values: usize,
    pub values: usize,
    pub attributes: usize,
    /// Rows dropped on load because they refer to an entity not in the snapshot
    pub skipped: usize,
}

/// Snapshot directory with its load policy
#[derive(Debug, Clone)]
pub struct Snapshot {
    dir: PathBuf,
    strict: bool,
}

impl Snapshot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            strict: false,
        }
    }

    /// Reject rows with dangling references instead of skipping them
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the whole database, replacing each file atomically
    pub fn save(&self, db: &Memdb) -> Result<SnapshotStats> {
        writer::write_snapshot(db, &self.dir)
    }

    /// Load into a new database using `vartable` to decode values
    ///
    /// A missing directory gives an empty database.
    pub fn load(&self, vartable: Arc<dyn VarTable>) -> Result<(Memdb, SnapshotStats)> {
        let mut db = Memdb::new(vartable);
        let stats = self.load_into(&mut db)?;
        Ok((db, stats))
    }

    /// Merge the snapshot into an existing database, replacing values with the
    /// same identity
    ///
    /// On error the database may hold part of the snapshot.
    pub fn load_into(&self, db: &mut Memdb) -> Result<SnapshotStats> {
        reader::read_snapshot(&self.dir, db, self.strict)
    }
}

// =============================================================================
// Row layouts
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StationRow {
    pub id: SlotId,
    pub lat: i32,
    pub lon: i32,
    pub mobile: bool,
    pub ident: String,
    pub report: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct LevTrRow {
    pub id: SlotId,
    pub ltype1: Option<i32>,
    pub l1: Option<i32>,
    pub ltype2: Option<i32>,
    pub l2: Option<i32>,
    pub pind: Option<i32>,
    pub p1: Option<i32>,
    pub p2: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StationValueRow {
    pub id: SlotId,
    pub station: SlotId,
    pub code: Varcode,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ValueRow {
    pub id: SlotId,
    pub station: SlotId,
    pub levtr: SlotId,
    pub datetime: String,
    pub code: Varcode,
    pub value: Option<String>,
}

/// Attribute of the value (or station value) saved with slot id `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AttrRow {
    pub id: SlotId,
    pub code: Varcode,
    pub value: Option<String>,
}

pub(crate) fn encode_value(value: Option<&VarValue>) -> Option<String> {
    value.map(|v| match v {
        VarValue::Int(i) => i.to_string(),
        VarValue::Str(s) => s.clone(),
    })
}

/// Decode a stored field with the variable's type from `table`
pub(crate) fn decode_value(
    table: &dyn VarTable,
    code: Varcode,
    text: Option<String>,
) -> Result<Option<VarValue>> {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    match table.query(code)?.var_type {
        VarType::Integer | VarType::Decimal => text
            .trim()
            .parse()
            .map(|raw| Some(VarValue::Int(raw)))
            .map_err(|_| Error::parse(text.as_str(), format!("invalid encoded value for {}", code))),
        VarType::String | VarType::Binary => Ok(Some(VarValue::Str(text))),
    }
}
