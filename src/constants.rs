//! Application constants for memdb
//!
//! This module contains the fixed-point scales, snapshot file layout,
//! and default values used throughout the library and the CLI.

// =============================================================================
// Coordinates
// =============================================================================

/// Coordinates are stored as integer multiples of 1e-5 degrees
pub const COORD_SCALE: f64 = 100_000.0;

/// Full circle of longitude in fixed-point units
pub const LON_PERIOD: i32 = 360 * 100_000;

/// Lower bound (inclusive) of the normalised longitude domain
pub const LON_MIN: i32 = -180 * 100_000;

/// Upper bound (exclusive) of the normalised longitude domain
pub const LON_MAX: i32 = 180 * 100_000;

/// Valid latitude bound (absolute value) in fixed-point units
pub const LAT_LIMIT: i32 = 90 * 100_000;

// =============================================================================
// Snapshot layout
// =============================================================================

/// Snapshot file names, one per entity kind plus one per attribute list
pub mod snapshot_files {
    pub const STATIONS: &str = "stations.csv";
    pub const LEVTRS: &str = "levtrs.csv";
    pub const STATION_VALUES: &str = "station_values.csv";
    pub const STATION_VALUE_ATTRS: &str = "station_value_attrs.csv";
    pub const VALUES: &str = "values.csv";
    pub const VALUE_ATTRS: &str = "value_attrs.csv";

    /// All snapshot files in write order
    pub const ALL: &[&str] = &[
        STATIONS,
        LEVTRS,
        STATION_VALUES,
        STATION_VALUE_ATTRS,
        VALUES,
        VALUE_ATTRS,
    ];
}

/// Timestamp format used in snapshot files and on the command line
///
/// The fractional part is written only when non-zero and is optional on parse.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Field delimiter for snapshot files
pub const SNAPSHOT_DELIMITER: u8 = b',';

// =============================================================================
// Configuration defaults
// =============================================================================

/// Directory name used under the user data directory
pub const DEFAULT_SNAPSHOT_DIR_NAME: &str = "memdb";

/// Configuration file name looked up under the user config directory
pub const DEFAULT_CONFIG_FILE_NAME: &str = "memdb.json";

/// Environment variable overriding the snapshot directory
pub const ENV_SNAPSHOT_DIR: &str = "MEMDB_SNAPSHOT_DIR";

/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "MEMDB_LOG_LEVEL";

/// Log levels accepted by the configuration
pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "warn";
