//! Injected, read-only process data.
//!
//! Two tables keyed by the generator's current mode (`I1`..`I19`):
//! - mode → peak discharge current (A)
//! - mode → crater statistics (mean / std volume in µm³, depth in µm)
//!
//! Lookups never fail. An unknown or missing mode resolves to the default
//! mode (`I5`) and the returned [`Lookup`] records that a fallback happened.

use crate::error::{PhysicsError, PhysicsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Generator current-mode selector.
///
/// Deserialization is lenient: a string that does not name a mode becomes
/// [`CurrentMode::DEFAULT`]. Table keys go through the strict [`FromStr`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CurrentMode(u8);

impl CurrentMode {
    /// Mode used whenever a lookup misses.
    pub const DEFAULT: CurrentMode = CurrentMode(5);

    pub fn new(index: u8) -> PhysicsResult<Self> {
        if index == 0 {
            return Err(PhysicsError::InvalidCurrentMode {
                value: index.to_string(),
            });
        }
        Ok(Self(index))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// Parse a commanded mode, resolving anything unrecognized to the default.
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            warn!(requested = s, fallback = %Self::DEFAULT, "unrecognized current mode");
            Self::DEFAULT
        })
    }
}

impl fmt::Display for CurrentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.0)
    }
}

impl FromStr for CurrentMode {
    type Err = PhysicsError;

    /// Accepts `I13`, `i13` or a bare `13`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('I')
            .or_else(|| trimmed.strip_prefix('i'))
            .unwrap_or(trimmed);
        let invalid = || PhysicsError::InvalidCurrentMode {
            value: s.to_string(),
        };
        let index: u8 = digits.parse().map_err(|_| invalid())?;
        CurrentMode::new(index).map_err(|_| invalid())
    }
}

impl From<String> for CurrentMode {
    fn from(value: String) -> Self {
        CurrentMode::parse_or_default(&value)
    }
}

impl From<CurrentMode> for String {
    fn from(mode: CurrentMode) -> Self {
        mode.to_string()
    }
}

/// Crater volume distribution for one current mode.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CraterStats {
    /// Mean crater volume (µm³)
    pub mean: f64,
    /// Standard deviation of the crater volume (µm³)
    pub std: f64,
    /// Crater depth (µm)
    pub depth: f64,
}

/// Result of a table lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lookup<T> {
    pub value: T,
    /// Mode whose row was actually used
    pub resolved: CurrentMode,
    /// True when the requested mode was missing and the default was used
    pub fell_back: bool,
}

#[derive(Deserialize)]
struct CurrentEntry {
    #[serde(rename = "Current")]
    current: f64,
}

/// Peak-current and crater tables.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessTables {
    currents: BTreeMap<CurrentMode, f64>,
    craters: BTreeMap<CurrentMode, CraterStats>,
}

/// (mode, peak current A, crater mean µm³, crater std µm³, crater depth µm)
const BUILTIN_ROWS: [(u8, f64, f64, f64, f64); 19] = [
    (1, 20.0, 400.0, 150.0, 2.0),
    (2, 30.0, 650.0, 220.0, 2.5),
    (3, 40.0, 900.0, 300.0, 3.0),
    (4, 50.0, 1_200.0, 400.0, 3.5),
    (5, 60.0, 1_500.0, 500.0, 4.0),
    (6, 72.0, 2_500.0, 850.0, 4.8),
    (7, 85.0, 3_600.0, 1_200.0, 5.5),
    (8, 97.0, 4_800.0, 1_600.0, 6.3),
    (9, 110.0, 6_000.0, 2_000.0, 7.0),
    (10, 135.0, 7_500.0, 2_500.0, 7.8),
    (11, 160.0, 9_000.0, 3_000.0, 8.5),
    (12, 188.0, 10_500.0, 3_500.0, 9.3),
    (13, 215.0, 12_000.0, 4_000.0, 10.0),
    (14, 268.0, 17_500.0, 6_000.0, 11.5),
    (15, 320.0, 23_500.0, 8_000.0, 13.0),
    (16, 372.0, 29_000.0, 10_000.0, 14.5),
    (17, 425.0, 35_000.0, 12_000.0, 16.0),
    (18, 512.0, 50_000.0, 17_000.0, 19.0),
    (19, 600.0, 65_000.0, 22_000.0, 22.0),
];

impl Default for ProcessTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProcessTables {
    /// Built-in brass-wire / steel-workpiece tables.
    pub fn builtin() -> Self {
        let mut currents = BTreeMap::new();
        let mut craters = BTreeMap::new();
        for (idx, current, mean, std, depth) in BUILTIN_ROWS {
            let mode = CurrentMode(idx);
            currents.insert(mode, current);
            craters.insert(mode, CraterStats { mean, std, depth });
        }
        Self { currents, craters }
    }

    /// Build tables from explicit maps, validating every row.
    pub fn new(
        currents: BTreeMap<CurrentMode, f64>,
        craters: BTreeMap<CurrentMode, CraterStats>,
    ) -> PhysicsResult<Self> {
        for (mode, current) in &currents {
            if !current.is_finite() || *current < 0.0 {
                return Err(PhysicsError::Table {
                    what: format!("peak current for {mode} must be finite and non-negative"),
                });
            }
        }
        for (mode, stats) in &craters {
            let ok = [stats.mean, stats.std, stats.depth]
                .iter()
                .all(|v| v.is_finite() && *v >= 0.0);
            if !ok {
                return Err(PhysicsError::Table {
                    what: format!("crater statistics for {mode} must be finite and non-negative"),
                });
            }
        }
        if !currents.contains_key(&CurrentMode::DEFAULT) {
            return Err(PhysicsError::Table {
                what: format!("current table lacks default mode {}", CurrentMode::DEFAULT),
            });
        }
        if !craters.contains_key(&CurrentMode::DEFAULT) {
            return Err(PhysicsError::Table {
                what: format!("crater table lacks default mode {}", CurrentMode::DEFAULT),
            });
        }
        Ok(Self { currents, craters })
    }

    /// Parse the table JSON layouts:
    /// `{"I5": {"Current": 60.0}}` and `{"I5": {"mean": .., "std": .., "depth": ..}}`.
    pub fn from_json_strs(currents_json: &str, craters_json: &str) -> PhysicsResult<Self> {
        let raw_currents: BTreeMap<String, CurrentEntry> = serde_json::from_str(currents_json)?;
        let raw_craters: BTreeMap<String, CraterStats> = serde_json::from_str(craters_json)?;

        let currents = raw_currents
            .into_iter()
            .map(|(k, v)| Ok((k.parse::<CurrentMode>()?, v.current)))
            .collect::<PhysicsResult<BTreeMap<_, _>>>()?;
        let craters = raw_craters
            .into_iter()
            .map(|(k, v)| Ok((k.parse::<CurrentMode>()?, v)))
            .collect::<PhysicsResult<BTreeMap<_, _>>>()?;

        Self::new(currents, craters)
    }

    pub fn from_json_paths(currents_path: &Path, craters_path: &Path) -> PhysicsResult<Self> {
        let currents = std::fs::read_to_string(currents_path)?;
        let craters = std::fs::read_to_string(craters_path)?;
        Self::from_json_strs(&currents, &craters)
    }

    pub fn modes(&self) -> impl Iterator<Item = CurrentMode> + '_ {
        self.currents.keys().copied()
    }

    pub fn peak_current(&self, mode: Option<CurrentMode>) -> Lookup<f64> {
        resolve(&self.currents, mode)
    }

    pub fn crater(&self, mode: Option<CurrentMode>) -> Lookup<CraterStats> {
        resolve(&self.craters, mode)
    }
}

fn resolve<T: Copy>(table: &BTreeMap<CurrentMode, T>, mode: Option<CurrentMode>) -> Lookup<T> {
    if let Some(m) = mode {
        if let Some(v) = table.get(&m) {
            return Lookup {
                value: *v,
                resolved: m,
                fell_back: false,
            };
        }
    }
    // The default row is guaranteed by construction.
    let value = table[&CurrentMode::DEFAULT];
    Lookup {
        value,
        resolved: CurrentMode::DEFAULT,
        fell_back: mode.is_some(),
    }
}
