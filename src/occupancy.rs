//! Occupancy data model as returned by the study-space endpoint.

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

/// Sub-area names written to the log, in column order.
///
/// Header and rows both iterate this list (never the decoded map) so the
/// column layout stays stable across runs.
pub const DEFAULT_LEVELS: [&str; 6] = [
    "Level1",
    "Level2e",
    "Level3e",
    "Level3nsw",
    "Level4e",
    "Level4nsw",
];

/// Occupancy counts for one area. Fields the endpoint omits decode as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LevelReading {
    /// Free seats.
    pub free: u32,
    /// Total seats.
    pub total: u32,
    /// Free seats as a percentage of total (0-100).
    pub free_percentage: f64,
    /// Used seats as a percentage of total (0-100).
    pub used_percentage: f64,
}

impl LevelReading {
    /// Returns `true` when `free <= total` and both percentages lie in 0..=100.
    ///
    /// `used_percentage` is not checked against `100 - free_percentage`; the
    /// endpoint rounds them independently.
    pub fn is_consistent(&self) -> bool {
        let pct = 0.0..=100.0;
        self.free <= self.total
            && pct.contains(&self.free_percentage)
            && pct.contains(&self.used_percentage)
    }
}

/// One snapshot: the telepen gate plus per-level ("affluence") readings.
///
/// A missing or `null` section decodes as empty so a partial body still
/// produces a row; only malformed JSON or wrongly typed values are rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OccupancyReading {
    /// Primary gate reading.
    #[serde(deserialize_with = "null_as_default")]
    pub telepen: LevelReading,
    /// Named sub-area readings.
    #[serde(deserialize_with = "null_as_default")]
    pub affluence: HashMap<String, LevelReading>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl OccupancyReading {
    /// Reading for a named level, zero-valued when the level is absent.
    pub fn level(&self, name: &str) -> LevelReading {
        self.affluence.get(name).copied().unwrap_or_default()
    }

    /// Names of every reading (telepen included) that fails [`LevelReading::is_consistent`].
    pub fn inconsistent_areas(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .affluence
            .iter()
            .filter(|(_, r)| !r.is_consistent())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        if !self.telepen.is_consistent() {
            names.insert(0, "telepen".to_owned());
        }
        names
    }
}
