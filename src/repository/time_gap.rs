//! Known holes in a repository's time axis.

use crate::array::time::hour_of;

use anyhow::{Result, bail};
use std::collections::{BTreeMap, HashMap, HashSet};

pub const HOUR_TAG: &str = "hour";
pub const ALL_VARS: &str = "ALL";

/// Hours of the day without data, globally or per data variable.
#[derive(Debug, Clone, Default)]
pub struct TimeGapContainer {
    all_vars: HashSet<u32>,
    per_var: HashMap<String, HashSet<u32>>,
}

impl TimeGapContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the container from the `time-gap` block of a manifest: `{tag: {value: [vars]}}`.
    pub fn from_manifest(block: &BTreeMap<String, BTreeMap<u32, Vec<String>>>) -> Result<Self> {
        let mut container = Self::new();
        for (tag, values) in block {
            for (value, vars) in values {
                for var in vars {
                    container.add_time_gap(tag, *value, var)?;
                }
            }
        }
        Ok(container)
    }

    pub fn add_time_gap(&mut self, tag: &str, value: u32, data_var: &str) -> Result<()> {
        if tag != HOUR_TAG {
            bail!("Tag {} does not exist in TimeGapContainer", tag);
        }
        if data_var == ALL_VARS {
            self.all_vars.insert(value);
        } else {
            self.per_var
                .entry(data_var.to_string())
                .or_default()
                .insert(value);
        }
        Ok(())
    }

    /// True when `instant` has no data for any of `data_vars`, or lies outside `search_hours`.
    pub fn is_gap(&self, instant: i64, data_vars: &[String], search_hours: Option<&[u32]>) -> bool {
        let hour = hour_of(instant);
        if let Some(hours) = search_hours {
            if !hours.contains(&hour) {
                return true;
            }
        }
        data_vars.iter().any(|var| {
            self.all_vars.contains(&hour)
                || self
                    .per_var
                    .get(var)
                    .is_some_and(|hours| hours.contains(&hour))
        })
    }
}
