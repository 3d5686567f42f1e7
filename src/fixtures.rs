//! Shared builders for test partitions and query inputs.

use crate::array::time::{NANOS_PER_HOUR, from_datetime};
use crate::array::{ArrayStore, BincodeStore, DatasetFile, Grid};
use crate::repository::metadata::{Manifest, MetadataBlock, SETTINGS_FILE};

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;

pub const LATS: [f64; 2] = [40.0, 30.0];
pub const LONS: [f64; 2] = [-10.0, 0.0];

pub fn instant(year: i32, month: u32, day: u32, hour: u32) -> i64 {
    let datetime = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap();
    from_datetime(datetime).unwrap()
}

/// A file of `hours` consecutive hourly steps on a 2x2 grid.
///
/// `value(instant, cell)` fills every cell.
pub fn hourly_file(
    vars: &[&str],
    start: i64,
    hours: usize,
    value: &dyn Fn(&str, i64, usize) -> f64,
) -> DatasetFile {
    let mut file = DatasetFile::new(
        "time",
        "step",
        start,
        (0..hours as i64).map(|h| h * NANOS_PER_HOUR).collect(),
    )
    .with_coord("latitude", LATS.to_vec())
    .with_coord("longitude", LONS.to_vec());

    for var in vars {
        let mut values = Vec::with_capacity(hours * 4);
        for h in 0..hours {
            for cell in 0..4 {
                values.push(value(var, start + h as i64 * NANOS_PER_HOUR, cell));
            }
        }
        let grid = Grid::new(&["step", "latitude", "longitude"], &[hours, 2, 2], values).unwrap();
        file = file.with_variable(var, grid).unwrap();
    }
    file
}

pub fn metadata_block(vars: &[&str]) -> MetadataBlock {
    MetadataBlock {
        step: NANOS_PER_HOUR,
        time_variation_dim: "step".to_string(),
        time_initial_dim: "time".to_string(),
        data_vars: vars.iter().map(|v| v.to_string()).collect(),
        time_gap: None,
        resolution_reduction_parameters: None,
    }
}

/// Writes a month-per-file partition whose files hold `hours` steps from the 1st at 00:00.
pub fn write_month_partition(
    dir: &Path,
    metadata: MetadataBlock,
    months: &[(i32, u32)],
    hours: usize,
    value: &dyn Fn(&str, i64, usize) -> f64,
) {
    let vars: Vec<&str> = metadata.data_vars.iter().map(|v| v.as_str()).collect();
    let mut settings = Vec::new();
    for (year, month) in months {
        let name = format!("ERA5-{}-{}.nc", month, year);
        let file = hourly_file(&vars, instant(*year, *month, 1, 0), hours, value);
        BincodeStore.write(&dir.join(&name), &file).unwrap();
        settings.push(name);
    }
    let manifest = Manifest { settings, metadata };
    std::fs::write(
        dir.join(SETTINGS_FILE),
        serde_json::to_string_pretty(&manifest).unwrap(),
    )
    .unwrap();
}

pub fn gap_block(entries: &[(u32, &str)]) -> BTreeMap<String, BTreeMap<u32, Vec<String>>> {
    let mut hours: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for (hour, var) in entries {
        hours.entry(*hour).or_default().push(var.to_string());
    }
    BTreeMap::from([("hour".to_string(), hours)])
}
