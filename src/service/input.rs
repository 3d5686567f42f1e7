//! Query input traversal.

use crate::array::{DatasetFile, DatasetSelectionParameter};
use crate::correlation::{CorrelationFunction, CorrelationStatistics, TimeSlice};
use crate::repository::RepositoryMetadata;

use anyhow::Result;

struct InputEntry {
    slice: TimeSlice,
    /// Box-selected slice and full-slice statistics, when screening candidates.
    screened: Option<(TimeSlice, CorrelationStatistics)>,
}

/// The query instants of one data variable, sorted by time with gap instants removed.
///
/// Each item comes with the number of extra steps separating it from the previous
/// query instant (`input_step_difference[k - 1]` for the k-th item, 0 otherwise).
pub struct InputIterator {
    entries: Vec<InputEntry>,
    intervals: Option<Vec<i64>>,
}

impl InputIterator {
    pub fn new(
        files: &[DatasetFile],
        var: &str,
        metadata: &RepositoryMetadata,
        used_vars: &[String],
        intervals: Option<Vec<i64>>,
    ) -> Result<Self> {
        let mut slices: Vec<TimeSlice> = Vec::new();
        for file in files {
            for (position, instant) in file.timestamps().into_iter().enumerate() {
                if metadata.time_gaps.is_gap(instant, used_vars, None) {
                    tracing::warn!(
                        "Skipped input instant {} as it represents a gap in the dataset",
                        crate::array::time::format_key(instant)
                    );
                    continue;
                }
                slices.push(TimeSlice::new(instant, file.step_slice(var, position)?));
            }
        }
        slices.sort_by_key(|s| s.instant);

        Ok(Self {
            entries: slices
                .into_iter()
                .map(|slice| InputEntry {
                    slice,
                    screened: None,
                })
                .collect(),
            intervals,
        })
    }

    /// Like `new`, also preparing box-selected slices and their full-slice statistics.
    pub fn with_statistics(
        files: &[DatasetFile],
        var: &str,
        metadata: &RepositoryMetadata,
        used_vars: &[String],
        intervals: Option<Vec<i64>>,
        function: &dyn CorrelationFunction,
        selection: &[DatasetSelectionParameter],
    ) -> Result<Self> {
        let mut iterator = Self::new(files, var, metadata, used_vars, intervals)?;
        for entry in &mut iterator.entries {
            let file = files
                .iter()
                .find(|f| f.contains_instant(entry.slice.instant))
                .ok_or_else(|| anyhow::anyhow!("Input instant lost while screening"))?;
            let stats = function.setup_stats(&entry.slice, var)?;
            let selected = TimeSlice::new(
                entry.slice.instant,
                file.select_box(&entry.slice.grid, selection)?,
            );
            entry.screened = Some((selected, stats));
        }
        Ok(iterator)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn first_instant(&self) -> Option<i64> {
        self.entries.first().map(|e| e.slice.instant)
    }

    fn interval_at(&self, index: usize) -> i64 {
        match &self.intervals {
            Some(intervals) if index > 0 && index <= intervals.len() => intervals[index - 1],
            _ => 0,
        }
    }

    pub fn iterate(&self) -> impl Iterator<Item = (&TimeSlice, i64)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (&e.slice, self.interval_at(i)))
    }

    /// Selected slices with their statistics; empty unless built `with_statistics`.
    pub fn iterate_with_statistics(
        &self,
    ) -> impl Iterator<Item = (&TimeSlice, &CorrelationStatistics, i64)> + '_ {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            e.screened
                .as_ref()
                .map(|(selected, stats)| (selected, stats, self.interval_at(i)))
        })
    }
}
