//! Partition files.

use super::grid::Grid;

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

/// Inclusive coordinate-value box along one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSelectionParameter {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl DatasetSelectionParameter {
    pub fn new(name: &str, min: f64, max: f64) -> Result<Self> {
        if min > max {
            bail!(
                "Parameter with name {} has a minimum value bigger than the maximum value. MAX: {}, MIN: {}",
                name,
                max,
                min
            );
        }
        Ok(Self {
            name: name.to_string(),
            min,
            max,
        })
    }
}

/// One time-indexed file of a partition (or of a query input).
///
/// Absolute instants are `initial_time + offsets[i]`. Every variable grid carries
/// `variation_dim` as its leading dimension with one entry per offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetFile {
    pub initial_dim: String,
    pub variation_dim: String,
    pub initial_time: i64,
    pub offsets: Vec<i64>,
    pub coords: BTreeMap<String, Vec<f64>>,
    pub variables: BTreeMap<String, Grid>,
}

impl DatasetFile {
    pub fn new(initial_dim: &str, variation_dim: &str, initial_time: i64, offsets: Vec<i64>) -> Self {
        Self {
            initial_dim: initial_dim.to_string(),
            variation_dim: variation_dim.to_string(),
            initial_time,
            offsets,
            coords: BTreeMap::new(),
            variables: BTreeMap::new(),
        }
    }

    pub fn with_coord(mut self, name: &str, values: Vec<f64>) -> Self {
        self.coords.insert(name.to_string(), values);
        self
    }

    /// Adds a variable, checking it is laid out along the time-variation dimension.
    pub fn with_variable(mut self, name: &str, grid: Grid) -> Result<Self> {
        if grid.dims().first() != Some(&self.variation_dim) {
            bail!(
                "Variable '{}' must lead with dimension '{}', found {:?}",
                name,
                self.variation_dim,
                grid.dims()
            );
        }
        if grid.len_of(&self.variation_dim)? != self.offsets.len() {
            bail!(
                "Variable '{}' has {} time entries but the file has {} offsets",
                name,
                grid.len_of(&self.variation_dim)?,
                self.offsets.len()
            );
        }
        self.variables.insert(name.to_string(), grid);
        Ok(self)
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.offsets.iter().map(|o| self.initial_time + o).collect()
    }

    pub fn first_instant(&self) -> Option<i64> {
        self.offsets.first().map(|o| self.initial_time + o)
    }

    pub fn position_of(&self, instant: i64) -> Option<usize> {
        self.offsets
            .iter()
            .position(|o| self.initial_time + o == instant)
    }

    pub fn contains_instant(&self, instant: i64) -> bool {
        self.position_of(instant).is_some()
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variable(&self, name: &str) -> Result<&Grid> {
        self.variables
            .get(name)
            .ok_or_else(|| anyhow!("Data variable '{}' not present in file", name))
    }

    pub fn coordinate(&self, name: &str) -> Result<&[f64]> {
        self.coords
            .get(name)
            .map(|c| c.as_slice())
            .ok_or_else(|| anyhow!("Coordinate '{}' not present in file", name))
    }

    /// The spatial slice of `var` at time position `position`.
    pub fn step_slice(&self, var: &str, position: usize) -> Result<Grid> {
        self.variable(var)?.index(&self.variation_dim, position)
    }

    /// The contiguous index range of coordinate `name` whose values fall in `[min, max]`.
    pub fn coordinate_range(&self, name: &str, min: f64, max: f64) -> Result<Range<usize>> {
        let values = self.coordinate(name)?;
        let first = values.iter().position(|v| *v >= min && *v <= max);
        let last = values.iter().rposition(|v| *v >= min && *v <= max);
        match (first, last) {
            (Some(first), Some(last)) => Ok(first..last + 1),
            _ => bail!(
                "No value of coordinate '{}' lies within [{}, {}]",
                name,
                min,
                max
            ),
        }
    }

    /// Restricts `grid` (laid out on this file's coordinates) to a selection box.
    pub fn select_box(&self, grid: &Grid, selection: &[DatasetSelectionParameter]) -> Result<Grid> {
        let mut selected = grid.clone();
        for param in selection {
            let range = self.coordinate_range(&param.name, param.min, param.max)?;
            selected = selected.select_range(&param.name, range)?;
        }
        Ok(selected)
    }

    /// Coarsens a spatial dimension of every variable and its coordinate by `factor`.
    pub fn coarsen_spatial(&self, dim: &str, factor: usize) -> Result<DatasetFile> {
        let mut reduced = self.clone();
        for (name, grid) in &self.variables {
            if grid.dims().iter().any(|d| d == dim) {
                reduced
                    .variables
                    .insert(name.clone(), grid.coarsen_mean(dim, factor)?);
            }
        }
        if let Some(values) = self.coords.get(dim) {
            let coord = Grid::new(&[dim], &[values.len()], values.clone())?
                .coarsen_mean(dim, factor)?;
            reduced
                .coords
                .insert(dim.to_string(), coord.data().iter().copied().collect());
        }
        Ok(reduced)
    }

    /// Merges files along the time-variation dimension and block-averages the result.
    ///
    /// Each block keeps the instant of its first member. The merged file starts at the
    /// first instant of the first file.
    pub fn coarsen_time(files: &[DatasetFile], factor: usize) -> Result<DatasetFile> {
        let first = files
            .first()
            .ok_or_else(|| anyhow!("Cannot reduce an empty list of files"))?;
        if factor == 0 {
            bail!("Time coarsening factor must be positive");
        }
        let instants: Vec<i64> = files.iter().flat_map(|f| f.timestamps()).collect();
        let blocks = instants.len() / factor;
        if blocks == 0 {
            bail!(
                "Time coarsening factor {} is larger than the {} available instants",
                factor,
                instants.len()
            );
        }

        let mut merged = DatasetFile::new(
            &first.initial_dim,
            &first.variation_dim,
            instants[0],
            (0..blocks)
                .map(|b| instants[b * factor] - instants[0])
                .collect(),
        );
        merged.coords = first.coords.clone();

        for name in first.variables.keys() {
            let grids = files
                .iter()
                .map(|f| f.variable(name).cloned())
                .collect::<Result<Vec<_>>>()?;
            let joined = Grid::concat(&first.variation_dim, &grids)?;
            merged
                .variables
                .insert(name.clone(), joined.coarsen_mean(&first.variation_dim, factor)?);
        }
        Ok(merged)
    }
}
