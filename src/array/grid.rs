//! Named-dimension grids.

use anyhow::{Result, anyhow, bail};
use ndarray::{ArrayD, ArrayView1, ArrayViewD, Axis, IxDyn, Slice, Zip};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A dense `f64` array whose axes are addressed by name.
///
/// `NaN` marks a missing value; every reduction skips it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    dims: Vec<String>,
    data: ArrayD<f64>,
}

impl Grid {
    /// Builds a grid from a flat row-major buffer.
    pub fn new(dims: &[&str], shape: &[usize], values: Vec<f64>) -> Result<Self> {
        if dims.len() != shape.len() {
            bail!(
                "Grid has {} dimension names but a shape of rank {}",
                dims.len(),
                shape.len()
            );
        }
        let data = ArrayD::from_shape_vec(IxDyn(shape), values)
            .map_err(|e| anyhow!("Invalid grid shape {:?}: {}", shape, e))?;
        Ok(Self {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            data,
        })
    }

    pub fn from_array(dims: Vec<String>, data: ArrayD<f64>) -> Result<Self> {
        if dims.len() != data.ndim() {
            bail!(
                "Grid has {} dimension names but an array of rank {}",
                dims.len(),
                data.ndim()
            );
        }
        Ok(Self { dims, data })
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn len_of(&self, dim: &str) -> Result<usize> {
        Ok(self.data.len_of(Axis(self.axis_of(dim)?)))
    }

    pub fn axis_of(&self, dim: &str) -> Result<usize> {
        self.dims
            .iter()
            .position(|d| d == dim)
            .ok_or_else(|| anyhow!("Dimension '{}' not found in grid {:?}", dim, self.dims))
    }

    /// Picks one position along `dim`, dropping that dimension.
    pub fn index(&self, dim: &str, position: usize) -> Result<Grid> {
        let axis = self.axis_of(dim)?;
        let len = self.data.len_of(Axis(axis));
        if position >= len {
            bail!(
                "Index {} out of bounds for dimension '{}' of length {}",
                position,
                dim,
                len
            );
        }
        let mut dims = self.dims.clone();
        dims.remove(axis);
        Ok(Grid {
            dims,
            data: self.data.index_axis(Axis(axis), position).to_owned(),
        })
    }

    /// Keeps the positions `range` along `dim`.
    pub fn select_range(&self, dim: &str, range: Range<usize>) -> Result<Grid> {
        let axis = self.axis_of(dim)?;
        let len = self.data.len_of(Axis(axis));
        if range.start >= range.end || range.end > len {
            bail!(
                "Range {:?} is not valid for dimension '{}' of length {}",
                range,
                dim,
                len
            );
        }
        Ok(Grid {
            dims: self.dims.clone(),
            data: self
                .data
                .slice_axis(Axis(axis), Slice::from(range))
                .to_owned(),
        })
    }

    /// Block-averages `dim` by `factor`, trimming the trailing partial block.
    pub fn coarsen_mean(&self, dim: &str, factor: usize) -> Result<Grid> {
        if factor == 0 {
            bail!("Coarsening factor for '{}' must be positive", dim);
        }
        let axis = self.axis_of(dim)?;
        let blocks = self.data.len_of(Axis(axis)) / factor;
        if blocks == 0 {
            bail!(
                "Coarsening factor {} is larger than dimension '{}' ({})",
                factor,
                dim,
                self.data.len_of(Axis(axis))
            );
        }

        let reduced: Vec<ArrayD<f64>> = (0..blocks)
            .map(|block| {
                self.data
                    .slice_axis(Axis(axis), Slice::from(block * factor..(block + 1) * factor))
                    .map_axis(Axis(axis), |lane| nan_mean(lane))
                    .insert_axis(Axis(axis))
            })
            .collect();
        let views: Vec<ArrayViewD<f64>> = reduced.iter().map(|a| a.view()).collect();
        let data = ndarray::concatenate(Axis(axis), &views)
            .map_err(|e| anyhow!("Failed to assemble coarsened grid: {}", e))?;

        Ok(Grid {
            dims: self.dims.clone(),
            data,
        })
    }

    /// Joins grids along an existing dimension.
    pub fn concat(dim: &str, grids: &[Grid]) -> Result<Grid> {
        let first = grids
            .first()
            .ok_or_else(|| anyhow!("Cannot concatenate an empty list of grids"))?;
        if grids.iter().any(|g| g.dims != first.dims) {
            bail!("Cannot concatenate grids with different dimensions");
        }
        let axis = first.axis_of(dim)?;
        let views: Vec<ArrayViewD<f64>> = grids.iter().map(|g| g.data.view()).collect();
        let data = ndarray::concatenate(Axis(axis), &views)
            .map_err(|e| anyhow!("Failed to concatenate along '{}': {}", dim, e))?;
        Ok(Grid {
            dims: first.dims.clone(),
            data,
        })
    }

    /// Element-wise combination of two grids of equal shape.
    pub fn zip_with(&self, other: &Grid, f: impl Fn(f64, f64) -> f64) -> Result<Grid> {
        self.check_same_shape(other)?;
        let data = Zip::from(&self.data)
            .and(&other.data)
            .map_collect(|&a, &b| f(a, b));
        Ok(Grid {
            dims: self.dims.clone(),
            data,
        })
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Grid {
        Grid {
            dims: self.dims.clone(),
            data: self.data.mapv(f),
        }
    }

    /// Value pairs where neither side is missing.
    pub fn pairs(&self, other: &Grid) -> Result<Vec<(f64, f64)>> {
        self.check_same_shape(other)?;
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .filter(|(a, b)| !a.is_nan() && !b.is_nan())
            .map(|(a, b)| (*a, *b))
            .collect())
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied().filter(|v| !v.is_nan())
    }

    pub fn count(&self) -> usize {
        self.values().count()
    }

    pub fn sum(&self) -> f64 {
        self.values().sum()
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return f64::NAN;
        }
        self.sum() / count as f64
    }

    pub fn min(&self) -> f64 {
        self.values().fold(f64::NAN, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values().fold(f64::NAN, f64::max)
    }

    fn check_same_shape(&self, other: &Grid) -> Result<()> {
        if self.shape() != other.shape() {
            bail!(
                "Grid shapes differ: {:?} vs {:?}",
                self.shape(),
                other.shape()
            );
        }
        Ok(())
    }
}

fn nan_mean(lane: ArrayView1<f64>) -> f64 {
    let (sum, count) = lane
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { f64::NAN } else { sum / count as f64 }
}
