//! Repository layer: the façade over one local dataset partition.

use super::date::DateContainer;
use super::indexer::{DatasetIndexer, FileNaming};
use super::metadata::{Manifest, RepositoryMetadata};
use crate::array::{ArrayStore, DatasetFile};

use anyhow::{Result, anyhow, bail};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const MONTH_YEAR_REPO: &str = "month-year-repository";
pub const HOUR_DAY_MONTH_YEAR_REPO: &str = "hour-day-month-year-repository";
pub const MONTH_YEAR_ROUND_ROBIN_REPO: &str = "month-year-round-robin-repository";

/// Lazy, time-ordered sequence of opened partition files.
pub type DatasetIter<'a> = Box<dyn Iterator<Item = Result<(PathBuf, DatasetFile)>> + Send + 'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    MonthYear,
    HourDayMonthYear,
    MonthYearRoundRobin,
}

impl RepositoryKind {
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            MONTH_YEAR_REPO => Ok(Self::MonthYear),
            HOUR_DAY_MONTH_YEAR_REPO => Ok(Self::HourDayMonthYear),
            MONTH_YEAR_ROUND_ROBIN_REPO => Ok(Self::MonthYearRoundRobin),
            other => Err(anyhow!("Unknown repository type: {}", other)),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::MonthYear => MONTH_YEAR_REPO,
            Self::HourDayMonthYear => HOUR_DAY_MONTH_YEAR_REPO,
            Self::MonthYearRoundRobin => MONTH_YEAR_ROUND_ROBIN_REPO,
        }
    }

    fn naming(&self) -> FileNaming {
        match self {
            Self::HourDayMonthYear => FileNaming::HourDayMonthYear,
            Self::MonthYear | Self::MonthYearRoundRobin => FileNaming::MonthYear,
        }
    }
}

/// Operations every partition supports.
pub trait RepositoryLayer: Send + Sync {
    fn kind(&self) -> RepositoryKind;

    fn metadata(&self) -> &RepositoryMetadata;

    /// Every file of the partition in time order.
    fn dataset(&self) -> Result<DatasetIter<'_>>;

    /// The single file covering `date`, if the partition holds it.
    fn dataset_part(&self, date: DateContainer) -> Result<Option<(PathBuf, DatasetFile)>>;

    /// Coarsening factors this (reduced) partition was produced with.
    fn low_resolution_parameters(&self) -> Result<BTreeMap<String, usize>>;

    fn is_gap(&self, instant: i64, data_vars: &[String], search_hours: Option<&[u32]>) -> bool {
        self.metadata()
            .time_gaps
            .is_gap(instant, data_vars, search_hours)
    }
}

/// Partition stored as ERA5-named files in one folder.
pub struct Era5Repository {
    kind: RepositoryKind,
    folder: PathBuf,
    indexer: DatasetIndexer,
    metadata: RepositoryMetadata,
    store: Arc<dyn ArrayStore>,
    /// Distance between a file's first instant and the instant its name denotes.
    file_shift: i64,
}

impl Era5Repository {
    pub fn open(kind: RepositoryKind, folder: &Path, store: Arc<dyn ArrayStore>) -> Result<Self> {
        if folder.as_os_str().is_empty() {
            bail!("Repository path can not be empty");
        }
        let manifest = Manifest::load(folder)?;
        let metadata = RepositoryMetadata::from_block(&manifest.metadata)?;
        let indexer = DatasetIndexer::new(folder, &manifest.settings, kind.naming())?;

        let file_shift = match kind {
            RepositoryKind::HourDayMonthYear => 0,
            RepositoryKind::MonthYear | RepositoryKind::MonthYearRoundRobin => {
                let first = indexer.first_file();
                let file = store.open(&first.path)?;
                let instant = file
                    .first_instant()
                    .ok_or_else(|| anyhow!("File {} has no time steps", first.path.display()))?;
                instant - first.date.to_instant()?
            }
        };

        tracing::info!(
            "Opened {} at {} ({} files, vars {:?})",
            kind.tag(),
            folder.display(),
            indexer.sorted_files().len(),
            metadata.data_vars
        );

        Ok(Self {
            kind,
            folder: folder.to_path_buf(),
            indexer,
            metadata,
            store,
            file_shift,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn lookup(&self, date: &DateContainer) -> Result<Option<(PathBuf, DatasetFile)>> {
        match self.indexer.index(date) {
            Some(file) => Ok(Some((file.path.clone(), self.store.open(&file.path)?))),
            None => Ok(None),
        }
    }

    fn month_lookup(&self, mut date: DateContainer) -> Result<Option<(PathBuf, DatasetFile)>> {
        if date.has_day() && date.has_hour() {
            date = date.subtract(self.file_shift)?;
        }
        date.unset_day();
        date.unset_hour();
        self.lookup(&date)
    }
}

impl RepositoryLayer for Era5Repository {
    fn kind(&self) -> RepositoryKind {
        self.kind
    }

    fn metadata(&self) -> &RepositoryMetadata {
        &self.metadata
    }

    fn dataset(&self) -> Result<DatasetIter<'_>> {
        if self.kind == RepositoryKind::MonthYearRoundRobin {
            bail!("This repository does not support sequential iteration");
        }
        Ok(Box::new(self.indexer.sorted_files().iter().map(|file| {
            let dataset = self.store.open(&file.path)?;
            Ok((file.path.clone(), dataset))
        })))
    }

    fn dataset_part(&self, date: DateContainer) -> Result<Option<(PathBuf, DatasetFile)>> {
        match self.kind {
            RepositoryKind::HourDayMonthYear => self.lookup(&date),
            RepositoryKind::MonthYear => self.month_lookup(date),
            RepositoryKind::MonthYearRoundRobin => {
                let instant = date.to_instant()?;
                Ok(self
                    .month_lookup(date)?
                    .filter(|(_, file)| file.contains_instant(instant)))
            }
        }
    }

    fn low_resolution_parameters(&self) -> Result<BTreeMap<String, usize>> {
        self.metadata.resolution_reduction.clone().ok_or_else(|| {
            anyhow!(
                "Key resolution-reduction-parameters not found in manifest of {}",
                self.folder.display()
            )
        })
    }
}
