//! File-name indexing of a partition.

use super::date::DateContainer;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static MONTH_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ERA5-([0-9]{1,2})-([0-9]{4})\.(nc|grib)$").expect("valid regex")
});
static HOUR_DAY_MONTH_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ERA5-([0-9]{1,2})-([0-9]{1,2})-([0-9]{1,2})-([0-9]{4})\.(nc|grib)$")
        .expect("valid regex")
});

/// File naming conventions a partition can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileNaming {
    /// `ERA5-<month>-<year>.nc`, one file per month.
    MonthYear,
    /// `ERA5-<hour>-<day>-<month>-<year>.nc`, one file per hour.
    HourDayMonthYear,
}

impl FileNaming {
    /// Sort key and date container for a file name.
    pub fn parse(&self, file_name: &str) -> Result<(i64, DateContainer)> {
        match self {
            FileNaming::MonthYear => {
                let caps = captures(&MONTH_YEAR_RE, file_name)
                    .ok_or_else(|| anyhow!("File is not in a valid format: ERA5-<month>-<year>.nc"))?;
                let month: u32 = caps[0].parse()?;
                let year: i32 = caps[1].parse()?;
                Ok((
                    year as i64 * 100 + month as i64,
                    DateContainer::month_year(year, month),
                ))
            }
            FileNaming::HourDayMonthYear => {
                let caps = captures(&HOUR_DAY_MONTH_YEAR_RE, file_name).ok_or_else(|| {
                    anyhow!("File is not in a valid format: ERA5-<hour>-<day>-<month>-<year>.nc")
                })?;
                let hour: u32 = caps[0].parse()?;
                let day: u32 = caps[1].parse()?;
                let month: u32 = caps[2].parse()?;
                let year: i32 = caps[3].parse()?;
                let container = DateContainer::full(year, month, day, hour);
                Ok((container.hash_key(), container))
            }
        }
    }
}

fn captures(re: &Regex, file_name: &str) -> Option<Vec<String>> {
    let caps = re.captures(file_name)?;
    Some(
        caps.iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str().to_string())
            .collect(),
    )
}

/// One indexed file.
#[derive(Debug, Clone)]
pub struct IndexedFile {
    pub sort_key: i64,
    pub path: PathBuf,
    pub date: DateContainer,
}

/// Time-ordered list of a partition's files with a date lookup.
#[derive(Debug, Clone)]
pub struct DatasetIndexer {
    files: Vec<IndexedFile>,
    by_date: HashMap<DateContainer, usize>,
}

impl DatasetIndexer {
    pub fn new(folder: &Path, file_names: &[String], naming: FileNaming) -> Result<Self> {
        let mut files = file_names
            .iter()
            .map(|name| {
                let (sort_key, date) = naming
                    .parse(name)
                    .with_context(|| format!("Cannot index file '{}'", name))?;
                Ok(IndexedFile {
                    sort_key,
                    path: folder.join(name),
                    date,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if files.is_empty() {
            bail!("Partition at {} lists no files", folder.display());
        }
        files.sort_by_key(|f| f.sort_key);

        let by_date = files
            .iter()
            .enumerate()
            .map(|(i, f)| (f.date, i))
            .collect();

        Ok(Self { files, by_date })
    }

    pub fn sorted_files(&self) -> &[IndexedFile] {
        &self.files
    }

    pub fn index(&self, date: &DateContainer) -> Option<&IndexedFile> {
        self.by_date.get(date).map(|i| &self.files[*i])
    }

    /// A representative file, used to inspect properties shared by every file.
    pub fn first_file(&self) -> &IndexedFile {
        &self.files[0]
    }
}
