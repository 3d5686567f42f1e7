//! Result files of a master run.

use super::types::SearchResult;
use crate::rpc::SearchRequest;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const RUN_LOG_FORMAT: &str = "%H:%M:%S_%Y-%m-%d";
pub const REQUEST_SEPARATOR_WIDTH: usize = 100;

/// Writes `<results-path>/<request id>.csv` with one `Timestamp,Similarity` row per analogue.
pub fn write_csv(results_path: &Path, request_id: &str, result: &SearchResult) -> Result<PathBuf> {
    let path = results_path.join(format!("{}.csv", request_id));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(["Timestamp", "Similarity"])?;
    for analogue in &result.analogues {
        writer.write_record([analogue.timestamp.clone(), analogue.similarity.to_string()])?;
    }
    writer.flush()?;
    Ok(path)
}

/// The `results_<time>.res` log: one section per request, successful or not.
pub struct RunLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl RunLog {
    pub fn create(results_path: &Path, now: NaiveDateTime) -> Result<Self> {
        let path = results_path.join(format!("results_{}.res", now.format(RUN_LOG_FORMAT)));
        let file =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn request(&mut self, request: &SearchRequest) -> Result<()> {
        writeln!(self.writer, "Request {}\n", request.request_id)?;
        writeln!(self.writer, "Provided Input:")?;
        writeln!(
            self.writer,
            "Request Name: {}\nNum. of results: {}\nInput Paths: {:?}\nOptions: {:?}\n",
            request.request_id, request.number_of_results, request.input_files, request.options
        )?;
        Ok(())
    }

    pub fn result(&mut self, elapsed_nanos: u128, result: &SearchResult) -> Result<()> {
        writeln!(self.writer, "Result:")?;
        writeln!(self.writer, "Execution time in nanoseconds: {}", elapsed_nanos)?;
        writeln!(self.writer, "Obtained results: \n{}", result)?;
        Ok(())
    }

    pub fn error(&mut self, error: &anyhow::Error) -> Result<()> {
        writeln!(self.writer, "Error occured:")?;
        writeln!(self.writer, "{:?}\n", error)?;
        Ok(())
    }

    /// Closes the current request section.
    pub fn separator(&mut self) -> Result<()> {
        writeln!(self.writer, "{}", "-".repeat(REQUEST_SEPARATOR_WIDTH))?;
        self.writer.flush()?;
        Ok(())
    }
}
