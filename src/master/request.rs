//! Building RPC requests from the requests file.

use crate::config::{RequestDefinition, RequestOptions};
use crate::rpc::{FileEntry, InputFileGroup, SearchOptions, SearchRequest, SelectionParameter};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;

pub const REQUEST_ID_SUFFIX_FORMAT: &str = "%H-%M-%S_%Y-%m-%d";

/// `<request-name>-<HH-MM-SS_YYYY-MM-DD>`, unique per run.
pub fn request_id(name: &str, now: NaiveDateTime) -> String {
    format!("{}-{}", name, now.format(REQUEST_ID_SUFFIX_FORMAT))
}

pub fn search_options(options: &RequestOptions) -> SearchOptions {
    SearchOptions {
        used_data_var: options.data_vars.clone(),
        dataset_selection_params: options
            .partial_dataset_parameters
            .iter()
            .map(|(name, bounds)| SelectionParameter {
                name: name.clone(),
                min: bounds.min,
                max: bounds.max,
            })
            .collect(),
        ts_neighbour_gap: options.ts_neighbour_gap.unwrap_or(0),
        search_hours: options.search_hours.clone(),
        input_step_difference: options.input_step_difference.clone(),
        selection_data_vars: options.data_var_selection.clone(),
    }
}

/// Reads the size of every input file and assembles the request sent to each worker.
///
/// An unset `number-of-results` travels as 0.
pub fn build_request(definition: &RequestDefinition, request_id: &str) -> Result<SearchRequest> {
    let mut input_files = Vec::with_capacity(definition.input_path.len());
    for (data_variable, paths) in &definition.input_path {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let size = std::fs::metadata(path)
                .with_context(|| format!("Cannot read input file {}", path.display()))?
                .len();
            files.push(FileEntry {
                file_name: path.to_string_lossy().into_owned(),
                size,
            });
        }
        input_files.push(InputFileGroup {
            data_variable: data_variable.clone(),
            files,
        });
    }

    Ok(SearchRequest {
        request_id: request_id.to_string(),
        input_files,
        number_of_results: definition.number_of_results.unwrap_or(0),
        correlation_function: definition.options.correlation_function.clone(),
        options: search_options(&definition.options),
    })
}
