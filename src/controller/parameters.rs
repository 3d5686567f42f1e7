//! Conversions between the RPC messages and the types the services work with.

use crate::array::DatasetSelectionParameter;
use crate::array::time::format_key;
use crate::rpc::{Analogue, InputFileGroup, SearchOptions, SearchRequest, SelectionParameter};
use crate::service::{InputFiles, RequestParameters, SearchResults};
use crate::transfer::InputFileProperties;

use anyhow::{Result, bail};
use std::path::PathBuf;

pub fn dataset_selection_parameter(param: &SelectionParameter) -> Result<DatasetSelectionParameter> {
    DatasetSelectionParameter::new(&param.name, param.min, param.max)
}

/// Builds the service parameters of a request. Empty lists and a zero gap mean "not set".
pub fn request_parameters_factory(options: &SearchOptions) -> Result<RequestParameters> {
    let mut params = RequestParameters::default();

    if !options.used_data_var.is_empty() {
        params.search_data_var = Some(options.used_data_var.clone());
    }
    if !options.dataset_selection_params.is_empty() {
        params.dataset_selection_parameters = Some(
            options
                .dataset_selection_params
                .iter()
                .map(dataset_selection_parameter)
                .collect::<Result<Vec<_>>>()?,
        );
    }
    if options.ts_neighbour_gap != 0 {
        params.ts_neighbour_gap = Some(options.ts_neighbour_gap);
    }
    if !options.search_hours.is_empty() {
        if let Some(hour) = options.search_hours.iter().find(|h| **h > 23) {
            bail!(
                "The hours in the \"search hours\" parameter should be between 0 and 23, found {}",
                hour
            );
        }
        params.search_hours = Some(options.search_hours.clone());
    }
    if !options.input_step_difference.is_empty() {
        if options.input_step_difference.iter().any(|d| *d < 0) {
            bail!("The number of hours between input timestamps has to be a non negative number");
        }
        params.input_step_difference = Some(options.input_step_difference.clone());
    }
    if !options.selection_data_vars.is_empty() {
        params.selection_data_vars = Some(options.selection_data_vars.clone());
    }

    Ok(params)
}

/// Flattens the per-variable file groups of a request into transfer entries.
pub fn list_of_files_factory(groups: &[InputFileGroup]) -> Vec<InputFileProperties> {
    groups
        .iter()
        .flat_map(|group| {
            group.files.iter().map(move |file| {
                InputFileProperties::new(&file.file_name, file.size, &group.data_variable)
            })
        })
        .collect()
}

/// Groups received files by data variable, keeping their arrival order.
pub fn separate_files_by_data_vars(files: &[(PathBuf, InputFileProperties)]) -> InputFiles {
    let mut separated = InputFiles::new();
    for (path, properties) in files {
        separated
            .entry(properties.data_variable.clone())
            .or_default()
            .push(path.clone());
    }
    separated
}

/// Analogues of the second streamed message: raw similarity sums with their counters.
pub fn analogues_from_results(results: &SearchResults) -> Vec<Analogue> {
    results
        .iter()
        .map(|(instant, container)| Analogue {
            timestamp: format_key(*instant),
            similarity_value: container.value,
            time_instances: container.sum_counter,
        })
        .collect()
}

/// Every received variable is searched when the request names none.
pub fn default_search_vars(params: &mut RequestParameters, input: &InputFiles) {
    if params.search_data_var.is_none() {
        params.search_data_var = Some(input.keys().cloned().collect());
    }
}

/// `number_of_results` of a request, `None` when the caller left it unset (0).
pub fn requested_results(request: &SearchRequest) -> Option<usize> {
    (request.number_of_results > 0).then_some(request.number_of_results)
}
