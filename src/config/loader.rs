//! JSON loading and construction-time validation of every property file.

use super::types::*;
use crate::array::time::from_datetime;
use crate::repository::RepositoryKind;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn check_repository(property: &str, repository: &RepositoryConfig) -> Result<(), ConfigError> {
    RepositoryKind::from_tag(&repository.kind)
        .map_err(|e| ConfigError::invalid(property, e.to_string()))?;
    if repository.paths.is_empty() {
        return Err(ConfigError::invalid(property, "at least one path is required"));
    }
    Ok(())
}

impl WorkerProperties {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let properties: Self = load_json(path)?;
        properties.validate()?;
        tracing::info!("Parsed properties: {:?}", properties);
        Ok(properties)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.is_empty() {
            return Err(ConfigError::invalid("node-id", "must not be empty"));
        }
        let ports = &self.network_config.available_ports;
        if ports.to <= ports.from {
            return Err(ConfigError::invalid(
                "available_ports",
                format!("'to' ({}) must be bigger than 'from' ({})", ports.to, ports.from),
            ));
        }
        check_repository("repository", &self.repository)?;

        match (&self.low_resolution_service, &self.low_resolution_repository) {
            (Some(_), None) => {
                return Err(ConfigError::invalid(
                    "low-resolution-repository",
                    "required by low-resolution-service",
                ));
            }
            (None, Some(_)) => {
                return Err(ConfigError::invalid(
                    "low-resolution-service",
                    "required by low-resolution-repository",
                ));
            }
            (Some(_), Some(repository)) => {
                check_repository("low-resolution-repository", repository)?
            }
            (None, None) => {}
        }

        if self.controller == ControllerKind::Ndrank {
            self.broker_address()?;
        }
        Ok(())
    }

    /// `host:port` of the message broker.
    pub fn broker_address(&self) -> Result<(String, u16), ConfigError> {
        match (&self.network_config.kafka_ip, self.network_config.kafka_port) {
            (Some(ip), Some(port)) => Ok((ip.clone(), port)),
            _ => Err(ConfigError::invalid(
                "network-config",
                "the ndrank controller requires kafka-ip and kafka-port",
            )),
        }
    }
}

impl AggregatorProperties {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let properties: Self = load_json(path)?;
        properties.validate()?;
        tracing::info!("Parsed properties: {:?}", properties);
        Ok(properties)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_ids.is_empty() {
            return Err(ConfigError::invalid("node-ids", "at least one node is required"));
        }
        let mut seen = HashSet::new();
        for id in &self.node_ids {
            if !seen.insert(id) {
                return Err(ConfigError::invalid("node-ids", format!("duplicate node id {}", id)));
            }
        }
        if self.group_id.is_empty() {
            return Err(ConfigError::invalid("group-id", "must not be empty"));
        }
        Ok(())
    }
}

impl DateSpec {
    pub fn to_instant(&self) -> Result<i64, ConfigError> {
        let invalid = || ConfigError::invalid("date", format!("{:?} is not a valid date", self));
        let datetime = NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|d| d.and_hms_opt(self.hour, 0, 0))
            .ok_or_else(invalid)?;
        from_datetime(datetime).map_err(|_| invalid())
    }
}

impl MasterProperties {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let properties: Self = load_json(path)?;
        properties.validate()?;
        tracing::info!("Parsed properties: {:?}", properties);
        Ok(properties)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_properties.is_empty() {
            return Err(ConfigError::invalid(
                "node-properties",
                "at least one worker is required",
            ));
        }
        let (start, end) = self.dataset_interval()?;
        if start > end {
            return Err(ConfigError::invalid(
                "dataset_start_date",
                "must not be after dataset_end_date",
            ));
        }
        Ok(())
    }

    /// Inclusive bounds of the searched dataset.
    pub fn dataset_interval(&self) -> Result<(i64, i64), ConfigError> {
        Ok((
            self.dataset_start_date.to_instant()?,
            self.dataset_end_date.to_instant()?,
        ))
    }
}

impl RequestsFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let requests: Self = load_json(path)?;
        for request in &requests.requests {
            request.validate()?;
        }
        Ok(requests)
    }
}

impl RequestDefinition {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let property = |name: &str| format!("{}.{}", self.request_name, name);

        if self.request_name.is_empty() {
            return Err(ConfigError::invalid("request-name", "must not be empty"));
        }
        if self.number_of_results == Some(0) {
            return Err(ConfigError::invalid(
                &property("number-of-results"),
                "must be bigger than 0",
            ));
        }
        if self.time_instances == 0 {
            return Err(ConfigError::invalid(
                &property("time-instances"),
                "must be bigger than 0",
            ));
        }
        if self.options.data_vars.is_empty() {
            return Err(ConfigError::invalid(
                &property("data-vars"),
                "at least one data variable is required",
            ));
        }
        for var in &self.options.data_vars {
            if !self.input_path.contains_key(var) {
                return Err(ConfigError::invalid(
                    &property("input-path"),
                    format!("no input files for data variable {}", var),
                ));
            }
        }
        for (name, bounds) in &self.options.partial_dataset_parameters {
            if bounds.min > bounds.max {
                return Err(ConfigError::invalid(
                    &property("partial-dataset-parameters"),
                    format!("{} has min {} above max {}", name, bounds.min, bounds.max),
                ));
            }
        }
        if let Some(hour) = self.options.search_hours.iter().find(|h| **h > 23) {
            return Err(ConfigError::invalid(
                &property("search-hours"),
                format!("{} is not between 0 and 23", hour),
            ));
        }
        Ok(())
    }
}
