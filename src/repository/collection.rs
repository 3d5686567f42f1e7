//! Group of partitions served by one worker.

use super::layer::{RepositoryKind, RepositoryLayer};
use super::metadata::RepositoryMetadata;

use anyhow::{Result, anyhow, bail};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Repositories of a single kind, usually one per data-variable group.
#[derive(Clone)]
pub struct RepositoryCollection {
    repositories: Vec<Arc<dyn RepositoryLayer>>,
}

impl RepositoryCollection {
    pub fn new(repositories: Vec<Arc<dyn RepositoryLayer>>) -> Result<Self> {
        let first = repositories
            .first()
            .ok_or_else(|| anyhow!("A repository collection needs at least one repository"))?;
        let kind = first.kind();
        if let Some(other) = repositories.iter().find(|r| r.kind() != kind) {
            bail!(
                "Repositories of different types can not be mixed: {} and {}",
                kind.tag(),
                other.kind().tag()
            );
        }
        Ok(Self { repositories })
    }

    pub fn kind(&self) -> RepositoryKind {
        self.repositories[0].kind()
    }

    pub fn repositories(&self) -> &[Arc<dyn RepositoryLayer>] {
        &self.repositories
    }

    /// Largest step across members.
    pub fn step_variation(&self) -> i64 {
        self.repositories
            .iter()
            .map(|r| r.metadata().step)
            .max()
            .unwrap_or_default()
    }

    /// The members holding at least one of `data_vars`.
    pub fn subset(&self, data_vars: &[String]) -> Result<RepositoryCollection> {
        let selected: Vec<_> = self
            .repositories
            .iter()
            .filter(|r| data_vars.iter().any(|v| r.metadata().has_data_var(v)))
            .cloned()
            .collect();
        if selected.is_empty() {
            bail!("No repository holds any of the data variables {:?}", data_vars);
        }
        RepositoryCollection::new(selected)
    }

    pub fn is_gap(&self, instant: i64, data_vars: &[String], search_hours: Option<&[u32]>) -> bool {
        self.repositories
            .iter()
            .any(|r| r.is_gap(instant, data_vars, search_hours))
    }

    pub fn repository_by_data_var(&self, data_var: &str) -> Result<&Arc<dyn RepositoryLayer>> {
        self.repositories
            .iter()
            .find(|r| r.metadata().has_data_var(data_var))
            .ok_or_else(|| anyhow!("Data variable does not exist in any repository: {}", data_var))
    }

    pub fn metadata_by_data_var(&self, data_var: &str) -> Result<&RepositoryMetadata> {
        Ok(self.repository_by_data_var(data_var)?.metadata())
    }

    pub fn low_resolution_parameters(&self, data_var: &str) -> Result<BTreeMap<String, usize>> {
        self.repository_by_data_var(data_var)?
            .low_resolution_parameters()
    }
}
