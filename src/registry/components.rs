//! Component Registry
//!
//! Maps the string tags of the property files and of incoming requests to the
//! concrete services, correlation functions and repositories. New variants are added
//! with `register_*` instead of touching the controllers.

use crate::array::ArrayStore;
use crate::config::{CorrelationPaths, RepositoryConfig};
use crate::correlation::enhanced_pcc::ENHANCED_PCC;
use crate::correlation::pcc::PCC;
use crate::correlation::rmsd::RMSD;
use crate::correlation::{CorrelationFunction, EnhancedPcc, Pcc, Rmsd};
use crate::repository::{Era5Repository, RepositoryCollection, RepositoryKind, RepositoryLayer};
use crate::service::{
    BRUTE_FORCE_SERVICE, BruteForceService, CANDIDATES_SERVICE, CandidateService, SearchService,
    TOP_N_SERVICE, TopNService,
};

use anyhow::{Result, anyhow, bail};
use dashmap::DashMap;
use std::sync::Arc;

/// Builds a correlation function. Called once per name, the instance is shared.
pub type CorrelationFactory =
    Arc<dyn Fn() -> Result<Arc<dyn CorrelationFunction>> + Send + Sync>;

/// Wraps the sequential base search into a service variant.
pub type ServiceFactory = Arc<dyn Fn(BruteForceService) -> Arc<dyn SearchService> + Send + Sync>;

pub struct ComponentRegistry {
    store: Arc<dyn ArrayStore>,
    correlations: DashMap<String, CorrelationFactory>,
    instances: DashMap<String, Arc<dyn CorrelationFunction>>,
    services: DashMap<String, ServiceFactory>,
}

impl ComponentRegistry {
    /// Creates an empty registry whose components read files through `store`.
    pub fn new(store: Arc<dyn ArrayStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            correlations: DashMap::new(),
            instances: DashMap::new(),
            services: DashMap::new(),
        })
    }

    /// Registry with every built-in service and correlation function.
    ///
    /// `enhanced_pcc` can only be built when `correlation_paths` is given.
    pub fn with_defaults(
        store: Arc<dyn ArrayStore>,
        correlation_paths: Option<CorrelationPaths>,
    ) -> Arc<Self> {
        let registry = Self::new(store.clone());

        registry.register_service(BRUTE_FORCE_SERVICE, |base| {
            Arc::new(base) as Arc<dyn SearchService>
        });
        registry.register_service(TOP_N_SERVICE, |base| {
            Arc::new(TopNService::new(base)) as Arc<dyn SearchService>
        });
        registry.register_service(CANDIDATES_SERVICE, |base| {
            Arc::new(CandidateService::new(base)) as Arc<dyn SearchService>
        });

        registry.register_correlation(PCC, || Ok(Arc::new(Pcc) as Arc<dyn CorrelationFunction>));
        registry.register_correlation(RMSD, || Ok(Arc::new(Rmsd) as Arc<dyn CorrelationFunction>));
        registry.register_correlation(ENHANCED_PCC, move || match &correlation_paths {
            Some(paths) => {
                let function = EnhancedPcc::new(
                    &paths.average_path,
                    &paths.standard_deviation_path,
                    store.clone(),
                )?;
                Ok(Arc::new(function) as Arc<dyn CorrelationFunction>)
            }
            None => bail!("{} requires the correlation-functions properties block", ENHANCED_PCC),
        });

        registry
    }

    pub fn store(&self) -> Arc<dyn ArrayStore> {
        self.store.clone()
    }

    pub fn register_correlation<F>(&self, name: &str, factory: F)
    where
        F: Fn() -> Result<Arc<dyn CorrelationFunction>> + Send + Sync + 'static,
    {
        self.correlations.insert(name.to_string(), Arc::new(factory));
        self.instances.remove(name);
        tracing::info!("Registered correlation function: {}", name);
    }

    pub fn register_service<F>(&self, tag: &str, factory: F)
    where
        F: Fn(BruteForceService) -> Arc<dyn SearchService> + Send + Sync + 'static,
    {
        self.services.insert(tag.to_string(), Arc::new(factory));
        tracing::info!("Registered search service: {}", tag);
    }

    /// Returns the shared instance of `name`, building it on first use.
    pub fn correlation(&self, name: &str) -> Result<Arc<dyn CorrelationFunction>> {
        if let Some(instance) = self.instances.get(name) {
            return Ok(instance.value().clone());
        }
        let factory = self
            .correlations
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| anyhow!("Unknown correlation function: {}", name))?;

        let instance = factory()?;
        self.instances.insert(name.to_string(), instance.clone());
        Ok(instance)
    }

    /// Opens every folder of `config` as a repository of the configured kind.
    pub fn repositories(&self, config: &RepositoryConfig) -> Result<RepositoryCollection> {
        let kind = RepositoryKind::from_tag(&config.kind)?;
        let repositories = config
            .paths
            .iter()
            .map(|path| {
                Era5Repository::open(kind, path, self.store.clone())
                    .map(|repository| Arc::new(repository) as Arc<dyn RepositoryLayer>)
            })
            .collect::<Result<Vec<_>>>()?;
        RepositoryCollection::new(repositories)
    }

    /// Builds the service `tag` over `config`'s repositories.
    pub fn service(&self, tag: &str, config: &RepositoryConfig) -> Result<Arc<dyn SearchService>> {
        let factory = self
            .services
            .get(tag)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| anyhow!("Unknown search service: {}", tag))?;
        let base = BruteForceService::new(self.repositories(config)?, self.store.clone());
        Ok(factory(base))
    }

    pub fn list_correlations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.correlations.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn list_services(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.services.iter().map(|e| e.key().clone()).collect();
        tags.sort();
        tags
    }
}
