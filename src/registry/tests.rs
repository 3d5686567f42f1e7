//! Registry Tests
//!
//! ## Test Scopes
//! - **Correlations**: built-in names, shared instances, missing configuration.
//! - **Services**: service tags over an on-disk partition.

#[cfg(test)]
mod tests {
    use crate::array::BincodeStore;
    use crate::config::RepositoryConfig;
    use crate::correlation::{CorrelationFunction, Rmsd};
    use crate::fixtures::{metadata_block, write_month_partition};
    use crate::registry::ComponentRegistry;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> Arc<ComponentRegistry> {
        ComponentRegistry::with_defaults(Arc::new(BincodeStore), None)
    }

    fn cell_value(_var: &str, _instant: i64, cell: usize) -> f64 {
        cell as f64
    }

    fn partition(dir: &std::path::Path) -> RepositoryConfig {
        let folder = dir.join("partition");
        std::fs::create_dir(&folder).unwrap();
        write_month_partition(&folder, metadata_block(&["z"]), &[(1980, 1)], 24, &cell_value);
        RepositoryConfig {
            kind: "month-year-repository".to_string(),
            paths: vec![folder],
        }
    }

    // ============================================================
    // TEST 1: Correlations
    // ============================================================

    #[test]
    fn test_defaults_are_registered() {
        let registry = registry();

        assert_eq!(registry.list_correlations(), vec!["enhanced_pcc", "pcc", "rmsd"]);
        assert_eq!(registry.list_services(), vec!["brute-force", "candidates", "top-n"]);
    }

    #[test]
    fn test_correlation_instance_is_shared() {
        // ARRANGE
        let registry = registry();

        // ACT
        let first = registry.correlation("rmsd").unwrap();
        let second = registry.correlation("rmsd").unwrap();

        // ASSERT
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), "rmsd");
        assert!(!first.is_reverse_order());
        assert!(registry.correlation("pcc").unwrap().is_reverse_order());
    }

    #[test]
    fn test_unknown_and_unconfigured_correlations() {
        let registry = registry();

        let unknown = registry.correlation("cosine").err().unwrap();
        let enhanced = registry.correlation("enhanced_pcc").err().unwrap();

        assert!(unknown.to_string().contains("Unknown correlation function"));
        assert!(enhanced.to_string().contains("correlation-functions"));
    }

    #[test]
    fn test_factory_runs_once() {
        let registry = ComponentRegistry::new(Arc::new(BincodeStore));
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        registry.register_correlation("custom", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Rmsd) as Arc<dyn CorrelationFunction>)
        });

        for _ in 0..3 {
            registry.correlation("custom").unwrap();
        }

        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    // ============================================================
    // TEST 2: Services
    // ============================================================

    #[test]
    fn test_service_tags() {
        let dir = tempfile::tempdir().unwrap();
        let config = partition(dir.path());
        let registry = registry();

        let top_n = registry.service("top-n", &config).unwrap();
        let candidates = registry.service("candidates", &config).unwrap();

        assert_eq!(top_n.tag(), "top-n");
        assert!(!top_n.uses_global_candidates());
        assert!(candidates.uses_global_candidates());
        assert_eq!(top_n.repositories().repositories().len(), 1);
    }

    #[test]
    fn test_unknown_service_and_repository() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = partition(dir.path());
        let registry = registry();

        let unknown_service = registry.service("ndrank", &config).err().unwrap();
        config.kind = "weekly-repository".to_string();
        let unknown_kind = registry.service("top-n", &config).err().unwrap();

        assert!(unknown_service.to_string().contains("Unknown search service"));
        assert!(unknown_kind.to_string().contains("Unknown repository type"));
    }
}
