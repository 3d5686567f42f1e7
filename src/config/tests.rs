//! Configuration Tests
//!
//! ## Test Scopes
//! - **Worker**: key names, defaults and cross-property checks.
//! - **Aggregator / Master**: node lists and dataset interval.
//! - **Requests**: per-request validation.

#[cfg(test)]
mod tests {
    use crate::config::{
        AggregatorProperties, ConfigError, ControllerKind, MasterProperties, RequestsFile,
        WorkerProperties,
    };
    use crate::fixtures::instant;

    use serde_json::json;
    use std::path::{Path, PathBuf};

    fn write(dir: &Path, name: &str, value: serde_json::Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
        path
    }

    fn worker_json() -> serde_json::Value {
        json!({
            "node-id": "node-1",
            "network-config": {
                "ip": "127.0.0.1",
                "port": 50051,
                "kafka-ip": "127.0.0.1",
                "kafka-port": 9092,
                "available_ports": { "from": 60000, "to": 60100 }
            },
            "temporary-folder": "/tmp/worker",
            "controller": "ndrank",
            "service": "top-n",
            "low-resolution-service": "top-n",
            "repository": { "type": "month-year-repository", "paths": ["/data/full"] },
            "low-resolution-repository": { "type": "month-year-repository", "paths": ["/data/low"] },
            "debug-ts-log": true,
            "correlation-functions": {
                "average-path": "/data/avg",
                "standard-deviation-path": "/data/std"
            }
        })
    }

    fn invalid_property(err: ConfigError) -> String {
        match err {
            ConfigError::Invalid { property, .. } => property,
            other => panic!("expected an invalid property, got {:?}", other),
        }
    }

    // ============================================================
    // TEST 1: Worker
    // ============================================================

    #[test]
    fn test_worker_properties_load() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "worker.json", worker_json());

        // ACT
        let properties = WorkerProperties::load(&path).unwrap();

        // ASSERT
        assert_eq!(properties.node_id, "node-1");
        assert_eq!(properties.controller, ControllerKind::Ndrank);
        assert_eq!(properties.network_config.available_ports.to, 60100);
        assert_eq!(properties.network_config.rpc_address(), "127.0.0.1:50051");
        assert_eq!(
            properties.broker_address().unwrap(),
            ("127.0.0.1".to_string(), 9092)
        );
        assert!(properties.debug_ts_log);
        assert_eq!(
            properties.correlation_functions.unwrap().average_path,
            PathBuf::from("/data/avg")
        );
    }

    #[test]
    fn test_worker_optional_blocks_default() {
        let mut value = worker_json();
        let object = value.as_object_mut().unwrap();
        object.remove("low-resolution-service");
        object.remove("low-resolution-repository");
        object.remove("debug-ts-log");
        object.remove("correlation-functions");
        object.insert("controller".into(), json!("brute-force"));

        let properties: WorkerProperties = serde_json::from_value(value).unwrap();

        assert!(properties.validate().is_ok());
        assert_eq!(properties.controller, ControllerKind::BruteForce);
        assert!(properties.low_resolution_service.is_none());
        assert!(!properties.debug_ts_log);
    }

    #[test]
    fn test_worker_invalid_port_range() {
        let mut value = worker_json();
        value["network-config"]["available_ports"] = json!({ "from": 60100, "to": 60100 });

        let properties: WorkerProperties = serde_json::from_value(value).unwrap();

        assert_eq!(invalid_property(properties.validate().unwrap_err()), "available_ports");
    }

    #[test]
    fn test_worker_ndrank_requires_broker() {
        let mut value = worker_json();
        value["network-config"]
            .as_object_mut()
            .unwrap()
            .remove("kafka-port");

        let properties: WorkerProperties = serde_json::from_value(value).unwrap();

        assert_eq!(invalid_property(properties.validate().unwrap_err()), "network-config");
    }

    #[test]
    fn test_worker_low_resolution_pairs() {
        let mut value = worker_json();
        value
            .as_object_mut()
            .unwrap()
            .remove("low-resolution-repository");
        let properties: WorkerProperties = serde_json::from_value(value).unwrap();

        assert_eq!(
            invalid_property(properties.validate().unwrap_err()),
            "low-resolution-repository"
        );
    }

    #[test]
    fn test_worker_unknown_repository_type() {
        let mut value = worker_json();
        value["repository"]["type"] = json!("weekly-repository");
        let properties: WorkerProperties = serde_json::from_value(value).unwrap();

        assert_eq!(invalid_property(properties.validate().unwrap_err()), "repository");
    }

    #[test]
    fn test_missing_file_and_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ \"node-id\": ").unwrap();

        let missing = WorkerProperties::load(&dir.path().join("absent.json")).unwrap_err();
        let parse = WorkerProperties::load(&broken).unwrap_err();

        assert!(matches!(missing, ConfigError::Io { .. }));
        assert!(matches!(parse, ConfigError::Parse { .. }));
    }

    // ============================================================
    // TEST 2: Aggregator / Master
    // ============================================================

    #[test]
    fn test_aggregator_rejects_duplicate_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let ok = write(
            dir.path(),
            "ok.json",
            json!({
                "node-ids": ["a", "b"],
                "kafka-ip": "127.0.0.1",
                "kafka-port": 9092,
                "group-id": "aggregators",
                "client-id": "agg-1"
            }),
        );
        let duplicated = write(
            dir.path(),
            "dup.json",
            json!({
                "node-ids": ["a", "a"],
                "kafka-ip": "127.0.0.1",
                "kafka-port": 9092,
                "group-id": "aggregators"
            }),
        );

        let properties = AggregatorProperties::load(&ok).unwrap();
        let err = AggregatorProperties::load(&duplicated).unwrap_err();

        assert_eq!(properties.node_ids, vec!["a", "b"]);
        assert_eq!(properties.client_id.as_deref(), Some("agg-1"));
        assert_eq!(invalid_property(err), "node-ids");
    }

    fn master_json(start_year: i32) -> serde_json::Value {
        json!({
            "results-path": "/tmp/results",
            "node-properties": [{ "ip": "10.0.0.1", "port": 50051 }],
            "dataset_start_date": { "year": start_year, "month": 1, "day": 1, "hour": 0 },
            "dataset_end_date": { "year": 2000, "month": 12, "day": 31, "hour": 23 }
        })
    }

    #[test]
    fn test_master_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "master.json", master_json(1980));

        let properties = MasterProperties::load(&path).unwrap();

        assert_eq!(properties.node_properties[0].address(), "10.0.0.1:50051");
        assert_eq!(
            properties.dataset_interval().unwrap(),
            (instant(1980, 1, 1, 0), instant(2000, 12, 31, 23))
        );
    }

    #[test]
    fn test_master_rejects_inverted_interval() {
        let properties: MasterProperties = serde_json::from_value(master_json(2010)).unwrap();

        assert_eq!(
            invalid_property(properties.validate().unwrap_err()),
            "dataset_start_date"
        );
    }

    // ============================================================
    // TEST 3: Requests
    // ============================================================

    fn request_json() -> serde_json::Value {
        json!({
            "request-name": "storm",
            "number-of-results": 10,
            "input-path": { "z": ["/in/z-1.nc", "/in/z-2.nc"] },
            "time-instances": 2,
            "options": {
                "correlation-function": "rmsd",
                "data-vars": ["z"],
                "partial-dataset-parameters": { "latitude": { "min": 30.0, "max": 40.0 } },
                "search-hours": [0, 12]
            }
        })
    }

    #[test]
    fn test_requests_file_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "requests.json", json!({ "requests": [request_json()] }));

        let requests = RequestsFile::load(&path).unwrap();

        let request = &requests.requests[0];
        assert_eq!(request.number_of_results, Some(10));
        assert_eq!(request.input_path["z"].len(), 2);
        assert_eq!(request.options.partial_dataset_parameters["latitude"].max, 40.0);
        assert!(request.options.ts_neighbour_gap.is_none());
        assert!(request.options.data_var_selection.is_empty());
    }

    #[test]
    fn test_request_validation() {
        let mut zero_results = request_json();
        zero_results["number-of-results"] = json!(0);
        let mut missing_input = request_json();
        missing_input["options"]["data-vars"] = json!(["z", "t"]);
        let mut bad_hour = request_json();
        bad_hour["options"]["search-hours"] = json!([24]);

        let errors: Vec<String> = [zero_results, missing_input, bad_hour]
            .into_iter()
            .map(|v| {
                let request: crate::config::RequestDefinition = serde_json::from_value(v).unwrap();
                invalid_property(request.validate().unwrap_err())
            })
            .collect();

        assert_eq!(
            errors,
            vec![
                "storm.number-of-results",
                "storm.input-path",
                "storm.search-hours"
            ]
        );
    }
}
