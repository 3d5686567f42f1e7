//! Worker Controller Tests
//!
//! ## Test Scopes
//! - **Parameters**: option conversion, file grouping, analogue rendering.
//! - **Reduction**: spatial and time coarsening of received files.
//! - **Brute force**: a full call over loopback sockets, input cleanup.
//! - **Ndrank**: both first-phase variants against the in-memory broker and a live aggregator.

#[cfg(test)]
mod tests {
    use crate::aggregator::{AggregationService, AggregatorConsumer};
    use crate::array::time::{format_key, hour_of};
    use crate::array::{ArrayStore, BincodeStore};
    use crate::config::RepositoryConfig;
    use crate::controller::parameters::{
        analogues_from_results, list_of_files_factory, request_parameters_factory,
        separate_files_by_data_vars,
    };
    use crate::controller::reduction::{REDUCED_PREFIX, reduce_resolution_single_data_var};
    use crate::controller::{BruteForceController, ControllerState, NdrankController, StateTrace};
    use crate::fixtures::{hourly_file, instant, metadata_block, write_month_partition};
    use crate::queue::{InMemoryBroker, NEW_CANDIDATES_TOPIC, NEW_REQUESTS_TOPIC, QueueClient};
    use crate::registry::ComponentRegistry;
    use crate::repository::metadata::{Manifest, SETTINGS_FILE};
    use crate::rpc::{
        Analogue, FileEntry, InputFileGroup, RpcServer, SearchCall, SearchOptions, SearchRequest,
        SearchResponse, SelectionParameter,
    };
    use crate::service::{ResultContainer, SearchResults};
    use crate::transfer::{FileProtocol, FilePortMapping, InputFileProperties, upload_file};

    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn hour_plus_cell(_var: &str, instant: i64, cell: usize) -> f64 {
        hour_of(instant) as f64 + cell as f64
    }

    // ============================================================
    // TEST 1: Parameters
    // ============================================================

    #[test]
    fn test_empty_options_are_unset() {
        let params = request_parameters_factory(&SearchOptions::default()).unwrap();

        assert!(params.search_data_var.is_none());
        assert!(params.dataset_selection_parameters.is_none());
        assert!(params.ts_neighbour_gap.is_none());
        assert!(params.search_hours.is_none());
        assert!(params.input_step_difference.is_none());
        assert!(params.selection_data_vars.is_none());
    }

    #[test]
    fn test_options_are_converted() {
        // ARRANGE
        let options = SearchOptions {
            used_data_var: vec!["z".into(), "t".into()],
            dataset_selection_params: vec![SelectionParameter {
                name: "latitude".into(),
                min: 30.0,
                max: 40.0,
            }],
            ts_neighbour_gap: 3,
            search_hours: vec![0, 23],
            input_step_difference: vec![0, 6],
            selection_data_vars: vec!["z".into()],
        };

        // ACT
        let params = request_parameters_factory(&options).unwrap();

        // ASSERT
        assert_eq!(params.search_vars().unwrap(), ["z", "t"]);
        assert_eq!(params.dataset_selection_parameters.unwrap()[0].max, 40.0);
        assert_eq!(params.ts_neighbour_gap, Some(3));
        assert_eq!(params.search_hours, Some(vec![0, 23]));
        assert_eq!(params.input_step_difference, Some(vec![0, 6]));
        assert_eq!(params.selection_data_vars, Some(vec!["z".to_string()]));
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let bad_hour = SearchOptions {
            search_hours: vec![24],
            ..Default::default()
        };
        let negative_step = SearchOptions {
            input_step_difference: vec![1, -1],
            ..Default::default()
        };
        let inverted_box = SearchOptions {
            dataset_selection_params: vec![SelectionParameter {
                name: "latitude".into(),
                min: 50.0,
                max: 40.0,
            }],
            ..Default::default()
        };

        assert!(request_parameters_factory(&bad_hour).is_err());
        assert!(request_parameters_factory(&negative_step).is_err());
        assert!(request_parameters_factory(&inverted_box).is_err());
    }

    #[test]
    fn test_files_are_flattened_and_grouped() {
        // ARRANGE
        let groups = vec![
            InputFileGroup {
                data_variable: "z".into(),
                files: vec![
                    FileEntry { file_name: "in/z1.nc".into(), size: 10 },
                    FileEntry { file_name: "in/z2.nc".into(), size: 20 },
                ],
            },
            InputFileGroup {
                data_variable: "t".into(),
                files: vec![FileEntry { file_name: "in/t1.nc".into(), size: 30 }],
            },
        ];

        // ACT
        let files = list_of_files_factory(&groups);
        let received: Vec<(PathBuf, InputFileProperties)> = files
            .iter()
            .map(|f| (PathBuf::from(format!("/tmp/temp_{}", f.base_name())), f.clone()))
            .collect();
        let separated = separate_files_by_data_vars(&received);

        // ASSERT
        assert_eq!(files.len(), 3);
        assert_eq!(files[2], InputFileProperties::new("in/t1.nc", 30, "t"));
        assert_eq!(
            separated["z"],
            vec![PathBuf::from("/tmp/temp_z1.nc"), PathBuf::from("/tmp/temp_z2.nc")]
        );
        assert_eq!(separated["t"], vec![PathBuf::from("/tmp/temp_t1.nc")]);
    }

    #[test]
    fn test_analogues_carry_raw_sums() {
        let results: SearchResults = BTreeMap::from([(
            instant(1980, 1, 1, 0),
            ResultContainer {
                value: 3.0,
                sum_counter: 4,
            },
        )]);

        let analogues = analogues_from_results(&results);

        assert_eq!(
            analogues,
            vec![Analogue {
                timestamp: format_key(instant(1980, 1, 1, 0)),
                similarity_value: 3.0,
                time_instances: 4,
            }]
        );
    }

    // ============================================================
    // TEST 2: Reduction
    // ============================================================

    #[test]
    fn test_spatial_reduction_averages_cells() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("query.nc");
        BincodeStore
            .write(&source, &hourly_file(&["z"], instant(1980, 1, 1, 0), 2, &hour_plus_cell))
            .unwrap();
        let factors = BTreeMap::from([("latitude".to_string(), 2)]);

        // ACT
        let reduced =
            reduce_resolution_single_data_var(&BincodeStore, &[source], &factors, dir.path())
                .unwrap();

        // ASSERT: cells (0, 2) and (1, 3) are merged
        assert_eq!(reduced, vec![dir.path().join(format!("{}query.nc", REDUCED_PREFIX))]);
        let file = BincodeStore.open(&reduced[0]).unwrap();
        let grid = file.variable("z").unwrap();
        assert_eq!(grid.shape(), &[2, 1, 2]);
        assert_eq!(grid.values().collect::<Vec<_>>(), vec![1.0, 2.0, 2.0, 3.0]);
        assert_eq!(file.coordinate("latitude").unwrap(), &[35.0]);
    }

    #[test]
    fn test_time_reduction_merges_consecutive_files() {
        // ARRANGE: three single-step files, written out of order
        let dir = tempfile::tempdir().unwrap();
        let mut sources = Vec::new();
        for hour in [2u32, 0, 1] {
            let path = dir.path().join(format!("h{}.nc", hour));
            BincodeStore
                .write(&path, &hourly_file(&["z"], instant(1980, 1, 1, hour), 1, &hour_plus_cell))
                .unwrap();
            sources.push(path);
        }
        let factors = BTreeMap::from([("step".to_string(), 2)]);

        // ACT
        let reduced =
            reduce_resolution_single_data_var(&BincodeStore, &sources, &factors, dir.path())
                .unwrap();

        // ASSERT: hours 0 and 1 form one block, hour 2 is left over
        assert_eq!(reduced, vec![dir.path().join(format!("{}h0.nc", REDUCED_PREFIX))]);
        let file = BincodeStore.open(&reduced[0]).unwrap();
        assert_eq!(file.timestamps(), vec![instant(1980, 1, 1, 0)]);
        assert_eq!(
            file.variable("z").unwrap().values().collect::<Vec<_>>(),
            vec![0.5, 1.5, 2.5, 3.5]
        );
    }

    // ============================================================
    // Worker fixture
    // ============================================================

    /// A three month partition, a two-hour query starting 1980-02-01 05:00 and a
    /// file protocol on its own loopback port range.
    struct Worker {
        dir: tempfile::TempDir,
        registry: Arc<ComponentRegistry>,
        repository: RepositoryConfig,
        file_protocol: Arc<FileProtocol>,
        query: PathBuf,
    }

    impl Worker {
        fn new(from_port: u16) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let partition = dir.path().join("partition");
            let temporary = dir.path().join("temporary");
            std::fs::create_dir(&partition).unwrap();
            std::fs::create_dir(&temporary).unwrap();
            write_month_partition(
                &partition,
                metadata_block(&["z"]),
                &[(1980, 1), (1980, 2), (1980, 3)],
                24,
                &hour_plus_cell,
            );
            let query = dir.path().join("query.nc");
            BincodeStore
                .write(&query, &hourly_file(&["z"], instant(1980, 2, 1, 5), 2, &hour_plus_cell))
                .unwrap();

            Self {
                registry: ComponentRegistry::with_defaults(Arc::new(BincodeStore), None),
                repository: RepositoryConfig {
                    kind: "month-year-repository".to_string(),
                    paths: vec![partition],
                },
                file_protocol: FileProtocol::new("127.0.0.1", from_port, from_port + 4, &temporary)
                    .unwrap(),
                query,
                dir,
            }
        }

        fn temporary(&self) -> PathBuf {
            self.dir.path().join("temporary")
        }

        fn request(&self, id: &str, options: SearchOptions) -> SearchRequest {
            SearchRequest {
                request_id: id.to_string(),
                input_files: vec![InputFileGroup {
                    data_variable: "z".into(),
                    files: vec![FileEntry {
                        file_name: self.query.to_string_lossy().into_owned(),
                        size: std::fs::metadata(&self.query).unwrap().len(),
                    }],
                }],
                number_of_results: 3,
                correlation_function: "rmsd".to_string(),
                options,
            }
        }
    }

    async fn upload_all(mappings: &[FilePortMapping]) {
        for mapping in mappings {
            upload_file("127.0.0.1", mapping.port, Path::new(&mapping.file))
                .await
                .unwrap();
        }
    }

    /// Plays the master: uploads on the mapping message and returns the analogues.
    async fn drive(mut responses: mpsc::Receiver<SearchResponse>) -> (Vec<Analogue>, bool) {
        let Some(SearchResponse::Mappings(mappings)) = responses.recv().await else {
            panic!("expected the port mapping first");
        };
        upload_all(&mappings).await;
        match responses.recv().await {
            Some(SearchResponse::Analogues {
                analogues,
                reverse_sort_order_corr_function,
            }) => (analogues, reverse_sort_order_corr_function),
            other => panic!("expected the analogues, got {:?}", other),
        }
    }

    fn hour_five(analogues: &[Analogue]) -> Vec<&Analogue> {
        let keys = [
            format_key(instant(1980, 1, 1, 5)),
            format_key(instant(1980, 2, 1, 5)),
            format_key(instant(1980, 3, 1, 5)),
        ];
        analogues.iter().filter(|a| keys.contains(&a.timestamp)).collect()
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    /// Input files are removed right after the analogues are sent.
    async fn wait_until_empty(dir: &Path) -> usize {
        for _ in 0..50 {
            if entries(dir) == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        entries(dir)
    }

    // ============================================================
    // TEST 3: Brute force
    // ============================================================

    #[tokio::test]
    async fn test_brute_force_call_over_loopback() {
        // ARRANGE
        let worker = Worker::new(47240);
        let service = worker.registry.service("top-n", &worker.repository).unwrap();
        let controller =
            BruteForceController::new(worker.file_protocol.clone(), service, worker.registry.clone(), true);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let server = RpcServer::new(controller, 2);
        tokio::spawn(async move { server.serve(listener).await });

        // ACT
        let mut call = SearchCall::start(&address, &worker.request("bf", SearchOptions::default()))
            .await
            .unwrap();
        let mappings = call.mappings().await.unwrap();
        upload_all(&mappings).await;
        let (analogues, reverse) = call.analogues().await.unwrap();

        // ASSERT: the three perfect matches are complete raw sums of two contributions
        assert!(!reverse);
        let perfect = hour_five(&analogues);
        assert_eq!(perfect.len(), 3);
        assert!(perfect.iter().all(|a| a.similarity_value == 0.0 && a.time_instances == 2));
        assert_eq!(wait_until_empty(&worker.temporary()).await, 0);
        assert_eq!(worker.file_protocol.free_ports().await, 4);
    }

    #[tokio::test]
    async fn test_brute_force_keeps_inputs_when_asked() {
        let worker = Worker::new(47250);
        let service = worker.registry.service("brute-force", &worker.repository).unwrap();
        let controller =
            BruteForceController::new(worker.file_protocol.clone(), service, worker.registry.clone(), false);
        let (tx, rx) = mpsc::channel(4);

        let mut trace = StateTrace::new("keep");
        let (outcome, _) = tokio::join!(
            controller.run(worker.request("keep", SearchOptions::default()), &tx, &mut trace),
            drive(rx)
        );

        outcome.unwrap();
        assert_eq!(entries(&worker.temporary()), 1);
        assert!(!trace.states().contains(&ControllerState::Cleanup));
    }

    #[tokio::test]
    async fn test_unknown_correlation_fails_before_mapping() {
        let worker = Worker::new(47260);
        let service = worker.registry.service("brute-force", &worker.repository).unwrap();
        let controller =
            BruteForceController::new(worker.file_protocol.clone(), service, worker.registry.clone(), true);
        let (tx, mut rx) = mpsc::channel(4);
        let mut request = worker.request("bad", SearchOptions::default());
        request.correlation_function = "cosine".to_string();

        let mut trace = StateTrace::new("bad");
        let err = controller.run(request, &tx, &mut trace).await.unwrap_err();
        drop(tx);

        assert!(err.to_string().contains("Unknown correlation function"));
        assert!(rx.recv().await.is_none());
        assert_eq!(worker.file_protocol.free_ports().await, 4);
    }

    #[tokio::test]
    async fn test_failed_search_removes_inputs() {
        // ARRANGE: searching a variable the partition does not hold
        let worker = Worker::new(47270);
        let service = worker.registry.service("brute-force", &worker.repository).unwrap();
        let controller =
            BruteForceController::new(worker.file_protocol.clone(), service, worker.registry.clone(), false);
        let (tx, rx) = mpsc::channel(4);
        let options = SearchOptions {
            used_data_var: vec!["t".into()],
            ..Default::default()
        };
        let master = tokio::spawn(async move {
            let mut rx = rx;
            if let Some(SearchResponse::Mappings(mappings)) = rx.recv().await {
                upload_all(&mappings).await;
            }
        });

        // ACT
        let mut trace = StateTrace::new("fail");
        let result = controller
            .run(worker.request("fail", options), &tx, &mut trace)
            .await;
        master.await.unwrap();

        // ASSERT
        assert!(result.is_err());
        assert_eq!(trace.current(), Some(ControllerState::ErrorCleanup));
        assert_eq!(entries(&worker.temporary()), 0);
    }

    // ============================================================
    // TEST 4: Ndrank
    // ============================================================

    fn start_aggregator(broker: Arc<InMemoryBroker>) -> Arc<AggregatorConsumer> {
        let service = AggregationService::new(&["node-1".to_string()]);
        let consumer = AggregatorConsumer::new(service, broker, "aggregator");
        let running = consumer.clone();
        tokio::spawn(async move { running.start().await });
        consumer
    }

    #[tokio::test]
    async fn test_ndrank_without_low_resolution_searches_full_resolution_first() {
        // ARRANGE
        let worker = Worker::new(47280);
        let broker = InMemoryBroker::new();
        let aggregator = start_aggregator(broker.clone());
        let queue = Arc::new(
            QueueClient::new(broker.clone(), "node-1").with_timeout(Duration::from_secs(30)),
        );
        let full = worker.registry.service("top-n", &worker.repository).unwrap();
        let controller = NdrankController::new(
            worker.file_protocol.clone(),
            full,
            None,
            queue,
            worker.registry.clone(),
            &worker.temporary(),
            true,
        );
        let options = SearchOptions {
            ts_neighbour_gap: 1,
            ..Default::default()
        };
        let (tx, rx) = mpsc::channel(4);

        // ACT
        let mut trace = StateTrace::new("nd");
        let (outcome, (analogues, _)) = tokio::join!(
            controller.run(worker.request("nd", options), &tx, &mut trace),
            drive(rx)
        );
        aggregator.stop();

        // ASSERT
        outcome.unwrap();
        assert_eq!(
            trace.states(),
            [
                ControllerState::MappingPorts,
                ControllerState::TransferringFiles,
                ControllerState::LowResSearch,
                ControllerState::PublishPartial,
                ControllerState::AwaitAggregate,
                ControllerState::FullResRefineOrCandidates,
                ControllerState::Respond,
                ControllerState::Cleanup,
            ]
        );
        assert_eq!(broker.topic_len(NEW_REQUESTS_TOPIC), 1);
        assert_eq!(hour_five(&analogues).len(), 3);
        assert!(analogues.iter().all(|a| a.similarity_value == 0.0 && a.time_instances == 2));
    }

    #[tokio::test]
    async fn test_ndrank_candidates_are_screened_once() {
        // ARRANGE
        let worker = Worker::new(47290);
        let broker = InMemoryBroker::new();
        let aggregator = start_aggregator(broker.clone());
        let queue = Arc::new(
            QueueClient::new(broker.clone(), "node-1").with_timeout(Duration::from_secs(30)),
        );
        let full = worker.registry.service("candidates", &worker.repository).unwrap();
        let controller = NdrankController::new(
            worker.file_protocol.clone(),
            full,
            None,
            queue,
            worker.registry.clone(),
            &worker.temporary(),
            true,
        );
        let options = SearchOptions {
            ts_neighbour_gap: 1,
            dataset_selection_params: vec![SelectionParameter {
                name: "latitude".into(),
                min: 35.0,
                max: 45.0,
            }],
            ..Default::default()
        };
        let (tx, rx) = mpsc::channel(4);

        // ACT
        let mut trace = StateTrace::new("cand");
        let (outcome, (analogues, _)) = tokio::join!(
            controller.run(worker.request("cand", options), &tx, &mut trace),
            drive(rx)
        );
        aggregator.stop();

        // ASSERT
        outcome.unwrap();
        assert_eq!(broker.topic_len(NEW_CANDIDATES_TOPIC), 1);
        assert_eq!(broker.topic_len(NEW_REQUESTS_TOPIC), 0);
        assert!(trace.states().contains(&ControllerState::AwaitFinalAggregate));
        assert!(!trace.states().contains(&ControllerState::AwaitAggregate));
        let exact = analogues
            .iter()
            .find(|a| a.timestamp == format_key(instant(1980, 2, 1, 5)))
            .unwrap();
        assert_eq!((exact.similarity_value, exact.time_instances), (0.0, 2));
    }

    #[tokio::test]
    async fn test_ndrank_with_low_resolution_reduces_inputs() {
        // ARRANGE: the low-resolution partition is the full one coarsened by latitude
        let worker = Worker::new(47300);
        let low_partition = worker.dir.path().join("low");
        std::fs::create_dir(&low_partition).unwrap();
        let mut metadata = metadata_block(&["z"]);
        metadata.resolution_reduction_parameters =
            Some(BTreeMap::from([("latitude".to_string(), 2)]));
        let mut settings = Vec::new();
        for month in 1..=3 {
            let name = format!("ERA5-{}-1980.nc", month);
            let file = hourly_file(&["z"], instant(1980, month, 1, 0), 24, &hour_plus_cell)
                .coarsen_spatial("latitude", 2)
                .unwrap();
            BincodeStore.write(&low_partition.join(&name), &file).unwrap();
            settings.push(name);
        }
        std::fs::write(
            low_partition.join(SETTINGS_FILE),
            serde_json::to_string(&Manifest { settings, metadata }).unwrap(),
        )
        .unwrap();
        let low_repository = RepositoryConfig {
            kind: "month-year-repository".to_string(),
            paths: vec![low_partition],
        };

        let broker = InMemoryBroker::new();
        let aggregator = start_aggregator(broker.clone());
        let queue = Arc::new(
            QueueClient::new(broker.clone(), "node-1").with_timeout(Duration::from_secs(30)),
        );
        let controller = NdrankController::new(
            worker.file_protocol.clone(),
            worker.registry.service("top-n", &worker.repository).unwrap(),
            Some(worker.registry.service("top-n", &low_repository).unwrap()),
            queue,
            worker.registry.clone(),
            &worker.temporary(),
            true,
        );
        let options = SearchOptions {
            ts_neighbour_gap: 1,
            ..Default::default()
        };
        let (tx, rx) = mpsc::channel(4);

        // ACT
        let mut trace = StateTrace::new("low");
        let (outcome, (analogues, _)) = tokio::join!(
            controller.run(worker.request("low", options), &tx, &mut trace),
            drive(rx)
        );
        aggregator.stop();

        // ASSERT: the reduced copy was written and removed with the input
        outcome.unwrap();
        assert_eq!(trace.states()[2], ControllerState::ReducingResolution);
        assert_eq!(trace.states()[3], ControllerState::LowResSearch);
        assert_eq!(entries(&worker.temporary()), 0);
        assert!(!hour_five(&analogues).is_empty());
    }
}
