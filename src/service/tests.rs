//! Search Service Tests
//!
//! ## Test Scopes
//! - **Containers**: `CandidateContainer` finalisation and counter agreement.
//! - **CandidateListManager**: ordering and interval pruning under a "smaller is better" metric.
//! - **InputIterator**: gap filtering and step differences.
//! - **Services**: full scan, top-N filtering, neighbourhood refinement and candidate screening
//!   over a three month partition whose cells hold `hour + cell`.

#[cfg(test)]
mod tests {
    use crate::array::time::{NANOS_PER_HOUR, format_key, hour_of};
    use crate::array::{ArrayStore, BincodeStore, DatasetSelectionParameter};
    use crate::correlation::Rmsd;
    use crate::fixtures::{gap_block, hourly_file, instant, metadata_block, write_month_partition};
    use crate::repository::{
        Era5Repository, RepositoryCollection, RepositoryKind, RepositoryLayer, RepositoryMetadata,
    };
    use crate::service::top_n::filter_top_n;
    use crate::service::{
        BruteForceService, CandidateContainer, CandidateListManager, CandidateService,
        HeuristicResult, HeuristicValue, InputFiles, InputIterator, RequestParameters,
        ResultContainer, SearchResults, SearchService, TopNService,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;

    const MONTHS: [(i32, u32); 3] = [(1980, 1), (1980, 2), (1980, 3)];

    fn vars(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn hour_plus_cell(_var: &str, instant: i64, cell: usize) -> f64 {
        hour_of(instant) as f64 + cell as f64
    }

    fn day(d: u32) -> i64 {
        instant(2005, 2, d, 0)
    }

    /// Month partition plus a two-instant query (Feb 1st, 05:00 and 06:00).
    struct Fixture {
        _dir: tempfile::TempDir,
        service: BruteForceService,
        input: InputFiles,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let partition = dir.path().join("partition");
        std::fs::create_dir(&partition).unwrap();
        write_month_partition(&partition, metadata_block(&["z"]), &MONTHS, 24, &hour_plus_cell);

        let query = hourly_file(&["z"], instant(1980, 2, 1, 5), 2, &hour_plus_cell);
        let query_path = dir.path().join("query.bin");
        BincodeStore.write(&query_path, &query).unwrap();

        let store = Arc::new(BincodeStore);
        let repository: Arc<dyn RepositoryLayer> = Arc::new(
            Era5Repository::open(RepositoryKind::MonthYear, &partition, store.clone()).unwrap(),
        );
        let collection = RepositoryCollection::new(vec![repository]).unwrap();

        Fixture {
            _dir: dir,
            service: BruteForceService::new(collection, store),
            input: BTreeMap::from([("z".to_string(), vec![query_path])]),
        }
    }

    fn search_params() -> RequestParameters {
        RequestParameters {
            search_data_var: Some(vars(&["z"])),
            ..Default::default()
        }
    }

    fn complete(results: &SearchResults, size: usize) -> Vec<(i64, ResultContainer)> {
        results
            .iter()
            .filter(|(_, r)| r.sum_counter == size)
            .map(|(k, r)| (*k, *r))
            .collect()
    }

    // ============================================================
    // TEST 1: Containers
    // ============================================================

    #[test]
    fn test_candidate_container_set_as_final_once() {
        // ARRANGE
        let data_vars = vars(&["z", "t"]);
        let mut candidate = CandidateContainer::new(1.0, 3.0, &data_vars);
        candidate.add_value(3.0, 5.0, &data_vars);

        // ACT
        candidate.set_as_final().unwrap();

        // ASSERT
        assert_eq!(candidate.best_value(), 2.0);
        assert_eq!(candidate.worst_value(), 4.0);
        assert!(candidate.is_final());
        assert!(candidate.set_as_final().is_err());
    }

    #[test]
    fn test_candidate_container_counters_must_agree() {
        let mut candidate = CandidateContainer::new(1.0, 1.0, &vars(&["z", "t"]));
        candidate.add_value(1.0, 1.0, &vars(&["z"]));

        assert!(candidate.sum_counter().is_err());
        assert!(candidate.set_as_final().is_err());
        assert_eq!(candidate.counter_of("z"), 2);
        assert_eq!(candidate.counter_of("t"), 1);
    }

    #[test]
    fn test_heuristic_result_accessors() {
        let exact = HeuristicResult {
            ts: "1980-01-01T06:00:00".to_string(),
            value: HeuristicValue::Similarity(0.5),
        };
        let bounded = HeuristicResult {
            ts: "1980-01-01T06:00:00".to_string(),
            value: HeuristicValue::Interval { best: 0.1, worst: 0.9 },
        };

        assert_eq!(exact.value().unwrap(), 0.5);
        assert!(exact.interval().is_err());
        assert_eq!(bounded.interval().unwrap(), (0.1, 0.9));
        assert!(bounded.value().is_err());
    }

    // ============================================================
    // TEST 2: CandidateListManager
    // ============================================================

    fn fill(top_res: usize, input: &[(i64, f64, f64)]) -> Vec<i64> {
        let rmsd = Rmsd;
        let mut manager = CandidateListManager::new(&rmsd, top_res);
        for (instant, best, worst) in input {
            manager.add_value(*instant, CandidateContainer::new(*best, *worst, &vars(&["x"])));
        }
        manager.get_results().collect()
    }

    #[test]
    fn test_candidate_list_empty() {
        let rmsd = Rmsd;
        let manager = CandidateListManager::new(&rmsd, 5);

        assert!(manager.is_empty());
        assert_eq!(manager.get_results().count(), 0);
    }

    #[test]
    fn test_candidate_list_smaller_than_top_n() {
        let input = [
            (day(11), 1.0, 1.0),
            (day(10), 2.0, 4.0),
            (day(9), 1.0, 2.0),
            (day(8), 2.0, 3.0),
            (day(7), 6.0, 8.0),
            (day(6), 2.0, 10.0),
            (day(5), 3.0, 5.0),
            (day(4), 2.0, 32.0),
            (day(3), 4.0, 41.0),
        ];

        let results = fill(15, &input);

        assert_eq!(
            results,
            vec![day(11), day(9), day(8), day(10), day(5), day(7), day(6), day(4), day(3)]
        );
    }

    #[test]
    fn test_candidate_list_keeps_equal_candidates() {
        let input = vec![(day(11), 1.0, 1.0); 12];

        let results = fill(10, &input);

        assert_eq!(results.len(), 12);
        assert!(results.iter().all(|r| *r == day(11)));
    }

    #[test]
    fn test_candidate_list_prunes_unreachable_candidates() {
        // ARRANGE: (90, 400) can never reach the 10th worst value
        let input = [
            (day(11), 19.0, 40.0),
            (day(10), 12.0, 41.0),
            (day(9), 9.0, 56.0),
            (day(8), 12.0, 35.0),
            (day(7), 11.0, 46.0),
            (day(6), 4.0, 23.0),
            (day(5), 90.0, 400.0),
            (day(4), 23.0, 49.0),
            (day(3), 12.0, 14.0),
            (instant(2000, 4, 2, 0), 7.0, 29.0),
            (instant(2000, 2, 1, 0), 1.0, 4.0),
            (instant(2005, 4, 1, 0), 1.0, 3.0),
            (day(1), 2.0, 4.0),
            (instant(2005, 3, 1, 0), 2.0, 3.0),
            (instant(2006, 2, 1, 0), 6.0, 7.0),
            (instant(1980, 2, 1, 0), 1.0, 19.0),
            (instant(2001, 6, 1, 0), 18.0, 20.0),
            (instant(2003, 10, 1, 0), 5.0, 32.0),
            (instant(2002, 2, 4, 0), 14.0, 28.0),
        ];

        // ACT
        let results = fill(10, &input);

        // ASSERT
        assert_eq!(
            results,
            vec![
                instant(2005, 4, 1, 0),
                instant(2005, 3, 1, 0),
                instant(2000, 2, 1, 0),
                day(1),
                instant(2006, 2, 1, 0),
                day(3),
                instant(1980, 2, 1, 0),
                instant(2001, 6, 1, 0),
                day(6),
                instant(2002, 2, 4, 0),
                instant(2000, 4, 2, 0),
                instant(2003, 10, 1, 0),
                day(8),
                day(11),
                day(10),
                day(7),
                day(4),
                day(9),
            ]
        );
    }

    #[test]
    fn test_candidate_list_drops_far_away_candidates() {
        // ARRANGE: the first nine are overtaken by much better ones
        let far: Vec<(i64, f64, f64)> = (0..9)
            .map(|i| (instant(1990, 1, 1 + i as u32, 0), 100.0 + 10.0 * i as f64, 290.0 + 10.0 * i as f64))
            .collect();
        let near: Vec<(i64, f64, f64)> = (0..9)
            .map(|i| (instant(2000, 1, 1 + i as u32, 0), 1.0 + i as f64, 20.0 + i as f64))
            .rev()
            .collect();
        let input: Vec<_> = far.into_iter().chain(near).collect();

        // ACT
        let results = fill(9, &input);

        // ASSERT
        let expected: Vec<i64> = (0..9).map(|i| instant(2000, 1, 1 + i as u32, 0)).collect();
        assert_eq!(results, expected);
    }

    // ============================================================
    // TEST 3: InputIterator
    // ============================================================

    #[test]
    fn test_input_iterator_filters_gaps_and_assigns_intervals() {
        // ARRANGE: hour 6 is missing for z
        let mut block = metadata_block(&["z"]);
        block.time_gap = Some(gap_block(&[(6, "z")]));
        let metadata = RepositoryMetadata::from_block(&block).unwrap();
        let later = hourly_file(&["z"], instant(1980, 1, 1, 6), 3, &hour_plus_cell);
        let earlier = hourly_file(&["z"], instant(1980, 1, 1, 3), 1, &hour_plus_cell);

        // ACT
        let iterator = InputIterator::new(
            &[later, earlier],
            "z",
            &metadata,
            &vars(&["z"]),
            Some(vec![2, 0]),
        )
        .unwrap();

        // ASSERT
        let items: Vec<(i64, i64)> = iterator.iterate().map(|(s, i)| (s.instant, i)).collect();
        assert_eq!(
            items,
            vec![
                (instant(1980, 1, 1, 3), 0),
                (instant(1980, 1, 1, 7), 2),
                (instant(1980, 1, 1, 8), 0),
            ]
        );
        assert_eq!(iterator.size(), 3);
        assert_eq!(iterator.iterate_with_statistics().count(), 0);
    }

    // ============================================================
    // TEST 4: Brute force search
    // ============================================================

    #[test]
    fn test_brute_force_search_golden_values() {
        // ARRANGE
        let fixture = fixture();

        // ACT
        let (results, size) = fixture
            .service
            .execute_search(&fixture.input, &search_params(), &Rmsd, None)
            .unwrap();

        // ASSERT: every instant and the one before each file start is a key
        assert_eq!(size, 2);
        assert_eq!(results.len(), 3 * 25);
        assert_eq!(complete(&results, size).len(), 3 * 23);

        let exact = results[&instant(1980, 2, 1, 5)];
        assert_eq!(exact.value, 0.0);
        assert_eq!(exact.sum_counter, 2);
        let shifted = results[&instant(1980, 1, 1, 10)];
        assert_eq!(shifted.value, 10.0);
        assert_eq!(shifted.average(), 5.0);
        let before_start = results[&instant(1980, 2, 29, 23)];
        assert_eq!(before_start.sum_counter, 1);
    }

    #[test]
    fn test_brute_force_search_walks_keys_over_gaps() {
        // ARRANGE: only even hours are searched
        let fixture = fixture();
        let params = RequestParameters {
            search_hours: Some((0..24).step_by(2).collect()),
            ..search_params()
        };

        // ACT
        let (results, _) = fixture
            .service
            .execute_search(&fixture.input, &params, &Rmsd, None)
            .unwrap();

        // ASSERT: no key lands on an excluded hour
        assert!(!results.is_empty());
        assert!(results.keys().all(|k| hour_of(*k) % 2 == 0));
        let pair = results[&instant(1980, 1, 1, 4)];
        assert_eq!(pair.sum_counter, 2);
    }

    #[test]
    fn test_brute_force_search_requires_vars_and_inputs() {
        let fixture = fixture();

        assert!(fixture
            .service
            .execute_search(&fixture.input, &RequestParameters::default(), &Rmsd, None)
            .is_err());
        let params = RequestParameters {
            search_data_var: Some(vars(&["z"])),
            ..Default::default()
        };
        assert!(fixture
            .service
            .execute_search(&InputFiles::new(), &params, &Rmsd, None)
            .is_err());
        assert!(fixture
            .service
            .execute_search_for_candidates(&fixture.input, &params, &Rmsd, Some(1))
            .is_err());
    }

    // ============================================================
    // TEST 5: Top-N
    // ============================================================

    #[test]
    fn test_filter_top_n_keeps_partials() {
        // ARRANGE
        let results: SearchResults = BTreeMap::from([
            (1, ResultContainer { value: 8.0, sum_counter: 2 }),
            (2, ResultContainer { value: 2.0, sum_counter: 2 }),
            (3, ResultContainer { value: 6.0, sum_counter: 2 }),
            (4, ResultContainer { value: 1.0, sum_counter: 1 }),
            (5, ResultContainer { value: 0.0, sum_counter: 2 }),
        ]);

        // ACT
        let filtered = filter_top_n(results, 2, 2, &Rmsd);

        // ASSERT
        assert_eq!(filtered.keys().copied().collect::<Vec<_>>(), vec![2, 4, 5]);
    }

    #[test]
    fn test_top_n_service_search() {
        // ARRANGE
        let fixture = fixture();
        let service = TopNService::new(fixture.service);

        // ACT
        let (results, size) = service
            .execute_search(&fixture.input, &search_params(), &Rmsd, Some(3))
            .unwrap();

        // ASSERT: the three 05:00 keys plus six partials
        let best = complete(&results, size);
        assert_eq!(best.len(), 3);
        assert!(best.iter().all(|(k, r)| hour_of(*k) == 5 && r.value == 0.0));
        assert_eq!(results.len(), 9);
        assert!(service
            .execute_search(&fixture.input, &search_params(), &Rmsd, Some(0))
            .is_err());
    }

    // ============================================================
    // TEST 6: Neighbourhood refinement
    // ============================================================

    #[test]
    fn test_search_on_ts_neighbourhood() {
        // ARRANGE
        let fixture = fixture();
        let params = RequestParameters {
            ts_neighbour_gap: Some(2),
            ..search_params()
        };
        let heuristics = vec![
            HeuristicResult {
                ts: format_key(instant(1980, 2, 1, 5)),
                value: HeuristicValue::Similarity(0.0),
            },
            HeuristicResult {
                ts: format_key(instant(1980, 2, 1, 6)),
                value: HeuristicValue::Similarity(2.0),
            },
            HeuristicResult {
                ts: format_key(instant(1981, 1, 1, 5)),
                value: HeuristicValue::Similarity(0.0),
            },
        ];

        // ACT
        let (results, size) = fixture
            .service
            .execute_search_on_ts(&mut heuristics.into_iter(), &fixture.input, &params, &Rmsd, None)
            .unwrap();

        // ASSERT: 04..07 once each, nothing for the missing year
        assert_eq!(size, 2);
        let values: Vec<(i64, f64, usize)> = results
            .iter()
            .map(|(k, r)| (*k, r.value, r.sum_counter))
            .collect();
        assert_eq!(
            values,
            vec![
                (instant(1980, 2, 1, 4), 2.0, 2),
                (instant(1980, 2, 1, 5), 0.0, 2),
                (instant(1980, 2, 1, 6), 2.0, 2),
                (instant(1980, 2, 1, 7), 4.0, 2),
            ]
        );
    }

    #[test]
    fn test_search_on_ts_requires_neighbour_gap() {
        let fixture = fixture();

        let result = fixture.service.execute_search_on_ts(
            &mut std::iter::empty(),
            &fixture.input,
            &search_params(),
            &Rmsd,
            None,
        );

        assert!(result.is_err());
    }

    // ============================================================
    // TEST 7: Candidate screening
    // ============================================================

    #[test]
    fn test_candidate_service_screening() {
        // ARRANGE: only the northern row is visible
        let fixture = fixture();
        let service = CandidateService::new(fixture.service);
        let params = RequestParameters {
            dataset_selection_parameters: Some(vec![
                DatasetSelectionParameter::new("latitude", 35.0, 45.0).unwrap(),
            ]),
            ..search_params()
        };

        // ACT
        let (results, size) = service
            .execute_search_for_candidates(&fixture.input, &params, &Rmsd, Some(1))
            .unwrap();

        // ASSERT
        assert!(service.uses_global_candidates());
        assert_eq!(size, 2);
        let exact = &results[&instant(1980, 2, 1, 5)];
        assert!(exact.is_final());
        assert_eq!(exact.best_value(), 0.0);
        assert!((exact.worst_value() - 4.5f64.sqrt()).abs() < 1e-12);

        // Hours 2..=8 can still reach the best worst value; 6 partials remain.
        let finals: Vec<_> = results.iter().filter(|(_, c)| c.is_final()).collect();
        assert_eq!(finals.len(), 3 * 7);
        assert!(finals.iter().all(|(k, _)| (2..=8).contains(&hour_of(**k))));
        assert_eq!(results.len() - finals.len(), 6);
        assert_eq!(
            results[&(instant(1980, 1, 1, 0) - NANOS_PER_HOUR)].counter_of("z"),
            1
        );
    }

    #[test]
    fn test_candidate_screening_requires_selection() {
        let fixture = fixture();
        let service = CandidateService::new(fixture.service);

        assert!(service
            .execute_search_for_candidates(&fixture.input, &search_params(), &Rmsd, Some(1))
            .is_err());
    }
}
