//! Merging of per-worker analogues into the final ranking.

use super::types::{NodeOutcome, RankedAnalogue, SearchResult};
use crate::array::time::parse_key;

use anyhow::{Result, bail};
use std::collections::BTreeMap;

/// Expected shape of a complete result.
#[derive(Debug, Clone, Copy)]
pub struct MergeParameters {
    pub dataset_start: i64,
    pub dataset_end: i64,
    pub time_instances: usize,
    pub search_vars: usize,
    pub number_of_results: Option<usize>,
}

impl MergeParameters {
    fn expected_contributions(&self) -> usize {
        self.time_instances * self.search_vars
    }
}

/// Sums the raw similarities of every worker per timestamp and ranks the complete ones.
///
/// Timestamps outside the dataset interval are ignored. A timestamp is complete when its
/// counters add up to `time_instances * search_vars`; its similarity is the summed value
/// over the summed counter.
pub fn merge_results(outcomes: &[NodeOutcome], params: &MergeParameters) -> Result<SearchResult> {
    if params.search_vars == 0 {
        bail!("Search data vars should be defined");
    }

    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for outcome in outcomes {
        for analogue in &outcome.analogues {
            let instant = parse_key(&analogue.timestamp)?;
            if instant < params.dataset_start || instant > params.dataset_end {
                continue;
            }
            let entry = sums.entry(analogue.timestamp.as_str()).or_insert((0.0, 0));
            entry.0 += analogue.similarity_value;
            entry.1 += analogue.time_instances;
        }
    }

    let expected = params.expected_contributions();
    let mut analogues = Vec::with_capacity(sums.len());
    for (timestamp, (value, counter)) in sums {
        if counter != expected {
            tracing::info!("Timestamp {} did not have all time instances", timestamp);
            continue;
        }
        analogues.push(RankedAnalogue {
            timestamp: timestamp.to_string(),
            similarity: value / counter as f64,
            time_instances: params.time_instances,
        });
    }

    // Without any answer, larger is better.
    let is_reverse_order = outcomes.first().is_none_or(|o| o.is_reverse_order);
    analogues.sort_by(|a, b| {
        let order = a.similarity.total_cmp(&b.similarity);
        if is_reverse_order { order.reverse() } else { order }
    });

    if let Some(n) = params.number_of_results {
        if n == 0 {
            bail!("number_of_results must be a positive number");
        }
        analogues.truncate(n);
    }

    Ok(SearchResult {
        analogues,
        is_reverse_order,
    })
}
