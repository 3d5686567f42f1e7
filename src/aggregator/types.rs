//! Per-request merge state of the aggregator.

use crate::queue::{
    CandidateEntry, CandidatesMessage, PartialCandidateEntry, PartialResultEntry, ResultEntry,
    ResultsMessage,
};

use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("Received a duplicated message for request id {request_id} from node id {node_id}")]
    DuplicateMessage { request_id: String, node_id: String },

    #[error("Node id {node_id} is not part of the cluster (request id {request_id})")]
    UnknownNode { request_id: String, node_id: String },
}

/// Sorts best first: descending when larger values are better.
fn sort_by_value<T>(entries: &mut [T], is_reverse_order: bool, value: impl Fn(&T) -> f64) {
    entries.sort_by(|a, b| {
        let ordering = value(a).total_cmp(&value(b));
        if is_reverse_order { ordering.reverse() } else { ordering }
    });
}

/// Results of one request received so far.
#[derive(Debug)]
pub struct ResultsAggregate {
    totals: Vec<ResultEntry>,
    partials: BTreeMap<String, (f64, usize)>,
    size_input: usize,
    nodes: HashSet<String>,
}

impl ResultsAggregate {
    pub fn new(size_input: usize) -> Self {
        Self {
            totals: Vec::new(),
            partials: BTreeMap::new(),
            size_input,
            nodes: HashSet::new(),
        }
    }

    pub fn has_node(&self, node_id: &str) -> bool {
        self.nodes.contains(node_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Folds a node's message in. Partial sums turn into totals once they hold
    /// `size-input` contributions.
    pub fn add_message(&mut self, node_id: &str, message: ResultsMessage) {
        self.totals.extend(message.final_results);
        for entry in message.partial_results {
            self.add_partial(entry);
        }
        self.nodes.insert(node_id.to_string());
    }

    fn add_partial(&mut self, entry: PartialResultEntry) {
        let (value, counter) = {
            let slot = self.partials.entry(entry.timestamp.clone()).or_insert((0.0, 0));
            slot.0 += entry.value;
            slot.1 += entry.sum_counter;
            *slot
        };
        if counter == self.size_input {
            self.partials.remove(&entry.timestamp);
            self.totals.push(ResultEntry {
                timestamp: entry.timestamp,
                value: value / counter as f64,
            });
        }
    }

    pub fn pending_partials(&self) -> usize {
        self.partials.len()
    }

    /// The best `num_results` totals.
    pub fn merged(mut self, num_results: usize, is_reverse_order: bool) -> Vec<ResultEntry> {
        sort_by_value(&mut self.totals, is_reverse_order, |entry| entry.value);
        self.totals.truncate(num_results);
        self.totals
    }
}

/// Candidates of one request received so far.
#[derive(Debug)]
pub struct CandidatesAggregate {
    list: Vec<CandidateEntry>,
    partials: BTreeMap<String, (f64, f64, usize)>,
    top_res: usize,
    is_reverse_order: bool,
    size_input: usize,
    nodes: HashSet<String>,
}

impl CandidatesAggregate {
    pub fn new(size_input: usize, top_res: usize, is_reverse_order: bool) -> Self {
        Self {
            list: Vec::new(),
            partials: BTreeMap::new(),
            top_res,
            is_reverse_order,
            size_input,
            nodes: HashSet::new(),
        }
    }

    pub fn has_node(&self, node_id: &str) -> bool {
        self.nodes.contains(node_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn add_message(&mut self, node_id: &str, message: CandidatesMessage) {
        self.list.extend(message.final_results);
        for entry in message.partial_results {
            self.add_partial(entry);
        }
        self.nodes.insert(node_id.to_string());
    }

    fn add_partial(&mut self, entry: PartialCandidateEntry) {
        let (best, worst, counter) = {
            let slot = self
                .partials
                .entry(entry.timestamp.clone())
                .or_insert((0.0, 0.0, 0));
            slot.0 += entry.best_value;
            slot.1 += entry.worst_value;
            slot.2 += entry.sum_counter;
            *slot
        };
        if counter == self.size_input {
            self.partials.remove(&entry.timestamp);
            self.list.push(CandidateEntry {
                timestamp: entry.timestamp,
                best_value: best / counter as f64,
                worst_value: worst / counter as f64,
            });
        }
    }

    /// Every complete candidate sorted by worst value, without those whose best value
    /// cannot reach the N-th worst value. With fewer than N candidates nothing is pruned.
    pub fn merged(mut self) -> Vec<CandidateEntry> {
        sort_by_value(&mut self.list, self.is_reverse_order, |entry| entry.worst_value);
        if self.top_res == 0 || self.list.len() <= self.top_res {
            return self.list;
        }

        let kth_worst = self.list[self.top_res - 1].worst_value;
        let before = self.list.len();
        let (top_res, is_reverse_order) = (self.top_res, self.is_reverse_order);
        let mut index = 0;
        self.list.retain(|entry| {
            let keep = index < top_res
                || !((is_reverse_order && entry.best_value < kth_worst)
                    || (!is_reverse_order && entry.best_value > kth_worst));
            index += 1;
            keep
        });
        tracing::debug!("Pruned candidates: {} -> {}", before, self.list.len());
        self.list
    }
}
