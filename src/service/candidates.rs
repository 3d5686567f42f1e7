//! Bounded candidate list with interval pruning.

use super::types::{CandidateContainer, CandidateResults};
use crate::correlation::CorrelationFunction;

/// Candidates sorted by worst value (best first), holding the top `top_res` plus any
/// candidate whose best value could still reach the top.
pub struct CandidateListManager<'a> {
    list: Vec<(i64, CandidateContainer)>,
    function: &'a dyn CorrelationFunction,
    top_res: usize,
}

impl<'a> CandidateListManager<'a> {
    pub fn new(function: &'a dyn CorrelationFunction, top_res: usize) -> Self {
        Self {
            list: Vec::new(),
            function,
            top_res,
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Adds the candidate unless the K-th worst value is strictly better than its best value.
    pub fn add_value(&mut self, instant: i64, candidate: CandidateContainer) {
        if self.top_res == 0 {
            return;
        }
        if self.list.len() < self.top_res {
            self.insert_sorted(instant, candidate);
            return;
        }
        let kth_worst = self.list[self.top_res - 1].1.worst_value();
        if self.function.compare(kth_worst, candidate.best_value())
            || kth_worst == candidate.best_value()
        {
            self.insert_sorted(instant, candidate);
        }
    }

    pub fn get_results(&self) -> impl Iterator<Item = i64> + '_ {
        self.list.iter().map(|(instant, _)| *instant)
    }

    pub fn entries(&self) -> &[(i64, CandidateContainer)] {
        &self.list
    }

    pub fn into_results(self) -> CandidateResults {
        self.list.into_iter().collect()
    }

    fn insert_sorted(&mut self, instant: i64, candidate: CandidateContainer) {
        self.list.push((instant, candidate));
        for i in (1..self.list.len()).rev() {
            if self
                .function
                .compare(self.list[i - 1].1.worst_value(), self.list[i].1.worst_value())
            {
                self.list.swap(i - 1, i);
            } else {
                break;
            }
        }
        while self.pop_if_worst_interval() {}
    }

    /// Drops the tail when its best value cannot reach the K-th worst value.
    fn pop_if_worst_interval(&mut self) -> bool {
        if self.top_res == 0 || self.list.len() <= self.top_res {
            return false;
        }
        let last_best = match self.list.last() {
            Some((_, last)) => last.best_value(),
            None => return false,
        };
        let kth_worst = self.list[self.top_res - 1].1.worst_value();
        if self.function.compare(last_best, kth_worst) && last_best != kth_worst {
            self.list.pop();
            true
        } else {
            false
        }
    }
}
