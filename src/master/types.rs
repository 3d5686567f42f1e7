use crate::rpc::Analogue;

use std::fmt;

/// What one worker answered for a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeOutcome {
    pub analogues: Vec<Analogue>,
    pub is_reverse_order: bool,
}

/// A merged, ranked analogue as written to the results.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedAnalogue {
    pub timestamp: String,
    pub similarity: f64,
    pub time_instances: usize,
}

impl fmt::Display for RankedAnalogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Similarity: {}\tTimestamp: {}\tNum of time instances: {}",
            self.similarity, self.timestamp, self.time_instances
        )
    }
}

/// Final answer of a request across all workers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub analogues: Vec<RankedAnalogue>,
    pub is_reverse_order: bool,
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for analogue in &self.analogues {
            writeln!(f, "{}", analogue)?;
        }
        Ok(())
    }
}
