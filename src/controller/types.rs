use std::fmt;

/// Steps of a two-phase (ndrank) request, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    MappingPorts,
    TransferringFiles,
    ReducingResolution,
    LowResSearch,
    PublishPartial,
    AwaitAggregate,
    FullResRefineOrCandidates,
    PublishFinalPartial,
    AwaitFinalAggregate,
    Respond,
    Cleanup,
    ErrorCleanup,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MappingPorts => "MAPPING_PORTS",
            Self::TransferringFiles => "TRANSFERRING_FILES",
            Self::ReducingResolution => "REDUCING_RESOLUTION",
            Self::LowResSearch => "LOW_RES_SEARCH",
            Self::PublishPartial => "PUBLISH_PARTIAL",
            Self::AwaitAggregate => "AWAIT_AGGREGATE",
            Self::FullResRefineOrCandidates => "FULL_RES_REFINE_OR_CANDIDATES",
            Self::PublishFinalPartial => "PUBLISH_FINAL_PARTIAL",
            Self::AwaitFinalAggregate => "AWAIT_FINAL_AGGREGATE",
            Self::Respond => "RESPOND",
            Self::Cleanup => "CLEANUP",
            Self::ErrorCleanup => "ERROR_CLEANUP",
        };
        f.write_str(name)
    }
}

/// Logs every state a request enters.
pub struct StateTrace {
    request_id: String,
    states: Vec<ControllerState>,
}

impl StateTrace {
    pub fn new(request_id: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            states: Vec::new(),
        }
    }

    pub fn enter(&mut self, state: ControllerState) {
        tracing::info!("Request {} entered {}", self.request_id, state);
        self.states.push(state);
    }

    pub fn current(&self) -> Option<ControllerState> {
        self.states.last().copied()
    }

    pub fn states(&self) -> &[ControllerState] {
        &self.states
    }
}
