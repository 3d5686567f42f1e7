//! Steps shared by both controllers: port mapping, file reception and cleanup.

use super::types::{ControllerState, StateTrace};
use crate::rpc::{ResponseSender, SearchResponse};
use crate::transfer::{FileProtocol, InputFileProperties, remove_files};

use anyhow::{Result, anyhow};
use std::path::PathBuf;

/// Maps one port per file, reports the mapping and waits for every file.
///
/// The transfer is aborted when the caller is gone before the mapping is delivered.
pub async fn receive_inputs(
    file_protocol: &FileProtocol,
    files: Vec<InputFileProperties>,
    responses: &ResponseSender,
    trace: &mut StateTrace,
) -> Result<Vec<(PathBuf, InputFileProperties)>> {
    trace.enter(ControllerState::MappingPorts);
    let transfer = file_protocol.open_sockets(files).await?;
    let mapping = transfer.mapping_message();
    tracing::debug!("Port mapping: {:?}", mapping);

    if responses.send(SearchResponse::Mappings(mapping)).await.is_err() {
        file_protocol.abort(transfer).await;
        return Err(anyhow!("The caller left before the port mapping was sent"));
    }

    trace.enter(ControllerState::TransferringFiles);
    file_protocol.wait_for_files_to_transfer(transfer).await
}

/// Runs CPU-bound search work off the async workers.
pub async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

pub async fn cleanup(paths: &[PathBuf], trace: &mut StateTrace) {
    trace.enter(ControllerState::Cleanup);
    remove_files(paths).await;
}

pub async fn error_cleanup(paths: &[PathBuf], trace: &mut StateTrace, error: &anyhow::Error) {
    tracing::error!("Request failed in {:?}: {:#}", trace.current(), error);
    trace.enter(ControllerState::ErrorCleanup);
    remove_files(paths).await;
}
