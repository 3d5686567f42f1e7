//! Receiving side of the file transfer: one listening socket per input file.

use super::types::{FilePortMapping, InputFileProperties, TransferError};

use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Consecutive empty reads tolerated before a peer is considered stalled.
pub const EMPTY_RETRY_TIMES: usize = 5;
pub const DEFAULT_TIMEOUT_MS: u64 = 10000;
pub const BUFFER_SIZE: usize = 4096;

/// An in-flight set of transfers started by `FileProtocol::open_sockets`.
pub struct FileTransfer {
    mapping: Vec<(InputFileProperties, u16)>,
    targets: Vec<PathBuf>,
    handles: Vec<JoinHandle<Result<PathBuf>>>,
}

impl FileTransfer {
    pub fn port_mapping(&self) -> &[(InputFileProperties, u16)] {
        &self.mapping
    }

    pub fn mapping_message(&self) -> Vec<FilePortMapping> {
        self.mapping
            .iter()
            .map(|(file, port)| FilePortMapping {
                file: file.file_name.clone(),
                port: *port,
            })
            .collect()
    }
}

/// Owns the port range of a worker and the folder received files land in.
pub struct FileProtocol {
    host: String,
    from_port: u16,
    to_port: u16,
    temporary_folder: PathBuf,
    read_timeout: Duration,
    allocated: Mutex<Vec<bool>>,
}

impl FileProtocol {
    pub fn new(host: &str, from_port: u16, to_port: u16, temporary_folder: &Path) -> Result<Arc<Self>> {
        Self::with_read_timeout(
            host,
            from_port,
            to_port,
            temporary_folder,
            Duration::from_millis(DEFAULT_TIMEOUT_MS),
        )
    }

    pub fn with_read_timeout(
        host: &str,
        from_port: u16,
        to_port: u16,
        temporary_folder: &Path,
        read_timeout: Duration,
    ) -> Result<Arc<Self>> {
        if to_port <= from_port {
            return Err(TransferError::InvalidPortRange {
                from: from_port,
                to: to_port,
            }
            .into());
        }
        Ok(Arc::new(Self {
            host: host.to_string(),
            from_port,
            to_port,
            temporary_folder: temporary_folder.to_path_buf(),
            read_timeout,
            allocated: Mutex::new(vec![false; (to_port - from_port) as usize]),
        }))
    }

    pub async fn free_ports(&self) -> usize {
        self.allocated.lock().await.iter().filter(|a| !**a).count()
    }

    /// Maps every file to the first free ports of the range. Nothing stays allocated
    /// when the range cannot hold all files.
    async fn allocate_ports(&self, files: Vec<InputFileProperties>) -> Result<Vec<(InputFileProperties, u16)>> {
        let mut allocated = self.allocated.lock().await;
        let free: Vec<usize> = allocated
            .iter()
            .enumerate()
            .filter(|(_, used)| !**used)
            .map(|(i, _)| i)
            .take(files.len())
            .collect();
        if free.len() < files.len() {
            return Err(TransferError::OutOfSocketPorts {
                requested: files.len(),
                from: self.from_port,
                to: self.to_port,
            }
            .into());
        }
        for i in &free {
            allocated[*i] = true;
        }
        Ok(files
            .into_iter()
            .zip(free)
            .map(|(file, i)| (file, self.from_port + i as u16))
            .collect())
    }

    async fn release_ports(&self, mapping: &[(InputFileProperties, u16)]) {
        let mut allocated = self.allocated.lock().await;
        for (_, port) in mapping {
            if let Some(slot) = allocated.get_mut((port - self.from_port) as usize) {
                *slot = false;
            }
        }
    }

    /// Allocates ports, binds one listener per file and starts receiving in the background.
    pub async fn open_sockets(&self, files: Vec<InputFileProperties>) -> Result<FileTransfer> {
        let mapping = self.allocate_ports(files).await?;

        let mut listeners = Vec::with_capacity(mapping.len());
        for (file, port) in &mapping {
            tracing::debug!("{:?} -> port {}", file, port);
            match TcpListener::bind((self.host.as_str(), *port)).await {
                Ok(listener) => listeners.push(listener),
                Err(e) => {
                    self.release_ports(&mapping).await;
                    return Err(anyhow!(e).context(format!("Failed to bind port {}", port)));
                }
            }
        }

        let mut targets = Vec::with_capacity(mapping.len());
        let mut handles = Vec::with_capacity(mapping.len());
        for ((file, _), listener) in mapping.iter().zip(listeners) {
            let target = self.temporary_folder.join(format!(
                "temp_{}_{}",
                uuid::Uuid::new_v4().simple(),
                file.base_name()
            ));
            targets.push(target.clone());
            let file = file.clone();
            let read_timeout = self.read_timeout;
            handles.push(tokio::spawn(async move {
                receive_file(listener, file, target, read_timeout).await
            }));
        }

        Ok(FileTransfer {
            mapping,
            targets,
            handles,
        })
    }

    /// Waits for every transfer, releases the ports and reports every failure at once.
    ///
    /// On failure all received files are removed.
    pub async fn wait_for_files_to_transfer(
        &self,
        transfer: FileTransfer,
    ) -> Result<Vec<(PathBuf, InputFileProperties)>> {
        let FileTransfer {
            mapping,
            targets,
            handles,
        } = transfer;

        let outcomes = futures::future::join_all(handles).await;
        self.release_ports(&mapping).await;

        let mut received = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (outcome, (file, port)) in outcomes.into_iter().zip(mapping) {
            match outcome {
                Ok(Ok(path)) => received.push((path, file)),
                Ok(Err(e)) => failures.push(format!("{} (port {}): {:#}", file.file_name, port, e)),
                Err(e) => failures.push(format!("{} (port {}): {}", file.file_name, port, e)),
            }
        }

        if !failures.is_empty() {
            remove_files(&targets).await;
            return Err(TransferError::Combined(failures).into());
        }
        Ok(received)
    }

    /// Stops every transfer of `transfer`, deletes its files and frees its ports.
    pub async fn abort(&self, transfer: FileTransfer) {
        for handle in &transfer.handles {
            handle.abort();
        }
        for handle in transfer.handles {
            let _ = handle.await;
        }
        remove_files(&transfer.targets).await;
        self.release_ports(&transfer.mapping).await;
    }
}

pub async fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}

async fn receive_file(
    listener: TcpListener,
    properties: InputFileProperties,
    target: PathBuf,
    read_timeout: Duration,
) -> Result<PathBuf> {
    let (mut connection, peer) = tokio::time::timeout(read_timeout, listener.accept())
        .await
        .map_err(|_| TransferError::Timeout {
            file: properties.file_name.clone(),
        })??;
    tracing::debug!("Receiving {} from {}", properties.file_name, peer);

    let mut output = File::create(&target)
        .await
        .with_context(|| format!("Failed to create {}", target.display()))?;

    let total = properties.file_size;
    let mut downloaded = 0u64;
    let mut empty_reads = 0usize;
    let mut buffer = vec![0u8; BUFFER_SIZE];

    let outcome: Result<()> = async {
        while downloaded < total {
            let read = tokio::time::timeout(read_timeout, connection.read(&mut buffer))
                .await
                .map_err(|_| TransferError::Timeout {
                    file: properties.file_name.clone(),
                })??;
            if read == 0 {
                empty_reads += 1;
                if empty_reads >= EMPTY_RETRY_TIMES {
                    return Err(TransferError::Timeout {
                        file: properties.file_name.clone(),
                    }
                    .into());
                }
                continue;
            }
            empty_reads = 0;
            output.write_all(&buffer[..read]).await?;
            downloaded += read as u64;
        }
        output.flush().await?;
        Ok(())
    }
    .await;

    let _ = connection.shutdown().await;
    if let Err(e) = outcome {
        drop(output);
        remove_files(std::slice::from_ref(&target)).await;
        return Err(e);
    }
    tracing::info!("Received {} ({} bytes)", properties.file_name, downloaded);
    Ok(target)
}
