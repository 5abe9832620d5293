//! Chunked file transfers
//!
//! Uploads and downloads move data in fixed-size chunks, reporting
//! `(bytes_transferred, total_bytes)` after every chunk. Progress never goes
//! backwards and reaches the total exactly once. Once the caller's
//! cancellation token fires no further progress is reported and the
//! transfer returns `Error::Cancelled`; partial files are left on the
//! printer for the caller to delete or resume.

use crate::firmware::duet::command_creator;
use crate::session::validate::validate_path;
use crate::session::PathLocks;
use crate::transport::{send_with_deadline, Transport};
use duetkit_core::{with_cancellation, CancellationToken, DecodeError, Error, Result};
use duetkit_settings::TransferSettings;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Coordinates chunked uploads and downloads
#[derive(Clone)]
pub struct FileTransferCoordinator {
    transport: Arc<dyn Transport>,
    chunk_size: usize,
    timeout: Duration,
    path_locks: Arc<PathLocks>,
}

impl fmt::Debug for FileTransferCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileTransferCoordinator")
            .field("chunk_size", &self.chunk_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl FileTransferCoordinator {
    /// Create a coordinator with its own path serialization
    pub fn new(transport: Arc<dyn Transport>, settings: &TransferSettings, timeout: Duration) -> Self {
        Self::with_path_locks(transport, settings, timeout, Arc::new(PathLocks::new()))
    }

    /// Create a coordinator that shares path serialization with a session
    pub fn with_path_locks(
        transport: Arc<dyn Transport>,
        settings: &TransferSettings,
        timeout: Duration,
        path_locks: Arc<PathLocks>,
    ) -> Self {
        Self {
            transport,
            chunk_size: settings.chunk_size.max(1),
            timeout,
            path_locks,
        }
    }

    /// Bytes per chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Upload `data` to `path`
    ///
    /// An empty upload still sends one (empty) chunk so the file is created,
    /// and reports `(0, 0)` once.
    pub async fn upload<F>(
        &self,
        data: &[u8],
        path: &str,
        token: &CancellationToken,
        mut on_progress: F,
    ) -> Result<()>
    where
        F: FnMut(u64, u64) + Send,
    {
        validate_path(path)?;
        let _guard =
            with_cancellation(token, async { Ok::<_, Error>(self.path_locks.lock(path).await) })
                .await?;

        let total = data.len() as u64;
        tracing::debug!(path, total, chunk_size = self.chunk_size, "Starting upload");

        let mut offset = 0usize;
        loop {
            let end = (offset + self.chunk_size).min(data.len());
            let request =
                command_creator::upload_chunk(path, offset as u64, total, data[offset..end].to_vec());
            with_cancellation(
                token,
                send_with_deadline(self.transport.as_ref(), self.timeout, request),
            )
            .await
            .map_err(|err| self.abandoned(path, offset as u64, err))?;

            if token.is_cancelled() {
                return Err(self.abandoned(path, end as u64, Error::Cancelled));
            }
            offset = end;
            on_progress(offset as u64, total);

            if offset >= data.len() {
                break;
            }
        }

        tracing::info!(path, total, "Upload complete");
        Ok(())
    }

    /// Download `path`
    pub async fn download<F>(
        &self,
        path: &str,
        token: &CancellationToken,
        mut on_progress: F,
    ) -> Result<Vec<u8>>
    where
        F: FnMut(u64, u64) + Send,
    {
        validate_path(path)?;
        tracing::debug!(path, chunk_size = self.chunk_size, "Starting download");

        let mut data: Vec<u8> = Vec::new();
        let mut expected_total: Option<u64> = None;
        loop {
            let offset = data.len() as u64;
            let request = command_creator::download_chunk(path, offset, self.chunk_size as u64);
            let mut payload = with_cancellation(
                token,
                send_with_deadline(self.transport.as_ref(), self.timeout, request),
            )
            .await
            .map_err(|err| self.abandoned(path, offset, err))?;

            let total = payload.get_u64("total").ok_or_else(|| DecodeError::InvalidField {
                field: "total".to_string(),
                reason: "missing or not a byte count".to_string(),
            })?;
            if let Some(expected) = expected_total {
                if expected != total {
                    return Err(inconsistent(format!(
                        "file size changed from {} to {} during download",
                        expected, total
                    )));
                }
            }
            expected_total = Some(total);

            let chunk = payload.take_data().unwrap_or_default();
            let received = offset + chunk.len() as u64;
            if received > total {
                return Err(inconsistent(format!(
                    "received {} bytes of a {}-byte file",
                    received, total
                )));
            }
            if chunk.is_empty() && received < total {
                return Err(inconsistent(format!(
                    "empty chunk at offset {} of {}",
                    offset, total
                )));
            }
            data.extend_from_slice(&chunk);

            if token.is_cancelled() {
                return Err(self.abandoned(path, received, Error::Cancelled));
            }
            on_progress(received, total);

            if received >= total {
                break;
            }
        }

        tracing::info!(path, total = data.len(), "Download complete");
        Ok(data)
    }

    fn abandoned(&self, path: &str, transferred: u64, err: Error) -> Error {
        if err.is_cancelled() {
            tracing::info!(path, transferred, "Transfer cancelled");
        } else {
            tracing::warn!(path, transferred, error = %err, "Transfer failed");
        }
        err
    }
}

fn inconsistent(reason: String) -> Error {
    DecodeError::Inconsistent { reason }.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{NoOpTransport, Operation, Payload};
    use async_trait::async_trait;
    use duetkit_core::TransportError;

    struct Fixed(Vec<u8>);

    #[async_trait]
    impl Transport for Fixed {
        async fn send(
            &self,
            operation: Operation,
            payload: Payload,
        ) -> std::result::Result<Payload, TransportError> {
            assert_eq!(operation, Operation::DownloadChunk);
            let offset = payload.get_u64("offset").unwrap_or(0) as usize;
            let length = payload.get_u64("length").unwrap_or(0) as usize;
            let end = (offset + length).min(self.0.len());
            Ok(Payload::new()
                .with("total", self.0.len() as u64)
                .with_data(self.0[offset..end].to_vec()))
        }
    }

    fn coordinator(transport: Arc<dyn Transport>, chunk_size: usize) -> FileTransferCoordinator {
        FileTransferCoordinator::new(
            transport,
            &TransferSettings { chunk_size },
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_download_in_chunks() {
        let contents: Vec<u8> = (0..250u32).map(|i| i as u8).collect();
        let transfers = coordinator(Arc::new(Fixed(contents.clone())), 100);
        let mut progress = Vec::new();

        let data = transfers
            .download("0:/gcodes/a.g", &CancellationToken::new(), |done, total| {
                progress.push((done, total))
            })
            .await
            .unwrap();

        assert_eq!(data, contents);
        assert_eq!(progress, vec![(100, 250), (200, 250), (250, 250)]);
    }

    #[tokio::test]
    async fn test_empty_download() {
        let transfers = coordinator(Arc::new(Fixed(Vec::new())), 100);
        let mut calls = 0;
        let data = transfers
            .download("0:/gcodes/empty.g", &CancellationToken::new(), |done, total| {
                assert_eq!((done, total), (0, 0));
                calls += 1;
            })
            .await
            .unwrap();
        assert!(data.is_empty());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_upload_failure_surfaces_transport_error() {
        let transfers = coordinator(Arc::new(NoOpTransport::new()), 100);
        let err = transfers
            .upload(b"G28\n", "0:/gcodes/a.g", &CancellationToken::new(), |_, _| {
                panic!("no progress expected")
            })
            .await
            .unwrap_err();
        assert!(err.is_transport_failure());
    }

    #[tokio::test]
    async fn test_invalid_path_sends_nothing() {
        let transfers = coordinator(Arc::new(NoOpTransport::new()), 100);
        let err = transfers
            .upload(b"", "", &CancellationToken::new(), |_, _| {})
            .await
            .unwrap_err();
        assert!(err.is_validation_error());
    }
}
