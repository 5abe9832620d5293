//! File management on the printer's storage
//!
//! Structural commands (delete, create, move) on the same path are
//! serialized; anything on disjoint paths runs concurrently. Wrap any of
//! these in [`duetkit_core::with_cancellation`] to abandon them.

use super::validate::validate_path;
use super::PrinterSession;
use crate::firmware::duet::{command_creator, parse_directory_listing, parse_file_info};
use duetkit_core::{DirectoryItem, FileInfo, Result};

impl PrinterSession {
    /// List a directory, directories first
    pub async fn list_directory(&self, path: &str) -> Result<Vec<DirectoryItem>> {
        validate_path(path)?;
        tracing::debug!(path, "Listing directory");
        let payload = self.round_trip(command_creator::list_directory(path)).await?;
        let items = parse_directory_listing(path, &payload).map_err(|err| {
            tracing::warn!(path, error = %err, "Directory listing rejected");
            err
        })?;
        Ok(items)
    }

    /// Fetch metadata for a file
    pub async fn fetch_file_info(&self, path: &str) -> Result<FileInfo> {
        validate_path(path)?;
        let payload = self.round_trip(command_creator::file_info(Some(path))).await?;
        Ok(parse_file_info(Some(path), &payload)?)
    }

    /// Delete a file or empty directory
    pub async fn delete_item(&self, path: &str) -> Result<()> {
        validate_path(path)?;
        let _guard = self.inner.path_locks.lock(path).await;
        self.command(command_creator::delete(path)).await?;
        Ok(())
    }

    /// Create a directory
    pub async fn create_directory(&self, path: &str) -> Result<()> {
        validate_path(path)?;
        let _guard = self.inner.path_locks.lock(path).await;
        self.command(command_creator::create_directory(path)).await?;
        Ok(())
    }

    /// Move or rename a file; both paths are locked
    pub async fn move_file(&self, from: &str, to: &str) -> Result<()> {
        validate_path(from)?;
        validate_path(to)?;
        let _guards = self.inner.path_locks.lock_all(&[from, to]).await;
        self.command(command_creator::move_file(from, to)).await?;
        Ok(())
    }
}
