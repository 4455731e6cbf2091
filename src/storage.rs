use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

/// StorageError
///
/// Raised when uploaded bytes cannot be persisted. Always surfaced to callers
/// as an opaque internal error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

// 1. StorageService Contract
/// StorageService
///
/// Defines the contract for persisting uploaded files. The handler never knows
/// where bytes end up; it only asks for the retrieval URL afterwards. This lets
/// the local-disk implementation be swapped for the in-memory mock in tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Prepares the backing store (creates the upload directory). Called once at startup.
    async fn ensure_ready(&self) -> Result<(), StorageError>;

    /// Persists `bytes` under `file_name`. The name is generated server-side and
    /// is already safe to use as a single path segment.
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// The URL a client can later fetch the stored file from.
    fn public_url(&self, file_name: &str) -> String;
}

// 2. The Real Implementation (local directory)
/// LocalDiskStorage
///
/// Writes uploads into a directory that the router also serves under `/uploads`.
/// Concurrent uploads never collide because every file name is random.
#[derive(Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StorageService for LocalDiskStorage {
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.root.join(sanitize_file_name(file_name));
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "upload written");
        Ok(())
    }

    fn public_url(&self, file_name: &str) -> String {
        format!("{}/uploads/{}", self.public_base_url, sanitize_file_name(file_name))
    }
}

/// sanitize_file_name
///
/// Keeps only the final path segment and drops `.`/`..`, so a name can never
/// escape the upload directory.
pub fn sanitize_file_name(name: &str) -> String {
    name.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .last()
        .unwrap_or("upload")
        .to_string()
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// Keeps stored files in memory so handler tests can assert on what was written
/// without touching the filesystem.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, every write returns a simulated failure.
    pub should_fail: bool,
    files: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Size of the stored file, if it was written.
    pub fn stored_size(&self, file_name: &str) -> Option<usize> {
        self.files
            .lock()
            .ok()
            .and_then(|files| files.get(file_name).copied())
    }

    pub fn stored_count(&self) -> usize {
        self.files.lock().map(|files| files.len()).unwrap_or(0)
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if self.should_fail {
            return Err(StorageError::Unavailable(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }
        let mut files = self
            .files
            .lock()
            .map_err(|_| StorageError::Unavailable("mock storage lock poisoned".to_string()))?;
        files.insert(sanitize_file_name(file_name), bytes.len());
        Ok(())
    }

    fn public_url(&self, file_name: &str) -> String {
        format!("http://localhost:3000/uploads/{}", sanitize_file_name(file_name))
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
