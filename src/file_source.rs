//! Source-agnostic file ingestion
//!
//! A [`FileSource`] yields [`FileRecord`]s one at a time from either a local
//! directory or an `s3://` prefix. The backend is picked once, in
//! [`FileSource::open`], from the target string; consumers only see the
//! pull interface.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;

use crate::error::{IngestionError, Result};
use crate::object_store::{ObjectStore, S3_SCHEME, S3Location, S3ObjectStore, S3Settings};

/// A file's identifier paired with its full text content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    identifier: String,
    content: String,
}

impl FileRecord {
    pub fn new(identifier: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            content: content.into(),
        }
    }

    /// Path or object key, unique within one run
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_parts(self) -> (String, String) {
        (self.identifier, self.content)
    }
}

/// Whether a target selects the remote backend
pub fn is_remote_target(target: &str) -> bool {
    target
        .get(..S3_SCHEME.len())
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case(S3_SCHEME))
}

/// Lazy sequence of [`FileRecord`]s over one target.
///
/// Finite and not restartable: open a new source to iterate again.
pub struct FileSource {
    backend: Backend,
    peeked: Option<FileRecord>,
}

enum Backend {
    Local(LocalFileSource),
    Remote(RemoteFileSource),
}

impl FileSource {
    /// Open a source for `target`, connecting to S3 for `s3://` targets.
    pub async fn open(target: &str, settings: &S3Settings) -> Result<Self> {
        if is_remote_target(target) {
            let location = S3Location::parse(target)?;
            let store = S3ObjectStore::connect(settings).await?;
            let remote = RemoteFileSource::open(Arc::new(store), location).await?;
            Ok(Self::from_remote(remote))
        } else {
            let local = LocalFileSource::open(target).await?;
            Ok(Self::from_local(local))
        }
    }

    pub fn from_local(source: LocalFileSource) -> Self {
        Self {
            backend: Backend::Local(source),
            peeked: None,
        }
    }

    pub fn from_remote(source: RemoteFileSource) -> Self {
        Self {
            backend: Backend::Remote(source),
            peeked: None,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.backend, Backend::Remote(_))
    }

    /// Advance to the next record, `None` once exhausted
    pub async fn next_record(&mut self) -> Result<Option<FileRecord>> {
        if let Some(record) = self.peeked.take() {
            return Ok(Some(record));
        }
        match &mut self.backend {
            Backend::Local(source) => source.advance().await,
            Backend::Remote(source) => source.advance().await,
        }
    }

    /// Whether another record is available. May buffer that record.
    pub async fn has_next(&mut self) -> Result<bool> {
        if self.peeked.is_none() {
            self.peeked = self.next_record().await?;
        }
        Ok(self.peeked.is_some())
    }

    /// Next record, failing with [`IngestionError::Exhausted`] past the end
    pub async fn next(&mut self) -> Result<FileRecord> {
        self.next_record().await?.ok_or(IngestionError::Exhausted)
    }

    /// Release the cursor and any storage client. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.peeked = None;
        match &mut self.backend {
            Backend::Local(source) => source.close(),
            Backend::Remote(source) => source.close(),
        }
    }
}

/// Non-recursive listing of one directory's regular files
pub struct LocalFileSource {
    root: PathBuf,
    entries: Option<fs::ReadDir>,
}

impl LocalFileSource {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let entries = fs::read_dir(&root).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IngestionError::DirectoryNotFound { path: root.clone() }
            } else {
                IngestionError::io(&root, e)
            }
        })?;

        tracing::info!(directory = %root.display(), "opened local source");
        Ok(Self {
            root,
            entries: Some(entries),
        })
    }

    async fn advance(&mut self) -> Result<Option<FileRecord>> {
        let Some(entries) = self.entries.as_mut() else {
            return Ok(None);
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| IngestionError::io(&self.root, e))?
        {
            let path = entry.path();
            let metadata = fs::metadata(&path)
                .await
                .map_err(|e| IngestionError::io(&path, e))?;
            if !metadata.is_file() {
                tracing::debug!(path = %path.display(), "skipping non-file entry");
                continue;
            }

            let bytes = fs::read(&path)
                .await
                .map_err(|e| IngestionError::io(&path, e))?;
            let content = String::from_utf8_lossy(&bytes).into_owned();
            return Ok(Some(FileRecord::new(path.display().to_string(), content)));
        }

        self.entries = None;
        Ok(None)
    }

    fn close(&mut self) {
        self.entries = None;
    }
}

/// Prefix listing over an [`ObjectStore`], fetching one object per advance.
///
/// Listing pages are requested only when the keys of the previous page have
/// been consumed. Zero-length objects are skipped.
pub struct RemoteFileSource {
    store: Option<Arc<dyn ObjectStore>>,
    location: S3Location,
    pending: VecDeque<String>,
    continuation_token: Option<String>,
}

impl RemoteFileSource {
    /// Start a listing under `location`. The first page is requested here.
    pub async fn open(store: Arc<dyn ObjectStore>, location: S3Location) -> Result<Self> {
        let first = store
            .list_page(&location.bucket, &location.prefix, None)
            .await?;
        tracing::info!(
            bucket = %location.bucket,
            prefix = %location.prefix,
            keys = first.keys.len(),
            more = first.continuation_token.is_some(),
            "opened remote source"
        );

        Ok(Self {
            store: Some(store),
            location,
            pending: first.keys.into(),
            continuation_token: first.continuation_token,
        })
    }

    async fn advance(&mut self) -> Result<Option<FileRecord>> {
        let Some(store) = self.store.clone() else {
            return Ok(None);
        };

        loop {
            let key = match self.pending.pop_front() {
                Some(key) => key,
                None => match self.continuation_token.take() {
                    Some(token) => {
                        let page = store
                            .list_page(&self.location.bucket, &self.location.prefix, Some(token))
                            .await?;
                        tracing::debug!(keys = page.keys.len(), "fetched next listing page");
                        self.pending = page.keys.into();
                        self.continuation_token = page.continuation_token;
                        continue;
                    }
                    None => {
                        self.close();
                        return Ok(None);
                    }
                },
            };

            let object = store.get_object(&self.location.bucket, &key).await?;
            if object.is_empty() {
                tracing::debug!(key = %key, "skipping zero-length object");
                continue;
            }

            let content = String::from_utf8_lossy(&object.body).into_owned();
            return Ok(Some(FileRecord::new(key, content)));
        }
    }

    fn close(&mut self) {
        self.store = None;
        self.pending.clear();
        self.continuation_token = None;
    }
}
