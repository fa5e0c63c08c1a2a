//! Blob store rooted in a local directory.
//!
//! Blob names map onto relative paths below the root; `/` separates
//! directories. All access goes through a capability handle on the root, so
//! no name can reach outside it.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io;
use std::sync::Arc;
use uuid::Uuid;

use crate::archival::ports::{BlobStore, BlobStoreError, BlobStoreResult};

const PARTIAL_SUFFIX: &str = "partial";

/// Filesystem-backed [`BlobStore`].
///
/// Uploads land in a hidden partial file first and are hard-linked into
/// place, so readers never observe a half-written snapshot and an existing
/// object is never replaced. Content types are not persisted.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: Utf8PathBuf,
    dir: Arc<Dir>,
}

impl FsBlobStore {
    /// Opens a store rooted at `root`, creating the directory when missing.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Backend`] when the directory cannot be
    /// created or opened.
    pub fn open(root: impl AsRef<Utf8Path>) -> BlobStoreResult<Self> {
        let root_path = root.as_ref().to_owned();
        Dir::create_ambient_dir_all(&root_path, ambient_authority())
            .map_err(BlobStoreError::backend)?;
        let dir = Dir::open_ambient_dir(&root_path, ambient_authority())
            .map_err(BlobStoreError::backend)?;
        Ok(Self {
            root: root_path,
            dir: Arc::new(dir),
        })
    }

    /// Returns the root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    async fn run_blocking<F, T>(&self, f: F) -> BlobStoreResult<T>
    where
        F: FnOnce(&Dir) -> BlobStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let dir = Arc::clone(&self.dir);
        tokio::task::spawn_blocking(move || f(&dir))
            .await
            .map_err(BlobStoreError::backend)?
    }
}

/// Validates a blob name and converts it to a relative path.
fn blob_path(name: &str) -> BlobStoreResult<Utf8PathBuf> {
    let invalid = || BlobStoreError::InvalidName(name.to_owned());
    if name.is_empty() || name.starts_with('/') || name.contains('\\') {
        return Err(invalid());
    }
    let mut path = Utf8PathBuf::new();
    for segment in name.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.starts_with('.') {
            return Err(invalid());
        }
        path.push(segment);
    }
    Ok(path)
}

/// Splits a listing prefix into the directory to scan and the file-name
/// prefix to match inside it.
fn split_prefix(prefix: &str) -> BlobStoreResult<(Option<Utf8PathBuf>, String)> {
    prefix.rsplit_once('/').map_or_else(
        || Ok((None, prefix.to_owned())),
        |(directory, file_prefix)| Ok((Some(blob_path(directory)?), file_prefix.to_owned())),
    )
}

fn not_found_as<T>(err: io::Error, value: T) -> io::Result<T> {
    if err.kind() == io::ErrorKind::NotFound {
        Ok(value)
    } else {
        Err(err)
    }
}

/// Publishes `bytes` at `path` only if nothing is there yet. Linking fails
/// with `AlreadyExists` when the target is taken.
fn write_once(dir: &Dir, path: &Utf8Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().filter(|candidate| !candidate.as_str().is_empty());
    if let Some(parent_dir) = parent {
        dir.create_dir_all(parent_dir)?;
    }
    let file_name = path.file_name().unwrap_or_default();
    let partial_name = format!(".{file_name}.{}.{PARTIAL_SUFFIX}", Uuid::new_v4());
    let partial = parent.map_or_else(
        || Utf8PathBuf::from(&partial_name),
        |parent_dir| parent_dir.join(&partial_name),
    );

    dir.write(&partial, bytes)?;
    let linked = dir.hard_link(&partial, dir, path);
    let _cleanup = dir.remove_file(&partial);
    linked
}

fn list_directory(
    dir: &Dir,
    directory: Option<&Utf8Path>,
    file_prefix: &str,
) -> io::Result<Vec<String>> {
    let scanned = match directory {
        Some(path) => match dir.open_dir(path) {
            Ok(opened) => opened,
            Err(err) => return not_found_as(err, Vec::new()),
        },
        None => dir.try_clone()?,
    };

    let mut names = Vec::new();
    for item in scanned.entries()? {
        let entry = item?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name()?;
        if file_name.starts_with('.') || !file_name.starts_with(file_prefix) {
            continue;
        }
        names.push(
            directory
                .map(|path| format!("{path}/{file_name}"))
                .unwrap_or(file_name),
        );
    }
    names.sort_unstable();
    Ok(names)
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, name: &str, bytes: Vec<u8>, _content_type: &str) -> BlobStoreResult<()> {
        let path = blob_path(name)?;
        let owned_name = name.to_owned();
        self.run_blocking(move |dir| {
            write_once(dir, &path, &bytes).map_err(|err| {
                if err.kind() == io::ErrorKind::AlreadyExists {
                    BlobStoreError::AlreadyExists(owned_name)
                } else {
                    BlobStoreError::backend(err)
                }
            })
        })
        .await
    }

    async fn download(&self, name: &str) -> BlobStoreResult<Vec<u8>> {
        let path = blob_path(name)?;
        let owned_name = name.to_owned();
        self.run_blocking(move |dir| {
            dir.read(&path).map_err(|err| {
                if err.kind() == io::ErrorKind::NotFound {
                    BlobStoreError::NotFound(owned_name)
                } else {
                    BlobStoreError::backend(err)
                }
            })
        })
        .await
    }

    async fn list(&self, prefix: &str) -> BlobStoreResult<Vec<String>> {
        let (directory, file_prefix) = split_prefix(prefix)?;
        self.run_blocking(move |dir| {
            list_directory(dir, directory.as_deref(), &file_prefix)
                .map_err(BlobStoreError::backend)
        })
        .await
    }

    async fn delete(&self, name: &str) -> BlobStoreResult<()> {
        let path = blob_path(name)?;
        self.run_blocking(move |dir| {
            match dir.remove_file(&path) {
                Ok(()) => Ok(()),
                Err(err) => not_found_as(err, ()),
            }
            .map_err(BlobStoreError::backend)
        })
        .await
    }

    async fn exists(&self, name: &str) -> BlobStoreResult<bool> {
        let path = blob_path(name)?;
        self.run_blocking(move |dir| {
            match dir.metadata(&path) {
                Ok(metadata) => Ok(metadata.is_file()),
                Err(err) => not_found_as(err, false),
            }
            .map_err(BlobStoreError::backend)
        })
        .await
    }
}
