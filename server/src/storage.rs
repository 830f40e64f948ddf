use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use kernel::ImageEntry;
use tokio_util::io::{ReaderStream, SyncIoBridge};
use zip::write::SimpleFileOptions;

use crate::domain::ManageError;

/// Capacity of the in-memory pipe between the zip writer and the response body.
const ARCHIVE_PIPE_SIZE: usize = 64 * 1024;

/// Zip archive bytes, produced while the response is being sent.
pub type ArchiveStream = BoxStream<'static, io::Result<Bytes>>;

/// The flat directory every accepted upload lands in.
///
/// It may not exist yet: it is created by the first upload and removed
/// wholesale on delete. A missing directory reads as empty.
#[derive(Debug, Clone)]
pub struct StorageDir {
    root: Arc<PathBuf>,
}

impl StorageDir {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.root.as_path()
    }

    /// Creates the directory if absent. Concurrent callers all succeed.
    pub async fn ensure(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(self.path()).await
    }

    /// Checks that the directory can be read. Not existing yet is fine.
    pub async fn probe(&self) -> Result<(), ManageError> {
        match tokio::fs::read_dir(self.path()).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ManageError::DirectoryUnreadable(e)),
        }
    }

    /// Regular files in the directory, sorted by name.
    pub async fn list(&self) -> Result<Vec<ImageEntry>, ManageError> {
        let mut rd = match tokio::fs::read_dir(self.path()).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ManageError::ListFailed(e)),
        };
        let mut entries = Vec::new();
        while let Some(entry) = rd.next_entry().await.map_err(ManageError::ListFailed)? {
            let meta = entry.metadata().await.map_err(ManageError::ListFailed)?;
            if !meta.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push(ImageEntry::new(name, meta.len()));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Streams every listed file as a zip archive.
    ///
    /// Sources are checked up front so an unreadable file is reported before
    /// any byte is sent. Failures after that end the stream with an error.
    pub async fn archive(&self) -> Result<ArchiveStream, ManageError> {
        let entries = self.list().await?;
        for entry in &entries {
            tokio::fs::File::open(self.path().join(&entry.name))
                .await
                .map_err(|source| ManageError::ZipSourceUnreadable {
                    name: entry.name.clone(),
                    source,
                })?;
        }
        tracing::debug!("zipping {} files from {}", entries.len(), self.path().display());

        let (reader, writer) = tokio::io::duplex(ARCHIVE_PIPE_SIZE);
        let sink = SyncIoBridge::new(writer);
        let root = Arc::clone(&self.root);
        let task = tokio::task::spawn_blocking(move || zip_entries(&root, &entries, sink));

        let outcome = stream::once(async move {
            let error = match task.await {
                Ok(Ok(())) => return None,
                Ok(Err(e)) => io::Error::other(e.to_string()),
                Err(e) => io::Error::other(e),
            };
            tracing::error!("archive aborted. Error: {error}");
            Some(Err::<Bytes, _>(error))
        })
        .filter_map(futures::future::ready);

        Ok(ReaderStream::new(reader).chain(outcome).boxed())
    }

    /// Removes the directory and everything in it.
    pub async fn clear(&self) -> Result<(), ManageError> {
        match tokio::fs::remove_dir_all(self.path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ManageError::DeleteFailed(e)),
        }
    }
}

fn zip_entries<W: Write>(root: &Path, entries: &[ImageEntry], sink: W) -> Result<(), ManageError> {
    let mut zip = zip::ZipWriter::new_stream(sink);
    let options = SimpleFileOptions::default().unix_permissions(0o644);

    for entry in entries {
        let mut source = std::fs::File::open(root.join(&entry.name)).map_err(|source| {
            ManageError::ZipSourceUnreadable {
                name: entry.name.clone(),
                source,
            }
        })?;
        zip.start_file(entry.name.as_str(), options)
            .map_err(|source| ManageError::ZipEntryCreateFailed {
                name: entry.name.clone(),
                source,
            })?;
        io::copy(&mut source, &mut zip).map_err(|source| ManageError::ZipSourceUnreadable {
            name: entry.name.clone(),
            source,
        })?;
    }

    zip.finish()
        .map(drop)
        .map_err(|source| ManageError::ZipEntryCreateFailed {
            name: String::new(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::io::{Cursor, Read};

    async fn collect(stream: ArchiveStream) -> Vec<u8> {
        stream.map_ok(|b| b.to_vec()).try_concat().await.unwrap()
    }

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("picdrop_storage_{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        // Arrange
        let storage = StorageDir::new(temp_root());

        // Act
        let listed = storage.list().await.unwrap();
        let probed = storage.probe().await;

        // Assert
        assert!(listed.is_empty());
        assert!(probed.is_ok());
    }

    #[tokio::test]
    async fn ensure_is_idempotent_under_concurrency() {
        // Arrange
        let root = temp_root().join("nested").join("deeper");
        let storage = StorageDir::new(&root);

        // Act
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let storage = storage.clone();
                tokio::spawn(async move { storage.ensure().await })
            })
            .collect();
        let mut results = Vec::new();
        for t in tasks {
            results.push(t.await.unwrap());
        }

        // Assert
        assert!(results.iter().all(Result::is_ok));
        assert!(root.is_dir());
        std::fs::remove_dir_all(root.parent().unwrap().parent().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn list_sorted_files_only() {
        // Arrange
        let root = temp_root();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("b(2).png"), b"bb").unwrap();
        std::fs::write(root.join("a(1).png"), b"a").unwrap();
        let storage = StorageDir::new(&root);

        // Act
        let listed = storage.list().await.unwrap();

        // Assert
        assert_eq!(
            listed,
            vec![
                ImageEntry::new("a(1).png".into(), 1),
                ImageEntry::new("b(2).png".into(), 2),
            ]
        );
        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn archive_contains_every_file() {
        // Arrange
        let root = temp_root();
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("A"), b"first").unwrap();
        std::fs::write(root.join("B"), b"second").unwrap();
        let storage = StorageDir::new(&root);

        // Act
        let bytes = collect(storage.archive().await.unwrap()).await;

        // Assert
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        for (name, expected) in [("A", &b"first"[..]), ("B", &b"second"[..])] {
            let mut file = archive.by_name(name).unwrap();
            let mut content = Vec::new();
            file.read_to_end(&mut content).unwrap();
            assert_eq!(content, expected);
        }
        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn archive_of_missing_directory_is_empty() {
        // Arrange
        let storage = StorageDir::new(temp_root());

        // Act
        let bytes = collect(storage.archive().await.unwrap()).await;

        // Assert
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }

    #[tokio::test]
    async fn clear_removes_directory_and_tolerates_absence() {
        // Arrange
        let root = temp_root();
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("x(1).png"), b"x").unwrap();
        let storage = StorageDir::new(&root);

        // Act
        let first = storage.clear().await;
        let second = storage.clear().await;

        // Assert
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn archive_larger_than_pipe_arrives_in_chunks() {
        // Arrange
        let root = temp_root();
        std::fs::create_dir_all(&root).unwrap();
        let content: Vec<u8> = (0..4 * ARCHIVE_PIPE_SIZE as u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(root.join("big(1).png"), &content).unwrap();
        let storage = StorageDir::new(&root);

        // Act
        let chunks: Vec<Bytes> = storage.archive().await.unwrap().try_collect().await.unwrap();

        // Assert
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= ARCHIVE_PIPE_SIZE));
        let bytes: Vec<u8> = chunks.concat();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name("big(1).png").unwrap();
        let mut unpacked = Vec::new();
        file.read_to_end(&mut unpacked).unwrap();
        assert!(unpacked == content);
        std::fs::remove_dir_all(root).unwrap();
    }
}
