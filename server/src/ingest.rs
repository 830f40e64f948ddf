use std::io::{self, Cursor};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::fs::OpenOptions;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::allocator::IdAllocator;
use crate::domain::IngestionError;
use crate::sniff::{self, MediaType};
use crate::storage::StorageDir;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// A file accepted into the storage directory.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub id: u64,
    pub name: String,
    pub path: PathBuf,
    pub media: MediaType,
    pub size: u64,
    pub blake3_hash: String,
}

/// Validates uploaded files and writes them into the storage directory
/// under `<basename>(<id>)<extension>`.
#[derive(Debug, Clone)]
pub struct Pipeline {
    ids: Arc<IdAllocator>,
    storage: StorageDir,
}

impl Pipeline {
    #[must_use]
    pub fn new(ids: Arc<IdAllocator>, storage: StorageDir) -> Self {
        Self { ids, storage }
    }

    #[must_use]
    pub fn allocator(&self) -> &IdAllocator {
        &self.ids
    }

    #[must_use]
    pub fn storage(&self) -> &StorageDir {
        &self.storage
    }

    /// Ingests one uploaded file.
    ///
    /// An empty file cannot be read at all and fails like a broken read.
    /// The id is taken before the content is validated, so a rejected file
    /// still consumes one. Nothing is created on disk unless the sniffed type
    /// is allowed. On copy failure the half written file is removed.
    pub async fn ingest<R>(
        &self,
        mut source: R,
        client_filename: &str,
    ) -> Result<StoredFile, IngestionError>
    where
        R: AsyncRead + Unpin,
    {
        let start = Instant::now();
        let id = self.ids.next_id();

        let head = sniff::read_head(&mut source)
            .await
            .and_then(|head| {
                if head.is_empty() {
                    Err(io::Error::new(io::ErrorKind::UnexpectedEof, "file is empty"))
                } else {
                    Ok(head)
                }
            })
            .map_err(|source| IngestionError::ReadFailed {
                file_name: client_filename.to_owned(),
                source,
            })?;
        let media = sniff::sniff(&head);
        if !media.is_allowed() {
            tracing::warn!("file: {client_filename} id: {id} rejected. Content type: {media}");
            return Err(IngestionError::UnsupportedMediaType {
                file_name: client_filename.to_owned(),
                media,
            });
        }

        let (base, extension) = split_file_name(client_filename);
        let name = format!("{base}({id}){extension}");
        let create_failed = |source| IngestionError::CreateFailed {
            file_name: client_filename.to_owned(),
            source,
        };
        self.storage.ensure().await.map_err(create_failed)?;
        let path = self.storage.path().join(&name);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(create_failed)?;

        // The head was consumed by sniffing, replay it in front of the rest.
        let mut content = Cursor::new(head).chain(source);
        let copied = copy_hashed(&mut content, &mut file).await;
        drop(file);
        let (size, hash) = match copied {
            Ok(r) => r,
            Err(source) => {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    tracing::error!("partial file '{}' not removed. Error: {e}", path.display());
                }
                return Err(IngestionError::CopyFailed {
                    file_name: client_filename.to_owned(),
                    source,
                });
            }
        };

        let blake3_hash = hash.to_hex().to_string();
        tracing::info!(
            "file: {client_filename} stored as: {name} read: {size} type: {media} blake3: {blake3_hash} in {:?}",
            start.elapsed()
        );
        Ok(StoredFile {
            id,
            name,
            path,
            media,
            size,
            blake3_hash,
        })
    }
}

/// Splits a client supplied file name into base name and extension.
///
/// Any directory part is dropped, so names like `../../x.png` cannot leave
/// the storage directory. The extension starts at the last dot and keeps it.
#[must_use]
pub fn split_file_name(client_filename: &str) -> (&str, &str) {
    let name = match client_filename.rfind(['\\', '/']) {
        Some(ix) => &client_filename[ix + 1..],
        None => client_filename,
    };
    match name.rfind('.') {
        Some(ix) => name.split_at(ix),
        None => (name, ""),
    }
}

async fn copy_hashed<R, W>(reader: &mut R, writer: &mut W) -> io::Result<(u64, blake3::Hash)>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total: u64 = 0;
    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        writer.write_all(&buffer[..n]).await?;
        total += n as u64;
    }
    writer.flush().await?;
    Ok((total, hasher.finalize()))
}
