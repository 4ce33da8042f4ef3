//! Single-file node store with content-addressed storage
//!
//! File format:
//! ```text
//! [HEADER: 64 bytes]
//!   - magic: 8 bytes ("DAGSTORE")
//!   - version: 4 bytes (u32 LE)
//!   - flags: 4 bytes
//!   - object_count: 8 bytes (u64 LE)
//!   - index_offset: 8 bytes (u64 LE)
//!   - pins_offset: 8 bytes (u64 LE)
//!   - pins_count: 8 bytes (u64 LE)
//!   - reserved: 16 bytes
//!
//! [OBJECTS: variable]
//!   - blob data, concatenated
//!
//! [INDEX: variable]
//!   - sorted array of (hash_len u8, multihash, offset u64, size u32)
//!
//! [PINS: variable]
//!   - sorted array of (hash_len u8, multihash)
//! ```

use super::blob::Blob;
use super::traits::{validate_label, ContentAddressedStorage};
use super::walk::reachable;
use crate::model::{MerkleNode, Multihash, WriterKey};
use crate::{Error, Result, MAGIC, VERSION};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const HEADER_SIZE: u64 = 64;

/// Index entry for an object
#[derive(Clone, Debug)]
struct IndexEntry {
    offset: u64,
    size: u32,
}

/// State shared between the async handle and blocking workers
struct Inner {
    path: PathBuf,
    file: RwLock<File>,
    index: RwLock<HashMap<Multihash, IndexEntry>>,
    /// Recursive pin roots
    pins: RwLock<BTreeSet<Multihash>>,
    /// Current append position
    write_offset: RwLock<u64>,
}

/// A content-addressed node store backed by a single file
///
/// File I/O runs on tokio's blocking pool; the async methods never block
/// the executor. Cloning the handle shares the same open file.
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<Inner>,
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

fn read_hash(file: &mut File) -> Result<Multihash> {
    let mut len = [0u8; 1];
    file.read_exact(&mut len)?;
    let mut bytes = vec![0u8; len[0] as usize];
    file.read_exact(&mut bytes)?;
    Multihash::from_bytes(&bytes).map_err(|e| Error::Corruption(e.to_string()))
}

fn write_hash(file: &mut File, hash: &Multihash) -> Result<()> {
    let bytes = hash.to_bytes();
    file.write_all(&[bytes.len() as u8])?;
    file.write_all(&bytes)?;
    Ok(())
}

/// Index entries record sizes as u32
fn blob_size(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::ObjectTooLarge(len))
}

impl FileStore {
    /// Create a new store file, truncating any existing one
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        let mut header = [0u8; HEADER_SIZE as usize];
        header[0..8].copy_from_slice(MAGIC);
        header[8..12].copy_from_slice(&VERSION.to_le_bytes());
        file.write_all(&header)?;
        file.sync_all()?;

        info!(path = %path.display(), "created store file");

        Ok(FileStore {
            inner: Arc::new(Inner {
                path,
                file: RwLock::new(file),
                index: RwLock::new(HashMap::new()),
                pins: RwLock::new(BTreeSet::new()),
                write_offset: RwLock::new(HEADER_SIZE),
            }),
        })
    }

    /// Open an existing store file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)
            .map_err(|_| Error::InvalidFile("File too short for header".into()))?;

        if &header[0..8] != MAGIC {
            return Err(Error::InvalidFile("Invalid magic bytes".into()));
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&header[8..12]);
        let version = u32::from_le_bytes(version);
        if version != VERSION {
            return Err(Error::VersionMismatch {
                expected: VERSION,
                found: version,
            });
        }

        let object_count = read_u64(&header, 16);
        let index_offset = read_u64(&header, 24);
        let pins_offset = read_u64(&header, 32);
        let pins_count = read_u64(&header, 40);

        let mut index = HashMap::new();
        if index_offset > 0 && object_count > 0 {
            file.seek(SeekFrom::Start(index_offset))?;
            for _ in 0..object_count {
                let hash = read_hash(&mut file)?;
                let mut entry_buf = [0u8; 12];
                file.read_exact(&mut entry_buf)?;

                let offset = read_u64(&entry_buf, 0);
                let mut size = [0u8; 4];
                size.copy_from_slice(&entry_buf[8..12]);
                let size = u32::from_le_bytes(size);

                index.insert(hash, IndexEntry { offset, size });
            }
        }

        let mut pins = BTreeSet::new();
        if pins_offset > 0 && pins_count > 0 {
            file.seek(SeekFrom::Start(pins_offset))?;
            for _ in 0..pins_count {
                pins.insert(read_hash(&mut file)?);
            }
        }

        // New objects overwrite the old index; sync rewrites it after them
        let write_offset = if index_offset > 0 {
            index_offset
        } else {
            file.seek(SeekFrom::End(0))?
        };

        debug!(path = %path.display(), objects = index.len(), pins = pins.len(), "opened store file");

        Ok(FileStore {
            inner: Arc::new(Inner {
                path,
                file: RwLock::new(file),
                index: RwLock::new(index),
                pins: RwLock::new(pins),
                write_offset: RwLock::new(write_offset),
            }),
        })
    }

    /// Open or create a store file
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Check if an address is stored
    pub fn contains(&self, hash: &Multihash) -> bool {
        self.inner.contains(hash)
    }

    /// Get the number of objects in the store
    pub fn object_count(&self) -> usize {
        self.inner.index.read().len()
    }

    /// Whether `hash` is a recursive pin root
    pub fn is_pinned(&self, hash: &Multihash) -> bool {
        self.inner.pins.read().contains(hash)
    }

    /// All recursive pin roots
    pub fn pins(&self) -> Vec<Multihash> {
        self.inner.pins.read().iter().copied().collect()
    }

    /// Flush changes and write index and pins to disk
    pub fn sync(&self) -> Result<()> {
        self.inner.sync()
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Run blocking file work off the async executor
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&*inner))
            .await
            .map_err(|e| Error::BackendUnavailable(format!("store worker failed: {}", e)))?
    }
}

impl Inner {
    fn contains(&self, hash: &Multihash) -> bool {
        self.index.read().contains_key(hash)
    }

    /// Store a node, returns its address
    fn put(&self, node: &MerkleNode) -> Result<Multihash> {
        let hash = node.content_hash();

        if self.contains(&hash) {
            return Ok(hash);
        }

        let stored = Blob::from_node(node).compress()?;
        let size = blob_size(stored.len())?;

        let offset = {
            let mut write_offset = self.write_offset.write();
            let offset = *write_offset;

            let mut file = self.file.write();
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(&stored)?;

            *write_offset = offset + size as u64;
            offset
        };

        self.index.write().insert(hash, IndexEntry { offset, size });
        debug!(%hash, offset, size, "appended node");
        Ok(hash)
    }

    /// Retrieve a node by address
    fn get(&self, hash: &Multihash) -> Result<Option<MerkleNode>> {
        let entry = match self.index.read().get(hash).cloned() {
            Some(entry) => entry,
            None => return Ok(None),
        };

        let mut data = vec![0u8; entry.size as usize];
        {
            let mut file = self.file.write();
            file.seek(SeekFrom::Start(entry.offset))?;
            file.read_exact(&mut data)?;
        }

        let node = Blob::decompress(&data)?.to_node()?;
        if node.content_hash() != *hash {
            return Err(Error::Corruption(format!("content of {} does not match", hash)));
        }
        Ok(Some(node))
    }

    fn require(&self, hash: &Multihash) -> Result<MerkleNode> {
        self.get(hash)?
            .ok_or_else(|| Error::NotFound(hash.to_string()))
    }

    fn pin(&self, hash: &Multihash) -> Result<bool> {
        if reachable(hash, |h| self.get(h))?.is_none() {
            return Ok(false);
        }
        self.pins.write().insert(*hash);
        Ok(true)
    }

    fn unpin(&self, hash: &Multihash) -> Result<bool> {
        Ok(self.pins.write().remove(hash))
    }

    fn sync(&self) -> Result<()> {
        let index = self.index.read();
        let pins = self.pins.read();
        let write_offset = *self.write_offset.read();
        let mut file = self.file.write();

        file.seek(SeekFrom::Start(write_offset))?;

        // Sort by hash for determinism
        let mut entries: Vec<_> = index.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));

        for (hash, entry) in entries {
            write_hash(&mut file, hash)?;
            file.write_all(&entry.offset.to_le_bytes())?;
            file.write_all(&entry.size.to_le_bytes())?;
        }

        let pins_offset = file.stream_position()?;
        for hash in pins.iter() {
            write_hash(&mut file, hash)?;
        }

        let end = file.stream_position()?;
        file.set_len(end)?;

        file.seek(SeekFrom::Start(16))?;
        file.write_all(&(index.len() as u64).to_le_bytes())?;
        file.write_all(&write_offset.to_le_bytes())?;
        file.write_all(&pins_offset.to_le_bytes())?;
        file.write_all(&(pins.len() as u64).to_le_bytes())?;

        file.sync_all()?;
        Ok(())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Best-effort sync on drop
        let _ = self.sync();
    }
}

#[async_trait]
impl ContentAddressedStorage for FileStore {
    async fn create_empty(&self, _writer: &WriterKey) -> Result<Multihash> {
        self.blocking(|inner| inner.put(&MerkleNode::empty())).await
    }

    async fn set_data(
        &self,
        _writer: &WriterKey,
        base: &Multihash,
        data: &[u8],
    ) -> Result<Multihash> {
        let base = *base;
        let data = data.to_vec();
        self.blocking(move |inner| {
            let node = inner.require(&base)?.with_data(data);
            inner.put(&node)
        })
        .await
    }

    async fn add_link(
        &self,
        _writer: &WriterKey,
        base: &Multihash,
        label: &str,
        target: &Multihash,
    ) -> Result<Multihash> {
        validate_label(label)?;
        let (base, target, label) = (*base, *target, label.to_string());
        self.blocking(move |inner| {
            let node = inner.require(&base)?;
            if !inner.contains(&target) {
                return Err(Error::NotFound(target.to_string()));
            }
            inner.put(&node.with_link(label, target))
        })
        .await
    }

    async fn get_node(&self, hash: &Multihash) -> Result<Option<MerkleNode>> {
        let hash = *hash;
        self.blocking(move |inner| inner.get(&hash)).await
    }

    async fn put(&self, _writer: &WriterKey, node: &MerkleNode) -> Result<Multihash> {
        for label in node.links.keys() {
            validate_label(label)?;
        }
        let node = node.clone();
        self.blocking(move |inner| {
            if let Some(missing) = node.children().find(|h| !inner.contains(h)) {
                return Err(Error::NotFound(missing.to_string()));
            }
            inner.put(&node)
        })
        .await
    }

    async fn recursive_pin(&self, hash: &Multihash) -> Result<bool> {
        let hash = *hash;
        self.blocking(move |inner| inner.pin(&hash)).await
    }

    async fn recursive_unpin(&self, hash: &Multihash) -> Result<bool> {
        let hash = *hash;
        self.blocking(move |inner| inner.unpin(&hash)).await
    }
}
