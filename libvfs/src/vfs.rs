//! The handle table.
//!
//! One `Mutex` covers the whole table and every attached stream. Open, Create,
//! Read, Write and Close each hold it for their full read-modify-write, so at
//! most one of them runs at a time across all handles.

use std::collections::HashMap;
use std::io::{self, Seek, Write};
use std::path::{Component, Path};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, instrument, warn};

use crate::config::VfsConfig;
use crate::error::{Result, VfsError};
use crate::handle::{FileEntry, FileHandle, ReadOutcome, StreamKind, StreamState, read_full};
use crate::hostfs::HostFs;
use crate::hostfs::localfs::LocalFs;

static NEXT_VFS_ID: AtomicU64 = AtomicU64::new(1);

/// File operations offered by a virtual filesystem.
pub trait Vfs: Send + Sync {
    /// Attach a read stream to a name previously created through this VFS.
    fn open(&self, name: &str) -> Result<FileHandle>;

    /// Register `name` and attach a write stream, or hand back the existing
    /// handle when the name is already known and not open for read.
    fn create(&self, name: &str) -> Result<FileHandle>;

    /// Read up to `buf.len()` bytes. Returns 0 at end of stream, when no
    /// stream is attached, and when the stream is open for write; use
    /// [`Vfs::read_tagged`] to tell them apart.
    fn read(&self, handle: &FileHandle, buf: &mut [u8]) -> Result<usize>;

    /// Like [`Vfs::read`], but reports why nothing was read.
    fn read_tagged(&self, handle: &FileHandle, buf: &mut [u8]) -> Result<ReadOutcome>;

    /// Write all of `buf` and return the stream position afterwards, which is
    /// cumulative across writes. Returns 0 when no stream is attached or the
    /// stream is open for read.
    fn write(&self, handle: &FileHandle, buf: &[u8]) -> Result<u64>;

    /// Flush and detach the stream, if any.
    fn close(&self, handle: &FileHandle) -> Result<()>;
}

pub struct VirtualFileSystem<H: HostFs> {
    id: u64,
    host: H,
    create_parent_dirs: bool,
    files: Mutex<HashMap<String, FileEntry<H::Stream>>>,
}

impl VirtualFileSystem<LocalFs> {
    pub fn from_config(cfg: &VfsConfig) -> Self {
        Self::new(cfg.host()).with_parent_dirs(cfg.create_parent_dirs)
    }
}

impl<H: HostFs> VirtualFileSystem<H> {
    pub fn new(host: H) -> Self {
        Self {
            id: NEXT_VFS_ID.fetch_add(1, Ordering::Relaxed),
            host,
            create_parent_dirs: true,
            files: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `create` makes missing parent directories before attaching.
    pub fn with_parent_dirs(mut self, enabled: bool) -> Self {
        self.create_parent_dirs = enabled;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn state(&self, handle: &FileHandle) -> Result<StreamKind> {
        let mut files = self.lock();
        let entry = self.entry_mut(&mut files, handle)?;
        Ok(entry.stream.kind())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Every transition finishes before any host call that could panic, so a
    // poisoned table is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, FileEntry<H::Stream>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry_mut<'a>(
        &self,
        files: &'a mut HashMap<String, FileEntry<H::Stream>>,
        handle: &FileHandle,
    ) -> Result<&'a mut FileEntry<H::Stream>> {
        if handle.vfs_id() != self.id {
            return Err(VfsError::ForeignHandle {
                name: handle.name().to_string(),
            });
        }
        files
            .get_mut(handle.name())
            .ok_or_else(|| VfsError::NotFound {
                name: handle.name().to_string(),
            })
    }
}

// Names stay relative to the host root: no absolute paths, no `..`.
fn validate_name(name: &str) -> Result<()> {
    let path = Path::new(name);
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::RootDir | Component::Prefix(_) | Component::ParentDir
        )
    });
    if name.is_empty() || escapes {
        return Err(VfsError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl<H: HostFs> Vfs for VirtualFileSystem<H> {
    #[instrument(level = "debug", skip(self))]
    fn open(&self, name: &str) -> Result<FileHandle> {
        validate_name(name)?;
        let mut files = self.lock();
        let Some(entry) = files.get_mut(name) else {
            debug!("open on unknown name");
            return Err(VfsError::NotFound {
                name: name.to_string(),
            });
        };
        if entry.stream.is_attached() {
            warn!(state = %entry.stream.kind(), "stream already attached");
            return Err(VfsError::AlreadyOpen {
                name: name.to_string(),
            });
        }
        let stream = self.host.open_read(name).map_err(|source| {
            warn!("attach read stream failed: {source}");
            VfsError::OpenFailed {
                name: name.to_string(),
                source,
            }
        })?;
        entry.stream = StreamState::OpenForRead(stream);
        debug!("attached read stream");
        Ok(entry.handle.clone())
    }

    #[instrument(level = "debug", skip(self))]
    fn create(&self, name: &str) -> Result<FileHandle> {
        validate_name(name)?;
        let mut files = self.lock();
        if let Some(entry) = files.get(name) {
            return match entry.stream.kind() {
                StreamKind::Read => {
                    warn!("create rejected, stream is open for read");
                    Err(VfsError::ConflictingMode {
                        name: name.to_string(),
                        state: StreamKind::Read,
                    })
                }
                StreamKind::Closed | StreamKind::Write => Ok(entry.handle.clone()),
            };
        }

        let open_failed = |source: io::Error| {
            warn!("attach write stream failed: {source}");
            VfsError::OpenFailed {
                name: name.to_string(),
                source,
            }
        };
        if self.create_parent_dirs {
            self.host.create_parent_dirs(name).map_err(open_failed)?;
        }
        let stream = self.host.open_write(name).map_err(open_failed)?;

        let handle = FileHandle::new(self.id, name);
        files.insert(
            name.to_string(),
            FileEntry {
                handle: handle.clone(),
                stream: StreamState::OpenForWrite(stream),
            },
        );
        debug!("registered and attached write stream");
        Ok(handle)
    }

    fn read(&self, handle: &FileHandle, buf: &mut [u8]) -> Result<usize> {
        match self.read_tagged(handle, buf)? {
            ReadOutcome::Data(n) => Ok(n),
            ReadOutcome::NotAttached | ReadOutcome::EndOfStream | ReadOutcome::WrongMode => Ok(0),
        }
    }

    #[instrument(level = "debug", skip(self, handle, buf), fields(file = %handle, len = buf.len()))]
    fn read_tagged(&self, handle: &FileHandle, buf: &mut [u8]) -> Result<ReadOutcome> {
        let mut files = self.lock();
        let entry = self.entry_mut(&mut files, handle)?;
        match &mut entry.stream {
            StreamState::Closed => {
                debug!("read on detached handle");
                Ok(ReadOutcome::NotAttached)
            }
            StreamState::OpenForWrite(_) => {
                debug!("read on stream open for write");
                Ok(ReadOutcome::WrongMode)
            }
            StreamState::OpenForRead(stream) => {
                let n = read_full(stream, buf)?;
                if n == 0 && !buf.is_empty() {
                    Ok(ReadOutcome::EndOfStream)
                } else {
                    Ok(ReadOutcome::Data(n))
                }
            }
        }
    }

    #[instrument(level = "debug", skip(self, handle, buf), fields(file = %handle, len = buf.len()))]
    fn write(&self, handle: &FileHandle, buf: &[u8]) -> Result<u64> {
        let mut files = self.lock();
        let entry = self.entry_mut(&mut files, handle)?;
        match &mut entry.stream {
            StreamState::Closed => {
                debug!("write on detached handle");
                Ok(0)
            }
            StreamState::OpenForRead(_) => {
                debug!("write on stream open for read");
                Ok(0)
            }
            StreamState::OpenForWrite(stream) => {
                stream.write_all(buf)?;
                Ok(stream.stream_position()?)
            }
        }
    }

    #[instrument(level = "debug", skip(self, handle), fields(file = %handle))]
    fn close(&self, handle: &FileHandle) -> Result<()> {
        let mut files = self.lock();
        let entry = self.entry_mut(&mut files, handle)?;
        let was = entry.stream.kind();
        entry.stream.detach()?;
        if was != StreamKind::Closed {
            debug!(was = %was, "detached stream");
        }
        Ok(())
    }
}

impl<H: HostFs> Drop for VirtualFileSystem<H> {
    fn drop(&mut self) {
        let files = self.files.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (name, entry) in files.iter_mut() {
            if let Err(e) = entry.stream.detach() {
                warn!("flush of {name} failed during teardown: {e}");
            }
        }
    }
}
