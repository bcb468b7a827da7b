//! In-memory host: used for local development and tests.

use std::collections::{HashMap, HashSet};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::HostFs;

type Blob = Arc<Mutex<Vec<u8>>>;

#[derive(Default)]
struct Inner {
    files: HashMap<String, Blob>,
    dirs: HashSet<String>,
}

/// Flat name -> bytes store with a set of known directories.
///
/// `open_write` fails with `NotFound` when the parent directory was never
/// created, mirroring what the host does for a missing directory.
#[derive(Default)]
pub struct MemoryFs {
    inner: Mutex<Inner>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a file, creating its parent directories.
    pub fn insert(&self, name: &str, data: &[u8]) {
        let mut inner = self.lock();
        for dir in parent_dirs(name) {
            inner.dirs.insert(dir);
        }
        inner
            .files
            .insert(name.to_string(), Arc::new(Mutex::new(data.to_vec())));
    }

    /// Current bytes of `name`, if it exists.
    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        let inner = self.lock();
        let blob = inner.files.get(name)?;
        let data = blob.lock().unwrap_or_else(PoisonError::into_inner);
        Some(data.clone())
    }

    pub fn has_dir(&self, dir: &str) -> bool {
        self.lock().dirs.contains(dir)
    }

    /// Delete `name` from the host. Streams already attached keep their data.
    pub fn remove(&self, name: &str) -> bool {
        self.lock().files.remove(name).is_some()
    }
}

/// Every ancestor directory of `name`, outermost first.
fn parent_dirs(name: &str) -> Vec<String> {
    let mut dirs: Vec<String> = Path::new(name)
        .ancestors()
        .skip(1)
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    dirs.reverse();
    dirs
}

impl HostFs for MemoryFs {
    type Stream = MemoryStream;

    fn open_read(&self, name: &str) -> io::Result<MemoryStream> {
        let inner = self.lock();
        let blob = inner
            .files
            .get(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{name}: no such file")))?;
        Ok(MemoryStream::new(blob.clone()))
    }

    fn open_write(&self, name: &str) -> io::Result<MemoryStream> {
        let mut inner = self.lock();
        if let Some(parent) = parent_dirs(name).pop() {
            if !inner.dirs.contains(&parent) {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{parent}: no such directory"),
                ));
            }
        }
        let blob = inner.files.entry(name.to_string()).or_default().clone();
        blob.lock().unwrap_or_else(PoisonError::into_inner).clear();
        Ok(MemoryStream::new(blob))
    }

    fn create_parent_dirs(&self, name: &str) -> io::Result<()> {
        let mut inner = self.lock();
        for dir in parent_dirs(name) {
            inner.dirs.insert(dir);
        }
        Ok(())
    }
}

/// Cursor over a shared in-memory file.
pub struct MemoryStream {
    data: Blob,
    pos: u64,
}

impl MemoryStream {
    fn new(data: Blob) -> Self {
        Self { data, pos: 0 }
    }

    fn data(&self) -> MutexGuard<'_, Vec<u8>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = {
            let data = self.data();
            let start = (self.pos as usize).min(data.len());
            let n = buf.len().min(data.len() - start);
            buf[..n].copy_from_slice(&data[start..start + n]);
            n
        };
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        {
            let mut data = self.data();
            let start = self.pos as usize;
            let end = start + buf.len();
            if data.len() < end {
                data.resize(end, 0);
            }
            data[start..end].copy_from_slice(buf);
        }
        self.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, offset) = match pos {
            SeekFrom::Start(n) => {
                self.pos = n;
                return Ok(n);
            }
            SeekFrom::End(off) => (self.data().len() as u64, off),
            SeekFrom::Current(off) => (self.pos, off),
        };
        match base.checked_add_signed(offset) {
            Some(n) => {
                self.pos = n;
                Ok(n)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
