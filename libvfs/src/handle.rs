//! Handle tokens and the per-name stream state kept in the VFS table.

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

/// Token for one named file known to a [`VirtualFileSystem`].
///
/// The token does not own the stream; the VFS table does. Cloning is cheap and
/// two tokens for the same name from the same VFS compare equal.
///
/// [`VirtualFileSystem`]: crate::vfs::VirtualFileSystem
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileHandle {
    vfs_id: u64,
    name: Arc<str>,
}

impl FileHandle {
    pub(crate) fn new(vfs_id: u64, name: &str) -> Self {
        Self {
            vfs_id,
            name: Arc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn vfs_id(&self) -> u64 {
        self.vfs_id
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Observable attachment state of a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    Closed,
    Read,
    Write,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamKind::Closed => "closed",
            StreamKind::Read => "open for read",
            StreamKind::Write => "open for write",
        };
        f.write_str(s)
    }
}

/// Result of [`Vfs::read_tagged`](crate::vfs::Vfs::read_tagged), which keeps
/// apart the cases that a plain `read` reports as 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Data(usize),
    NotAttached,
    EndOfStream,
    /// The attached stream is open for write.
    WrongMode,
}

/// Stream attachment. The native stream lives inside the variant, so the
/// state can never claim an attachment that does not exist.
pub(crate) enum StreamState<S> {
    Closed,
    OpenForRead(S),
    OpenForWrite(S),
}

impl<S> StreamState<S> {
    pub(crate) fn kind(&self) -> StreamKind {
        match self {
            StreamState::Closed => StreamKind::Closed,
            StreamState::OpenForRead(_) => StreamKind::Read,
            StreamState::OpenForWrite(_) => StreamKind::Write,
        }
    }

    pub(crate) fn is_attached(&self) -> bool {
        !matches!(self, StreamState::Closed)
    }
}

impl<S: Write> StreamState<S> {
    /// Drop the attached stream, flushing it first when it was opened for
    /// write. The state is `Closed` afterwards even if the flush fails.
    pub(crate) fn detach(&mut self) -> io::Result<()> {
        match std::mem::replace(self, StreamState::Closed) {
            StreamState::OpenForWrite(mut stream) => stream.flush(),
            StreamState::OpenForRead(_) | StreamState::Closed => Ok(()),
        }
    }
}

/// One row of the VFS table.
pub(crate) struct FileEntry<S> {
    pub(crate) handle: FileHandle,
    pub(crate) stream: StreamState<S>,
}

/// Fill `buf` from `reader` until it is full or the reader is exhausted.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// Reader that hands out at most `chunk` bytes per call.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_read_full_collects_short_reads() {
        let mut reader = Trickle {
            data: b"hello world".to_vec(),
            pos: 0,
            chunk: 3,
        };
        let mut buf = [0u8; 8];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 8);
        assert_eq!(&buf, b"hello wo");
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"rld");
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_detach_resets_state() {
        let mut state = StreamState::OpenForWrite(Cursor::new(Vec::<u8>::new()));
        assert_eq!(state.kind(), StreamKind::Write);
        assert!(state.is_attached());
        state.detach().unwrap();
        assert_eq!(state.kind(), StreamKind::Closed);
        assert!(!state.is_attached());
        // second detach is a no-op
        state.detach().unwrap();
    }

    #[test]
    fn test_handle_equality_and_display() {
        let a = FileHandle::new(1, "a/b.txt");
        let b = FileHandle::new(1, "a/b.txt");
        let c = FileHandle::new(2, "a/b.txt");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "a/b.txt");
        assert_eq!(a.name(), "a/b.txt");
    }
}
