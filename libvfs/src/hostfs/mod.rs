//! Host filesystem collaborator.
//!
//! The VFS never touches storage directly. It asks a [`HostFs`] to attach a
//! stream for a name, and detaches by flushing and dropping that stream.
//!
//! Submodules:
//! - `localfs`: names resolved against a root directory on the real filesystem
//! - `memory`: in-memory host for development and tests

use std::io::{self, Read, Seek, Write};

pub mod localfs;
pub mod memory;

pub trait HostFs: Send + Sync {
    type Stream: Read + Write + Seek + Send;

    /// Attach a read-mode stream positioned at the start of `name`.
    fn open_read(&self, name: &str) -> io::Result<Self::Stream>;

    /// Attach a write-mode stream for `name`, creating the file if needed.
    fn open_write(&self, name: &str) -> io::Result<Self::Stream>;

    /// Create every missing directory above `name`. Names without a parent
    /// component are a no-op.
    fn create_parent_dirs(&self, name: &str) -> io::Result<()>;
}
