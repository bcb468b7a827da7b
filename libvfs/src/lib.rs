//! A small virtual filesystem that mediates access to named files on a host
//! filesystem.
//!
//! Every name known to the VFS owns at most one attached stream. All table and
//! stream transitions go through a single lock, so one [`VirtualFileSystem`]
//! can be shared between worker threads behind an `Arc`.
//!
//! Submodules:
//! - `config`: serde/YAML configuration for a `LocalFs`-backed VFS
//! - `error`: the `VfsError` taxonomy
//! - `handle`: handle tokens and per-name stream state
//! - `hostfs`: the host filesystem collaborator and its implementations
//! - `vfs`: the `Vfs` trait and the `VirtualFileSystem` handle table

pub mod config;
pub mod error;
pub mod handle;
pub mod hostfs;
pub mod vfs;

pub use config::{VfsConfig, load_config};
pub use error::{Result, VfsError};
pub use handle::{FileHandle, ReadOutcome, StreamKind};
pub use hostfs::{HostFs, localfs::LocalFs, memory::MemoryFs};
pub use vfs::{Vfs, VirtualFileSystem};

// Test utilities (only compiled during tests)
#[cfg(test)]
pub mod test_utils {
    /// Install a test-writer subscriber once per test binary. Honors `RUST_LOG`.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}
