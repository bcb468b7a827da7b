//! Host filesystem rooted at a local directory.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::trace;

use super::HostFs;

pub struct LocalFs {
    root: PathBuf,
    truncate_on_create: bool,
}

impl LocalFs {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            truncate_on_create: true,
        }
    }

    /// Whether `open_write` truncates an existing file. Defaults to true.
    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate_on_create = truncate;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl HostFs for LocalFs {
    type Stream = File;

    fn open_read(&self, name: &str) -> io::Result<File> {
        File::open(self.path_for(name))
    }

    fn open_write(&self, name: &str) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(self.truncate_on_create)
            .open(self.path_for(name))
    }

    fn create_parent_dirs(&self, name: &str) -> io::Result<()> {
        let path = self.path_for(name);
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                trace!("create_dir_all {dir:?}");
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }
}
