use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::hostfs::localfs::LocalFs;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VfsConfig {
    /// Directory that file names are resolved against
    pub root: PathBuf,
    /// Create missing parent directories on first Create
    pub create_parent_dirs: bool,
    /// Truncate existing files when a write stream is attached
    pub truncate_on_create: bool,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            create_parent_dirs: true,
            truncate_on_create: true,
        }
    }
}

impl VfsConfig {
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn host(&self) -> LocalFs {
        LocalFs::new(&self.root).with_truncate(self.truncate_on_create)
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<VfsConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let cfg: VfsConfig = serde_yaml::from_str(&content).context("Failed to parse YAML config")?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_config_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("vfs.yaml");
        fs::write(&path, "root: /srv/data\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.root, PathBuf::from("/srv/data"));
        assert!(cfg.create_parent_dirs);
        assert!(cfg.truncate_on_create);
    }

    #[test]
    fn test_load_config_full() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("vfs.yaml");
        fs::write(
            &path,
            "root: data\ncreate_parent_dirs: false\ntruncate_on_create: false\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(
            cfg,
            VfsConfig {
                root: PathBuf::from("data"),
                create_parent_dirs: false,
                truncate_on_create: false,
            }
        );
    }

    #[test]
    fn test_load_config_errors() {
        let tmp = tempdir().unwrap();
        assert!(load_config(tmp.path().join("missing.yaml")).is_err());

        let path = tmp.path().join("bad.yaml");
        fs::write(&path, "create_parent_dirs: [not, a, bool]\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML config"));
    }
}
