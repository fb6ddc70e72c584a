use std::path::{Path, PathBuf};

/// Locations of everything parley keeps on disk: the SQLite database and
/// the persisted conversation identifier.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("parley.db")
    }

    /// The single client-local key: the current conversation id.
    pub fn identity_path(&self) -> PathBuf {
        self.data_dir.join("conversation_id")
    }

    pub fn ensure_data_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("parley"))
    }
}
