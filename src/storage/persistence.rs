//! Snapshot persistence
//!
//! Provides save/load of a [`StoreSnapshot`] as JSON, with backups.

use crate::storage::memory::StoreSnapshot;
use crate::storage::store::StoreError;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Snapshot storage configuration
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub data_dir: PathBuf,
    pub snapshot_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".wallet_data"),
            snapshot_file: "store.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

impl SnapshotConfig {
    /// Configuration pointing at an existing snapshot file
    pub fn for_file(path: &Path) -> Self {
        let data_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let snapshot_file = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store.json".to_string());
        Self {
            data_dir,
            snapshot_file,
            ..Default::default()
        }
    }
}

/// Snapshot file manager
pub struct SnapshotStorage {
    config: SnapshotConfig,
}

impl SnapshotStorage {
    /// Create a new snapshot storage, creating the data directory
    pub fn new(config: SnapshotConfig) -> Result<Self, StoreError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    fn snapshot_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.snapshot_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.snapshot_file, index))
    }

    /// Save the snapshot to disk
    pub fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
        let path = self.snapshot_path();

        if self.config.backup_enabled && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        // Write to temporary file first
        let temp_path = self
            .config
            .data_dir
            .join(format!("{}.tmp", self.config.snapshot_file));
        let file = fs::File::create(&temp_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, snapshot)?;

        // Atomic rename
        fs::rename(&temp_path, &path)?;
        log::debug!("Saved store snapshot to {}", path.display());

        Ok(())
    }

    /// Load the snapshot from disk
    pub fn load(&self) -> Result<StoreSnapshot, StoreError> {
        let path = self.snapshot_path();

        if !path.exists() {
            return Err(StoreError::InvalidData(format!(
                "Snapshot file not found: {}",
                path.display()
            )));
        }

        let file = fs::File::open(&path)?;
        let reader = BufReader::new(file);
        let snapshot: StoreSnapshot = serde_json::from_reader(reader)?;

        log::debug!(
            "Loaded store snapshot: {} addresses, {} shared addresses",
            snapshot.my_addresses.len(),
            snapshot.shared_addresses.len()
        );
        Ok(snapshot)
    }

    /// Check if a saved snapshot exists
    pub fn exists(&self) -> bool {
        self.snapshot_path().exists()
    }

    fn rotate_backups(&self) -> Result<(), StoreError> {
        if self.config.max_backups == 0 {
            return Ok(());
        }
        for i in (0..self.config.max_backups - 1).rev() {
            let from = self.backup_path(i);
            if from.exists() {
                fs::rename(&from, self.backup_path(i + 1))?;
            }
        }
        Ok(())
    }
}
