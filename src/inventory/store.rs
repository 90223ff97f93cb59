//! Inventory snapshot persistence.
//!
//! Each phase re-reads the latest snapshot and rewrites the full record
//! set when it finishes, making the snapshot the single source of truth
//! and the recovery point. The store sits behind a narrow trait so a
//! future move to a locking datastore stays localized and tests can use
//! the in-memory fake.

use crate::error::MigrationError;
use crate::models::InventoryRecord;
use crate::output::render_summary;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot files are named `pip_inventory_<stamp>.csv`; the stamp sorts
/// lexically in time order.
pub const SNAPSHOT_PREFIX: &str = "pip_inventory_";

/// Repository interface over the persisted inventory.
pub trait InventoryStore {
    /// Load the most recent snapshot.
    fn load(&self) -> Result<Vec<InventoryRecord>, MigrationError>;
    /// Persist a new snapshot of the full record set.
    fn save(&self, records: &[InventoryRecord]) -> Result<(), MigrationError>;
}

/// CSV snapshots in a known output directory, newest file wins.
pub struct CsvFileStore {
    dir: PathBuf,
}

impl CsvFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> CsvFileStore {
        CsvFileStore {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn stamp() -> String {
        let now = chrono::Utc::now().with_timezone(&chrono_tz::Pacific::Auckland);
        now.format("%Y-%m-%d_%H%M%S").to_string()
    }

    fn latest_snapshot(&self) -> Result<PathBuf, MigrationError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            MigrationError::Store(format!(
                "cannot read inventory directory {}: {e}",
                self.dir.display()
            ))
        })?;

        let mut snapshots: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(SNAPSHOT_PREFIX) && n.ends_with(".csv"))
                    .unwrap_or(false)
            })
            .collect();
        snapshots.sort();

        snapshots.pop().ok_or_else(|| {
            MigrationError::Store(format!(
                "no inventory snapshot found in {}; run discovery first",
                self.dir.display()
            ))
        })
    }
}

impl InventoryStore for CsvFileStore {
    fn load(&self) -> Result<Vec<InventoryRecord>, MigrationError> {
        let path = self.latest_snapshot()?;
        log::info!("reading inventory snapshot {}", path.display());

        let mut reader = csv::Reader::from_path(&path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            let record: InventoryRecord = row.map_err(|e| {
                MigrationError::Store(format!("malformed row in {}: {e}", path.display()))
            })?;
            records.push(record);
        }
        log::info!("loaded {} record(s)", records.len());
        Ok(records)
    }

    fn save(&self, records: &[InventoryRecord]) -> Result<(), MigrationError> {
        fs::create_dir_all(&self.dir)?;
        let stamp = CsvFileStore::stamp();
        let csv_path = self.dir.join(format!("{SNAPSHOT_PREFIX}{stamp}.csv"));
        let summary_path = self
            .dir
            .join(format!("{SNAPSHOT_PREFIX}{stamp}_summary.txt"));

        let mut writer = csv::Writer::from_path(&csv_path)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        fs::write(&summary_path, render_summary(records))?;

        log::info!(
            "wrote {} record(s) to {} (summary {})",
            records.len(),
            csv_path.display(),
            summary_path.display()
        );
        Ok(())
    }
}

/// In-memory store; lets tests run the full phase flow without a disk.
#[derive(Default)]
pub struct MemoryStore {
    records: RefCell<Vec<InventoryRecord>>,
}

impl InventoryStore for MemoryStore {
    fn load(&self) -> Result<Vec<InventoryRecord>, MigrationError> {
        Ok(self.records.borrow().clone())
    }

    fn save(&self, records: &[InventoryRecord]) -> Result<(), MigrationError> {
        *self.records.borrow_mut() = records.to_vec();
        Ok(())
    }
}
