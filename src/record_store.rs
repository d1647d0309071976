//! Pattern record storage
//!
//! The vault only relies on the `PatternStore` contract: insert, and
//! query by owner or by owner and site, newest first. Two backends ship
//! with the crate: an in-memory one and a JSON document on disk.

use crate::error::{GestureVaultError, Result};
use crate::vault::types::{site_origin, PatternRecord};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const STORE_VERSION: u32 = 1;

/// Storage collaborator for pattern records
pub trait PatternStore {
    /// Insert a new record. Ids must be unique.
    fn insert(&mut self, record: PatternRecord) -> Result<()>;

    /// All records of an owner, newest first
    fn query_by_owner(&self, owner_id: &str) -> Result<Vec<PatternRecord>>;

    /// Records of an owner for one site, newest first
    fn query_by_owner_site(&self, owner_id: &str, site: &str) -> Result<Vec<PatternRecord>>;
}

fn newest_first<'a>(
    records: impl Iterator<Item = &'a PatternRecord>,
    keep: impl Fn(&PatternRecord) -> bool,
) -> Vec<PatternRecord> {
    let mut matched: Vec<PatternRecord> = records.filter(|r| keep(r)).cloned().collect();
    matched.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    matched
}

fn check_unique(records: &[PatternRecord], record: &PatternRecord) -> Result<()> {
    if records.iter().any(|r| r.id() == record.id()) {
        return Err(GestureVaultError::StorageError(format!(
            "record {} already exists",
            record.id()
        )));
    }
    Ok(())
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryPatternStore {
    records: Vec<PatternRecord>,
}

impl MemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PatternStore for MemoryPatternStore {
    fn insert(&mut self, record: PatternRecord) -> Result<()> {
        check_unique(&self.records, &record)?;
        self.records.push(record);
        Ok(())
    }

    fn query_by_owner(&self, owner_id: &str) -> Result<Vec<PatternRecord>> {
        Ok(newest_first(self.records.iter(), |r| r.owner_id() == owner_id))
    }

    fn query_by_owner_site(&self, owner_id: &str, site: &str) -> Result<Vec<PatternRecord>> {
        let origin = site_origin(site);
        Ok(newest_first(self.records.iter(), |r| {
            r.owner_id() == owner_id && r.website() == origin
        }))
    }
}

// ============================================================================
// JSON file store
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    version: u32,
    #[serde(default)]
    records: Vec<PatternRecord>,
}

/// Store persisted as a single JSON document, rewritten on every insert
#[derive(Debug)]
pub struct JsonFilePatternStore {
    path: PathBuf,
    records: Vec<PatternRecord>,
}

impl JsonFilePatternStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            debug!("No pattern store at {}, starting empty", path.display());
            return Ok(Self {
                path,
                records: Vec::new(),
            });
        }

        let content = fs::read_to_string(&path)?;
        let document: StoredDocument = serde_json::from_str(&content)
            .map_err(|e| GestureVaultError::StorageError(e.to_string()))?;

        if document.version != STORE_VERSION {
            return Err(GestureVaultError::StorageError(format!(
                "unsupported store version {}",
                document.version
            )));
        }

        info!(
            "Loaded {} pattern records from {}",
            document.records.len(),
            path.display()
        );
        Ok(Self {
            path,
            records: document.records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, records: &[PatternRecord]) -> Result<()> {
        let document = StoredDocument {
            version: STORE_VERSION,
            records: records.to_vec(),
        };
        let content = serde_json::to_string_pretty(&document)
            .map_err(|e| GestureVaultError::StorageError(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write beside the target and rename so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl PatternStore for JsonFilePatternStore {
    fn insert(&mut self, record: PatternRecord) -> Result<()> {
        check_unique(&self.records, &record)?;

        let mut next = self.records.clone();
        next.push(record);
        self.persist(&next)?;
        self.records = next;
        Ok(())
    }

    fn query_by_owner(&self, owner_id: &str) -> Result<Vec<PatternRecord>> {
        Ok(newest_first(self.records.iter(), |r| r.owner_id() == owner_id))
    }

    fn query_by_owner_site(&self, owner_id: &str, site: &str) -> Result<Vec<PatternRecord>> {
        let origin = site_origin(site);
        Ok(newest_first(self.records.iter(), |r| {
            r.owner_id() == owner_id && r.website() == origin
        }))
    }
}
