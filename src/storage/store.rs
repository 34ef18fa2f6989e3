//! In-memory result store with CSV checkpoints

use crate::record::{CandidateRecord, COLUMNS};
use crate::storage::{write_atomic, StorageError, StorageResult};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Accumulates harvested candidates for a run
///
/// Records are keyed by URL: adding a record whose URL is already present
/// replaces the earlier record in place. Rows keep first-insertion order, so
/// checkpointing an unchanged store twice produces identical files.
///
/// The store has a single owner (the coordinator) and is only mutated between
/// batches, so it carries no internal locking.
#[derive(Debug, Default)]
pub struct ResultStore {
    records: Vec<CandidateRecord>,
    index: HashMap<String, usize>,
}

impl ResultStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a previously written table into a fresh store
    ///
    /// A missing file yields an empty store.
    pub fn load(path: &Path) -> StorageResult<Self> {
        let mut store = Self::new();
        if path.exists() {
            store.add(read_table(path)?);
        }
        Ok(store)
    }

    /// Merges records into the store, last write wins per URL
    ///
    /// Returns the number of records whose URL was not present before.
    pub fn add<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = CandidateRecord>,
    {
        let mut inserted = 0;
        for record in records {
            match self.index.get(record.url()) {
                Some(&slot) => self.records[slot] = record,
                None => {
                    self.index
                        .insert(record.url().to_string(), self.records.len());
                    self.records.push(record);
                    inserted += 1;
                }
            }
        }
        inserted
    }

    /// Number of distinct candidates held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a record by URL
    pub fn get(&self, url: &str) -> Option<&CandidateRecord> {
        self.index.get(url).map(|&slot| &self.records[slot])
    }

    /// Iterates records in table order
    pub fn records(&self) -> impl Iterator<Item = &CandidateRecord> {
        self.records.iter()
    }

    /// Writes the full table to `path` atomically
    ///
    /// The header row is always written, even for an empty store. On failure
    /// the in-memory records are unaffected and `path` keeps its previous
    /// content.
    pub fn checkpoint(&self, path: &Path) -> StorageResult<()> {
        write_atomic(path, |file: &mut File| {
            let csv_err = |source| StorageError::Csv {
                path: path.to_path_buf(),
                source,
            };

            let mut writer = csv::Writer::from_writer(file);
            writer.write_record(COLUMNS).map_err(csv_err)?;
            for record in &self.records {
                writer.write_record(record.row()).map_err(csv_err)?;
            }
            writer.flush().map_err(|source| StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
        })?;

        tracing::debug!(
            "Checkpoint wrote {} candidates to {}",
            self.records.len(),
            path.display()
        );
        Ok(())
    }
}

/// Reads a candidate table written by [`ResultStore::checkpoint`]
///
/// Rows without a URL are skipped. The header must name the expected columns
/// in order.
pub fn read_table(path: &Path) -> StorageResult<Vec<CandidateRecord>> {
    let csv_err = |source| StorageError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = reader.headers().map_err(csv_err)?;
    if !headers.iter().eq(COLUMNS.iter().copied()) {
        return Err(StorageError::Header {
            path: path.to_path_buf(),
            found: headers.iter().collect::<Vec<_>>().join(","),
        });
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_err)?;
        match CandidateRecord::from_row(row.iter()) {
            Some(record) => records.push(record),
            None => tracing::debug!("Skipping row without url in {}", path.display()),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ProfileFields;

    fn record(id: u32, name: &str) -> CandidateRecord {
        CandidateRecord::new(
            format!("https://busy.az/jobseeker/{}", id),
            ProfileFields {
                name: name.to_string(),
                ..ProfileFields::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_add_deduplicates_by_url() {
        let mut store = ResultStore::new();
        let inserted = store.add(vec![record(1, "A"), record(2, "B"), record(1, "A2")]);

        assert_eq!(inserted, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.get("https://busy.az/jobseeker/1").unwrap().fields().name,
            "A2"
        );
    }

    #[test]
    fn test_last_write_wins_keeps_position() {
        let mut store = ResultStore::new();
        store.add(vec![record(1, "A"), record(2, "B")]);
        store.add(vec![record(1, "A-updated")]);

        let names: Vec<_> = store.records().map(|r| r.fields().name.as_str()).collect();
        assert_eq!(names, vec!["A-updated", "B"]);
    }

    #[test]
    fn test_checkpoint_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidates.csv");

        let mut store = ResultStore::new();
        store.add(vec![record(1, "Aysel"), record(2, "Orxan")]);
        store.checkpoint(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "phone_number,name,position,mobile_phone,home_phone,email,gender,\
             salary_expectation,skills,languages,education,work_history,about,\
             desired_positions,url"
        );
        assert_eq!(
            lines.next().unwrap(),
            ",Aysel,,,,,,,,,,,,,https://busy.az/jobseeker/1"
        );
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn test_empty_store_checkpoint_has_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        ResultStore::new().checkpoint(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_repeat_checkpoint_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidates.csv");

        let mut store = ResultStore::new();
        store.add(vec![record(3, "Ləman, \"Lala\""), record(4, "Nicat")]);

        store.checkpoint(&path).unwrap();
        let first = std::fs::read(&path).unwrap();
        store.checkpoint(&path).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_load_reads_back_multiscript_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidates.csv");

        let mut store = ResultStore::new();
        store.add(vec![
            record(5, "Şəhriyar Əliyev"),
            record(6, "Дмитрий, \"Дима\""),
        ]);
        store.checkpoint(&path).unwrap();

        let loaded = ResultStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.get("https://busy.az/jobseeker/6").unwrap().fields().name,
            "Дмитрий, \"Дима\""
        );
        assert_eq!(
            loaded.records().next().unwrap().fields().name,
            "Şəhriyar Əliyev"
        );
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::load(&dir.path().join("absent.csv")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_read_table_rejects_foreign_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.csv");
        std::fs::write(&path, "a,b,c\n1,2,3\n").unwrap();

        assert!(matches!(
            read_table(&path),
            Err(StorageError::Header { .. })
        ));
    }

    #[test]
    fn test_checkpoint_failure_keeps_memory() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be replaced by a file rename
        let path = dir.path().join("taken");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("inner"), "x").unwrap();

        let mut store = ResultStore::new();
        store.add(vec![record(1, "A")]);

        assert!(store.checkpoint(&path).is_err());
        assert_eq!(store.len(), 1);
    }
}
