use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::record::{RecordKey, SideChannelRecord};
use crate::models::WatermarkError;

/// Key-value persistence for side-channel records
///
/// The embedding pipeline owns record creation; the store only moves
/// opaque bundles around. Backing storage is pluggable, the one hard
/// requirement is that floating-point contents round-trip exactly.
pub trait RecordStore {
    /// Persist a record under the given key, replacing any previous one
    fn put(&self, key: &RecordKey, record: &SideChannelRecord) -> Result<(), WatermarkError>;

    /// Load the record for a key
    ///
    /// # Errors
    /// `WatermarkError::RecordNotFound` when no record was ever stored
    /// under this (image, alpha) pair.
    fn get(&self, key: &RecordKey) -> Result<SideChannelRecord, WatermarkError>;

    /// Whether a record exists for the key
    fn contains(&self, key: &RecordKey) -> bool;
}

/// One JSON file per record under a root directory
///
/// File names follow `{image_id}_{alpha}.json`. serde_json writes floats
/// in shortest round-trip form, so values reload bit-exactly.
pub struct FileRecordStore {
    root: PathBuf,
}

impl FileRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, key: &RecordKey) -> PathBuf {
        self.root.join(format!("{}.json", key.file_stem()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RecordStore for FileRecordStore {
    fn put(&self, key: &RecordKey, record: &SideChannelRecord) -> Result<(), WatermarkError> {
        fs::create_dir_all(&self.root)?;
        let json = serde_json::to_string(record).map_err(|e| {
            WatermarkError::Record(format!(
                "Failed to serialize record {}: {}",
                key.file_stem(),
                e
            ))
        })?;
        fs::write(self.record_path(key), json)?;
        Ok(())
    }

    fn get(&self, key: &RecordKey) -> Result<SideChannelRecord, WatermarkError> {
        let path = self.record_path(key);
        let json = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(WatermarkError::RecordNotFound(key.file_stem()));
            }
            Err(e) => return Err(WatermarkError::Io(e)),
        };
        serde_json::from_str(&json).map_err(|e| {
            WatermarkError::Record(format!(
                "Failed to parse record {}: {}",
                path.display(),
                e
            ))
        })
    }

    fn contains(&self, key: &RecordKey) -> bool {
        self.record_path(key).exists()
    }
}

/// In-process store for tests and single-run embed/extract flows
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, SideChannelRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, SideChannelRecord>>, WatermarkError> {
        self.records
            .lock()
            .map_err(|_| WatermarkError::Record("Record store mutex poisoned".into()))
    }
}

impl RecordStore for MemoryRecordStore {
    fn put(&self, key: &RecordKey, record: &SideChannelRecord) -> Result<(), WatermarkError> {
        self.lock()?.insert(key.file_stem(), record.clone());
        Ok(())
    }

    fn get(&self, key: &RecordKey) -> Result<SideChannelRecord, WatermarkError> {
        self.lock()?
            .get(&key.file_stem())
            .cloned()
            .ok_or_else(|| WatermarkError::RecordNotFound(key.file_stem()))
    }

    fn contains(&self, key: &RecordKey) -> bool {
        self.lock()
            .map(|map| map.contains_key(&key.file_stem()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::MatrixData;
    use tempfile::TempDir;

    fn sample_record() -> SideChannelRecord {
        SideChannelRecord {
            carrier_singular_values: vec![1234.5678901234567, 0.1, 1e-17, std::f64::consts::PI],
            watermark_u: MatrixData {
                rows: 2,
                cols: 2,
                data: vec![0.30000000000000004, -0.7, 0.7, 0.30000000000000004],
            },
            watermark_v_t: MatrixData {
                rows: 2,
                cols: 2,
                data: vec![1.0, 0.0, 0.0, -1.0],
            },
            permutation: vec![3, 1, 0, 2],
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryRecordStore::new();
        let key = RecordKey::new("lena", 0.1);
        let record = sample_record();

        store.put(&key, &record).unwrap();
        assert!(store.contains(&key));
        assert_eq!(store.get(&key).unwrap(), record);
    }

    #[test]
    fn test_memory_store_missing_key() {
        let store = MemoryRecordStore::new();
        let result = store.get(&RecordKey::new("nothing", 0.3));
        assert!(matches!(result, Err(WatermarkError::RecordNotFound(_))));
    }

    #[test]
    fn test_file_store_roundtrip_exact_floats() {
        let dir = TempDir::new().unwrap();
        let store = FileRecordStore::new(dir.path());
        let key = RecordKey::new("peppers", 0.2);
        let record = sample_record();

        store.put(&key, &record).unwrap();
        assert!(store.contains(&key));

        let loaded = store.get(&key).unwrap();
        // Bit-exact float round-trip is the contract, not approximate equality.
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_file_store_missing_key() {
        let dir = TempDir::new().unwrap();
        let store = FileRecordStore::new(dir.path());
        let result = store.get(&RecordKey::new("absent", 0.1));
        assert!(matches!(result, Err(WatermarkError::RecordNotFound(_))));
    }

    #[test]
    fn test_file_store_distinct_alpha_files() {
        let dir = TempDir::new().unwrap();
        let store = FileRecordStore::new(dir.path());
        let mut record_a = sample_record();
        let mut record_b = sample_record();
        record_a.carrier_singular_values[0] = 1.0;
        record_b.carrier_singular_values[0] = 2.0;

        store.put(&RecordKey::new("img", 0.1), &record_a).unwrap();
        store.put(&RecordKey::new("img", 0.2), &record_b).unwrap();

        assert_eq!(
            store.get(&RecordKey::new("img", 0.1)).unwrap(),
            record_a
        );
        assert_eq!(
            store.get(&RecordKey::new("img", 0.2)).unwrap(),
            record_b
        );
    }

    #[test]
    fn test_put_overwrites_previous_record() {
        let store = MemoryRecordStore::new();
        let key = RecordKey::new("img", 0.1);
        let mut record = sample_record();

        store.put(&key, &record).unwrap();
        record.permutation = vec![0, 1, 2, 3];
        store.put(&key, &record).unwrap();

        assert_eq!(store.get(&key).unwrap().permutation, vec![0, 1, 2, 3]);
    }
}
