use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use ddig_core::{Category, Record};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::query::{ListQuery, RecordId};
use crate::{check_category, RecordStore};

/// In-memory view of one log, built on first access.
#[derive(Default)]
struct LogIndex {
    loaded: bool,
    ids: HashSet<String>,
    len: usize,
}

/// One `<log_name>.jsonl` file per category under a data directory.
///
/// Every operation on a category holds that category's lock, so appends are
/// serialized and readers only see complete lines.
pub struct JsonlStore {
    dir: PathBuf,
    logs: [Mutex<LogIndex>; 4],
}

/// False when a previous write died before its newline.
fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn slot(category: Category) -> usize {
    match category {
        Category::Registrations => 0,
        Category::Newsletter => 1,
        Category::Contacts => 2,
        Category::Pledges => 3,
    }
}

impl JsonlStore {
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(|e| StoreError::Io(format!("create dir: {e}")))?;
        info!(dir = %dir.display(), "jsonl store opened");
        Ok(Self {
            dir: dir.to_owned(),
            logs: Default::default(),
        })
    }

    pub fn path(&self, category: Category) -> PathBuf {
        self.dir.join(format!("{}.jsonl", category.log_name()))
    }

    /// Read every decodable record. Caller holds the category lock.
    fn read_records(&self, category: Category) -> Result<Vec<Record>, StoreError> {
        let path = self.path(category);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (lineno, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let decoded = serde_json::from_str::<Value>(line)
                .map_err(StoreError::from)
                .and_then(|v| Record::from_value(category, v).map_err(StoreError::from));
            match decoded {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    path = %path.display(),
                    line = lineno + 1,
                    error = %e,
                    "skipping unreadable record"
                ),
            }
        }
        Ok(records)
    }

    fn ensure_loaded(&self, index: &mut LogIndex, category: Category) -> Result<(), StoreError> {
        if index.loaded {
            return Ok(());
        }
        let records = self.read_records(category)?;
        index.ids = records.iter().filter_map(|r| r.id().map(str::to_owned)).collect();
        index.len = records.len();
        index.loaded = true;
        Ok(())
    }
}

impl RecordStore for JsonlStore {
    fn append(&self, category: Category, record: &Record) -> Result<RecordId, StoreError> {
        check_category(category, record)?;

        let mut index = self.logs[slot(category)].lock();
        self.ensure_loaded(&mut index, category)?;

        if let Some(id) = record.id() {
            if index.ids.contains(id) {
                return Err(StoreError::Conflict(format!("{category} id {id} already exists")));
            }
        }

        let mut line = serde_json::to_vec(&record.to_value())?;
        line.push(b'\n');

        let path = self.path(category);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        let before = file.metadata()?.len();
        if before > 0 && !ends_with_newline(&mut file)? {
            // Close off the torn tail so this record gets a line of its own.
            warn!(path = %path.display(), "log ends mid-line, terminating torn record");
            line.insert(0, b'\n');
        }
        if let Err(e) = file.write_all(&line).and_then(|()| file.sync_data()) {
            // Roll a partial line back so the next append starts clean.
            if let Err(trunc) = file.set_len(before) {
                warn!(path = %path.display(), error = %trunc, "failed to truncate torn append");
            }
            return Err(e.into());
        }

        index.len += 1;
        let id = match record.id() {
            Some(id) => {
                index.ids.insert(id.to_owned());
                RecordId::natural(id)
            }
            None => RecordId::positional(index.len),
        };
        debug!(category = %category, id = %id, "record appended");
        Ok(id)
    }

    fn list(&self, category: Category, query: &ListQuery) -> Result<Vec<Record>, StoreError> {
        let _guard = self.logs[slot(category)].lock();
        let records = self.read_records(category)?;
        Ok(query.apply(records))
    }

    fn get(&self, category: Category, id: &str) -> Result<Record, StoreError> {
        let _guard = self.logs[slot(category)].lock();
        self.read_records(category)?
            .into_iter()
            .find(|r| r.id() == Some(id))
            .ok_or_else(|| StoreError::NotFound(format!("{category} record {id}")))
    }
}
