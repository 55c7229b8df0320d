use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use tokio::runtime::{Handle, RuntimeFlavor};

use crate::audit::{
    error::{AuditError, corrupted, read_failed, write_failed},
    record::AuditRecord,
};

/// Durable destination for audit records. `append` returns only after the
/// record is durably stored; an error means the record must be treated as lost.
pub trait AuditSink: Send + Sync {
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Keeps nothing beyond the trail's own in-process index.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditSink;

impl AuditSink for InMemoryAuditSink {
    fn append(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Append-only JSON Lines file, one record per line, synced on every write.
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditSink {
    pub fn open(path: PathBuf) -> Result<Self, AuditError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| {
                write_failed(format!(
                    "failed to create audit directory '{}': {err}",
                    parent.display()
                ))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| {
                write_failed(format!(
                    "failed to open audit log '{}': {err}",
                    path.display()
                ))
            })?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record previously written to `path`. A missing file is an empty log.
    pub fn load(path: &Path) -> Result<Vec<AuditRecord>, AuditError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(read_failed(format!(
                    "failed to read audit log '{}': {err}",
                    path.display()
                )));
            }
        };

        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|err| {
                read_failed(format!(
                    "failed to read audit log '{}' line {}: {err}",
                    path.display(),
                    index + 1
                ))
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let record: AuditRecord = serde_json::from_str(&line).map_err(|err| {
                corrupted(format!(
                    "audit log '{}' line {} is not a record: {err}",
                    path.display(),
                    index + 1
                ))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

impl AuditSink for JsonlAuditSink {
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(record).map_err(|err| {
            write_failed(format!(
                "failed to serialize audit record {}#{}: {err}",
                record.incident_id, record.seq_no
            ))
        })?;
        line.push('\n');

        off_async_worker(|| {
            let mut file = self.file.lock().map_err(|_| {
                write_failed(format!("audit log '{}' lock poisoned", self.path.display()))
            })?;
            file.write_all(line.as_bytes()).map_err(|err| {
                write_failed(format!(
                    "failed to append to audit log '{}': {err}",
                    self.path.display()
                ))
            })?;
            file.sync_data().map_err(|err| {
                write_failed(format!(
                    "failed to sync audit log '{}': {err}",
                    self.path.display()
                ))
            })
        })
    }
}

/// Runs blocking file I/O without stalling the other tasks of a multi-thread
/// runtime worker. Current-thread runtimes and plain threads run it inline.
fn off_async_worker<T>(io: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(io)
        }
        _ => io(),
    }
}
