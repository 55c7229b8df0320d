use std::{
    collections::HashMap,
    sync::{Arc, Mutex, RwLock},
};

use time::OffsetDateTime;

use crate::{
    audit::{
        error::{AuditError, corrupted, read_failed, write_failed},
        record::{AuditEntry, AuditRecord},
        sink::{AuditSink, InMemoryAuditSink},
    },
    types::IncidentId,
};

#[derive(Debug, Default)]
struct Journal {
    records: Vec<AuditRecord>,
}

/// Append-only audit trail shared by all incident tasks.
///
/// Appends for one incident are serialized by that incident's journal lock;
/// different incidents never wait on each other except inside the sink.
pub struct AuditTrail {
    sink: Arc<dyn AuditSink>,
    journals: RwLock<HashMap<IncidentId, Arc<Mutex<Journal>>>>,
}

impl AuditTrail {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            journals: RwLock::new(HashMap::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryAuditSink))
    }

    /// Rebuilds the index from records loaded out of a durable sink.
    pub fn restore(sink: Arc<dyn AuditSink>, records: Vec<AuditRecord>) -> Self {
        let mut grouped: HashMap<IncidentId, Journal> = HashMap::new();
        for record in records {
            grouped
                .entry(record.incident_id.clone())
                .or_default()
                .records
                .push(record);
        }
        let journals = grouped
            .into_iter()
            .map(|(incident_id, mut journal)| {
                journal.records.sort_by_key(|record| record.seq_no);
                (incident_id, Arc::new(Mutex::new(journal)))
            })
            .collect();
        Self {
            sink,
            journals: RwLock::new(journals),
        }
    }

    fn journal(&self, incident_id: &str) -> Result<Arc<Mutex<Journal>>, AuditError> {
        {
            let journals = self
                .journals
                .read()
                .map_err(|_| write_failed("audit index lock poisoned"))?;
            if let Some(journal) = journals.get(incident_id) {
                return Ok(journal.clone());
            }
        }
        let mut journals = self
            .journals
            .write()
            .map_err(|_| write_failed("audit index lock poisoned"))?;
        Ok(journals
            .entry(incident_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Journal::default())))
            .clone())
    }

    /// Seals and durably writes one record. The record becomes visible to
    /// readers only after the sink acknowledged it.
    pub fn append(&self, incident_id: &str, entry: AuditEntry) -> Result<AuditRecord, AuditError> {
        let journal = self.journal(incident_id)?;
        let mut journal = journal
            .lock()
            .map_err(|_| write_failed(format!("audit journal for {incident_id} lock poisoned")))?;

        let seq_no = journal.records.len() as u64 + 1;
        let prev_digest = journal.records.last().map(|record| record.digest.clone());
        let record = entry.seal(incident_id, seq_no, prev_digest, OffsetDateTime::now_utc());

        if let Err(err) = self.sink.append(&record) {
            tracing::error!(
                target: "audit",
                incident_id = incident_id,
                seq_no = seq_no,
                stage = record.stage.as_str(),
                error = %err,
                "audit_write_failed"
            );
            return Err(err);
        }

        tracing::debug!(
            target: "audit",
            incident_id = incident_id,
            seq_no = seq_no,
            stage = record.stage.as_str(),
            status = record.status.as_str(),
            "audit_record_appended"
        );
        journal.records.push(record.clone());
        Ok(record)
    }

    /// Ordered records for one incident; empty when the id is unknown.
    pub fn records(&self, incident_id: &str) -> Result<Vec<AuditRecord>, AuditError> {
        let journal = {
            let journals = self
                .journals
                .read()
                .map_err(|_| read_failed("audit index lock poisoned"))?;
            match journals.get(incident_id) {
                Some(journal) => journal.clone(),
                None => return Ok(Vec::new()),
            }
        };
        let journal = journal
            .lock()
            .map_err(|_| read_failed(format!("audit journal for {incident_id} lock poisoned")))?;
        Ok(journal.records.clone())
    }

    pub fn incident_ids(&self) -> Result<Vec<IncidentId>, AuditError> {
        let journals = self
            .journals
            .read()
            .map_err(|_| read_failed("audit index lock poisoned"))?;
        let mut ids = journals.keys().cloned().collect::<Vec<_>>();
        ids.sort();
        Ok(ids)
    }

    /// Recomputes sequence numbers and the digest chain of one incident.
    pub fn verify_chain(&self, incident_id: &str) -> Result<(), AuditError> {
        let records = self.records(incident_id)?;
        let mut prev_digest: Option<String> = None;
        for (index, record) in records.iter().enumerate() {
            let expected_seq = index as u64 + 1;
            if record.seq_no != expected_seq {
                return Err(corrupted(format!(
                    "{incident_id}: expected seq_no {expected_seq}, found {}",
                    record.seq_no
                )));
            }
            if record.prev_digest != prev_digest {
                return Err(corrupted(format!(
                    "{incident_id}#{}: previous digest does not match",
                    record.seq_no
                )));
            }
            if record.compute_digest() != record.digest {
                return Err(corrupted(format!(
                    "{incident_id}#{}: digest does not match content",
                    record.seq_no
                )));
            }
            prev_digest = Some(record.digest.clone());
        }
        Ok(())
    }
}
