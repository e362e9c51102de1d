//! Local audit ledger - append-only, hash-chained JSONL
//!
//! Each line is a [`LedgerRecord`] whose `prev_hash` links to the line before.
//! The file is opened in append mode and never rewritten, except that a
//! partial final line left by a crash mid-append is cut off on open. The
//! receipt reference is the record hash.

use async_trait::async_trait;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::chain::{calculate_record_hash, verify_chain, LedgerRecord, GENESIS};
use crate::client::{LedgerClient, LedgerReceipt, LedgerSubmission};
use crate::error::{LedgerError, LedgerResult};

struct Tip {
    file: File,
    sequence: u64,
    hash: String,
}

pub struct JsonlLedger {
    path: PathBuf,
    tip: Mutex<Tip>,
}

impl JsonlLedger {
    /// Open (or create) the ledger file, resuming from its last record
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let existing = if path.exists() {
            recover_tail(&path)?
        } else {
            Vec::new()
        };
        let (sequence, hash) = existing
            .last()
            .map(|r| (r.sequence, r.hash.clone()))
            .unwrap_or_else(|| (0, GENESIS.to_string()));

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            tip: Mutex::new(Tip { file, sequence, hash }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record and return it
    pub fn append(&self, submission: &LedgerSubmission) -> LedgerResult<LedgerRecord> {
        let mut tip = self
            .tip
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger lock poisoned".to_string()))?;

        let mut record = LedgerRecord {
            sequence: tip.sequence + 1,
            prev_hash: tip.hash.clone(),
            hash: String::new(),
            timestamp: Utc::now(),
            entity_hash: submission.entity_hash.clone(),
            action_type: submission.action_type.clone(),
            payload_hash: submission.payload_hash.clone(),
        };
        record.hash = calculate_record_hash(&record);

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let offset = tip.file.metadata()?.len();
        if let Err(e) = tip.file.write_all(line.as_bytes()).and_then(|_| tip.file.flush()) {
            // Leave no partial line for the next append to build on
            if let Err(truncate) = tip.file.set_len(offset) {
                tracing::error!(error = %truncate, offset, "Failed to roll back partial ledger write");
            }
            return Err(e.into());
        }

        tip.sequence = record.sequence;
        tip.hash = record.hash.clone();
        Ok(record)
    }

    pub fn read_all(&self) -> LedgerResult<Vec<LedgerRecord>> {
        read_records(&self.path)
    }

    /// Re-read the file and check every link
    pub fn verify(&self) -> LedgerResult<usize> {
        let records = self.read_all()?;
        verify_chain(&records)?;
        Ok(records.len())
    }
}

fn read_records(path: &Path) -> LedgerResult<Vec<LedgerRecord>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }

    Ok(records)
}

/// Read the records to resume from, repairing the final line.
///
/// Only the bytes after the last newline are treated as a possible torn
/// write; a bad line anywhere else is still an error.
fn recover_tail(path: &Path) -> LedgerResult<Vec<LedgerRecord>> {
    let content = std::fs::read(path)?;
    let complete_len = content
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let (complete, tail) = content.split_at(complete_len);

    let mut records = Vec::new();
    for line in complete.split(|b| *b == b'\n') {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        records.push(serde_json::from_slice(line)?);
    }

    if tail.iter().all(u8::is_ascii_whitespace) {
        return Ok(records);
    }

    let mut file = OpenOptions::new().write(true).open(path)?;
    match serde_json::from_slice::<LedgerRecord>(tail) {
        Ok(record) => {
            // Whole record, only the newline is missing
            file.seek(SeekFrom::End(0))?;
            file.write_all(b"\n")?;
            records.push(record);
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                bytes = tail.len(),
                error = %e,
                "Discarding partial ledger record left by an interrupted write"
            );
            file.set_len(complete_len as u64)?;
        }
    }
    file.sync_all()?;

    Ok(records)
}

#[async_trait]
impl LedgerClient for JsonlLedger {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn submit(&self, submission: &LedgerSubmission) -> LedgerResult<LedgerReceipt> {
        let record = self.append(submission)?;
        Ok(LedgerReceipt {
            reference: record.hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn submission(n: u32) -> LedgerSubmission {
        LedgerSubmission {
            entity_hash: format!("e{}", n),
            action_type: "ALERT_CREATED".to_string(),
            payload_hash: format!("p{}", n),
        }
    }

    #[tokio::test]
    async fn test_submit_chains_records() {
        let dir = TempDir::new().unwrap();
        let ledger = JsonlLedger::open(dir.path().join("audit.jsonl")).unwrap();

        let first = ledger.submit(&submission(1)).await.unwrap();
        let second = ledger.submit(&submission(2)).await.unwrap();
        assert_ne!(first.reference, second.reference);

        let records = ledger.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].prev_hash, GENESIS);
        assert_eq!(records[1].prev_hash, first.reference);
        assert_eq!(ledger.verify().unwrap(), 2);
    }

    #[test]
    fn test_reopen_resumes_chain() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("audit.jsonl");

        {
            let ledger = JsonlLedger::open(&path).unwrap();
            ledger.append(&submission(1)).unwrap();
        }

        let ledger = JsonlLedger::open(&path).unwrap();
        let record = ledger.append(&submission(2)).unwrap();
        assert_eq!(record.sequence, 2);
        assert_eq!(ledger.verify().unwrap(), 2);
    }

    #[test]
    fn test_reopen_discards_torn_final_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        {
            let ledger = JsonlLedger::open(&path).unwrap();
            ledger.append(&submission(1)).unwrap();
            ledger.append(&submission(2)).unwrap();
        }
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"sequence":3,"prev_hash":"ab"#).unwrap();
        drop(file);

        let ledger = JsonlLedger::open(&path).unwrap();
        let record = ledger.append(&submission(3)).unwrap();
        assert_eq!(record.sequence, 3);
        assert_eq!(ledger.verify().unwrap(), 3);
    }

    #[test]
    fn test_reopen_keeps_record_missing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        {
            let ledger = JsonlLedger::open(&path).unwrap();
            ledger.append(&submission(1)).unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, content.trim_end()).unwrap();

        let ledger = JsonlLedger::open(&path).unwrap();
        assert_eq!(ledger.append(&submission(2)).unwrap().sequence, 2);
        assert_eq!(ledger.verify().unwrap(), 2);
    }

    #[test]
    fn test_reopen_rejects_corrupt_middle_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        {
            let ledger = JsonlLedger::open(&path).unwrap();
            ledger.append(&submission(1)).unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, format!("{{\"sequence\":0,\n{}", content)).unwrap();

        assert!(matches!(JsonlLedger::open(&path), Err(LedgerError::SerdeError(_))));
    }

    #[test]
    fn test_tampered_file_fails_verification() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.jsonl");
        let ledger = JsonlLedger::open(&path).unwrap();
        ledger.append(&submission(1)).unwrap();
        ledger.append(&submission(2)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, content.replace("\"p1\"", "\"forged\"")).unwrap();

        assert!(matches!(ledger.verify(), Err(LedgerError::Corrupted(_))));
    }
}
