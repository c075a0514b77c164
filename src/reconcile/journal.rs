// src/reconcile/journal.rs

//! Append-only reconciliation journal
//!
//! Each record is a single line with a CRC32 checksum:
//! `{crc32_hex}|{json}\n`. Phase barriers are fsynced before the next
//! destructive step, so after a crash the journal says how far the moves got.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::{ReconcilePlan, ReconcileState};

/// A record in the reconciliation journal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JournalRecord {
    /// Reconciliation started
    Begin {
        tx_uuid: String,
        in_dir: PathBuf,
        out_dir: PathBuf,
        timestamp: DateTime<Utc>,
    },

    /// Full move plan
    Plan { plan: ReconcilePlan },

    /// Staging directory created
    StagingCreated { path: PathBuf },

    /// Single entry moved into staging
    Moved { from: PathBuf, to: PathBuf },

    /// All entries staged barrier
    Staged { count: usize },

    /// Staging directory renamed onto the target
    Committed { crate_root: PathBuf },

    /// Reconciliation complete
    Done { duration_ms: u64, success: bool },
}

impl JournalRecord {
    /// Get the reconciliation state this record represents
    pub fn to_state(&self) -> ReconcileState {
        match self {
            Self::Begin { .. } => ReconcileState::New,
            Self::Plan { .. } => ReconcileState::Planned,
            Self::StagingCreated { .. } | Self::Moved { .. } => ReconcileState::StagingCreated,
            Self::Staged { .. } => ReconcileState::Staged,
            Self::Committed { .. } => ReconcileState::Committed,
            Self::Done { .. } => ReconcileState::Done,
        }
    }

    /// Check if this is a phase barrier record
    pub fn is_barrier(&self) -> bool {
        !matches!(self, Self::Moved { .. })
    }
}

/// Append-only reconciliation journal with fsync barriers
pub struct ReconcileJournal {
    path: PathBuf,
    file: File,
    tx_uuid: String,
}

impl ReconcileJournal {
    /// Create a new journal
    pub fn create(journal_dir: &Path, tx_uuid: &str) -> Result<Self> {
        fs::create_dir_all(journal_dir)?;

        let path = journal_dir.join(format!("tx-{}.journal", tx_uuid));
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&path)?;

        Ok(Self {
            path,
            file,
            tx_uuid: tx_uuid.to_string(),
        })
    }

    /// Open an existing journal for recovery
    pub fn open(path: PathBuf) -> Result<Self> {
        let tx_uuid = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_prefix("tx-"))
            .ok_or_else(|| {
                Error::Journal(format!("Invalid journal filename: {}", path.display()))
            })?
            .to_string();

        let file = OpenOptions::new().append(true).open(&path)?;

        Ok(Self {
            path,
            file,
            tx_uuid,
        })
    }

    pub fn tx_uuid(&self) -> &str {
        &self.tx_uuid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a record to the journal (does NOT fsync)
    pub fn write(&mut self, record: JournalRecord) -> Result<()> {
        let json = serde_json::to_string(&record)
            .map_err(|e| Error::Journal(format!("Failed to serialize journal record: {}", e)))?;
        let crc = crc32fast::hash(json.as_bytes());
        writeln!(self.file, "{:08x}|{}", crc, json)?;
        Ok(())
    }

    /// Write a record and fsync (for phase barriers)
    pub fn write_barrier(&mut self, record: JournalRecord) -> Result<()> {
        self.write(record)?;
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Read all valid records, stopping at the first corrupt one
    pub fn read_all(&self) -> Result<Vec<JournalRecord>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match decode_line(&line) {
                Some(json) => records.push(serde_json::from_str(json).map_err(|e| {
                    Error::Journal(format!("{}: bad record on line {}: {}", self.tx_uuid, index + 1, e))
                })?),
                None => {
                    // Torn write from a crash; nothing after it is trusted
                    warn!(
                        "Journal {} truncated at line {}",
                        self.path.display(),
                        index + 1
                    );
                    break;
                }
            }
        }

        Ok(records)
    }

    /// Get the last phase barrier state reached
    pub fn last_phase(&self) -> Result<ReconcileState> {
        let records = self.read_all()?;
        Ok(records
            .iter()
            .rev()
            .find(|r| r.is_barrier())
            .map(JournalRecord::to_state)
            .unwrap_or(ReconcileState::New))
    }

    /// The recorded move plan, if the journal got that far
    pub fn plan(&self) -> Result<Option<ReconcilePlan>> {
        Ok(self.read_all()?.into_iter().find_map(|r| match r {
            JournalRecord::Plan { plan } => Some(plan),
            _ => None,
        }))
    }

    /// Move the journal into `archive/` after completion
    pub fn archive(self) -> Result<()> {
        let dir = self.path.parent().unwrap_or(Path::new("."));
        let archive_dir = dir.join("archive");
        fs::create_dir_all(&archive_dir)?;

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| Error::Journal("Journal path has no file name".to_string()))?;
        fs::rename(&self.path, archive_dir.join(file_name))?;
        Ok(())
    }

    /// Delete the journal (for rolled back reconciliations)
    pub fn delete(self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// The JSON payload of a `{crc32}|{json}` line whose checksum matches
fn decode_line(line: &str) -> Option<&str> {
    let (checksum, json) = line.split_once('|')?;
    let expected = u32::from_str_radix(checksum, 16).ok()?;
    (crc32fast::hash(json.as_bytes()) == expected).then_some(json)
}

/// Find journals without a `Done` record
pub fn find_incomplete_journals(journal_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut journals = Vec::new();

    if !journal_dir.exists() {
        return Ok(journals);
    }

    for entry in fs::read_dir(journal_dir)? {
        let path = entry?.path();

        // archive/ is a directory and never matches
        if path.is_file()
            && path.extension().is_some_and(|e| e == "journal")
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("tx-"))
        {
            let journal = ReconcileJournal::open(path.clone())?;
            let has_done = journal
                .read_all()?
                .iter()
                .any(|r| matches!(r, JournalRecord::Done { .. }));

            if !has_done {
                journals.push(path);
            }
        }
    }

    journals.sort();
    Ok(journals)
}
