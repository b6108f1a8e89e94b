//! Snapshot persistence.
//!
//! The whole tracker is written as one JSON document. Writes go to a fresh temp file
//! in the target directory, are fsynced, the previous snapshot is rotated to the
//! backup path, and the temp file is renamed over the main path. At any instant at
//! least one of {main, backup} is a complete document. Loading tries main, then backup,
//! then gives up and lets the caller start fresh.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::restore;
use crate::{BingoError, QuipMemory, Rotation, TeamState};

/// Prefix of in-flight temp files; the loader never reads these
pub const TEMP_PREFIX: &str = ".tmp_state_";

/// Everything that survives a restart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub game_state: BTreeMap<String, TeamState>,

    pub global_used_quips: QuipMemory,

    /// Informational copy of the configured rotations
    pub team_sequences: BTreeMap<String, Rotation>,

    #[serde(default)]
    pub revision: u64,

    #[serde(default)]
    pub saved_at: String,
}

/// Which file a snapshot was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Main,
    Backup,
}

/// Owns the main/backup paths and serializes writers
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    backup: PathBuf,
    /// Revision of the last committed snapshot; also the writer lock
    last_written: Mutex<Option<u64>>,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let backup = backup_path_for(&path);
        Self {
            path,
            backup,
            last_written: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// Commit `snapshot`. Concurrent callers queue on one lock. A snapshot older than
    /// the last one committed is dropped (returns `Ok(false)`).
    pub async fn save(&self, snapshot: &Snapshot) -> Result<bool, BingoError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;

        let mut last_written = self.last_written.lock().await;
        if let Some(previous) = *last_written {
            if snapshot.revision < previous {
                log::debug!(
                    "[SNAPSHOT] skip stale revision:{} committed:{}",
                    snapshot.revision,
                    previous
                );
                return Ok(false);
            }
        }

        let path = self.path.clone();
        let backup = self.backup.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &backup, &bytes))
            .await
            .map_err(|e| BingoError::Persistence(e.to_string()))??;

        *last_written = Some(snapshot.revision);
        Ok(true)
    }

    /// Main first, then backup; `None` means start fresh
    pub fn load(&self) -> Option<(Snapshot, SnapshotSource)> {
        let candidates = [
            (&self.path, SnapshotSource::Main),
            (&self.backup, SnapshotSource::Backup),
        ];
        for (candidate, source) in candidates {
            if !candidate.exists() {
                continue;
            }
            match read_snapshot(candidate) {
                Ok(snapshot) => {
                    log::info!(
                        "[SNAPSHOT] loaded path:{} source:{:?} teams:{} revision:{}",
                        candidate.display(),
                        source,
                        snapshot.game_state.len(),
                        snapshot.revision
                    );
                    return Some((snapshot, source));
                }
                Err(e) => log::warn!(
                    "[SNAPSHOT] unreadable path:{} error:{}",
                    candidate.display(),
                    e
                ),
            }
        }
        log::info!("[SNAPSHOT] no prior state file; starting fresh");
        None
    }

    /// Delete temp files left behind by an interrupted write
    pub fn sweep_temp_files(&self) -> usize {
        let Some(dir) = self.path.parent() else {
            return 0;
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return 0;
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let is_temp = entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(TEMP_PREFIX))
                .unwrap_or(false);
            if is_temp && fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            log::warn!("[SNAPSHOT] removed {} stale temp file(s)", removed);
        }
        removed
    }
}

/// `bingo_state.json` → `bingo_state.bak.json`
pub fn backup_path_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("state");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.bak.{}", stem, ext),
        None => format!("{}.bak", stem),
    };
    path.with_file_name(name)
}

/// Parse one snapshot file, repairing what can be repaired
pub fn read_snapshot(path: &Path) -> Result<Snapshot, BingoError> {
    let raw = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)?;
    restore::parse_snapshot(&value)
}

/// Temp file → fsync → rotate main to backup → rename temp over main
pub fn write_atomic(path: &Path, backup: &Path, bytes: &[u8]) -> Result<(), BingoError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    // dropped (and deleted) on any early return below
    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".json")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;

    if path.exists() {
        if let Err(e) = rotate_backup(path, backup) {
            log::warn!(
                "[SNAPSHOT] backup rotation failed path:{} error:{}",
                backup.display(),
                e
            );
        }
    }

    tmp.persist(path)
        .map_err(|e| BingoError::Persistence(e.error.to_string()))?;
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }

    log::info!(
        "[SNAPSHOT] saved path:{} bytes:{}",
        path.display(),
        bytes.len()
    );
    Ok(())
}

fn rotate_backup(path: &Path, backup: &Path) -> std::io::Result<()> {
    if backup.exists() {
        fs::remove_file(backup)?;
    }
    fs::rename(path, backup)
}
