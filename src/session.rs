//! Per-run session directories and the two append-only logs inside them.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{Result, TrackerError};
use crate::record::ToolCallRecord;

pub const TRANSCRIPT_FILE: &str = "transcript.txt";
pub const TOOL_CALLS_FILE: &str = "tool_calls.jsonl";
const SESSION_PREFIX: &str = "session_";

/// Destination for tracker output. The tracker holds its sink under the same
/// lock as its state, so implementations see strictly ordered calls.
pub trait LogSink: Send {
    fn append_transcript(&mut self, block: &str) -> Result<()>;
    fn append_record(&mut self, record: &ToolCallRecord) -> Result<()>;
    fn flush(&mut self) -> Result<()>;

    /// Directory backing this sink, if any.
    fn dir(&self) -> Option<&Path> {
        None
    }
}

/// The files of one tracked run.
#[derive(Debug)]
pub struct RunLog {
    dir: PathBuf,
    transcript_path: PathBuf,
    tool_calls_path: PathBuf,
    transcript: BufWriter<File>,
    tool_calls: BufWriter<File>,
}

impl RunLog {
    /// Create `<root>/session_<YYYYMMDD_HHMMSS>/` and open both logs.
    /// A numeric suffix is appended if a session with that stamp exists.
    pub fn create(root: &Path, started: DateTime<Utc>) -> Result<Self> {
        fs::create_dir_all(root).map_err(|source| TrackerError::SessionDir {
            path: root.to_path_buf(),
            source,
        })?;

        let stamp = started.format("%Y%m%d_%H%M%S").to_string();
        // Suffixes only grow, so a pruned name is never reused out of order.
        let last_suffix = list_sessions(root)
            .iter()
            .map(|p| session_sort_key(p))
            .filter(|(s, _)| *s == stamp)
            .map(|(_, n)| n)
            .max();
        let dir = match last_suffix {
            None => root.join(format!("{SESSION_PREFIX}{stamp}")),
            Some(n) => root.join(format!("{SESSION_PREFIX}{stamp}_{}", n.saturating_add(1))),
        };
        fs::create_dir(&dir).map_err(|source| TrackerError::SessionDir {
            path: dir.clone(),
            source,
        })?;

        let transcript_path = dir.join(TRANSCRIPT_FILE);
        let tool_calls_path = dir.join(TOOL_CALLS_FILE);
        let transcript = open_append(&transcript_path)?;
        let tool_calls = open_append(&tool_calls_path)?;

        Ok(Self {
            dir,
            transcript_path,
            tool_calls_path,
            transcript,
            tool_calls,
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn transcript_path(&self) -> &Path {
        &self.transcript_path
    }

    pub fn tool_calls_path(&self) -> &Path {
        &self.tool_calls_path
    }
}

fn open_append(path: &Path) -> Result<BufWriter<File>> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(BufWriter::new)
        .map_err(|source| TrackerError::OpenLog {
            path: path.to_path_buf(),
            source,
        })
}

impl LogSink for RunLog {
    fn append_transcript(&mut self, block: &str) -> Result<()> {
        self.transcript
            .write_all(block.as_bytes())
            .and_then(|_| self.transcript.flush())
            .map_err(|source| TrackerError::Append {
                path: self.transcript_path.clone(),
                source,
            })
    }

    fn append_record(&mut self, record: &ToolCallRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        writeln!(self.tool_calls, "{line}")
            .and_then(|_| self.tool_calls.flush())
            .map_err(|source| TrackerError::Append {
                path: self.tool_calls_path.clone(),
                source,
            })
    }

    fn flush(&mut self) -> Result<()> {
        self.transcript
            .flush()
            .map_err(|source| TrackerError::Append {
                path: self.transcript_path.clone(),
                source,
            })?;
        self.tool_calls
            .flush()
            .map_err(|source| TrackerError::Append {
                path: self.tool_calls_path.clone(),
                source,
            })
    }

    fn dir(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}

/// Session directories under `root`, oldest first.
///
/// Names embed a sortable timestamp, so lexical order is creation order.
pub fn list_sessions(root: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(root) {
        Ok(e) => e,
        Err(_) => return Vec::new(),
    };

    let mut sessions: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(SESSION_PREFIX))
        })
        .collect();
    sessions.sort_by(|a, b| session_sort_key(a).cmp(&session_sort_key(b)));
    sessions
}

// `session_X_2` must sort after `session_X`, and `_10` after `_9`.
fn session_sort_key(path: &Path) -> (String, u32) {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .trim_start_matches(SESSION_PREFIX);
    // YYYYMMDD_HHMMSS is 15 chars.
    match name.get(15..).and_then(|rest| rest.strip_prefix('_')) {
        Some(suffix) => (name[..15].to_string(), suffix.parse().unwrap_or(u32::MAX)),
        None => (name.to_string(), 1),
    }
}

pub fn latest_session(root: &Path) -> Option<PathBuf> {
    list_sessions(root).pop()
}

/// Remove the oldest sessions so at most `keep` remain. Returns what was
/// removed; directories that fail to delete are skipped with a warning.
pub fn prune_sessions(root: &Path, keep: usize) -> Vec<PathBuf> {
    let sessions = list_sessions(root);
    if sessions.len() <= keep {
        return Vec::new();
    }
    let excess = sessions.len() - keep;
    let mut removed = Vec::new();
    for dir in sessions.into_iter().take(excess) {
        match fs::remove_dir_all(&dir) {
            Ok(()) => removed.push(dir),
            Err(err) => {
                tracing::warn!(path = %dir.display(), error = %err, "failed to prune old session");
            }
        }
    }
    removed
}
