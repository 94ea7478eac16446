pub mod hook;

use std::fs;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::record::ToolCallRecord;

/// Parse one line of `tool_calls.jsonl`. Blank or malformed lines give `None`.
pub fn parse_record_line(line: &str) -> Option<ToolCallRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::debug!(error = %err, "skipping malformed tool-call record");
            None
        }
    }
}

/// Parse every record in a structured log file.
pub fn parse_log_file(path: &Path) -> Vec<ToolCallRecord> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(_) => return Vec::new(),
    };
    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| parse_record_line(&line))
        .collect()
}

/// Incrementally reads records appended to a structured log.
///
/// Only whole lines are consumed; a record still being written is picked up
/// on a later call.
pub struct LogTailer {
    path: PathBuf,
    position: u64,
}

impl LogTailer {
    /// Start at the current end of the file, so only new records are returned.
    pub fn new(path: PathBuf) -> Self {
        let position = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Self { path, position }
    }

    /// Start at the beginning of the file.
    pub fn from_start(path: PathBuf) -> Self {
        Self { path, position: 0 }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended since the last read.
    pub fn read_new_records(&mut self) -> Vec<ToolCallRecord> {
        let current_len = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        if current_len < self.position {
            // Truncated or replaced; start over.
            self.position = 0;
        }
        if current_len == self.position {
            return Vec::new();
        }

        let mut file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };
        if file.seek(SeekFrom::Start(self.position)).is_err() {
            return Vec::new();
        }
        let mut buf = Vec::new();
        if file.read_to_end(&mut buf).is_err() {
            return Vec::new();
        }

        let consumed = match buf.iter().rposition(|&b| b == b'\n') {
            Some(idx) => idx + 1,
            None => return Vec::new(),
        };
        self.position += consumed as u64;

        String::from_utf8_lossy(&buf[..consumed])
            .lines()
            .filter_map(parse_record_line)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const START: &str = r#"{"event":"tool_call_start","agent_id":"LEAD","tool_name":"Task","call_id":"t1","parent_call_id":null,"timestamp":"2025-01-01T00:00:00.000Z","input":{"subagent_type":"researcher"},"spawned_agent_id":"RESEARCHER-1"}"#;
    const COMPLETE: &str = r#"{"event":"tool_call_complete","agent_id":"LEAD","tool_name":"Task","call_id":"t1","success":true,"output_size":0,"timestamp":"2025-01-01T00:00:01.000Z","duration_ms":1000}"#;

    #[test]
    fn parse_skips_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tool_calls.jsonl");
        fs::write(&path, format!("{START}\nnot json\n\n{COMPLETE}\n")).unwrap();
        let records = parse_log_file(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].call_id(), "t1");
    }

    #[test]
    fn missing_file_is_empty() {
        assert!(parse_log_file(Path::new("/no/such/tool_calls.jsonl")).is_empty());
    }

    #[test]
    fn tailer_reads_only_new_whole_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tool_calls.jsonl");
        fs::write(&path, format!("{START}\n")).unwrap();

        let mut tailer = LogTailer::new(path.clone());
        assert!(tailer.read_new_records().is_empty());

        let mut f = fs::OpenOptions::new().append(true).open(&path).unwrap();
        let (head, tail) = COMPLETE.split_at(20);
        write!(f, "{head}").unwrap();
        f.flush().unwrap();
        assert!(tailer.read_new_records().is_empty());

        writeln!(f, "{tail}").unwrap();
        f.flush().unwrap();
        let records = tailer.read_new_records();
        assert_eq!(records.len(), 1);
        assert!(matches!(records[0], ToolCallRecord::ToolCallComplete(_)));
    }

    #[test]
    fn tailer_from_start_sees_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tool_calls.jsonl");
        fs::write(&path, format!("{START}\n{COMPLETE}\n")).unwrap();
        let mut tailer = LogTailer::from_start(path);
        assert_eq!(tailer.read_new_records().len(), 2);
        assert!(tailer.read_new_records().is_empty());
    }
}
