#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::Value;

use subtrack::clock::ManualClock;
use subtrack::{ToolCallEnd, ToolCallStart, Tracker, TrackerConfig};

/// A manual clock pinned to 2025-01-01T00:00:00Z.
pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    ))
}

/// A config writing sessions under `root`.
pub fn config(root: &Path) -> TrackerConfig {
    TrackerConfig {
        log_root: root.to_path_buf(),
        ..TrackerConfig::default()
    }
}

/// Open a tracker on a fresh session under `root`.
pub fn tracker(root: &Path, clock: Arc<ManualClock>) -> Tracker {
    Tracker::open_with_clock(config(root), clock)
}

/// Start of a `Task` call spawning `role`.
pub fn spawn(call_id: &str, role: &str) -> ToolCallStart {
    ToolCallStart::new(
        call_id,
        "Task",
        serde_json::json!({"subagent_type": role, "description": format!("{role} work")}),
    )
}

/// Start of a tool call issued by the agent spawned by `parent`.
pub fn child(call_id: &str, parent: &str, tool: &str, input: Value) -> ToolCallStart {
    ToolCallStart::new(call_id, tool, input).with_parent(parent)
}

pub fn done(call_id: &str, output: &str) -> ToolCallEnd {
    ToolCallEnd::new(call_id, true, Value::String(output.to_string()))
}

pub fn failed(call_id: &str, output: &str) -> ToolCallEnd {
    ToolCallEnd::new(call_id, false, Value::String(output.to_string()))
}

/// Build a PreToolUse hook line.
pub fn hook_pre(call_id: &str, parent: Option<&str>, tool: &str, input: &str) -> String {
    let parent = parent
        .map(|p| format!(r#""{p}""#))
        .unwrap_or_else(|| "null".to_string());
    format!(
        r#"{{"hook_event_name":"PreToolUse","tool_use_id":"{call_id}","parent_tool_use_id":{parent},"tool_name":"{tool}","tool_input":{input}}}"#
    )
}

/// Build a PostToolUse hook line with a string response.
pub fn hook_post(call_id: &str, tool: &str, response: &str) -> String {
    format!(
        r#"{{"hook_event_name":"PostToolUse","tool_use_id":"{call_id}","tool_name":"{tool}","tool_response":"{response}"}}"#
    )
}
