//! Host hook events, one JSON object per line.
//!
//! The shape follows the agent SDK's `PreToolUse` / `PostToolUse` hook
//! payloads:
//!
//! ```json
//! {"hook_event_name":"PreToolUse","tool_use_id":"t2","parent_tool_use_id":"t1","tool_name":"WebSearch","tool_input":{"query":"x"}}
//! {"hook_event_name":"PostToolUse","tool_use_id":"t2","tool_name":"WebSearch","tool_response":"..."}
//! ```
//!
//! `call_id` / `parent_call_id` / `input` / `output` are accepted as aliases.

use std::io::{self, BufRead};

use serde_json::Value;

use crate::tracking::{ToolCallEnd, ToolCallHooks, ToolCallStart};

#[derive(Debug, Clone, PartialEq)]
pub enum HookEvent {
    Start(ToolCallStart),
    Complete(ToolCallEnd),
}

impl HookEvent {
    pub fn dispatch(self, hooks: &dyn ToolCallHooks) {
        match self {
            HookEvent::Start(e) => hooks.on_call_start(e),
            HookEvent::Complete(e) => hooks.on_call_complete(e),
        }
    }
}

/// Parse one hook line. Lines that are not tool hooks, or that lack a call
/// id, give `None`.
pub fn parse_hook_line(line: &str) -> Option<HookEvent> {
    let obj: Value = serde_json::from_str(line.trim()).ok()?;

    let event_name = obj.get("hook_event_name").and_then(|v| v.as_str())?;
    let call_id = str_field(&obj, &["tool_use_id", "call_id"])?.to_string();
    let tool_name = str_field(&obj, &["tool_name"]).map(String::from);

    match event_name {
        "PreToolUse" => {
            let input = field(&obj, &["tool_input", "input"])
                .cloned()
                .unwrap_or(Value::Null);
            Some(HookEvent::Start(ToolCallStart {
                call_id,
                parent_call_id: str_field(&obj, &["parent_tool_use_id", "parent_call_id"])
                    .map(String::from),
                tool_name: tool_name.unwrap_or_else(|| crate::tracking::UNKNOWN_TOOL.to_string()),
                input,
            }))
        }
        "PostToolUse" | "PostToolUseFailure" => {
            let output = field(&obj, &["tool_response", "output"])
                .cloned()
                .unwrap_or(Value::Null);
            let success = match obj.get("success").and_then(|v| v.as_bool()) {
                Some(explicit) => explicit,
                None if event_name == "PostToolUseFailure" => false,
                None => !output
                    .get("is_error")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            };
            Some(HookEvent::Complete(ToolCallEnd {
                call_id,
                tool_name,
                success,
                output,
            }))
        }
        _ => None,
    }
}

/// Outcome of [`replay`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub applied: usize,
    pub skipped: usize,
}

/// Feed every hook line from `reader` into `hooks`, in order.
///
/// Lines are decoded lossily, so a line of invalid UTF-8 is skipped like any
/// other unparseable line. Only read failures end the replay early.
pub fn replay<R: BufRead>(reader: R, hooks: &dyn ToolCallHooks) -> io::Result<ReplayStats> {
    let mut stats = ReplayStats::default();
    for raw in reader.split(b'\n') {
        let raw = raw?;
        let line = String::from_utf8_lossy(&raw);
        if line.trim().is_empty() {
            continue;
        }
        match parse_hook_line(&line) {
            Some(event) => {
                event.dispatch(hooks);
                stats.applied += 1;
            }
            None => {
                tracing::debug!(line = %line, "skipping non tool-call hook line");
                stats.skipped += 1;
            }
        }
    }
    Ok(stats)
}

fn field<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

fn str_field<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a str> {
    field(obj, keys).and_then(|v| v.as_str())
}
