//! Human-readable transcript blocks.

use crate::record::{CompleteRecord, StartRecord, ToolCallRecord};

/// `[AGENT] -> Tool` followed by an indented `Input:` line.
pub fn start_block(record: &StartRecord, input_line: &str) -> String {
    let mut block = format!("[{}] -> {}", record.agent_id, record.tool_name);
    if let Some(ref spawned) = record.spawned_agent_id {
        block.push_str(&format!(" (spawns {spawned})"));
    }
    block.push('\n');
    block.push_str(&format!("    Input: {input_line}\n"));
    block
}

/// `[AGENT] OK Tool (12ms, 340 bytes)`; failures add an `Output:` preview.
pub fn complete_block(record: &CompleteRecord, output_preview: Option<&str>) -> String {
    let status = if record.success { "OK" } else { "FAILED" };
    let timing = match record.duration_ms {
        Some(ms) => format!("{ms}ms"),
        None => "start not seen".to_string(),
    };
    let mut block = format!(
        "[{}] {} {} ({}, {} bytes)\n",
        record.agent_id, status, record.tool_name, timing, record.output_size
    );
    if let Some(preview) = output_preview {
        block.push_str(&format!("    Output: {preview}\n"));
    }
    block
}

/// Single-line rendering of a record read back from `tool_calls.jsonl`.
pub fn record_line(record: &ToolCallRecord) -> String {
    match record {
        ToolCallRecord::ToolCallStart(r) => {
            let input = crate::payload::inline(&r.input, 120);
            let spawn = r
                .spawned_agent_id
                .as_ref()
                .map(|s| format!(" (spawns {s})"))
                .unwrap_or_default();
            format!("{} [{}] -> {}{} {}", r.timestamp, r.agent_id, r.tool_name, spawn, input)
        }
        ToolCallRecord::ToolCallComplete(r) => {
            let block = complete_block(r, None);
            format!("{} {}", r.timestamp, block.trim_end())
        }
    }
}
