//! Structured log records, one JSON object per line in `tool_calls.jsonl`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ToolCallRecord {
    ToolCallStart(StartRecord),
    ToolCallComplete(CompleteRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartRecord {
    pub agent_id: String,
    pub tool_name: String,
    pub call_id: String,
    pub parent_call_id: Option<String>,
    pub timestamp: String,
    pub input: Value,
    /// Label handed to the subagent this call spawns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawned_agent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteRecord {
    pub agent_id: String,
    pub tool_name: String,
    pub call_id: String,
    pub success: bool,
    pub output_size: usize,
    pub timestamp: String,
    /// `None` when the start of the call was never seen.
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub orphaned: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl ToolCallRecord {
    pub fn call_id(&self) -> &str {
        match self {
            ToolCallRecord::ToolCallStart(r) => &r.call_id,
            ToolCallRecord::ToolCallComplete(r) => &r.call_id,
        }
    }

    pub fn agent_id(&self) -> &str {
        match self {
            ToolCallRecord::ToolCallStart(r) => &r.agent_id,
            ToolCallRecord::ToolCallComplete(r) => &r.agent_id,
        }
    }

    pub fn tool_name(&self) -> &str {
        match self {
            ToolCallRecord::ToolCallStart(r) => &r.tool_name,
            ToolCallRecord::ToolCallComplete(r) => &r.tool_name,
        }
    }

    pub fn timestamp(&self) -> &str {
        match self {
            ToolCallRecord::ToolCallStart(r) => &r.timestamp,
            ToolCallRecord::ToolCallComplete(r) => &r.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn start_record_shape() {
        let rec = ToolCallRecord::ToolCallStart(StartRecord {
            agent_id: "RESEARCHER-1".into(),
            tool_name: "WebSearch".into(),
            call_id: "t2".into(),
            parent_call_id: Some("t1".into()),
            timestamp: "2025-01-01T00:00:00.000Z".into(),
            input: json!({"query": "x"}),
            spawned_agent_id: None,
        });
        let line = serde_json::to_string(&rec).unwrap();
        assert_eq!(
            line,
            r#"{"event":"tool_call_start","agent_id":"RESEARCHER-1","tool_name":"WebSearch","call_id":"t2","parent_call_id":"t1","timestamp":"2025-01-01T00:00:00.000Z","input":{"query":"x"}}"#
        );
    }

    #[test]
    fn top_level_start_writes_null_parent() {
        let rec = ToolCallRecord::ToolCallStart(StartRecord {
            agent_id: "LEAD".into(),
            tool_name: "Task".into(),
            call_id: "t1".into(),
            parent_call_id: None,
            timestamp: "2025-01-01T00:00:00.000Z".into(),
            input: json!({}),
            spawned_agent_id: Some("RESEARCHER-1".into()),
        });
        let v: Value = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["parent_call_id"], Value::Null);
        assert_eq!(v["spawned_agent_id"], "RESEARCHER-1");
    }

    #[test]
    fn orphan_complete_parses_back() {
        let line = r#"{"event":"tool_call_complete","agent_id":"UNKNOWN","tool_name":"unknown","call_id":"zz","success":true,"output_size":3,"timestamp":"2025-01-01T00:00:00.000Z","duration_ms":null,"orphaned":true}"#;
        let rec: ToolCallRecord = serde_json::from_str(line).unwrap();
        match rec {
            ToolCallRecord::ToolCallComplete(c) => {
                assert!(c.orphaned);
                assert_eq!(c.duration_ms, None);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }
}
