//! Per-agent activity reports built from a session's structured log.
//!
//! This module turns the flat list of `tool_call_start` / `tool_call_complete`
//! records into one row per agent, in the order agents first appear.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::record::ToolCallRecord;

/// Activity of one agent instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentActivity {
    pub agent_id: String,
    /// Calls whose start was recorded.
    pub calls: usize,
    pub completed: usize,
    pub failed: usize,
    /// Completions without a recorded start.
    pub orphaned: usize,
    /// Sum of `duration_ms` over completed calls.
    pub total_duration_ms: u64,
    /// Subagents this agent spawned.
    pub spawned: Vec<String>,
    pub tools: BTreeMap<String, usize>,
}

impl AgentActivity {
    fn new(agent_id: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            ..Self::default()
        }
    }

    /// Calls started but never completed.
    pub fn pending(&self) -> usize {
        // Orphans count as completions but never had a start.
        self.calls
            .saturating_sub(self.completed.saturating_sub(self.orphaned))
    }

    pub fn failure_percent(&self) -> f64 {
        if self.completed == 0 {
            0.0
        } else {
            (self.failed as f64 / self.completed as f64) * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub session: Option<String>,
    pub agents: Vec<AgentActivity>,
}

impl SessionReport {
    pub fn from_records(records: &[ToolCallRecord]) -> Self {
        let mut agents: Vec<AgentActivity> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for record in records {
            let idx = *index
                .entry(record.agent_id().to_string())
                .or_insert_with(|| {
                    agents.push(AgentActivity::new(record.agent_id()));
                    agents.len() - 1
                });
            let activity = &mut agents[idx];

            match record {
                ToolCallRecord::ToolCallStart(r) => {
                    activity.calls += 1;
                    *activity.tools.entry(r.tool_name.clone()).or_insert(0) += 1;
                    if let Some(ref spawned) = r.spawned_agent_id {
                        activity.spawned.push(spawned.clone());
                    }
                }
                ToolCallRecord::ToolCallComplete(r) => {
                    activity.completed += 1;
                    if !r.success {
                        activity.failed += 1;
                    }
                    if r.orphaned {
                        activity.orphaned += 1;
                    }
                    activity.total_duration_ms += r.duration_ms.unwrap_or(0);
                }
            }
        }

        Self {
            session: None,
            agents,
        }
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn total_calls(&self) -> usize {
        self.agents.iter().map(|a| a.calls).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.agents.iter().map(|a| a.failed).sum()
    }

    pub fn total_pending(&self) -> usize {
        self.agents.iter().map(|a| a.pending()).sum()
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.agents.iter().map(|a| a.total_duration_ms).sum()
    }
}

/// Trait for formatting session reports.
pub trait ReportFormatter {
    fn format(&self, report: &SessionReport) -> String;
}

/// Text table formatter for terminal output.
#[derive(Debug, Clone)]
pub struct TextFormatter {
    /// Minimum width for the agent column.
    pub min_agent_width: usize,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self { min_agent_width: 16 }
    }
}

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &SessionReport) -> String {
        let mut output = String::new();

        let session_str = report.session.as_deref().unwrap_or("none");
        output.push_str(&format!("Tool Call Report (session: {})\n", session_str));

        let width = report
            .agents
            .iter()
            .map(|a| a.agent_id.len())
            .max()
            .unwrap_or(0)
            .max(self.min_agent_width)
            .max(5); // "TOTAL"

        let separator = "─".repeat(width + 44);
        output.push_str(&separator);
        output.push('\n');

        output.push_str(&format!(
            "{:<width$} {:>6} {:>7} {:>7} {:>8} {:>11}\n",
            "Agent",
            "Calls",
            "Failed",
            "Pending",
            "Orphaned",
            "Time",
            width = width
        ));
        output.push_str(&separator);
        output.push('\n');

        for agent in &report.agents {
            output.push_str(&format!(
                "{:<width$} {:>6} {:>7} {:>7} {:>8} {:>11}\n",
                agent.agent_id,
                agent.calls,
                agent.failed,
                agent.pending(),
                agent.orphaned,
                format_duration(agent.total_duration_ms),
                width = width
            ));
        }

        output.push_str(&separator);
        output.push('\n');
        output.push_str(&format!(
            "{:<width$} {:>6} {:>7} {:>7} {:>8} {:>11}\n",
            "TOTAL",
            report.total_calls(),
            report.total_failed(),
            report.total_pending(),
            report.agents.iter().map(|a| a.orphaned).sum::<usize>(),
            format_duration(report.total_duration_ms()),
            width = width
        ));

        let spawns: Vec<String> = report
            .agents
            .iter()
            .filter(|a| !a.spawned.is_empty())
            .map(|a| format!("{} -> {}", a.agent_id, a.spawned.join(", ")))
            .collect();
        if !spawns.is_empty() {
            output.push('\n');
            output.push_str("Spawned:\n");
            for line in spawns {
                output.push_str(&format!("  {line}\n"));
            }
        }

        output
    }
}

/// Pretty JSON, for piping into other tools.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &SessionReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }
}

fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", ms as f64 / 1000.0)
    }
}
