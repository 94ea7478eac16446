//! Attribution of tool calls to the agents that issue them.
//!
//! A host runtime calls [`ToolCallHooks::on_call_start`] before every tool
//! invocation and [`ToolCallHooks::on_call_complete`] after it. The
//! [`Tracker`] works out which agent instance owns each call, keeps the
//! in-flight calls, and appends one transcript block plus one JSON record per
//! event to the run's session logs.
//!
//! The tracker is an observer: nothing here can fail a tool call. Problems
//! are reported through `tracing` and otherwise ignored.

pub mod agents;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::{elapsed_ms, iso8601, Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::error::display_chain;
use crate::payload;
use crate::record::{CompleteRecord, StartRecord, ToolCallRecord};
use crate::roles::find_role;
use crate::session::{prune_sessions, LogSink, RunLog};
use crate::transcript;

pub use agents::{AgentNode, AgentTree, LEAD_AGENT, UNKNOWN_AGENT};

/// Tool name recorded for orphaned completions the host didn't name.
pub const UNKNOWN_TOOL: &str = "unknown";

/// A tool call about to run.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallStart {
    pub call_id: String,
    /// The spawn call that created the issuing agent; `None` for the lead.
    pub parent_call_id: Option<String>,
    pub tool_name: String,
    pub input: Value,
}

impl ToolCallStart {
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>, input: Value) -> Self {
        Self {
            call_id: call_id.into(),
            parent_call_id: None,
            tool_name: tool_name.into(),
            input,
        }
    }

    /// Build a start from any serializable input. Inputs that fail to
    /// serialize are logged as `<unserializable>`.
    pub fn serialized<T: Serialize + ?Sized>(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: &T,
    ) -> Self {
        Self::new(call_id, tool_name, payload::to_payload(input))
    }

    pub fn with_parent(mut self, parent_call_id: impl Into<String>) -> Self {
        self.parent_call_id = Some(parent_call_id.into());
        self
    }
}

/// A tool call that finished.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallEnd {
    pub call_id: String,
    /// Only consulted when the start of the call was never seen.
    pub tool_name: Option<String>,
    pub success: bool,
    pub output: Value,
}

impl ToolCallEnd {
    pub fn new(call_id: impl Into<String>, success: bool, output: Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: None,
            success,
            output,
        }
    }

    /// Build a completion from any serializable output, with the same
    /// fallback as [`ToolCallStart::serialized`].
    pub fn serialized<T: Serialize + ?Sized>(call_id: impl Into<String>, success: bool, output: &T) -> Self {
        Self::new(call_id, success, payload::to_payload(output))
    }

    pub fn with_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }
}

/// The two callbacks a host runtime invokes around every tool call.
pub trait ToolCallHooks: Send + Sync {
    fn on_call_start(&self, event: ToolCallStart);
    fn on_call_complete(&self, event: ToolCallEnd);
}

impl<T: ToolCallHooks + ?Sized> ToolCallHooks for Arc<T> {
    fn on_call_start(&self, event: ToolCallStart) {
        (**self).on_call_start(event)
    }

    fn on_call_complete(&self, event: ToolCallEnd) {
        (**self).on_call_complete(event)
    }
}

/// A call that has started and not yet completed.
#[derive(Debug, Clone, PartialEq)]
pub struct InFlightCall {
    pub call_id: String,
    pub agent_label: String,
    pub tool_name: String,
    pub started_at: DateTime<Utc>,
    /// Already summarised.
    pub input: Value,
}

struct TrackerState {
    pending: HashMap<String, InFlightCall>,
    agents: AgentTree,
    sink: Option<Box<dyn LogSink>>,
    /// Set after a failed append until the next successful one.
    degraded: bool,
}

impl TrackerState {
    fn emit(&mut self, block: &str, record: &ToolCallRecord) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        let transcript = sink.append_transcript(block);
        let structured = sink.append_record(record);
        match transcript.err().or(structured.err()) {
            Some(err) if !self.degraded => {
                warn!(
                    call_id = record.call_id(),
                    error = %display_chain(&err),
                    "tool-call log append failed; tracking continues in memory"
                );
                self.degraded = true;
            }
            Some(err) => {
                debug!(call_id = record.call_id(), error = %display_chain(&err), "tool-call log append failed");
            }
            None if self.degraded => {
                info!("tool-call log appends recovered");
                self.degraded = false;
            }
            None => {}
        }
    }
}

/// Per-run call tracker. Construct one per run and hand it (usually as
/// `Arc<Tracker>`) to whatever registers the host's hooks.
pub struct Tracker {
    config: TrackerConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<TrackerState>,
}

impl Tracker {
    /// Open a fresh session under `config.log_root` using the system clock.
    pub fn open(config: TrackerConfig) -> Self {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Open a fresh session. If the session can't be created the tracker
    /// still works, in memory only, after a single warning.
    pub fn open_with_clock(config: TrackerConfig, clock: Arc<dyn Clock>) -> Self {
        if let Some(keep) = config.max_sessions {
            // Leave room for the session about to be created.
            let removed = prune_sessions(&config.log_root, keep.saturating_sub(1));
            if !removed.is_empty() {
                debug!(count = removed.len(), "pruned old sessions");
            }
        }

        let sink: Option<Box<dyn LogSink>> = match RunLog::create(&config.log_root, clock.now()) {
            Ok(log) => {
                info!(session = %log.path().display(), "tool-call logging started");
                Some(Box::new(log))
            }
            Err(err) => {
                warn!(
                    error = %display_chain(&err),
                    "could not create tool-call log session; tool calls will not be recorded to disk"
                );
                None
            }
        };
        Self::build(config, clock, sink)
    }

    /// Track into a caller-provided sink.
    pub fn with_sink(config: TrackerConfig, clock: Arc<dyn Clock>, sink: Box<dyn LogSink>) -> Self {
        Self::build(config, clock, Some(sink))
    }

    /// Track in memory only.
    pub fn detached(config: TrackerConfig, clock: Arc<dyn Clock>) -> Self {
        Self::build(config, clock, None)
    }

    fn build(config: TrackerConfig, clock: Arc<dyn Clock>, sink: Option<Box<dyn LogSink>>) -> Self {
        Self {
            config,
            clock,
            state: Mutex::new(TrackerState {
                pending: HashMap::new(),
                agents: AgentTree::new(),
                sink,
                degraded: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Session directory being written, if any.
    pub fn session_dir(&self) -> Option<PathBuf> {
        self.lock()
            .sink
            .as_ref()
            .and_then(|s| s.dir().map(|d| d.to_path_buf()))
    }

    /// Calls started but not yet completed.
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Snapshot of in-flight calls, oldest first.
    pub fn in_flight(&self) -> Vec<InFlightCall> {
        let mut calls: Vec<InFlightCall> = self.lock().pending.values().cloned().collect();
        calls.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.call_id.cmp(&b.call_id))
        });
        calls
    }

    /// Label given to the subagent spawned by `call_id`.
    pub fn spawned_label(&self, call_id: &str) -> Option<String> {
        self.lock().agents.spawned_by(call_id).map(String::from)
    }

    pub fn agent_tree(&self) -> AgentTree {
        self.lock().agents.clone()
    }

    /// Flush and release the session logs. Later events are tracked in
    /// memory only.
    pub fn close(&self) {
        let mut state = self.lock();
        if let Some(mut sink) = state.sink.take() {
            if let Err(err) = sink.flush() {
                warn!(error = %display_chain(&err), "failed to flush tool-call logs");
            }
        }
        for call in state.pending.values() {
            debug!(
                call_id = %call.call_id,
                agent = %call.agent_label,
                tool = %call.tool_name,
                "call still in flight at close"
            );
        }
    }

    fn check_toolset(&self, agents: &AgentTree, agent_label: &str, tool_name: &str) {
        let allowed = if agent_label == LEAD_AGENT {
            if self.config.lead_tools.is_empty() {
                return;
            }
            self.config.lead_tools.iter().any(|t| t == tool_name)
        } else {
            let Some(role) = agents
                .get(agent_label)
                .and_then(|node| find_role(&self.config.roles, &node.role))
            else {
                return;
            };
            role.allows(tool_name)
        };

        if !allowed {
            warn!(agent = agent_label, tool = tool_name, "tool is outside the agent's toolset");
        }
    }

    fn output_preview(&self, output: &Value) -> String {
        let max = self.config.summary.max_string_chars;
        match output {
            Value::String(s) => payload::truncate(s, max),
            other => payload::inline(&payload::summarize(other, &self.config.summary), max),
        }
    }
}

impl ToolCallHooks for Tracker {
    fn on_call_start(&self, event: ToolCallStart) {
        let input = payload::summarize(&event.input, &self.config.summary);
        let input_line = payload::inline(&input, self.config.summary.max_string_chars);

        let mut state = self.lock();
        let started_at = self.clock.now();

        let agent_label = state
            .agents
            .resolve(event.parent_call_id.as_deref())
            .to_string();
        if agent_label == UNKNOWN_AGENT {
            warn!(
                call_id = %event.call_id,
                parent_call_id = ?event.parent_call_id,
                "parent call is not a known spawn; attributing to unknown agent"
            );
        }
        self.check_toolset(&state.agents, &agent_label, &event.tool_name);

        let spawned_agent_id = if self.config.is_spawn_tool(&event.tool_name) {
            let role = agents::role_from_input(&event.input, &self.config.role_keys).unwrap_or("");
            Some(
                state
                    .agents
                    .register_spawn(&event.call_id, role, &agent_label),
            )
        } else {
            None
        };

        let previous = state.pending.insert(
            event.call_id.clone(),
            InFlightCall {
                call_id: event.call_id.clone(),
                agent_label: agent_label.clone(),
                tool_name: event.tool_name.clone(),
                started_at,
                input: input.clone(),
            },
        );
        if let Some(previous) = previous {
            warn!(
                call_id = %event.call_id,
                previous_tool = %previous.tool_name,
                "duplicate call id; replacing the in-flight entry"
            );
        }

        let record = StartRecord {
            agent_id: agent_label,
            tool_name: event.tool_name,
            call_id: event.call_id,
            parent_call_id: event.parent_call_id,
            timestamp: iso8601(started_at),
            input,
            spawned_agent_id,
        };
        debug!(call_id = %record.call_id, agent = %record.agent_id, tool = %record.tool_name, "tool call started");
        let block = transcript::start_block(&record, &input_line);
        state.emit(&block, &ToolCallRecord::ToolCallStart(record));
    }

    fn on_call_complete(&self, event: ToolCallEnd) {
        let output_size = payload::output_size(&event.output);
        let preview = (!event.success).then(|| self.output_preview(&event.output));

        let mut state = self.lock();
        let completed_at = self.clock.now();

        let record = match state.pending.remove(&event.call_id) {
            Some(pending) => CompleteRecord {
                agent_id: pending.agent_label,
                tool_name: pending.tool_name,
                call_id: event.call_id,
                success: event.success,
                output_size,
                timestamp: iso8601(completed_at),
                duration_ms: Some(elapsed_ms(pending.started_at, completed_at)),
                orphaned: false,
            },
            None => {
                warn!(call_id = %event.call_id, "completion for a call that was never started");
                CompleteRecord {
                    agent_id: UNKNOWN_AGENT.to_string(),
                    tool_name: event
                        .tool_name
                        .unwrap_or_else(|| UNKNOWN_TOOL.to_string()),
                    call_id: event.call_id,
                    success: event.success,
                    output_size,
                    timestamp: iso8601(completed_at),
                    duration_ms: None,
                    orphaned: true,
                }
            }
        };
        debug!(call_id = %record.call_id, success = record.success, duration_ms = ?record.duration_ms, "tool call completed");
        let block = transcript::complete_block(&record, preview.as_deref());
        state.emit(&block, &ToolCallRecord::ToolCallComplete(record));
    }
}
