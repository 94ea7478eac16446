use std::collections::HashMap;

use serde_json::Value;

/// Label of the top-level agent's own calls.
pub const LEAD_AGENT: &str = "LEAD";
/// Label used when a call names a parent that never spawned anything.
pub const UNKNOWN_AGENT: &str = "UNKNOWN";
const DEFAULT_ROLE: &str = "SUBAGENT";

/// A spawned subagent instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentNode {
    /// `<ROLE>-<N>`, stable for the instance's lifetime.
    pub label: String,
    /// Normalised role, e.g. `DATA-ANALYST`.
    pub role: String,
    pub spawn_call_id: String,
    /// Label of the agent that issued the spawn call.
    pub parent_label: String,
}

/// Spawn map, per-role counters and the parent/child hierarchy of agents
/// seen in one run.
#[derive(Debug, Clone, Default)]
pub struct AgentTree {
    by_spawn_call: HashMap<String, String>,
    agents: HashMap<String, AgentNode>,
    order: Vec<String>,
    role_counts: HashMap<String, usize>,
}

impl AgentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label of the agent issuing a call with the given parent.
    pub fn resolve(&self, parent_call_id: Option<&str>) -> &str {
        match parent_call_id {
            None => LEAD_AGENT,
            Some(id) => self
                .by_spawn_call
                .get(id)
                .map(String::as_str)
                .unwrap_or(UNKNOWN_AGENT),
        }
    }

    /// Allocate the next `<ROLE>-<N>` label for a spawn call. Re-registering
    /// the same spawn call returns the label it already has.
    pub fn register_spawn(&mut self, spawn_call_id: &str, role: &str, parent_label: &str) -> String {
        if let Some(existing) = self.by_spawn_call.get(spawn_call_id) {
            return existing.clone();
        }

        let role = normalize_role(role);
        let count = self.role_counts.entry(role.clone()).or_insert(0);
        *count += 1;
        let label = format!("{role}-{count}");

        self.by_spawn_call
            .insert(spawn_call_id.to_string(), label.clone());
        self.agents.insert(
            label.clone(),
            AgentNode {
                label: label.clone(),
                role,
                spawn_call_id: spawn_call_id.to_string(),
                parent_label: parent_label.to_string(),
            },
        );
        self.order.push(label.clone());
        label
    }

    /// Label of the subagent spawned by `call_id`, if it was a spawn call.
    pub fn spawned_by(&self, call_id: &str) -> Option<&str> {
        self.by_spawn_call.get(call_id).map(String::as_str)
    }

    pub fn get(&self, label: &str) -> Option<&AgentNode> {
        self.agents.get(label)
    }

    /// Direct children of an agent, in spawn order.
    pub fn children_of(&self, label: &str) -> Vec<&AgentNode> {
        self.agents()
            .filter(|a| a.parent_label == label)
            .collect()
    }

    /// All spawned agents, in spawn order.
    pub fn agents(&self) -> impl Iterator<Item = &AgentNode> {
        self.order.iter().filter_map(|l| self.agents.get(l))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Upper-case a role and collapse anything that isn't alphanumeric to `-`.
pub fn normalize_role(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_uppercase());
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        DEFAULT_ROLE.to_string()
    } else {
        out
    }
}

/// First non-empty string among `keys` in a spawn call's input.
pub fn role_from_input<'a>(input: &'a Value, keys: &[String]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| input.get(k).and_then(|v| v.as_str()))
        .find(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labels_count_per_role() {
        let mut tree = AgentTree::new();
        assert_eq!(tree.register_spawn("t1", "researcher", LEAD_AGENT), "RESEARCHER-1");
        assert_eq!(tree.register_spawn("t2", "data-analyst", LEAD_AGENT), "DATA-ANALYST-1");
        assert_eq!(tree.register_spawn("t3", "researcher", LEAD_AGENT), "RESEARCHER-2");
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn resolve_uses_spawn_map() {
        let mut tree = AgentTree::new();
        tree.register_spawn("t1", "researcher", LEAD_AGENT);
        assert_eq!(tree.resolve(None), LEAD_AGENT);
        assert_eq!(tree.resolve(Some("t1")), "RESEARCHER-1");
        assert_eq!(tree.resolve(Some("nope")), UNKNOWN_AGENT);
    }

    #[test]
    fn respawn_of_same_call_keeps_label() {
        let mut tree = AgentTree::new();
        tree.register_spawn("t1", "researcher", LEAD_AGENT);
        assert_eq!(tree.register_spawn("t1", "researcher", LEAD_AGENT), "RESEARCHER-1");
        assert_eq!(tree.register_spawn("t2", "researcher", LEAD_AGENT), "RESEARCHER-2");
    }

    #[test]
    fn children_in_spawn_order() {
        let mut tree = AgentTree::new();
        tree.register_spawn("t1", "researcher", LEAD_AGENT);
        tree.register_spawn("t2", "analyst", "RESEARCHER-1");
        tree.register_spawn("t3", "researcher", LEAD_AGENT);
        let lead_children: Vec<&str> = tree
            .children_of(LEAD_AGENT)
            .iter()
            .map(|a| a.label.as_str())
            .collect();
        assert_eq!(lead_children, vec!["RESEARCHER-1", "RESEARCHER-2"]);
        assert_eq!(tree.children_of("RESEARCHER-1")[0].label, "ANALYST-1");
    }

    #[test]
    fn normalize_role_variants() {
        assert_eq!(normalize_role("researcher"), "RESEARCHER");
        assert_eq!(normalize_role("data analyst"), "DATA-ANALYST");
        assert_eq!(normalize_role(" report__writer "), "REPORT-WRITER");
        assert_eq!(normalize_role("--"), "SUBAGENT");
    }

    #[test]
    fn role_lookup_order() {
        let keys = vec!["subagent_type".to_string(), "role".to_string()];
        assert_eq!(role_from_input(&json!({"role": "researcher"}), &keys), Some("researcher"));
        assert_eq!(
            role_from_input(&json!({"subagent_type": "report-writer", "role": "x"}), &keys),
            Some("report-writer")
        );
        assert_eq!(role_from_input(&json!({"subagent_type": ""}), &keys), None);
        assert_eq!(role_from_input(&json!("researcher"), &keys), None);
    }
}
