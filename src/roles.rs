//! Subagent roles the lead agent may delegate to, and what each may call.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub tools: Vec<String>,
    /// Directories (relative to the working directory) the role writes into.
    #[serde(default)]
    pub output_dirs: Vec<String>,
}

impl RoleDefinition {
    pub fn allows(&self, tool_name: &str) -> bool {
        self.tools.iter().any(|t| t == tool_name)
    }
}

pub fn default_lead_tools() -> Vec<String> {
    vec!["Task".to_string()]
}

pub fn builtin_roles() -> Vec<RoleDefinition> {
    vec![
        RoleDefinition {
            name: "researcher".to_string(),
            description: "Gathers information with web search and writes findings \
                          to files/research_notes/ for the report writer."
                .to_string(),
            tools: strings(&["WebSearch", "Write"]),
            output_dirs: strings(&["files/research_notes"]),
        },
        RoleDefinition {
            name: "data-analyst".to_string(),
            description: "Reads research notes, extracts numbers and renders charts \
                          via Bash; saves charts to files/charts/ and a data summary \
                          to files/data/."
                .to_string(),
            tools: strings(&["Glob", "Read", "Bash", "Write"]),
            output_dirs: strings(&["files/charts", "files/data"]),
        },
        RoleDefinition {
            name: "report-writer".to_string(),
            description: "Synthesizes notes, data and charts into a PDF report in \
                          files/reports/. Does not search the web."
                .to_string(),
            tools: strings(&["Skill", "Write", "Glob", "Read", "Bash"]),
            output_dirs: strings(&["files/reports"]),
        },
    ]
}

/// Case-insensitive lookup; `DATA-ANALYST` finds `data-analyst`.
pub fn find_role<'a>(roles: &'a [RoleDefinition], name: &str) -> Option<&'a RoleDefinition> {
    roles.iter().find(|r| r.name.eq_ignore_ascii_case(name))
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
