// [[AGENTDECK]]/apps/console-server/src/names.rs
// Purpose: Resolves agent ids to display names for tables that only carry ids.
// Architecture: Domain Logic Layer
// Dependencies: Models

use std::collections::HashMap;

use crate::models::AgentAggregate;
use crate::policy::AGENT_ID_PREFIX_LEN;

const ELLIPSIS: char = '…';

#[derive(Debug, Clone, Default)]
pub struct AgentNameLookup {
    names: HashMap<String, String>,
}

impl AgentNameLookup {
    pub fn from_aggregates(aggregates: &[AgentAggregate]) -> Self {
        let names = aggregates
            .iter()
            .filter_map(|a| {
                a.agent_name
                    .as_deref()
                    .filter(|name| !name.is_empty())
                    .map(|name| (a.agent_id.clone(), name.to_string()))
            })
            .collect();

        Self { names }
    }

    pub fn get(&self, agent_id: &str) -> Option<&str> {
        self.names.get(agent_id).map(String::as_str)
    }

    /// Known name, else a truncated id. Never empty.
    pub fn resolve(&self, agent_id: Option<&str>) -> String {
        match agent_id {
            Some(id) if !id.is_empty() => self
                .get(id)
                .map(str::to_string)
                .unwrap_or_else(|| truncate_id(id)),
            _ => "-".to_string(),
        }
    }

    /// Pointers (last run, most expensive) may already carry the name inline.
    pub fn display_agent(&self, agent_name: Option<&str>, agent_id: Option<&str>) -> String {
        match agent_name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.resolve(agent_id),
        }
    }
}

pub fn truncate_id(id: &str) -> String {
    let mut short: String = id.chars().take(AGENT_ID_PREFIX_LEN).collect();
    short.push(ELLIPSIS);
    short
}
