//! Application State

use std::sync::Arc;

use skills_core::Agent;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Agent wired to the configured provider and the loaded skills
    pub agent: Arc<Agent>,
}

impl AppState {
    pub fn new(agent: Agent) -> Self {
        Self { agent: Arc::new(agent) }
    }

    /// Names of the loaded skills, in registry order
    pub fn skills_loaded(&self) -> Vec<String> {
        self.agent.registry().names().into_iter().map(String::from).collect()
    }
}
