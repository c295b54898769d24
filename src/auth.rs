//! Actor identity and role.
//!
//! Role resolution itself lives outside the core; callers resolve whoever is
//! making the request into an [`Actor`] and pass it into every operation.
//! Approval gates only ever consult [`Actor::is_manager_level`].

use serde::{Deserialize, Serialize};

/// Role attached to an actor for the duration of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Employee,
    Manager,
}

/// The identity performing a core operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub username: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(username: impl Into<String>, role: ActorRole) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    pub fn employee(username: impl Into<String>) -> Self {
        Self::new(username, ActorRole::Employee)
    }

    pub fn manager(username: impl Into<String>) -> Self {
        Self::new(username, ActorRole::Manager)
    }

    /// Managers may approve orders and cancellations; employees may not.
    pub fn is_manager_level(&self) -> bool {
        self.role == ActorRole::Manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_level_check() {
        assert!(Actor::manager("ana").is_manager_level());
        assert!(!Actor::employee("bob").is_manager_level());
    }
}
