//! Directory seed data loaded from configuration.

use ephra_scheduling::ProviderProfile;
use serde::{Deserialize, Serialize};

/// A user-provider assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSeed {
    pub user_id: String,
    pub provider_id: String,
}

/// Users, providers and assignments to preload into a fresh store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedData {
    /// Active user ids
    pub users: Vec<String>,
    pub providers: Vec<ProviderProfile>,
    pub assignments: Vec<AssignmentSeed>,
}

impl SeedData {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.providers.is_empty() && self.assignments.is_empty()
    }

    /// Every assignment must reference a seeded user and provider.
    pub fn validate(&self) -> Result<(), String> {
        for a in &self.assignments {
            if !self.users.contains(&a.user_id) {
                return Err(format!("assignment references unknown user {}", a.user_id));
            }
            if !self.providers.iter().any(|p| p.provider_id == a.provider_id) {
                return Err(format!(
                    "assignment references unknown care provider {}",
                    a.provider_id
                ));
            }
        }
        Ok(())
    }
}
