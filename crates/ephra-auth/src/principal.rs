//! The authenticated caller for one request.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::scopes::Role;

/// Validated identity and scope set of the caller.
///
/// Built from a verified token by the validator (or by tests through the
/// builder methods). Never persisted as an authorization record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    subject_id: String,
    scopes: BTreeSet<String>,
    audience: BTreeSet<String>,
    client_id: Option<String>,
    organization_id: Option<String>,
    /// Role asserted by the identity provider, if the token carried one.
    explicit_role: Option<Role>,
}

impl Principal {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            scopes: BTreeSet::new(),
            audience: BTreeSet::new(),
            client_id: None,
            organization_id: None,
            explicit_role: None,
        }
    }

    /// Creates a principal holding exactly the canonical scopes of `role`.
    pub fn with_role_scopes(subject_id: impl Into<String>, role: Role) -> Self {
        Self::new(subject_id)
            .with_scopes(role.scopes().iter().copied())
            .with_role(role)
    }

    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes.extend(scopes.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_audience<I, S>(mut self, audience: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience.extend(audience.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    #[must_use]
    pub fn with_organization_id(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.explicit_role = Some(role);
        self
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    pub fn audience(&self) -> &BTreeSet<String> {
        &self.audience
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    /// The acting role.
    ///
    /// An explicit role claim wins; otherwise the role is inferred from
    /// the scope set.
    pub fn role(&self) -> Role {
        self.explicit_role
            .unwrap_or_else(|| Role::from_scopes(self.scopes.iter().map(String::as_str)))
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    pub fn is_self(&self, user_id: &str) -> bool {
        self.subject_id == user_id
    }
}
