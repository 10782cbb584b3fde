//! Scope catalog and role definitions.
//!
//! Scopes are opaque `verb:resource` atoms; only exact set membership
//! matters. Each [`Role`] maps to a canonical scope set, and the sets are
//! strictly nested: `User ⊂ CareProvider ⊂ Admin`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// Appointment management
pub const JOIN_APPOINTMENTS: &str = "join:appointments";
pub const CREATE_APPOINTMENTS: &str = "create:appointments";
pub const UPDATE_APPOINTMENTS: &str = "update:appointments";
pub const CANCEL_APPOINTMENTS: &str = "cancel:appointments";
pub const VIEW_ALL_APPOINTMENTS: &str = "view:all-appointments";

// User management
pub const VIEW_ASSIGNED_USERS: &str = "view:assigned-users";
pub const MANAGE_USER_ASSIGNMENTS: &str = "manage:user-assignments";
pub const VIEW_USER_PROFILES: &str = "view:user-profiles";

// Care provider features
pub const MANAGE_AVAILABILITY: &str = "manage:availability";
pub const VIEW_CARE_DASHBOARD: &str = "view:care-dashboard";

// Journals
pub const CREATE_JOURNALS: &str = "create:journals";
pub const VIEW_PATIENT_JOURNALS: &str = "view:patient-journals";

// Admin
pub const ACCESS_ADMIN_PANEL: &str = "access:admin-panel";
pub const MANAGE_ALL_USERS: &str = "manage:all-users";
pub const VIEW_SYSTEM_STATS: &str = "view:system-stats";

/// Every scope atom known to the system.
pub const ALL_SCOPES: &[&str] = &[
    JOIN_APPOINTMENTS,
    CREATE_APPOINTMENTS,
    UPDATE_APPOINTMENTS,
    CANCEL_APPOINTMENTS,
    VIEW_ALL_APPOINTMENTS,
    VIEW_ASSIGNED_USERS,
    MANAGE_USER_ASSIGNMENTS,
    VIEW_USER_PROFILES,
    MANAGE_AVAILABILITY,
    VIEW_CARE_DASHBOARD,
    CREATE_JOURNALS,
    VIEW_PATIENT_JOURNALS,
    ACCESS_ADMIN_PANEL,
    MANAGE_ALL_USERS,
    VIEW_SYSTEM_STATS,
];

const USER_SCOPES: &[&str] = &[JOIN_APPOINTMENTS, CREATE_JOURNALS, CANCEL_APPOINTMENTS];

const CARE_PROVIDER_SCOPES: &[&str] = &[
    JOIN_APPOINTMENTS,
    CREATE_JOURNALS,
    CANCEL_APPOINTMENTS,
    CREATE_APPOINTMENTS,
    UPDATE_APPOINTMENTS,
    VIEW_ALL_APPOINTMENTS,
    VIEW_ASSIGNED_USERS,
    VIEW_USER_PROFILES,
    MANAGE_AVAILABILITY,
    VIEW_CARE_DASHBOARD,
    VIEW_PATIENT_JOURNALS,
];

const ADMIN_SCOPES: &[&str] = &[
    JOIN_APPOINTMENTS,
    CREATE_JOURNALS,
    CANCEL_APPOINTMENTS,
    CREATE_APPOINTMENTS,
    UPDATE_APPOINTMENTS,
    VIEW_ALL_APPOINTMENTS,
    VIEW_ASSIGNED_USERS,
    VIEW_USER_PROFILES,
    MANAGE_AVAILABILITY,
    VIEW_CARE_DASHBOARD,
    VIEW_PATIENT_JOURNALS,
    ACCESS_ADMIN_PANEL,
    MANAGE_ALL_USERS,
    MANAGE_USER_ASSIGNMENTS,
    VIEW_SYSTEM_STATS,
];

/// Returns `true` if `scope` is part of the catalog.
pub fn is_known_scope(scope: &str) -> bool {
    ALL_SCOPES.contains(&scope)
}

/// A named bundle of scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    CareProvider,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::CareProvider, Role::Admin];

    /// The canonical scope set for this role.
    #[must_use]
    pub fn scopes(self) -> &'static [&'static str] {
        match self {
            Self::User => USER_SCOPES,
            Self::CareProvider => CARE_PROVIDER_SCOPES,
            Self::Admin => ADMIN_SCOPES,
        }
    }

    #[must_use]
    pub fn grants(self, scope: &str) -> bool {
        self.scopes().contains(&scope)
    }

    /// Infers a role from a granted scope set.
    ///
    /// Fallback for tokens that carry no explicit role claim:
    /// `manage:all-users` means admin, `create:appointments` means care
    /// provider, anything else is a plain user.
    pub fn from_scopes<'a, I>(scopes: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut role = Self::User;
        for scope in scopes {
            if scope == MANAGE_ALL_USERS {
                return Self::Admin;
            }
            if scope == CREATE_APPOINTMENTS {
                role = Self::CareProvider;
            }
        }
        role
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::CareProvider => "care_provider",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "user" => Ok(Self::User),
            "care_provider" => Ok(Self::CareProvider),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}
