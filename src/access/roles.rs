use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform-wide role carried in the session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalRole {
    User,
    Admin,
    SuperAdmin,
}

impl GlobalRole {
    /// Elevated roles skip tenant membership checks entirely
    pub fn is_elevated(self) -> bool {
        matches!(self, GlobalRole::Admin | GlobalRole::SuperAdmin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GlobalRole::User => "user",
            GlobalRole::Admin => "admin",
            GlobalRole::SuperAdmin => "super_admin",
        }
    }

    /// Stored values outside the known set fall back to `User`
    pub fn from_db(value: &str) -> Self {
        value.parse().unwrap_or(GlobalRole::User)
    }
}

impl FromStr for GlobalRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(GlobalRole::User),
            "admin" => Ok(GlobalRole::Admin),
            "super_admin" => Ok(GlobalRole::SuperAdmin),
            other => Err(UnknownVariant::new("global role", other)),
        }
    }
}

/// Role a user holds inside one client workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    Owner,
    Admin,
    Editor,
    Viewer,
}

impl ClientRole {
    pub fn can_edit(self) -> bool {
        matches!(self, ClientRole::Owner | ClientRole::Admin | ClientRole::Editor)
    }

    /// Owners and admins manage membership and skip the plan gate
    pub fn is_manager(self) -> bool {
        matches!(self, ClientRole::Owner | ClientRole::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClientRole::Owner => "owner",
            ClientRole::Admin => "admin",
            ClientRole::Editor => "editor",
            ClientRole::Viewer => "viewer",
        }
    }

    /// Unknown stored roles resolve to the least privileged role
    pub fn from_db(value: &str) -> Self {
        value.parse().unwrap_or(ClientRole::Viewer)
    }
}

impl FromStr for ClientRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(ClientRole::Owner),
            "admin" => Ok(ClientRole::Admin),
            "editor" => Ok(ClientRole::Editor),
            "viewer" => Ok(ClientRole::Viewer),
            other => Err(UnknownVariant::new("client role", other)),
        }
    }
}

/// Subscription tier of a client workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Starter,
    Pro,
    Enterprise,
}

impl PlanTier {
    pub fn is_premium(self) -> bool {
        matches!(self, PlanTier::Pro | PlanTier::Enterprise)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Starter => "starter",
            PlanTier::Pro => "pro",
            PlanTier::Enterprise => "enterprise",
        }
    }

    pub fn from_db(value: &str) -> Self {
        value.parse().unwrap_or(PlanTier::Free)
    }
}

impl FromStr for PlanTier {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(PlanTier::Free),
            "starter" => Ok(PlanTier::Starter),
            "pro" => Ok(PlanTier::Pro),
            "enterprise" => Ok(PlanTier::Enterprise),
            other => Err(UnknownVariant::new("plan tier", other)),
        }
    }
}

/// Authentication assurance level of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Aal {
    #[default]
    Aal1,
    Aal2,
}

impl Aal {
    pub fn is_elevated(self) -> bool {
        self == Aal::Aal2
    }
}

/// Parse failure for the string-backed role and tier enums
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}
