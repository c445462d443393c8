//! Typed caller identity.
//!
//! The upstream auth layer hands every request an identity blob of the form
//! `{"token": "<bearer>", "role_name": "Super Admin", "user_id": 12}`. It is decoded exactly once, at the boundary,
//! into a [`CallerIdentity`]; nothing downstream inspects the raw blob.
use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SUPER_ADMIN_ROLE: &str = "Super Admin";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("The caller identity is not valid JSON: {0}")]
    Malformed(String),
    #[error("The caller identity does not carry a bearer token")]
    MissingToken,
    #[error("The caller identity does not carry a role")]
    MissingRole,
}

//--------------------------------------         Role          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    SuperAdmin,
    Customer,
    Other(String),
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        match value {
            SUPER_ADMIN_ROLE => Role::SuperAdmin,
            "Customer" => Role::Customer,
            other => Role::Other(other.to_string()),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::SuperAdmin => write!(f, "{SUPER_ADMIN_ROLE}"),
            Role::Customer => write!(f, "Customer"),
            Role::Other(s) => write!(f, "{s}"),
        }
    }
}

//--------------------------------------    CallerIdentity     ---------------------------------------------------------
#[derive(Deserialize, Serialize)]
struct RawIdentity {
    token: Option<String>,
    role_name: Option<String>,
    user_id: Option<i64>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    token: String,
    role: Role,
    user_id: Option<i64>,
}

impl Debug for CallerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CallerIdentity(role: {}, user_id: {:?}, token: ****)", self.role, self.user_id)
    }
}

impl CallerIdentity {
    pub fn new<S: Into<String>>(token: S, role: Role, user_id: Option<i64>) -> Self {
        Self { token: token.into(), role, user_id }
    }

    pub fn from_json(blob: &str) -> Result<Self, IdentityError> {
        let raw = serde_json::from_str::<RawIdentity>(blob).map_err(|e| IdentityError::Malformed(e.to_string()))?;
        let token = raw.token.filter(|t| !t.is_empty()).ok_or(IdentityError::MissingToken)?;
        let role = raw.role_name.filter(|r| !r.is_empty()).ok_or(IdentityError::MissingRole)?;
        Ok(Self { token, role: Role::from(role.as_str()), user_id: raw.user_id })
    }

    pub fn token(&self) -> &str {
        self.token.as_str()
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self.role, Role::SuperAdmin)
    }

    /// Whether the caller may act for `user_id`: super admins for anyone, everyone else only for themselves.
    pub fn may_act_for(&self, user_id: i64) -> bool {
        self.is_super_admin() || self.user_id == Some(user_id)
    }
}
