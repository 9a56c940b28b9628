//! Caller identity as handed to us by the authenticating gateway.
//!
//! Sessions and credentials live upstream. Every request that reaches the
//! scheduler carries the authenticated username and role in trusted headers.

use std::fmt;
use std::str::FromStr;

use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};

use crate::error::{ClinicError, Result};

pub const USER_HEADER: &str = "X-User-Name";
pub const ROLE_HEADER: &str = "X-User-Role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Doctor,
    Patient,
    Admin,
}

impl FromStr for Role {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DOCTOR" => Ok(Role::Doctor),
            "PATIENT" => Ok(Role::Patient),
            "ADMIN" => Ok(Role::Admin),
            other => Err(ClinicError::validation(format!("unknown role: {other}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Doctor => "DOCTOR",
            Role::Patient => "PATIENT",
            Role::Admin => "ADMIN",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    /// Fails with Forbidden unless the caller holds one of `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ClinicError::forbidden(format!(
                "role {} may not perform this operation",
                self.role
            )))
        }
    }
}

/// Reads the caller's identity from the request headers.
/// Returns None when either header is missing, empty or carries an unknown role.
pub fn current_identity(req: &HttpRequest) -> Option<Identity> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let username = header(USER_HEADER)?;
    let role = header(ROLE_HEADER)?.parse().ok()?;
    Some(Identity::new(username, role))
}

/// Like [`current_identity`] but turns an anonymous caller into an error.
pub fn require_identity(req: &HttpRequest) -> Result<Identity> {
    current_identity(req).ok_or(ClinicError::Unauthenticated)
}
