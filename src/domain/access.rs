use crate::error::PaymentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Team,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Client => "client",
            Role::Team => "team",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "team" => Ok(Role::Team),
            "admin" => Ok(Role::Admin),
            other => Err(PaymentError::Config(format!("unknown role '{other}'"))),
        }
    }
}

/// Who is making a request, and the credential to forward to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub role: Role,
    pub token: Option<String>,
}

impl RequestContext {
    pub fn new(role: Role, token: Option<String>) -> Self {
        Self { role, token }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// Capability check evaluated before an operation runs.
#[derive(Debug, Clone, Copy)]
pub struct Guard {
    action: &'static str,
    allowed: &'static [Role],
}

impl Guard {
    pub const fn new(action: &'static str, allowed: &'static [Role]) -> Self {
        Self { action, allowed }
    }

    pub fn require(&self, ctx: &RequestContext) -> Result<(), PaymentError> {
        if self.allowed.contains(&ctx.role) {
            Ok(())
        } else {
            Err(PaymentError::Forbidden {
                role: ctx.role.to_string(),
                action: self.action.to_string(),
            })
        }
    }
}

/// Any signed-in role may buy tickets.
pub const PURCHASE: Guard = Guard::new("purchase tickets", &[Role::Client, Role::Team, Role::Admin]);

/// Bulk purchases are an operator action.
pub const BATCH_PURCHASE: Guard = Guard::new("run batch purchases", &[Role::Team, Role::Admin]);
