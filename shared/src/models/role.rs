//! Role Model

use crate::chat::SenderRole;
use crate::order::ActorSide;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account role carried in the access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Owner,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Owner => "owner",
            Role::Staff => "staff",
        }
    }

    /// Owner and staff act for the restaurant
    pub fn side(&self) -> ActorSide {
        match self {
            Role::Customer => ActorSide::Customer,
            Role::Owner | Role::Staff => ActorSide::Restaurant,
        }
    }

    pub fn is_restaurant(&self) -> bool {
        self.side() == ActorSide::Restaurant
    }

    pub fn sender_role(&self) -> SenderRole {
        match self {
            Role::Customer => SenderRole::Customer,
            Role::Owner => SenderRole::Owner,
            Role::Staff => SenderRole::Staff,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "owner" => Ok(Role::Owner),
            "staff" => Ok(Role::Staff),
            other => Err(format!("unknown role: {other}")),
        }
    }
}
