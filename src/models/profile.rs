use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Role;

/// A person known to the practice. Staff profiles belong to auth accounts;
/// client profiles created by an admin may exist without one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(id: Uuid, full_name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            email: email.into(),
            role,
            created_at: Utc::now(),
        }
    }
}
