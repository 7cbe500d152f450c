use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Permission level of a profile.
///
/// Variants are declared lowest first so the derived `Ord` encodes the
/// hierarchy: every admin is also a lawyer, every lawyer also a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Lawyer,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Client, Role::Lawyer, Role::Admin];

    /// Whether this role may open something gated on `required`.
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Lawyer => "lawyer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "lawyer" => Ok(Role::Lawyer),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_satisfies_everything() {
        for required in Role::ALL {
            assert!(Role::Admin.satisfies(required));
        }
    }

    #[test]
    fn lawyer_satisfies_lawyer_and_client_only() {
        assert!(Role::Lawyer.satisfies(Role::Client));
        assert!(Role::Lawyer.satisfies(Role::Lawyer));
        assert!(!Role::Lawyer.satisfies(Role::Admin));
    }

    #[test]
    fn client_satisfies_only_client() {
        assert!(Role::Client.satisfies(Role::Client));
        assert!(!Role::Client.satisfies(Role::Lawyer));
        assert!(!Role::Client.satisfies(Role::Admin));
    }

    #[test]
    fn parses_and_serializes_lowercase() {
        assert_eq!("Lawyer".parse::<Role>().unwrap(), Role::Lawyer);
        assert!("judge".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"client\"").unwrap();
        assert_eq!(role, Role::Client);
    }
}
