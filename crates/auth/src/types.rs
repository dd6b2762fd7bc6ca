//! Shared identity types carried in access-token claims

use serde::{Deserialize, Serialize};

/// Tenant team classification. Ordering of privilege: Customer <
/// Maintenance < Super; the "minimum" predicates on `Principal` encode it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TeamType {
    #[default]
    Customer,
    Maintenance,
    Super,
}

impl std::fmt::Display for TeamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamType::Customer => write!(f, "customer"),
            TeamType::Maintenance => write!(f, "maintenance"),
            TeamType::Super => write!(f, "super"),
        }
    }
}
