//! Multi-tenant isolation primitives.
//!
//! Every persisted entity in Strand is identified by its key *and* its
//! tenant: the same logical id may exist once per tenant, and all state
//! lookups are scoped by tenant.
//!
//! # Example
//!
//! ```rust
//! use strand_core::tenant::TenantId;
//!
//! let tenant = TenantId::new("acme-corp").unwrap();
//! assert_eq!(tenant.as_str(), "acme-corp");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// The tenant used when a record carries no explicit tenant.
pub const DEFAULT_TENANT: &str = "default";

/// A unique identifier for a tenant.
///
/// Tenant IDs must be:
/// - Non-empty
/// - Lowercase alphanumeric with hyphens
/// - At most 63 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a new tenant ID after validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant ID is invalid.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Returns the default tenant.
    #[must_use]
    pub fn default_tenant() -> Self {
        Self(DEFAULT_TENANT.to_string())
    }

    /// Returns the tenant ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a tenant ID string.
    fn validate(id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(Error::InvalidId {
                message: "tenant ID cannot be empty".to_string(),
            });
        }

        if id.len() > 63 {
            return Err(Error::InvalidId {
                message: format!("tenant ID '{id}' is too long (maximum 63 characters)"),
            });
        }

        let valid = id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(Error::InvalidId {
                message: format!(
                    "tenant ID '{id}' contains invalid characters (lowercase alphanumeric and hyphens only)"
                ),
            });
        }

        Ok(())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validates the given tenant, or returns the default tenant when empty.
///
/// Records produced by single-tenant setups carry an empty tenant id; all
/// persisted state normalizes this to [`DEFAULT_TENANT`].
///
/// # Errors
///
/// Returns an error if a non-empty tenant ID fails validation.
pub fn tenant_or_default(tenant_id: &str) -> Result<TenantId> {
    if tenant_id.is_empty() {
        Ok(TenantId::default_tenant())
    } else {
        TenantId::new(tenant_id)
    }
}
