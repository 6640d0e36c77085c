//! Tenant and domain types for multi-tenancy support

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::slug::{TENANT_SLUG_MAX, normalize_domain_host, validate_slug};
use crate::{Error, Result};

/// Maximum tenant display name length
pub const TENANT_NAME_MAX: usize = 120;

/// Unique identifier for a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Create a new random tenant ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a tenant ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse a tenant ID from a string
    pub fn from_string(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s)
            .map_err(|e| Error::Validation(format!("Invalid tenant ID format: {}", e)))?;
        Ok(Self(uuid))
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

/// Unique identifier for a custom domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(Uuid);

impl DomainId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn from_string(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s)
            .map_err(|e| Error::Validation(format!("Invalid domain ID format: {}", e)))?;
        Ok(Self(uuid))
    }
}

impl Default for DomainId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A site owner. Pages and domains hang off a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    /// Lower-case slug, unique across tenants
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.slug, self.name)
    }
}

/// Fields accepted when creating or editing a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantInput {
    pub name: String,
    pub slug: String,
}

impl TenantInput {
    /// Trim and lower-case the input, then check it against the tenant rules.
    pub fn normalize(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Validation("name must not be empty".to_string()));
        }
        if name.chars().count() > TENANT_NAME_MAX {
            return Err(Error::Validation(format!(
                "name must be at most {} characters",
                TENANT_NAME_MAX
            )));
        }

        let slug = self.slug.trim().to_lowercase();
        validate_slug("slug", &slug, TENANT_SLUG_MAX)?;

        Ok(Self { name, slug })
    }
}

/// Verification state of a custom domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    #[default]
    Pending,
    Active,
    Error,
}

impl DomainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainStatus::Pending => "pending",
            DomainStatus::Active => "active",
            DomainStatus::Error => "error",
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(DomainStatus::Pending),
            "active" => Ok(DomainStatus::Active),
            "error" => Ok(DomainStatus::Error),
            other => Err(Error::Validation(format!("Unknown domain status: {}", other))),
        }
    }
}

/// A hostname that routes to a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub tenant_id: TenantId,
    /// Lower-case hostname, unique across all tenants
    pub host: String,
    pub is_primary: bool,
    pub status: DomainStatus,
    pub verify_token: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when attaching a domain to a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInput {
    pub host: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub status: DomainStatus,
}

impl DomainInput {
    pub fn normalize(self) -> Result<Self> {
        Ok(Self {
            host: normalize_domain_host(&self.host)?,
            ..self
        })
    }
}

/// Partial edit of a domain. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainUpdate {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub is_primary: Option<bool>,
    #[serde(default)]
    pub status: Option<DomainStatus>,
}

/// Admin listing filter for domains
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainFilter {
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    #[serde(default)]
    pub status: Option<DomainStatus>,
    #[serde(default)]
    pub is_primary: Option<bool>,
    /// Case-insensitive match against host and tenant slug
    #[serde(default)]
    pub search: Option<String>,
}

/// Random URL-safe token handed to the domain owner for verification.
pub fn generate_verify_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}
