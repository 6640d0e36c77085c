//! Slug and host normalization

use crate::{Error, Result};

/// Maximum tenant slug length
pub const TENANT_SLUG_MAX: usize = 64;

/// Maximum page slug length
pub const PAGE_SLUG_MAX: usize = 120;

/// Maximum stored host length
pub const HOST_MAX: usize = 255;

/// A slug is a non-empty run of ASCII letters, digits, hyphens and underscores.
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Validate a slug field, naming the field in the error message.
pub fn validate_slug(field: &str, value: &str, max: usize) -> Result<()> {
    if value.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    if value.chars().count() > max {
        return Err(Error::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    if !is_valid_slug(value) {
        return Err(Error::Validation(format!(
            "{} may only contain letters, numbers, hyphens and underscores",
            field
        )));
    }
    Ok(())
}

/// Derive a slug from free text.
///
/// Lower-cases the input, drops everything outside `[a-z0-9_ -]`, collapses
/// runs of spaces and hyphens into one hyphen and trims hyphens at both ends.
/// Non-ASCII characters are dropped. The result may be empty.
pub fn slugify(input: &str, max: usize) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_separator = true;
        }
    }

    if slug.len() > max {
        slug.truncate(max);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}

/// Normalize a request `Host` value: drop the port, trim, lower-case.
///
/// Returns `None` when nothing is left.
pub fn normalize_request_host(raw: &str) -> Option<String> {
    let host = raw.split(':').next().unwrap_or_default().trim().to_lowercase();
    if host.is_empty() { None } else { Some(host) }
}

/// Validate and normalize a host stored in the domain table.
pub fn normalize_domain_host(raw: &str) -> Result<String> {
    let host = raw.trim().to_lowercase();
    if host.is_empty() {
        return Err(Error::Validation("host must not be empty".to_string()));
    }
    if host.chars().count() > HOST_MAX {
        return Err(Error::Validation(format!(
            "host must be at most {} characters",
            HOST_MAX
        )));
    }
    if host
        .chars()
        .any(|c| c.is_whitespace() || c == '/' || c == ':')
    {
        return Err(Error::Validation(format!(
            "host '{}' must be a bare hostname without scheme, port or path",
            host
        )));
    }
    Ok(host)
}
