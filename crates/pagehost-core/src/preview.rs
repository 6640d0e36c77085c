//! Time-limited signed preview links
//!
//! A preview token lets an editor look at a page before it is published.
//! Tokens have three dot-separated parts:
//! - base64url JSON claims (`{"page_id": 12}`)
//! - issue time as hex unix seconds
//! - base64url HMAC-SHA256 over `"<salt>:<claims>.<issued>"`
//!
//! The signature covers the timestamp and is checked before the age.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::page::PageId;

type HmacSha256 = Hmac<Sha256>;

/// Namespace mixed into every preview signature
pub const PREVIEW_SALT: &str = "pages.preview";

/// Default lifetime of a preview link
pub const DEFAULT_MAX_AGE_SECS: i64 = 3600;

/// Tolerated clock drift for tokens issued "in the future"
const CLOCK_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewTokenError {
    #[error("malformed token")]
    Malformed,

    #[error("signature mismatch")]
    BadSignature,

    #[error("token expired {age_secs}s after issue (max {max_age_secs}s)")]
    Expired { age_secs: i64, max_age_secs: i64 },
}

#[derive(Debug, Serialize, Deserialize)]
struct PreviewClaims {
    page_id: PageId,
}

/// Issues and checks preview tokens with a server-side secret
#[derive(Clone)]
pub struct PreviewSigner {
    key: Vec<u8>,
    max_age: Duration,
}

impl std::fmt::Debug for PreviewSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewSigner")
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl PreviewSigner {
    pub fn new(secret: impl AsRef<[u8]>, max_age: Duration) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
            max_age,
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Sign a preview grant for `page_id` issued at `now`.
    pub fn sign(&self, page_id: PageId, now: DateTime<Utc>) -> String {
        let claims = serde_json::json!({ "page_id": page_id });
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        let issued = format!("{:x}", now.timestamp().max(0));

        let signature = URL_SAFE_NO_PAD.encode(
            self.mac(&payload, &issued)
                .finalize()
                .into_bytes(),
        );

        format!("{}.{}.{}", payload, issued, signature)
    }

    /// Check a token and return the page it grants access to.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<PageId, PreviewTokenError> {
        let mut parts = token.split('.');
        let (Some(payload), Some(issued), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(PreviewTokenError::Malformed);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| PreviewTokenError::Malformed)?;
        self.mac(payload, issued)
            .verify_slice(&signature)
            .map_err(|_| PreviewTokenError::BadSignature)?;

        let issued_at =
            i64::from_str_radix(issued, 16).map_err(|_| PreviewTokenError::Malformed)?;
        let age_secs = now.timestamp().saturating_sub(issued_at);
        if age_secs < -CLOCK_SKEW_SECS {
            return Err(PreviewTokenError::Malformed);
        }
        let max_age_secs = self.max_age.num_seconds();
        if age_secs > max_age_secs {
            return Err(PreviewTokenError::Expired {
                age_secs,
                max_age_secs,
            });
        }

        let claims = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| PreviewTokenError::Malformed)?;
        let claims: PreviewClaims =
            serde_json::from_slice(&claims).map_err(|_| PreviewTokenError::Malformed)?;

        Ok(claims.page_id)
    }

    fn mac(&self, payload: &str, issued: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(PREVIEW_SALT.as_bytes());
        mac.update(b":");
        mac.update(payload.as_bytes());
        mac.update(b".");
        mac.update(issued.as_bytes());
        mac
    }
}
