//! Trust-cookie codec.
//!
//! The legacy CMS asserts "this browser already authenticated as subject X"
//! through a cookie whose value is `<hex-mac>:<subject-id>`. The MAC is
//! HMAC-SHA256 over the subject id, keyed with the secret salt shared
//! between the CMS and this bridge. The salt never appears on the wire.
//!
//! Compatibility note: the original PHP module signed with a single-round
//! `sha1(salt . uid)`, which is not a keyed MAC. This codec deliberately
//! breaks that wire format — both sides of the bridge must mint HMAC-SHA256
//! cookies.
//!
//! The codec is pure: reading, clearing, and expiring the cookie at the
//! HTTP layer is the caller's job.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Trust-cookie verification failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CookieError {
    /// Token is not two non-empty colon-delimited fields.
    #[error("malformed trust cookie")]
    MalformedToken,

    /// Signature does not match the subject id under the shared salt.
    #[error("trust cookie signature mismatch")]
    SignatureMismatch,

    /// Subject id contains the wire delimiter and cannot be encoded.
    #[error("subject id must not contain ':'")]
    InvalidSubject,
}

fn signature(subject_id: &str, secret_salt: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret_salt.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(subject_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Encode a trust cookie value for `subject_id`.
pub fn encode(subject_id: &str, secret_salt: &str) -> Result<String, CookieError> {
    if subject_id.is_empty() || subject_id.contains(':') {
        return Err(CookieError::InvalidSubject);
    }
    Ok(format!("{}:{}", signature(subject_id, secret_salt), subject_id))
}

/// Decode and verify a trust cookie value, returning the subject id.
///
/// The comparison is constant-time; a wrong-length signature is a
/// `SignatureMismatch`, not a malformed token, so tampering with either
/// segment is indistinguishable from a bad MAC.
pub fn decode(token: &str, secret_salt: &str) -> Result<String, CookieError> {
    let (provided_sig, subject_id) = token
        .split_once(':')
        .ok_or(CookieError::MalformedToken)?;
    if provided_sig.is_empty() || subject_id.is_empty() {
        return Err(CookieError::MalformedToken);
    }

    let expected = signature(subject_id, secret_salt);
    let matches: bool = expected
        .as_bytes()
        .ct_eq(provided_sig.as_bytes())
        .into();
    if !matches {
        return Err(CookieError::SignatureMismatch);
    }

    Ok(subject_id.to_string())
}
