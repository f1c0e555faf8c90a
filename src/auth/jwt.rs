//! Unverified JWT expiry inspection.
//!
//! The `exp` claim is read without checking the signature. The result is an
//! advisory scheduling hint for the proactive sweep and must never be used to
//! decide whether a token is trustworthy; the auth service is the only
//! authority on that.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

/// JWT claims for extracting expiration time.
#[derive(Deserialize)]
struct JwtClaims {
    exp: i64,
}

/// Extract the `exp` claim (Unix seconds) from a JWT.
///
/// Returns None if the token is not a three-part JWT or has no numeric `exp`.
pub fn jwt_expiry(token: &str) -> Option<i64> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    // Some issuers pad their base64 segments.
    let payload = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: JwtClaims = serde_json::from_slice(&payload).ok()?;
    Some(claims.exp)
}

/// Seconds until the token expires, relative to `now` (Unix seconds).
///
/// Negative when the token has already expired.
pub fn jwt_remaining_secs(token: &str, now: i64) -> Option<i64> {
    jwt_expiry(token).map(|exp| exp - now)
}

#[cfg(test)]
pub(crate) fn make_test_jwt(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"u1","exp":{}}}"#, exp));
    format!("{}.{}.signature", header, payload)
}
