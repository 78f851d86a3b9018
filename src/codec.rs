//! Helpers for encoding/decoding the signed session token.
//!
//! This is the crate's boundary to the JWT library: session data is carried
//! as the claims mapping of a compact token, signed with a shared secret.
//! Going through this module directly is primarily useful for testing and
//! debugging; applications interact with sessions via
//! [`JwtSession`](crate::JwtSession).

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};

use crate::error::{DecodeError, EncodeError};

/// Reserved claim key carrying the session expiry as epoch seconds.
pub const EXPIRY_CLAIM: &str = "exp";

/// Sign a claims mapping into a compact session token.
pub fn encode(
    claims: &Map<String, Value>,
    secret: &[u8],
    algorithm: Algorithm,
) -> Result<String, EncodeError> {
    let token = jsonwebtoken::encode(
        &Header::new(algorithm),
        claims,
        &EncodingKey::from_secret(secret),
    )?;
    Ok(token)
}

/// Verify a session token and decode it back into a claims mapping.
///
/// Exactly `algorithm` is accepted. No claim is required to be present, but
/// an `exp` claim, when present, is enforced with zero leeway.
pub fn decode(
    token: &str,
    secret: &[u8],
    algorithm: Algorithm,
) -> Result<Map<String, Value>, DecodeError> {
    let mut validation = Validation::new(algorithm);
    validation.required_spec_claims.clear();
    validation.leeway = 0;
    let data = jsonwebtoken::decode::<Map<String, Value>>(
        token,
        &DecodingKey::from_secret(secret),
        &validation,
    )?;
    Ok(data.claims)
}
