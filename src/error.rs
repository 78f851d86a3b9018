use thiserror::Error;

/// Failure to verify and decode an inbound session token.
///
/// Every variant is attacker-influenced: the token came off the wire, so the
/// middleware treats any value of this type as "no session" rather than
/// surfacing it to the handler.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The token carried an `exp` claim that is in the past.
    #[error("session token expired")]
    Expired(#[source] jsonwebtoken::errors::Error),

    /// The token is malformed, carries the wrong algorithm, or its signature
    /// does not verify.
    #[error("invalid session token")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Failure to encode a session into an outbound cookie.
///
/// These are operator errors, not attacker input; callers are expected to let
/// them surface instead of swallowing them.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// `encode` was called on a session constructed without a secret key.
    #[error("no secret key configured for session encoding")]
    MissingSecretKey,

    /// Claim serialization or signing failed.
    #[error("session token signing failed")]
    Sign(#[from] jsonwebtoken::errors::Error),

    /// The encoded token does not fit the configured cookie size limit.
    #[error("encoded session cookie is {size} bytes, exceeding the {limit}-byte limit")]
    CookieTooLarge { size: usize, limit: usize },
}

impl From<jsonwebtoken::errors::Error> for DecodeError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired(err),
            _ => Self::Invalid(err),
        }
    }
}
