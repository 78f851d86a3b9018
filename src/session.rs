use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use jsonwebtoken::Algorithm;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tower_cookies::Cookies;

use crate::codec;
use crate::config::{DEFAULT_ALGORITHM, JwtSessionConfig, SecretKey};
use crate::error::{DecodeError, EncodeError};

/// A request-scoped session carried entirely inside a signed cookie.
///
/// The session is a mutable claims mapping plus the secret and algorithm
/// used to round-trip it through the token codec. Handles are cheap clones
/// of one shared state: the copy a handler pulls out of request extensions
/// and the copy the middleware keeps refer to the same data.
///
/// Every write (insert, remove, clear) marks the session modified; reads do
/// not. [`should_save`](Self::should_save) exposes that flag, and it is what
/// decides whether a `Set-Cookie` header goes out at the end of the request.
#[derive(Debug, Clone, Default)]
pub struct JwtSession {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    data: Mutex<Map<String, Value>>,
    modified: AtomicBool,
    secret_key: Option<SecretKey>,
    algorithm: Algorithm,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            data: Mutex::new(Map::new()),
            modified: AtomicBool::new(false),
            secret_key: None,
            algorithm: DEFAULT_ALGORITHM,
        }
    }
}

impl JwtSession {
    /// An empty session with no secret key. [`encode`](Self::encode) fails
    /// with [`EncodeError::MissingSecretKey`] until a keyed session is built
    /// instead.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty session bound to a signing secret and algorithm.
    #[must_use]
    pub fn empty(secret_key: impl Into<SecretKey>, algorithm: Algorithm) -> Self {
        Self::from_map(Map::new(), secret_key, algorithm)
    }

    /// A session wrapping existing claims, not yet considered modified.
    #[must_use]
    pub fn from_map(
        data: Map<String, Value>,
        secret_key: impl Into<SecretKey>,
        algorithm: Algorithm,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                data: Mutex::new(data),
                modified: AtomicBool::new(false),
                secret_key: Some(secret_key.into()),
                algorithm,
            }),
        }
    }

    /// Verify `token` and load it as a session.
    ///
    /// A freshly decoded session is not modified. Any verification or
    /// structural failure, including an expired `exp` claim, comes back as a
    /// [`DecodeError`].
    pub fn decode(
        token: &str,
        secret_key: impl Into<SecretKey>,
        algorithm: Algorithm,
    ) -> Result<Self, DecodeError> {
        let secret_key = secret_key.into();
        let claims = codec::decode(token, secret_key.as_bytes(), algorithm)?;
        Ok(Self::from_map(claims, secret_key, algorithm))
    }

    /// Load a session from a request's cookie value.
    ///
    /// An absent or empty value yields an empty keyed session without
    /// attempting a decode; anything else goes through
    /// [`decode`](Self::decode) and propagates its error for the caller to
    /// handle.
    pub fn from_request_cookie(
        cookie_value: Option<&str>,
        secret_key: impl Into<SecretKey>,
        algorithm: Algorithm,
    ) -> Result<Self, DecodeError> {
        match cookie_value {
            None | Some("") => Ok(Self::empty(secret_key, algorithm)),
            Some(token) => Self::decode(token, secret_key, algorithm),
        }
    }

    fn data(&self) -> MutexGuard<'_, Map<String, Value>> {
        // A poisoned lock means a handler panicked mid-write; the session is
        // request-scoped, so carry on with whatever state it reached.
        self.inner.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Single gate for every write path.
    fn mark_modified(&self) {
        self.inner.modified.store(true, Ordering::Release);
    }

    /// Whether any write has happened since this session was constructed.
    pub fn is_modified(&self) -> bool {
        self.inner.modified.load(Ordering::Acquire)
    }

    /// True if the session needs to be written back to the client.
    pub fn should_save(&self) -> bool {
        self.is_modified()
    }

    /// Get a value, deserialized into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        self.get_value(key).map(serde_json::from_value).transpose()
    }

    /// Get a raw value.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.data().get(key).cloned()
    }

    /// Serialize `value` and store it under `key`, marking the session
    /// modified. Serialization failure leaves the session untouched.
    pub fn insert<T: Serialize>(
        &self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.insert_value(key, value);
        Ok(())
    }

    /// Store a raw value under `key`, marking the session modified.
    pub fn insert_value(&self, key: impl Into<String>, value: Value) {
        self.data().insert(key.into(), value);
        self.mark_modified();
    }

    /// Remove a value, deserialized into `T`.
    pub fn remove<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        self.remove_value(key).map(serde_json::from_value).transpose()
    }

    /// Remove a raw value. The session is marked modified only when `key`
    /// was actually present.
    pub fn remove_value(&self, key: &str) -> Option<Value> {
        let removed = self.data().remove(key);
        if removed.is_some() {
            self.mark_modified();
        }
        removed
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data().contains_key(key)
    }

    /// A snapshot of the session's keys.
    pub fn keys(&self) -> Vec<String> {
        self.data().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    /// Drop every value. Marks the session modified unless it already was
    /// empty.
    pub fn clear(&self) {
        let mut data = self.data();
        if !data.is_empty() {
            self.mark_modified();
        }
        data.clear();
    }

    /// A snapshot of the claims mapping.
    pub fn to_map(&self) -> Map<String, Value> {
        self.data().clone()
    }

    /// The algorithm this session signs and verifies with.
    pub fn algorithm(&self) -> Algorithm {
        self.inner.algorithm
    }

    /// Sign the session into a compact token.
    ///
    /// With `expires_at` set, the timestamp is first written into the claims
    /// under the reserved [`codec::EXPIRY_CLAIM`] key (a write like any
    /// other, so it marks the session modified) and enforced by
    /// [`decode`](Self::decode) from then on. The modified flag is never
    /// cleared here.
    pub fn encode(&self, expires_at: Option<OffsetDateTime>) -> Result<String, EncodeError> {
        let secret_key = self
            .inner
            .secret_key
            .as_ref()
            .ok_or(EncodeError::MissingSecretKey)?;
        if let Some(expires_at) = expires_at {
            self.insert_value(codec::EXPIRY_CLAIM, Value::from(expires_at.unix_timestamp()));
        }
        let claims = self.data().clone();
        codec::encode(&claims, secret_key.as_bytes(), self.inner.algorithm)
    }

    /// Write the session into the cookie jar if it needs saving.
    ///
    /// A no-op unless `force` is set or [`should_save`](Self::should_save)
    /// holds; returns whether a cookie was added. `session_expires` (falling
    /// back to `expires`) becomes the token's `exp` claim, while `expires`
    /// also sets the cookie's own `Expires` attribute; the remaining cookie
    /// attributes come from `config`.
    pub fn save_cookie(
        &self,
        cookies: &Cookies,
        config: &JwtSessionConfig,
        expires: Option<OffsetDateTime>,
        session_expires: Option<OffsetDateTime>,
        force: bool,
    ) -> Result<bool, EncodeError> {
        if !(force || self.should_save()) {
            return Ok(false);
        }
        self.write_cookie(cookies, config, expires, session_expires.or(expires))?;
        Ok(true)
    }

    pub(crate) fn write_cookie(
        &self,
        cookies: &Cookies,
        config: &JwtSessionConfig,
        cookie_expires: Option<OffsetDateTime>,
        token_expires: Option<OffsetDateTime>,
    ) -> Result<(), EncodeError> {
        let token = self.encode(token_expires)?;
        if token.len() > config.max_cookie_bytes {
            return Err(EncodeError::CookieTooLarge {
                size: token.len(),
                limit: config.max_cookie_bytes,
            });
        }
        cookies.add(config.build_cookie(token, cookie_expires));
        Ok(())
    }
}

/// Request-extension registry exposing sessions under their configured
/// context key.
///
/// Each session layer binds its session here under its own
/// [`context_key`](crate::JwtSessionConfig::with_context_key), so stacked
/// session layers with distinct keys coexist on one request. The layer also
/// inserts the innermost [`JwtSession`] as a plain typed extension for the
/// common single-layer case.
#[derive(Debug, Clone, Default)]
pub struct Sessions {
    map: HashMap<Cow<'static, str>, JwtSession>,
}

impl Sessions {
    /// The session bound under `context_key`, if any.
    pub fn get(&self, context_key: &str) -> Option<&JwtSession> {
        self.map.get(context_key)
    }

    pub(crate) fn insert(&mut self, context_key: Cow<'static, str>, session: JwtSession) {
        self.map.insert(context_key, session);
    }
}
