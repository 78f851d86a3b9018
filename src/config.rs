use std::borrow::Cow;
use std::fmt;

use jsonwebtoken::Algorithm;
use time::{Duration, OffsetDateTime};
use tower_cookies::Cookie;

use crate::SameSite;

pub const DEFAULT_COOKIE_NAME: &str = "jwtsession";
pub const DEFAULT_CONTEXT_KEY: &str = "jwtsession";
pub const DEFAULT_MAX_AGE_SECS: i64 = 86_400;
pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Shared secret used to sign and verify session tokens.
///
/// Holds an opaque byte sequence; string secrets are taken as their UTF-8
/// bytes. The `Debug` impl never prints the key material.
#[derive(Clone)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

impl From<&str> for SecretKey {
    fn from(secret: &str) -> Self {
        Self(secret.as_bytes().to_vec())
    }
}

impl From<String> for SecretKey {
    fn from(secret: String) -> Self {
        Self(secret.into_bytes())
    }
}

impl From<&[u8]> for SecretKey {
    fn from(secret: &[u8]) -> Self {
        Self(secret.to_vec())
    }
}

impl From<Vec<u8>> for SecretKey {
    fn from(secret: Vec<u8>) -> Self {
        Self(secret)
    }
}

impl<const N: usize> From<&[u8; N]> for SecretKey {
    fn from(secret: &[u8; N]) -> Self {
        Self(secret.to_vec())
    }
}

#[derive(Debug, Clone)]
pub struct JwtSessionConfig {
    pub(crate) secret_key: SecretKey,
    pub(crate) cookie_name: Cow<'static, str>,
    pub(crate) context_key: Cow<'static, str>,
    pub(crate) max_age: Option<Duration>,
    pub(crate) algorithm: Algorithm,
    pub(crate) path: Cow<'static, str>,
    pub(crate) domain: Option<Cow<'static, str>>,
    pub(crate) secure: bool,
    pub(crate) http_only: bool,
    pub(crate) same_site: Option<SameSite>,
    pub(crate) max_cookie_bytes: usize,
}

impl JwtSessionConfig {
    /// A config with the given signing secret and every other option at its
    /// default. There is no default secret.
    #[must_use]
    pub fn new(secret_key: impl Into<SecretKey>) -> Self {
        Self {
            secret_key: secret_key.into(),
            cookie_name: DEFAULT_COOKIE_NAME.into(),
            context_key: DEFAULT_CONTEXT_KEY.into(),
            max_age: Some(Duration::seconds(DEFAULT_MAX_AGE_SECS)),
            algorithm: DEFAULT_ALGORITHM,
            path: "/".into(),
            domain: None,
            secure: false,
            http_only: false,
            same_site: None,
            max_cookie_bytes: 4096,
        }
    }

    #[must_use]
    pub fn with_cookie_name<N: Into<Cow<'static, str>>>(mut self, cookie_name: N) -> Self {
        self.cookie_name = cookie_name.into();
        self
    }

    #[must_use]
    pub fn with_context_key<K: Into<Cow<'static, str>>>(mut self, context_key: K) -> Self {
        self.context_key = context_key.into();
        self
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    #[must_use]
    pub fn without_max_age(mut self) -> Self {
        self.max_age = None;
        self
    }

    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn with_path<P: Into<Cow<'static, str>>>(mut self, path: P) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_domain<D: Into<Cow<'static, str>>>(mut self, domain: D) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn without_domain(mut self) -> Self {
        self.domain = None;
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    #[must_use]
    pub fn with_max_cookie_bytes(mut self, max_cookie_bytes: usize) -> Self {
        self.max_cookie_bytes = max_cookie_bytes;
        self
    }

    pub(crate) fn build_cookie(
        &self,
        value: String,
        expires: Option<OffsetDateTime>,
    ) -> Cookie<'static> {
        let mut cookie_builder = Cookie::build((self.cookie_name.clone(), value))
            .http_only(self.http_only)
            .secure(self.secure)
            .path(self.path.clone());

        if let Some(max_age) = self.max_age {
            cookie_builder = cookie_builder.max_age(max_age);
        }

        if let Some(same_site) = self.same_site {
            cookie_builder = cookie_builder.same_site(same_site);
        }

        if let Some(domain) = self.domain.clone() {
            cookie_builder = cookie_builder.domain(domain);
        }

        if let Some(expires) = expires {
            cookie_builder = cookie_builder.expires(expires);
        }

        cookie_builder.build()
    }
}
