//! Stateless, signed-cookie sessions for `tower` services.
//!
//! This crate provides a layer that materializes a [`JwtSession`] from a JWT
//! carried in a cookie, inserts it into request extensions, and re-issues the
//! cookie when the session changed. The token round-tripped through the
//! client is the only place session state lives; there is no server-side
//! session store.
//!
//! A missing, malformed, tampered, or expired cookie never fails the request:
//! the client transparently gets a fresh empty session instead, with nothing
//! in the response saying why the old one was rejected.
//!
//! A session whose data mapping is empty is re-advertised with a `Set-Cookie`
//! on every response, even when nothing wrote to it. Clients therefore
//! observe a session identity from the very first response, at the cost of
//! re-signing a cookie for apps that never touch their session.
//!
//! # Security
//! Tokens are signed, not encrypted: the middleware guarantees integrity and
//! authenticity of session contents, never secrecy. A client can read
//! everything stored in its session by base64-decoding the cookie, so never
//! put secrets in it. What a client cannot do is alter the contents without
//! the signature check failing.

pub mod codec;
mod config;
mod error;
pub mod layer;
mod session;

pub use jsonwebtoken::Algorithm;
pub use tower_cookies::cookie::SameSite;

pub use crate::codec::EXPIRY_CLAIM;
pub use crate::config::{
    DEFAULT_ALGORITHM, DEFAULT_CONTEXT_KEY, DEFAULT_COOKIE_NAME, DEFAULT_MAX_AGE_SECS,
    JwtSessionConfig, SecretKey,
};
pub use crate::error::{DecodeError, EncodeError};
pub use crate::layer::{JwtSessionManager, JwtSessionManagerLayer};
pub use crate::session::{JwtSession, Sessions};

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use axum::body::Body;
    use http::{Request, Response, header};
    use tower::{ServiceBuilder, ServiceExt as _};
    use tower_cookies::Cookie;

    use crate::{Algorithm, JwtSession, JwtSessionConfig, JwtSessionManagerLayer, Sessions};

    const SECRET: &str = "an adequately long and random test secret";

    fn make_layer() -> JwtSessionManagerLayer {
        JwtSessionManagerLayer::new(JwtSessionConfig::new(SECRET))
    }

    async fn handler(req: Request<Body>) -> Result<Response<Body>, Infallible> {
        let session = req
            .extensions()
            .get::<JwtSession>()
            .cloned()
            .expect("request includes JwtSession extension");

        session.insert("foo", 42).expect("session insert succeeds");

        Ok(Response::new(Body::empty()))
    }

    async fn noop_handler(_: Request<Body>) -> Result<Response<Body>, Infallible> {
        Ok(Response::new(Body::empty()))
    }

    fn get_session_cookie(res: &Response<Body>) -> Cookie<'static> {
        let set_cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .expect("response includes set-cookie header");
        let set_cookie = set_cookie
            .to_str()
            .expect("set-cookie header is valid utf-8");
        Cookie::parse_encoded(set_cookie)
            .expect("set-cookie parses successfully")
            .into_owned()
    }

    fn cookie_header_value(cookie: &Cookie<'_>) -> String {
        cookie.encoded().to_string()
    }

    #[tokio::test]
    async fn basic_service_test() {
        let svc = ServiceBuilder::new()
            .layer(make_layer())
            .service_fn(handler);

        let req = Request::builder()
            .body(Body::empty())
            .expect("request builds successfully");
        let res = svc
            .clone()
            .oneshot(req)
            .await
            .expect("service call succeeds");
        let session_cookie = get_session_cookie(&res);

        let decoded = JwtSession::decode(session_cookie.value(), SECRET, Algorithm::HS256)
            .expect("issued cookie decodes successfully");
        assert_eq!(decoded.get_value("foo"), Some(serde_json::json!(42)));

        // The session is non-empty and the second request only writes the
        // same value, but a write is a write: the cookie is re-issued.
        let req = Request::builder()
            .header(header::COOKIE, cookie_header_value(&session_cookie))
            .body(Body::empty())
            .expect("request builds successfully");
        let res = svc.oneshot(req).await.expect("service call succeeds");

        assert!(res.headers().get(header::SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn no_set_cookie_for_unmodified_nonempty_session_test() {
        let svc = ServiceBuilder::new()
            .layer(make_layer())
            .service_fn(handler);

        let req = Request::builder()
            .body(Body::empty())
            .expect("request builds successfully");
        let res = svc
            .clone()
            .oneshot(req)
            .await
            .expect("service call succeeds");
        let session_cookie = get_session_cookie(&res);

        let svc = ServiceBuilder::new()
            .layer(make_layer())
            .service_fn(noop_handler);
        let req = Request::builder()
            .header(header::COOKIE, cookie_header_value(&session_cookie))
            .body(Body::empty())
            .expect("request builds successfully");
        let res = svc.oneshot(req).await.expect("service call succeeds");

        assert!(res.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn empty_session_always_sets_cookie_test() {
        // No inbound cookie and no writes, yet the fresh empty session is
        // still advertised on the first response.
        let svc = ServiceBuilder::new()
            .layer(make_layer())
            .service_fn(noop_handler);

        let req = Request::builder()
            .body(Body::empty())
            .expect("request builds successfully");
        let res = svc.oneshot(req).await.expect("service call succeeds");

        assert!(res.headers().get(header::SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn bogus_cookie_test() {
        let svc = ServiceBuilder::new()
            .layer(make_layer())
            .service_fn(handler);

        let req = Request::builder()
            .header(header::COOKIE, "jwtsession=bogus")
            .body(Body::empty())
            .expect("request builds successfully");
        let res = svc.oneshot(req).await.expect("service call succeeds");

        let session_cookie = get_session_cookie(&res);
        assert_ne!(session_cookie.value(), "bogus");
        JwtSession::decode(session_cookie.value(), SECRET, Algorithm::HS256)
            .expect("replacement cookie decodes successfully");
    }

    #[tokio::test]
    async fn sessions_registry_test() {
        let config = JwtSessionConfig::new(SECRET).with_context_key("auth");
        let svc = ServiceBuilder::new()
            .layer(JwtSessionManagerLayer::new(config))
            .service_fn(|req: Request<Body>| async move {
                let sessions = req
                    .extensions()
                    .get::<Sessions>()
                    .expect("request includes Sessions extension");
                let session = sessions
                    .get("auth")
                    .expect("registry holds the session under its context key");
                session.insert("foo", 42).expect("session insert succeeds");
                assert!(sessions.get("jwtsession").is_none());
                Ok::<_, Infallible>(Response::new(Body::empty()))
            });

        let req = Request::builder()
            .body(Body::empty())
            .expect("request builds successfully");
        let res = svc.oneshot(req).await.expect("service call succeeds");

        let session_cookie = get_session_cookie(&res);
        let decoded = JwtSession::decode(session_cookie.value(), SECRET, Algorithm::HS256)
            .expect("issued cookie decodes successfully");
        assert_eq!(decoded.get_value("foo"), Some(serde_json::json!(42)));
    }
}
