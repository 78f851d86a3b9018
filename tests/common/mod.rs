#![allow(dead_code)]

// Shared helpers for integration tests.
//
// These helpers intentionally use `tower_cookies::Cookie` parsing/encoding to match what the
// middleware emits in `Set-Cookie` and what browsers send back in `Cookie`.
use std::convert::Infallible;

use axum::body::Body;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use http::{HeaderMap, Request, Response, header};
use http_body_util::BodyExt as _;
use serde_json::{Map, Value};
use tower_cookies::Cookie;
use tower_jwt_session::{JwtSession, JwtSessionConfig, JwtSessionManagerLayer};

pub const SECRET: &str = "an adequately long and random test secret";

pub fn make_layer(config: JwtSessionConfig) -> JwtSessionManagerLayer {
    JwtSessionManagerLayer::new(config)
}

pub fn default_layer() -> JwtSessionManagerLayer {
    make_layer(JwtSessionConfig::new(SECRET))
}

pub async fn body_string(body: Body) -> String {
    // Collect an Axum body into a UTF-8 string for assertions.
    let bytes = body
        .collect()
        .await
        .expect("body collects successfully")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub async fn handler(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    // Basic handler used by many tests: write a single key into the session.
    let session = req
        .extensions()
        .get::<JwtSession>()
        .cloned()
        .expect("request includes JwtSession extension");

    session.insert("foo", 42).expect("session insert succeeds");

    Ok(Response::new(Body::empty()))
}

pub async fn noop_handler(_: Request<Body>) -> Result<Response<Body>, Infallible> {
    // Handler that does not access the session at all.
    Ok(Response::new(Body::empty()))
}

pub fn get_session_cookie(res: &Response<Body>) -> Cookie<'static> {
    // Convenience: parse the session cookie from a response.
    get_session_cookie_from_headers(res.headers())
}

pub fn get_session_cookie_from_headers(headers: &HeaderMap) -> Cookie<'static> {
    // Parse the `Set-Cookie` header into a `Cookie` structure.
    let set_cookie = headers
        .get(header::SET_COOKIE)
        .expect("response includes set-cookie header");
    let set_cookie = set_cookie
        .to_str()
        .expect("set-cookie header is valid utf-8");
    Cookie::parse_encoded(set_cookie)
        .expect("set-cookie parses successfully")
        .into_owned()
}

pub fn cookie_header_value(cookie: &Cookie<'_>) -> String {
    // Encode a cookie for use in a `Cookie` request header.
    cookie.encoded().to_string()
}

pub fn decode_claims(token: &str) -> Map<String, Value> {
    // Read the claims straight out of the token's payload segment, without
    // going through signature verification. Tests use this to assert on what
    // a cookie actually carries.
    let payload = token
        .split('.')
        .nth(1)
        .expect("token has a payload segment");
    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .expect("payload segment is valid base64");
    serde_json::from_slice(&payload).expect("payload is a JSON claims mapping")
}
