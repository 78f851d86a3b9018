use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use http::{Request, Response};
use tower_cookies::CookieManager;
use tower_layer::Layer;
use tower_service::Service;

use crate::config::JwtSessionConfig;
use crate::session::{JwtSession, Sessions};

/// Layer wiring [`JwtSessionManager`] (and the [`CookieManager`] it relies
/// on) around an inner service.
#[derive(Debug, Clone)]
pub struct JwtSessionManagerLayer {
    config: JwtSessionConfig,
}

impl JwtSessionManagerLayer {
    #[must_use]
    pub fn new(config: JwtSessionConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for JwtSessionManagerLayer {
    type Service = CookieManager<JwtSessionManager<S>>;

    fn layer(&self, inner: S) -> Self::Service {
        CookieManager::new(JwtSessionManager {
            inner,
            config: self.config.clone(),
        })
    }
}

/// Middleware that materializes a [`JwtSession`] from the request's session
/// cookie and writes it back out when needed.
///
/// Inbound, the named cookie is verified and decoded; a missing, malformed,
/// tampered, or expired token falls back to a fresh empty session, never an
/// error. The session is exposed to the inner service both as a typed
/// request extension and in the [`Sessions`] registry under the configured
/// context key.
///
/// Outbound, a `Set-Cookie` goes out when the session was modified or when
/// its data mapping is empty. The empty-mapping clause re-issues a cookie on
/// every response for a session nothing was ever written to; that keeps a
/// session identity observable from the very first response onward.
#[derive(Debug, Clone)]
pub struct JwtSessionManager<S> {
    inner: S,
    config: JwtSessionConfig,
}

impl<ReqBody, ResBody, S> Service<Request<ReqBody>> for JwtSessionManager<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let config = self.config.clone();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let cookies = match req.extensions().get::<tower_cookies::Cookies>().cloned() {
                Some(cookies) => cookies,
                None => {
                    // The layer always nests this service inside a
                    // CookieManager, so the jar must be present.
                    let mut res = Response::default();
                    *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                    return Ok(res);
                }
            };

            let session = match cookies.get(&config.cookie_name) {
                Some(cookie) => match JwtSession::decode(
                    cookie.value(),
                    config.secret_key.clone(),
                    config.algorithm,
                ) {
                    Ok(session) => session,
                    Err(err) => {
                        // Attacker-controlled input; reset rather than fail.
                        tracing::warn!(err = %err, "session cookie decode failed");
                        JwtSession::empty(config.secret_key.clone(), config.algorithm)
                    }
                },
                None => JwtSession::empty(config.secret_key.clone(), config.algorithm),
            };

            req.extensions_mut().insert(session.clone());
            let mut sessions = req.extensions_mut().remove::<Sessions>().unwrap_or_default();
            sessions.insert(config.context_key.clone(), session.clone());
            req.extensions_mut().insert(sessions);

            let res = inner.call(req).await?;

            // The handler mutated the session through the shared handle, so
            // this sees its final state.
            if session.should_save() || session.is_empty() {
                if let Err(err) = session.write_cookie(&cookies, &config, None, None) {
                    tracing::error!(err = %err, "session cookie save failed");
                    let mut res = Response::default();
                    *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                    return Ok(res);
                }
            }

            Ok(res)
        })
    }
}
