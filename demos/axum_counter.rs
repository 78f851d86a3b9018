use std::net::SocketAddr;

use axum::{Extension, Router, routing::get};
use time::Duration;
use tower_jwt_session::{JwtSession, JwtSessionConfig, JwtSessionManagerLayer, SameSite};

async fn index(Extension(session): Extension<JwtSession>) -> String {
    let n: usize = session
        .get("n")
        .expect("session get succeeds")
        .unwrap_or(0);
    session
        .insert("n", n + 1)
        .expect("session insert succeeds");
    format!("n={n}")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // Don't do this in a real deployment: read the secret from the
    // environment or a secret store instead.
    let session_config = JwtSessionConfig::new("a long random secret only the server knows")
        // Default: "jwtsession"
        .with_cookie_name("jwtsession")
        // Default: "jwtsession"
        .with_context_key("jwtsession")
        // Default: 86400 seconds
        .with_max_age(Duration::days(1))
        // Default: unset
        .with_http_only(true)
        // Default: unset
        .with_same_site(SameSite::Strict)
        // Default: unset (keep it off for local HTTP development only)
        .with_secure(false)
        // Default: "/"
        .with_path("/")
        // Default: None
        .without_domain()
        // Default: 4096
        .with_max_cookie_bytes(4096);
    let session_layer = JwtSessionManagerLayer::new(session_config);

    let app = Router::new().route("/", get(index)).layer(session_layer);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("tcp listener binds successfully");
    let local_addr = listener.local_addr().expect("local address is available");
    println!("listening at http://{local_addr}");

    axum::serve(listener, app)
        .await
        .expect("server runs successfully");
}
