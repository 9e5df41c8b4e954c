//! Shared utilities for gateway integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;

use business_gateway::config::GatewayConfig;
use business_gateway::http::HttpServer;
use business_gateway::lifecycle::Shutdown;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use wiremock::MockServer;

pub const SECRET: &str = "integration-secret";

/// A running gateway wired to mock collaborators.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub auth: MockServer,
    pub licensing: MockServer,
    pub backend: MockServer,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a gateway whose services all point at mock servers. Employees,
/// clients and sales share one backend mock. Rate limiting is off unless
/// `configure` turns it on.
pub async fn start_gateway<F>(configure: F) -> TestGateway
where
    F: FnOnce(&mut GatewayConfig),
{
    let auth = MockServer::start().await;
    let licensing = MockServer::start().await;
    let backend = MockServer::start().await;

    let mut config = GatewayConfig::default();
    config.auth.secret_key = SECRET.to_string();
    config.rate_limit.enabled = false;
    config.services.insert("auth".into(), auth.uri());
    config.services.insert("licensing".into(), licensing.uri());
    for service in ["employees", "clients", "sales"] {
        config.services.insert(service.into(), backend.uri());
    }
    configure(&mut config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestGateway {
        addr,
        shutdown,
        auth,
        licensing,
        backend,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// An address nothing listens on.
pub fn dead_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn sign(claims: Value) -> String {
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

/// Subject 7 ("ana") of tenant 42, valid for an hour.
pub fn valid_token() -> String {
    sign(json!({ "sub": 7, "usuario": "ana", "cliente_id": 42, "perfil_id": 3, "exp": now() + 3600 }))
}

pub fn expired_token() -> String {
    sign(json!({ "sub": 7, "usuario": "ana", "cliente_id": 42, "exp": now() - 3600 }))
}

pub fn license_body(module: &str) -> Value {
    json!({
        "valida": true,
        "licencia": {
            "moduloCodigo": module,
            "moduloNombre": module.to_lowercase(),
            "fechaVencimiento": "2030-12-31",
            "maxUsuarios": 10
        }
    })
}
