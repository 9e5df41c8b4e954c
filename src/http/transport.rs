//! Byte-level forwarding of accepted requests.
//!
//! # Responsibilities
//! - Resolve the target service identifier to a base URL
//! - Rewrite the URI (stripped path + original query)
//! - Drop hop-by-hop headers and client-supplied identity headers
//! - Inject the gateway-asserted identity headers
//! - Bound the upstream hop by a timeout

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Request, Response, Uri, Version};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use thiserror::Error;
use url::Url;

use crate::gateway::{ForwardDecision, IDENTITY_HEADERS};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no base url configured for service {0}")]
    UnknownService(String),
    #[error("invalid upstream uri {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("upstream request failed: {0}")]
    Request(String),
    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),
}

/// Performs the network hop for an accepted request.
#[async_trait]
pub trait ForwardingTransport: Send + Sync {
    async fn forward(
        &self,
        decision: ForwardDecision,
        request: Request<Body>,
    ) -> Result<Response<Body>, TransportError>;
}

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Forwarding over the hyper-util legacy client.
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    services: BTreeMap<String, Url>,
    timeout: Duration,
}

impl HyperTransport {
    pub fn new(client: Client<HttpConnector, Body>, services: BTreeMap<String, Url>, timeout: Duration) -> Self {
        Self {
            client,
            services,
            timeout,
        }
    }

    fn upstream_uri(&self, decision: &ForwardDecision, original: &Uri) -> Result<Uri, TransportError> {
        let base = self
            .services
            .get(&decision.target)
            .ok_or_else(|| TransportError::UnknownService(decision.target.clone()))?;

        let mut uri = format!("{}{}", base.as_str().trim_end_matches('/'), decision.path);
        if let Some(query) = original.query() {
            uri.push('?');
            uri.push_str(query);
        }

        uri.parse().map_err(|e: axum::http::uri::InvalidUri| TransportError::InvalidUri {
            uri: uri.clone(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ForwardingTransport for HyperTransport {
    async fn forward(
        &self,
        decision: ForwardDecision,
        request: Request<Body>,
    ) -> Result<Response<Body>, TransportError> {
        let (mut parts, body) = request.into_parts();

        parts.uri = self.upstream_uri(&decision, &parts.uri)?;
        parts.version = Version::HTTP_11;

        // The client sets Host from the upstream URI.
        parts.headers.remove(header::HOST);
        strip_hop_by_hop(&mut parts.headers);
        for name in &IDENTITY_HEADERS {
            parts.headers.remove(name);
        }
        parts.headers.extend(decision.headers);

        let subject_id = decision.principal.as_ref().map(|p| p.subject_id);
        let tenant_id = decision.principal.as_ref().and_then(|p| p.tenant_id);
        tracing::debug!(
            service = %decision.target,
            uri = %parts.uri,
            subject_id,
            tenant_id,
            "Forwarding request"
        );

        let upstream = Request::from_parts(parts, body);
        let response = tokio::time::timeout(self.timeout, self.client.request(upstream))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;
    use crate::gateway::headers::{X_MODULE, X_USER_ID};
    use axum::http::HeaderValue;
    use hyper_util::rt::TokioExecutor;
    use wiremock::matchers::{header as has_header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request as MockRequest, ResponseTemplate};

    fn transport(target: &str, base: &str, timeout: Duration) -> HyperTransport {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let services = BTreeMap::from([(target.to_string(), base.parse().unwrap())]);
        HyperTransport::new(client, services, timeout)
    }

    fn decision(target: &str, path: &str) -> ForwardDecision {
        let mut headers = HeaderMap::new();
        headers.insert(X_USER_ID, HeaderValue::from_static("7"));
        ForwardDecision {
            target: target.into(),
            path: path.into(),
            headers,
            principal: None,
        }
    }

    #[tokio::test]
    async fn test_forwards_rewritten_path_and_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/facturas"))
            .and(query_param("page", "2"))
            .and(has_header("x-user-id", "7"))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::post("http://gateway/api/ventas/facturas?page=2")
            .header("x-user-id", "666")
            .header(X_MODULE, "FORGED")
            .body(Body::from("{}"))
            .unwrap();

        let response = transport("sales", &server.uri(), Duration::from_secs(5))
            .forward(decision("sales", "/facturas"), request)
            .await
            .unwrap();
        assert_eq!(response.status(), 201);

        let received: Vec<MockRequest> = server.received_requests().await.unwrap();
        assert!(received[0].headers.get("x-module").is_none());
        assert_eq!(received[0].headers.get_all("x-user-id").iter().count(), 1);
    }

    #[tokio::test]
    async fn test_forwards_decision_with_principal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/5"))
            .and(has_header("x-user-id", "7"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut decision = decision("employees", "/5");
        decision.principal = Some(Principal {
            subject_id: 7,
            display_name: "ana".into(),
            tenant_id: Some(42),
            profile_id: None,
        });

        let request = Request::get("http://gateway/api/empleados/5").body(Body::empty()).unwrap();
        let response = transport("employees", &server.uri(), Duration::from_secs(5))
            .forward(decision, request)
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_unknown_service() {
        let request = Request::get("/").body(Body::empty()).unwrap();
        let err = transport("sales", "http://127.0.0.1:1", Duration::from_secs(1))
            .forward(decision("clients", "/"), request)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownService(s) if s == "clients"));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead = listener.local_addr().unwrap();
        drop(listener);

        let request = Request::get("/").body(Body::empty()).unwrap();
        let err = transport("sales", &format!("http://{dead}"), Duration::from_secs(1))
            .forward(decision("sales", "/"), request)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let request = Request::get("/").body(Body::empty()).unwrap();
        let err = transport("sales", &server.uri(), Duration::from_millis(200))
            .forward(decision("sales", "/"), request)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
    }
}
