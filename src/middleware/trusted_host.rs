//! Rejects requests whose `Host` header is not in the allowed list.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Allowed-host entries: exact names, `*.domain` wildcards, or `*`.
#[derive(Debug, Clone)]
pub struct AllowedHosts(Vec<String>);

impl AllowedHosts {
    pub fn new(hosts: &[String]) -> Self {
        Self(hosts.iter().map(|h| h.trim().to_ascii_lowercase()).collect())
    }

    pub fn is_allowed(&self, host: &str) -> bool {
        let host = strip_port(host).to_ascii_lowercase();
        self.0.iter().any(|pattern| {
            if pattern == "*" {
                true
            } else if let Some(domain) = pattern.strip_prefix("*.") {
                host.ends_with(&format!(".{}", domain))
            } else {
                *pattern == host
            }
        })
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // [::1]:8000
        return host.split(']').next().map(|h| &h[1..]).unwrap_or(host);
    }
    host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host)
}

pub async fn trusted_host(
    State(allowed): State<Arc<AllowedHosts>>,
    request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().host().map(str::to_string));

    match host {
        Some(host) if allowed.is_allowed(&host) => next.run(request).await,
        other => {
            tracing::debug!("Rejected request with host {:?}", other);
            (StatusCode::BAD_REQUEST, "Invalid host header").into_response()
        }
    }
}
