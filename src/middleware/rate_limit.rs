//! Per-client rate limiting for the ingest endpoint, backed by `tower_governor`.
//!
//! Client IP comes from the connection (`ConnectInfo`), then `X-Forwarded-For`
//! / `X-Real-IP` when running behind a proxy, and falls back to 127.0.0.1 for
//! in-process requests. Rejections use the ingest error body so clients can
//! render them like any other failed ingest.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, HeaderValue, Request, Response, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, Router};
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::KeyExtractor;
use tower_governor::{GovernorError, GovernorLayer};

use crate::models::{IngestErrorResponse, IngestForm};

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .and_then(|v| v.trim().parse().ok())
}

/// Keys requests by client IP.
#[derive(Clone, Copy, Debug)]
pub struct ClientIpExtractor;

impl KeyExtractor for ClientIpExtractor {
    type Key = IpAddr;

    fn extract<B>(&self, req: &Request<B>) -> Result<Self::Key, GovernorError> {
        if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
            if !addr.ip().is_loopback() {
                return Ok(addr.ip());
            }
        }
        Ok(forwarded_ip(req.headers()).unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)))
    }
}

fn rejection(error: GovernorError) -> Response<Body> {
    match error {
        GovernorError::TooManyRequests { wait_time, .. } => {
            let retry_after = wait_time.max(1);
            tracing::warn!("Rate limit exceeded, retry in {}s", retry_after);
            let message = format!("Rate limit exceeded. Try again in {} seconds.", retry_after);
            let body = IngestErrorResponse::from_form(message, &IngestForm::default());
            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
        other => {
            tracing::error!("Rate limiter failed: {:?}", other);
            let body = IngestErrorResponse::from_form(
                "Internal server error: rate limiter failure".to_string(),
                &IngestForm::default(),
            );
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// Allow `per_minute` requests per client with the full budget as burst.
/// Zero leaves `router` unlimited.
pub fn limit_per_minute(router: Router, per_minute: u32) -> Router {
    if per_minute == 0 {
        return router;
    }

    let replenish_ms = (60_000 / u64::from(per_minute)).max(1);
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpExtractor)
        .per_millisecond(replenish_ms)
        .burst_size(per_minute)
        .finish();

    match config {
        Some(config) => router.layer(GovernorLayer::new(Arc::new(config)).error_handler(rejection)),
        None => {
            tracing::error!("Invalid rate limit of {} per minute, not limiting", per_minute);
            router
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_ip_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(forwarded_ip(&headers), Some("203.0.113.7".parse().unwrap()));

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(forwarded_ip(&headers), Some("198.51.100.2".parse().unwrap()));
    }

    #[test]
    fn test_client_ip_prefers_remote_peer() {
        let peer: SocketAddr = "192.0.2.10:5000".parse().unwrap();
        let mut request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7")
            .body(())
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(
            ClientIpExtractor.extract(&request).unwrap(),
            "192.0.2.10".parse::<IpAddr>().unwrap()
        );

        let local: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        let mut request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7")
            .body(())
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(local));
        assert_eq!(
            ClientIpExtractor.extract(&request).unwrap(),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );

        let request = Request::builder().body(()).unwrap();
        assert_eq!(
            ClientIpExtractor.extract(&request).unwrap(),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
    }

    #[test]
    fn test_rejection_uses_ingest_error_shape() {
        let response = rejection(GovernorError::TooManyRequests {
            wait_time: 7,
            headers: None,
        });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "7");
    }
}
