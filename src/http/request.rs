//! Request identification.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) as early as possible
//! - Resolve the real client address behind load balancers
//!
//! # Design Decisions
//! - `X-Forwarded-For` is only honoured when `trust_proxy` is set
//! - The left-most forwarded entry is the original client; it is client
//!   controlled unless the proxy in front overwrites the header
//! - Unparseable forwarded values fall back to the socket peer

use std::net::{IpAddr, SocketAddr};

use axum::http::{HeaderMap, HeaderName, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Header carrying the proxy chain.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

pub fn x_request_id() -> HeaderName {
    HeaderName::from_static(X_REQUEST_ID)
}

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Resolve the client address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> Option<IpAddr> {
    if trust_proxy {
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| parse_forwarded_ip(first.trim()));
        if forwarded.is_some() {
            return forwarded;
        }
    }
    peer.map(|addr| addr.ip())
}

fn parse_forwarded_ip(value: &str) -> Option<IpAddr> {
    value
        .parse::<IpAddr>()
        .ok()
        .or_else(|| value.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(forwarded: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_str(forwarded).unwrap());
        headers
    }

    #[test]
    fn test_forwarded_left_most_wins() {
        let peer = Some("10.0.0.1:4000".parse().unwrap());
        let ip = client_ip(&headers("198.51.100.4, 10.0.0.2"), peer, true);
        assert_eq!(ip, Some("198.51.100.4".parse().unwrap()));
    }

    #[test]
    fn test_forwarded_entry_is_taken_as_sent() {
        let peer = Some("10.0.0.1:4000".parse().unwrap());
        let first = client_ip(&headers("192.0.2.1, 10.0.0.2"), peer, true);
        let second = client_ip(&headers("192.0.2.2, 10.0.0.2"), peer, true);
        assert_ne!(first, second);

        let direct = client_ip(&headers("192.0.2.1"), peer, false);
        assert_eq!(direct, Some("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_forwarded_with_port() {
        let ip = client_ip(&headers("198.51.100.4:8443"), None, true);
        assert_eq!(ip, Some("198.51.100.4".parse().unwrap()));
    }

    #[test]
    fn test_garbage_forwarded_falls_back_to_peer() {
        let peer = Some("10.0.0.1:4000".parse().unwrap());
        let ip = client_ip(&headers("unknown"), peer, true);
        assert_eq!(ip, Some("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_untrusted_ignores_header() {
        let ip = client_ip(&headers("198.51.100.4"), None, false);
        assert_eq!(ip, None);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let request = Request::new(());
        let mut maker = MakeRequestUuid;
        let a = maker.make_request_id(&request).unwrap();
        let b = maker.make_request_id(&request).unwrap();
        assert_ne!(a.header_value(), b.header_value());
    }
}
