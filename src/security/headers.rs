//! Forwarding headers.
//!
//! # Responsibilities
//! - Determine the caller's address (first `X-Forwarded-For` entry, else peer)
//! - Strip hop-by-hop headers before a request is forwarded

use axum::http::{header, HeaderMap, HeaderName};
use std::net::SocketAddr;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// The caller's IP: first `X-Forwarded-For` address, falling back to the peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match forwarded {
        Some(ip) => Some(ip.to_string()),
        None => peer.map(|addr| addr.ip().to_string()),
    }
}

/// Copy headers for forwarding, dropping hop-by-hop and framing headers.
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in HOP_BY_HOP.iter() {
        forwarded.remove(name);
    }
    forwarded.remove("keep-alive");
    forwarded.remove(header::HOST);
    forwarded.remove(header::CONTENT_LENGTH);
    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let peer: SocketAddr = "10.0.0.1:5555".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let peer: SocketAddr = "192.168.1.20:40000".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)).as_deref(), Some("192.168.1.20"));
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn test_forwardable_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::HOST, HeaderValue::from_static("gateway"));
        headers.insert(header::COOKIE, HeaderValue::from_static("session=a"));
        let forwarded = forwardable_headers(&headers);
        assert!(forwarded.get(header::CONNECTION).is_none());
        assert!(forwarded.get(header::HOST).is_none());
        assert_eq!(forwarded[header::COOKIE], "session=a");
    }
}
