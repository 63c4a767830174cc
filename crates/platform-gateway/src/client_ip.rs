//! Caller IP resolution for rate limiting: `X-Forwarded-For` first, then
//! `X-Real-IP`, then the transport remote address. A pure function the
//! rate limiter calls directly rather than a request-extensions side
//! channel.

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

pub fn resolve(headers: &HeaderMap, remote: SocketAddr) -> IpAddr {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Some(ip) = forwarded
            .to_str()
            .ok()
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return ip;
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Some(ip) = real_ip.to_str().ok().and_then(|s| s.trim().parse::<IpAddr>().ok()) {
            return ip;
        }
    }
    remote.ip()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> SocketAddr {
        "10.0.0.9:443".parse().unwrap()
    }

    #[test]
    fn prefers_x_forwarded_for_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.5, 10.0.0.1".parse().unwrap());
        assert_eq!(resolve(&headers, remote()), "203.0.113.5".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn falls_back_to_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.9".parse().unwrap());
        assert_eq!(resolve(&headers, remote()), "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn falls_back_to_remote_addr() {
        let headers = HeaderMap::new();
        assert_eq!(resolve(&headers, remote()), remote().ip());
    }

    #[test]
    fn malformed_forwarded_for_falls_through_to_remote() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "not-an-ip".parse().unwrap());
        assert_eq!(resolve(&headers, remote()), remote().ip());
    }
}
