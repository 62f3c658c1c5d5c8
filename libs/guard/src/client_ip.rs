//! Client IP resolution behind trusted reverse proxies

use std::collections::HashSet;
use std::net::IpAddr;

/// Connection metadata of a login request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    /// Address of the direct TCP peer
    pub remote_addr: String,
    /// Raw `X-Forwarded-For` header value, if any
    pub forwarded_for: Option<String>,
}

impl RequestMeta {
    /// Metadata for a direct connection
    pub fn new(remote_addr: impl Into<String>) -> Self {
        Self {
            remote_addr: remote_addr.into(),
            forwarded_for: None,
        }
    }

    /// Attach a forwarded-for header value
    pub fn with_forwarded_for(mut self, forwarded_for: impl Into<String>) -> Self {
        self.forwarded_for = Some(forwarded_for.into());
        self
    }
}

/// Canonical text form of an address
///
/// IPv4-mapped IPv6 addresses (`::ffff:10.1.1.100`) collapse to their IPv4
/// form so dual-stack listeners and IPv4 proxy lists agree. Anything that
/// does not parse as an IP is kept as trimmed text.
pub fn normalize_ip(ip: &str) -> String {
    let ip = ip.trim();
    ip.parse::<IpAddr>()
        .map(|addr| addr.to_canonical().to_string())
        .unwrap_or_else(|_| ip.to_string())
}

/// Resolve the address a request is attributed to
///
/// The forwarded-for value is only honoured when the direct peer is a trusted
/// proxy. In a chain like `client, proxy1, proxy2` the right-most entry that
/// is not itself a trusted proxy wins. A trusted proxy that forwards nothing
/// usable is held responsible for the attempt itself.
///
/// `trusted_proxies` must hold [`normalize_ip`] forms.
pub fn resolve_client_ip(meta: &RequestMeta, trusted_proxies: &HashSet<String>) -> String {
    let remote = normalize_ip(&meta.remote_addr);

    if !trusted_proxies.contains(&remote) {
        return remote;
    }

    meta.forwarded_for
        .as_deref()
        .and_then(|header| {
            header
                .split(',')
                .filter(|ip| !ip.trim().is_empty())
                .map(normalize_ip)
                .filter(|ip| !trusted_proxies.contains(ip))
                .next_back()
        })
        .unwrap_or(remote)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROXY: &str = "10.1.1.100";

    fn trusted() -> HashSet<String> {
        [PROXY.to_string(), "10.1.1.101".to_string()]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_direct_connection() {
        let meta = RequestMeta::new("127.0.0.1");
        assert_eq!(resolve_client_ip(&meta, &trusted()), "127.0.0.1");
    }

    #[test]
    fn test_untrusted_peer_cannot_forward() {
        let meta = RequestMeta::new("192.168.1.5").with_forwarded_for("127.0.0.1");
        assert_eq!(resolve_client_ip(&meta, &trusted()), "192.168.1.5");
    }

    #[test]
    fn test_trusted_proxy_forwards_client() {
        let meta = RequestMeta::new(PROXY).with_forwarded_for("127.0.0.1");
        assert_eq!(resolve_client_ip(&meta, &trusted()), "127.0.0.1");
    }

    #[test]
    fn test_trusted_proxy_without_header() {
        let meta = RequestMeta::new(PROXY);
        assert_eq!(resolve_client_ip(&meta, &trusted()), PROXY);

        let meta = RequestMeta::new(PROXY).with_forwarded_for("  ");
        assert_eq!(resolve_client_ip(&meta, &trusted()), PROXY);
    }

    #[test]
    fn test_forwarded_chain_skips_trusted_hops() {
        let meta =
            RequestMeta::new(PROXY).with_forwarded_for("203.0.113.9, 198.51.100.7 ,10.1.1.101");
        assert_eq!(resolve_client_ip(&meta, &trusted()), "198.51.100.7");
    }

    #[test]
    fn test_ipv4_mapped_proxy_is_trusted() {
        let meta = RequestMeta::new("::ffff:10.1.1.100").with_forwarded_for("127.0.0.1");
        assert_eq!(resolve_client_ip(&meta, &trusted()), "127.0.0.1");

        let meta = RequestMeta::new("::ffff:10.1.1.100");
        assert_eq!(resolve_client_ip(&meta, &trusted()), PROXY);
    }

    #[test]
    fn test_forwarded_entries_are_normalized() {
        let meta =
            RequestMeta::new(PROXY).with_forwarded_for("::ffff:203.0.113.9, ::ffff:10.1.1.101");
        assert_eq!(resolve_client_ip(&meta, &trusted()), "203.0.113.9");
    }

    #[test]
    fn test_normalize_ip() {
        assert_eq!(normalize_ip(" ::ffff:127.0.0.1 "), "127.0.0.1");
        assert_eq!(normalize_ip("2001:DB8::1"), "2001:db8::1");
        assert_eq!(normalize_ip("unknown"), "unknown");
    }

    #[test]
    fn test_forwarded_chain_of_only_proxies() {
        let meta = RequestMeta::new(PROXY).with_forwarded_for("10.1.1.101, 10.1.1.100");
        assert_eq!(resolve_client_ip(&meta, &trusted()), PROXY);
    }
}
