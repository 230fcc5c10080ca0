//! Server host classification.
//!
//! Decides whether the streaming server sits on the local network. Local
//! hosts connect directly (no STUN helper, tighter health polling); remote
//! hosts go through the configured STUN servers.

use std::net::IpAddr;

use tracing::debug;
use url::{Host, Url};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostClass {
    Local,
    Remote,
}

impl HostClass {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

/// Classify a bare host name or IP literal.
///
/// `localhost`, loopback (`127.0.0.0/8`, `::1`) and the RFC1918 private
/// ranges (`10/8`, `172.16/12`, `192.168/16`) are local.
pub fn classify_host(host: &str) -> HostClass {
    let trimmed = host.trim().trim_start_matches('[').trim_end_matches(']');
    if trimmed.eq_ignore_ascii_case("localhost") {
        return HostClass::Local;
    }
    match trimmed.parse::<IpAddr>() {
        Ok(ip) => classify_ip(ip),
        Err(_) => HostClass::Remote,
    }
}

pub fn classify_ip(ip: IpAddr) -> HostClass {
    let local = match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private(),
        IpAddr::V6(v6) => v6.is_loopback(),
    };
    if local {
        HostClass::Local
    } else {
        HostClass::Remote
    }
}

/// Classify the host component of the server URL.
pub fn classify_url(url: &Url) -> HostClass {
    let class = match url.host() {
        Some(Host::Domain(d)) => classify_host(d),
        Some(Host::Ipv4(v4)) => classify_ip(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => classify_ip(IpAddr::V6(v6)),
        None => HostClass::Remote,
    };
    debug!("Host {:?} classified as {:?}", url.host_str(), class);
    class
}
