//! Anonymized client identity.
//!
//! A fingerprint is the first 16 bytes of `SHA-256(ip || 0x00 || user-agent)`,
//! hex-encoded. The port is left out so a client keeps its identity across
//! reconnects; the raw address never reaches the stores or the logs.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::{header, Request};
use sha2::{Digest, Sha256};

/// Opaque, fixed-length client identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientFingerprint(String);

impl ClientFingerprint {
    /// Length of the hex representation.
    pub const LEN: usize = 32;

    /// Derive a fingerprint from connection metadata.
    pub fn derive(addr: IpAddr, user_agent: Option<&str>) -> Self {
        let mut hasher = Sha256::new();
        match addr {
            IpAddr::V4(v4) => hasher.update(v4.octets()),
            IpAddr::V6(v6) => hasher.update(v6.octets()),
        }
        hasher.update([0u8]);
        hasher.update(user_agent.unwrap_or_default().as_bytes());
        let digest = hasher.finalize();
        Self(hex::encode(&digest[..Self::LEN / 2]))
    }

    /// Derive a fingerprint for an inbound request.
    ///
    /// Requests without `ConnectInfo` (e.g. driven through `oneshot` in tests)
    /// are attributed to the unspecified address.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let user_agent = request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok());

        Self::derive(addr, user_agent)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
