//! Hostname resolution for declared upstreams.

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};

/// Resolves an upstream host to an IPv4 address.
pub trait HostResolver: Send + Sync {
    fn resolve_ipv4(&self, host: &str) -> impl Future<Output = io::Result<Ipv4Addr>> + Send;
}

/// Resolver backed by the system's name service.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    async fn resolve_ipv4(&self, host: &str) -> io::Result<Ipv4Addr> {
        if let Ok(ip) = host.parse::<Ipv4Addr>() {
            return Ok(ip);
        }

        tokio::net::lookup_host((host, 0))
            .await?
            .find_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(*v4.ip()),
                SocketAddr::V6(_) => None,
            })
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no IPv4 address"))
    }
}
