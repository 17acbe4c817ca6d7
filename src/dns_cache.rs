use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use crate::target::{AddressFamily, Target, select_address};

#[derive(Debug, Clone)]
pub struct DnsCacheEntry {
    ip_address: IpAddr,
    cached_at: Instant,
    ttl: Duration,
}

impl DnsCacheEntry {
    pub fn new(ip_address: IpAddr, ttl: Duration) -> Self {
        Self {
            ip_address,
            cached_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() >= self.ttl
    }

    pub fn ip_address(&self) -> IpAddr {
        self.ip_address
    }
}

#[derive(Debug, Default)]
pub struct DnsCache {
    cache: HashMap<String, DnsCacheEntry>,
}

impl DnsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hostname: String, entry: DnsCacheEntry) {
        self.cache.insert(hostname, entry);
    }

    pub fn get_valid_ip(&self, hostname: &str) -> Option<IpAddr> {
        self.cache
            .get(hostname)
            .filter(|entry| !entry.is_expired())
            .map(DnsCacheEntry::ip_address)
    }

    pub fn clean_expired(&mut self, hostname: &str) {
        if self.cache.get(hostname).is_some_and(DnsCacheEntry::is_expired) {
            self.cache.remove(hostname);
        }
    }
}

/// Per-session resolver. Owned by the session task, so it needs no locking.
///
/// With a zero TTL every call goes to the system resolver.
#[derive(Debug)]
pub struct Resolver {
    cache: DnsCache,
    ttl: Duration,
    family: AddressFamily,
}

impl Resolver {
    pub fn new(ttl: Duration, family: AddressFamily) -> Self {
        Self {
            cache: DnsCache::new(),
            ttl,
            family,
        }
    }

    /// Returns the address to dial, or a message describing why none is usable.
    pub async fn resolve(&mut self, target: &Target) -> Result<SocketAddr, String> {
        if let Some(ip) = target.ip_literal() {
            return if self.family.accepts(ip) {
                Ok(SocketAddr::new(ip, target.port()))
            } else {
                Err(format!("{ip} does not match the requested address family"))
            };
        }

        let host = target.host();
        self.cache.clean_expired(host);
        if let Some(ip) = self.cache.get_valid_ip(host) {
            debug!("using cached address {ip} for {host}");
            return Ok(SocketAddr::new(ip, target.port()));
        }

        let addrs = tokio::net::lookup_host((host, target.port()))
            .await
            .map_err(|e| e.to_string())?;
        let addr = select_address(addrs, self.family)
            .ok_or_else(|| format!("no usable address for {host}"))?;
        debug!("resolved {host} to {}", addr.ip());

        if !self.ttl.is_zero() {
            self.cache
                .insert(host.to_string(), DnsCacheEntry::new(addr.ip(), self.ttl));
        }
        Ok(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let mut cache = DnsCache::new();
        let ip: IpAddr = "192.0.2.7".parse().unwrap();
        cache.insert("example.com".into(), DnsCacheEntry::new(ip, Duration::from_secs(30)));

        assert_eq!(cache.get_valid_ip("example.com"), Some(ip));
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.get_valid_ip("example.com"), None);

        cache.clean_expired("example.com");
        assert!(cache.cache.is_empty());
    }

    #[tokio::test]
    async fn literals_skip_lookup() {
        let mut resolver = Resolver::new(Duration::ZERO, AddressFamily::Any);
        let target = Target::new("127.0.0.1", 8080).unwrap();
        assert_eq!(
            resolver.resolve(&target).await,
            Ok("127.0.0.1:8080".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn literal_of_wrong_family_is_unusable() {
        let mut resolver = Resolver::new(Duration::ZERO, AddressFamily::V6);
        let target = Target::new("127.0.0.1", 80).unwrap();
        assert!(resolver.resolve(&target).await.is_err());
    }

    #[tokio::test]
    async fn cached_address_is_reused() {
        let mut resolver = Resolver::new(Duration::from_secs(60), AddressFamily::Any);
        let ip: IpAddr = "192.0.2.9".parse().unwrap();
        resolver.cache.insert(
            "cached.invalid".into(),
            DnsCacheEntry::new(ip, Duration::from_secs(60)),
        );
        let target = Target::new("cached.invalid", 443).unwrap();
        assert_eq!(resolver.resolve(&target).await, Ok(SocketAddr::new(ip, 443)));
    }

    #[tokio::test]
    async fn unresolvable_name_fails() {
        let mut resolver = Resolver::new(Duration::ZERO, AddressFamily::Any);
        let target = Target::new("no-such-host.invalid", 80).unwrap();
        assert!(resolver.resolve(&target).await.is_err());
    }
}
