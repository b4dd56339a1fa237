use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    /// Source address of the last beacon.
    pub address: SocketAddr,
    pub first_seen: u64,
    pub last_seen: u64,
}

/// Known peers keyed by IP. Peers are learned from discovery beacons and kept
/// until [`PeerRegistry::evict_stale`] drops them.
#[derive(Clone, Debug, Default)]
pub struct PeerRegistry {
    peers: BTreeMap<IpAddr, Peer>,
    own: HashSet<IpAddr>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an address as belonging to this node so its own beacons are
    /// ignored.
    pub fn add_own_ip(&mut self, ip: IpAddr) {
        self.peers.remove(&ip);
        self.own.insert(ip);
    }

    pub fn is_own(&self, ip: &IpAddr) -> bool {
        self.own.contains(ip)
    }

    /// Records a beacon from `addr` at `now` (ms). Returns `true` only when
    /// the peer was not known before.
    pub fn observe(&mut self, addr: SocketAddr, now: u64) -> bool {
        let ip = addr.ip();
        if self.own.contains(&ip) {
            return false;
        }
        match self.peers.get_mut(&ip) {
            Some(peer) => {
                peer.address = addr;
                peer.last_seen = peer.last_seen.max(now);
                false
            }
            None => {
                self.peers.insert(
                    ip,
                    Peer {
                        address: addr,
                        first_seen: now,
                        last_seen: now,
                    },
                );
                true
            }
        }
    }

    /// Drops peers not heard from within `ttl` of `now` and returns them.
    pub fn evict_stale(&mut self, now: u64, ttl: Duration) -> Vec<IpAddr> {
        let ttl = ttl.as_millis() as u64;
        let stale: Vec<IpAddr> = self
            .peers
            .iter()
            .filter(|(_, peer)| now.saturating_sub(peer.last_seen) > ttl)
            .map(|(ip, _)| *ip)
            .collect();
        for ip in &stale {
            self.peers.remove(ip);
        }
        stale
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.peers.contains_key(ip)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn addresses(&self) -> Vec<IpAddr> {
        self.peers.keys().copied().collect()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Peer> {
        self.peers
            .iter()
            .map(|(ip, peer)| (ip.to_string(), peer.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = PeerRegistry::new();
        assert!(registry.observe(addr("10.0.0.2:2346"), 1_000));
        assert!(!registry.observe(addr("10.0.0.2:2346"), 2_000));
        assert_eq!(registry.len(), 1);

        let peer = &registry.snapshot()["10.0.0.2"];
        assert_eq!(peer.first_seen, 1_000);
        assert_eq!(peer.last_seen, 2_000);
    }

    #[test]
    fn own_address_is_never_registered() {
        let mut registry = PeerRegistry::new();
        registry.add_own_ip("10.0.0.1".parse().unwrap());
        assert!(!registry.observe(addr("10.0.0.1:2346"), 1_000));
        assert!(registry.is_empty());
    }

    #[test]
    fn marking_own_ip_removes_existing_entry() {
        let mut registry = PeerRegistry::new();
        registry.observe(addr("10.0.0.1:2346"), 1_000);
        registry.add_own_ip("10.0.0.1".parse().unwrap());
        assert!(registry.is_empty());
    }

    #[test]
    fn eviction_drops_only_silent_peers() {
        let mut registry = PeerRegistry::new();
        registry.observe(addr("10.0.0.2:2346"), 1_000);
        registry.observe(addr("10.0.0.3:2346"), 9_000);
        let evicted = registry.evict_stale(10_000, Duration::from_secs(5));
        assert_eq!(evicted, vec!["10.0.0.2".parse::<IpAddr>().unwrap()]);
        assert_eq!(
            registry.addresses(),
            vec!["10.0.0.3".parse::<IpAddr>().unwrap()]
        );
    }

    #[test]
    fn peers_keyed_by_ip_not_port() {
        let mut registry = PeerRegistry::new();
        registry.observe(addr("10.0.0.2:2346"), 1);
        assert!(!registry.observe(addr("10.0.0.2:40000"), 2));
        assert_eq!(registry.snapshot()["10.0.0.2"].address.port(), 40000);
    }
}
