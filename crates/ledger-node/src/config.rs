use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::constants::{DEFAULT_BOOTNODE_URL, DEFAULT_GOSSIP_PORT, DEFAULT_HTTP_PORT};

/// Full configuration for a running node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// HTTP API listen address.
    pub listen: SocketAddr,

    /// Port peers serve their HTTP API on; blocks are pushed there.
    pub peer_http_port: u16,

    /// `None` disables the gossip transport entirely.
    pub gossip: Option<GossipConfig>,

    /// IPs that identify this node, on top of the auto-detected one.
    pub advertise_ips: Vec<IpAddr>,

    /// Peers silent for longer than this are dropped. `None` keeps every
    /// peer forever.
    pub peer_ttl: Option<Duration>,

    pub push_timeout: Duration,
    pub push_attempts: u32,

    /// Upper bound on a single proof-of-work search.
    pub mine_timeout: Duration,

    /// How long a transaction request waits for its block to be committed
    /// before answering with the pending block instead.
    pub ack_timeout: Duration,

    pub bootnode_url: String,

    /// This node answers `GET /bootnode` and skips bootstrap itself.
    pub serve_bootnode: bool,

    /// Re-hash and re-link the bootnode snapshot before adopting it.
    pub verify_snapshot: bool,
}

#[derive(Debug, Clone)]
pub struct GossipConfig {
    pub bind: SocketAddr,
    /// Where beacons and announcements are sent.
    pub target: SocketAddr,
    pub interval: Duration,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_GOSSIP_PORT),
            target: SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), DEFAULT_GOSSIP_PORT),
            interval: Duration::from_secs(1),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_HTTP_PORT),
            peer_http_port: DEFAULT_HTTP_PORT,
            gossip: Some(GossipConfig::default()),
            advertise_ips: vec![],
            peer_ttl: None,
            push_timeout: Duration::from_millis(3_000),
            push_attempts: 3,
            mine_timeout: Duration::from_secs(60),
            ack_timeout: Duration::from_secs(10),
            bootnode_url: DEFAULT_BOOTNODE_URL.to_string(),
            serve_bootnode: false,
            verify_snapshot: false,
        }
    }
}

impl NodeConfig {
    /// A node with no gossip and no bootstrap, suited to tests and
    /// single-node runs.
    pub fn standalone() -> Self {
        Self {
            gossip: None,
            serve_bootnode: true,
            ..Self::default()
        }
    }
}
