use clap::Parser;
use ledger_node::{
    constants::{DEFAULT_BOOTNODE_URL, DEFAULT_GOSSIP_PORT},
    GossipConfig, NodeConfig,
};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "ledger-node")]
#[command(about = "Single-chain proof-of-work ledger node")]
struct Args {
    /// Address to serve the HTTP API on
    #[arg(long, env = "LEDGER_LISTEN", default_value = "0.0.0.0:2345")]
    listen: SocketAddr,

    /// UDP port for discovery beacons
    #[arg(long, env = "LEDGER_GOSSIP_PORT", default_value_t = DEFAULT_GOSSIP_PORT)]
    gossip_port: u16,

    /// Where discovery beacons are sent
    #[arg(long, env = "LEDGER_BROADCAST_ADDR", default_value = "255.255.255.255")]
    broadcast_addr: IpAddr,

    #[arg(long, env = "LEDGER_GOSSIP_INTERVAL_MS", default_value_t = 1000)]
    gossip_interval_ms: u64,

    /// Disable UDP discovery altogether
    #[arg(long, env = "LEDGER_NO_GOSSIP")]
    no_gossip: bool,

    /// Extra IPs of this node, ignored when heard in beacons
    #[arg(long, env = "LEDGER_ADVERTISE_IP")]
    advertise_ip: Vec<IpAddr>,

    /// Forget peers silent for this long (default: never)
    #[arg(long, env = "LEDGER_PEER_TTL_SECS")]
    peer_ttl_secs: Option<u64>,

    #[arg(long, env = "LEDGER_PUSH_TIMEOUT_MS", default_value_t = 3000)]
    push_timeout_ms: u64,

    /// Attempts per peer when pushing a block
    #[arg(long, env = "LEDGER_PUSH_ATTEMPTS", default_value_t = 3)]
    push_attempts: u32,

    #[arg(long, env = "LEDGER_MINE_TIMEOUT_SECS", default_value_t = 60)]
    mine_timeout_secs: u64,

    /// How long POST /transactions waits for its block before replying 202
    #[arg(long, env = "LEDGER_ACK_TIMEOUT_SECS", default_value_t = 10)]
    ack_timeout_secs: u64,

    #[arg(long, env = "LEDGER_BOOTNODE_URL", default_value = DEFAULT_BOOTNODE_URL)]
    bootnode_url: String,

    /// Act as the bootnode: serve GET /bootnode and skip bootstrap
    #[arg(long, env = "LEDGER_SERVE_BOOTNODE")]
    serve_bootnode: bool,

    /// Check hashes and links of the bootnode snapshot before adopting it
    #[arg(long, env = "LEDGER_VERIFY_SNAPSHOT")]
    verify_snapshot: bool,
}

impl From<Args> for NodeConfig {
    fn from(args: Args) -> Self {
        let gossip = (!args.no_gossip).then(|| GossipConfig {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), args.gossip_port),
            target: SocketAddr::new(args.broadcast_addr, args.gossip_port),
            interval: Duration::from_millis(args.gossip_interval_ms),
        });
        NodeConfig {
            listen: args.listen,
            peer_http_port: args.listen.port(),
            gossip,
            advertise_ips: args.advertise_ip,
            peer_ttl: args.peer_ttl_secs.map(Duration::from_secs),
            push_timeout: Duration::from_millis(args.push_timeout_ms),
            push_attempts: args.push_attempts,
            mine_timeout: Duration::from_secs(args.mine_timeout_secs),
            ack_timeout: Duration::from_secs(args.ack_timeout_secs),
            bootnode_url: args.bootnode_url,
            serve_bootnode: args.serve_bootnode,
            verify_snapshot: args.verify_snapshot,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    ledger_node::run(args.into()).await
}
