//! UDP peer discovery: a periodic broadcast beacon and a listener that
//! records every other node it hears.
use ledger_core::{block::now_millis, PeerRegistry};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::{net::UdpSocket, sync::Mutex, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::constants::{ACCOUNT_ANNOUNCE_PREFIX, DISCOVERY_TOKEN, MAX_DATAGRAM};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datagram {
    Discovery,
    AccountAnnouncement(String),
    Unknown,
}

impl Datagram {
    pub fn parse(bytes: &[u8]) -> Self {
        let Ok(text) = std::str::from_utf8(bytes) else {
            return Datagram::Unknown;
        };
        if text == DISCOVERY_TOKEN {
            Datagram::Discovery
        } else if let Some(address) = text.strip_prefix(ACCOUNT_ANNOUNCE_PREFIX) {
            Datagram::AccountAnnouncement(address.to_string())
        } else {
            Datagram::Unknown
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Datagram::Discovery => DISCOVERY_TOKEN.as_bytes().to_vec(),
            Datagram::AccountAnnouncement(address) => {
                format!("{ACCOUNT_ANNOUNCE_PREFIX}{address}").into_bytes()
            }
            Datagram::Unknown => vec![],
        }
    }
}

#[derive(Clone)]
pub struct Gossip {
    socket: Arc<UdpSocket>,
    target: SocketAddr,
}

impl Gossip {
    pub async fn bind(bind: SocketAddr, target: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(bind).await?;
        socket.set_broadcast(true)?;
        info!(
            "peer discovery server started at {}",
            socket.local_addr()?
        );
        Ok(Self {
            socket: Arc::new(socket),
            target,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    async fn send(&self, datagram: &Datagram) -> io::Result<()> {
        self.socket
            .send_to(&datagram.to_bytes(), self.target)
            .await
            .map(|_| ())
    }

    pub async fn send_beacon(&self) -> io::Result<()> {
        self.send(&Datagram::Discovery).await
    }

    /// Fire-and-forget notice that `address` now exists.
    pub async fn announce_account(&self, address: &str) {
        let datagram = Datagram::AccountAnnouncement(address.to_string());
        match self.send(&datagram).await {
            Ok(()) => info!(%address, "account announced"),
            Err(err) => warn!(%err, "account announcement failed"),
        }
    }

    /// Sends a beacon every `interval`; when `ttl` is set, also evicts peers
    /// that have gone quiet.
    pub fn spawn_beacon(
        &self,
        interval: Duration,
        peers: Arc<Mutex<PeerRegistry>>,
        ttl: Option<Duration>,
    ) -> JoinHandle<()> {
        let gossip = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(err) = gossip.send_beacon().await {
                    warn!(%err, target = %gossip.target, "beacon send failed");
                }
                if let Some(ttl) = ttl {
                    let evicted = peers.lock().await.evict_stale(now_millis(), ttl);
                    for ip in evicted {
                        info!(%ip, "peer evicted after silence");
                    }
                }
            }
        })
    }

    pub fn spawn_listener(&self, peers: Arc<Mutex<PeerRegistry>>) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        tokio::spawn(async move {
            let mut buf = [0u8; MAX_DATAGRAM];
            loop {
                let (len, from) = match socket.recv_from(&mut buf).await {
                    Ok(received) => received,
                    Err(err) => {
                        warn!(%err, "gossip receive failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                };
                match Datagram::parse(&buf[..len]) {
                    Datagram::Discovery => {
                        if peers.lock().await.observe(from, now_millis()) {
                            info!(peer = %from.ip(), "discovered peer");
                        }
                    }
                    Datagram::AccountAnnouncement(address) => {
                        info!(%from, %address, "peer announced account");
                    }
                    Datagram::Unknown => debug!(%from, len, "ignoring unknown datagram"),
                }
            }
        })
    }
}

/// Primary outbound IPv4 address of this host. Connecting a UDP socket only
/// selects a route; nothing is sent.
pub fn detect_local_ip() -> Option<IpAddr> {
    let socket = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}
