pub const DEFAULT_HTTP_PORT: u16 = 2345;
pub const DEFAULT_GOSSIP_PORT: u16 = 2346;
pub const DEFAULT_BOOTNODE_URL: &str = "http://172.28.0.2:2345";

/// Literal payload of the periodic discovery beacon.
pub const DISCOVERY_TOKEN: &str = "hello";
/// Prefix of the datagram announcing a freshly created address.
pub const ACCOUNT_ANNOUNCE_PREFIX: &str = "Account address_";

pub(crate) const MAX_DATAGRAM: usize = 1024;
pub(crate) const PUSH_BACKOFF_MS: u64 = 200;
