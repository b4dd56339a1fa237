use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::constants::HASH_SIZE;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: String,
    pub private_key: String,
}

/// Source of fresh addresses. The ledger treats the result as opaque.
pub trait AddressProvider: Send + Sync {
    fn new_account(&self, password: &str) -> Account;
}

/// Derives a private key as HMAC-SHA256(password, random salt); the address
/// is the hex SHA-256 of that key.
#[derive(Clone, Copy, Debug, Default)]
pub struct HmacAddressProvider;

impl AddressProvider for HmacAddressProvider {
    fn new_account(&self, password: &str) -> Account {
        let mut salt = [0u8; HASH_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);

        let mut mac = HmacSha256::new_from_slice(password.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(&salt);
        let private_key = mac.finalize().into_bytes();
        let address = Sha256::digest(private_key);

        Account {
            address: hex::encode(address),
            private_key: hex::encode(private_key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HASH_HEX_SIZE;

    #[test]
    fn address_is_digest_of_private_key() {
        let account = HmacAddressProvider.new_account("hunter2");
        assert_eq!(account.address.len(), HASH_HEX_SIZE);
        let key = hex::decode(&account.private_key).unwrap();
        assert_eq!(account.address, hex::encode(Sha256::digest(key)));
    }

    #[test]
    fn same_password_yields_distinct_accounts() {
        let a = HmacAddressProvider.new_account("pw");
        let b = HmacAddressProvider.new_account("pw");
        assert_ne!(a.address, b.address);
    }
}
