//! Signing contexts
//!
//! A [`SigningContext`] binds one outpoint to the private keys allowed to
//! sign for it and the sighash flag to sign with.
//!
//! # Security Considerations
//!
//! - Secret key bytes live in [`SensitiveBytes`] and are zeroed on drop
//! - `Debug` output shows the outpoint, key count and sighash flag only
//! - Secret keys are rebuilt per signature and dropped immediately after

use bitcoin::secp256k1::{Secp256k1, SecretKey, Signing};
use bitcoin::sighash::EcdsaSighashType;
use bitcoin::{OutPoint, PrivateKey, PublicKey};
use coinsmith_common::logging::sanitize_outpoint;
use coinsmith_common::types::SensitiveBytes;
use std::fmt;

/// One private key in zeroizing storage
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey {
    secret: SensitiveBytes,
    compressed: bool,
}

impl SigningKey {
    /// Copy a private key into zeroizing storage
    pub fn from_private_key(key: &PrivateKey) -> Self {
        Self {
            secret: SensitiveBytes::new(key.inner.secret_bytes().to_vec()),
            compressed: key.compressed,
        }
    }

    /// Rebuild the secp256k1 secret key
    pub(crate) fn secret_key(&self) -> Option<SecretKey> {
        SecretKey::from_slice(self.secret.expose_secret()).ok()
    }

    /// The matching public key, in the same compression as the private key
    pub fn public_key<C: Signing>(&self, secp: &Secp256k1<C>) -> Option<PublicKey> {
        let inner = self.secret_key()?.public_key(secp);
        Some(PublicKey {
            compressed: self.compressed,
            inner,
        })
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey([redacted], compressed: {})", self.compressed)
    }
}

/// Keys and sighash flag for one input
#[derive(Clone, PartialEq, Eq)]
pub struct SigningContext {
    outpoint: OutPoint,
    keys: Vec<SigningKey>,
    sighash_type: EcdsaSighashType,
}

impl SigningContext {
    /// Create a context signing with `SIGHASH_ALL`
    pub fn new(outpoint: OutPoint, keys: &[PrivateKey]) -> Self {
        Self {
            outpoint,
            keys: keys.iter().map(SigningKey::from_private_key).collect(),
            sighash_type: EcdsaSighashType::All,
        }
    }

    /// Create a context from WIF-encoded keys
    pub fn from_wif(outpoint: OutPoint, wifs: &[&str]) -> Result<Self, bitcoin::key::Error> {
        let keys = wifs
            .iter()
            .map(|wif| PrivateKey::from_wif(wif))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(outpoint, &keys))
    }

    /// Use a different sighash flag
    pub fn with_sighash_type(mut self, sighash_type: EcdsaSighashType) -> Self {
        self.sighash_type = sighash_type;
        self
    }

    /// Add another key
    pub fn with_key(mut self, key: &PrivateKey) -> Self {
        self.keys.push(SigningKey::from_private_key(key));
        self
    }

    /// The outpoint this context signs for
    pub fn outpoint(&self) -> OutPoint {
        self.outpoint
    }

    /// The sighash flag appended to every signature
    pub fn sighash_type(&self) -> EcdsaSighashType {
        self.sighash_type
    }

    /// Number of keys held
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Public keys paired with their signing keys
    pub(crate) fn key_pairs<C: Signing>(
        &self,
        secp: &Secp256k1<C>,
    ) -> Vec<(PublicKey, &SigningKey)> {
        self.keys
            .iter()
            .filter_map(|k| k.public_key(secp).map(|pk| (pk, k)))
            .collect()
    }
}

impl fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningContext")
            .field("outpoint", &sanitize_outpoint(&self.outpoint))
            .field("keys", &self.keys.len())
            .field("sighash_type", &self.sighash_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;
    use bitcoin::{Network, Txid};

    #[test]
    fn test_debug_never_shows_key() {
        let sk = SecretKey::from_slice(&[0x42; 32]).unwrap();
        let key = PrivateKey::new(sk, Network::Regtest);
        let ctx = SigningContext::new(OutPoint::new(Txid::all_zeros(), 1), &[key]);

        let debug = format!("{:?}", ctx);
        assert!(!debug.contains("4242"));
        assert!(debug.contains("keys: 1"));
    }

    #[test]
    fn test_public_key_keeps_compression() {
        let secp = Secp256k1::signing_only();
        let sk = SecretKey::from_slice(&[0x11; 32]).unwrap();
        let uncompressed = PrivateKey::new_uncompressed(sk, Network::Regtest);

        let ctx = SigningContext::new(OutPoint::null(), &[uncompressed]);
        let pairs = ctx.key_pairs(&secp);
        assert_eq!(pairs.len(), 1);
        assert!(!pairs[0].0.compressed);
        assert_eq!(pairs[0].0, uncompressed.public_key(&secp));
    }

    #[test]
    fn test_wif_round_trip() {
        let sk = SecretKey::from_slice(&[0x21; 32]).unwrap();
        let key = PrivateKey::new(sk, Network::Testnet);
        let ctx = SigningContext::from_wif(OutPoint::null(), &[&key.to_wif()]).unwrap();
        assert_eq!(ctx, SigningContext::new(OutPoint::null(), &[key]));
    }
}
