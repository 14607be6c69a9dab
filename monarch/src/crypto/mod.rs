//! Cryptography as a trait boundary: `monarch-core` never needs to hash
//! or encrypt anything itself, so this module defines the shapes a
//! collaborator module plugs into rather than shipping a cipher. The one
//! concrete piece is [`Sha256Digest`], backed by a small, audited hash
//! crate rather than a hand-rolled implementation.

use sha2::{Digest, Sha256};

/// A symmetric block cipher boundary. No implementation ships here —
/// a collaborator module wraps a real crate (`aes`, `chacha20poly1305`,
/// ...) and exposes it through this trait so kernel-side code never
/// depends on which one was chosen.
pub trait BlockCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Vec<u8>;
    fn decrypt(&self, ciphertext: &[u8]) -> Option<Vec<u8>>;
}

/// An asymmetric keypair boundary, for modules that need to sign or seal
/// data between kernel instances.
pub trait KeyPair {
    fn public_key(&self) -> &[u8];
    fn sign(&self, message: &[u8]) -> Vec<u8>;
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool;
}

/// A 32-byte SHA-256 digest, computed eagerly rather than streamed — the
/// kernel only ever hashes module images and config blobs, both already
/// fully in memory by the time they're hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sha256Digest(pub [u8; 32]);

impl Sha256Digest {
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Sha256Digest(out)
    }

    pub fn to_hex(self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_hashes_identically() {
        assert_eq!(Sha256Digest::of(b"monarch"), Sha256Digest::of(b"monarch"));
    }

    #[test]
    fn different_input_hashes_differently() {
        assert_ne!(Sha256Digest::of(b"monarch"), Sha256Digest::of(b"Monarch"));
    }

    #[test]
    fn known_digest_matches_hex() {
        // echo -n "" | sha256sum
        assert_eq!(
            Sha256Digest::of(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
