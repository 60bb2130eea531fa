//! Key generation and key encodings.
//!
//! A key pair is a random LowMC key `sk`, a random plaintext `p` and the
//! ciphertext `c = LowMC(sk, p)`. The public key `(p, c)` is encoded as
//! `p || c`, the private key as `sk || p || c`.
use std::fmt;

use rand::CryptoRng;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;

use crate::{mpc::SimulationError, params::Instance};

/// Errors when decoding keys.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The encoding does not have the length required by the parameter set.
    #[error("the key has {actual} bytes, expected {expected}")]
    InvalidLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },
    /// The private key does not encrypt the plaintext to the ciphertext.
    #[error("the private key does not match its public key")]
    Inconsistent,
    /// The cipher backend rejected the key or the plaintext.
    #[error("the cipher failed to encrypt: {0}")]
    Cipher(#[from] SimulationError),
}

/// A public key: a plaintext and its encryption under the private key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    pub(crate) plaintext: Vec<u8>,
    pub(crate) ciphertext: Vec<u8>,
}

impl PublicKey {
    /// Encodes the key as `plaintext || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        [self.plaintext.as_slice(), &self.ciphertext].concat()
    }

    /// Decodes a public key of the parameter set of `instance`.
    pub fn from_bytes(instance: &Instance, bytes: &[u8]) -> Result<Self, KeyError> {
        let size = instance.params().input_size();
        check_length(bytes, 2 * size)?;
        let (plaintext, ciphertext) = bytes.split_at(size);
        Ok(Self {
            plaintext: plaintext.to_vec(),
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// The random plaintext.
    pub fn plaintext(&self) -> &[u8] {
        &self.plaintext
    }

    /// The plaintext encrypted under the private key.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

/// A private key together with its public key.
#[derive(Clone)]
pub struct PrivateKey {
    pub(crate) key: Vec<u8>,
    pub(crate) public: PublicKey,
}

impl PrivateKey {
    /// Encodes the key as `key || plaintext || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        [self.key.as_slice(), &self.public.to_bytes()].concat()
    }

    /// Decodes a private key and checks that it matches the public key it contains.
    pub fn from_bytes(instance: &Instance, bytes: &[u8]) -> Result<Self, KeyError> {
        let size = instance.params().input_size();
        check_length(bytes, 3 * size)?;
        let (key, public) = bytes.split_at(size);
        let public = PublicKey::from_bytes(instance, public)?;
        let ciphertext = instance.cipher().encrypt(key, &public.plaintext)?;
        if !bool::from(ciphertext.ct_eq(&public.ciphertext)) {
            return Err(KeyError::Inconsistent);
        }
        Ok(Self {
            key: key.to_vec(),
            public,
        })
    }

    /// The matching public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.key.ct_eq(&other.key)) && self.public == other.public
    }
}

impl Eq for PrivateKey {}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("key", &"<redacted>")
            .field("public", &self.public)
            .finish()
    }
}

/// Generates a fresh key pair.
///
/// Fails only if the cipher backend of `instance` rejects inputs of the block size.
pub fn keygen<R: CryptoRng + ?Sized>(
    instance: &Instance,
    rng: &mut R,
) -> Result<PrivateKey, KeyError> {
    let size = instance.params().input_size();
    let mut key = vec![0; size];
    let mut plaintext = vec![0; size];
    rng.fill_bytes(&mut key);
    rng.fill_bytes(&mut plaintext);
    let ciphertext = instance.cipher().encrypt(&key, &plaintext)?;
    debug!(params = ?instance.params(), "generated key pair");
    Ok(PrivateKey {
        key,
        public: PublicKey {
            plaintext,
            ciphertext,
        },
    })
}

fn check_length(bytes: &[u8], expected: usize) -> Result<(), KeyError> {
    if bytes.len() != expected {
        return Err(KeyError::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}
