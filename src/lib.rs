//! Post-quantum signatures from MPC-in-the-head proofs of knowledge of a LowMC key, following
//! the preprocessing construction of [KKW18](https://eprint.iacr.org/2018/475).
//!
//! A key pair consists of a random LowMC key and a random plaintext, the public key additionally
//! contains the encryption of the plaintext under the key. A signature proves knowledge of the key
//! by simulating an MPC evaluation of LowMC between `N` virtual parties, repeated `T` times, and
//! opening a random subset of the simulations as chosen by a hash of the commitments and the
//! message.
//!
//! ## Main Components
//!
//! * [`params`]: The predefined [`ParameterSet`]s and the [`Instance`] binding parameters to a
//!   cipher backend.
//! * [`keys`]: Key generation and key encodings.
//! * [`protocol`]: [`sign`], [`verify`] and [`verify_detailed`].
//! * [`signature`]: The structured [`Signature`] and its exact byte encoding.
//! * [`cipher`] and [`mpc`]: The interface between the protocol and the circuit that is evaluated
//!   inside the MPC simulation, with [`lowmc`] as the built-in backend.
//!
//! ## Example
//!
//! ```
//! use picnic_kkw::{Instance, ParameterSet, keygen, sign, verify};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let instance = Instance::new(ParameterSet::L1);
//! let mut rng = rand::rng();
//! let private_key = keygen(&instance, &mut rng)?;
//!
//! let signature = sign(&instance, &private_key, b"hello")?;
//! verify(&instance, private_key.public_key(), b"hello", &signature)?;
//! assert!(verify(&instance, private_key.public_key(), b"bye", &signature).is_err());
//! # Ok(())
//! # }
//! ```
//!
//! Signing and verification are deterministic. With the default `parallel` feature, the
//! independent repetitions are simulated on the rayon thread pool.
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod challenge;
pub mod cipher;
pub mod keys;
pub mod lowmc;
pub mod mpc;
pub mod params;
pub mod protocol;
pub mod signature;
pub mod tape;

mod commit;
mod hash;
mod merkle;
mod seed_tree;
mod tree;
mod utils;

pub use keys::{KeyError, PrivateKey, PublicKey, keygen};
pub use merkle::MerkleError;
pub use params::{Instance, LowMcShape, ParameterSet, Params, ParamsError};
pub use protocol::{
    Error, InvalidSignature, sign, sign_signature, verify, verify_detailed, verify_signature,
};
pub use seed_tree::SeedTreeError;
pub use signature::{Signature, max_signature_size, signature_size};
