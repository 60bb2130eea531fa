//! The interface between the signature protocol and the block cipher whose key
//! is proven in zero knowledge.
use crate::{
    mpc::{Msgs, SimulationError},
    params::LowMcShape,
    tape::{RandomTapes, Shares},
};

/// Inputs of the online simulation of one repetition.
#[derive(Debug, Clone, Copy)]
pub struct OnlineInput<'a> {
    /// The private key XORed with the key mask.
    pub masked_key: &'a [u8],
    /// The per-party shares of the key mask.
    pub key_mask: &'a Shares,
    /// The plaintext of the public key.
    pub plaintext: &'a [u8],
    /// The expected output of the cipher.
    pub ciphertext: &'a [u8],
}

/// A block cipher that can be evaluated in the clear, in the aux pass and in
/// the online pass of the MPC simulation.
///
/// The three evaluations must describe the same circuit: the AND gates are
/// visited in the same order, each one through [`crate::mpc::aux_and`] in the
/// aux pass and [`crate::mpc::online_and`] in the online pass.
pub trait CipherOracle: Send + Sync {
    /// The shape of the circuit, which determines tape and message sizes.
    fn shape(&self) -> LowMcShape;

    /// Encrypts `plaintext` under `key`.
    ///
    /// Fails if either input does not have the block size of the shape.
    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, SimulationError>;

    /// Computes the aux bits for every AND gate, given the reconstructed key mask.
    ///
    /// The tapes are positioned right after the key mask shares.
    fn compute_aux(&self, key_mask: &[u8], tapes: &mut RandomTapes) -> Result<(), SimulationError>;

    /// Simulates the online pass and broadcasts the output mask shares.
    ///
    /// The tapes are positioned right after the key mask shares. Fails if the
    /// reconstructed output differs from `input.ciphertext`.
    fn simulate_online(
        &self,
        input: OnlineInput<'_>,
        tapes: &mut RandomTapes,
        msgs: &mut Msgs,
    ) -> Result<(), SimulationError>;
}
