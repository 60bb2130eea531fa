//! Parameter sets and the [`Instance`] that binds a parameter set to a cipher backend.
use std::{
    fmt,
    str::FromStr,
    sync::{Arc, LazyLock},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    cipher::CipherOracle,
    lowmc::LowMc,
    tree::MAX_LEAVES,
    utils::num_bytes,
};

/// Length of the salt in bytes. Independent of the parameter set.
pub const SALT_SIZE: usize = 32;

/// The per-signature salt.
pub type Salt = [u8; SALT_SIZE];

/// Errors caused by inconsistent parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamsError {
    /// The name does not belong to a known parameter set.
    #[error("unknown parameter set '{0}'")]
    UnknownParameterSet(String),
    /// Parties are hashed and committed in batches of 4.
    #[error("the number of parties must be a multiple of 4, got {0}")]
    PartiesNotMultipleOfFour(usize),
    /// All shares of a wire are packed into one 64-bit word.
    #[error("at most 64 parties are supported, got {0}")]
    TooManyParties(usize),
    /// At least one repetition must be opened and at least one must stay closed.
    #[error("{opened} opened repetitions are invalid for {rounds} repetitions")]
    InvalidOpenedRounds {
        /// The number of opened repetitions.
        opened: usize,
        /// The total number of repetitions.
        rounds: usize,
    },
    /// Tree node indices are hashed as 16-bit integers.
    #[error("at most {MAX_LEAVES} repetitions are supported, got {0}")]
    TooManyRounds(usize),
    /// The LowMC state size must be a positive multiple of 8 and at most 256.
    #[error("invalid LowMC state size {0}")]
    InvalidStateSize(usize),
    /// The S-box layer must fit into the state.
    #[error("{sboxes} S-boxes do not fit into a state of {state_bits} bits")]
    InvalidSboxCount {
        /// The number of S-boxes per round.
        sboxes: usize,
        /// The state size in bits.
        state_bits: usize,
    },
    /// The LowMC instance must have at least one round.
    #[error("LowMC needs at least one round")]
    NoCipherRounds,
    /// Seeds and digests must not be empty.
    #[error("seed and digest sizes must be non-zero")]
    EmptyHash,
    /// The cipher backend does not implement the shape required by the parameters.
    #[error("the cipher backend implements {actual:?}, but the parameters require {expected:?}")]
    CipherMismatch {
        /// The shape required by the parameters.
        expected: LowMcShape,
        /// The shape implemented by the cipher.
        actual: LowMcShape,
    },
}

/// The shape of a LowMC instance with a full S-box layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LowMcShape {
    /// Block size and key size in bits.
    pub state_bits: usize,
    /// Number of 3-bit S-boxes per round.
    pub sboxes: usize,
    /// Number of rounds.
    pub rounds: usize,
}

impl LowMcShape {
    /// Number of AND gates in one evaluation (3 per S-box).
    pub fn and_gates(&self) -> usize {
        3 * self.sboxes * self.rounds
    }

    pub(crate) fn validate(&self) -> Result<(), ParamsError> {
        if self.state_bits == 0 || self.state_bits % 8 != 0 || self.state_bits > 256 {
            return Err(ParamsError::InvalidStateSize(self.state_bits));
        }
        if self.sboxes == 0 || 3 * self.sboxes > self.state_bits {
            return Err(ParamsError::InvalidSboxCount {
                sboxes: self.sboxes,
                state_bits: self.state_bits,
            });
        }
        if self.rounds == 0 {
            return Err(ParamsError::NoCipherRounds);
        }
        Ok(())
    }
}

/// The parameters of one instantiation of the signature scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawParams", into = "RawParams")]
pub struct Params {
    lowmc: LowMcShape,
    rounds: usize,
    opened_rounds: usize,
    parties: usize,
    seed_size: usize,
    digest_size: usize,
}

impl Params {
    /// Validates and creates a custom parameter set.
    pub fn new(
        lowmc: LowMcShape,
        rounds: usize,
        opened_rounds: usize,
        parties: usize,
        seed_size: usize,
        digest_size: usize,
    ) -> Result<Self, ParamsError> {
        lowmc.validate()?;
        if parties % 4 != 0 || parties == 0 {
            return Err(ParamsError::PartiesNotMultipleOfFour(parties));
        }
        if parties > 64 {
            return Err(ParamsError::TooManyParties(parties));
        }
        if rounds > MAX_LEAVES {
            return Err(ParamsError::TooManyRounds(rounds));
        }
        if opened_rounds == 0 || opened_rounds >= rounds {
            return Err(ParamsError::InvalidOpenedRounds {
                opened: opened_rounds,
                rounds,
            });
        }
        if seed_size == 0 || digest_size == 0 {
            return Err(ParamsError::EmptyHash);
        }
        Ok(Self {
            lowmc,
            rounds,
            opened_rounds,
            parties,
            seed_size,
            digest_size,
        })
    }

    /// Shape of the LowMC instance.
    pub fn lowmc(&self) -> LowMcShape {
        self.lowmc
    }

    /// Number of parallel repetitions `T`.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Number of repetitions `τ` whose MPC views are opened.
    pub fn opened_rounds(&self) -> usize {
        self.opened_rounds
    }

    /// Number of simulated MPC parties `N`.
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Index of the party that holds the aux bits.
    pub fn last_party(&self) -> usize {
        self.parties - 1
    }

    /// Size of all seeds in bytes.
    pub fn seed_size(&self) -> usize {
        self.seed_size
    }

    /// Size of all hash digests and commitments in bytes.
    pub fn digest_size(&self) -> usize {
        self.digest_size
    }

    /// Size of keys, plaintexts and ciphertexts in bytes.
    pub fn input_size(&self) -> usize {
        self.lowmc.state_bits / 8
    }

    /// Size of the aux bits (one per AND gate) in bytes.
    pub fn view_size(&self) -> usize {
        num_bytes(self.lowmc.and_gates())
    }

    /// Number of bits each party broadcasts: one per AND gate plus its output share.
    pub fn msgs_bits(&self) -> usize {
        self.lowmc.and_gates() + self.lowmc.state_bits
    }

    /// Size of the broadcast messages of one party in bytes.
    pub fn msgs_size(&self) -> usize {
        self.input_size() + self.view_size()
    }

    /// Size of the random tape of one party in bytes.
    pub fn tape_size(&self) -> usize {
        2 * self.view_size() + self.input_size()
    }
}

#[derive(Serialize, Deserialize)]
struct RawParams {
    lowmc: LowMcShape,
    rounds: usize,
    opened_rounds: usize,
    parties: usize,
    seed_size: usize,
    digest_size: usize,
}

impl TryFrom<RawParams> for Params {
    type Error = ParamsError;

    fn try_from(raw: RawParams) -> Result<Self, Self::Error> {
        Params::new(
            raw.lowmc,
            raw.rounds,
            raw.opened_rounds,
            raw.parties,
            raw.seed_size,
            raw.digest_size,
        )
    }
}

impl From<Params> for RawParams {
    fn from(p: Params) -> Self {
        RawParams {
            lowmc: p.lowmc,
            rounds: p.rounds,
            opened_rounds: p.opened_rounds,
            parties: p.parties,
            seed_size: p.seed_size,
            digest_size: p.digest_size,
        }
    }
}

/// The predefined parameter sets for NIST security levels 1, 3 and 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ParameterSet {
    /// 128-bit LowMC, 343 repetitions, 27 opened, 16 parties.
    L1,
    /// 192-bit LowMC, 570 repetitions, 39 opened, 16 parties.
    L3,
    /// 256-bit LowMC, 803 repetitions, 50 opened, 16 parties.
    L5,
}

impl ParameterSet {
    /// All predefined parameter sets.
    pub const ALL: [ParameterSet; 3] = [ParameterSet::L1, ParameterSet::L3, ParameterSet::L5];

    /// The parameters of this set.
    pub fn params(self) -> Params {
        let (state_bits, cipher_rounds, rounds, opened_rounds, seed_size) = match self {
            ParameterSet::L1 => (128, 20, 343, 27, 16),
            ParameterSet::L3 => (192, 30, 570, 39, 24),
            ParameterSet::L5 => (256, 38, 803, 50, 32),
        };
        Params {
            lowmc: LowMcShape {
                state_bits,
                sboxes: 10,
                rounds: cipher_rounds,
            },
            rounds,
            opened_rounds,
            parties: 16,
            seed_size,
            digest_size: 2 * seed_size,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ParameterSet::L1 => "picnic-kkw-l1",
            ParameterSet::L3 => "picnic-kkw-l3",
            ParameterSet::L5 => "picnic-kkw-l5",
        }
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParameterSet {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|set| set.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParamsError::UnknownParameterSet(s.to_string()))
    }
}

impl TryFrom<String> for ParameterSet {
    type Error = ParamsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ParameterSet> for String {
    fn from(set: ParameterSet) -> Self {
        set.to_string()
    }
}

// The LowMC constants of the predefined sets are derived once per process.
static LOWMC_L1: LazyLock<Arc<LowMc>> =
    LazyLock::new(|| Arc::new(LowMc::derive(ParameterSet::L1.params().lowmc)));
static LOWMC_L3: LazyLock<Arc<LowMc>> =
    LazyLock::new(|| Arc::new(LowMc::derive(ParameterSet::L3.params().lowmc)));
static LOWMC_L5: LazyLock<Arc<LowMc>> =
    LazyLock::new(|| Arc::new(LowMc::derive(ParameterSet::L5.params().lowmc)));

/// A parameter set together with the cipher backend used to sign and verify.
///
/// The backend is chosen once when the instance is created; the protocol code
/// only ever talks to it through [`CipherOracle`].
#[derive(Clone)]
pub struct Instance {
    params: Params,
    cipher: Arc<dyn CipherOracle>,
}

impl Instance {
    /// The instance for a predefined parameter set.
    pub fn new(set: ParameterSet) -> Self {
        let cipher: Arc<LowMc> = match set {
            ParameterSet::L1 => Arc::clone(&LOWMC_L1),
            ParameterSet::L3 => Arc::clone(&LOWMC_L3),
            ParameterSet::L5 => Arc::clone(&LOWMC_L5),
        };
        Self {
            params: set.params(),
            cipher,
        }
    }

    /// An instance for custom parameters, backed by a freshly derived LowMC instance.
    pub fn custom(params: Params) -> Self {
        let cipher = Arc::new(LowMc::derive(params.lowmc));
        Self { params, cipher }
    }

    /// An instance with a caller-provided cipher backend.
    pub fn with_cipher(
        params: Params,
        cipher: Arc<dyn CipherOracle>,
    ) -> Result<Self, ParamsError> {
        if cipher.shape() != params.lowmc {
            return Err(ParamsError::CipherMismatch {
                expected: params.lowmc,
                actual: cipher.shape(),
            });
        }
        Ok(Self { params, cipher })
    }

    /// The parameters of this instance.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn cipher(&self) -> &dyn CipherOracle {
        self.cipher.as_ref()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
