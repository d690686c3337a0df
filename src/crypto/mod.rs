//! Homomorphic cryptosystem capability consumed by the PIR pipeline.
//!
//! The pipeline stages are generic over [`HomomorphicCrypto`]; a backend is
//! chosen once (usually from a [`CryptoParams`] string) and passed by reference
//! to every stage.

mod mock;
mod rlwe;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{pir_err, PirError, Result};
use crate::params::{RlweParams, MODULUS_BITS};

pub use mock::{MockCrypto, MockParams};
pub use rlwe::{PreparedRlweCiphertext, RlweCrypto};

/// Operations the PIR pipeline needs from a somewhat-homomorphic cryptosystem.
///
/// Plaintexts are byte strings of at most [`plaintext_bytesize`] bytes; the
/// backend chooses how they map onto its message space, but `decrypt` must
/// return exactly the bytes that went in (zero-padded to full size), also after
/// a [`dot_product`] with an encrypted one-hot selection.
///
/// [`plaintext_bytesize`]: HomomorphicCrypto::plaintext_bytesize
/// [`dot_product`]: HomomorphicCrypto::dot_product
pub trait HomomorphicCrypto: Send + Sync {
    /// Ciphertext as held in memory between operations
    type Ciphertext: Clone + Send + Sync;
    /// Database plaintext encoded for evaluation
    type Plaintext: Send + Sync;
    /// Query ciphertext after precomputation
    type PreparedCiphertext: Send + Sync;

    /// Parameter set this instance was built from
    fn crypto_params(&self) -> CryptoParams;

    /// Fixed serialized ciphertext size
    fn ciphertext_bytesize(&self) -> usize;

    /// Bytes carried by one plaintext
    fn plaintext_bytesize(&self) -> usize;

    /// Encrypt the constant 0 or 1
    fn encrypt_bit(&self, bit: bool) -> Self::Ciphertext;

    /// Decrypt to `plaintext_bytesize()` bytes
    fn decrypt(&self, ct: &Self::Ciphertext) -> Vec<u8>;

    /// Homomorphic addition
    fn add(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Self::Ciphertext;

    /// Homomorphic multiplication by a plaintext
    fn scalar_mul(&self, ct: &Self::Ciphertext, pt: &Self::Plaintext) -> Self::Ciphertext;

    /// Encode up to `plaintext_bytesize()` bytes; shorter input is zero-padded
    fn encode_plaintext(&self, bytes: &[u8]) -> Self::Plaintext;

    /// Serialize to exactly `ciphertext_bytesize()` bytes
    fn serialize(&self, ct: &Self::Ciphertext) -> Vec<u8>;

    /// Parse a serialized ciphertext, checking size and structure
    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Ciphertext>;

    /// Precompute whatever speeds up repeated [`dot_product`](Self::dot_product) calls
    fn prepare(&self, ct: &Self::Ciphertext) -> Self::PreparedCiphertext;

    /// Sum of `query[i] * rows[i]` over the present rows; `None` rows are zero.
    ///
    /// Equal to folding [`scalar_mul`](Self::scalar_mul) and [`add`](Self::add)
    /// over the unprepared query ciphertexts.
    fn dot_product(
        &self,
        query: &[Self::PreparedCiphertext],
        rows: &[Option<&Self::Plaintext>],
    ) -> Self::Ciphertext;
}

/// Cryptosystem selection, printed and parsed as `System:Security:PolyDegree:ModulusBits`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CryptoParams {
    /// Ring-LWE, e.g. `LWE:80:2048:60`
    Rlwe(RlweParams),
    /// No encryption at all, e.g. `Mock:0:1024:16`
    Mock(MockParams),
}

impl CryptoParams {
    /// Check the underlying parameter set
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Rlwe(p) => p.validate(),
            Self::Mock(p) => p.validate(),
        }
    }

    /// Fixed serialized ciphertext size
    pub fn ciphertext_bytesize(&self) -> usize {
        match self {
            Self::Rlwe(p) => p.ciphertext_bytesize(),
            Self::Mock(p) => p.ciphertext_bytesize(),
        }
    }

    /// Bytes carried by one plaintext
    pub fn plaintext_bytesize(&self) -> usize {
        match self {
            Self::Rlwe(p) => p.plaintext_bytesize(),
            Self::Mock(p) => p.plaintext_bytesize(),
        }
    }
}

impl fmt::Display for CryptoParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rlwe(p) => write!(f, "LWE:{}:{}:{}", p.security_bits, p.ring_dim, MODULUS_BITS),
            Self::Mock(p) => write!(f, "Mock:0:{}:{}", p.num_coeffs, p.plaintext_bits),
        }
    }
}

impl FromStr for CryptoParams {
    type Err = PirError;

    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.split(':').collect();
        let [system, security, degree, bits] = fields[..] else {
            return Err(pir_err!(
                InvalidParameters,
                "'{}' is not of the form System:Security:PolyDegree:ModulusBits",
                s
            ));
        };
        let number = |field: &str, what: &str| -> Result<u64> {
            field
                .parse()
                .map_err(|_| pir_err!(InvalidParameters, "bad {} '{}' in '{}'", what, field, s))
        };
        let security = number(security, "security level")? as u32;
        let degree = number(degree, "polynomial degree")? as usize;
        let bits = number(bits, "modulus size")? as u32;

        let params = match system {
            "LWE" | "RLWE" => {
                if bits != MODULUS_BITS {
                    return Err(pir_err!(
                        InvalidParameters,
                        "only {}-bit moduli are supported, got {}",
                        MODULUS_BITS,
                        bits
                    ));
                }
                Self::Rlwe(RlweParams::new(degree, security))
            }
            "Mock" => Self::Mock(MockParams::new(degree, bits)),
            other => {
                return Err(pir_err!(InvalidParameters, "unknown cryptosystem '{}'", other));
            }
        };
        params.validate()?;
        Ok(params)
    }
}

/// Parameter sets offered by the command line tools
pub fn available_crypto_params() -> Vec<CryptoParams> {
    vec![
        CryptoParams::Rlwe(RlweParams::lwe_80_1024()),
        CryptoParams::Rlwe(RlweParams::lwe_80_2048()),
        CryptoParams::Rlwe(RlweParams::lwe_128_4096()),
        CryptoParams::Mock(MockParams::new(1024, 16)),
    ]
}
