//! Ring-LWE backend for the PIR pipeline.
//!
//! Plaintext bytes are packed `plaintext_bits` at a time into the coefficients
//! of a message polynomial and kept in NTT form, so selecting a database row is
//! a pointwise product with the query ciphertext.

use std::sync::Mutex;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::error::Result;
use crate::math::{bytes_to_coeffs, coeffs_to_bytes, GaussianSampler, ModQ, NttContext, Poly};
use crate::params::RlweParams;
use crate::rlwe::{RlweCiphertext, RlweSecretKey};

use super::{CryptoParams, HomomorphicCrypto};

/// Query ciphertext in NTT form with Shoup quotients for every evaluation point.
///
/// Multiplying a database row by it costs one multiply-high per coefficient
/// instead of a 128-bit division.
#[derive(Clone, Debug)]
pub struct PreparedRlweCiphertext {
    a: Vec<u64>,
    a_shoup: Vec<u64>,
    b: Vec<u64>,
    b_shoup: Vec<u64>,
}

struct EncryptionRandomness {
    uniform: ChaCha20Rng,
    gaussian: GaussianSampler,
}

/// Ring-LWE cryptosystem holding a secret key
pub struct RlweCrypto {
    params: RlweParams,
    ctx: NttContext,
    sk: RlweSecretKey,
    randomness: Mutex<EncryptionRandomness>,
}

impl RlweCrypto {
    /// Generate a fresh secret key from OS entropy
    pub fn new(params: RlweParams) -> Result<Self> {
        Self::from_rng(params, ChaCha20Rng::from_entropy())
    }

    /// Deterministic key and encryption randomness, for tests and benchmarks
    pub fn with_seed(params: RlweParams, seed: u64) -> Result<Self> {
        Self::from_rng(params, ChaCha20Rng::seed_from_u64(seed))
    }

    fn from_rng(params: RlweParams, mut uniform: ChaCha20Rng) -> Result<Self> {
        params.validate()?;
        let ctx = NttContext::new(params.ring_dim, params.q);
        let mut gaussian = GaussianSampler::with_seed(params.sigma, uniform.gen());
        let sk = RlweSecretKey::generate(&params, &mut gaussian);

        Ok(Self {
            params,
            ctx,
            sk,
            randomness: Mutex::new(EncryptionRandomness { uniform, gaussian }),
        })
    }

    /// Ring-LWE parameters
    pub fn params(&self) -> &RlweParams {
        &self.params
    }

    fn prepare_poly(&self, poly: &Poly) -> (Vec<u64>, Vec<u64>) {
        let mut values = poly.clone();
        values.to_ntt(&self.ctx);
        let values = values.into_coeffs();
        let shoup = values
            .iter()
            .map(|&w| ModQ::shoup_precompute(w, self.params.q))
            .collect();
        (values, shoup)
    }
}

impl HomomorphicCrypto for RlweCrypto {
    type Ciphertext = RlweCiphertext;
    type Plaintext = Poly;
    type PreparedCiphertext = PreparedRlweCiphertext;

    fn crypto_params(&self) -> CryptoParams {
        CryptoParams::Rlwe(self.params.clone())
    }

    fn ciphertext_bytesize(&self) -> usize {
        self.params.ciphertext_bytesize()
    }

    fn plaintext_bytesize(&self) -> usize {
        self.params.plaintext_bytesize()
    }

    fn encrypt_bit(&self, bit: bool) -> RlweCiphertext {
        let d = self.params.ring_dim;
        let q = self.params.q;
        let message = Poly::constant(bit as u64, d, q);

        let (a, e) = {
            let mut guard = self
                .randomness
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let state = &mut *guard;
            let a = Poly::random_with_rng(d, q, &mut state.uniform);
            let e = Poly::sample_gaussian(d, q, &mut state.gaussian);
            (a, e)
        };

        RlweCiphertext::encrypt(&self.sk, &message, self.params.delta(), a, &e, &self.ctx)
    }

    fn decrypt(&self, ct: &RlweCiphertext) -> Vec<u8> {
        let coeffs = ct.decrypt(
            &self.sk,
            self.params.delta(),
            self.params.plaintext_modulus(),
            &self.ctx,
        );
        coeffs_to_bytes(&coeffs, self.params.plaintext_bits, self.plaintext_bytesize())
    }

    fn add(&self, a: &RlweCiphertext, b: &RlweCiphertext) -> RlweCiphertext {
        a.add(b)
    }

    fn scalar_mul(&self, ct: &RlweCiphertext, pt: &Poly) -> RlweCiphertext {
        ct.poly_mul(pt, &self.ctx)
    }

    fn encode_plaintext(&self, bytes: &[u8]) -> Poly {
        let coeffs = bytes_to_coeffs(bytes, self.params.plaintext_bits, self.params.ring_dim);
        let mut poly = Poly::from_coeffs(coeffs, self.params.q);
        poly.to_ntt(&self.ctx);
        poly
    }

    fn serialize(&self, ct: &RlweCiphertext) -> Vec<u8> {
        ct.to_bytes()
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<RlweCiphertext> {
        RlweCiphertext::from_bytes(bytes, self.params.ring_dim, self.params.q)
    }

    fn prepare(&self, ct: &RlweCiphertext) -> PreparedRlweCiphertext {
        let (a, a_shoup) = self.prepare_poly(&ct.a);
        let (b, b_shoup) = self.prepare_poly(&ct.b);
        PreparedRlweCiphertext {
            a,
            a_shoup,
            b,
            b_shoup,
        }
    }

    fn dot_product(
        &self,
        query: &[PreparedRlweCiphertext],
        rows: &[Option<&Poly>],
    ) -> RlweCiphertext {
        assert_eq!(query.len(), rows.len(), "one plaintext slot per query element");

        let d = self.params.ring_dim;
        let q = self.params.q;
        let mut acc_a = vec![0u64; d];
        let mut acc_b = vec![0u64; d];

        for (sel, row) in query.iter().zip(rows) {
            let Some(row) = row else { continue };
            debug_assert!(row.is_ntt());
            for (j, &x) in row.coeffs().iter().enumerate() {
                let pa = ModQ::shoup_mul(x, sel.a[j], sel.a_shoup[j], q);
                let pb = ModQ::shoup_mul(x, sel.b[j], sel.b_shoup[j], q);
                acc_a[j] = ModQ::add(acc_a[j], pa, q);
                acc_b[j] = ModQ::add(acc_b[j], pb, q);
            }
        }

        let mut a = Poly::from_ntt_values(acc_a, q);
        let mut b = Poly::from_ntt_values(acc_b, q);
        a.from_ntt(&self.ctx);
        b.from_ntt(&self.ctx);
        RlweCiphertext::from_parts(a, b)
    }
}
