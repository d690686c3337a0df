//! RLWE encryption and decryption
//!
//! Implements encryption: b = -a·s + e + Δ·m
//! where Δ = ⌊q/p⌋ is the scaling factor.

use crate::math::{GaussianSampler, ModQ, NttContext, Poly};
use crate::params::RlweParams;

use super::types::{RlweCiphertext, RlweSecretKey};

impl RlweSecretKey {
    /// Generate a secret key from Gaussian distribution
    pub fn generate(params: &RlweParams, sampler: &mut GaussianSampler) -> Self {
        let coeffs: Vec<u64> = (0..params.ring_dim)
            .map(|_| ModQ::from_signed(sampler.sample(), params.q))
            .collect();
        Self {
            poly: Poly::from_coeffs(coeffs, params.q),
        }
    }
}

impl RlweCiphertext {
    /// Encrypt a message polynomial
    ///
    /// Computes: (a, b) where b = -a·s + e + Δ·m
    ///
    /// # Arguments
    /// * `sk` - Secret key
    /// * `message_poly` - Message polynomial (coefficients in [0, p))
    /// * `delta` - Scaling factor Δ = ⌊q/p⌋
    /// * `a_random` - Random polynomial a ∈ R_q
    /// * `error` - Error polynomial e sampled from Gaussian
    /// * `ctx` - NTT context for polynomial multiplication
    pub fn encrypt(
        sk: &RlweSecretKey,
        message_poly: &Poly,
        delta: u64,
        a_random: Poly,
        error: &Poly,
        ctx: &NttContext,
    ) -> Self {
        let scaled_msg = message_poly.scalar_mul(delta);
        let neg_a_s = -a_random.mul_ntt(&sk.poly, ctx);
        let b = &(&neg_a_s + error) + &scaled_msg;

        Self { a: a_random, b }
    }

    /// Decrypt ciphertext to recover the message coefficients
    ///
    /// Computes: m = ⌊(a·s + b) / Δ⌉ mod p
    pub fn decrypt(&self, sk: &RlweSecretKey, delta: u64, p: u64, ctx: &NttContext) -> Vec<u64> {
        let noisy_msg = &self.a.mul_ntt(&sk.poly, ctx) + &self.b;
        let half_delta = delta / 2;

        noisy_msg
            .coeffs()
            .iter()
            .map(|&val| {
                let rounded = (val as u128 + half_delta as u128) / delta as u128;
                (rounded % p as u128) as u64
            })
            .collect()
    }

    /// Homomorphic addition of two ciphertexts
    ///
    /// (a1, b1) + (a2, b2) = (a1 + a2, b1 + b2)
    pub fn add(&self, other: &RlweCiphertext) -> RlweCiphertext {
        RlweCiphertext {
            a: &self.a + &other.a,
            b: &self.b + &other.b,
        }
    }

    /// Multiply ciphertext by a plaintext polynomial
    ///
    /// p(X) · (a, b) = (p(X)·a, p(X)·b), decrypts to p(X)·m(X) mod (X^d + 1).
    /// The plaintext may be in either domain.
    pub fn poly_mul(&self, plaintext_poly: &Poly, ctx: &NttContext) -> RlweCiphertext {
        RlweCiphertext {
            a: self.a.mul_ntt(plaintext_poly, ctx),
            b: self.b.mul_ntt(plaintext_poly, ctx),
        }
    }

    /// Create the noiseless encryption of zero (0, 0)
    pub fn zero(ring_dim: usize, q: u64) -> RlweCiphertext {
        RlweCiphertext {
            a: Poly::zero(ring_dim, q),
            b: Poly::zero(ring_dim, q),
        }
    }
}
