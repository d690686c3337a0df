//! RLWE ciphertext and key types.
//!
//! Ring-LWE over R_q = Z_q[X]/(X^d + 1).

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::{pir_err, Result};
use crate::math::Poly;

/// RLWE secret key: polynomial in R_q sampled from error distribution.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RlweSecretKey {
    /// Secret polynomial in R_q.
    pub poly: Poly,
}

/// RLWE ciphertext: (a, b) ∈ R_q × R_q where b = -a·s + e + Δ·m.
///
/// To decrypt, compute `b + a·s = e + Δ·m`, then round to recover m.
///
/// # Wire format
///
/// The `d` coefficients of `a` followed by the `d` coefficients of `b`, each a
/// little-endian `u64`, for `16 d` bytes in total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RlweCiphertext {
    /// Random polynomial in R_q.
    pub a: Poly,
    /// Encrypted polynomial: b = -a·s + e + Δ·m.
    pub b: Poly,
}

impl RlweCiphertext {
    /// Creates a ciphertext from component polynomials.
    ///
    /// # Panics
    ///
    /// Debug-asserts that `a` and `b` have the same dimension and modulus.
    pub fn from_parts(a: Poly, b: Poly) -> Self {
        debug_assert_eq!(
            a.dimension(),
            b.dimension(),
            "Ciphertext polynomials must have same dimension"
        );
        debug_assert_eq!(
            a.modulus(),
            b.modulus(),
            "Ciphertext polynomials must have same modulus"
        );
        Self { a, b }
    }

    /// Returns the ring dimension.
    pub fn ring_dim(&self) -> usize {
        self.a.dimension()
    }

    /// Returns the modulus q.
    pub fn modulus(&self) -> u64 {
        self.a.modulus()
    }

    /// Serialized size in bytes for ring dimension `d`
    pub fn bytesize(ring_dim: usize) -> usize {
        16 * ring_dim
    }

    /// Serialize to the fixed-size wire format.
    ///
    /// Both polynomials must be in coefficient domain.
    pub fn to_bytes(&self) -> Vec<u8> {
        assert!(
            !self.a.is_ntt() && !self.b.is_ntt(),
            "Ciphertext must be in coefficient domain"
        );
        let d = self.ring_dim();
        let mut bytes = vec![0u8; Self::bytesize(d)];
        LittleEndian::write_u64_into(self.a.coeffs(), &mut bytes[..8 * d]);
        LittleEndian::write_u64_into(self.b.coeffs(), &mut bytes[8 * d..]);
        bytes
    }

    /// Parse the wire format, rejecting wrong lengths and unreduced coefficients
    pub fn from_bytes(bytes: &[u8], ring_dim: usize, q: u64) -> Result<Self> {
        let expected = Self::bytesize(ring_dim);
        if bytes.len() != expected {
            return Err(pir_err!(
                MalformedCiphertext,
                "expected {} bytes, got {}",
                expected,
                bytes.len()
            ));
        }

        let mut a = vec![0u64; ring_dim];
        let mut b = vec![0u64; ring_dim];
        LittleEndian::read_u64_into(&bytes[..8 * ring_dim], &mut a);
        LittleEndian::read_u64_into(&bytes[8 * ring_dim..], &mut b);

        if let Some(pos) = a.iter().chain(&b).position(|&c| c >= q) {
            return Err(pir_err!(
                MalformedCiphertext,
                "coefficient {} is not reduced modulo q",
                pos
            ));
        }

        Ok(Self {
            a: Poly::from_coeffs(a, q),
            b: Poly::from_coeffs(b, q),
        })
    }
}
