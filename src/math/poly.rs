//! Polynomial operations over R_q = Z_q[X]/(X^d + 1).
//!
//! Polynomials can exist in either coefficient domain or NTT domain; the
//! `is_ntt` flag tracks which, and multiplication converts as needed.
//!
//! # Example
//!
//! ```
//! use recursive_pir::math::{NttContext, Poly, DEFAULT_Q};
//!
//! let ctx = NttContext::with_default_q(256);
//! let a = Poly::constant(3, 256, DEFAULT_Q);
//! let b = Poly::constant(5, 256, DEFAULT_Q);
//! let product = a.mul_ntt(&b, &ctx);
//! assert_eq!(product.coeff(0), 15);
//! ```

use std::ops::{Add, Neg, Sub};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::modular::ModQ;
use super::ntt::NttContext;
use super::sampler::GaussianSampler;

/// Polynomial in R_q = Z_q[X]/(X^d + 1).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poly {
    /// Coefficients in coefficient or NTT domain.
    coeffs: Vec<u64>,
    /// Modulus q.
    q: u64,
    /// Whether coefficients are in NTT domain.
    is_ntt: bool,
}

impl Poly {
    /// Create zero polynomial with given dimension and modulus
    pub fn zero(dim: usize, q: u64) -> Self {
        Self {
            coeffs: vec![0; dim],
            q,
            is_ntt: false,
        }
    }

    /// Create polynomial from coefficient vector (reduced modulo q)
    pub fn from_coeffs(coeffs: Vec<u64>, q: u64) -> Self {
        let mut p = Self {
            coeffs,
            q,
            is_ntt: false,
        };
        p.reduce();
        p
    }

    /// Wrap values that are already NTT-domain evaluations modulo q
    pub fn from_ntt_values(values: Vec<u64>, q: u64) -> Self {
        Self {
            coeffs: values,
            q,
            is_ntt: true,
        }
    }

    /// Create polynomial with a single coefficient (constant polynomial)
    pub fn constant(value: u64, dim: usize, q: u64) -> Self {
        let mut coeffs = vec![0; dim];
        coeffs[0] = value % q;
        Self {
            coeffs,
            q,
            is_ntt: false,
        }
    }

    /// Sample polynomial with coefficients from discrete Gaussian distribution
    pub fn sample_gaussian(dim: usize, q: u64, sampler: &mut GaussianSampler) -> Self {
        Self {
            coeffs: sampler.sample_vec_centered(dim, q),
            q,
            is_ntt: false,
        }
    }

    /// Generate a uniformly random polynomial with given RNG
    pub fn random_with_rng<R: Rng>(dim: usize, q: u64, rng: &mut R) -> Self {
        let coeffs: Vec<u64> = (0..dim).map(|_| rng.gen_range(0..q)).collect();
        Self {
            coeffs,
            q,
            is_ntt: false,
        }
    }

    /// Get polynomial dimension
    pub fn dimension(&self) -> usize {
        self.coeffs.len()
    }

    /// Get modulus
    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// Check if in NTT domain
    pub fn is_ntt(&self) -> bool {
        self.is_ntt
    }

    /// Get coefficient at index (only valid if not in NTT domain)
    pub fn coeff(&self, i: usize) -> u64 {
        assert!(!self.is_ntt, "Cannot access coefficients in NTT domain");
        self.coeffs[i]
    }

    /// Get reference to coefficient/NTT vector
    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    /// Consume the polynomial and return its coefficient/NTT vector
    pub fn into_coeffs(self) -> Vec<u64> {
        self.coeffs
    }

    fn reduce(&mut self) {
        for c in &mut self.coeffs {
            *c %= self.q;
        }
    }

    /// Convert to NTT domain
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        if !self.is_ntt {
            ctx.forward(&mut self.coeffs);
            self.is_ntt = true;
        }
    }

    /// Convert from NTT domain to coefficient domain
    pub fn from_ntt(&mut self, ctx: &NttContext) {
        if self.is_ntt {
            ctx.inverse(&mut self.coeffs);
            self.is_ntt = false;
        }
    }

    /// Scalar multiplication
    pub fn scalar_mul(&self, scalar: u64) -> Self {
        let scalar = scalar % self.q;
        Self {
            coeffs: self
                .coeffs
                .iter()
                .map(|&c| ModQ::mul(c, scalar, self.q))
                .collect(),
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }

    /// Pointwise product of two NTT-domain polynomials
    pub fn mul_ntt_domain(&self, other: &Self, ctx: &NttContext) -> Self {
        assert!(
            self.is_ntt && other.is_ntt,
            "Both polynomials must be in NTT domain"
        );
        assert_eq!(self.q, other.q, "Moduli must match");

        let mut result = vec![0u64; self.coeffs.len()];
        ctx.pointwise_mul(&self.coeffs, &other.coeffs, &mut result);

        Self {
            coeffs: result,
            q: self.q,
            is_ntt: true,
        }
    }

    /// Polynomial multiplication using NTT (negacyclic for X^d + 1).
    ///
    /// Operands already in NTT domain are not transformed again; the result is
    /// returned in coefficient domain.
    pub fn mul_ntt(&self, other: &Self, ctx: &NttContext) -> Self {
        assert_eq!(self.q, other.q, "Moduli must match");
        assert_eq!(
            self.coeffs.len(),
            other.coeffs.len(),
            "Dimensions must match"
        );

        let mut a = self.clone();
        a.to_ntt(ctx);
        let mut product = if other.is_ntt {
            a.mul_ntt_domain(other, ctx)
        } else {
            let mut b = other.clone();
            b.to_ntt(ctx);
            a.mul_ntt_domain(&b, ctx)
        };
        product.from_ntt(ctx);
        product
    }
}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, rhs: Self) -> Self::Output {
        assert_eq!(self.q, rhs.q, "Moduli must match");
        assert_eq!(self.is_ntt, rhs.is_ntt, "NTT domains must match");

        Poly {
            coeffs: self
                .coeffs
                .iter()
                .zip(&rhs.coeffs)
                .map(|(&a, &b)| ModQ::add(a, b, self.q))
                .collect(),
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, rhs: Self) -> Self::Output {
        assert_eq!(self.q, rhs.q, "Moduli must match");
        assert_eq!(self.is_ntt, rhs.is_ntt, "NTT domains must match");

        Poly {
            coeffs: self
                .coeffs
                .iter()
                .zip(&rhs.coeffs)
                .map(|(&a, &b)| ModQ::sub(a, b, self.q))
                .collect(),
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Self::Output {
        Poly {
            coeffs: self
                .coeffs
                .iter()
                .map(|&c| ModQ::negate(c, self.q))
                .collect(),
            q: self.q,
            is_ntt: self.is_ntt,
        }
    }
}

impl Neg for Poly {
    type Output = Poly;

    fn neg(self) -> Self::Output {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::DEFAULT_Q;

    #[test]
    fn test_add_sub_neg() {
        let a = Poly::from_coeffs(vec![1, 2, 3, 4], DEFAULT_Q);
        let b = Poly::from_coeffs(vec![4, 3, 2, 1], DEFAULT_Q);

        let sum = &a + &b;
        assert_eq!(sum.coeffs(), &[5, 5, 5, 5]);

        let diff = &a - &b;
        assert_eq!(diff.coeff(0), DEFAULT_Q - 3);
        assert_eq!(diff.coeff(3), 3);

        let zero = &a + &(-&a);
        assert!(zero.coeffs().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_mul_ntt_monomials() {
        let d = 16;
        let ctx = NttContext::with_default_q(d);

        // X^3 * X^15 = X^18 = -X^2
        let mut a = Poly::zero(d, DEFAULT_Q);
        a.coeffs[3] = 1;
        let mut b = Poly::zero(d, DEFAULT_Q);
        b.coeffs[15] = 1;

        let product = a.mul_ntt(&b, &ctx);
        assert!(!product.is_ntt());
        assert_eq!(product.coeff(2), DEFAULT_Q - 1);
        assert_eq!(product.coeffs().iter().filter(|&&c| c != 0).count(), 1);
    }

    #[test]
    fn test_mul_ntt_with_ntt_operand() {
        let d = 64;
        let ctx = NttContext::with_default_q(d);
        let mut rng = rand::thread_rng();

        let a = Poly::random_with_rng(d, DEFAULT_Q, &mut rng);
        let b = Poly::random_with_rng(d, DEFAULT_Q, &mut rng);
        let mut b_ntt = b.clone();
        b_ntt.to_ntt(&ctx);

        assert_eq!(a.mul_ntt(&b, &ctx), a.mul_ntt(&b_ntt, &ctx));
    }

    #[test]
    fn test_ntt_domain_roundtrip() {
        let d = 256;
        let ctx = NttContext::with_default_q(d);
        let mut rng = rand::thread_rng();

        let original = Poly::random_with_rng(d, DEFAULT_Q, &mut rng);
        let mut poly = original.clone();
        poly.to_ntt(&ctx);
        assert!(poly.is_ntt());
        poly.from_ntt(&ctx);
        assert_eq!(poly, original);
    }

    #[test]
    fn test_scalar_mul() {
        let p = Poly::from_coeffs(vec![1, 2, DEFAULT_Q - 1, 0], DEFAULT_Q);
        let scaled = p.scalar_mul(3);
        assert_eq!(scaled.coeffs(), &[3, 6, DEFAULT_Q - 3, 0]);
    }
}
