//! RLWE (Ring Learning With Errors) encryption module
//!
//! This module implements RLWE encryption over the ring R_q = Z_q[X]/(X^d + 1).
//!
//! # Overview
//!
//! - Secret key s is a polynomial sampled from error distribution
//! - Ciphertext (a, b) encrypts message m as b = -a·s + e + Δ·m
//! - Δ = ⌊q/p⌋ is the scaling factor
//!
//! # Example
//!
//! ```
//! use recursive_pir::math::{GaussianSampler, NttContext, Poly};
//! use recursive_pir::params::RlweParams;
//! use recursive_pir::rlwe::{RlweCiphertext, RlweSecretKey};
//!
//! let params = RlweParams::new(256, 80);
//! let ctx = NttContext::new(params.ring_dim, params.q);
//! let mut sampler = GaussianSampler::new(params.sigma);
//!
//! let sk = RlweSecretKey::generate(&params, &mut sampler);
//!
//! let message = Poly::constant(42, params.ring_dim, params.q);
//! let a = Poly::random_with_rng(params.ring_dim, params.q, &mut rand::thread_rng());
//! let error = Poly::sample_gaussian(params.ring_dim, params.q, &mut sampler);
//! let ct = RlweCiphertext::encrypt(&sk, &message, params.delta(), a, &error, &ctx);
//!
//! let decrypted = ct.decrypt(&sk, params.delta(), params.plaintext_modulus(), &ctx);
//! assert_eq!(decrypted[0], 42);
//! ```

mod enc;
mod types;

pub use types::{RlweCiphertext, RlweSecretKey};
