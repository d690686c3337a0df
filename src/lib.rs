//! Recursive PIR: single-server computational private information retrieval
//!
//! A client retrieves one element of a server-held database without revealing
//! which one. The query is a set of encrypted one-hot vectors, one per
//! recursion dimension, and the server answers with a homomorphic dot product
//! per dimension. Consecutive elements can be aggregated into one row to trade
//! reply size for query size.
//!
//! Key components:
//! - Ring-LWE cryptosystem with NTT multiplication and Shoup-precomputed queries
//! - Streaming pipeline stages connected by bounded blocking queues
//! - Chunked database import for databases larger than memory

pub mod crypto;
pub mod db;
pub mod error;
pub mod math;
pub mod params;
pub mod pir;
pub mod rlwe;

pub use crypto::{available_crypto_params, CryptoParams, HomomorphicCrypto, MockCrypto, RlweCrypto};
pub use db::{DbDirectoryProcessor, DbGenerator, DbHandler, DbVectorProcessor};
pub use error::{PirError, Result};
pub use params::{PirParameters, RlweParams};
pub use pir::{
    BoundedQueue, ImportedDatabase, QueryGenerator, ReplyExtraction, ReplyGenerator,
};
