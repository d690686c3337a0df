//! Recursive PIR pipeline
//!
//! Three stages exchange fixed-size byte buffers through [`BoundedQueue`]s:
//!
//! 1. **Query**: [`QueryGenerator`] encrypts one one-hot selection vector per
//!    recursion dimension (`sum(dimensions)` ciphertexts)
//! 2. **Reply**: [`ReplyGenerator`] imports the database and folds it one
//!    dimension per round, streaming the last round's ciphertexts
//! 3. **Extract**: [`ReplyExtraction`] decrypts level by level back to the
//!    database bytes
//!
//! Every stage can run on its own thread; producers block while their queue is
//! full and consumers see `None` once the stream is finished.
//!
//! # Example
//!
//! ```
//! use recursive_pir::crypto::{CryptoParams, MockCrypto, MockParams};
//! use recursive_pir::db::DbVectorProcessor;
//! use recursive_pir::params::PirParameters;
//! use recursive_pir::pir::{QueryGenerator, ReplyExtraction, ReplyGenerator};
//!
//! let mock = MockParams::new(64, 16);
//! let crypto = MockCrypto::new(mock.clone())?;
//! let params = PirParameters::new(CryptoParams::Mock(mock), 16, 32, 1, vec![4, 4])?;
//! let db = DbVectorProcessor::new((0..16u8).map(|i| vec![i; 32]).collect());
//!
//! // Client
//! let query = QueryGenerator::new(&params, &crypto)?;
//! query.generate_query(11)?;
//!
//! // Server
//! let server = ReplyGenerator::new(&params, &crypto, &db)?;
//! while let Some(bytes) = query.pop_query() {
//!     server.push_query(&bytes)?;
//! }
//! let imported = server.import_data(0, 32)?;
//! server.generate_reply(&imported)?;
//!
//! // Client
//! let extraction = ReplyExtraction::new(&params, &crypto)?;
//! while let Some(bytes) = server.pop_reply() {
//!     extraction.push_encrypted_reply(&bytes)?;
//! }
//! extraction.finish_encrypted_replies();
//! extraction.extract_reply(32)?;
//!
//! let element: Vec<u8> = std::iter::from_fn(|| extraction.pop_plaintext_result())
//!     .flatten()
//!     .collect();
//! assert_eq!(element, vec![11u8; 32]);
//! # Ok::<(), recursive_pir::PirError>(())
//! ```

mod database;
mod extract;
mod query;
mod queue;
mod reply;

pub use database::ImportedDatabase;
pub use extract::ReplyExtraction;
pub use query::{row_coordinates, QueryGenerator};
pub use queue::{BoundedQueue, DEFAULT_QUEUE_CAPACITY};
pub use reply::ReplyGenerator;
