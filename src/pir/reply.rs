//! Server reply generation
//!
//! The server collects the query stream, imports the database (possibly one
//! chunk of every element at a time) and folds it one recursion dimension per
//! round:
//!
//! 1. Round 0 takes the dot product of the first one-hot query vector with
//!    the aggregated rows `i * G_0 + g`, leaving one ciphertext per group `g`
//!    and plaintext slot.
//! 2. Every intermediate result is serialized and re-split into plaintexts, so
//!    the next round selects among ciphertexts exactly as round 0 selected
//!    among rows.
//! 3. The last round leaves a single group whose ciphertexts are the reply.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::crypto::HomomorphicCrypto;
use crate::db::DbHandler;
use crate::error::{pir_err, PirError, Result};
use crate::params::PirParameters;

use super::database::ImportedDatabase;
use super::query::check_crypto;
use super::queue::{BoundedQueue, FinishOnDrop, DEFAULT_QUEUE_CAPACITY};

struct QueryBuffer<C: HomomorphicCrypto> {
    pending: Vec<C::Ciphertext>,
    received: u64,
    /// One vector of prepared ciphertexts per recursion dimension
    prepared: Option<Vec<Vec<C::PreparedCiphertext>>>,
}

impl<C: HomomorphicCrypto> Default for QueryBuffer<C> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            received: 0,
            prepared: None,
        }
    }
}

/// Rows folded by one round: the imported database, then the re-encoded
/// output of the previous round
enum Layer<'d, P> {
    Database(&'d ImportedDatabase<P>),
    Expanded(Vec<Vec<P>>),
}

impl<P> Layer<'_, P> {
    fn item(&self, index: u64) -> Option<&[P]> {
        match self {
            Layer::Database(db) => db.row(index as usize),
            Layer::Expanded(groups) => groups.get(index as usize).map(Vec::as_slice),
        }
    }
}

/// Server side of the protocol
pub struct ReplyGenerator<'a, C: HomomorphicCrypto, D: DbHandler + ?Sized> {
    params: PirParameters,
    crypto: &'a C,
    db: &'a D,
    queries: Mutex<QueryBuffer<C>>,
    replies: BoundedQueue<Vec<u8>>,
    nb_replies_generated: AtomicU64,
}

impl<'a, C: HomomorphicCrypto, D: DbHandler + ?Sized> ReplyGenerator<'a, C, D> {
    pub fn new(params: &PirParameters, crypto: &'a C, db: &'a D) -> Result<Self> {
        check_crypto(params, crypto)?;
        Ok(Self {
            params: params.clone(),
            crypto,
            db,
            queries: Mutex::new(QueryBuffer::default()),
            replies: BoundedQueue::new(DEFAULT_QUEUE_CAPACITY),
            nb_replies_generated: AtomicU64::new(0),
        })
    }

    /// Use an outgoing queue of the given capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.replies = BoundedQueue::new(capacity);
        self
    }

    fn lock_queries(&self) -> MutexGuard<'_, QueryBuffer<C>> {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one serialized query element, in the order the client produced
    /// them. The element completing the query triggers the precomputation.
    pub fn push_query(&self, bytes: &[u8]) -> Result<()> {
        let ct = self.crypto.deserialize(bytes)?;
        let expected = self.params.query_element_count();

        let mut queries = self.lock_queries();
        if queries.received >= expected {
            return Err(pir_err!(
                Precondition,
                "query already holds all {} elements",
                expected
            ));
        }
        queries.pending.push(ct);
        queries.received += 1;

        if queries.received == expected {
            let start = Instant::now();
            let pending = std::mem::take(&mut queries.pending);
            let mut rest = pending.as_slice();
            let prepared: Vec<Vec<C::PreparedCiphertext>> = self
                .params
                .dimensions()
                .iter()
                .map(|&dim| {
                    let (head, tail) = rest.split_at(dim as usize);
                    rest = tail;
                    head.par_iter().map(|ct| self.crypto.prepare(ct)).collect::<Vec<_>>()
                })
                .collect();
            queries.prepared = Some(prepared);
            debug!(
                "Prepared {} query elements in {:.2?}",
                expected,
                start.elapsed()
            );
        }
        Ok(())
    }

    /// Query elements received since the last [`free_queries`](Self::free_queries)
    pub fn nb_query_elements_received(&self) -> u64 {
        self.lock_queries().received
    }

    /// Import bytes `[offset, offset + len)` of every database element
    pub fn import_data(&self, offset: u64, len: u64) -> Result<ImportedDatabase<C::Plaintext>> {
        let start = Instant::now();
        let imported = ImportedDatabase::import(&self.params, self.crypto, self.db, offset, len)?;
        info!(
            "Imported {} elements ({} bytes at offset {}) in {:.2?}",
            self.params.num_elements(),
            len,
            offset,
            start.elapsed()
        );
        Ok(imported)
    }

    /// Run every recursion round over `database`, pushing the final reply
    /// elements in order as they are produced.
    ///
    /// The reply stream is finished when this returns, whether or not it
    /// succeeded.
    pub fn generate_reply(&self, database: &ImportedDatabase<C::Plaintext>) -> Result<()> {
        let _finish = FinishOnDrop(&self.replies);
        let start = Instant::now();

        let queries = self.lock_queries();
        let prepared = queries.prepared.as_ref().ok_or_else(|| {
            pir_err!(
                Precondition,
                "query incomplete: {} of {} elements received",
                queries.received,
                self.params.query_element_count()
            )
        })?;
        if database.params() != &self.params.for_chunk(database.bytes_per_element())? {
            return Err(pir_err!(
                Precondition,
                "imported database layout does not match the query parameters"
            ));
        }

        let dims = self.params.dimensions();
        let expansion = self.params.expansion_factor() as usize;
        let pt_bytes = self.crypto.plaintext_bytesize();
        let mut layer = Layer::Database(database);
        let mut slots = database.params().polys_per_row() as usize;

        for (round, query) in prepared.iter().enumerate() {
            let groups: u64 = dims[round + 1..].iter().product();
            debug!(
                "Round {}: folding {} x {} items of {} plaintexts",
                round, dims[round], groups, slots
            );

            if round + 1 < dims.len() {
                let next: Vec<Vec<C::Plaintext>> = (0..groups)
                    .into_par_iter()
                    .map(|group| {
                        let mut plaintexts = Vec::with_capacity(slots * expansion);
                        for slot in 0..slots {
                            let ct = self.fold(query, &layer, group, groups, slot);
                            let bytes = self.crypto.serialize(&ct);
                            plaintexts.extend(
                                bytes
                                    .chunks(pt_bytes)
                                    .map(|piece| self.crypto.encode_plaintext(piece)),
                            );
                        }
                        plaintexts
                    })
                    .collect();
                layer = Layer::Expanded(next);
                slots *= expansion;
            } else {
                // One group left; batches keep the output ordered while the
                // consumer already reads the first replies.
                let batch = rayon::current_num_threads().max(1);
                for first in (0..slots).step_by(batch) {
                    let last = (first + batch).min(slots);
                    let cts: Vec<C::Ciphertext> = (first..last)
                        .into_par_iter()
                        .map(|slot| self.fold(query, &layer, 0, 1, slot))
                        .collect();
                    for ct in &cts {
                        self.replies
                            .push(self.crypto.serialize(ct))
                            .map_err(|_| PirError::StreamClosed("reply"))?;
                        self.nb_replies_generated.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        }

        info!(
            "Generated {} reply elements in {:.2?}",
            self.nb_replies_generated(),
            start.elapsed()
        );
        Ok(())
    }

    /// Dot product of one query vector with slot `slot` of items
    /// `i * stride + group`
    fn fold(
        &self,
        query: &[C::PreparedCiphertext],
        layer: &Layer<'_, C::Plaintext>,
        group: u64,
        stride: u64,
        slot: usize,
    ) -> C::Ciphertext {
        let rows: Vec<Option<&C::Plaintext>> = (0..query.len() as u64)
            .map(|i| layer.item(i * stride + group).and_then(|item| item.get(slot)))
            .collect();
        self.crypto.dot_product(query, &rows)
    }

    /// Drop the stored query so the next request starts empty
    pub fn free_queries(&self) {
        *self.lock_queries() = QueryBuffer::default();
    }

    /// Next serialized reply element, or `None` at the end of the reply
    pub fn pop_reply(&self) -> Option<Vec<u8>> {
        self.replies.pop()
    }

    /// Abort the reply stream, unblocking both sides
    pub fn finish(&self) {
        self.replies.finish();
    }

    /// Size in bytes of every reply element
    pub fn reply_element_bytesize(&self) -> usize {
        self.crypto.ciphertext_bytesize()
    }

    /// Reply elements pushed so far in the current stream
    pub fn nb_replies_generated(&self) -> u64 {
        self.nb_replies_generated.load(Ordering::SeqCst)
    }

    /// Open a fresh reply stream for the next import pass, keeping the query
    pub fn restart_reply_stream(&mut self) {
        self.replies = BoundedQueue::new(self.replies.capacity());
        self.nb_replies_generated.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CryptoParams, MockCrypto, MockParams};
    use crate::db::DbVectorProcessor;
    use crate::pir::QueryGenerator;

    fn setup(dims: Vec<u64>) -> (PirParameters, MockCrypto, DbVectorProcessor) {
        let mock = MockParams::new(4, 16);
        let params = PirParameters::new(CryptoParams::Mock(mock.clone()), 12, 8, 1, dims).unwrap();
        let db = DbVectorProcessor::new((0..12u8).map(|i| vec![i + 1; 8]).collect());
        (params, MockCrypto::new(mock).unwrap(), db)
    }

    fn push_query_for(
        generator: &ReplyGenerator<'_, MockCrypto, DbVectorProcessor>,
        params: &PirParameters,
        crypto: &MockCrypto,
        index: u64,
    ) {
        let query = QueryGenerator::new(params, crypto).unwrap();
        query.generate_query(index).unwrap();
        while let Some(bytes) = query.pop_query() {
            generator.push_query(&bytes).unwrap();
        }
    }

    #[test]
    fn test_single_round_selects_row() {
        let (params, crypto, db) = setup(vec![12]);
        let generator = ReplyGenerator::new(&params, &crypto, &db).unwrap();
        push_query_for(&generator, &params, &crypto, 7);

        let imported = generator.import_data(0, 8).unwrap();
        generator.generate_reply(&imported).unwrap();

        let replies: Vec<Vec<u8>> = std::iter::from_fn(|| generator.pop_reply()).collect();
        assert_eq!(replies.len(), 1);
        assert_eq!(generator.nb_replies_generated(), params.expected_reply_count());
        let ct = crypto.deserialize(&replies[0]).unwrap();
        assert_eq!(crypto.decrypt(&ct), vec![8u8; 8]);
    }

    #[test]
    fn test_two_rounds_nest_ciphertexts() {
        let (params, crypto, db) = setup(vec![3, 4]);
        let generator = ReplyGenerator::new(&params, &crypto, &db).unwrap();
        push_query_for(&generator, &params, &crypto, 9);

        let imported = generator.import_data(0, 8).unwrap();
        generator.generate_reply(&imported).unwrap();

        let replies: Vec<Vec<u8>> = std::iter::from_fn(|| generator.pop_reply()).collect();
        // 32-byte ciphertexts over 8-byte plaintexts
        assert_eq!(replies.len(), 4);
        let inner: Vec<u8> = replies
            .iter()
            .flat_map(|bytes| crypto.decrypt(&crypto.deserialize(bytes).unwrap()))
            .collect();
        let ct = crypto.deserialize(&inner).unwrap();
        assert_eq!(crypto.decrypt(&ct), vec![10u8; 8]);
    }

    #[test]
    fn test_incomplete_query_is_precondition_error() {
        let (params, crypto, db) = setup(vec![3, 4]);
        let generator = ReplyGenerator::new(&params, &crypto, &db).unwrap();
        generator
            .push_query(&crypto.serialize(&crypto.encrypt_bit(true)))
            .unwrap();
        assert_eq!(generator.nb_query_elements_received(), 1);

        let imported = generator.import_data(0, 8).unwrap();
        let err = generator.generate_reply(&imported).unwrap_err();
        assert!(matches!(err, PirError::Precondition(_)));
        assert_eq!(generator.pop_reply(), None);
    }

    #[test]
    fn test_mismatched_database_is_precondition_error() {
        let (flat, crypto, db) = setup(vec![12]);
        let imported = ReplyGenerator::new(&flat, &crypto, &db)
            .unwrap()
            .import_data(0, 8)
            .unwrap();

        let (params, _, _) = setup(vec![3, 4]);
        let generator = ReplyGenerator::new(&params, &crypto, &db).unwrap();
        push_query_for(&generator, &params, &crypto, 5);

        let err = generator.generate_reply(&imported).unwrap_err();
        assert!(matches!(err, PirError::Precondition(_)));
        assert_eq!(generator.pop_reply(), None);
        assert_eq!(generator.nb_replies_generated(), 0);
    }

    #[test]
    fn test_extra_query_element_rejected() {
        let (params, crypto, db) = setup(vec![12]);
        let generator = ReplyGenerator::new(&params, &crypto, &db).unwrap();
        push_query_for(&generator, &params, &crypto, 0);
        let extra = crypto.serialize(&crypto.encrypt_bit(false));
        assert!(matches!(
            generator.push_query(&extra),
            Err(PirError::Precondition(_))
        ));

        generator.free_queries();
        assert_eq!(generator.nb_query_elements_received(), 0);
        generator.push_query(&extra).unwrap();
    }

    #[test]
    fn test_malformed_query_element() {
        let (params, crypto, db) = setup(vec![12]);
        let generator = ReplyGenerator::new(&params, &crypto, &db).unwrap();
        assert!(matches!(
            generator.push_query(&[0u8; 5]),
            Err(PirError::MalformedCiphertext(_))
        ));
    }

    #[test]
    fn test_restart_reply_stream_per_chunk() {
        let (params, crypto, db) = setup(vec![12]);
        let mut generator = ReplyGenerator::new(&params, &crypto, &db).unwrap();
        push_query_for(&generator, &params, &crypto, 2);

        let mut retrieved = Vec::new();
        for offset in [0u64, 4] {
            generator.restart_reply_stream();
            let imported = generator.import_data(offset, 4).unwrap();
            generator.generate_reply(&imported).unwrap();
            while let Some(bytes) = generator.pop_reply() {
                let pt = crypto.decrypt(&crypto.deserialize(&bytes).unwrap());
                retrieved.extend_from_slice(&pt[..4]);
            }
            assert_eq!(generator.nb_replies_generated(), 1);
        }
        assert_eq!(retrieved, vec![3u8; 8]);
    }
}
