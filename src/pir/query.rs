//! Client query generation
//!
//! The chosen element is mapped to its aggregated row, the row index is
//! decomposed into one coordinate per recursion dimension (dimension 0 most
//! significant), and each coordinate becomes an encrypted one-hot vector.
//! The query stream is the concatenation of those vectors, so it holds
//! `sum(dimensions)` ciphertexts.

use tracing::{debug, info};

use crate::crypto::HomomorphicCrypto;
use crate::error::{pir_err, PirError, Result};
use crate::params::PirParameters;

use super::queue::{BoundedQueue, FinishOnDrop, DEFAULT_QUEUE_CAPACITY};

/// Mixed-radix coordinates of aggregated row `row`, most significant first
pub fn row_coordinates(row: u64, dimensions: &[u64]) -> Vec<u64> {
    let mut coords = vec![0u64; dimensions.len()];
    let mut rest = row;
    for (coord, &dim) in coords.iter_mut().zip(dimensions).rev() {
        *coord = rest % dim;
        rest /= dim;
    }
    coords
}

/// Client side of the protocol: streams an encrypted query
pub struct QueryGenerator<'a, C: HomomorphicCrypto> {
    params: PirParameters,
    crypto: &'a C,
    queries: BoundedQueue<Vec<u8>>,
}

impl<'a, C: HomomorphicCrypto> QueryGenerator<'a, C> {
    pub fn new(params: &PirParameters, crypto: &'a C) -> Result<Self> {
        check_crypto(params, crypto)?;
        Ok(Self {
            params: params.clone(),
            crypto,
            queries: BoundedQueue::new(DEFAULT_QUEUE_CAPACITY),
        })
    }

    /// Use an outgoing queue of the given capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queries = BoundedQueue::new(capacity);
        self
    }

    /// Encrypt the selection vectors for `chosen_element`, pushing each
    /// ciphertext as soon as it exists.
    ///
    /// Blocks while the outgoing queue is full; run it on its own thread when
    /// the query does not fit in the queue. The stream is finished when this
    /// returns, whether or not it succeeded.
    pub fn generate_query(&self, chosen_element: u64) -> Result<()> {
        let _finish = FinishOnDrop(&self.queries);

        if chosen_element >= self.params.num_elements() {
            return Err(PirError::IndexOutOfRange {
                index: chosen_element,
                num_elements: self.params.num_elements(),
            });
        }

        let row = chosen_element / self.params.aggregation();
        let coords = row_coordinates(row, self.params.dimensions());
        debug!(
            "Generating query for element {} (row {}, coordinates {:?})",
            chosen_element, row, coords
        );

        for (&dim, &coord) in self.params.dimensions().iter().zip(&coords) {
            for i in 0..dim {
                let ct = self.crypto.encrypt_bit(i == coord);
                self.queries
                    .push(self.crypto.serialize(&ct))
                    .map_err(|_| PirError::StreamClosed("query"))?;
            }
        }

        info!(
            "Generated {} query elements",
            self.params.query_element_count()
        );
        Ok(())
    }

    /// Next serialized query element, or `None` at the end of the query
    pub fn pop_query(&self) -> Option<Vec<u8>> {
        self.queries.pop()
    }

    /// Abort the query stream, unblocking both sides
    pub fn finish(&self) {
        self.queries.finish();
    }

    /// Size in bytes of every query element
    pub fn query_element_bytesize(&self) -> usize {
        self.crypto.ciphertext_bytesize()
    }

    /// Number of elements a complete query holds
    pub fn query_element_count(&self) -> u64 {
        self.params.query_element_count()
    }
}

pub(crate) fn check_crypto<C: HomomorphicCrypto>(params: &PirParameters, crypto: &C) -> Result<()> {
    let actual = crypto.crypto_params();
    if &actual != params.crypto() {
        return Err(pir_err!(
            InvalidParameters,
            "cryptosystem {} does not match parameters for {}",
            actual,
            params.crypto()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CryptoParams, MockCrypto, MockParams};

    fn mock() -> (PirParameters, MockCrypto) {
        let mock = MockParams::new(8, 16);
        let params =
            PirParameters::new(CryptoParams::Mock(mock.clone()), 100, 16, 1, vec![10, 10]).unwrap();
        (params, MockCrypto::new(mock).unwrap())
    }

    #[test]
    fn test_row_coordinates() {
        assert_eq!(row_coordinates(57, &[10, 10]), vec![5, 7]);
        assert_eq!(row_coordinates(5, &[8]), vec![5]);
        assert_eq!(row_coordinates(23, &[2, 3, 4]), vec![1, 2, 3]);
        assert_eq!(row_coordinates(0, &[3, 3]), vec![0, 0]);
    }

    #[test]
    fn test_query_is_concatenated_one_hot_vectors() {
        let (params, crypto) = mock();
        let generator = QueryGenerator::new(&params, &crypto).unwrap();
        generator.generate_query(57).unwrap();

        let mut bits = Vec::new();
        while let Some(bytes) = generator.pop_query() {
            assert_eq!(bytes.len(), generator.query_element_bytesize());
            let ct = crypto.deserialize(&bytes).unwrap();
            bits.push(ct[0]);
        }

        assert_eq!(bits.len(), 20);
        let ones: Vec<usize> = bits
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b == 1)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(ones, vec![5, 17]);
    }

    #[test]
    fn test_aggregation_selects_row() {
        let mock = MockParams::new(8, 16);
        let params =
            PirParameters::new(CryptoParams::Mock(mock.clone()), 10, 4, 3, vec![4]).unwrap();
        let crypto = MockCrypto::new(mock).unwrap();
        let generator = QueryGenerator::new(&params, &crypto).unwrap();
        generator.generate_query(7).unwrap();

        let bits: Vec<u64> = std::iter::from_fn(|| generator.pop_query())
            .map(|b| crypto.deserialize(&b).unwrap()[0])
            .collect();
        assert_eq!(bits, vec![0, 0, 1, 0]);
    }

    #[test]
    fn test_out_of_range_finishes_stream() {
        let (params, crypto) = mock();
        let generator = QueryGenerator::new(&params, &crypto).unwrap();
        let err = generator.generate_query(100).unwrap_err();
        assert!(matches!(
            err,
            PirError::IndexOutOfRange {
                index: 100,
                num_elements: 100
            }
        ));
        assert_eq!(generator.pop_query(), None);
    }

    #[test]
    fn test_streams_through_small_queue() {
        let (params, crypto) = mock();
        let generator = QueryGenerator::new(&params, &crypto)
            .unwrap()
            .with_queue_capacity(2);

        let count = std::thread::scope(|s| {
            let producer = s.spawn(|| generator.generate_query(3));
            let count = std::iter::from_fn(|| generator.pop_query()).count();
            producer.join().unwrap().unwrap();
            count
        });
        assert_eq!(count, 20);
    }

    #[test]
    fn test_rejects_mismatched_crypto() {
        let (params, _) = mock();
        let other = MockCrypto::new(MockParams::new(16, 16)).unwrap();
        assert!(QueryGenerator::new(&params, &other).is_err());
    }
}
