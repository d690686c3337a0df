//! Client reply extraction
//!
//! Reply elements arrive in the server's slot order, so every `expansion`
//! consecutive ciphertexts of one level decrypt to the serialized ciphertext of
//! the level below. Extraction keeps one byte accumulator per level and
//! unwinds each group as soon as it is complete; level 0 decrypts to the
//! database bytes.

use tracing::{debug, info};

use crate::crypto::HomomorphicCrypto;
use crate::error::{PirError, Result};
use crate::params::PirParameters;

use super::query::check_crypto;
use super::queue::{BoundedQueue, FinishOnDrop, DEFAULT_QUEUE_CAPACITY};

/// Client side of the protocol: turns the reply stream back into plaintext
pub struct ReplyExtraction<'a, C: HomomorphicCrypto> {
    params: PirParameters,
    crypto: &'a C,
    incoming: BoundedQueue<C::Ciphertext>,
    plaintexts: BoundedQueue<Vec<u8>>,
}

impl<'a, C: HomomorphicCrypto> ReplyExtraction<'a, C> {
    pub fn new(params: &PirParameters, crypto: &'a C) -> Result<Self> {
        check_crypto(params, crypto)?;
        Ok(Self {
            params: params.clone(),
            crypto,
            incoming: BoundedQueue::new(DEFAULT_QUEUE_CAPACITY),
            plaintexts: BoundedQueue::new(DEFAULT_QUEUE_CAPACITY),
        })
    }

    /// Use incoming and outgoing queues of the given capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.incoming = BoundedQueue::new(capacity);
        self.plaintexts = BoundedQueue::new(capacity);
        self
    }

    /// Deserialize one reply element and queue it for extraction.
    ///
    /// Blocks while the incoming queue is full.
    pub fn push_encrypted_reply(&self, bytes: &[u8]) -> Result<()> {
        let ct = self.crypto.deserialize(bytes)?;
        self.incoming
            .push(ct)
            .map_err(|_| PirError::StreamClosed("encrypted reply"))
    }

    /// Signal that no more reply elements will be pushed
    pub fn finish_encrypted_replies(&self) {
        self.incoming.finish();
    }

    /// Consume the whole reply stream and emit the plaintext chunks of the
    /// first `max_bytesize` bytes of the retrieved row.
    ///
    /// With aggregation the row holds several elements; the requested one
    /// sits at [`PirParameters::element_range`], so asking for
    /// `element_range(index).end` bytes is enough to recover it.
    ///
    /// Fails with [`PirError::Desynchronized`] when the reply stream ends
    /// before every expected element arrived. Both streams are finished when
    /// this returns, so a producer still pushing replies fails instead of
    /// blocking.
    pub fn extract_reply(&self, max_bytesize: u64) -> Result<()> {
        let _finish = FinishOnDrop(&self.plaintexts);
        let _close = FinishOnDrop(&self.incoming);

        let depth = self.params.depth();
        let expansion = self.params.expansion_factor();
        let per_chunk = self.params.replies_per_plaintext();
        let expected = self.params.expected_reply_count();
        let wanted = self.nb_plaintext_replies(max_bytesize);
        let group_bytes = expansion as usize * self.crypto.plaintext_bytesize();
        let ct_bytes = self.crypto.ciphertext_bytesize();
        let mut remaining = max_bytesize.min(self.params.row_bytesize());
        debug!(
            "Extracting {} of {} reply elements through {} levels",
            wanted * per_chunk,
            expected,
            depth
        );

        let mut levels: Vec<Vec<u8>> = vec![Vec::with_capacity(group_bytes); depth];
        for received in 0..expected {
            let mut ct = self
                .incoming
                .pop()
                .ok_or(PirError::Desynchronized { received, expected })?;
            if received / per_chunk >= wanted {
                continue;
            }

            let mut level = depth - 1;
            loop {
                let pt = self.crypto.decrypt(&ct);
                if level == 0 {
                    let take = remaining.min(pt.len() as u64) as usize;
                    remaining -= take as u64;
                    self.plaintexts
                        .push(pt[..take].to_vec())
                        .map_err(|_| PirError::StreamClosed("plaintext"))?;
                    break;
                }

                let acc = &mut levels[level];
                acc.extend_from_slice(&pt);
                if acc.len() < group_bytes {
                    break;
                }
                ct = self.crypto.deserialize(&acc[..ct_bytes])?;
                acc.clear();
                level -= 1;
            }
        }

        info!("Extracted {} plaintext chunks", wanted);
        Ok(())
    }

    /// Next plaintext chunk, or `None` once extraction is over
    pub fn pop_plaintext_result(&self) -> Option<Vec<u8>> {
        self.plaintexts.pop()
    }

    /// Number of chunks [`extract_reply`](Self::extract_reply) emits for `max_bytesize`
    pub fn nb_plaintext_replies(&self, max_bytesize: u64) -> u64 {
        max_bytesize
            .min(self.params.row_bytesize())
            .div_ceil(self.crypto.plaintext_bytesize() as u64)
    }

    /// Maximum size of one plaintext chunk
    pub fn plaintext_reply_bytesize(&self) -> usize {
        self.crypto.plaintext_bytesize()
    }
}
