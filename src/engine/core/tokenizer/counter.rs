use sha2::{Digest, Sha256};
use tiktoken_rs::{CoreBPE, cl100k_base, get_bpe_from_model};
use tracing::{debug, warn};

use crate::engine::core::segment::Segment;
use crate::shared::time;

/// Byte-pair-encoding token counter with a per-segment cache keyed by
/// content hash. Counting is deterministic for a given model encoding.
pub struct Tokenizer {
    model: String,
    bpe: CoreBPE,
}

impl Tokenizer {
    /// Build a counter for the given model name. Unknown models fall back
    /// to the GPT-4-class `cl100k_base` encoding.
    pub fn new(model: &str) -> Self {
        let bpe = match get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(err) => {
                warn!(
                    target: "ctxstash::tokenizer",
                    model,
                    error = %err,
                    "unknown model, falling back to cl100k_base"
                );
                cl100k_base().expect("embedded cl100k_base encoding")
            }
        };
        Self {
            model: model.to_string(),
            bpe,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Exact token count for a text. `count("") == 0`.
    pub fn count(&self, text: &str) -> u64 {
        self.bpe.encode_ordinary(text).len() as u64
    }

    /// SHA-256 digest of a text, used to validate cached counts.
    pub fn text_digest(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Token count for a segment, served from its cache when the content
    /// hash still matches. Recomputing refreshes `tokens`,
    /// `tokens_computed_at`, and `text_hash` in place.
    pub fn count_segment(&self, segment: &mut Segment, force: bool) -> u64 {
        if force {
            return self.recount(segment);
        }

        if let (Some(tokens), Some(hash)) = (segment.tokens, segment.text_hash.as_deref()) {
            if hash == Self::text_digest(&segment.text) {
                return tokens;
            }
            debug!(
                target: "ctxstash::tokenizer",
                segment_id = %segment.segment_id,
                "content hash mismatch, recounting"
            );
            return self.recount(segment);
        }

        // A count without a hash is trusted once; the hash is backfilled so
        // later edits invalidate it.
        if let Some(tokens) = segment.tokens {
            segment.text_hash = Some(Self::text_digest(&segment.text));
            return tokens;
        }

        self.recount(segment)
    }

    fn recount(&self, segment: &mut Segment) -> u64 {
        let count = self.count(&segment.text);
        segment.tokens = Some(count);
        segment.tokens_computed_at = Some(time::now());
        segment.text_hash = Some(Self::text_digest(&segment.text));
        count
    }
}
